//! RFC 6901 JSON pointer syntax check

use super::ExpressionError;

/// Validate a JSON pointer: empty (whole document) or a sequence of
/// `/`-prefixed reference tokens where `~` only appears as `~0` or `~1`.
pub fn validate_json_pointer(pointer: &str) -> Result<(), ExpressionError> {
    if pointer.is_empty() {
        return Ok(());
    }
    if !pointer.starts_with('/') {
        return Err(ExpressionError::InvalidJsonPointer {
            pointer: pointer.to_string(),
            reason: "must start with /".to_string(),
        });
    }

    let mut chars = pointer.chars();
    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next() {
                Some('0') | Some('1') => {}
                _ => {
                    return Err(ExpressionError::InvalidJsonPointer {
                        pointer: pointer.to_string(),
                        reason: "~ must be escaped as ~0 or ~1".to_string(),
                    })
                }
            }
        }
    }

    Ok(())
}
