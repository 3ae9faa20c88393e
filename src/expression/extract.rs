//! Single-pass scanner that finds runtime expressions embedded in text
//!
//! A payload may mix literal text, JSON or XML with zero or more expressions:
//! - `$...` at the very start of the string
//! - `{$...}` anywhere, optionally followed by `#/json/pointer`
//!
//! The scanner only recognizes candidates; it does not validate them.

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Outside any candidate
    Literal,
    /// Inside a candidate, `braced` when it was opened by `{`
    Candidate { braced: bool },
    /// Capturing the `#...` JSON pointer suffix of a candidate
    Pointer,
}

/// Extract every syntactically self-contained expression from `input`, in
/// order. Brace delimiters are not part of the returned text; a pointer that
/// follows a closing brace is (`{$response.body}#/id` yields `$response.body#/id`).
pub fn extract_expressions(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut found = Vec::new();
    let mut state = State::Literal;
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            State::Literal => {
                if ch == '$' && i == 0 {
                    current.push(ch);
                    state = State::Candidate { braced: false };
                } else if ch == '{' && next == Some('$') {
                    current.push('$');
                    state = State::Candidate { braced: true };
                    i += 1;
                }
            }
            State::Candidate { braced } => match ch {
                '$' => {
                    current.clear();
                    state = State::Literal;
                }
                '{' => {
                    // Abort, then let the brace open a new candidate if it can
                    current.clear();
                    state = State::Literal;
                    continue;
                }
                '}' if braced => {
                    if next == Some('#') {
                        current.push('#');
                        state = State::Pointer;
                        i += 1;
                    } else {
                        found.push(std::mem::take(&mut current));
                        state = State::Literal;
                    }
                }
                '}' => {
                    current.clear();
                    state = State::Literal;
                }
                '#' if !braced => {
                    current.push(ch);
                    state = State::Pointer;
                }
                c if c.is_whitespace() => {
                    current.clear();
                    state = State::Literal;
                }
                c => current.push(c),
            },
            State::Pointer => {
                if ch.is_whitespace() {
                    found.push(std::mem::take(&mut current));
                    state = State::Literal;
                } else {
                    current.push(ch);
                }
            }
        }

        i += 1;
    }

    if state != State::Literal && !current.is_empty() {
        found.push(current);
    }

    found
}
