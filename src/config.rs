//! Options for loading and validating documents

use std::sync::Arc;

use crate::cache::{Caches, DEFAULT_CACHES};

/// How `validator::unmarshal` treats a document
#[derive(Debug, Clone)]
pub struct Options {
    /// Decode only; structural decode findings are still reported
    pub skip_validation: bool,

    /// Sort findings by (line, column)
    pub sort_errors: bool,

    /// Caches to validate with; the process-wide default when unset
    pub caches: Option<Arc<Caches>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            skip_validation: false,
            sort_errors: true,
            caches: None,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    pub fn sort_errors(mut self, sort: bool) -> Self {
        self.sort_errors = sort;
        self
    }

    pub fn with_caches(mut self, caches: Arc<Caches>) -> Self {
        self.caches = Some(caches);
        self
    }

    pub fn caches(&self) -> &Caches {
        self.caches.as_deref().unwrap_or(&DEFAULT_CACHES)
    }
}
