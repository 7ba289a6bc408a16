//! The optional, opt-in external-enrichment seam: handles the residual
//! citation phrases the pattern catalog and context tracker cannot
//! resolve on their own (`別表第<n>に掲げる法律`, `前各号の法`,
//! `関係法令`, `改正前の<X法>`).
//!
//! The core engine never requires a live implementation. [`NullResolver`]
//! is the shipped default; [`TableResolver`] exercises the gating logic
//! end-to-end in tests without any network dependency.

use std::collections::HashMap;
use std::time::Instant;

/// A synchronous, cancellable name resolver for residual citation
/// phrases. `deadline` is advisory: implementations should stop working
/// and return `None` once `Instant::now() >= deadline` rather than block
/// past it.
pub trait ResidualResolver {
    /// Attempts to resolve `text` (the matched phrase) using `window` (a
    /// short slice of surrounding article text) as context. Returns the
    /// candidate law name, or `None` if no confident answer is available
    /// before `deadline`.
    fn resolve(&self, text: &str, window: &str, deadline: Instant) -> Option<String>;
}

/// The default resolver: never produces an answer. The detector must
/// behave identically whether or not an enrichment helper is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl ResidualResolver for NullResolver {
    fn resolve(&self, _text: &str, _window: &str, _deadline: Instant) -> Option<String> {
        None
    }
}

/// An offline reference resolver keyed on the exact matched phrase, used
/// to exercise the dictionary-checked, confidence-capped enrichment path
/// in tests without a live helper.
#[derive(Debug, Clone, Default)]
pub struct TableResolver {
    table: HashMap<String, String>,
}

impl TableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, phrase: impl Into<String>, law_name: impl Into<String>) -> Self {
        self.table.insert(phrase.into(), law_name.into());
        self
    }
}

impl ResidualResolver for TableResolver {
    fn resolve(&self, text: &str, _window: &str, deadline: Instant) -> Option<String> {
        if Instant::now() >= deadline {
            return None;
        }
        self.table.get(text).cloned()
    }
}
