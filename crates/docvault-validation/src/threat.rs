//! Dangerous-content scanner.
//!
//! Matches a bounded prefix of the content against the configured markers.
//! Callers learn only that something matched; the index is for internal logs.

use docvault_core::{ThreatPatternConfig, VaultError};
use regex::bytes::{Regex, RegexBuilder};

struct CompiledPattern {
    regex: Regex,
    pdf_only: bool,
}

/// Index of the matching pattern within the configured list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreatMatch {
    pub pattern_index: usize,
}

pub struct ThreatScanner {
    patterns: Vec<CompiledPattern>,
    prefix_bytes: usize,
}

impl ThreatScanner {
    /// Compile every pattern up front; an invalid pattern is a configuration error.
    pub fn new(patterns: &[ThreatPatternConfig], prefix_bytes: usize) -> Result<Self, VaultError> {
        let compiled = patterns
            .iter()
            .enumerate()
            .map(|(index, p)| {
                RegexBuilder::new(&p.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| CompiledPattern {
                        regex,
                        pdf_only: p.pdf_only,
                    })
                    .map_err(|e| {
                        VaultError::Config(format!("Invalid threat pattern #{}: {}", index, e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns: compiled,
            prefix_bytes,
        })
    }

    /// First matching pattern within the scanned prefix, if any.
    pub fn scan(&self, data: &[u8], is_pdf: bool) -> Option<ThreatMatch> {
        let prefix = &data[..data.len().min(self.prefix_bytes)];
        self.patterns
            .iter()
            .enumerate()
            .filter(|(_, p)| is_pdf || !p.pdf_only)
            .find(|(_, p)| p.regex.is_match(prefix))
            .map(|(pattern_index, _)| ThreatMatch { pattern_index })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
