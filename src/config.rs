//! Grammar-affecting configuration.
//!
//! A [`ParseOptions`] record travels with every parse call; grammar rules
//! read it through the parse context instead of consulting process-global
//! state, so a grammar instance can serve differently-configured parses
//! concurrently.

use serde::{Deserialize, Serialize};

/// Auto-link behaviour of the post-parse rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AutoLinkMode {
    /// No automatic linking.
    #[default]
    None,
    /// Relaxed matching: plain-text leaves are scanned for the configured
    /// words, case-insensitively and with arbitrary non-word joiners.
    Relax {
        /// Known words, in declaration order (earlier wins ties after the
        /// longest-match rule).
        words: Vec<String>,
    },
}

/// Configuration record enumerating the grammar-affecting options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Recognize bare CamelCase tokens as links.
    pub camel_case_links: bool,
    /// Treat blank lines as paragraph separators instead of single
    /// newlines as line breaks.
    pub paragraph_mode: bool,
    /// Give footnote nodes a link target.
    pub footnotes_as_links: bool,
    /// Skip the grammar entirely and emit one plain-text leaf.
    pub no_format: bool,
    /// Auto-link post pass configuration.
    pub auto_link: AutoLinkMode,
    /// Path of the document being parsed; relative links resolve against
    /// it.
    pub base_document_path: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            camel_case_links: true,
            paragraph_mode: false,
            footnotes_as_links: false,
            no_format: false,
            auto_link: AutoLinkMode::None,
            base_document_path: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ParseOptions::default();
        assert!(opts.camel_case_links);
        assert!(!opts.paragraph_mode);
        assert_eq!(opts.auto_link, AutoLinkMode::None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let opts = ParseOptions {
            paragraph_mode: true,
            auto_link: AutoLinkMode::Relax {
                words: vec!["alpha".into()],
            },
            ..ParseOptions::default()
        };
        let json = serde_json::to_string(&opts).unwrap();
        let back: ParseOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(opts, back);
    }
}
