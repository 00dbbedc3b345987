//! Wiki link-path resolution.
//!
//! A link core is resolved against the path of the document it appears on:
//!
//! - `//Page/Sub` is absolute from the wiki root;
//! - `/Sub` is a child of the base document;
//! - `..`, `../..`, `../Other` climb from the base document;
//! - a bare `Page` resolves as a sibling of the base document.
//!
//! Resolution failure (climbing past the root, empty components) rejects
//! the link alternative during parsing, which makes the bracketed text
//! fall back to plain text.

use thiserror::Error;

/// Why a link core failed to resolve.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// `..` navigation went above the wiki root.
    #[error("link climbs above the wiki root")]
    AboveRoot,
    /// A path component was empty or the result was empty.
    #[error("empty link component")]
    EmptyComponent,
}

fn split_base(base: &str) -> Vec<&str> {
    base.split('/').filter(|c| !c.is_empty()).collect()
}

/// Resolve `core` against the document path `base`, returning the
/// absolute target path.
pub fn resolve(core: &str, base: &str) -> Result<String, LinkError> {
    let core = core.trim_end_matches([' ', '\t']);
    if core.is_empty() {
        return Err(LinkError::EmptyComponent);
    }

    let mut components: Vec<String>;
    let rest: &str;

    if let Some(stripped) = core.strip_prefix("//") {
        components = Vec::new();
        rest = stripped;
    } else if let Some(stripped) = core.strip_prefix('/') {
        components = split_base(base).iter().map(|c| c.to_string()).collect();
        rest = stripped;
    } else if core == ".." || core.starts_with("../") {
        // Climb from the base document itself.
        components = split_base(base).iter().map(|c| c.to_string()).collect();
        let mut remaining = core;
        loop {
            if components.pop().is_none() {
                return Err(LinkError::AboveRoot);
            }
            if remaining == ".." {
                remaining = "";
                break;
            }
            remaining = &remaining[3..];
            if !(remaining == ".." || remaining.starts_with("../")) {
                break;
            }
        }
        rest = remaining;
    } else {
        // Sibling of the base document.
        components = split_base(base).iter().map(|c| c.to_string()).collect();
        components.pop();
        rest = core;
    }

    for part in rest.split('/') {
        if part.is_empty() {
            if rest.is_empty() {
                break;
            }
            return Err(LinkError::EmptyComponent);
        }
        if part == ".." {
            return Err(LinkError::EmptyComponent);
        }
        components.push(part.trim().to_string());
    }

    if components.is_empty() {
        return Err(LinkError::EmptyComponent);
    }
    Ok(components.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_link_is_sibling() {
        assert_eq!(resolve("Other", "Main/Page").unwrap(), "Main/Other");
        assert_eq!(resolve("Other", "Page").unwrap(), "Other");
        assert_eq!(resolve("Other", "").unwrap(), "Other");
    }

    #[test]
    fn test_child_link() {
        assert_eq!(resolve("/Sub", "Main/Page").unwrap(), "Main/Page/Sub");
    }

    #[test]
    fn test_absolute_link() {
        assert_eq!(resolve("//Top/Sub", "Main/Page").unwrap(), "Top/Sub");
    }

    #[test]
    fn test_updir_link() {
        assert_eq!(resolve("..", "Main/Page").unwrap(), "Main");
        assert_eq!(resolve("../Other", "Main/Page").unwrap(), "Main/Other");
        assert_eq!(resolve("../../X", "A/B/C").unwrap(), "A/X");
    }

    #[test]
    fn test_climbing_past_root_fails() {
        assert!(resolve("..", "Page").is_err());
        assert!(resolve("../..", "Main/Page").is_err());
        assert_eq!(resolve("../..", "Page"), Err(LinkError::AboveRoot));
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        assert_eq!(resolve("Other \t", "Main/Page").unwrap(), "Main/Other");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(resolve("", "Main").is_err());
        assert!(resolve("A//B", "Main").is_err());
    }
}
