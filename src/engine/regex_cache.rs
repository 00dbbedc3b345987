//! Thread-local cache of compiled regex patterns.
//!
//! Grammar construction and the fusion optimizer both compile patterns;
//! repeated builds (tests build the grammar with the optimizer on and off)
//! reuse the compiled automata through this cache. Thread-local storage
//! keeps access lock-free.

use std::cell::RefCell;

use hashbrown::HashMap;
use regex::Regex;

use crate::engine::error::GrammarError;
use crate::engine::fusion::RegexFlags;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Compile `pattern` under the given flag set, reusing a cached automaton
/// when the same decorated pattern was compiled before on this thread.
pub fn compile(pattern: &str, flags: RegexFlags) -> Result<Regex, GrammarError> {
    let decorated = format!("{}{}", flags.inline_prefix(), pattern);

    REGEX_CACHE.with(|cache| {
        if let Some(regex) = cache.borrow().get(&decorated) {
            return Ok(regex.clone());
        }

        match Regex::new(&decorated) {
            Ok(regex) => {
                cache
                    .borrow_mut()
                    .insert(decorated.clone(), regex.clone());
                Ok(regex)
            }
            Err(source) => Err(GrammarError::InvalidPattern {
                pattern: decorated,
                source,
            }),
        }
    })
}

/// Drop all cached automata on this thread.
pub fn clear() {
    REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Number of cached automata on this thread.
pub fn len() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_caches() {
        clear();
        assert!(compile("[0-9]+", RegexFlags::NONE).is_ok());
        assert_eq!(len(), 1);
        assert!(compile("[0-9]+", RegexFlags::NONE).is_ok());
        assert_eq!(len(), 1);
        // Different flags decorate differently and cache separately.
        assert!(compile("[0-9]+", RegexFlags::MULTI_LINE).is_ok());
        assert_eq!(len(), 2);
    }

    #[test]
    fn test_invalid_pattern_reports() {
        clear();
        let err = compile("[oops", RegexFlags::NONE).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidPattern { .. }));
    }

    #[test]
    fn test_flagged_compile_matches_multiline() {
        clear();
        let re = compile("^b", RegexFlags::MULTI_LINE).unwrap();
        assert!(re.find_at("a\nb", 2).map(|m| m.start()) == Some(2));
    }
}
