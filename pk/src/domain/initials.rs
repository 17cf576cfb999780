//! Initials derivation for pinned actors
//!
//! Short names are used verbatim. Longer names drop any parenthesized suffix and
//! keep the first character of each word, joined with periods.

use tracing::debug;

/// Names at or below this many characters are shown as-is
const VERBATIM_MAX_CHARS: usize = 4;

/// Derive display initials from an actor name
///
/// Returns `None` for a blank name (the caller keeps its previous initials).
/// A name that cannot be abbreviated degrades to its first character followed by `?`.
pub fn derive_initials(name: &str) -> Option<String> {
    debug!(%name, "derive_initials: called");
    if name.trim().is_empty() {
        debug!("derive_initials: blank name");
        return None;
    }

    if name.chars().count() <= VERBATIM_MAX_CHARS {
        debug!("derive_initials: short name, using verbatim");
        return Some(name.to_string());
    }

    match abbreviate(name) {
        Some(initials) => Some(initials),
        None => {
            debug!(%name, "derive_initials: abbreviation failed, using fallback");
            fallback(name)
        }
    }
}

fn abbreviate(name: &str) -> Option<String> {
    let head = name.split('(').find(|part| !part.is_empty())?;

    let mut initials = String::new();
    for word in head.split_whitespace() {
        initials.push(word.chars().next()?);
        initials.push('.');
    }

    let initials = initials.trim_matches('.');
    if initials.is_empty() {
        return None;
    }
    Some(initials.to_string())
}

fn fallback(name: &str) -> Option<String> {
    name.chars().next().map(|first| format!("{}?", first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_name_verbatim() {
        assert_eq!(derive_initials("Al"), Some("Al".to_string()));
        assert_eq!(derive_initials("Abcd"), Some("Abcd".to_string()));
    }

    #[test]
    fn test_multi_word_name() {
        assert_eq!(derive_initials("Jane Q. Public"), Some("J.Q.P".to_string()));
    }

    #[test]
    fn test_parenthesized_suffix_dropped() {
        assert_eq!(derive_initials("Anonymous (NPC)"), Some("A".to_string()));
    }

    #[test]
    fn test_unabbreviable_name_falls_back() {
        assert_eq!(derive_initials("((((("), Some("(?".to_string()));
        assert_eq!(derive_initials("   (x)"), Some(" ?".to_string()));
    }

    #[test]
    fn test_blank_name() {
        assert_eq!(derive_initials(""), None);
        assert_eq!(derive_initials("      "), None);
    }

    #[test]
    fn test_multibyte_name() {
        assert_eq!(derive_initials("Ébène Île"), Some("É.Î".to_string()));
        assert_eq!(derive_initials("Ñoño"), Some("Ñoño".to_string()));
    }

    proptest! {
        #[test]
        fn prop_non_blank_names_always_get_initials(name in "\\PC{1,40}") {
            prop_assume!(!name.trim().is_empty());
            let initials = derive_initials(&name);
            prop_assert!(initials.is_some());
            prop_assert!(!initials.unwrap_or_default().is_empty());
        }
    }
}
