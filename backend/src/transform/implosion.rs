//! Packed ("imploded") column expansion.
//!
//! Some sheets pack several values of one command into a single cell,
//! e.g. the reagent names of a rack:
//!
//! ```text
//! ReagenzNamen = "0=Buffer|1=Enzyme|2=Water"
//! ```
//!
//! With the prefix `ReagenzName_` this expands to `ReagenzName_0=Buffer`,
//! `ReagenzName_1=Enzyme` and `ReagenzName_2=Water`.

use super::opcodes::ImplosionRules;
use crate::models::ParameterSet;

/// Default separator between packed pairs.
pub const DEFAULT_SEPARATOR: char = '|';

/// Expand one packed cell.
///
/// Each `separator`-delimited piece must contain exactly one `=`; any other
/// piece (including the empty piece of an empty cell) is skipped. Columns
/// with no rule expand to nothing.
pub fn expand_imploded(
    rules: &ImplosionRules,
    column: &str,
    packed: &str,
    separator: char,
) -> ParameterSet {
    let Some(prefix) = rules.get(column) else {
        return ParameterSet::new();
    };

    packed
        .split(separator)
        .filter_map(|pair| {
            let mut parts = pair.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Some((format!("{}{}", prefix, key), value.to_string())),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::opcodes::implosion_rules_for;

    fn rules(pairs: &[(&'static str, &'static str)]) -> ImplosionRules {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_expand_simple() {
        let rules = rules(&[("Packed", "X_")]);
        let set = expand_imploded(&rules, "Packed", "a=1|b=2", '|');

        let expected: ParameterSet = [("X_a", "1"), ("X_b", "2")].into_iter().collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_expand_empty_string() {
        let rules = rules(&[("Packed", "X_")]);
        assert!(expand_imploded(&rules, "Packed", "", '|').is_empty());
    }

    #[test]
    fn test_malformed_pairs_skipped() {
        let rules = rules(&[("Packed", "X_")]);
        let set = expand_imploded(&rules, "Packed", "a=1|novalue|b=2=3||c=", '|');

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("X_a"), Some("1"));
        assert_eq!(set.get("X_c"), Some(""));
        assert!(!set.contains_key("X_b"));
    }

    #[test]
    fn test_unknown_column_expands_to_nothing() {
        let rules = rules(&[("Packed", "X_")]);
        assert!(expand_imploded(&rules, "Other", "a=1", '|').is_empty());
    }

    #[test]
    fn test_custom_separator() {
        let rules = rules(&[("Packed", "X_")]);
        let set = expand_imploded(&rules, "Packed", "a=1;b=2", ';');
        assert_eq!(set.len(), 2);

        // the default separator is plain text under a custom one
        let set = expand_imploded(&rules, "Packed", "a=1|b=2", ';');
        assert!(set.is_empty());
    }

    #[test]
    fn test_place_it_reagents() {
        let rules = implosion_rules_for("115");
        let set = expand_imploded(&rules, "ReagenzNamen", "0=Foo|1=Bar", DEFAULT_SEPARATOR);
        assert_eq!(set.get("ReagenzName_0"), Some("Foo"));
        assert_eq!(set.get("ReagenzName_1"), Some("Bar"));
    }
}
