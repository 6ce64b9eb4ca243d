//! Sequence-level checks not expressible via JSON Schema.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::node::Node;
use crate::core::path::all_leaves;

static RESOURCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static resource-name regex")
});

/// True if `name` can identify a resource.
pub fn is_valid_name(name: &str) -> bool {
    RESOURCE_NAME.is_match(name)
}

/// Check invariants a scaffold must satisfy before it is replayed:
/// - Every resource name is an identifier
/// - Every path declared by a verb's contract parses
pub fn validate_invariants<V: Node>(verbs: &[V]) -> Vec<String> {
    let mut errors = Vec::new();
    for (index, verb) in verbs.iter().enumerate() {
        for (at, leaf) in all_leaves(verb) {
            if !is_valid_name(leaf.name) {
                errors.push(format!(
                    "verbs[{index}] {at}: resource name '{}' is not an identifier",
                    leaf.name
                ));
            }
        }
        if let Err(err) = verb.contract().check_paths() {
            errors.push(format!("verbs[{index}] {}: {err}", verb.type_name()));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::Field;
    use crate::core::state::ResourceKind;

    struct Alloc {
        pd: String,
    }

    impl Node for Alloc {
        fn type_name(&self) -> &'static str {
            "Alloc"
        }

        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            vec![("pd", Field::resource(ResourceKind::Pd, &self.pd))]
        }
    }

    #[test]
    fn names_must_be_identifiers() {
        assert!(is_valid_name("pd0"));
        assert!(is_valid_name("_scratch"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("0pd"));
        assert!(!is_valid_name("pd 0"));
    }

    #[test]
    fn reports_bad_names_with_location() {
        let verbs = [
            Alloc {
                pd: "pd0".to_string(),
            },
            Alloc {
                pd: "pd-1".to_string(),
            },
        ];
        let errors = validate_invariants(&verbs);
        assert_eq!(
            errors,
            vec!["verbs[1] Alloc.pd: resource name 'pd-1' is not an identifier".to_string()]
        );
    }
}
