//! Equality predicates for queries and live queries.

use serde::Serialize;
use serde_json::Value;

/// An equality constraint on a single top-level document field.
///
/// Equality is the only supported operator: remote queries stay unordered
/// and free of composite-index requirements, and ordering is handled
/// client-side on each snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

impl Predicate {
    /// Constrain `field` to equal `value`.
    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            value: serde_json::to_value(value).expect("predicate value must serialize to JSON"),
        }
    }

    /// Whether a document body satisfies this predicate.
    pub fn matches(&self, data: &Value) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

/// Whether a document body satisfies every predicate in the slice.
pub(crate) fn matches_all(predicates: &[Predicate], data: &Value) -> bool {
    predicates.iter().all(|p| p.matches(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_on_equal_top_level_field() {
        let p = Predicate::eq("status", "pending");
        assert!(p.matches(&json!({"status": "pending", "other": 1})));
        assert!(!p.matches(&json!({"status": "approved"})));
    }

    #[test]
    fn missing_field_never_matches() {
        let p = Predicate::eq("status", "pending");
        assert!(!p.matches(&json!({"other": "pending"})));
    }

    #[test]
    fn matches_all_requires_every_predicate() {
        let ps = vec![Predicate::eq("a", 1), Predicate::eq("b", "x")];
        assert!(matches_all(&ps, &json!({"a": 1, "b": "x"})));
        assert!(!matches_all(&ps, &json!({"a": 1, "b": "y"})));
    }
}
