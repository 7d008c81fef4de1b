use serde_json::Value;

use crate::domain::entities::filter::CompareOp;

/// Store-native query criteria over JSON documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    IsNull {
        field: String,
    },
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
    /// Matches when none of the operands match.
    Nor(Vec<Criteria>),
    Not(Box<Criteria>),
}

impl Criteria {
    pub fn not(inner: Criteria) -> Self {
        Criteria::Not(Box::new(inner))
    }

    /// Conjunction of `parts`; `None` when there is nothing to filter on.
    pub fn all(mut parts: Vec<Criteria>) -> Option<Criteria> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Criteria::And(parts)),
        }
    }
}
