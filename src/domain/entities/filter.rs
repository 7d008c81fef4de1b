use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unsupported filter kind: {0}")]
    UnsupportedFilterKind(String),
    #[error("unknown comparison operator: {0}")]
    UnsupportedOperator(String),
    #[error("Not(And) is not expressible as a single store predicate")]
    NegatedAndUnsupported,
    #[error("filter list in {0} is empty")]
    EmptyFilterGroup(&'static str),
    #[error("malformed filter: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "eq", alias = "=")]
    Equal,
    #[serde(rename = "gt", alias = ">")]
    Greater,
    #[serde(rename = "gte", alias = ">=")]
    GreaterOrEqual,
    #[serde(rename = "lt", alias = "<")]
    Less,
    #[serde(rename = "lte", alias = "<=")]
    LessOrEqual,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
        }
    }
}

impl FromStr for CompareOp {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "eq" => Ok(CompareOp::Equal),
            ">" | "gt" => Ok(CompareOp::Greater),
            ">=" | "gte" => Ok(CompareOp::GreaterOrEqual),
            "<" | "lt" => Ok(CompareOp::Less),
            "<=" | "lte" => Ok(CompareOp::LessOrEqual),
            other => Err(FilterError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// Composable boolean filter a grid applies to its container.
///
/// `And`/`Or` operand lists must be non-empty; translation rejects empty groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FilterExpr {
    IsNull {
        field: String,
    },
    StringMatch {
        field: String,
        text: String,
        #[serde(default)]
        ignore_case: bool,
        #[serde(default)]
        prefix_only: bool,
    },
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    Not {
        filter: Box<FilterExpr>,
    },
    And {
        filters: Vec<FilterExpr>,
    },
    Or {
        filters: Vec<FilterExpr>,
    },
}

impl FilterExpr {
    pub fn is_null(field: impl Into<String>) -> Self {
        FilterExpr::IsNull {
            field: field.into(),
        }
    }

    pub fn string_match(
        field: impl Into<String>,
        text: impl Into<String>,
        ignore_case: bool,
        prefix_only: bool,
    ) -> Self {
        FilterExpr::StringMatch {
            field: field.into(),
            text: text.into(),
            ignore_case,
            prefix_only,
        }
    }

    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        FilterExpr::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Equal, value)
    }

    pub fn negate(inner: FilterExpr) -> Self {
        FilterExpr::Not {
            filter: Box::new(inner),
        }
    }

    pub fn all(filters: Vec<FilterExpr>) -> Self {
        FilterExpr::And { filters }
    }

    pub fn any(filters: Vec<FilterExpr>) -> Self {
        FilterExpr::Or { filters }
    }

    /// Decodes a filter tree handed over as JSON, reporting unknown filter
    /// kinds and operator tokens before falling back to a generic decode error.
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        check_tags(value)?;
        serde_json::from_value(value.clone()).map_err(|err| FilterError::Malformed(err.to_string()))
    }
}

fn check_tags(value: &Value) -> Result<(), FilterError> {
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| FilterError::Malformed(format!("missing filter kind in {value}")))?;

    match kind {
        "isNull" | "stringMatch" => Ok(()),
        "compare" => match value.get("op").and_then(Value::as_str) {
            Some(op) => op.parse::<CompareOp>().map(|_| ()),
            None => Err(FilterError::Malformed("compare filter without op".to_string())),
        },
        "not" => match value.get("filter") {
            Some(inner) => check_tags(inner),
            None => Err(FilterError::Malformed("not filter without operand".to_string())),
        },
        "and" | "or" => value
            .get("filters")
            .and_then(Value::as_array)
            .ok_or_else(|| FilterError::Malformed(format!("{kind} filter without operands")))?
            .iter()
            .try_for_each(check_tags),
        other => Err(FilterError::UnsupportedFilterKind(other.to_string())),
    }
}
