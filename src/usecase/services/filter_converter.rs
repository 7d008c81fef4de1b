//! Translation of grid filter trees into store criteria.
//!
//! Negation is pushed down through the tree: `Not` flips the `negated` flag,
//! `Or` under negation becomes `Nor`, and leaves under negation are wrapped in
//! `Criteria::Not`. `And` under negation has no single-node store form and is
//! rejected.

use tracing::debug;

use crate::domain::entities::criteria::Criteria;
use crate::domain::entities::filter::{FilterError, FilterExpr};

/// What happens to negation arriving at a group with exactly one operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SingleOperandNegation {
    /// The operand is translated un-negated, so `Not(Or([x]))` yields `x`.
    #[default]
    Drop,
    /// The group is transparent and the operand receives the negation.
    Propagate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    pub single_operand_negation: SingleOperandNegation,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterConverter {
    options: TranslateOptions,
}

impl FilterConverter {
    pub fn new(options: TranslateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> TranslateOptions {
        self.options
    }

    pub fn convert(&self, filter: &FilterExpr) -> Result<Criteria, FilterError> {
        let criteria = self.translate(filter, false)?;
        debug!(?filter, ?criteria, "translated filter");
        Ok(criteria)
    }

    pub fn convert_negated(&self, filter: &FilterExpr) -> Result<Criteria, FilterError> {
        self.translate(filter, true)
    }

    /// Translates each filter un-negated, preserving order.
    pub fn convert_all(&self, filters: &[FilterExpr]) -> Result<Vec<Criteria>, FilterError> {
        filters
            .iter()
            .map(|filter| self.translate(filter, false))
            .collect()
    }

    pub fn translate(&self, filter: &FilterExpr, negated: bool) -> Result<Criteria, FilterError> {
        let leaf = match filter {
            FilterExpr::IsNull { field } => Criteria::IsNull {
                field: field.clone(),
            },
            FilterExpr::StringMatch {
                field,
                text,
                ignore_case,
                prefix_only,
            } => Criteria::Regex {
                field: field.clone(),
                pattern: string_match_pattern(text, *prefix_only),
                case_insensitive: *ignore_case,
            },
            FilterExpr::Compare { field, op, value } => Criteria::Compare {
                field: field.clone(),
                op: *op,
                value: value.clone(),
            },
            FilterExpr::Not { filter } => return self.translate(filter, !negated),
            FilterExpr::And { filters } => return self.translate_and(filters, negated),
            FilterExpr::Or { filters } => return self.translate_or(filters, negated),
        };

        Ok(if negated { Criteria::not(leaf) } else { leaf })
    }

    fn translate_single(&self, only: &FilterExpr, negated: bool) -> Result<Criteria, FilterError> {
        match self.options.single_operand_negation {
            SingleOperandNegation::Drop => self.translate(only, false),
            SingleOperandNegation::Propagate => self.translate(only, negated),
        }
    }

    fn translate_and(&self, filters: &[FilterExpr], negated: bool) -> Result<Criteria, FilterError> {
        let propagate = self.options.single_operand_negation == SingleOperandNegation::Propagate;
        if negated && !(propagate && filters.len() == 1) {
            return Err(FilterError::NegatedAndUnsupported);
        }
        match filters {
            [] => Err(FilterError::EmptyFilterGroup("And")),
            [only] => self.translate_single(only, negated),
            _ => Ok(Criteria::And(self.convert_all(filters)?)),
        }
    }

    fn translate_or(&self, filters: &[FilterExpr], negated: bool) -> Result<Criteria, FilterError> {
        match filters {
            [] => Err(FilterError::EmptyFilterGroup("Or")),
            [only] => self.translate_single(only, negated),
            _ if negated => Ok(Criteria::Nor(self.convert_all(filters)?)),
            _ => Ok(Criteria::Or(self.convert_all(filters)?)),
        }
    }
}

/// Regex for a literal substring (or prefix) match on `text`.
pub fn string_match_pattern(text: &str, prefix_only: bool) -> String {
    let escaped = regex::escape(text);
    if prefix_only {
        format!("^{escaped}.*")
    } else {
        format!(".*{escaped}.*")
    }
}
