//! Filter predicates

use serde::{Deserialize, Serialize};

use crate::entity::Value;

/// Comparison applied by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    StartsWith,
    EndsWith,
    In,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::In => "in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    /// Operators that take no operand
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Operators matched with `LIKE`
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }

    /// Ordering comparisons, not meaningful on bool columns
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

/// Operand of a filter: one value, or a list for `in`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<Value>),
    Scalar(Value),
}

/// One `field op value` predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Option<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    fn scalar(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self::new(field, op, Some(FilterValue::Scalar(value.into())))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterOp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterOp::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterOp::Le, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterOp::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(field, FilterOp::Ge, value)
    }

    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::scalar(field, FilterOp::Contains, text.into())
    }

    pub fn starts_with(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::scalar(field, FilterOp::StartsWith, text.into())
    }

    pub fn ends_with(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::scalar(field, FilterOp::EndsWith, text.into())
    }

    pub fn in_list<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Self::new(field, FilterOp::In, Some(FilterValue::List(values)))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNull, None)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNotNull, None)
    }
}
