//! Criteria validation and SQL generation
//!
//! A [`QueryPlan`] is a [`Criteria`] checked against an entity descriptor.
//! It renders two independent statements sharing one WHERE clause: the
//! count query and the page query. Every value is a bound parameter and
//! every identifier comes from the descriptor, so nothing caller supplied
//! is ever spliced into SQL text.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::config::SearchConfig;
use crate::entity::{ColumnDef, ColumnType, EntityDescriptor, Value, quote_ident};
use crate::error::{Error, Result};

use super::{Criteria, Filter, FilterOp, FilterValue, Page, SortDirection};

/// Escape character used with `LIKE`
const LIKE_ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    None,
    Scalar(Value),
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
struct Predicate {
    column: &'static ColumnDef,
    op: FilterOp,
    operand: Operand,
}

/// Validated filter/sort/page description, ready to render
#[derive(Debug, Clone)]
pub struct QueryPlan {
    descriptor: &'static EntityDescriptor,
    predicates: Vec<Predicate>,
    order: Vec<(&'static ColumnDef, SortDirection)>,
    page: Page,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidCriteria(message.into())
}

impl QueryPlan {
    /// Validate `criteria` on top of the queryable's own `base` predicates.
    ///
    /// Base predicates may reference hidden columns; caller criteria may not.
    pub fn build(
        descriptor: &'static EntityDescriptor,
        base: &[Filter],
        criteria: &Criteria,
        search: &SearchConfig,
    ) -> Result<Self> {
        let mut predicates = Vec::with_capacity(base.len() + criteria.filters.len());
        for filter in base {
            predicates.push(predicate(descriptor, filter, true)?);
        }
        for filter in &criteria.filters {
            predicates.push(predicate(descriptor, filter, false)?);
        }

        let mut order: Vec<(&'static ColumnDef, SortDirection)> = Vec::new();
        for sort in &criteria.sorts {
            let column = descriptor
                .column(&sort.field)
                .filter(|c| c.sortable)
                .ok_or_else(|| {
                    invalid(format!(
                        "'{}' is not a sortable field of {}",
                        sort.field, descriptor.name
                    ))
                })?;
            if order.iter().any(|(c, _)| c.name == column.name) {
                return Err(invalid(format!("field '{}' is sorted twice", sort.field)));
            }
            order.push((column, sort.direction));
        }

        let page = criteria
            .page
            .unwrap_or_else(|| Page::new(0, search.default_page_size));
        if page.size == 0 {
            return Err(invalid("page size must be at least 1"));
        }
        if page.size > search.max_page_size {
            return Err(invalid(format!(
                "page size {} exceeds the maximum of {}",
                page.size, search.max_page_size
            )));
        }
        if i64::try_from(page.offset()).is_err() {
            return Err(invalid(format!("page index {} is out of range", page.index)));
        }

        Ok(Self {
            descriptor,
            predicates,
            order,
            page,
        })
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn filter_count(&self) -> usize {
        self.predicates.len()
    }

    /// `SELECT COUNT(*)` over the filtered rows
    pub fn count_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {}",
            quote_ident(self.descriptor.table)
        ));
        self.push_where(&mut builder);
        builder
    }

    /// Filtered, ordered and paged row selection
    pub fn page_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            self.descriptor.select_list(),
            quote_ident(self.descriptor.table)
        ));
        self.push_where(&mut builder);
        self.push_order(&mut builder);

        // Offset range was checked in build()
        let offset = i64::try_from(self.page.offset()).unwrap_or(i64::MAX);
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(self.page.size));
        builder.push(" OFFSET ");
        builder.push_bind(offset);
        builder
    }

    fn push_where(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(builder);
        }
    }

    fn push_order(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        let mut clauses: Vec<String> = self
            .order
            .iter()
            .map(|(column, direction)| format!("{} {}", quote_ident(column.name), direction.as_sql()))
            .collect();
        // Key tie-break keeps paging stable across identical calls
        if !self.order.iter().any(|(c, _)| c.name == self.descriptor.key) {
            clauses.push(format!("{} ASC", quote_ident(self.descriptor.key)));
        }
        builder.push(" ORDER BY ");
        builder.push(clauses.join(", "));
    }
}

impl Predicate {
    fn push_sql(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        let column = quote_ident(self.column.name);
        match (&self.op, &self.operand) {
            (FilterOp::IsNull, _) => {
                builder.push(format!("{} IS NULL", column));
            }
            (FilterOp::IsNotNull, _) => {
                builder.push(format!("{} IS NOT NULL", column));
            }
            (FilterOp::Ne, Operand::Scalar(value)) => {
                // NULL is "not equal" to any value
                builder.push(format!("({} <> ", column));
                value.push_bind(builder);
                builder.push(format!(" OR {} IS NULL)", column));
            }
            (FilterOp::In, Operand::List(values)) => {
                builder.push(format!("{} IN (", column));
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    value.push_bind(builder);
                }
                builder.push(")");
            }
            (op, Operand::Scalar(value)) if op.is_pattern() => {
                builder.push(format!("{} LIKE ", column));
                value.push_bind(builder);
                builder.push(format!(" ESCAPE '{}'", LIKE_ESCAPE));
            }
            (op, Operand::Scalar(value)) => {
                let symbol = match op {
                    FilterOp::Lt => "<",
                    FilterOp::Le => "<=",
                    FilterOp::Gt => ">",
                    FilterOp::Ge => ">=",
                    _ => "=",
                };
                builder.push(format!("{} {} ", column, symbol));
                value.push_bind(builder);
            }
            // Shapes are enforced by predicate()
            (_, Operand::None | Operand::List(_)) => {
                builder.push("0");
            }
        }
    }
}

fn predicate(
    descriptor: &'static EntityDescriptor,
    filter: &Filter,
    allow_hidden: bool,
) -> Result<Predicate> {
    let column = descriptor
        .column(&filter.field)
        .filter(|c| allow_hidden || c.filterable)
        .ok_or_else(|| {
            invalid(format!(
                "'{}' is not a filterable field of {}",
                filter.field, descriptor.name
            ))
        })?;
    let op = filter.op;

    let operand = match (op, &filter.value) {
        (op, None) if op.is_unary() => Operand::None,
        (op, Some(_)) if op.is_unary() => {
            return Err(invalid(format!(
                "'{}' on '{}' takes no value",
                op.as_str(),
                filter.field
            )));
        }
        (FilterOp::In, Some(FilterValue::List(values))) => {
            if values.is_empty() {
                return Err(invalid(format!("'in' on '{}' needs at least one value", filter.field)));
            }
            let values = values
                .iter()
                .map(|v| coerce(column, v))
                .collect::<Result<Vec<_>>>()?;
            Operand::List(values)
        }
        (FilterOp::In, _) => {
            return Err(invalid(format!("'in' on '{}' needs a list value", filter.field)));
        }
        (op, Some(FilterValue::Scalar(value))) if op.is_pattern() => {
            if column.ty != ColumnType::Text {
                return Err(invalid(format!(
                    "'{}' only applies to text fields, '{}' is {}",
                    op.as_str(),
                    filter.field,
                    column.ty.as_str()
                )));
            }
            let Value::Text(text) = value else {
                return Err(invalid(format!(
                    "'{}' on '{}' needs a text value",
                    op.as_str(),
                    filter.field
                )));
            };
            Operand::Scalar(Value::Text(like_pattern(op, text)))
        }
        (op, Some(FilterValue::Scalar(value))) => {
            if op.is_ordering() && column.ty == ColumnType::Bool {
                return Err(invalid(format!(
                    "'{}' cannot order bool field '{}'",
                    op.as_str(),
                    filter.field
                )));
            }
            Operand::Scalar(coerce(column, value)?)
        }
        (op, _) => {
            return Err(invalid(format!(
                "'{}' on '{}' needs a single value",
                op.as_str(),
                filter.field
            )));
        }
    };

    Ok(Predicate {
        column,
        op,
        operand,
    })
}

/// Convert a criteria value to the column's storage type
fn coerce(column: &ColumnDef, value: &Value) -> Result<Value> {
    let coerced = match (column.ty, value) {
        (_, Value::Null) => {
            return Err(invalid(format!(
                "null is not a value for '{}', use is_null or is_not_null",
                column.name
            )));
        }
        (ColumnType::Integer, Value::Integer(v)) => Value::Integer(*v),
        (ColumnType::Real, Value::Integer(v)) => Value::Real(*v as f64),
        (ColumnType::Real, Value::Real(v)) => Value::Real(*v),
        (ColumnType::Text, Value::Text(v)) => Value::Text(v.clone()),
        (ColumnType::Bool, Value::Bool(v)) => Value::Bool(*v),
        (ColumnType::Bool, Value::Integer(v @ (0 | 1))) => Value::Bool(*v == 1),
        (ColumnType::Timestamp, Value::Timestamp(v)) => Value::Timestamp(*v),
        (ColumnType::Timestamp, Value::Text(v)) => DateTime::parse_from_rfc3339(v)
            .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
            .map_err(|e| {
                invalid(format!(
                    "'{}' expects an RFC 3339 timestamp, got '{}': {}",
                    column.name, v, e
                ))
            })?,
        (ty, other) => {
            return Err(invalid(format!(
                "'{}' is {} but the value is {}",
                column.name,
                ty.as_str(),
                other.kind()
            )));
        }
    };
    Ok(coerced)
}

fn like_pattern(op: FilterOp, text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    match op {
        FilterOp::StartsWith => format!("{}%", escaped),
        FilterOp::EndsWith => format!("%{}", escaped),
        _ => format!("%{}%", escaped),
    }
}
