//! Dynamic statement builder
//!
//! Turns validated columns, filters and sort keys into the array
//! expressions the `sp_dynamic_*` procedures take:
//!
//! - columns: `ARRAY[ROW('name', E'value', 'STRING')]::dyn_column[]`
//! - filters: `ARRAY[ROW('status', '=', E'DRAFT', 'STRING', ARRAY[]::text[])]::dyn_filter[]`
//! - sort:    `ARRAY[ROW('created_at', 'DESC')]::dyn_sort[]`
//! - projection: `ARRAY['id', 'name']::text[]`
//!
//! Empty inputs render as typed empty arrays.

use std::fmt;

use records_core::domain::{ChangeSet, Column};
use records_core::FieldValue;

use super::identifier::{validate_identifier, Identifier};
use super::literal::{infer_type, is_numeric, quote_literal, render_value, ValueType};
use crate::error::CrudError;

/// Validated SQL text produced by this module only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFragment(String);

impl SqlFragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn checked_type(column: &Identifier, value: &FieldValue, value_type: Option<ValueType>) -> Result<ValueType, CrudError> {
    match value_type {
        None => Ok(infer_type(value)),
        Some(ValueType::Number) if !is_numeric(value) => Err(CrudError::InvalidValue {
            column: column.to_string(),
            reason: "value declared NUMBER is not numeric".to_string(),
        }),
        Some(t) => Ok(t),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    column: Identifier,
    value: FieldValue,
    value_type: ValueType,
}

impl ColumnValue {
    pub fn new(column: &str, value: impl Into<FieldValue>) -> Result<Self, CrudError> {
        Self::build(column, value.into(), None)
    }

    pub fn typed(column: &str, value: impl Into<FieldValue>, value_type: ValueType) -> Result<Self, CrudError> {
        Self::build(column, value.into(), Some(value_type))
    }

    fn build(column: &str, value: FieldValue, value_type: Option<ValueType>) -> Result<Self, CrudError> {
        let column = validate_identifier(column)?;
        let value_type = checked_type(&column, &value, value_type)?;
        Ok(Self { column, value, value_type })
    }

    pub fn column(&self) -> &Identifier {
        &self.column
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// Typed change set -> column list for the engine.
pub fn column_values<C: Column>(changes: &ChangeSet<C>) -> Result<Vec<ColumnValue>, CrudError> {
    changes
        .iter()
        .map(|(name, value)| ColumnValue::new(name, value.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
    In,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::NotEq => "<>",
            FilterOperator::Lt => "<",
            FilterOperator::Gt => ">",
            FilterOperator::Le => "<=",
            FilterOperator::Ge => ">=",
            FilterOperator::Like => "LIKE",
            FilterOperator::In => "IN",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Case-insensitive, surrounding whitespace ignored; `!=` is accepted for `<>`.
    pub fn parse(s: &str) -> Result<Self, CrudError> {
        let normalized = s.trim().split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "=" => Ok(FilterOperator::Eq),
            "<>" | "!=" => Ok(FilterOperator::NotEq),
            "<" => Ok(FilterOperator::Lt),
            ">" => Ok(FilterOperator::Gt),
            "<=" => Ok(FilterOperator::Le),
            ">=" => Ok(FilterOperator::Ge),
            "LIKE" => Ok(FilterOperator::Like),
            "IN" => Ok(FilterOperator::In),
            "IS NULL" => Ok(FilterOperator::IsNull),
            "IS NOT NULL" => Ok(FilterOperator::IsNotNull),
            _ => Err(CrudError::InvalidOperator(s.to_string())),
        }
    }

    fn is_null_check(&self) -> bool {
        matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column: Identifier,
    operator: FilterOperator,
    value: FieldValue,
    values: Vec<FieldValue>,
    value_type: ValueType,
}

impl Filter {
    /// Comparison filter. `IN` and the null checks have their own constructors.
    pub fn new(column: &str, operator: FilterOperator, value: impl Into<FieldValue>) -> Result<Self, CrudError> {
        Self::build(column, operator, value.into(), None)
    }

    /// Comparison filter with a declared value type. Rejected for `IN` and
    /// the null checks, whose rendering ignores the type.
    pub fn typed(
        column: &str,
        operator: FilterOperator,
        value: impl Into<FieldValue>,
        value_type: ValueType,
    ) -> Result<Self, CrudError> {
        Self::build(column, operator, value.into(), Some(value_type))
    }

    /// Operator given as text, e.g. from a query string.
    pub fn parse(column: &str, operator: &str, value: impl Into<FieldValue>) -> Result<Self, CrudError> {
        let operator = FilterOperator::parse(operator)?;
        match operator {
            FilterOperator::IsNull => Self::is_null(column),
            FilterOperator::IsNotNull => Self::is_not_null(column),
            FilterOperator::In => Self::in_list(column, vec![value.into()]),
            op => Self::build(column, op, value.into(), None),
        }
    }

    fn build(
        column: &str,
        operator: FilterOperator,
        value: FieldValue,
        value_type: Option<ValueType>,
    ) -> Result<Self, CrudError> {
        if value_type.is_some() && (operator.is_null_check() || operator == FilterOperator::In) {
            return Err(CrudError::InvalidValue {
                column: column.to_string(),
                reason: format!("{} does not take an explicit value type", operator.as_str()),
            });
        }
        if operator.is_null_check() {
            return Self::null_check(column, operator);
        }
        if operator == FilterOperator::In {
            return Self::in_list(column, vec![value]);
        }
        let column = validate_identifier(column)?;
        let value_type = checked_type(&column, &value, value_type)?;
        Ok(Self { column, operator, value, values: Vec::new(), value_type })
    }

    pub fn in_list(column: &str, values: Vec<FieldValue>) -> Result<Self, CrudError> {
        let column = validate_identifier(column)?;
        if values.is_empty() {
            return Err(CrudError::InvalidValue {
                column: column.to_string(),
                reason: "IN requires at least one value".to_string(),
            });
        }
        Ok(Self {
            column,
            operator: FilterOperator::In,
            value: FieldValue::Null,
            values,
            value_type: ValueType::String,
        })
    }

    pub fn is_null(column: &str) -> Result<Self, CrudError> {
        Self::null_check(column, FilterOperator::IsNull)
    }

    pub fn is_not_null(column: &str) -> Result<Self, CrudError> {
        Self::null_check(column, FilterOperator::IsNotNull)
    }

    fn null_check(column: &str, operator: FilterOperator) -> Result<Self, CrudError> {
        Ok(Self {
            column: validate_identifier(column)?,
            operator,
            value: FieldValue::Null,
            values: Vec::new(),
            value_type: ValueType::String,
        })
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    fn render(&self) -> String {
        let value = if self.operator.is_null_check() || self.operator == FilterOperator::In {
            "NULL".to_string()
        } else {
            render_value(&self.value)
        };
        let values = if self.values.is_empty() {
            "ARRAY[]::text[]".to_string()
        } else {
            let items: Vec<String> = self.values.iter().map(render_value).collect();
            format!("ARRAY[{}]::text[]", items.join(", "))
        };
        format!(
            "ROW({}, '{}', {}, '{}', {})",
            quote_literal(self.column.as_str()),
            self.operator.as_str(),
            value,
            self.value_type.as_str(),
            values
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CrudError> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(CrudError::InvalidDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    column: Identifier,
    direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: &str, direction: SortDirection) -> Result<Self, CrudError> {
        Ok(Self { column: validate_identifier(column)?, direction })
    }

    pub fn asc(column: &str) -> Result<Self, CrudError> {
        Self::new(column, SortDirection::Asc)
    }

    pub fn desc(column: &str) -> Result<Self, CrudError> {
        Self::new(column, SortDirection::Desc)
    }

    /// `None` sorts ascending.
    pub fn parse(column: &str, direction: Option<&str>) -> Result<Self, CrudError> {
        let direction = direction.map(SortDirection::parse).transpose()?.unwrap_or_default();
        Self::new(column, direction)
    }
}

fn array(items: Vec<String>, element_type: &str) -> SqlFragment {
    if items.is_empty() {
        SqlFragment(format!("ARRAY[]::{}[]", element_type))
    } else {
        SqlFragment(format!("ARRAY[{}]::{}[]", items.join(", "), element_type))
    }
}

pub fn build_columns(columns: &[ColumnValue]) -> SqlFragment {
    let rows = columns
        .iter()
        .map(|c| {
            format!(
                "ROW({}, {}, '{}')",
                quote_literal(c.column.as_str()),
                render_value(&c.value),
                c.value_type.as_str()
            )
        })
        .collect();
    array(rows, "dyn_column")
}

pub fn build_filters(filters: &[Filter]) -> SqlFragment {
    array(filters.iter().map(Filter::render).collect(), "dyn_filter")
}

pub fn build_sort(sort: &[SortSpec]) -> SqlFragment {
    let rows = sort
        .iter()
        .map(|s| format!("ROW({}, '{}')", quote_literal(s.column.as_str()), s.direction.as_str()))
        .collect();
    array(rows, "dyn_sort")
}

pub fn build_projection(columns: &[Identifier]) -> SqlFragment {
    array(columns.iter().map(|c| quote_literal(c.as_str())).collect(), "text")
}
