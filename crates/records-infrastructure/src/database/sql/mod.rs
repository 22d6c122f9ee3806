//! SQL safety layer and dynamic statement builder
//!
//! Nothing user-controlled reaches a statement unless it went through
//! [`validate_identifier`], [`validate_table`] or the literal escaper, and
//! the only way to obtain a [`SqlFragment`] is through the builder.

pub mod identifier;
pub mod literal;
pub mod builder;

pub use identifier::{validate_identifier, validate_table, Identifier, Table};
pub use literal::{escape_like, escape_literal, infer_type, quote_literal, ValueType};
pub use builder::{
    build_columns, build_filters, build_projection, build_sort, column_values, ColumnValue,
    Filter, FilterOperator, SortDirection, SortSpec, SqlFragment,
};
