//! dynorm Core Library
//!
//! Typed entity mapping over DynamoDB tables:
//! - Entity contract and key metadata
//! - Expression building
//! - Point, query and scan operations
//! - Exhaustive and cursor-based pagination
//! - Error types

pub mod client;
pub mod config;
pub mod dynamo;
pub mod entity;
pub mod errors;
pub mod expression;
pub mod page;
pub mod scan;

#[cfg(test)]
mod testing;

pub use client::{Item, ItemPage, StoreClient};
pub use config::Config;
pub use dynamo::{
    delete, get, get_all_by_partition_key, get_all_by_partition_key_with_filter, put, query_page,
    scan, with_cursor, with_descending_order, with_index, with_limit, QueryOption,
};
pub use entity::{Entity, MetaInfo, SecondaryIndex, SortKeyValue};
pub use errors::{Error, Result};
pub use expression::{
    and_conditions, create_expression, value, Condition, Expression, ExpressionBuilder, Key,
    KeyCondition, Name, Operand,
};
pub use page::{Cursor, Page};
pub use scan::{
    scan_exhaustively, scan_exhaustively_bounded, scan_with_expression,
    scan_with_expression_attribute_names, scan_with_expression_attribute_values,
    scan_with_filter_expression, scan_with_limit, scan_with_projection, scan_with_table_name,
    ScanOption,
};
