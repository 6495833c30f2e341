//! Store client capability
//!
//! The mapper talks to the store only through [`StoreClient`]. Requests and
//! responses are plain values so any client (the AWS SDK, DynamoDB Local, an
//! in-memory fake) can sit behind it. Retries, throttling and credentials
//! belong to the implementation.

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::future::Future;

use crate::errors::{Error, Result};

/// One item as an attribute map
pub type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetItemRequest {
    pub table_name: String,
    pub key: Item,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PutItemRequest {
    pub table_name: String,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteItemRequest {
    pub table_name: String,
    pub key: Item,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition_expression: Option<String>,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub expression_attribute_names: Option<HashMap<String, String>>,
    pub expression_attribute_values: Option<HashMap<String, AttributeValue>>,
    pub exclusive_start_key: Option<Item>,
    pub limit: Option<i32>,
    pub scan_index_forward: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanRequest {
    /// Left unset unless a scan option provides it
    pub table_name: Option<String>,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub expression_attribute_names: Option<HashMap<String, String>>,
    pub expression_attribute_values: Option<HashMap<String, AttributeValue>>,
    pub exclusive_start_key: Option<Item>,
    pub limit: Option<i32>,
}

/// One page of a query or scan
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Continuation key; `None` or empty when no pages remain
    pub last_evaluated_key: Option<Item>,
}

impl ItemPage {
    /// Continuation key if another page exists
    pub fn next_key(&self) -> Option<&Item> {
        self.last_evaluated_key.as_ref().filter(|key| !key.is_empty())
    }
}

/// Abstract key-value store client
pub trait StoreClient: Send + Sync {
    /// Returns `None` when no item matches the key
    fn get_item(&self, request: GetItemRequest) -> impl Future<Output = Result<Option<Item>>> + Send;

    fn put_item(&self, request: PutItemRequest) -> impl Future<Output = Result<()>> + Send;

    fn delete_item(&self, request: DeleteItemRequest) -> impl Future<Output = Result<()>> + Send;

    fn query(&self, request: QueryRequest) -> impl Future<Output = Result<ItemPage>> + Send;

    fn scan(&self, request: ScanRequest) -> impl Future<Output = Result<ItemPage>> + Send;
}

fn database_error<E: std::error::Error>(err: E) -> Error {
    Error::Database(DisplayErrorContext(err).to_string())
}

impl StoreClient for Client {
    fn get_item(&self, request: GetItemRequest) -> impl Future<Output = Result<Option<Item>>> + Send {
        async move {
            let result = Client::get_item(self)
                .table_name(request.table_name)
                .set_key(Some(request.key))
                .send()
                .await
                .map_err(database_error)?;

            Ok(result.item)
        }
    }

    fn put_item(&self, request: PutItemRequest) -> impl Future<Output = Result<()>> + Send {
        async move {
            Client::put_item(self)
                .table_name(request.table_name)
                .set_item(Some(request.item))
                .send()
                .await
                .map_err(database_error)?;

            Ok(())
        }
    }

    fn delete_item(&self, request: DeleteItemRequest) -> impl Future<Output = Result<()>> + Send {
        async move {
            Client::delete_item(self)
                .table_name(request.table_name)
                .set_key(Some(request.key))
                .send()
                .await
                .map_err(database_error)?;

            Ok(())
        }
    }

    fn query(&self, request: QueryRequest) -> impl Future<Output = Result<ItemPage>> + Send {
        async move {
            let result = Client::query(self)
                .table_name(request.table_name)
                .set_index_name(request.index_name)
                .set_key_condition_expression(request.key_condition_expression)
                .set_filter_expression(request.filter_expression)
                .set_projection_expression(request.projection_expression)
                .set_expression_attribute_names(request.expression_attribute_names)
                .set_expression_attribute_values(request.expression_attribute_values)
                .set_exclusive_start_key(request.exclusive_start_key)
                .set_limit(request.limit)
                .set_scan_index_forward(request.scan_index_forward)
                .send()
                .await
                .map_err(database_error)?;

            Ok(ItemPage {
                items: result.items.unwrap_or_default(),
                last_evaluated_key: result.last_evaluated_key,
            })
        }
    }

    fn scan(&self, request: ScanRequest) -> impl Future<Output = Result<ItemPage>> + Send {
        async move {
            let result = Client::scan(self)
                .set_table_name(request.table_name)
                .set_filter_expression(request.filter_expression)
                .set_projection_expression(request.projection_expression)
                .set_expression_attribute_names(request.expression_attribute_names)
                .set_expression_attribute_values(request.expression_attribute_values)
                .set_exclusive_start_key(request.exclusive_start_key)
                .set_limit(request.limit)
                .send()
                .await
                .map_err(database_error)?;

            Ok(ItemPage {
                items: result.items.unwrap_or_default(),
                last_evaluated_key: result.last_evaluated_key,
            })
        }
    }
}
