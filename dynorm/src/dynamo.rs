//! Entity operations
//!
//! Every operation derives its request from an entity's [`MetaInfo`]:
//!
//! | Operation                              | Request  | Pages |
//! |----------------------------------------|----------|-------|
//! | [`get`] / [`put`] / [`delete`]         | point    | -     |
//! | [`get_all_by_partition_key`]           | Query    | 1     |
//! | [`get_all_by_partition_key_with_filter`] | Query  | 1     |
//! | [`query_page`]                         | Query    | 1     |
//! | [`scan`]                               | Scan     | 1     |
//!
//! Single-page operations never follow a continuation key; use
//! [`query_page`] or [`crate::scan::scan_exhaustively`] for that.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_dynamo::{from_item, from_items, to_item};
use tracing::{debug, error};

use crate::client::{
    DeleteItemRequest, GetItemRequest, Item, ItemPage, PutItemRequest, QueryRequest, ScanRequest,
    StoreClient,
};
use crate::entity::{Entity, MetaInfo};
use crate::errors::{Error, Result};
use crate::expression::{create_expression, value, Expression, Key};
use crate::page::{Cursor, Page};

/// Mutation applied to a query request before it is sent
///
/// Options run in the order given; a later option overwrites whatever an
/// earlier one set on the same field.
pub struct QueryOption(Box<dyn FnOnce(&mut QueryRequest) -> Result<()> + Send>);

impl QueryOption {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut QueryRequest) -> Result<()> + Send + 'static,
    {
        Self(Box::new(f))
    }

    fn apply(self, request: &mut QueryRequest) -> Result<()> {
        (self.0)(request)
    }
}

/// Route the query through the entity's secondary index
///
/// Replaces the key condition, names and values with an equality on the
/// index key.
pub fn with_index<E: Entity>(entity: &E) -> QueryOption {
    let index = entity.meta_info().index;
    QueryOption::new(move |request| {
        let index = index.ok_or_else(|| Error::Build("entity has no secondary index".into()))?;
        let expr = create_expression(Key::new(index.key).equal(value(index.key_value)), vec![])?;

        request.index_name = Some(index.name);
        request.expression_attribute_names = expr.expression_attribute_names();
        request.expression_attribute_values = expr.expression_attribute_values();
        request.key_condition_expression = expr.key_condition().map(str::to_string);
        Ok(())
    })
}

/// Cap the number of items evaluated by the query
pub fn with_limit(limit: i32) -> QueryOption {
    QueryOption::new(move |request| {
        request.limit = Some(limit);
        Ok(())
    })
}

/// Resume after the key encoded in `cursor`
pub fn with_cursor(cursor: &Cursor) -> QueryOption {
    let key = cursor.to_key();
    QueryOption::new(move |request| {
        request.exclusive_start_key = Some(key?);
        Ok(())
    })
}

/// Return items in descending sort key order
pub fn with_descending_order() -> QueryOption {
    QueryOption::new(|request| {
        request.scan_index_forward = Some(false);
        Ok(())
    })
}

// =========================================================================
// Single-item Operations
// =========================================================================

/// Load the item addressed by `result`'s key into `result`
///
/// Returns [`Error::ItemNotFound`] when the table has no such item.
pub async fn get<C, T>(client: &C, result: &mut T) -> Result<()>
where
    C: StoreClient,
    T: Entity + DeserializeOwned,
{
    let meta = result.meta_info();
    debug!(table = %meta.table, "get item");

    let item = client
        .get_item(GetItemRequest {
            key: meta.key(),
            table_name: meta.table,
        })
        .await?
        .ok_or(Error::ItemNotFound)?;

    *result = from_item(item)?;
    Ok(())
}

/// Write the whole entity, replacing any item with the same key
pub async fn put<C, T>(client: &C, entity: &T) -> Result<()>
where
    C: StoreClient,
    T: Entity + Serialize,
{
    let item: Item = to_item(entity)?;
    let table_name = entity.meta_info().table;
    debug!(table = %table_name, "put item");

    client.put_item(PutItemRequest { table_name, item }).await
}

/// Delete the entity's item; deleting a missing item is not an error
pub async fn delete<C, T>(client: &C, entity: &T) -> Result<()>
where
    C: StoreClient,
    T: Entity,
{
    let meta = entity.meta_info();
    debug!(table = %meta.table, "delete item");

    client
        .delete_item(DeleteItemRequest {
            key: meta.key(),
            table_name: meta.table,
        })
        .await
}

// =========================================================================
// Collection Operations
// =========================================================================

/// Query request matching `meta`'s partition key, with `options` applied
pub fn partition_query(meta: &MetaInfo, options: Vec<QueryOption>) -> Result<QueryRequest> {
    let expr = create_expression(
        Key::new(meta.partition_key.as_str()).equal(value(meta.partition_key_value.as_str())),
        vec![],
    )?;

    let mut request = QueryRequest {
        table_name: meta.table.clone(),
        ..Default::default()
    };
    attach_expression(&mut request, &expr);

    for option in options {
        option.apply(&mut request)?;
    }
    Ok(request)
}

fn attach_expression(request: &mut QueryRequest, expr: &Expression) {
    request.expression_attribute_names = expr.expression_attribute_names();
    request.expression_attribute_values = expr.expression_attribute_values();
    request.key_condition_expression = expr.key_condition().map(str::to_string);
    request.filter_expression = expr.filter().map(str::to_string);
    request.projection_expression = expr.projection().map(str::to_string);
}

async fn send_query<C: StoreClient>(client: &C, request: QueryRequest) -> Result<ItemPage> {
    debug!(
        table = %request.table_name,
        index = request.index_name.as_deref().unwrap_or("-"),
        "query"
    );
    let table = request.table_name.clone();
    client.query(request).await.map_err(|e| {
        error!(error = %e, table = %table, "error querying table");
        e
    })
}

/// All items in `meta`'s partition, one page
pub async fn get_all_by_partition_key<C, T>(
    client: &C,
    meta: &MetaInfo,
    options: Vec<QueryOption>,
) -> Result<Vec<T>>
where
    C: StoreClient,
    T: DeserializeOwned,
{
    let request = partition_query(meta, options)?;
    let page = send_query(client, request).await?;
    Ok(from_items(page.items)?)
}

/// One page of `meta`'s partition plus the cursor for the next page
pub async fn query_page<C, T>(
    client: &C,
    meta: &MetaInfo,
    options: Vec<QueryOption>,
) -> Result<Page<T>>
where
    C: StoreClient,
    T: DeserializeOwned,
{
    let request = partition_query(meta, options)?;
    let page = send_query(client, request).await?;
    let cursor = page.next_key().map(Cursor::from_key).transpose()?;
    Ok(Page {
        items: from_items(page.items)?,
        cursor,
    })
}

/// Query `meta.table` with a caller-built expression, one page
///
/// The expression's key condition, filter, projection and aliases are
/// attached as they are.
pub async fn get_all_by_partition_key_with_filter<C, T>(
    client: &C,
    meta: &MetaInfo,
    expression: &Expression,
) -> Result<Vec<T>>
where
    C: StoreClient,
    T: DeserializeOwned,
{
    let mut request = QueryRequest {
        table_name: meta.table.clone(),
        ..Default::default()
    };
    attach_expression(&mut request, expression);

    let page = send_query(client, request).await?;
    Ok(from_items(page.items)?)
}

/// One unfiltered page of `meta.table`
pub async fn scan<C, T>(client: &C, meta: &MetaInfo) -> Result<Vec<T>>
where
    C: StoreClient,
    T: DeserializeOwned,
{
    debug!(table = %meta.table, "scan");
    let page = client
        .scan(ScanRequest {
            table_name: Some(meta.table.clone()),
            ..Default::default()
        })
        .await
        .map_err(|e| {
            error!(error = %e, table = %meta.table, "error scanning table");
            e
        })?;
    Ok(from_items(page.items)?)
}
