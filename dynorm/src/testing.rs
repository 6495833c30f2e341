//! In-memory store and sample entities for unit tests

use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::{ready, Future};
use std::sync::Mutex;

use crate::client::{
    DeleteItemRequest, GetItemRequest, Item, ItemPage, PutItemRequest, QueryRequest, ScanRequest,
    StoreClient,
};
use crate::entity::{Entity, MetaInfo};
use crate::errors::{Error, Result};

/// Store that keeps items per table for point operations and replays
/// scripted pages for queries and scans. Every request is recorded.
#[derive(Default)]
pub struct MemoryStore {
    key_schemas: HashMap<String, Vec<String>>,
    tables: Mutex<HashMap<String, Vec<Item>>>,
    pages: Mutex<VecDeque<Result<ItemPage>>>,
    gets: Mutex<Vec<GetItemRequest>>,
    deletes: Mutex<Vec<DeleteItemRequest>>,
    queries: Mutex<Vec<QueryRequest>>,
    scans: Mutex<Vec<ScanRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table and its primary key attributes
    pub fn with_table(mut self, table: &str, key_attributes: &[&str]) -> Self {
        self.key_schemas.insert(
            table.to_string(),
            key_attributes.iter().map(|k| k.to_string()).collect(),
        );
        self
    }

    /// Queue the response for the next query or scan
    pub fn push_page(&self, page: Result<ItemPage>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn items(&self, table: &str) -> Vec<Item> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    pub fn gets(&self) -> Vec<GetItemRequest> {
        self.gets.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<DeleteItemRequest> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().unwrap().clone()
    }

    pub fn scans(&self) -> Vec<ScanRequest> {
        self.scans.lock().unwrap().clone()
    }

    fn schema(&self, table: &str) -> Result<&Vec<String>> {
        self.key_schemas
            .get(table)
            .ok_or_else(|| Error::Database(format!("ResourceNotFoundException: {}", table)))
    }

    fn matches(schema: &[String], item: &Item, key: &Item) -> bool {
        schema.iter().all(|k| item.get(k) == key.get(k))
    }

    fn next_page(&self) -> Result<ItemPage> {
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Database("no scripted page".to_string())))
    }
}

impl StoreClient for MemoryStore {
    fn get_item(&self, request: GetItemRequest) -> impl Future<Output = Result<Option<Item>>> + Send {
        self.gets.lock().unwrap().push(request.clone());
        let result = self.schema(&request.table_name).map(|schema| {
            self.tables
                .lock()
                .unwrap()
                .get(&request.table_name)
                .and_then(|items| {
                    items
                        .iter()
                        .find(|item| Self::matches(schema, item, &request.key))
                        .cloned()
                })
        });
        ready(result)
    }

    fn put_item(&self, request: PutItemRequest) -> impl Future<Output = Result<()>> + Send {
        let result = self.schema(&request.table_name).map(|schema| {
            let mut tables = self.tables.lock().unwrap();
            let items = tables.entry(request.table_name.clone()).or_default();
            items.retain(|item| !Self::matches(schema, item, &request.item));
            items.push(request.item);
        });
        ready(result)
    }

    fn delete_item(&self, request: DeleteItemRequest) -> impl Future<Output = Result<()>> + Send {
        self.deletes.lock().unwrap().push(request.clone());
        let result = self.schema(&request.table_name).map(|schema| {
            if let Some(items) = self.tables.lock().unwrap().get_mut(&request.table_name) {
                items.retain(|item| !Self::matches(schema, item, &request.key));
            }
        });
        ready(result)
    }

    fn query(&self, request: QueryRequest) -> impl Future<Output = Result<ItemPage>> + Send {
        self.queries.lock().unwrap().push(request);
        ready(self.next_page())
    }

    fn scan(&self, request: ScanRequest) -> impl Future<Output = Result<ItemPage>> + Send {
        self.scans.lock().unwrap().push(request);
        ready(self.next_page())
    }
}

pub fn item(pairs: &[(&str, AttributeValue)]) -> Item {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

pub fn n(value: i64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

/// Partition-only entity with an email index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Entity for User {
    fn meta_info(&self) -> MetaInfo {
        MetaInfo::new("users", "id", &self.id).with_index("email-index", "email", &self.email)
    }
}

/// Entity with a numeric sort key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Order {
    pub customer_id: String,
    pub order_no: i64,
    pub total: i64,
}

impl Entity for Order {
    fn meta_info(&self) -> MetaInfo {
        MetaInfo::new("orders", "customer_id", &self.customer_id)
            .with_sort_key("order_no", self.order_no)
    }
}

/// Entity with a string sort key and no index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Note {
    pub owner: String,
    pub slug: String,
    pub body: String,
}

impl Entity for Note {
    fn meta_info(&self) -> MetaInfo {
        MetaInfo::new("notes", "owner", &self.owner).with_sort_key("slug", self.slug.as_str())
    }
}

pub fn store() -> MemoryStore {
    MemoryStore::new()
        .with_table("users", &["id"])
        .with_table("orders", &["customer_id", "order_no"])
        .with_table("notes", &["owner", "slug"])
}
