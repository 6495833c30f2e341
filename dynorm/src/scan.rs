//! Exhaustive scan
//!
//! Follows the store's continuation key page by page until it reports no
//! more pages, returning raw items. Pages are fetched strictly in sequence
//! and any failed page fails the whole scan.

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use tracing::{debug, error, warn};

use crate::client::{Item, ScanRequest, StoreClient};
use crate::errors::{Error, Result};
use crate::expression::Expression;

/// Mutation applied to every page request of a scan
pub struct ScanOption(Box<dyn Fn(&mut ScanRequest) + Send + Sync>);

impl ScanOption {
    /// Wrap a closure run against each page request
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ScanRequest) + Send + Sync + 'static,
    {
        Self(Box::new(f))
    }

    fn apply(&self, request: &mut ScanRequest) {
        (self.0)(request)
    }
}

/// Raw filter expression text, e.g. `#s = :active`
pub fn scan_with_filter_expression(filter: impl Into<String>) -> ScanOption {
    let filter = filter.into();
    ScanOption::new(move |request| request.filter_expression = Some(filter.clone()))
}

/// Table to scan
pub fn scan_with_table_name(table_name: impl Into<String>) -> ScanOption {
    let table_name = table_name.into();
    ScanOption::new(move |request| request.table_name = Some(table_name.clone()))
}

/// Raw projection expression text
pub fn scan_with_projection(projection: impl Into<String>) -> ScanOption {
    let projection = projection.into();
    ScanOption::new(move |request| request.projection_expression = Some(projection.clone()))
}

/// Name aliases referenced by the filter or projection
pub fn scan_with_expression_attribute_names(names: HashMap<String, String>) -> ScanOption {
    ScanOption::new(move |request| request.expression_attribute_names = Some(names.clone()))
}

/// Value aliases referenced by the filter
pub fn scan_with_expression_attribute_values(values: HashMap<String, AttributeValue>) -> ScanOption {
    ScanOption::new(move |request| request.expression_attribute_values = Some(values.clone()))
}

/// Cap the number of items evaluated per page
pub fn scan_with_limit(limit: i32) -> ScanOption {
    ScanOption::new(move |request| request.limit = Some(limit))
}

/// Filter, projection and aliases of a built expression in one option
///
/// Any key condition on the expression is ignored; scans have none.
pub fn scan_with_expression(expression: &Expression) -> ScanOption {
    let filter = expression.filter().map(str::to_string);
    let projection = expression.projection().map(str::to_string);
    let names = expression.expression_attribute_names();
    let values = expression.expression_attribute_values();
    ScanOption::new(move |request| {
        request.filter_expression = filter.clone();
        request.projection_expression = projection.clone();
        request.expression_attribute_names = names.clone();
        request.expression_attribute_values = values.clone();
    })
}

/// Scan until the store returns no continuation key
///
/// There is no page ceiling; see [`scan_exhaustively_bounded`] for one.
/// On error, items from earlier pages are discarded.
pub async fn scan_exhaustively<C: StoreClient>(client: &C, options: &[ScanOption]) -> Result<Vec<Item>> {
    scan_pages(client, None, options).await
}

/// Like [`scan_exhaustively`], but gives up with
/// [`Error::PageLimitExceeded`] once `max_pages` pages were read and the store
/// still reports more.
///
/// `max_pages` must be at least one.
pub async fn scan_exhaustively_bounded<C: StoreClient>(
    client: &C,
    max_pages: usize,
    options: &[ScanOption],
) -> Result<Vec<Item>> {
    if max_pages == 0 {
        return Err(Error::Build("max_pages must be at least one".into()));
    }
    scan_pages(client, Some(max_pages), options).await
}

async fn scan_pages<C: StoreClient>(
    client: &C,
    max_pages: Option<usize>,
    options: &[ScanOption],
) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut last_evaluated_key: Option<Item> = None;
    let mut pages = 0usize;

    loop {
        if let Some(max) = max_pages {
            if pages >= max {
                warn!(max_pages = max, items = items.len(), "scan page limit reached");
                return Err(Error::PageLimitExceeded(max));
            }
        }

        let mut request = ScanRequest {
            exclusive_start_key: last_evaluated_key.take(),
            ..Default::default()
        };
        for option in options {
            option.apply(&mut request);
        }

        debug!(page = pages, table = request.table_name.as_deref().unwrap_or("-"), "scan page");
        let page = client.scan(request).await.map_err(|e| {
            error!(error = %e, page = pages, "error scanning table");
            e
        })?;
        pages += 1;

        items.extend(page.items);
        match page.last_evaluated_key {
            Some(key) if !key.is_empty() => last_evaluated_key = Some(key),
            _ => break,
        }
    }

    debug!(pages, items = items.len(), "scan complete");
    Ok(items)
}
