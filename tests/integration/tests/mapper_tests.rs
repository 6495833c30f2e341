//! Integration tests for dynorm against DynamoDB Local
//!
//! Run with: DYNORM_ENDPOINT_URL=http://localhost:8000 cargo test
//!
//! Tables are shared between tests; each test works in its own partitions.

use dynorm::{
    delete, get, get_all_by_partition_key, get_all_by_partition_key_with_filter, put, query_page,
    scan_exhaustively, scan_with_expression, scan_with_limit, scan_with_table_name, value,
    with_cursor, with_descending_order, with_index, with_limit, Entity, Error, ExpressionBuilder,
    Key, Name, Page,
};
use dynorm_integration_tests::{
    fixtures::{unique_customer_id, Customer, Invoice, INVOICES_TABLE},
    LocalDynamo,
};
use pretty_assertions::assert_eq;

/// Helper to get a harness or skip test
async fn get_harness() -> Option<LocalDynamo> {
    if !dynorm_integration_tests::endpoint_configured() {
        eprintln!("Skipping: DYNORM_ENDPOINT_URL not set");
        return None;
    }
    Some(
        LocalDynamo::connect()
            .await
            .expect("Failed to connect to DynamoDB"),
    )
}

async fn seed_invoices(harness: &LocalDynamo, customer_id: &str, count: i64) -> Vec<Invoice> {
    let mut invoices = Vec::new();
    for n in 1..=count {
        let status = if n % 2 == 0 { "paid" } else { "open" };
        let invoice = Invoice::new(customer_id, n, n * 1000, status);
        put(harness.client(), &invoice)
            .await
            .expect("Failed to put invoice");
        invoices.push(invoice);
    }
    invoices
}

// ============================================================================
// Single-item Tests
// ============================================================================

#[tokio::test]
async fn test_put_then_get() {
    let Some(harness) = get_harness().await else { return };

    let customer = Customer::new(&unique_customer_id(), "Ada");
    put(harness.client(), &customer)
        .await
        .expect("Failed to put customer");

    let mut loaded = Customer {
        customer_id: customer.customer_id.clone(),
        ..Default::default()
    };
    get(harness.client(), &mut loaded)
        .await
        .expect("Failed to get customer");

    assert_eq!(loaded, customer);

    // Cleanup
    let _ = delete(harness.client(), &customer).await;
}

#[tokio::test]
async fn test_get_composite_key() {
    let Some(harness) = get_harness().await else { return };

    let customer_id = unique_customer_id();
    let invoices = seed_invoices(&harness, &customer_id, 2).await;

    let mut loaded = Invoice {
        customer_id: customer_id.clone(),
        invoice_no: 2,
        ..Default::default()
    };
    get(harness.client(), &mut loaded)
        .await
        .expect("Failed to get invoice");

    assert_eq!(loaded, invoices[1]);
}

#[tokio::test]
async fn test_get_missing_item() {
    let Some(harness) = get_harness().await else { return };

    let mut missing = Customer::new(&unique_customer_id(), "Nobody");
    let result = get(harness.client(), &mut missing).await;

    assert_eq!(result, Err(Error::ItemNotFound));
}

#[tokio::test]
async fn test_put_overwrites() {
    let Some(harness) = get_harness().await else { return };

    let mut customer = Customer::new(&unique_customer_id(), "Grace");
    put(harness.client(), &customer).await.unwrap();
    customer.name = "Grace Hopper".to_string();
    put(harness.client(), &customer).await.unwrap();

    let mut loaded = customer.clone();
    loaded.name.clear();
    get(harness.client(), &mut loaded).await.unwrap();
    assert_eq!(loaded.name, "Grace Hopper");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let Some(harness) = get_harness().await else { return };

    let customer = Customer::new(&unique_customer_id(), "Linus");
    put(harness.client(), &customer).await.unwrap();

    delete(harness.client(), &customer)
        .await
        .expect("Failed to delete customer");
    delete(harness.client(), &customer)
        .await
        .expect("Deleting a missing item should succeed");

    let mut loaded = customer.clone();
    assert!(get(harness.client(), &mut loaded)
        .await
        .unwrap_err()
        .is_not_found());
}

// ============================================================================
// Query Tests
// ============================================================================

#[tokio::test]
async fn test_get_all_by_partition_key() {
    let Some(harness) = get_harness().await else { return };

    let customer_id = unique_customer_id();
    let invoices = seed_invoices(&harness, &customer_id, 4).await;

    let meta = invoices[0].meta_info();
    let loaded: Vec<Invoice> = get_all_by_partition_key(harness.client(), &meta, vec![])
        .await
        .expect("Failed to query invoices");

    assert_eq!(loaded, invoices);

    let descending: Vec<Invoice> =
        get_all_by_partition_key(harness.client(), &meta, vec![with_descending_order()])
            .await
            .unwrap();
    assert_eq!(descending.first().map(|i| i.invoice_no), Some(4));
}

#[tokio::test]
async fn test_query_through_index() {
    let Some(harness) = get_harness().await else { return };

    let customer = Customer::new(&unique_customer_id(), "Barbara");
    put(harness.client(), &customer).await.unwrap();

    let probe = Customer {
        email: customer.email.clone(),
        ..Default::default()
    };
    let found: Vec<Customer> =
        get_all_by_partition_key(harness.client(), &probe.meta_info(), vec![with_index(&probe)])
            .await
            .expect("Failed to query index");

    assert_eq!(found, vec![customer.clone()]);

    // Cleanup
    let _ = delete(harness.client(), &customer).await;
}

#[tokio::test]
async fn test_query_with_filter() {
    let Some(harness) = get_harness().await else { return };

    let customer_id = unique_customer_id();
    let invoices = seed_invoices(&harness, &customer_id, 5).await;

    let expr = ExpressionBuilder::new()
        .with_key_condition(
            Key::new("customer_id")
                .equal(value(&customer_id))
                .and(Key::new("invoice_no").greater_than(value(1))),
        )
        .with_filter(Name::new("status").equal(value("open")))
        .build()
        .unwrap();

    let open: Vec<Invoice> =
        get_all_by_partition_key_with_filter(harness.client(), &invoices[0].meta_info(), &expr)
            .await
            .expect("Failed to query with filter");

    let numbers: Vec<i64> = open.iter().map(|i| i.invoice_no).collect();
    assert_eq!(numbers, vec![3, 5]);
}

#[tokio::test]
async fn test_query_pages_with_cursor() {
    let Some(harness) = get_harness().await else { return };

    let customer_id = unique_customer_id();
    let invoices = seed_invoices(&harness, &customer_id, 3).await;
    let meta = invoices[0].meta_info();

    let mut seen = Vec::new();
    let mut page: Page<Invoice> = query_page(harness.client(), &meta, vec![with_limit(2)])
        .await
        .unwrap();
    seen.extend(page.items.iter().map(|i| i.invoice_no));

    while let Some(cursor) = page.cursor.take() {
        page = query_page(harness.client(), &meta, vec![with_limit(2), with_cursor(&cursor)])
            .await
            .unwrap();
        seen.extend(page.items.iter().map(|i| i.invoice_no));
    }

    assert_eq!(seen, vec![1, 2, 3]);
}

// ============================================================================
// Scan Tests
// ============================================================================

#[tokio::test]
async fn test_scan_exhaustively_follows_pages() {
    let Some(harness) = get_harness().await else { return };

    let customer_id = unique_customer_id();
    seed_invoices(&harness, &customer_id, 5).await;

    let expr = ExpressionBuilder::new()
        .with_filter(Name::new("customer_id").equal(value(&customer_id)))
        .build()
        .unwrap();

    let items = scan_exhaustively(
        harness.client(),
        &[
            scan_with_table_name(INVOICES_TABLE),
            scan_with_expression(&expr),
            scan_with_limit(2),
        ],
    )
    .await
    .expect("Failed to scan invoices");

    assert_eq!(items.len(), 5);
}

#[tokio::test]
async fn test_scan_missing_table_fails() {
    let Some(harness) = get_harness().await else { return };

    let result = scan_exhaustively(
        harness.client(),
        &[scan_with_table_name("dynorm-no-such-table")],
    )
    .await;

    assert!(matches!(result, Err(Error::Database(_))));
}
