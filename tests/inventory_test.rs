//! Stock, kits, consumption reports and the dashboard counters.

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::{start_time, TestApp};
use cssd_api::{
    errors::ServiceError,
    models::{
        stock_item::NewStockItem, KitStatus, Priority, ProcessStatus, StockStatus,
        SterilizationProcess,
    },
    services::{
        consumption::{NewConsumptionRecord, ReportFilter},
        kits::KitDraft,
    },
};

fn stock(name: &str, quantity: i64, min_level: i64) -> NewStockItem {
    NewStockItem {
        name: name.to_string(),
        category: "Surgical Instruments".to_string(),
        quantity,
        location: "Shelf A1".to_string(),
        min_level,
    }
}

fn surgery(id: &str, dept: &str, date: &str, before: i64, after: i64) -> NewConsumptionRecord {
    NewConsumptionRecord {
        id: id.to_string(),
        surgery_type: "Appendectomy".to_string(),
        dept: dept.to_string(),
        date: date.parse::<NaiveDate>().ok(),
        before: Some(before),
        after: Some(after),
        used: None,
        items: "Basic Surgery Kit".to_string(),
    }
}

// ==================== Stock ====================

#[tokio::test]
async fn stock_status_follows_levels() {
    let app = TestApp::new();
    let stock_service = &app.services.stock;

    let forceps = stock_service.add(stock("Forceps", 40, 10)).await.unwrap();
    let clamps = stock_service.add(stock("Clamps", 5, 10)).await.unwrap();
    assert_eq!(forceps.id, "STK001");
    assert_eq!(forceps.status, StockStatus::InStock);
    assert_eq!(clamps.id, "STK002");
    assert_eq!(clamps.status, StockStatus::LowStock);

    let low: Vec<String> = stock_service
        .low_stock()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(low, vec!["STK002".to_string()]);

    let restocked = stock_service
        .update("STK002", stock("Clamps", 25, 10))
        .await
        .unwrap();
    assert_eq!(restocked.status, StockStatus::InStock);
    assert!(stock_service.low_stock().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_stock_input_is_rejected_before_writing() {
    let app = TestApp::new();

    let err = app.services.stock.add(stock("", -1, 10)).await.unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn items_in_a_running_process_show_in_sterilization() {
    let app = TestApp::new();
    app.services.stock.add(stock("Forceps", 40, 10)).await.unwrap();
    app.services.stock.add(stock("Retractors", 12, 4)).await.unwrap();
    app.seed(&[SterilizationProcess {
        id: "STE001".to_string(),
        machine: "Autoclave-1".to_string(),
        process: "Steam Sterilization".to_string(),
        item_id: "STK001".to_string(),
        start_time: Some(start_time()),
        end_time: None,
        status: ProcessStatus::InProgress,
        duration: 45,
        paused_at: None,
        paused_seconds: 0,
    }]);

    let rows = app.services.stock.list("").await.unwrap();

    assert_eq!(rows[0].status, StockStatus::InSterilization);
    assert_eq!(rows[1].status, StockStatus::InStock);
    // The stored row keeps its computed status
    let stored = app.store.stock_items.fetch("STK001").await.unwrap();
    assert_eq!(stored.status, StockStatus::InStock);
}

#[tokio::test]
async fn deleting_missing_stock_is_not_found() {
    let app = TestApp::new();
    app.services.stock.add(stock("Forceps", 40, 10)).await.unwrap();

    app.services.stock.delete("STK001").await.unwrap();

    assert_matches!(
        app.services.stock.delete("STK001").await,
        Err(ServiceError::NotFound(_))
    );
    assert!(app.services.stock.list("forceps").await.unwrap().is_empty());
}

// ==================== Kits ====================

#[tokio::test]
async fn kits_collapse_lines_and_start_active() {
    let app = TestApp::new();
    let mut draft = KitDraft::new("Basic Surgery Kit", "General Surgery", Priority::Medium);
    draft.add_line("Scalpel", "2").unwrap();
    draft.add_line("Forceps", "4").unwrap();

    let kit = app.services.kits.save(&mut draft).await.unwrap();

    assert_eq!(kit.id, "KIT001");
    assert_eq!(kit.items, "Scalpel, Forceps");
    assert_eq!(kit.quantity, 6);
    assert_eq!(kit.status, KitStatus::Active);
    assert!(draft.lines().is_empty());
    assert_eq!(app.services.kits.list("scalpel").await.unwrap().len(), 1);
}

#[tokio::test]
async fn kit_lines_need_a_name_first() {
    let mut draft = KitDraft::new("", "General Surgery", Priority::Low);

    let err = draft.add_line("Scalpel", "2").unwrap_err();

    assert_eq!(
        err.to_string(),
        "Validation error: missing required field: name"
    );
}

// ==================== Consumption ====================

#[tokio::test]
async fn consumption_report_filters_by_department_and_dates() {
    let app = TestApp::new();
    let consumption = &app.services.consumption;
    consumption.add(surgery("SURG001", "OR-1", "2024-06-03", 20, 13)).await.unwrap();
    consumption.add(surgery("SURG002", "OR-2", "2024-06-04", 15, 12)).await.unwrap();
    consumption.add(surgery("SURG003", "OR-1", "2024-06-11", 30, 25)).await.unwrap();

    let all = consumption.report(&ReportFilter::default()).await.unwrap();
    assert_eq!(all.total_surgeries, 3);
    assert_eq!(all.total_consumption, 15);
    assert_eq!(all.by_week.len(), 2);

    let or1_first_week = consumption
        .report(&ReportFilter {
            date_from: "2024-06-01".parse().ok(),
            date_to: "2024-06-07".parse().ok(),
            department: Some("or-1".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(or1_first_week.total_surgeries, 1);
    assert_eq!(or1_first_week.records[0].id, "SURG001");
    assert_eq!(or1_first_week.total_consumption, 7);
}

#[tokio::test]
async fn surgeries_are_recorded_once() {
    let app = TestApp::new();
    let consumption = &app.services.consumption;
    consumption.add(surgery("SURG001", "OR-1", "2024-06-03", 20, 13)).await.unwrap();

    let err = consumption
        .add(surgery("SURG001", "OR-1", "2024-06-03", 20, 10))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Conflict(_));
    assert_eq!(app.backend.len("consumptionRecords"), 1);
}

// ==================== Dashboard ====================

#[tokio::test]
async fn dashboard_counts_each_stage() {
    let app = TestApp::new();
    app.create_request("Cardiology", &[("Forceps", "5")]).await;
    app.approved_request("Neurology").await;
    let rejected = app.create_request("Oncology", &[("Clamps", "2")]).await;
    let receive_item = app.receive_item_for(&rejected.id).await;
    app.services.receiving.reject(&receive_item).await.unwrap();
    app.services.stock.add(stock("Clamps", 3, 10)).await.unwrap();

    let stats = app.services.dashboard.stats().await.unwrap();

    assert_eq!(stats.active_requests, 2);
    assert_eq!(stats.sterilization_in_progress, 0);
    assert_eq!(stats.items_ready, 0);
    assert_eq!(stats.low_stock_items, 1);
}
