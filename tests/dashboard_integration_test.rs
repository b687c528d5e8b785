use httpmock::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet};
use sheet_insight::core::analysis::{CannedAnalysisService, HttpAnalysisService};
use sheet_insight::core::ingest::{UploadedFile, XLSX_MEDIA_TYPE};
use sheet_insight::core::session::IngestOutcome;
use sheet_insight::{InsightEngine, InsightError, InsightPipeline, LocalStorage, SalesDashboard};
use std::io::Read;
use tempfile::TempDir;

/// 標題列 + 每月一列
fn sales_workbook(rows: &[(&str, f64, f64, f64, f64)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    let headers = ["month", "revenue", "units_sold", "profit_margin", "cost_of_goods"];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header).unwrap();
    }

    for (index, (month, revenue, units, margin, cost)) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, *month).unwrap();
        worksheet.write_number(row, 1, *revenue).unwrap();
        worksheet.write_number(row, 2, *units).unwrap();
        worksheet.write_number(row, 3, *margin).unwrap();
        worksheet.write_number(row, 4, *cost).unwrap();
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().unwrap()
}

fn read_entry(archive: &mut zip::ZipArchive<std::io::Cursor<Vec<u8>>>, name: &str) -> String {
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

#[tokio::test]
async fn test_end_to_end_dashboard_report() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let bytes = sales_workbook(&[
        ("Jan", 1000.0, 10.0, 20.0, 600.0),
        ("Feb", 2000.0, 20.0, 30.0, 1200.0),
    ]);

    let pipeline = InsightPipeline::new(
        LocalStorage::new(output_path.clone()),
        SalesDashboard::new(Box::new(CannedAnalysisService)),
    );
    let engine = InsightEngine::new_with_monitoring(pipeline, false);

    let result = engine.run(UploadedFile::new("sales.xlsx", bytes)).await;
    let report_path = result.unwrap();
    assert!(report_path.ends_with("sales_dashboard_report.zip"));

    let view = engine.session().view().await.unwrap();
    assert_eq!(view.sheet.records.len(), 2);
    assert!(view.sheet.records.iter().all(|r| r.data.len() == 5));
    assert!(view.sheet.records.iter().all(|r| r.get("__rowNum__").is_none()));
    assert_eq!(view.metrics.total_revenue, 3000.0);
    assert_eq!(view.metrics.total_units, 30.0);
    assert_eq!(view.metrics.average_margin_display(), "25.00");
    assert_eq!(view.file.media_type, XLSX_MEDIA_TYPE);

    let zip_data = std::fs::read(temp_dir.path().join("sales_dashboard_report.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 5);

    let csv = read_entry(&mut archive, "records.csv");
    assert_eq!(
        csv,
        "month,revenue,units_sold,profit_margin,cost_of_goods\nJan,1000,10,20,600\nFeb,2000,20,30,1200\n"
    );

    let metrics: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "metrics.json")).unwrap();
    assert_eq!(metrics["display"]["total_revenue"], "$3,000");
    assert_eq!(metrics["display"]["average_margin"], "25.00");

    let charts: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "charts.json")).unwrap();
    assert_eq!(charts[0]["spec"]["series"][0]["color"], "#3b82f6");
    assert_eq!(charts[1]["data"][1]["units_sold"], 20);

    let markdown = read_entry(&mut archive, "analysis.md");
    assert!(markdown.starts_with("**Monthly Sales Analysis for January 2021**"));

    let html = read_entry(&mut archive, "analysis.html");
    assert!(html.contains("<h3 class=\"text-base font-semibold text-blue-300 mt-4 mb-2\">Summary</h3>"));
    assert!(html.contains("<table"));
}

#[tokio::test]
async fn test_many_rows_decode_in_order() {
    let rows: Vec<(String, f64)> = (1..=40).map(|i| (format!("M{}", i), i as f64)).collect();

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.write_string(0, 0, "month").unwrap();
    worksheet.write_string(0, 1, "revenue").unwrap();
    for (i, (month, revenue)) in rows.iter().enumerate() {
        worksheet.write_string(i as u32 + 1, 0, month.as_str()).unwrap();
        worksheet.write_number(i as u32 + 1, 1, *revenue).unwrap();
    }
    workbook.push_worksheet(worksheet);
    let bytes = workbook.save_to_buffer().unwrap();

    let temp_dir = TempDir::new().unwrap();
    let engine = InsightEngine::new(InsightPipeline::new(
        LocalStorage::new(temp_dir.path().to_string_lossy()),
        SalesDashboard::new(Box::new(CannedAnalysisService)),
    ));
    engine
        .ingest(UploadedFile::new("long.xlsx", bytes))
        .await
        .unwrap();

    let view = engine.session().view().await.unwrap();
    assert_eq!(view.sheet.records.len(), 40);
    let months: Vec<String> = view
        .sheet
        .records
        .iter()
        .map(|r| r.text("month").unwrap())
        .collect();
    let expected: Vec<String> = rows.into_iter().map(|(m, _)| m).collect();
    assert_eq!(months, expected);
    assert_eq!(view.metrics.total_revenue, 820.0);
    assert_eq!(view.metrics.average_margin, None);
}

#[tokio::test]
async fn test_rejected_and_broken_uploads_keep_previous_dashboard() {
    let temp_dir = TempDir::new().unwrap();
    let engine = InsightEngine::new(InsightPipeline::new(
        LocalStorage::new(temp_dir.path().to_string_lossy()),
        SalesDashboard::new(Box::new(CannedAnalysisService)),
    ));

    let good = sales_workbook(&[("Jan", 1000.0, 10.0, 20.0, 600.0)]);
    engine
        .ingest(UploadedFile::new("sales.xlsx", good))
        .await
        .unwrap();

    let outcome = engine
        .session()
        .ingest(engine.pipeline(), UploadedFile::new("notes.txt", b"hello".to_vec()))
        .await;
    assert!(matches!(outcome, IngestOutcome::Rejected(_)));

    let err = engine
        .ingest(UploadedFile::new("broken.xlsx", b"not a workbook".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, InsightError::SpreadsheetDecodeError { .. }));

    let state = engine.session().snapshot().await;
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.file.unwrap().name, "sales.xlsx");
    assert_eq!(state.view.unwrap().metrics.total_revenue, 1000.0);
}

#[tokio::test]
async fn test_remote_analysis_service() {
    let server = MockServer::start();
    let analyze_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/analyze")
            .json_body(serde_json::json!([{"month": "Jan", "revenue": 1000}]));
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "analysis": {
                "model": "llama3",
                "created_at": "2024-11-01T10:00:00Z",
                "response": "## Overview\nRevenue held steady.",
                "done": true
            }
        }));
    });

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.write_string(0, 0, "month").unwrap();
    worksheet.write_string(0, 1, "revenue").unwrap();
    worksheet.write_string(1, 0, "Jan").unwrap();
    worksheet.write_number(1, 1, 1000.0).unwrap();
    workbook.push_worksheet(worksheet);
    let bytes = workbook.save_to_buffer().unwrap();

    let temp_dir = TempDir::new().unwrap();
    let engine = InsightEngine::new(InsightPipeline::new(
        LocalStorage::new(temp_dir.path().to_string_lossy()),
        SalesDashboard::new(Box::new(HttpAnalysisService::new(&server.base_url()))),
    ));
    engine
        .ingest(UploadedFile::new("sales.xlsx", bytes))
        .await
        .unwrap();

    analyze_mock.assert();
    let view = engine.session().view().await.unwrap();
    assert_eq!(view.analysis.analysis.response, "## Overview\nRevenue held steady.");
    assert_eq!(view.analysis.analysis.done_reason, None);
}

#[tokio::test]
async fn test_remote_analysis_server_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/analyze");
        then.status(503);
    });

    let temp_dir = TempDir::new().unwrap();
    let engine = InsightEngine::new(InsightPipeline::new(
        LocalStorage::new(temp_dir.path().to_string_lossy()),
        SalesDashboard::new(Box::new(HttpAnalysisService::new(&server.base_url()))),
    ));

    let err = engine
        .ingest(UploadedFile::new(
            "sales.xlsx",
            sales_workbook(&[("Jan", 1.0, 1.0, 1.0, 1.0)]),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Server error: 503 Service Unavailable");

    let state = engine.session().snapshot().await;
    assert!(state.view.is_none());
    assert_eq!(
        state.error.as_deref(),
        Some("Server error: 503 Service Unavailable")
    );
}

#[tokio::test]
async fn test_remote_analysis_failure_keeps_previous_dashboard() {
    let server = MockServer::start();
    let mut ok_mock = server.mock(|when, then| {
        when.method(POST).path("/api/analyze");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "analysis": {"model": "llama3", "created_at": "2024-11-01T10:00:00Z", "response": "Fine.", "done": true}
        }));
    });

    let temp_dir = TempDir::new().unwrap();
    let engine = InsightEngine::new(InsightPipeline::new(
        LocalStorage::new(temp_dir.path().to_string_lossy()),
        SalesDashboard::new(Box::new(HttpAnalysisService::new(&server.base_url()))),
    ));
    engine
        .ingest(UploadedFile::new(
            "jan.xlsx",
            sales_workbook(&[("Jan", 500.0, 5.0, 10.0, 300.0)]),
        ))
        .await
        .unwrap();

    ok_mock.delete();
    server.mock(|when, then| {
        when.method(POST).path("/api/analyze");
        then.status(503);
    });

    let err = engine
        .ingest(UploadedFile::new(
            "feb.xlsx",
            sales_workbook(&[("Feb", 700.0, 7.0, 12.0, 400.0)]),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, InsightError::ServerError { status: 503, .. }));

    let state = engine.session().snapshot().await;
    assert!(!state.loading);
    assert_eq!(
        state.error.as_deref(),
        Some("Server error: 503 Service Unavailable")
    );
    assert_eq!(state.file.unwrap().name, "jan.xlsx");
    assert_eq!(state.view.unwrap().metrics.total_revenue, 500.0);
}
