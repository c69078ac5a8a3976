//! End-to-end runs of the monthly trend pack.
//!
//! The in-memory runs pin down QA and gating behaviour on hand-built
//! tables; the SQLite run exercises the real extractor and file layout.

use std::sync::Arc;

use tempfile::TempDir;
use trend_core::{FindingKind, Scalar, Table, Topic, TrendError};
use trend_extract::MemorySource;
use trend_pipeline::{ChartSpec, FsArtifactStore, JsonChartBackend, PipelineConfig, PipelineRunner};
use trend_quality::QaProfile;

fn orders(rows: &[(&str, i64, i64)]) -> Table {
    let rows = rows
        .iter()
        .map(|(month, total, delivered)| {
            vec![
                Scalar::from(*month),
                Scalar::Int(*total),
                Scalar::Int(*delivered),
                Scalar::Float((10000.0 * *delivered as f64 / *total as f64).round() / 100.0),
            ]
        })
        .collect();
    Table::from_rows(
        ["purchase_month", "total_orders", "delivered_orders", "delivered_rate_pct"],
        rows,
    )
    .unwrap()
}

fn revenue(months: &[&str]) -> Table {
    let rows = months
        .iter()
        .map(|m| vec![Scalar::from(*m), Scalar::Int(150), Scalar::Float(12500.5)])
        .collect();
    Table::from_rows(["purchase_month", "delivered_orders", "revenue"], rows).unwrap()
}

fn reviews(months: &[&str]) -> Table {
    let mut rows = Vec::new();
    for m in months {
        rows.push(vec![Scalar::from(*m), Scalar::Int(0), Scalar::Int(200), Scalar::Float(4.5)]);
        rows.push(vec![Scalar::from(*m), Scalar::Int(1), Scalar::Int(40), Scalar::Float(3.0)]);
    }
    Table::from_rows(
        ["purchase_month", "is_late", "review_count", "avg_review_score"],
        rows,
    )
    .unwrap()
}

fn late_rate(months: &[&str]) -> Table {
    let rows = months
        .iter()
        .map(|m| vec![Scalar::from(*m), Scalar::Int(150), Scalar::Int(15), Scalar::Float(10.0)])
        .collect();
    Table::from_rows(
        ["purchase_month", "delivered_orders", "late_delivered_orders", "late_delivery_rate_pct"],
        rows,
    )
    .unwrap()
}

fn source_with_orders(orders_table: Table) -> MemorySource {
    let months = ["2021-01", "2021-02", "2021-03", "2021-04"];
    MemorySource::new()
        .with_table("01_orders_per_month", orders_table)
        .with_table("02_revenue_per_month", revenue(&months))
        .with_table("03_review_score_by_delivery", reviews(&months))
        .with_table("04_late_delivery_rate_by_month", late_rate(&months))
}

fn runner(source: MemorySource, out: &TempDir) -> PipelineRunner {
    PipelineRunner::new(
        Arc::new(source),
        Box::new(FsArtifactStore::new(out.path())),
        QaProfile::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_gap_and_low_volume_month() {
    let out = TempDir::new().unwrap();
    let source = source_with_orders(orders(&[
        ("2021-01", 120, 110),
        ("2021-02", 50, 45),
        ("2021-04", 130, 118),
    ]));

    let outcome = runner(source, &out)
        .with_backend(Box::new(JsonChartBackend))
        .run()
        .await
        .unwrap();
    let findings = outcome.context.findings();

    let gaps: Vec<_> = findings.iter().filter(|f| f.kind == FindingKind::MonthGap).collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].label, "orders/month");
    assert_eq!(
        gaps[0].message,
        "possible missing months: gap before 2021-04-01 = 59 days"
    );

    let dropped: Vec<_> = findings.iter().filter(|f| f.kind == FindingKind::DroppedRows).collect();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].count, 1);

    let qa_notes = outcome
        .report
        .split("## QA Notes")
        .nth(1)
        .and_then(|rest| rest.split("## Charts").next())
        .unwrap();
    assert!(qa_notes.contains(&gaps[0].to_string()));
    assert!(qa_notes.contains(&dropped[0].to_string()));

    let bytes = std::fs::read(out.path().join("charts/01_orders_per_month.json")).unwrap();
    let spec: ChartSpec = serde_json::from_slice(&bytes).unwrap();
    for series in &spec.series {
        let xs: Vec<&str> = series.points.iter().map(|p| p.x.as_str()).collect();
        assert_eq!(xs, vec!["2021-01", "2021-04"]);
    }
}

#[tokio::test]
async fn test_clean_run_writes_every_artifact() {
    let out = TempDir::new().unwrap();
    let source = source_with_orders(orders(&[
        ("2021-01", 120, 110),
        ("2021-02", 140, 120),
        ("2021-03", 160, 150),
        ("2021-04", 130, 118),
    ]));

    let outcome = runner(source, &out).run().await.unwrap();
    assert!(outcome.context.findings().is_empty());

    for path in [
        "csv/01_orders_per_month.csv",
        "csv/02_revenue_per_month.csv",
        "csv/03_review_score_by_delivery.csv",
        "csv/04_late_delivery_rate_by_month.csv",
        "charts/01_orders_per_month.png",
        "charts/02_revenue_per_month.png",
        "charts/03_review_score_by_delivery.png",
        "charts/04_late_delivery_rate_by_month.png",
        "reports/monthly_trend_report.md",
        "reports/run_summary.json",
    ] {
        assert!(out.path().join(path).is_file(), "missing {}", path);
    }

    let chart = std::fs::read(out.path().join("charts/02_revenue_per_month.png")).unwrap();
    assert!(chart.starts_with(b"\x89PNG"));

    let report =
        std::fs::read_to_string(out.path().join("reports/monthly_trend_report.md")).unwrap();
    assert_eq!(report, outcome.report);
    assert!(report.contains("Chart: `charts/01_orders_per_month.png`"));
    assert!(report.contains("## QA Notes\n- (none)"));
    assert!(!report.contains(&outcome.context.run_id));

    let topics: Vec<Topic> = outcome.context.insights().iter().map(|i| i.topic).collect();
    assert_eq!(topics, vec![Topic::Orders, Topic::Reviews]);
    assert!(report.contains("On-time minus late average review score: mean 1.500"));

    let summary: serde_json::Value = serde_json::from_slice(
        &std::fs::read(out.path().join("reports/run_summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["run_id"], outcome.context.run_id.as_str());
    assert_eq!(summary["thresholds"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_reports_are_identical_across_runs() {
    let build = || {
        source_with_orders(orders(&[
            ("2021-01", 120, 110),
            ("2021-02", 50, 45),
            ("2021-04", 130, 118),
        ]))
    };
    let first_out = TempDir::new().unwrap();
    let second_out = TempDir::new().unwrap();

    let first = runner(build(), &first_out).run().await.unwrap();
    let second = runner(build(), &second_out).run().await.unwrap();
    assert_ne!(first.context.run_id, second.context.run_id);
    assert_eq!(first.report, second.report);
}

#[tokio::test]
async fn test_schema_violation_aborts_without_report() {
    let out = TempDir::new().unwrap();
    let broken = Table::from_rows(
        ["purchase_month", "total_orders"],
        vec![vec!["2021-01".into(), Scalar::Int(5)]],
    )
    .unwrap();

    let err = runner(source_with_orders(broken), &out).run().await.unwrap_err();
    let finding = err.finding().unwrap();
    assert_eq!(finding.label, "orders/month");
    assert!(finding.message.contains("delivered_orders"));
    assert!(!out.path().join("reports/monthly_trend_report.md").exists());
}

#[tokio::test]
async fn test_sqlite_run_from_config() {
    let data = TempDir::new().unwrap();
    let conn = rusqlite_fixture(&data);
    drop(conn);

    let out = data.path().join("outputs");
    let config = PipelineConfig::from_lookup(|key| match key {
        "DB_HOST" => Some(data.path().to_string_lossy().into_owned()),
        "DB_NAME" => Some("olist.sqlite3".to_string()),
        "DB_USER" => Some("analyst".to_string()),
        "DB_PASSWORD" => Some("secret".to_string()),
        "TREND_OUTPUT_DIR" => Some(out.to_string_lossy().into_owned()),
        _ => None,
    })
    .unwrap();

    let outcome = PipelineRunner::from_config(&config).unwrap().run().await.unwrap();

    let csv = std::fs::read_to_string(out.join("csv/01_orders_per_month.csv")).unwrap();
    assert_eq!(
        csv.lines().next(),
        Some("purchase_month,total_orders,delivered_orders,delivered_rate_pct")
    );
    assert_eq!(csv.lines().count(), 3);

    // Two tiny months: every chart gate drops everything
    assert!(outcome.context.insights().is_empty());
    assert!(outcome
        .context
        .findings()
        .iter()
        .any(|f| f.kind == FindingKind::EmptyComparison));
    assert!(out.join("reports/monthly_trend_report.md").is_file());
}

#[tokio::test]
async fn test_missing_database_is_source_error() {
    let data = TempDir::new().unwrap();
    let config = PipelineConfig::from_lookup(|key| match key {
        "DB_HOST" => Some(data.path().to_string_lossy().into_owned()),
        "DB_NAME" => Some("absent.sqlite3".to_string()),
        "DB_USER" | "DB_PASSWORD" => Some("x".to_string()),
        "TREND_OUTPUT_DIR" => Some(data.path().join("out").to_string_lossy().into_owned()),
        _ => None,
    })
    .unwrap();

    let err = PipelineRunner::from_config(&config).unwrap().run().await.unwrap_err();
    assert!(matches!(err, TrendError::SourceError(_)));
}

fn rusqlite_fixture(dir: &TempDir) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open(dir.path().join("olist.sqlite3")).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE v_orders_clean (
            order_id TEXT PRIMARY KEY,
            order_status TEXT,
            order_purchase_timestamp TEXT,
            is_late INTEGER
        );
        CREATE TABLE v_payments_clean (order_id TEXT, payment_value REAL);
        CREATE TABLE v_reviews_clean (order_id TEXT, review_score INTEGER);

        INSERT INTO v_orders_clean VALUES
            ('a', 'delivered', '2021-01-03 10:00:00', 0),
            ('b', 'delivered', '2021-01-09 11:00:00', 1),
            ('c', 'canceled',  '2021-01-20 12:00:00', NULL),
            ('d', 'delivered', '2021-02-02 09:00:00', 0);
        INSERT INTO v_payments_clean VALUES ('a', 10.5), ('b', 20.0), ('d', 7.25);
        INSERT INTO v_reviews_clean VALUES ('a', 5), ('b', 2), ('d', 4);
        "#,
    )
    .unwrap();
    conn
}
