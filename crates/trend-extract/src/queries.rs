//! Metric query catalog
//!
//! Each query carries its SQL, named bind parameters, the metric
//! definitions it contributes to the report and the QA declarations its
//! result is checked against.

use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};
use trend_quality::DatasetChecks;

/// Column every trend query groups by
pub const PURCHASE_MONTH: &str = "purchase_month";

/// Order status counted as delivered
pub const DELIVERED_STATUS: &str = "delivered";

/// Value bound to a named query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindValue {
    Int(i64),
    Text(String),
}

impl ToSql for BindValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Int(i) => i.to_sql(),
            Self::Text(s) => s.to_sql(),
        }
    }
}

impl fmt::Display for BindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for BindValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// A declared extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    /// Output stem, e.g. `01_orders_per_month`
    pub id: String,
    /// QA label, e.g. `orders/month`
    pub label: String,
    pub sql: String,
    /// Named parameters including the leading colon
    pub params: Vec<(String, BindValue)>,
    /// `(metric, definition)` pairs for the report
    pub definitions: Vec<(String, String)>,
    pub checks: DatasetChecks,
}

impl MetricQuery {
    pub fn new(id: impl Into<String>, label: impl Into<String>, sql: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            checks: DatasetChecks::new(label.clone(), PURCHASE_MONTH),
            label,
            sql: sql.into(),
            params: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn define(mut self, metric: impl Into<String>, definition: impl Into<String>) -> Self {
        self.definitions.push((metric.into(), definition.into()));
        self
    }

    pub fn checks(mut self, checks: DatasetChecks) -> Self {
        self.checks = checks;
        self
    }

    pub fn csv_name(&self) -> String {
        format!("{}.csv", self.id)
    }
}

const ORDERS_PER_MONTH: &str = r#"
SELECT
    strftime('%Y-%m', order_purchase_timestamp) AS purchase_month,
    COUNT(*) AS total_orders,
    SUM(CASE WHEN order_status = :delivered_status THEN 1 ELSE 0 END) AS delivered_orders,
    ROUND(
        100.0 * SUM(CASE WHEN order_status = :delivered_status THEN 1 ELSE 0 END)
        / NULLIF(COUNT(*), 0),
        2
    ) AS delivered_rate_pct
FROM v_orders_clean
WHERE order_purchase_timestamp IS NOT NULL
GROUP BY purchase_month
ORDER BY purchase_month
"#;

const REVENUE_PER_MONTH: &str = r#"
SELECT
    strftime('%Y-%m', o.order_purchase_timestamp) AS purchase_month,
    COUNT(DISTINCT o.order_id) AS delivered_orders,
    ROUND(SUM(p.payment_value), 2) AS revenue
FROM v_orders_clean o
JOIN v_payments_clean p
    ON p.order_id = o.order_id
WHERE o.order_purchase_timestamp IS NOT NULL
  AND o.order_status = :delivered_status
GROUP BY purchase_month
ORDER BY purchase_month
"#;

const REVIEW_SCORE_BY_DELIVERY: &str = r#"
SELECT
    strftime('%Y-%m', o.order_purchase_timestamp) AS purchase_month,
    o.is_late AS is_late,
    COUNT(*) AS review_count,
    ROUND(AVG(r.review_score), 3) AS avg_review_score
FROM v_orders_clean o
JOIN v_reviews_clean r
    ON r.order_id = o.order_id
WHERE o.order_purchase_timestamp IS NOT NULL
  AND o.order_status = :delivered_status
  AND o.is_late IS NOT NULL
  AND r.review_score IS NOT NULL
GROUP BY purchase_month, o.is_late
ORDER BY purchase_month, o.is_late
"#;

const LATE_DELIVERY_RATE: &str = r#"
SELECT
    strftime('%Y-%m', order_purchase_timestamp) AS purchase_month,
    COUNT(*) AS delivered_orders,
    SUM(CASE WHEN is_late = 1 THEN 1 ELSE 0 END) AS late_delivered_orders,
    ROUND(
        100.0 * SUM(CASE WHEN is_late = 1 THEN 1 ELSE 0 END)
        / NULLIF(COUNT(*), 0),
        2
    ) AS late_delivery_rate_pct
FROM v_orders_clean
WHERE order_purchase_timestamp IS NOT NULL
  AND order_status = :delivered_status
  AND is_late IS NOT NULL
GROUP BY purchase_month
ORDER BY purchase_month
"#;

/// The four monthly trend queries, in output order.
pub fn monthly_trend_pack() -> Vec<MetricQuery> {
    vec![
        MetricQuery::new("01_orders_per_month", "orders/month", ORDERS_PER_MONTH)
            .bind(":delivered_status", DELIVERED_STATUS)
            .define("total_orders", "count of orders purchased in the month")
            .define("delivered_orders", "orders in the month whose status is delivered")
            .define("delivered_rate_pct", "100 * delivered_orders / total_orders, 2 decimals")
            .checks(
                DatasetChecks::new("orders/month", PURCHASE_MONTH)
                    .require([
                        PURCHASE_MONTH,
                        "total_orders",
                        "delivered_orders",
                        "delivered_rate_pct",
                    ])
                    .not_null([PURCHASE_MONTH]),
            ),
        MetricQuery::new("02_revenue_per_month", "revenue/month", REVENUE_PER_MONTH)
            .bind(":delivered_status", DELIVERED_STATUS)
            .define("revenue", "sum of payment values of delivered orders, 2 decimals")
            .checks(
                DatasetChecks::new("revenue/month", PURCHASE_MONTH)
                    .require([PURCHASE_MONTH, "delivered_orders", "revenue"])
                    .not_null([PURCHASE_MONTH, "revenue"])
                    .non_negative("revenue"),
            ),
        MetricQuery::new(
            "03_review_score_by_delivery",
            "reviews late vs on-time",
            REVIEW_SCORE_BY_DELIVERY,
        )
        .bind(":delivered_status", DELIVERED_STATUS)
        .define("review_count", "reviewed delivered orders per month and timeliness group")
        .define("avg_review_score", "mean review score (1-5) per group, 3 decimals")
        .checks(
            DatasetChecks::new("reviews late vs on-time", PURCHASE_MONTH)
                .require([PURCHASE_MONTH, "is_late", "review_count", "avg_review_score"])
                .not_null([PURCHASE_MONTH, "is_late"])
                .grain(["is_late"]),
        ),
        MetricQuery::new(
            "04_late_delivery_rate_by_month",
            "late rate/month",
            LATE_DELIVERY_RATE,
        )
        .bind(":delivered_status", DELIVERED_STATUS)
        .define("late_delivered_orders", "delivered orders that arrived after the estimated date")
        .define(
            "late_delivery_rate_pct",
            "100 * late_delivered_orders / delivered_orders, 2 decimals",
        )
        .checks(
            DatasetChecks::new("late rate/month", PURCHASE_MONTH)
                .require([
                    PURCHASE_MONTH,
                    "delivered_orders",
                    "late_delivered_orders",
                    "late_delivery_rate_pct",
                ])
                .not_null([PURCHASE_MONTH]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_order_and_ids() {
        let ids: Vec<String> = monthly_trend_pack().into_iter().map(|q| q.id).collect();
        assert_eq!(
            ids,
            vec![
                "01_orders_per_month",
                "02_revenue_per_month",
                "03_review_score_by_delivery",
                "04_late_delivery_rate_by_month",
            ]
        );
    }

    #[test]
    fn test_params_are_declared_in_sql() {
        for query in monthly_trend_pack() {
            for (name, _) in &query.params {
                assert!(query.sql.contains(name.as_str()), "{} missing {}", query.id, name);
            }
        }
    }

    #[test]
    fn test_checks_share_query_label() {
        for query in monthly_trend_pack() {
            assert_eq!(query.checks.label, query.label);
            assert!(query.checks.required.iter().any(|c| c == PURCHASE_MONTH));
        }
    }

    #[test]
    fn test_review_grain_includes_flag() {
        let reviews = &monthly_trend_pack()[2];
        assert_eq!(reviews.checks.grain, vec!["is_late".to_string()]);
        assert_eq!(reviews.csv_name(), "03_review_score_by_delivery.csv");
    }
}
