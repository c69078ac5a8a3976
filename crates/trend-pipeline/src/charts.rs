//! Chart stages
//!
//! A chart stage gates a normalized table, turns what survives into a
//! [`ChartSpec`], hands it to a [`ChartBackend`] and stores the result. Stages
//! that compare two series also produce the insight for their topic.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use trend_core::{
    format_year_month, month_key, ArtifactKind, Result, RunContext, Table, Threshold, Topic,
    TrendError, MONTH_COLUMN,
};
use trend_out::{delta_insight, ChartSection, DeltaOutcome};
use trend_quality::{
    apply_threshold, check_required_columns, pivot_pair, PairSeries, PairSpec, QaProfile,
};

use crate::artifacts::{publish, ArtifactStore, CHART_DIR};

/// Renders a chart spec to bytes
pub trait ChartBackend: Send + Sync {
    /// File extension of the rendered artifact, without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, spec: &ChartSpec) -> Result<Vec<u8>>;
}

/// Line chart as a PNG image, drawn with plotters
#[derive(Debug, Clone, Copy)]
pub struct PngChartBackend {
    pub width: u32,
    pub height: u32,
}

impl Default for PngChartBackend {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

static LINE_COLORS: [RGBColor; 4] = [BLUE, RED, GREEN, MAGENTA];

fn draw_err(e: impl std::fmt::Display) -> TrendError {
    TrendError::RenderError(format!("chart: {}", e))
}

impl PngChartBackend {
    /// Every x value across the series, in month order
    fn months(spec: &ChartSpec) -> Vec<&str> {
        let months: BTreeSet<&str> = spec
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.x.as_str()))
            .collect();
        months.into_iter().collect()
    }

    fn y_range(spec: &ChartSpec) -> std::ops::Range<f64> {
        let ys = spec.series.iter().flat_map(|s| s.points.iter().map(|p| p.y));
        let (lo, hi) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
        if !lo.is_finite() {
            return 0.0..1.0;
        }
        let pad = ((hi - lo) * 0.1).max(1.0);
        (lo - pad).min(0.0)..hi + pad
    }

    fn draw(&self, spec: &ChartSpec, path: &Path) -> Result<()> {
        let months = Self::months(spec);
        let last = months.len().saturating_sub(1).max(1) as i32;

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, ("sans-serif", 24))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0..last, Self::y_range(spec))
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(months.len().max(2))
            .x_label_formatter(&|i| {
                usize::try_from(*i)
                    .ok()
                    .and_then(|i| months.get(i))
                    .map(|m| m.to_string())
                    .unwrap_or_default()
            })
            .draw()
            .map_err(draw_err)?;

        for (series, color) in spec.series.iter().zip(LINE_COLORS.iter().cycle()) {
            let points: Vec<(i32, f64)> = series
                .points
                .iter()
                .filter_map(|p| {
                    let x = months.binary_search(&p.x.as_str()).ok()?;
                    Some((x as i32, p.y))
                })
                .collect();
            chart
                .draw_series(LineSeries::new(points.clone(), color))
                .map_err(draw_err)?
                .label(series.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            chart
                .draw_series(points.into_iter().map(|xy| Circle::new(xy, 3, color.filled())))
                .map_err(draw_err)?;
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;
        root.present().map_err(draw_err)?;
        Ok(())
    }
}

impl ChartBackend for PngChartBackend {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn render(&self, spec: &ChartSpec) -> Result<Vec<u8>> {
        // The bitmap encoder only writes to paths; the store owns the final location.
        let scratch = tempfile::Builder::new()
            .prefix("trendpack-chart-")
            .suffix(".png")
            .tempfile()?;
        self.draw(spec, scratch.path())?;
        Ok(std::fs::read(scratch.path())?)
    }
}

/// Writes the spec itself as pretty JSON, for any plotting front end
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonChartBackend;

impl ChartBackend for JsonChartBackend {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, spec: &ChartSpec) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(spec)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// `YYYY-MM`
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// Backend-independent description of a line chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<ChartSeries>,
}

/// A line drawn from one numeric column
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub column: String,
}

impl Series {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Plot {
    /// One line per column; the gate filters rows
    Columns(Vec<Series>),
    /// Two lines from rows split by a flag; the gate applies to each group
    Pair {
        flag_column: String,
        value_column: String,
        a_name: String,
        b_name: String,
    },
}

#[derive(Debug, Clone)]
pub struct ChartStage {
    /// Output stem, shared with the query that feeds the chart
    pub stem: String,
    /// QA label used for findings
    pub label: String,
    pub topic: Topic,
    pub title: String,
    pub y_label: String,
    pub plot: Plot,
    pub gate: Threshold,
    /// Wording of the `a - b` comparison; `None` for charts without an insight.
    /// For column plots the first two series are compared.
    pub delta_subject: Option<String>,
    pub follow_up: String,
}

fn points(table: &Table, column: &str) -> Vec<ChartPoint> {
    (0..table.row_count())
        .filter_map(|row| {
            let x = table.value(MONTH_COLUMN, row).and_then(month_key)?;
            let y = table.value(column, row).and_then(|v| v.as_f64())?;
            Some(ChartPoint {
                x: format_year_month(x),
                y,
            })
        })
        .collect()
}

fn pair_points(index: &[NaiveDate], values: &[f64]) -> Vec<ChartPoint> {
    index
        .iter()
        .zip(values)
        .map(|(m, y)| ChartPoint {
            x: format_year_month(*m),
            y: *y,
        })
        .collect()
}

impl ChartStage {
    fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![MONTH_COLUMN, self.gate.metric.as_str()];
        match &self.plot {
            Plot::Columns(series) => columns.extend(series.iter().map(|s| s.column.as_str())),
            Plot::Pair { flag_column, value_column, .. } => {
                columns.push(flag_column);
                columns.push(value_column);
            }
        }
        columns
    }

    fn spec(&self, series: Vec<ChartSeries>) -> ChartSpec {
        ChartSpec {
            title: self.title.clone(),
            x_label: "Purchase month".to_string(),
            y_label: self.y_label.clone(),
            series,
        }
    }

    /// Gate, plot and store the chart; returns the report section for it.
    pub fn run(
        &self,
        table: &Table,
        profile: &QaProfile,
        backend: &dyn ChartBackend,
        store: &dyn ArtifactStore,
        ctx: &mut RunContext,
    ) -> Result<ChartSection> {
        check_required_columns(table, &self.required_columns(), &self.label)?;
        ctx.declare_threshold(self.gate.clone());

        let (spec, pairs) = match &self.plot {
            Plot::Columns(series) => {
                let filtered = apply_threshold(table, &self.gate, &self.label)?;
                if let Some(finding) = filtered.finding(&self.gate, &self.label) {
                    ctx.record_finding(finding);
                }
                tracing::info!(
                    chart = %self.stem,
                    kept = filtered.table.row_count(),
                    dropped = filtered.dropped,
                    "gate applied"
                );

                let lines = series
                    .iter()
                    .map(|s| ChartSeries {
                        name: s.name.clone(),
                        points: points(&filtered.table, &s.column),
                    })
                    .collect();

                let pairs = match (&self.delta_subject, series.as_slice()) {
                    (Some(_), [a, b, ..]) => Some(PairSeries::from_columns(
                        &filtered.table,
                        &a.column,
                        &b.column,
                        &self.label,
                    )?),
                    _ => None,
                };
                (self.spec(lines), pairs)
            }
            Plot::Pair {
                flag_column,
                value_column,
                a_name,
                b_name,
            } => {
                let pair_spec = PairSpec {
                    flag_column: flag_column.clone(),
                    value_column: value_column.clone(),
                    gate: self.gate.clone(),
                };
                let pivot = pivot_pair(table, &pair_spec, &self.label)?;
                if let Some(finding) = pivot.finding(&pair_spec, &self.label) {
                    ctx.record_finding(finding);
                }
                tracing::info!(
                    chart = %self.stem,
                    months = pivot.pairs.len(),
                    dropped = pivot.dropped_rows,
                    "pair gate applied"
                );

                let lines = vec![
                    ChartSeries {
                        name: a_name.clone(),
                        points: pair_points(&pivot.pairs.index, &pivot.pairs.group_a),
                    },
                    ChartSeries {
                        name: b_name.clone(),
                        points: pair_points(&pivot.pairs.index, &pivot.pairs.group_b),
                    },
                ];
                (self.spec(lines), Some(pivot.pairs))
            }
        };

        let bytes = backend.render(&spec)?;
        let path = format!("{}/{}.{}", CHART_DIR, self.stem, backend.extension());
        publish(store, ctx, ArtifactKind::Chart, path.clone(), &bytes, None)?;

        if let (Some(subject), Some(pairs)) = (&self.delta_subject, pairs) {
            let precision = profile.insight_precision;
            match delta_insight(self.topic, &pairs, subject, &self.label, precision) {
                DeltaOutcome::Insight(insight) => ctx.record_insight(insight),
                DeltaOutcome::Empty(finding) => ctx.record_finding(finding),
            }
        }

        Ok(ChartSection {
            title: self.title.clone(),
            artifact: path,
            gate: Some(self.gate.rule()),
            topic: self.topic,
            follow_up: self.follow_up.clone(),
        })
    }
}

/// The four trend charts, gated with the profile's thresholds.
pub fn monthly_trend_charts(profile: &QaProfile) -> Vec<ChartStage> {
    let orders = "01_orders_per_month";
    let revenue = "02_revenue_per_month";
    let reviews = "03_review_score_by_delivery";
    let late = "04_late_delivery_rate_by_month";

    vec![
        ChartStage {
            stem: orders.to_string(),
            label: "orders/month".to_string(),
            topic: Topic::Orders,
            title: "Orders per month".to_string(),
            y_label: "Orders".to_string(),
            plot: Plot::Columns(vec![
                Series::new("Total orders", "total_orders"),
                Series::new("Delivered orders", "delivered_orders"),
            ]),
            gate: Threshold::at_least(orders, "total_orders", profile.min_chart_volume),
            delta_subject: Some("Undelivered orders per month (total minus delivered)".to_string()),
            follow_up: "Which order statuses make up the undelivered share in high-volume months?"
                .to_string(),
        },
        ChartStage {
            stem: revenue.to_string(),
            label: "revenue/month".to_string(),
            topic: Topic::Revenue,
            title: "Revenue per month (delivered orders)".to_string(),
            y_label: "Revenue".to_string(),
            plot: Plot::Columns(vec![Series::new("Revenue", "revenue")]),
            gate: Threshold::at_least(revenue, "delivered_orders", profile.min_chart_volume),
            delta_subject: None,
            follow_up: "Is revenue growth driven by more orders or by higher value per order?"
                .to_string(),
        },
        ChartStage {
            stem: reviews.to_string(),
            label: "reviews late vs on-time".to_string(),
            topic: Topic::Reviews,
            title: "Average review score: on-time vs late deliveries".to_string(),
            y_label: "Average review score".to_string(),
            plot: Plot::Pair {
                flag_column: "is_late".to_string(),
                value_column: "avg_review_score".to_string(),
                a_name: "On-time".to_string(),
                b_name: "Late".to_string(),
            },
            gate: Threshold::at_least(reviews, "review_count", profile.min_group_size).per_group(),
            delta_subject: Some("On-time minus late average review score".to_string()),
            follow_up: "Does the review penalty grow with the number of days late?".to_string(),
        },
        ChartStage {
            stem: late.to_string(),
            label: "late rate/month".to_string(),
            topic: Topic::LateDelivery,
            title: "Late delivery rate by month (delivered orders)".to_string(),
            y_label: "Late delivery rate (%)".to_string(),
            plot: Plot::Columns(vec![Series::new(
                "Late delivery rate %",
                "late_delivery_rate_pct",
            )]),
            gate: Threshold::at_least(late, "delivered_orders", profile.min_chart_volume),
            delta_subject: None,
            follow_up: "Which sellers or regions concentrate late deliveries in peak months?"
                .to_string(),
        },
    ]
}
