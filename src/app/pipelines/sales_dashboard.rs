use crate::app::pipelines::variant::{Artifact, PageVariant};
use crate::core::charts::{bind_all, sales_dashboard_charts, ChartPayload};
use crate::core::ingest::FileKind;
use crate::core::markdown::{render_narrative, unwrap_fence, StyleMap};
use crate::core::metrics::SalesMetrics;
use crate::domain::model::{AnalysisEnvelope, DecodedContent, DecodedSheet, FileInfo};
use crate::domain::ports::AnalysisService;
use crate::utils::error::{InsightError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub file: FileInfo,
    pub sheet: DecodedSheet,
    pub metrics: SalesMetrics,
    pub charts: Vec<ChartPayload>,
    pub analysis: AnalysisEnvelope,
}

impl DashboardView {
    /// 分析敘述渲染成 HTML
    pub fn analysis_html(&self, styles: &StyleMap) -> String {
        render_narrative(&self.analysis.analysis.response, styles)
    }
}

/// 銷售試算表儀表板
pub struct SalesDashboard {
    analysis: Box<dyn AnalysisService>,
    styles: StyleMap,
}

impl SalesDashboard {
    pub fn new(analysis: Box<dyn AnalysisService>) -> Self {
        Self {
            analysis,
            styles: StyleMap::default(),
        }
    }
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 依標題列順序輸出 CSV
fn records_csv(sheet: &DecodedSheet) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&sheet.headers)?;
    for record in &sheet.records {
        writer.write_record(sheet.headers.iter().map(|h| csv_cell(record.get(h))))?;
    }
    writer
        .into_inner()
        .map_err(|e| InsightError::IoError(e.into_error()))
}

#[async_trait]
impl PageVariant for SalesDashboard {
    type View = DashboardView;

    fn name(&self) -> &str {
        "sales_dashboard"
    }

    fn file_kind(&self) -> FileKind {
        FileKind::Spreadsheet
    }

    async fn derive(&self, file: FileInfo, content: DecodedContent) -> Result<DashboardView> {
        let DecodedContent::Sheet(sheet) = content else {
            return Err(InsightError::SpreadsheetDecodeError {
                message: "expected worksheet rows, got document text".to_string(),
            });
        };

        let metrics = SalesMetrics::compute(&sheet.records);
        tracing::info!(
            "💰 Total revenue {}, units {}, average margin {}",
            metrics.total_revenue_display(),
            metrics.total_units_display(),
            metrics.average_margin_display()
        );
        if metrics.coverage.revenue < metrics.record_count {
            tracing::debug!(
                "{} of {} records carry no numeric revenue",
                metrics.record_count - metrics.coverage.revenue,
                metrics.record_count
            );
        }

        let charts = bind_all(&sales_dashboard_charts(), &sheet.records);
        let analysis = self.analysis.analyze(&sheet.records).await?;

        Ok(DashboardView {
            file,
            sheet,
            metrics,
            charts,
            analysis,
        })
    }

    fn artifacts(&self, view: &DashboardView) -> Result<Vec<Artifact>> {
        let metrics = serde_json::json!({
            "metrics": view.metrics,
            "display": {
                "total_revenue": view.metrics.total_revenue_display(),
                "total_units": view.metrics.total_units_display(),
                "average_margin": view.metrics.average_margin_display(),
            },
        });

        Ok(vec![
            Artifact {
                name: "records.csv".to_string(),
                bytes: records_csv(&view.sheet)?,
            },
            Artifact::json("metrics.json", &metrics)?,
            Artifact::json("charts.json", &view.charts)?,
            Artifact::text(
                "analysis.md",
                unwrap_fence(&view.analysis.analysis.response),
            ),
            Artifact::text("analysis.html", view.analysis_html(&self.styles)),
        ])
    }
}
