use crate::core::questions::service_endpoint;
use crate::domain::model::{AnalysisEnvelope, AnalysisResponse, Record};
use crate::domain::ports::{AnalysisService, ConfigProvider};
use crate::utils::error::{InsightError, PayloadErrorKind, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ANALYZE_PATH: &str = "/api/analyze";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// 固定的示範回應，不連線
    #[default]
    Canned,
    Remote,
}

const CANNED_NARRATIVE: &str = "```markdown\n**Monthly Sales Analysis for January 2021**\n=====================================================\n\n### Summary\n\nThe month of January 2021 saw a total revenue of $1,440,807 with a total of 12,403 units sold across the East and West regions. The average price per unit was $116.83, while the cost of goods sold was $875,627. The profit margin for the month stood at 29.4%.\n\n### Highlights\n\n* **Region-wise performance**: The West region outperformed the East region in terms of revenue and units sold.\n* **Revenue growth**: Revenue grew by 12.5% compared to the previous month.\n* **Average price**: The average price per unit increased by 7.3% compared to the previous month.\n\n### KPI Analysis\n\n| Metric | January 2021 |\n| --- | --- |\n| Total Revenue | $1,440,807 |\n| Units Sold | 12,403 |\n| Average Price per Unit | $116.83 |\n| Cost of Goods Sold | $875,627 |\n| Profit Margin | 29.4% |\n\n### Trend Analysis\n\n* **Revenue trend**: Revenue has been increasing steadily over the past few months.\n* **Units sold trend**: Units sold have also been trending upward, with a slight dip in December.\n* **Average price trend**: Average price per unit has been fluctuating, but is currently on an upward trend.\n\n### Recommendations\n\nBased on the analysis, we recommend:\n\n* **Increase marketing efforts** in the East region to boost sales and revenue.\n* **Optimize pricing strategy** to take advantage of the current upward trend in average price per unit.\n* **Invest in supply chain optimization** to reduce costs and improve profit margins.\n* **Monitor and adjust** inventory levels to ensure they align with demand.\n\n### Solution to Increase Sales\n\nTo increase sales, we suggest implementing a multi-channel marketing campaign targeting both regions. This could include:\n\n* Social media advertising\n* Email marketing campaigns\n* Influencer partnerships\n* Trade show appearances\n\nAdditionally, we recommend leveraging customer loyalty programs and offering special promotions to drive repeat business. By increasing visibility, driving engagement, and fostering loyalty, we can expect to see an increase in sales and revenue.\n\n**Key Takeaways**\n\n1. Focus on the East region for increased marketing efforts.\n2. Optimize pricing strategy to capitalize on upward trend.\n3. Invest in supply chain optimization to improve profit margins.\n4. Monitor and adjust inventory levels to ensure alignment with demand.\n5. Implement multi-channel marketing campaign targeting both regions.\n6. Leverage customer loyalty programs and offer special promotions to drive repeat business.";

/// 不看輸入內容，永遠回傳同一份 llama3 銷售分析
#[derive(Debug, Clone, Default)]
pub struct CannedAnalysisService;

impl CannedAnalysisService {
    pub fn envelope() -> AnalysisEnvelope {
        AnalysisEnvelope {
            success: true,
            analysis: AnalysisResponse {
                model: "llama3".to_string(),
                created_at: "2024-10-26T01:56:46.2896418Z".to_string(),
                response: CANNED_NARRATIVE.to_string(),
                done: true,
                done_reason: Some("stop".to_string()),
                context: vec![128006, 882, 128007, 271, 22818, 6678, 13454, 2626, 13],
                total_duration: Some(131_914_943_500),
                load_duration: Some(9_087_842_900),
                prompt_eval_count: Some(327),
                prompt_eval_duration: Some(1_066_860_000),
                eval_count: Some(539),
                eval_duration: Some(121_756_624_000),
            },
        }
    }
}

#[async_trait]
impl AnalysisService for CannedAnalysisService {
    async fn analyze(&self, records: &[Record]) -> Result<AnalysisEnvelope> {
        tracing::debug!(
            "Using canned analysis response ({} records ignored)",
            records.len()
        );
        Ok(Self::envelope())
    }
}

/// `POST /api/analyze`，body 為記錄陣列
pub struct HttpAnalysisService {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpAnalysisService {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: service_endpoint(base_url, ANALYZE_PATH),
            timeout: None,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let mut service = Self::new(config.service_base_url());
        service.timeout = config.request_timeout();
        service
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, records: &[Record]) -> Result<AnalysisEnvelope> {
        tracing::info!(
            "📡 Sending {} records for analysis to: {}",
            records.len(),
            self.endpoint
        );

        let mut request = self.client.post(&self.endpoint).json(records);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Analysis service response status: {}", status);

        if !status.is_success() {
            return Err(InsightError::ServerError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().await?;
        let envelope: AnalysisEnvelope = serde_json::from_str(&body).map_err(|e| {
            InsightError::payload(
                PayloadErrorKind::SchemaMismatch,
                format!("unexpected analysis body: {}", e),
            )
        })?;

        if !envelope.success {
            tracing::warn!("⚠️ Analysis service reported success=false");
        }
        Ok(envelope)
    }
}

/// 依設定選擇分析來源
pub fn analysis_service<C: ConfigProvider>(
    mode: AnalysisMode,
    config: &C,
) -> Box<dyn AnalysisService> {
    match mode {
        AnalysisMode::Canned => Box::new(CannedAnalysisService),
        AnalysisMode::Remote => Box::new(HttpAnalysisService::from_config(config)),
    }
}
