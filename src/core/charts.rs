use crate::core::metrics::{
    format_currency, format_number, format_percent, COST_FIELD, MARGIN_FIELD, MONTH_FIELD,
    REVENUE_FIELD, UNITS_FIELD,
};
use crate::domain::model::Record;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

/// 座標軸刻度與提示框的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TickFormat {
    Currency,
    Number,
    Percent,
}

impl TickFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            TickFormat::Currency => format_currency(value),
            TickFormat::Number => format_number(value),
            TickFormat::Percent => format_percent(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub data_key: String,
    pub name: String,
    pub color: String,
}

impl Series {
    fn new(data_key: &str, name: &str, color: &str) -> Self {
        Self {
            data_key: data_key.to_string(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

/// 宣告式的欄位 -> 座標軸對應
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub x_key: String,
    pub y_format: TickFormat,
    pub series: Vec<Series>,
}

impl ChartSpec {
    pub fn bind(&self, records: &[Record]) -> ChartPayload {
        ChartPayload {
            spec: self.clone(),
            data: records.to_vec(),
        }
    }

    /// 記錄裡有出現的序列欄位
    pub fn present_keys(&self, records: &[Record]) -> Vec<&str> {
        self.series
            .iter()
            .map(|s| s.data_key.as_str())
            .filter(|key| records.iter().any(|r| r.get(key).is_some()))
            .collect()
    }
}

/// 交給圖表元件的內容：規格加上原封不動的記錄
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub spec: ChartSpec,
    pub data: Vec<Record>,
}

pub fn sales_dashboard_charts() -> Vec<ChartSpec> {
    vec![
        ChartSpec {
            id: "revenue-vs-cost".to_string(),
            title: "Revenue vs Cost of Goods".to_string(),
            kind: ChartKind::Bar,
            x_key: MONTH_FIELD.to_string(),
            y_format: TickFormat::Currency,
            series: vec![
                Series::new(REVENUE_FIELD, "Revenue", "#3b82f6"),
                Series::new(COST_FIELD, "Cost of Goods", "#ef4444"),
            ],
        },
        ChartSpec {
            id: "units-sold".to_string(),
            title: "Units Sold".to_string(),
            kind: ChartKind::Line,
            x_key: MONTH_FIELD.to_string(),
            y_format: TickFormat::Number,
            series: vec![Series::new(UNITS_FIELD, "Units Sold", "#10b981")],
        },
        ChartSpec {
            id: "profit-margin".to_string(),
            title: "Profit Margin".to_string(),
            kind: ChartKind::Line,
            x_key: MONTH_FIELD.to_string(),
            y_format: TickFormat::Percent,
            series: vec![Series::new(MARGIN_FIELD, "Profit Margin", "#8b5cf6")],
        },
    ]
}

pub fn bind_all(specs: &[ChartSpec], records: &[Record]) -> Vec<ChartPayload> {
    specs.iter().map(|spec| spec.bind(records)).collect()
}
