use crate::domain::model::Record;
use serde::Serialize;

pub const REVENUE_FIELD: &str = "revenue";
pub const UNITS_FIELD: &str = "units_sold";
pub const MARGIN_FIELD: &str = "profit_margin";
pub const MONTH_FIELD: &str = "month";
pub const COST_FIELD: &str = "cost_of_goods";

/// 每個欄位實際被計入的筆數
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldCoverage {
    pub revenue: usize,
    pub units_sold: usize,
    pub profit_margin: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesMetrics {
    pub record_count: usize,
    pub total_revenue: f64,
    pub total_units: f64,
    /// 已四捨五入到小數兩位；沒有任何毛利資料時為 None
    pub average_margin: Option<f64>,
    pub coverage: FieldCoverage,
}

impl SalesMetrics {
    /// 缺欄位或非數值的記錄在該欄位略過，不會讓結果變成 NaN
    pub fn compute(records: &[Record]) -> Self {
        let mut coverage = FieldCoverage::default();
        let mut total_revenue = 0.0;
        let mut total_units = 0.0;
        let mut margin_sum = 0.0;

        for record in records {
            if let Some(v) = record.number(REVENUE_FIELD) {
                total_revenue += v;
                coverage.revenue += 1;
            }
            if let Some(v) = record.number(UNITS_FIELD) {
                total_units += v;
                coverage.units_sold += 1;
            }
            if let Some(v) = record.number(MARGIN_FIELD) {
                margin_sum += v;
                coverage.profit_margin += 1;
            }
        }

        let average_margin = (coverage.profit_margin > 0)
            .then(|| round2(margin_sum / coverage.profit_margin as f64));

        Self {
            record_count: records.len(),
            total_revenue,
            total_units,
            average_margin,
            coverage,
        }
    }

    pub fn total_revenue_display(&self) -> String {
        format_currency(self.total_revenue)
    }

    pub fn total_units_display(&self) -> String {
        format_number(self.total_units)
    }

    /// 兩位小數，例如 `25.00`
    pub fn average_margin_display(&self) -> String {
        match self.average_margin {
            Some(m) => format!("{:.2}", m),
            None => "N/A".to_string(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 千分位分組，最多保留三位小數
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = (value * 1000.0).round() / 1000.0;
    let negative = rounded < 0.0;
    let formatted = format!("{:.3}", rounded.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative && (grouped != "0" || !frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

pub fn format_currency(value: f64) -> String {
    format!("${}", format_number(value))
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", format_number(value))
}
