use crate::domain::model::{DecodedSheet, Record};
use crate::utils::error::{InsightError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;

impl From<calamine::Error> for InsightError {
    fn from(err: calamine::Error) -> Self {
        InsightError::SpreadsheetDecodeError {
            message: err.to_string(),
        }
    }
}

/// 解析活頁簿的第一個工作表：第一列為標題，其餘每一列一筆 Record
pub fn decode_workbook(bytes: &[u8]) -> Result<DecodedSheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        tracing::warn!("Workbook has no sheets");
        return Ok(DecodedSheet {
            sheet_name: String::new(),
            headers: Vec::new(),
            records: Vec::new(),
        });
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_names(header_row),
        None => Vec::new(),
    };

    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        let record = row_to_record(&headers, row);
        if record.data.is_empty() {
            // 整列空白就略過
            tracing::debug!("Skipping blank row {}", offset + 2);
            continue;
        }
        records.push(record);
    }

    tracing::debug!(
        "Decoded sheet '{}' with {} columns and {} records",
        sheet_name,
        headers.len(),
        records.len()
    );

    Ok(DecodedSheet {
        sheet_name,
        headers,
        records,
    })
}

/// 空白標題命名為 __EMPTY、__EMPTY_1…；重複標題加上 _1、_2…
fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut empty_count = 0usize;
    let mut names = Vec::with_capacity(row.len());

    for cell in row {
        let raw = cell_text(cell);
        let base = if raw.trim().is_empty() {
            let name = if empty_count == 0 {
                "__EMPTY".to_string()
            } else {
                format!("__EMPTY_{}", empty_count)
            };
            empty_count += 1;
            name
        } else {
            raw
        };

        let name = match seen.get(&base).copied() {
            None => base.clone(),
            Some(mut n) => {
                let mut candidate = format!("{}_{}", base, n);
                while seen.contains_key(&candidate) {
                    n += 1;
                    candidate = format!("{}_{}", base, n);
                }
                seen.insert(base.clone(), n + 1);
                candidate
            }
        };

        seen.entry(base).or_insert(1);
        seen.entry(name.clone()).or_insert(1);
        names.push(name);
    }

    names
}

fn row_to_record(headers: &[String], row: &[Data]) -> Record {
    headers
        .iter()
        .zip(row.iter())
        .filter_map(|(header, cell)| cell_value(cell).map(|v| (header.clone(), v)))
        .collect()
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) => Some(number_value(*f)),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => Some(number_value(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
        Data::Error(e) => Some(Value::String(e.to_string())),
    }
}

/// 整數值的浮點數轉成 JSON 整數
fn number_value(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => match number_value(*f) {
            Value::Number(n) => n.to_string(),
            _ => f.to_string(),
        },
        other => other.to_string(),
    }
}
