use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 試算表中的一列：欄位名稱 -> 純量值，形狀完全由標題列決定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.data.get(field)
    }

    /// 取得數值欄位；數字字串也視為數值
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.data.get(field)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn text(&self, field: &str) -> Option<String> {
        match self.data.get(field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl FromIterator<(String, serde_json::Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Record {
            data: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSheet {
    pub sheet_name: String,
    /// 依欄位順序排列的標題
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedContent {
    Sheet(DecodedSheet),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn size_label(&self) -> String {
        format!("{:.2} KB", self.size_bytes as f64 / 1024.0)
    }
}

/// 題目編號；外部服務可能回傳數字或字串，統一成字串鍵
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        QuestionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for QuestionId {
    fn from(id: u32) -> Self {
        QuestionId(id.to_string())
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        QuestionId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(i) => QuestionId(i.to_string()),
            RawId::Float(f) => QuestionId(f.to_string()),
            RawId::Text(s) => QuestionId(s),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    Customers,
    Strategy,
    Compliance,
    Operations,
    Finance,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 5] = [
        QuestionCategory::Customers,
        QuestionCategory::Strategy,
        QuestionCategory::Compliance,
        QuestionCategory::Operations,
        QuestionCategory::Finance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Customers => "customers",
            QuestionCategory::Strategy => "strategy",
            QuestionCategory::Compliance => "compliance",
            QuestionCategory::Operations => "operations",
            QuestionCategory::Finance => "finance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// 標籤的固定配色
    pub fn badge_style(&self) -> &'static str {
        match self {
            QuestionCategory::Customers => "bg-blue-100 text-blue-800",
            QuestionCategory::Strategy => "bg-purple-100 text-purple-800",
            QuestionCategory::Compliance => "bg-red-100 text-red-800",
            QuestionCategory::Operations => "bg-green-100 text-green-800",
            QuestionCategory::Finance => "bg-yellow-100 text-yellow-800",
        }
    }
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub question: String,
    pub category: QuestionCategory,
    pub importance: u8,
    pub insight_goal: String,
}

impl Question {
    pub const MIN_IMPORTANCE: u8 = 1;
    pub const MAX_IMPORTANCE: u8 = 5;

    pub fn importance_stars(&self) -> usize {
        self.importance
            .clamp(Self::MIN_IMPORTANCE, Self::MAX_IMPORTANCE) as usize
    }
}

/// 題目編號 -> 回答內容
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: BTreeMap<String, String>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每題先放空字串
    pub fn blank_for(questions: &[Question]) -> Self {
        Self {
            answers: questions
                .iter()
                .map(|q| (q.id.0.clone(), String::new()))
                .collect(),
        }
    }

    pub fn from_map(answers: BTreeMap<String, String>) -> Self {
        Self { answers }
    }

    pub fn set(&mut self, id: &QuestionId, answer: impl Into<String>) -> Option<String> {
        self.answers.insert(id.0.clone(), answer.into())
    }

    pub fn get(&self, id: &QuestionId) -> Option<&str> {
        self.answers.get(id.as_str()).map(String::as_str)
    }

    /// 有內容的回答才算數
    pub fn answered(&self, id: &QuestionId) -> Option<&str> {
        self.get(id).filter(|a| !a.is_empty())
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    /// 數字編號依數值排序，其餘編號排在後面
    pub fn entries_ordered(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .answers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        });
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub model: String,
    pub created_at: String,
    /// markdown 敘述
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub context: Vec<u64>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub load_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub prompt_eval_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub success: bool,
    pub analysis: AnalysisResponse,
}
