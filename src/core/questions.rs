use crate::domain::model::{Question, QuestionCategory, QuestionId};
use crate::domain::ports::{ConfigProvider, QuestionService};
use crate::utils::error::{InsightError, PayloadErrorKind, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

pub const QUESTIONS_PATH: &str = "/api/questions";

/// `questions.response` 字串的解讀方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadContract {
    /// 整個字串就是題目陣列
    #[default]
    Strict,
    /// 取第一個 `[` 到最後一個 `]` 之間的內容
    EmbeddedArray,
}

/// base_url + path，避免重複斜線
pub fn service_endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[derive(Debug, Deserialize)]
struct QuestionsEnvelope {
    questions: QuestionsBody,
}

#[derive(Debug, Deserialize)]
struct QuestionsBody {
    response: String,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: QuestionId,
    question: String,
    category: String,
    importance: Value,
    #[serde(default)]
    insight_goal: String,
}

fn locate_array(response: &str, contract: PayloadContract) -> Result<&str> {
    match contract {
        PayloadContract::Strict => {
            let trimmed = response.trim();
            if trimmed.starts_with('[') {
                Ok(trimmed)
            } else {
                Err(InsightError::payload(
                    PayloadErrorKind::MissingArray,
                    "response is not a JSON array",
                ))
            }
        }
        PayloadContract::EmbeddedArray => match (response.find('['), response.rfind(']')) {
            (Some(start), Some(end)) if start < end => Ok(&response[start..=end]),
            _ => Err(InsightError::payload(
                PayloadErrorKind::MissingArray,
                "no JSON array found in response",
            )),
        },
    }
}

fn importance_value(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.fract() == 0.0
        && n >= Question::MIN_IMPORTANCE as f64
        && n <= Question::MAX_IMPORTANCE as f64)
        .then_some(n as u8)
}

fn validate_question(index: usize, raw: RawQuestion) -> Result<Question> {
    let invalid = |message: String| InsightError::payload(PayloadErrorKind::InvalidField, message);

    if raw.question.trim().is_empty() {
        return Err(invalid(format!("question {} has empty text", index)));
    }

    let category = QuestionCategory::parse(&raw.category).ok_or_else(|| {
        invalid(format!(
            "question {} has unknown category '{}'",
            index, raw.category
        ))
    })?;

    let importance = importance_value(&raw.importance).ok_or_else(|| {
        invalid(format!(
            "question {} importance must be an integer between {} and {}, got {}",
            index,
            Question::MIN_IMPORTANCE,
            Question::MAX_IMPORTANCE,
            raw.importance
        ))
    })?;

    Ok(Question {
        id: raw.id,
        question: raw.question,
        category,
        importance,
        insight_goal: raw.insight_goal,
    })
}

/// 解析並驗證題目清單
pub fn parse_question_payload(response: &str, contract: PayloadContract) -> Result<Vec<Question>> {
    let array = locate_array(response, contract)?;

    let items: Vec<Value> = serde_json::from_str(array)
        .map_err(|e| InsightError::payload(PayloadErrorKind::MalformedJson, e.to_string()))?;

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let raw: RawQuestion = serde_json::from_value(item).map_err(|e| {
            InsightError::payload(
                PayloadErrorKind::SchemaMismatch,
                format!("question {}: {}", index, e),
            )
        })?;

        let question = validate_question(index, raw)?;
        if !seen.insert(question.id.clone()) {
            return Err(InsightError::payload(
                PayloadErrorKind::InvalidField,
                format!("duplicate question id '{}'", question.id),
            ));
        }
        questions.push(question);
    }

    Ok(questions)
}

/// 呼叫外部服務產生分析題目，不重試
pub struct HttpQuestionService {
    client: Client,
    endpoint: String,
    contract: PayloadContract,
    timeout: Option<Duration>,
}

impl HttpQuestionService {
    pub fn new(base_url: &str, contract: PayloadContract) -> Self {
        Self {
            client: Client::new(),
            endpoint: service_endpoint(base_url, QUESTIONS_PATH),
            contract,
            timeout: None,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C, contract: PayloadContract) -> Self {
        Self::new(config.service_base_url(), contract).with_timeout(config.request_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn contract(&self) -> PayloadContract {
        self.contract
    }
}

#[async_trait]
impl QuestionService for HttpQuestionService {
    async fn generate(&self, text: &str) -> Result<Vec<Question>> {
        tracing::info!("🧠 Requesting analysis questions from: {}", self.endpoint);
        tracing::debug!("Document text length: {} chars", text.chars().count());

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": text }));

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Question service response status: {}", status);

        if !status.is_success() {
            return Err(InsightError::ServerError {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().await?;
        let envelope: QuestionsEnvelope = serde_json::from_str(&body).map_err(|e| {
            let kind = if e.is_data() {
                PayloadErrorKind::SchemaMismatch
            } else {
                PayloadErrorKind::MalformedJson
            };
            InsightError::payload(kind, format!("unexpected response body: {}", e))
        })?;

        let questions = parse_question_payload(&envelope.questions.response, self.contract)?;
        tracing::info!("✅ Received {} questions", questions.len());
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUESTIONS: &str = r#"[
        {"id": 1, "question": "Who are the target customers?", "category": "customers", "importance": 5, "insight_goal": "Segment the market"},
        {"id": "2", "question": "What is the pricing model?", "category": "Finance", "importance": "3", "insight_goal": "Unit economics"}
    ]"#;

    fn kind_of(err: InsightError) -> PayloadErrorKind {
        match err {
            InsightError::PayloadError { kind, .. } => kind,
            other => panic!("expected payload error, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_contract_parses_array() {
        let questions = parse_question_payload(QUESTIONS, PayloadContract::Strict).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, QuestionId::from(1));
        assert_eq!(questions[1].id.as_str(), "2");
        assert_eq!(questions[1].category, QuestionCategory::Finance);
        assert_eq!(questions[1].importance, 3);
    }

    #[test]
    fn test_strict_contract_rejects_prose() {
        let wrapped = format!("Here are your questions:\n{}\nGood luck!", QUESTIONS);
        let err = parse_question_payload(&wrapped, PayloadContract::Strict).unwrap_err();
        assert_eq!(kind_of(err), PayloadErrorKind::MissingArray);
    }

    #[test]
    fn test_embedded_contract_extracts_array() {
        let wrapped = format!("Here are your questions:\n{}\nGood luck!", QUESTIONS);
        let questions = parse_question_payload(&wrapped, PayloadContract::EmbeddedArray).unwrap();
        assert_eq!(questions.len(), 2);

        let err = parse_question_payload("no brackets here", PayloadContract::EmbeddedArray)
            .unwrap_err();
        assert_eq!(kind_of(err), PayloadErrorKind::MissingArray);
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_question_payload("[{\"id\": 1,]", PayloadContract::Strict).unwrap_err();
        assert_eq!(kind_of(err), PayloadErrorKind::MalformedJson);
    }

    #[test]
    fn test_schema_mismatch() {
        let err =
            parse_question_payload(r#"[{"id": 1, "category": "finance"}]"#, PayloadContract::Strict)
                .unwrap_err();
        assert_eq!(kind_of(err), PayloadErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_invalid_fields() {
        let bad_category = r#"[{"id": 1, "question": "Q?", "category": "marketing", "importance": 2, "insight_goal": ""}]"#;
        assert_eq!(
            kind_of(parse_question_payload(bad_category, PayloadContract::Strict).unwrap_err()),
            PayloadErrorKind::InvalidField
        );

        let bad_importance = r#"[{"id": 1, "question": "Q?", "category": "finance", "importance": 9, "insight_goal": ""}]"#;
        assert_eq!(
            kind_of(parse_question_payload(bad_importance, PayloadContract::Strict).unwrap_err()),
            PayloadErrorKind::InvalidField
        );

        let duplicate = r#"[
            {"id": 1, "question": "A?", "category": "finance", "importance": 2},
            {"id": "1", "question": "B?", "category": "strategy", "importance": 4}
        ]"#;
        assert_eq!(
            kind_of(parse_question_payload(duplicate, PayloadContract::Strict).unwrap_err()),
            PayloadErrorKind::InvalidField
        );
    }

    #[test]
    fn test_service_endpoint_joins_cleanly() {
        assert_eq!(
            service_endpoint("http://localhost:8000/", QUESTIONS_PATH),
            "http://localhost:8000/api/questions"
        );
    }
}
