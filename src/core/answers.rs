use crate::domain::model::{AnswerSet, Question, QuestionId};
use crate::domain::ports::KeyValueStore;
use crate::utils::error::{InsightError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const ANSWERS_KEY: &str = "questionAnswers";
pub const ANSWERS_SCHEMA_VERSION: u32 = 1;
pub const QUESTIONS_KEY: &str = "analysisQuestions";

#[derive(Debug, Serialize, Deserialize)]
struct StoredAnswers {
    version: u32,
    answers: BTreeMap<String, String>,
}

pub fn encode_answers(answers: &AnswerSet) -> Result<String> {
    let stored = StoredAnswers {
        version: ANSWERS_SCHEMA_VERSION,
        answers: answers.as_map().clone(),
    };
    Ok(serde_json::to_string(&stored)?)
}

fn answer_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 讀取槽內容；舊版沒有 version 的純對照表會直接轉換
pub fn decode_answers(raw: &str) -> Result<AnswerSet> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| InsightError::store(format!("slot does not hold valid JSON: {}", e)))?;

    let Value::Object(mut map) = value else {
        return Err(InsightError::store("slot does not hold a JSON object"));
    };

    let versioned = matches!(map.get("version"), Some(Value::Number(_)))
        && matches!(map.get("answers"), Some(Value::Object(_)));

    if versioned {
        let version = map
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(u32::MAX);
        if version != ANSWERS_SCHEMA_VERSION {
            return Err(InsightError::UnsupportedStoreVersion { found: version });
        }

        let Some(Value::Object(answers)) = map.remove("answers") else {
            return Err(InsightError::store("answers field is not an object"));
        };
        return Ok(AnswerSet::from_map(
            answers
                .into_iter()
                .map(|(id, v)| (id, answer_text(v)))
                .collect(),
        ));
    }

    tracing::info!("🔄 Migrating legacy answer map ({} entries)", map.len());
    Ok(AnswerSet::from_map(
        map.into_iter().map(|(id, v)| (id, answer_text(v))).collect(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState {
    Empty,
    Populated,
    Persisted,
}

/// 何時把回答寫進槽
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// 每次修改都寫入
    #[default]
    WriteThrough,
    /// 只在換頁 / flush 時寫入
    OnNavigate,
}

/// 回答集合與其儲存槽；最後寫入者為準
pub struct AnswerBook<K: KeyValueStore> {
    store: K,
    key: String,
    policy: PersistPolicy,
    answers: AnswerSet,
    state: AnswerState,
}

impl<K: KeyValueStore> AnswerBook<K> {
    pub fn new(store: K, key: impl Into<String>, policy: PersistPolicy) -> Self {
        Self {
            store,
            key: key.into(),
            policy,
            answers: AnswerSet::new(),
            state: AnswerState::Empty,
        }
    }

    /// 從槽讀回先前儲存的回答
    pub fn load(store: K, key: impl Into<String>, policy: PersistPolicy) -> Result<Self> {
        let mut book = Self::new(store, key, policy);
        if let Some(raw) = book.store.get(&book.key)? {
            book.answers = decode_answers(&raw)?;
            book.state = AnswerState::Persisted;
            tracing::debug!("Loaded {} answers from '{}'", book.answers.len(), book.key);
        }
        Ok(book)
    }

    /// 新題目到來時每題先填空字串
    pub fn initialize(&mut self, questions: &[Question]) {
        self.answers = AnswerSet::blank_for(questions);
        self.state = if questions.is_empty() {
            AnswerState::Empty
        } else {
            AnswerState::Populated
        };
    }

    pub fn set_answer(&mut self, id: &QuestionId, text: impl Into<String>) -> Result<()> {
        self.answers.set(id, text);
        self.state = AnswerState::Populated;

        if self.policy == PersistPolicy::WriteThrough {
            self.persist()?;
        }
        Ok(())
    }

    pub fn persist(&mut self) -> Result<()> {
        let encoded = encode_answers(&self.answers)?;
        self.store.set(&self.key, &encoded)?;
        self.state = AnswerState::Persisted;
        tracing::debug!("💾 Persisted {} answers to '{}'", self.answers.len(), self.key);
        Ok(())
    }

    /// 離開頁面前呼叫；有未寫入的修改才會寫
    pub fn navigate(&mut self) -> Result<()> {
        if self.state == AnswerState::Populated {
            self.persist()?;
        }
        Ok(())
    }

    /// 只清記憶體中的回答，槽內容不動
    pub fn clear(&mut self) {
        self.answers = AnswerSet::new();
        self.state = AnswerState::Empty;
    }

    /// 連同槽一起清掉
    pub fn reset(&mut self) -> Result<()> {
        self.store.remove(&self.key)?;
        self.clear();
        Ok(())
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn state(&self) -> AnswerState {
        self.state
    }

    pub fn policy(&self) -> PersistPolicy {
        self.policy
    }
}

/// 保存目前的題目，摘要頁面用題目文字當標籤
pub fn save_questions<K: KeyValueStore>(store: &K, questions: &[Question]) -> Result<()> {
    store.set(QUESTIONS_KEY, &serde_json::to_string(questions)?)
}

/// 沒有保存過題目時回傳空清單
pub fn load_questions<K: KeyValueStore>(store: &K) -> Result<Vec<Question>> {
    match store.get(QUESTIONS_KEY)? {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            InsightError::store(format!("stored questions are unreadable: {}", e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::slot_store::MemorySlotStore;
    use crate::domain::model::QuestionCategory;

    fn question(id: u32) -> Question {
        Question {
            id: QuestionId::from(id),
            question: format!("Question text {}", id),
            category: QuestionCategory::Strategy,
            importance: 3,
            insight_goal: String::new(),
        }
    }

    #[test]
    fn test_encode_is_versioned() {
        let mut answers = AnswerSet::new();
        answers.set(&QuestionId::from(3), "$120");
        let encoded = encode_answers(&answers).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["answers"]["3"], "$120");
    }

    #[test]
    fn test_legacy_map_is_migrated() {
        let answers = decode_answers(r#"{"1": "SaaS", "2": 5000000, "3": null}"#).unwrap();
        assert_eq!(answers.get(&QuestionId::from(1)), Some("SaaS"));
        assert_eq!(answers.get(&QuestionId::from(2)), Some("5000000"));
        assert_eq!(answers.get(&QuestionId::from(3)), Some(""));
    }

    #[test]
    fn test_future_version_is_rejected() {
        let err = decode_answers(r#"{"version": 2, "answers": {}}"#).unwrap_err();
        assert!(matches!(err, InsightError::UnsupportedStoreVersion { found: 2 }));

        let err = decode_answers("[1, 2]").unwrap_err();
        assert!(matches!(err, InsightError::StoreError { .. }));
    }

    #[test]
    fn test_write_through_lifecycle() {
        let store = MemorySlotStore::new();
        let mut book = AnswerBook::new(store.clone(), ANSWERS_KEY, PersistPolicy::WriteThrough);
        assert_eq!(book.state(), AnswerState::Empty);

        book.initialize(&[question(1), question(2)]);
        assert_eq!(book.state(), AnswerState::Populated);
        assert_eq!(book.answers().len(), 2);
        assert!(store.get(ANSWERS_KEY).unwrap().is_none());

        book.set_answer(&QuestionId::from(2), "B2B").unwrap();
        assert_eq!(book.state(), AnswerState::Persisted);

        let reloaded =
            AnswerBook::load(store.clone(), ANSWERS_KEY, PersistPolicy::WriteThrough).unwrap();
        assert_eq!(reloaded.answers().get(&QuestionId::from(2)), Some("B2B"));
        assert_eq!(reloaded.state(), AnswerState::Persisted);
    }

    #[test]
    fn test_on_navigate_defers_writes() {
        let store = MemorySlotStore::new();
        let mut book = AnswerBook::new(store.clone(), ANSWERS_KEY, PersistPolicy::OnNavigate);

        book.set_answer(&QuestionId::from(1), "first").unwrap();
        book.set_answer(&QuestionId::from(1), "second").unwrap();
        assert_eq!(book.state(), AnswerState::Populated);
        assert!(store.get(ANSWERS_KEY).unwrap().is_none());

        book.navigate().unwrap();
        assert_eq!(book.state(), AnswerState::Persisted);

        let stored = decode_answers(&store.get(ANSWERS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.get(&QuestionId::from(1)), Some("second"));
    }

    #[test]
    fn test_reset_removes_slot() {
        let store = MemorySlotStore::new();
        let mut book = AnswerBook::new(store.clone(), ANSWERS_KEY, PersistPolicy::WriteThrough);
        book.set_answer(&QuestionId::from(1), "x").unwrap();

        book.reset().unwrap();
        assert!(book.answers().is_empty());
        assert!(store.get(ANSWERS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_questions_round_trip_through_store() {
        let store = MemorySlotStore::new();
        assert!(load_questions(&store).unwrap().is_empty());

        save_questions(&store, &[question(1), question(2)]).unwrap();
        let loaded = load_questions(&store).unwrap();
        assert_eq!(loaded, vec![question(1), question(2)]);

        store.set(QUESTIONS_KEY, "not json").unwrap();
        assert!(matches!(
            load_questions(&store),
            Err(InsightError::StoreError { .. })
        ));
    }
}
