use sheet_insight::core::answers::{
    load_questions, save_questions, AnswerBook, AnswerState, PersistPolicy, ANSWERS_KEY,
};
use sheet_insight::core::markdown::StyleMap;
use sheet_insight::core::summary::SummaryView;
use sheet_insight::domain::model::{Question, QuestionCategory, QuestionId};
use sheet_insight::domain::ports::{KeyValueStore, Storage};
use sheet_insight::{InsightError, JsonFileSlotStore, LocalStorage};
use tempfile::TempDir;

fn slot_store(dir: &TempDir) -> JsonFileSlotStore {
    JsonFileSlotStore::new(dir.path().join("state").join("local_storage.json"))
}

#[test]
fn test_answer_survives_reload_into_summary() {
    let dir = TempDir::new().unwrap();

    let mut book = AnswerBook::new(slot_store(&dir), ANSWERS_KEY, PersistPolicy::WriteThrough);
    book.set_answer(&QuestionId::from(3), "$120 per customer").unwrap();
    assert_eq!(book.state(), AnswerState::Persisted);

    let reloaded =
        AnswerBook::load(slot_store(&dir), ANSWERS_KEY, PersistPolicy::WriteThrough).unwrap();
    let summary = SummaryView::build(reloaded.answers(), &[]);

    assert_eq!(summary.quick_stat("CAC"), Some("$120 per customer"));
    assert_eq!(summary.quick_stat("TAM"), Some("N/A"));
    assert_eq!(summary.responses.len(), 1);
    assert_eq!(summary.responses[0].question_id, "3");
    assert_eq!(summary.responses[0].label, "Question 3");
    assert!(summary
        .narrative
        .contains("📈 **Growth Rate**: Projecting $120 per customer growth"));
    assert!(summary
        .narrative
        .contains("Customer acquisition costs are optimal"));
}

#[test]
fn test_summary_uses_known_question_text() {
    let dir = TempDir::new().unwrap();
    let questions = vec![Question {
        id: QuestionId::from(1),
        question: "What is the business model?".to_string(),
        category: QuestionCategory::Strategy,
        importance: 5,
        insight_goal: "Model".to_string(),
    }];

    let mut book = AnswerBook::new(slot_store(&dir), ANSWERS_KEY, PersistPolicy::WriteThrough);
    book.initialize(&questions);
    book.set_answer(&QuestionId::from(1), "Subscriptions <B2B>").unwrap();
    book.set_answer(&QuestionId::from(10), "Network effects").unwrap();

    let summary = SummaryView::build(book.answers(), &questions);
    let labels: Vec<&str> = summary.responses.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["What is the business model?", "Question 10"]);

    let html = summary.render_html(&StyleMap::default());
    assert!(html.contains("Subscriptions &lt;B2B&gt;"));
    assert!(!html.contains("<B2B>"));
}

#[test]
fn test_legacy_slot_is_migrated() {
    let dir = TempDir::new().unwrap();
    let store = slot_store(&dir);
    store
        .set(ANSWERS_KEY, r#"{"1": "Marketplace", "2": null, "5": 40}"#)
        .unwrap();

    let mut book = AnswerBook::load(store.clone(), ANSWERS_KEY, PersistPolicy::WriteThrough).unwrap();
    assert_eq!(book.answers().get(&QuestionId::from(1)), Some("Marketplace"));
    assert_eq!(book.answers().get(&QuestionId::from(2)), Some(""));
    assert_eq!(book.answers().get(&QuestionId::from(5)), Some("40"));

    // 下一次寫入即升級成帶版本的格式
    book.set_answer(&QuestionId::from(2), "$4B").unwrap();
    let raw: serde_json::Value =
        serde_json::from_str(&store.get(ANSWERS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(raw["version"], 1);
    assert_eq!(raw["answers"]["2"], "$4B");
    assert_eq!(raw["answers"]["5"], "40");
}

#[test]
fn test_unknown_version_is_refused() {
    let dir = TempDir::new().unwrap();
    let store = slot_store(&dir);
    store
        .set(ANSWERS_KEY, r#"{"version": 9, "answers": {"1": "x"}}"#)
        .unwrap();

    let result = AnswerBook::load(store, ANSWERS_KEY, PersistPolicy::WriteThrough);
    assert!(matches!(
        result,
        Err(InsightError::UnsupportedStoreVersion { .. })
    ));
}

#[test]
fn test_on_navigate_policy_defers_writes() {
    let dir = TempDir::new().unwrap();
    let store = slot_store(&dir);

    let mut book = AnswerBook::new(store.clone(), ANSWERS_KEY, PersistPolicy::OnNavigate);
    book.set_answer(&QuestionId::from(4), "$900").unwrap();
    assert_eq!(book.state(), AnswerState::Populated);
    assert!(store.get(ANSWERS_KEY).unwrap().is_none());

    book.navigate().unwrap();
    assert_eq!(book.state(), AnswerState::Persisted);

    let reloaded = AnswerBook::load(store, ANSWERS_KEY, PersistPolicy::OnNavigate).unwrap();
    let summary = SummaryView::build(reloaded.answers(), &[]);
    assert_eq!(summary.quick_stat("LTV"), Some("$900"));
}

#[test]
fn test_reset_removes_slot() {
    let dir = TempDir::new().unwrap();
    let store = slot_store(&dir);
    store.set("other", "kept").unwrap();

    let mut book = AnswerBook::new(store.clone(), ANSWERS_KEY, PersistPolicy::WriteThrough);
    book.set_answer(&QuestionId::from(1), "SaaS").unwrap();
    book.reset().unwrap();

    assert!(book.answers().is_empty());
    assert!(store.get(ANSWERS_KEY).unwrap().is_none());
    assert_eq!(store.get("other").unwrap().as_deref(), Some("kept"));
}

#[test]
fn test_summary_page_written_through_storage() {
    let dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(dir.path().to_string_lossy());

    let mut book = AnswerBook::new(slot_store(&dir), ANSWERS_KEY, PersistPolicy::WriteThrough);
    book.set_answer(&QuestionId::from(5), "20% MoM").unwrap();
    let html = SummaryView::build(book.answers(), &[]).render_html(&StyleMap::default());

    tokio_test::block_on(async {
        storage
            .write_file("summary.html", html.as_bytes())
            .await
            .unwrap();
        let saved = storage.read_file("summary.html").await.unwrap();
        let saved = String::from_utf8(saved).unwrap();
        assert!(saved.contains("20% MoM"));
    });
}

#[test]
fn test_saved_questions_label_the_summary_after_reload() {
    let dir = TempDir::new().unwrap();
    let questions = vec![Question {
        id: QuestionId::from(3),
        question: "What does it cost to acquire a customer?".to_string(),
        category: QuestionCategory::Finance,
        importance: 4,
        insight_goal: "CAC".to_string(),
    }];

    let store = slot_store(&dir);
    save_questions(&store, &questions).unwrap();
    let mut book = AnswerBook::new(store, ANSWERS_KEY, PersistPolicy::WriteThrough);
    book.initialize(&questions);
    book.set_answer(&QuestionId::from(3), "$80").unwrap();

    let store = slot_store(&dir);
    let loaded = load_questions(&store).unwrap();
    let reloaded = AnswerBook::load(store, ANSWERS_KEY, PersistPolicy::WriteThrough).unwrap();
    let summary = SummaryView::build(reloaded.answers(), &loaded);

    assert_eq!(summary.responses.len(), 1);
    assert_eq!(
        summary.responses[0].label,
        "What does it cost to acquire a customer?"
    );
    assert_eq!(summary.quick_stat("CAC"), Some("$80"));
}
