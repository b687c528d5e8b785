use crate::app::pipelines::variant::{Artifact, PageVariant};
use crate::core::answers::{encode_answers, AnswerBook};
use crate::core::ingest::FileKind;
use crate::core::markdown::escape_html;
use crate::core::session::PageSession;
use crate::domain::model::{AnswerSet, DecodedContent, FileInfo, Question, QuestionId};
use crate::domain::ports::{KeyValueStore, QuestionService};
use crate::utils::error::{InsightError, Result};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub file: FileInfo,
    pub text: String,
    pub questions: Vec<Question>,
    pub answers: AnswerSet,
}

/// 文件 -> 純文字 -> 分析題目與回答
#[derive(Debug, Clone, Default)]
pub struct DocumentQuestions;

impl DocumentQuestions {
    pub fn new() -> Self {
        Self
    }
}

fn question_card(question: &Question, answer: &str) -> String {
    format!(
        "<div class=\"bg-white p-6 rounded-lg shadow-sm border\">\n\
         <h4 class=\"font-medium text-gray-900 text-lg\">{}</h4>\n\
         <span class=\"{} font-medium\">{}</span>\n\
         <span class=\"text-yellow-400\">{}</span>\n\
         <p class=\"text-sm text-gray-600\">{}</p>\n\
         <p class=\"answer\">{}</p>\n\
         </div>\n",
        escape_html(&question.question),
        question.category.badge_style(),
        question.category,
        "★".repeat(question.importance_stars()),
        escape_html(&question.insight_goal),
        escape_html(answer)
    )
}

pub fn questions_html(view: &DocumentView) -> String {
    let mut html = String::from("<h3 class=\"font-medium text-gray-900 text-lg\">Analysis Questions</h3>\n");
    for question in &view.questions {
        html.push_str(&question_card(
            question,
            view.answers.get(&question.id).unwrap_or_default(),
        ));
    }
    html
}

#[async_trait]
impl PageVariant for DocumentQuestions {
    type View = DocumentView;

    fn name(&self) -> &str {
        "document_questions"
    }

    fn file_kind(&self) -> FileKind {
        FileKind::Document
    }

    async fn derive(&self, file: FileInfo, content: DecodedContent) -> Result<DocumentView> {
        let DecodedContent::Text(text) = content else {
            return Err(InsightError::DocumentDecodeError {
                message: "Expected document text, got worksheet rows".to_string(),
            });
        };

        tracing::info!("📝 {} ready ({})", file.name, file.size_label());
        Ok(DocumentView {
            file,
            text,
            questions: Vec::new(),
            answers: AnswerSet::new(),
        })
    }

    fn artifacts(&self, view: &DocumentView) -> Result<Vec<Artifact>> {
        Ok(vec![
            Artifact::text("document.txt", view.text.clone()),
            Artifact::json("questions.json", &view.questions)?,
            Artifact::text("answers.json", encode_answers(&view.answers)?),
            Artifact::text("questions.html", questions_html(view)),
        ])
    }
}

impl PageSession<DocumentView> {
    /// 以目前文件向服務要題目；失敗時清空題目與回答
    pub async fn generate_questions(&self, service: &dyn QuestionService) -> Result<usize> {
        let mut count = 0;
        self.follow_up(
            |view| async move { service.generate(&view.text).await },
            |view, questions| {
                count = questions.len();
                view.answers = AnswerSet::blank_for(&questions);
                view.questions = questions;
            },
            |view| {
                view.questions.clear();
                view.answers = AnswerSet::new();
            },
        )
        .await?;
        Ok(count)
    }

    /// 更新頁面上的回答並交給回答簿保存
    pub async fn record_answer<K: KeyValueStore>(
        &self,
        book: &mut AnswerBook<K>,
        id: &QuestionId,
        text: &str,
    ) -> Result<()> {
        if !self
            .update_view(|view| {
                view.answers.set(id, text);
            })
            .await
        {
            return Err(InsightError::NoFileSelected);
        }
        book.set_answer(id, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::QuestionCategory;

    fn view() -> DocumentView {
        let question = Question {
            id: QuestionId::from(1),
            question: "Who buys <this>?".to_string(),
            category: QuestionCategory::Customers,
            importance: 7,
            insight_goal: "Identify the core segment".to_string(),
        };
        let mut answers = AnswerSet::blank_for(std::slice::from_ref(&question));
        answers.set(&question.id, "SMBs");
        DocumentView {
            file: FileInfo {
                name: "plan.docx".to_string(),
                size_bytes: 1024,
                media_type: crate::core::ingest::DOCX_MEDIA_TYPE.to_string(),
                last_modified: None,
            },
            text: "Business plan".to_string(),
            questions: vec![question],
            answers,
        }
    }

    #[test]
    fn test_questions_html_has_badge_and_stars() {
        let html = questions_html(&view());
        assert!(html.contains("Who buys &lt;this&gt;?"));
        assert!(html.contains("<span class=\"bg-blue-100 text-blue-800 font-medium\">customers</span>"));
        assert!(html.contains("★★★★★</span>"));
        assert!(!html.contains("★★★★★★"));
        assert!(html.contains("SMBs"));
    }

    #[test]
    fn test_artifacts() {
        let artifacts = DocumentQuestions::new().artifacts(&view()).unwrap();
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["document.txt", "questions.json", "answers.json", "questions.html"]
        );

        let answers: serde_json::Value = serde_json::from_slice(&artifacts[2].bytes).unwrap();
        assert_eq!(answers["version"], 1);
        assert_eq!(answers["answers"]["1"], "SMBs");
    }

    #[tokio::test]
    async fn test_derive_rejects_sheet_content() {
        let err = DocumentQuestions::new()
            .derive(
                view().file,
                DecodedContent::Sheet(crate::domain::model::DecodedSheet {
                    sheet_name: "Sheet1".to_string(),
                    headers: vec![],
                    records: vec![],
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InsightError::DocumentDecodeError { .. }));
    }
}
