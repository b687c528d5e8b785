use crate::core::markdown::{escape_html, render_narrative, StyleMap};
use crate::domain::model::{AnswerSet, Question, QuestionId};
use serde::Serialize;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStat {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedResponse {
    pub question_id: String,
    pub label: String,
    pub answer: String,
}

/// 結果頁：快速指標、摘要敘述、逐題回答
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub quick_stats: Vec<QuickStat>,
    pub narrative: String,
    pub responses: Vec<DetailedResponse>,
}

struct Answers<'a>(&'a AnswerSet);

impl Answers<'_> {
    fn get(&self, id: u32) -> Option<&str> {
        self.0.answered(&QuestionId::from(id))
    }

    fn or(&self, id: u32, fallback: &'static str) -> &str {
        self.get(id).unwrap_or(fallback)
    }
}

fn summary_narrative(answers: &Answers<'_>) -> String {
    format!(
        "## Business Overview\n\
         🎯 **Business Model**: {model}\n\
         💰 **Market Size**: {market}\n\
         📈 **Growth Rate**: Projecting {growth} growth\n\
         \n\
         ## Financial Metrics\n\
         - **CAC**: {cac}\n\
         - **LTV**: {ltv}\n\
         - **Gross Margins**: {margins}%\n\
         \n\
         ## Key Insights\n\
         1. Your {model_inline} business model shows strong potential in the {market_inline} market\n\
         2. Customer acquisition costs are {cac_state}\n\
         3. Growth metrics indicate {growth_state} trajectory\n\
         \n\
         ## Recommendations\n\
         - Focus on optimizing {cycle} to improve conversion\n\
         - Target {segments} for maximum impact\n\
         - Leverage {advantages} for market positioning\n",
        model = answers.or(1, NOT_AVAILABLE),
        market = answers.or(2, NOT_AVAILABLE),
        growth = answers.or(3, NOT_AVAILABLE),
        cac = answers.or(3, NOT_AVAILABLE),
        ltv = answers.or(4, NOT_AVAILABLE),
        margins = answers.or(6, NOT_AVAILABLE),
        model_inline = answers.or(1, ""),
        market_inline = answers.or(2, ""),
        cac_state = if answers.get(3).is_some() {
            "optimal"
        } else {
            "to be optimized"
        },
        growth_state = if answers.get(5).is_some() {
            "positive"
        } else {
            "room for"
        },
        cycle = answers.or(7, "sales cycle"),
        segments = answers.or(8, "key segments"),
        advantages = answers.or(10, "competitive advantages"),
    )
}

impl SummaryView {
    /// 題目文字已知時用題目當標籤，否則顯示 `Question <id>`
    pub fn build(answers: &AnswerSet, questions: &[Question]) -> Self {
        let lookup = Answers(answers);

        let quick_stats = [("Growth Rate", 5), ("TAM", 2), ("CAC", 3), ("LTV", 4)]
            .into_iter()
            .map(|(label, id)| QuickStat {
                label,
                value: lookup.or(id, NOT_AVAILABLE).to_string(),
            })
            .collect();

        let responses = answers
            .entries_ordered()
            .into_iter()
            .map(|(id, answer)| {
                let label = questions
                    .iter()
                    .find(|q| q.id.as_str() == id)
                    .map(|q| q.question.clone())
                    .unwrap_or_else(|| format!("Question {}", id));
                DetailedResponse {
                    question_id: id.to_string(),
                    label,
                    answer: answer.to_string(),
                }
            })
            .collect();

        Self {
            quick_stats,
            narrative: summary_narrative(&lookup),
            responses,
        }
    }

    pub fn quick_stat(&self, label: &str) -> Option<&str> {
        self.quick_stats
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.value.as_str())
    }

    pub fn render_html(&self, styles: &StyleMap) -> String {
        let mut html = String::from("<section class=\"quick-stats\">\n");
        for stat in &self.quick_stats {
            html.push_str(&format!(
                "<div class=\"p-4 rounded-xl border border-white/10 bg-white/5 space-y-2\"><p class=\"text-sm text-gray-400\">{}</p><p class=\"text-xl font-semibold\">{}</p></div>\n",
                escape_html(stat.label),
                escape_html(&stat.value)
            ));
        }
        html.push_str("</section>\n<section class=\"ai-analysis\">\n");
        html.push_str(&render_narrative(&self.narrative, styles));
        html.push_str("</section>\n<section class=\"detailed-responses\">\n");
        for response in &self.responses {
            html.push_str(&format!(
                "<div class=\"p-4 rounded-lg bg-white/5 border border-white/10\"><p class=\"text-sm text-gray-400 mb-1\">{}</p><p class=\"text-white font-medium\">{}</p></div>\n",
                escape_html(&response.label),
                escape_html(&response.answer)
            ));
        }
        html.push_str("</section>\n");
        html
    }
}
