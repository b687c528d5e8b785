pub mod document_questions;
pub mod insight_pipeline;
pub mod sales_dashboard;
pub mod variant;

pub use document_questions::{DocumentQuestions, DocumentView};
pub use insight_pipeline::InsightPipeline;
pub use sales_dashboard::{DashboardView, SalesDashboard};
pub use variant::{Artifact, PageVariant};
