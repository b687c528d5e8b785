pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{JsonFileSlotStore, LocalStorage, MemorySlotStore};
pub use app::pipelines::{
    DashboardView, DocumentQuestions, DocumentView, InsightPipeline, PageVariant, SalesDashboard,
};
pub use config::AppConfig;
#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use core::engine::InsightEngine;
pub use utils::error::{InsightError, Result};
