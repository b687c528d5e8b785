pub mod analysis;
pub mod answers;
pub mod charts;
pub mod document;
pub mod engine;
pub mod ingest;
pub mod markdown;
pub mod metrics;
pub mod questions;
pub mod session;
pub mod spreadsheet;
pub mod summary;

pub use crate::domain::model::Record;
pub use crate::domain::ports::{ConfigProvider, KeyValueStore, Pipeline, Storage};
pub use crate::utils::error::Result;
