use crate::core::ingest::{FileKind, UploadedFile};
use crate::domain::model::{AnalysisEnvelope, DecodedContent, FileInfo, Question, Record};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 報告輸出位置
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn location(&self, path: &str) -> String;
}

/// 單一鍵值槽，對應瀏覽器的 localStorage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn service_base_url(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
    fn output_path(&self) -> &str;
    fn storage_path(&self) -> &str;
    fn answers_key(&self) -> &str;
}

#[async_trait]
pub trait QuestionService: Send + Sync {
    async fn generate(&self, text: &str) -> Result<Vec<Question>>;
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, records: &[Record]) -> Result<AnalysisEnvelope>;
}

/// 解析 -> 衍生 -> 呈現
#[async_trait]
pub trait Pipeline: Send + Sync {
    type View: Send + Sync;

    fn name(&self) -> &str;
    fn file_kind(&self) -> FileKind;
    async fn extract(&self, upload: &UploadedFile) -> Result<DecodedContent>;
    async fn transform(&self, file: FileInfo, content: DecodedContent) -> Result<Self::View>;
    async fn load(&self, view: &Self::View) -> Result<String>;
}
