use crate::core::ingest::FileKind;
use crate::domain::model::{DecodedContent, FileInfo};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// 報告壓縮檔中的一個檔案
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: content.into().into_bytes(),
        }
    }

    pub fn json<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            bytes: serde_json::to_vec_pretty(value)?,
        })
    }
}

/// 頁面差異的部分：接受哪種檔案、如何衍生 view、輸出哪些檔案
#[async_trait]
pub trait PageVariant: Send + Sync {
    type View: Serialize + Clone + Send + Sync;

    fn name(&self) -> &str;
    fn file_kind(&self) -> FileKind;
    async fn derive(&self, file: FileInfo, content: DecodedContent) -> Result<Self::View>;
    fn artifacts(&self, view: &Self::View) -> Result<Vec<Artifact>>;
}
