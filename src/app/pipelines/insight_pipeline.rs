use crate::app::pipelines::variant::PageVariant;
use crate::core::document::extract_docx_text;
use crate::core::ingest::{FileKind, UploadedFile};
use crate::core::spreadsheet::decode_workbook;
use crate::domain::model::{DecodedContent, FileInfo};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::{InsightError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// 解析 -> 衍生 -> 輸出，頁面差異交給 `V`
pub struct InsightPipeline<S: Storage, V: PageVariant> {
    storage: S,
    variant: V,
}

impl<S: Storage, V: PageVariant> InsightPipeline<S, V> {
    pub fn new(storage: S, variant: V) -> Self {
        Self { storage, variant }
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn report_name(&self) -> String {
        format!("{}_report.zip", self.variant.name())
    }
}

fn decode_failure(kind: FileKind, message: String) -> InsightError {
    match kind {
        FileKind::Spreadsheet => InsightError::SpreadsheetDecodeError { message },
        FileKind::Document => InsightError::DocumentDecodeError { message },
    }
}

/// 整個檔案在 blocking 執行緒上解析
async fn decode(kind: FileKind, bytes: Vec<u8>) -> Result<DecodedContent> {
    tokio::task::spawn_blocking(move || match kind {
        FileKind::Spreadsheet => decode_workbook(&bytes).map(DecodedContent::Sheet),
        FileKind::Document => extract_docx_text(&bytes).map(DecodedContent::Text),
    })
    .await
    .map_err(|e| decode_failure(kind, format!("decoder task failed: {}", e)))?
}

#[async_trait::async_trait]
impl<S: Storage, V: PageVariant> Pipeline for InsightPipeline<S, V> {
    type View = V::View;

    fn name(&self) -> &str {
        self.variant.name()
    }

    fn file_kind(&self) -> FileKind {
        self.variant.file_kind()
    }

    async fn extract(&self, upload: &UploadedFile) -> Result<DecodedContent> {
        tracing::debug!(
            "Decoding {} ({} bytes, {})",
            upload.name,
            upload.bytes.len(),
            upload.media_type
        );

        let content = decode(self.file_kind(), upload.bytes.clone()).await?;
        match &content {
            DecodedContent::Sheet(sheet) => {
                tracing::info!("📊 Decoded {} records", sheet.records.len())
            }
            DecodedContent::Text(text) => {
                tracing::info!("📄 Extracted {} characters", text.chars().count())
            }
        }
        Ok(content)
    }

    async fn transform(&self, file: FileInfo, content: DecodedContent) -> Result<V::View> {
        self.variant.derive(file, content).await
    }

    async fn load(&self, view: &V::View) -> Result<String> {
        let artifacts = self.variant.artifacts(view)?;
        let report_name = self.report_name();

        tracing::debug!("Creating ZIP file with {} files", artifacts.len());

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for artifact in &artifacts {
                zip.start_file::<_, ()>(artifact.name.as_str(), FileOptions::default())?;
                zip.write_all(&artifact.bytes)?;
            }
            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&report_name, &zip_data).await?;

        Ok(self.storage.location(&report_name))
    }
}
