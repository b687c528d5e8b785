use crate::domain::model::FileInfo;
use crate::utils::error::{InsightError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

pub const XLSX_MEDIA_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MEDIA_TYPE: &str = "application/vnd.ms-excel";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// 解析失敗時頁面狀態的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailurePolicy {
    /// 只記錄日誌並清除 loading，保留先前結果
    KeepPrevious,
    /// 清除衍生狀態並顯示錯誤訊息
    ClearAndReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Spreadsheet,
    Document,
}

impl FileKind {
    pub fn accepted_media_types(&self) -> &'static [&'static str] {
        match self {
            FileKind::Spreadsheet => &[XLSX_MEDIA_TYPE, XLS_MEDIA_TYPE],
            FileKind::Document => &[DOCX_MEDIA_TYPE],
        }
    }

    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            FileKind::Spreadsheet => &["xlsx", "xls"],
            FileKind::Document => &["docx"],
        }
    }

    /// 試算表：媒體類型或副檔名符合即可；文件：必須是 DOCX 媒體類型
    pub fn accepts(&self, upload: &UploadedFile) -> bool {
        let media_ok = self
            .accepted_media_types()
            .iter()
            .any(|mt| upload.media_type.eq_ignore_ascii_case(mt));

        match self {
            FileKind::Spreadsheet => {
                media_ok
                    || upload
                        .extension()
                        .is_some_and(|ext| self.accepted_extensions().contains(&ext.as_str()))
            }
            FileKind::Document => media_ok,
        }
    }

    pub fn rejection_message(&self) -> &'static str {
        match self {
            FileKind::Spreadsheet => "Please select a valid Excel file (.xlsx or .xls)",
            FileKind::Document => "Please select a valid DOCX file",
        }
    }

    pub fn failure_policy(&self) -> DecodeFailurePolicy {
        match self {
            FileKind::Spreadsheet => DecodeFailurePolicy::KeepPrevious,
            FileKind::Document => DecodeFailurePolicy::ClearAndReport,
        }
    }

    pub fn check(&self, upload: &UploadedFile) -> Result<()> {
        if self.accepts(upload) {
            Ok(())
        } else {
            Err(InsightError::RejectedFile {
                file_name: upload.name.clone(),
                message: self.rejection_message().to_string(),
            })
        }
    }
}

/// 依副檔名推斷媒體類型
pub fn media_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("xlsx") => XLSX_MEDIA_TYPE,
        Some("xls") => XLS_MEDIA_TYPE,
        Some("docx") => DOCX_MEDIA_TYPE,
        Some("pdf") => "application/pdf",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        _ => UNKNOWN_MEDIA_TYPE,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = media_type_for(&name).to_string();
        Self {
            name,
            media_type,
            bytes,
            last_modified: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn info(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            size_bytes: self.bytes.len() as u64,
            media_type: self.media_type.clone(),
            last_modified: self.last_modified,
        }
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        tracing::debug!("Read {} ({} bytes)", name, bytes.len());

        let mut upload = Self::new(name, bytes);
        upload.last_modified = modified;
        Ok(upload)
    }
}

/// 拖放可能帶多個檔案，檔案選擇器最多一個
#[derive(Debug)]
pub enum FileSelection {
    Dropped(Vec<UploadedFile>),
    Picked(Option<UploadedFile>),
}

pub fn select_single(selection: FileSelection) -> Result<UploadedFile> {
    match selection {
        FileSelection::Dropped(mut files) => match files.len() {
            0 => Err(InsightError::NoFileSelected),
            1 => Ok(files.remove(0)),
            count => Err(InsightError::TooManyFiles { count }),
        },
        FileSelection::Picked(file) => file.ok_or(InsightError::NoFileSelected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_inferred_from_extension() {
        assert_eq!(UploadedFile::new("Sales.XLSX", vec![]).media_type, XLSX_MEDIA_TYPE);
        assert_eq!(UploadedFile::new("old.xls", vec![]).media_type, XLS_MEDIA_TYPE);
        assert_eq!(UploadedFile::new("plan.docx", vec![]).media_type, DOCX_MEDIA_TYPE);
        assert_eq!(UploadedFile::new("blob", vec![]).media_type, UNKNOWN_MEDIA_TYPE);
    }

    #[test]
    fn test_spreadsheet_accepts_by_media_type_or_extension() {
        let kind = FileKind::Spreadsheet;
        assert!(kind.accepts(&UploadedFile::new("data.xlsx", vec![])));
        assert!(kind.accepts(&UploadedFile::new("data", vec![]).with_media_type(XLS_MEDIA_TYPE)));
        assert!(kind.accepts(
            &UploadedFile::new("data.xls", vec![]).with_media_type(UNKNOWN_MEDIA_TYPE)
        ));
        assert!(!kind.accepts(&UploadedFile::new("data.csv", vec![])));
        assert!(!kind.accepts(&UploadedFile::new("plan.docx", vec![])));
    }

    #[test]
    fn test_document_requires_docx_media_type() {
        let kind = FileKind::Document;
        assert!(kind.accepts(&UploadedFile::new("plan.docx", vec![])));
        assert!(!kind.accepts(
            &UploadedFile::new("plan.docx", vec![]).with_media_type("application/pdf")
        ));

        let err = kind.check(&UploadedFile::new("plan.pdf", vec![])).unwrap_err();
        assert_eq!(err.to_string(), "Please select a valid DOCX file");
    }

    #[test]
    fn test_select_single_rejects_multiple_drops() {
        let files = vec![
            UploadedFile::new("a.xlsx", vec![]),
            UploadedFile::new("b.xlsx", vec![]),
        ];
        let err = select_single(FileSelection::Dropped(files)).unwrap_err();
        assert_eq!(err.to_string(), "Please drop only one file");

        let picked = select_single(FileSelection::Picked(Some(UploadedFile::new(
            "a.xlsx",
            vec![1, 2],
        ))))
        .unwrap();
        assert_eq!(picked.name, "a.xlsx");

        assert!(matches!(
            select_single(FileSelection::Picked(None)),
            Err(InsightError::NoFileSelected)
        ));
    }

    #[test]
    fn test_failure_policies() {
        assert_eq!(
            FileKind::Spreadsheet.failure_policy(),
            DecodeFailurePolicy::KeepPrevious
        );
        assert_eq!(
            FileKind::Document.failure_policy(),
            DecodeFailurePolicy::ClearAndReport
        );
    }
}
