//! 頁面狀態與過期結果的處理。
//!
//! 每次上傳取得一個世代編號，後續的非同步請求（例如產生題目）再取得一個
//! 請求編號。完成時編號已經不是最新的，結果就直接丟棄，不會覆蓋較新的狀態。

use crate::core::ingest::{DecodeFailurePolicy, UploadedFile};
use crate::domain::model::FileInfo;
use crate::domain::ports::Pipeline;
use crate::utils::error::{ErrorCategory, InsightError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct PageState<V> {
    pub loading: bool,
    pub generating: bool,
    /// 顯示在頁面上的錯誤訊息
    pub error: Option<String>,
    pub file: Option<FileInfo>,
    pub view: Option<V>,
}

impl<V> Default for PageState<V> {
    fn default() -> Self {
        Self {
            loading: false,
            generating: false,
            error: None,
            file: None,
            view: None,
        }
    }
}

#[derive(Debug)]
pub enum IngestOutcome {
    Applied,
    /// 檔案類型不符，沒有進入解析
    Rejected(InsightError),
    Failed(InsightError),
    /// 期間有更新的上傳
    Superseded,
}

impl IngestOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, IngestOutcome::Applied)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            IngestOutcome::Applied => Ok(()),
            IngestOutcome::Rejected(e) | IngestOutcome::Failed(e) => Err(e),
            IngestOutcome::Superseded => Err(InsightError::Superseded),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    upload: u64,
    request: u64,
}

pub struct PageSession<V> {
    state: Mutex<PageState<V>>,
    upload_generation: AtomicU64,
    request_generation: AtomicU64,
}

impl<V> Default for PageSession<V> {
    fn default() -> Self {
        Self {
            state: Mutex::new(PageState::default()),
            upload_generation: AtomicU64::new(0),
            request_generation: AtomicU64::new(0),
        }
    }
}

impl<V: Clone + Send + Sync> PageSession<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> PageState<V> {
        self.state.lock().await.clone()
    }

    pub async fn view(&self) -> Option<V> {
        self.state.lock().await.view.clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.upload_generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.upload_generation.load(Ordering::SeqCst) == ticket.upload
            && self.request_generation.load(Ordering::SeqCst) == ticket.request
    }

    /// 檢查 -> 解析 -> 衍生，結果依檔案種類的失敗策略寫回狀態
    pub async fn ingest<P>(&self, pipeline: &P, upload: UploadedFile) -> IngestOutcome
    where
        P: Pipeline<View = V>,
    {
        let kind = pipeline.file_kind();

        if let Err(err) = kind.check(&upload) {
            tracing::warn!("🚫 Rejected '{}': {}", upload.name, err);
            self.state.lock().await.error = Some(err.to_string());
            return IngestOutcome::Rejected(err);
        }

        // 世代改變後，進行中的後續請求也一併失效
        let generation = {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.generating = false;
            state.error = None;
            self.upload_generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        tracing::info!(
            "📥 [{}] Ingesting '{}' (generation {})",
            pipeline.name(),
            upload.name,
            generation
        );

        let info = upload.info();
        let result = match pipeline.extract(&upload).await {
            Ok(content) => pipeline.transform(info.clone(), content).await,
            Err(e) => Err(e),
        };

        let mut state = self.state.lock().await;
        if self.current_generation() != generation {
            tracing::info!(
                "⏭️ [{}] Discarding result for '{}' (generation {} superseded)",
                pipeline.name(),
                upload.name,
                generation
            );
            return IngestOutcome::Superseded;
        }

        state.loading = false;
        match result {
            Ok(view) => {
                state.file = Some(info);
                state.view = Some(view);
                state.error = None;
                tracing::info!("✅ [{}] '{}' ready", pipeline.name(), upload.name);
                IngestOutcome::Applied
            }
            Err(err) => {
                match kind.failure_policy() {
                    DecodeFailurePolicy::KeepPrevious => {
                        tracing::error!(
                            "❌ [{}] Error parsing '{}': {}",
                            pipeline.name(),
                            upload.name,
                            err
                        );
                        // 外部服務失敗仍要顯示訊息，保留先前結果
                        if matches!(
                            err.category(),
                            ErrorCategory::Network | ErrorCategory::Payload
                        ) {
                            state.error = Some(err.to_string());
                        }
                    }
                    DecodeFailurePolicy::ClearAndReport => {
                        tracing::error!(
                            "❌ [{}] Could not read '{}': {}",
                            pipeline.name(),
                            upload.name,
                            err
                        );
                        state.file = None;
                        state.view = None;
                        state.error = Some(err.to_string());
                    }
                }
                IngestOutcome::Failed(err)
            }
        }
    }

    /// 以目前的 view 執行後續請求；成功套用 `apply`，失敗執行 `on_failure` 並記錄錯誤
    pub async fn follow_up<T, W, Fut, A, F>(&self, work: W, apply: A, on_failure: F) -> Result<()>
    where
        W: FnOnce(V) -> Fut,
        Fut: Future<Output = Result<T>>,
        A: FnOnce(&mut V, T),
        F: FnOnce(&mut V),
    {
        let (ticket, view) = {
            let mut state = self.state.lock().await;
            let Some(view) = state.view.clone() else {
                return Err(InsightError::NoFileSelected);
            };
            state.generating = true;
            state.error = None;
            let ticket = Ticket {
                upload: self.upload_generation.load(Ordering::SeqCst),
                request: self.request_generation.fetch_add(1, Ordering::SeqCst) + 1,
            };
            (ticket, view)
        };

        let result = work(view).await;

        let mut state = self.state.lock().await;
        if !self.is_current(ticket) {
            tracing::info!("⏭️ Discarding stale request result (request {})", ticket.request);
            return Err(InsightError::Superseded);
        }

        state.generating = false;
        let Some(view) = state.view.as_mut() else {
            return Err(InsightError::NoFileSelected);
        };

        match result {
            Ok(value) => {
                apply(view, value);
                Ok(())
            }
            Err(err) => {
                tracing::error!("❌ Request failed: {}", err);
                on_failure(view);
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// 同步修改目前的 view；沒有 view 時回傳 false
    pub async fn update_view(&self, f: impl FnOnce(&mut V)) -> bool {
        match self.state.lock().await.view.as_mut() {
            Some(view) => {
                f(view);
                true
            }
            None => false,
        }
    }
}
