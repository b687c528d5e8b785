use crate::core::ingest::UploadedFile;
use crate::core::session::PageSession;
use crate::domain::ports::Pipeline;
use crate::utils::error::{InsightError, Result};
use crate::utils::monitor::SystemMonitor;

/// 一個頁面：pipeline 加上它的狀態
pub struct InsightEngine<P: Pipeline> {
    pipeline: P,
    session: PageSession<P::View>,
    monitor: SystemMonitor,
}

impl<P> InsightEngine<P>
where
    P: Pipeline,
    P::View: Clone,
{
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            session: PageSession::new(),
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn session(&self) -> &PageSession<P::View> {
        &self.session
    }

    /// 解析並衍生，結果留在 session
    pub async fn ingest(&self, upload: UploadedFile) -> Result<()> {
        tracing::info!("🚀 [{}] Processing {}", self.pipeline.name(), upload.name);
        self.monitor.log_stats("Start");

        let outcome = self.session.ingest(&self.pipeline, upload).await;
        self.monitor.log_stats("Decode");
        outcome.into_result()
    }

    /// 把目前的 view 輸出成報告
    pub async fn export(&self) -> Result<String> {
        let view = self
            .session
            .view()
            .await
            .ok_or(InsightError::NoFileSelected)?;

        let output_path = self.pipeline.load(&view).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();
        tracing::info!("📁 Report saved to: {}", output_path);
        Ok(output_path)
    }

    pub async fn run(&self, upload: UploadedFile) -> Result<String> {
        self.ingest(upload).await?;
        self.export().await
    }
}
