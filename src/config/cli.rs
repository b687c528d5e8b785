use crate::config::toml_config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "sheet-insight")]
#[command(about = "Spreadsheet dashboards and document question workflows")]
pub struct Cli {
    #[arg(long, default_value = "sheet-insight.toml")]
    pub config: PathBuf,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Override service.base_url")]
    pub base_url: Option<String>,

    #[arg(long, help = "Override output.path")]
    pub output_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 試算表 -> 指標、圖表、分析敘述
    Dashboard {
        file: PathBuf,
        #[arg(long, help = "Call POST /api/analyze instead of the canned analysis")]
        remote_analysis: bool,
    },
    /// 文件 -> 純文字，可選擇產生題目
    Questions {
        file: PathBuf,
        #[arg(long, help = "Request analysis questions after decoding")]
        generate: bool,
    },
    /// 寫入一題的回答
    Answer { id: String, text: String },
    /// 從已儲存的回答產生結果頁
    Summary {
        #[arg(long, help = "Write the rendered summary page to this file")]
        html: Option<PathBuf>,
    },
}

impl Cli {
    /// CLI 參數優先於設定檔
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(base_url) = &self.base_url {
            config.service.base_url = base_url.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.output.path = output_path.clone();
        }
        match &self.command {
            Command::Dashboard {
                remote_analysis: true,
                ..
            } => config.analysis.mode = crate::core::analysis::AnalysisMode::Remote,
            Command::Questions { generate: true, .. } => config.questions.auto_generate = true,
            _ => {}
        }
    }
}
