use crate::core::analysis::AnalysisMode;
use crate::core::answers::{PersistPolicy, ANSWERS_KEY};
use crate::core::questions::PayloadContract;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{InsightError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_STORAGE_PATH: &str = "./.sheet-insight/local_storage.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub questions: QuestionsConfig,
    pub analysis: AnalysisConfig,
    pub storage: StorageConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// 未設定就不限時
    pub timeout_seconds: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionsConfig {
    pub contract: PayloadContract,
    /// 文件解析完成後立刻產生題目
    pub auto_generate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub mode: AnalysisMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
    pub answers_key: String,
    pub persist: PersistPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORAGE_PATH.to_string(),
            answers_key: ANSWERS_KEY.to_string(),
            persist: PersistPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            tracing::debug!(
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| InsightError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SERVICE_URL})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }
}

impl ConfigProvider for AppConfig {
    fn service_base_url(&self) -> &str {
        &self.service.base_url
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.service.timeout_seconds.map(Duration::from_secs)
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn storage_path(&self) -> &str {
        &self.storage.path
    }

    fn answers_key(&self) -> &str {
        &self.storage.answers_key
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("service.base_url", &self.service.base_url)?;
        if let Some(timeout) = self.service.timeout_seconds {
            validate_range("service.timeout_seconds", timeout, 1, 600)?;
        }
        validate_path("storage.path", &self.storage.path)?;
        validate_non_empty_string("storage.answers_key", &self.storage.answers_key)?;
        validate_path("output.path", &self.output.path)?;
        Ok(())
    }
}
