use serde::Deserialize;

use crate::error::{AppError, AppResult, FileError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口（语音识别页面所在的 Chrome 实例）
    pub browser_debug_port: u16,
    /// 语音识别语言
    pub speech_language: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 会话日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    /// 试卷解析使用的模型
    pub analyzer_model: String,
    /// 答案评分使用的模型
    pub grader_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 2001,
            speech_language: "en-US".to_string(),
            verbose_logging: false,
            output_log_file: "session_log.txt".to_string(),
            llm_api_key: "26e96c4d312e48feacbd78b7c42bd71e".to_string(),
            llm_api_base_url: "http://menshen.xdf.cn/v1".to_string(),
            analyzer_model: "gemini-3.0-pro-preview".to_string(),
            grader_model: "gemini-3.0-flash-preview".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            speech_language: std::env::var("SPEECH_LANGUAGE").unwrap_or(default.speech_language),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            analyzer_model: std::env::var("ANALYZER_MODEL").unwrap_or(default.analyzer_model),
            grader_model: std::env::var("GRADER_MODEL").unwrap_or(default.grader_model),
        }
    }

    /// 从 TOML 文件加载配置
    ///
    /// 文件中省略的字段使用默认值
    pub fn from_file(path: &str) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path, e))?;
        let config = toml::from_str(&raw).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })?;
        Ok(config)
    }
}
