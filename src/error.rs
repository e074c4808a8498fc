use std::fmt;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 试卷解析错误
    Analysis(AnalysisError),
    /// 答案评分错误
    Grading(GradingError),
    /// 语音采集错误
    Capture(CaptureError),
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 文件操作错误
    File(FileError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Analysis(e) => write!(f, "解析错误: {}", e),
            AppError::Grading(e) => write!(f, "评分错误: {}", e),
            AppError::Capture(e) => write!(f, "语音采集错误: {}", e),
            AppError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Analysis(e) => Some(e),
            AppError::Grading(e) => Some(e),
            AppError::Capture(e) => Some(e),
            AppError::Browser(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 试卷解析错误
#[derive(Debug)]
pub enum AnalysisError {
    /// 调用解析模型失败
    RequestFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 模型返回结果为空
    EmptyResponse {
        model: String,
    },
    /// 模型返回内容无法解析为试卷结构
    ResponseParseFailed {
        response: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 解析成功但没有提取到任何题目
    NothingExtracted,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::RequestFailed { model, source } => {
                write!(f, "解析模型调用失败 (模型: {}): {}", model, source)
            }
            AnalysisError::EmptyResponse { model } => {
                write!(f, "解析模型返回结果为空 (模型: {})", model)
            }
            AnalysisError::ResponseParseFailed { response, source } => {
                write!(f, "无法解析模型返回的试卷结构 (响应: {}): {}", response, source)
            }
            AnalysisError::NothingExtracted => {
                write!(f, "文档中没有识别出任何题目，请尝试更清晰的试卷文件")
            }
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::RequestFailed { source, .. }
            | AnalysisError::ResponseParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 答案评分错误
#[derive(Debug)]
pub enum GradingError {
    /// 调用评分模型失败
    RequestFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 模型返回结果为空
    EmptyResponse {
        model: String,
    },
    /// 模型返回内容无法解析为评分结构
    ResponseParseFailed {
        response: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingError::RequestFailed { model, source } => {
                write!(f, "评分模型调用失败 (模型: {}): {}", model, source)
            }
            GradingError::EmptyResponse { model } => {
                write!(f, "评分模型返回结果为空 (模型: {})", model)
            }
            GradingError::ResponseParseFailed { response, source } => {
                write!(f, "无法解析模型返回的评分结构 (响应: {}): {}", response, source)
            }
        }
    }
}

impl std::error::Error for GradingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GradingError::RequestFailed { source, .. }
            | GradingError::ResponseParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 语音采集错误
#[derive(Debug)]
pub enum CaptureError {
    /// 页面中没有可用的语音识别能力
    RecognitionUnavailable,
    /// 采集已在进行中
    AlreadyActive,
    /// 当前没有进行中的采集
    NotActive,
    /// 页面脚本执行或结果解析失败
    ScriptFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器语音识别上报了错误事件
    RecognitionError {
        message: String,
    },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::RecognitionUnavailable => {
                write!(f, "当前浏览器页面不支持语音识别")
            }
            CaptureError::AlreadyActive => write!(f, "语音采集已在进行中"),
            CaptureError::NotActive => write!(f, "当前没有进行中的语音采集"),
            CaptureError::ScriptFailed { source } => {
                write!(f, "语音采集脚本执行失败: {}", source)
            }
            CaptureError::RecognitionError { message } => {
                write!(f, "语音识别错误: {}", message)
            }
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::ScriptFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 连接浏览器失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            BrowserError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::ConnectionFailed { source, .. }
            | BrowserError::PageCreationFailed { source }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 从 URL 下载文件失败
    DownloadFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 不支持的文件格式
    UnsupportedFormat {
        path: String,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::DownloadFailed { url, source } => {
                write!(f, "下载文件失败 ({}): {}", url, source)
            }
            FileError::UnsupportedFormat { path } => {
                write!(f, "不支持的文件格式: {} (支持 pdf/png/jpg/jpeg/webp/gif)", path)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::DownloadFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    EnvVarNotFound {
        var_name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::EnvVarNotFound { var_name } => {
                write!(f, "环境变量 {} 不存在", var_name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 状态机错误 ==========
// 会话与答题状态机返回的错误，不经过 AppError 包装，
// 由调用方（控制台循环或测试）直接处理

/// 会话阶段错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 当前阶段不允许该操作
    #[error("当前阶段 {phase} 不允许执行 {action}")]
    InvalidAction {
        phase: &'static str,
        action: &'static str,
    },
    /// 当前题目的状态机拒绝了该操作
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

/// 答题状态机错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// 题目列表为空
    #[error("题目列表为空，无法开始作答")]
    NoQuestions,
    /// 未选择任何选项
    #[error("尚未选择任何选项")]
    NoSelection,
    /// 选项索引超出范围
    #[error("选项索引 {index} 超出范围 [0, {max_index}]")]
    OptionOutOfRange { index: usize, max_index: usize },
    /// 本部分已作答完毕
    #[error("本部分已作答完毕")]
    AlreadyCompleted,
    /// 当前作答状态不允许该操作
    #[error("当前状态 {state} 不允许执行 {action}")]
    InvalidState {
        state: &'static str,
        action: &'static str,
    },
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        // 裸 ? 传播的 serde_json 错误只出现在页面脚本结果的反序列化中
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建解析模型调用错误
    pub fn analysis_request_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Analysis(AnalysisError::RequestFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建评分模型调用错误
    pub fn grading_request_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Grading(GradingError::RequestFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
