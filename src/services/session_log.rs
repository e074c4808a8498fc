//! 会话日志服务 - 业务能力层
//!
//! 只负责"写会话日志文件"能力，不关心流程

use anyhow::Result;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::config::Config;

/// 会话日志服务
///
/// 职责：
/// - 把一次练习会话的关键事件追加到日志文件
/// - 只处理单段内容
/// - 不出现会话阶段
/// - 不关心流程顺序
pub struct SessionLogWriter {
    log_file_path: String,
}

impl SessionLogWriter {
    /// 创建新的会话日志服务
    pub fn new(config: &Config) -> Self {
        Self {
            log_file_path: config.output_log_file.clone(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            log_file_path: path.into(),
        }
    }

    /// 初始化日志文件，写入带时间戳的文件头
    ///
    /// 已有内容会被清空，一次会话一份日志
    pub fn init(&self) -> Result<()> {
        let log_header = format!(
            "{}\n练习会话日志 - {}\n{}\n\n",
            "=".repeat(60),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(60)
        );
        fs::write(&self.log_file_path, log_header)?;
        Ok(())
    }

    /// 追加一段内容到日志文件
    ///
    /// # 参数
    /// - `content`: 要追加的文本，末尾自动补换行
    ///
    /// # 返回
    /// 返回是否成功写入
    pub async fn append(&self, content: &str) -> Result<()> {
        debug!(
            "写入会话日志: {} ({} 字符)",
            self.log_file_path,
            content.chars().count()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)?;

        file.write_all(content.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(())
    }
}
