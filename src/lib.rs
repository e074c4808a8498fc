//! # Exam Voice Practice
//!
//! 一个上传试卷、口述作答、AI 评分的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个输入
//! - `ExamAnalyzer` - 文档 → 试卷结构的解析能力
//! - `AnswerGrader` - 转写 → 评分的评判能力
//! - `BrowserSpeechCapture` - 麦克风 → 转写片段的采集能力
//! - `SessionLogWriter` - 写会话日志能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个部分"的作答流程
//! - `McqQuiz` - 选择题流程（选定即锁、只进不退）
//! - `SubjectiveQuiz` - 主观题流程（录音 → 转写 → 评分）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session` - 练习会话状态机，按阶段推进
//! - `orchestrator/app` - 控制台应用，驱动状态机并喂入外部结果
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod report;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{ExamData, SessionResults};
pub use orchestrator::{App, ExamSession, SessionPhase};
pub use report::PerformanceReport;
pub use workflow::{McqQuiz, SubjectiveQuiz};
