//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责会话推进和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `session` - 练习会话状态机
//! - 按阶段推进一次完整的练习（上传 → 解析 → 选择题 → 主观题 → 报告）
//! - 持有试卷数据和累计作答结果
//! - 阶段不符的操作一律拒绝并保持原状
//! - 不发起任何外部调用，调用结果由外层喂入
//!
//! ### `app` - 控制台应用
//! - 管理应用生命周期（初始化、运行、清理）
//! - 持有浏览器连接和各个外部服务
//! - 把用户输入翻译成会话状态机的方法调用
//! - 在解析、评分、录音期间驱动异步调用并喂回结果
//!
//! ## 层次关系
//!
//! ```text
//! app (控制台交互 + 外部调用)
//!     ↓
//! session (会话状态机)
//!     ↓
//! workflow::{McqQuiz, SubjectiveQuiz} (单个部分的作答状态机)
//!     ↓
//! services (能力层：analyzer / grader / speech)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：session 管状态，app 管交互和外部调用
//! 2. **资源隔离**：只有 app 持有 Browser、JsExecutor 和服务客户端
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **状态自洽**：外部调用失败只影响当前一步，已落账的结果不受影响

pub mod app;
pub mod session;

// 重新导出主要类型
pub use app::App;
pub use session::{AnalysisOutcome, ExamSession, QuizOutcome, SessionPhase};
