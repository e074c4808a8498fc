//! 作答进度
//!
//! 封装"正在作答第几题"这一信息

use std::fmt::Display;

/// 作答进度
///
/// 题号从1开始，仅用于展示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// 当前题号（从1开始）
    pub current: usize,

    /// 题目总数
    pub total: usize,
}

impl QuizProgress {
    /// 创建新的作答进度
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }
}

impl Display for QuizProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "第 {}/{} 题", self.current, self.total)
    }
}
