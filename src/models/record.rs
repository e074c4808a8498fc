//! 作答记录模型
//!
//! 记录一经生成不再修改，按题目顺序追加到会话结果中。

use serde::{Deserialize, Serialize};

/// 单道选择题的作答记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqAnswerRecord {
    /// 题目ID
    pub question_id: String,
    /// 用户选择的选项文本
    pub selected_answer: String,
    /// 是否与正确答案大小写不敏感地一致
    pub is_correct: bool,
}

/// 评分服务对一次作答的返回结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// 0-100 分
    pub score: f64,
    /// 文字反馈
    pub feedback: String,
}

/// 单道主观题的作答记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectiveAnswerRecord {
    /// 题目ID
    pub question_id: String,
    /// 提交评分的语音转写文本
    pub transcript: String,
    /// 0-100 分
    pub score: f64,
    /// 评分反馈
    pub feedback: String,
}

/// 一次会话累计的全部作答结果
///
/// 选择题部分完成时一次性写入 mcq_results，
/// 主观题部分完成时一次性写入 subjective_results。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResults {
    pub mcq_results: Vec<McqAnswerRecord>,
    pub subjective_results: Vec<SubjectiveAnswerRecord>,
}

impl SessionResults {
    /// 答对的选择题数量
    pub fn correct_mcq_count(&self) -> usize {
        self.mcq_results.iter().filter(|r| r.is_correct).count()
    }
}
