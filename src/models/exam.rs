//! 试卷数据模型
//!
//! 由文档解析服务一次性产出，会话期间不可变；重置会话时整体丢弃。
//! 字段名与解析服务的 JSON 契约保持一致（camelCase）。

use serde::{Deserialize, Serialize};

/// 选择题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mcq {
    /// 题目ID（同一份试卷内唯一）
    pub id: String,
    /// 题干
    pub question: String,
    /// 选项列表（按原始顺序）
    pub options: Vec<String>,
    /// 正确答案，应与某个选项大小写不敏感地一致
    pub correct_answer: String,
    /// 答案解析（解析服务可能不提供）
    #[serde(default)]
    pub explanation: Option<String>,
}

/// 主观题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectiveQuestion {
    /// 题目ID（同一份试卷内唯一）
    pub id: String,
    /// 题干
    pub question: String,
    /// 答案应覆盖的要点
    #[serde(default)]
    pub key_points: Vec<String>,
    /// 参考答案
    pub model_answer: String,
}

/// 一份试卷的全部题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamData {
    /// 试卷标题
    pub title: String,
    /// 选择题列表
    pub mcqs: Vec<Mcq>,
    /// 主观题列表
    pub subjective: Vec<SubjectiveQuestion>,
}

impl ExamData {
    /// 两个部分是否都为空（解析成功但没有提取到任何题目）
    pub fn is_empty(&self) -> bool {
        self.mcqs.is_empty() && self.subjective.is_empty()
    }

    /// 有题目的部分数量（选择题部分、主观题部分各计 1）
    pub fn sections_present(&self) -> usize {
        usize::from(!self.mcqs.is_empty()) + usize::from(!self.subjective.is_empty())
    }

    /// 数据质量检查
    ///
    /// 只返回警告列表，不做任何修复：
    /// - 选项为空的选择题（用户无法作答，该部分无法完成）
    /// - 正确答案不在选项中的选择题（该题永远判错）
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for mcq in &self.mcqs {
            if mcq.options.is_empty() {
                warnings.push(format!("选择题 {} 没有任何选项，无法作答", mcq.id));
                continue;
            }

            let answer = mcq.correct_answer.to_lowercase();
            let found = mcq
                .options
                .iter()
                .any(|option| option.to_lowercase() == answer);
            if !found {
                warnings.push(format!(
                    "选择题 {} 的正确答案 \"{}\" 不在选项中，该题无法判对",
                    mcq.id, mcq.correct_answer
                ));
            }
        }

        warnings
    }

    /// 按ID查找选择题（用于报告展示）
    pub fn find_mcq(&self, id: &str) -> Option<&Mcq> {
        self.mcqs.iter().find(|mcq| mcq.id == id)
    }

    /// 按ID查找主观题（用于报告展示）
    pub fn find_subjective(&self, id: &str) -> Option<&SubjectiveQuestion> {
        self.subjective.iter().find(|question| question.id == id)
    }
}
