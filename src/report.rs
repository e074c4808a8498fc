//! 成绩汇总
//!
//! 对作答记录做纯计算，不访问任何外部服务，可独立测试。

use std::fmt;

use crate::models::{ExamData, SessionResults, SubjectiveAnswerRecord};

/// 选择题得分百分比
///
/// 分母是试卷中的选择题总数。没有选择题时返回 0.0。
pub fn mcq_score_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (correct as f64 / total as f64) * 100.0
}

/// 主观题平均分
///
/// 对已有记录的算术平均值。没有记录时返回 0.0。
pub fn average_subjective_score(records: &[SubjectiveAnswerRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| r.score).sum();
    sum / records.len() as f64
}

/// 综合表现
///
/// 两部分得分之和除以有题目的部分数量。
/// 只有一个部分时综合分就等于该部分得分，部分数为 0 时返回 0.0（不产生 NaN）。
pub fn overall_performance(mcq_score: f64, avg_subjective: f64, sections_present: usize) -> f64 {
    if sections_present == 0 {
        return 0.0;
    }
    (mcq_score + avg_subjective) / sections_present as f64
}

/// 一次会话的成绩摘要
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    /// 试卷标题
    pub exam_title: String,
    /// 答对的选择题数量
    pub mcq_correct: usize,
    /// 试卷中的选择题总数
    pub mcq_total: usize,
    /// 选择题得分（0-100）
    pub mcq_score: f64,
    /// 试卷中的主观题总数
    pub subjective_total: usize,
    /// 主观题平均分（0-100）
    pub average_subjective: f64,
    /// 有题目的部分数量
    pub sections_present: usize,
    /// 综合表现（0-100）
    pub overall: f64,
}

impl PerformanceReport {
    /// 从试卷和作答记录计算成绩摘要
    pub fn build(exam: &ExamData, results: &SessionResults) -> Self {
        let mcq_correct = results.correct_mcq_count();
        let mcq_total = exam.mcqs.len();
        let mcq_score = mcq_score_percent(mcq_correct, mcq_total);
        let average_subjective = average_subjective_score(&results.subjective_results);
        let sections_present = exam.sections_present();
        let overall = overall_performance(mcq_score, average_subjective, sections_present);

        Self {
            exam_title: exam.title.clone(),
            mcq_correct,
            mcq_total,
            mcq_score,
            subjective_total: exam.subjective.len(),
            average_subjective,
            sections_present,
            overall,
        }
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "试卷: {}", self.exam_title)?;
        if self.mcq_total > 0 {
            writeln!(
                f,
                "选择题: {}/{} (得分 {:.0}%)",
                self.mcq_correct, self.mcq_total, self.mcq_score
            )?;
        }
        if self.subjective_total > 0 {
            writeln!(f, "主观题平均分: {:.1}", self.average_subjective)?;
        }
        write!(f, "综合表现: {:.0}/100", self.overall)
    }
}
