//! 选择题作答流程 - 流程层
//!
//! 核心职责：定义选择题部分的完整作答流程
//!
//! 流程顺序：
//! 1. 按原始顺序展示当前题目 → 用户选择一个选项
//! 2. 确认后判分并追加作答记录
//! 3. 前进到下一题，最后一题确认后交出全部记录

use tracing::debug;

use crate::error::QuizError;
use crate::models::{Mcq, McqAnswerRecord};
use crate::workflow::progress::QuizProgress;

/// 确认当前题目后的下一步
#[derive(Debug, Clone, PartialEq)]
pub enum McqStep {
    /// 前进到下一题
    Advanced,
    /// 全部题目作答完毕，交出按题目顺序排列的记录
    Completed(Vec<McqAnswerRecord>),
}

/// 选择题作答状态机
///
/// - 按原始顺序逐题呈现，不回退、不重复
/// - 每题只接受一次选择，未选择时不允许确认
/// - 不持有任何外部资源，纯内存状态
pub struct McqQuiz {
    questions: Vec<Mcq>,
    current: usize,
    selected: Option<usize>,
    records: Vec<McqAnswerRecord>,
    finished: bool,
}

impl McqQuiz {
    /// 创建新的选择题作答流程
    ///
    /// 题目列表为空时拒绝创建，调用方应跳过该部分
    pub fn new(questions: Vec<Mcq>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        debug!("选择题部分开始，共 {} 题", questions.len());

        Ok(Self {
            questions,
            current: 0,
            selected: None,
            records: Vec::new(),
            finished: false,
        })
    }

    /// 当前题目，全部作答完毕后返回 None
    pub fn current_question(&self) -> Option<&Mcq> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current)
    }

    /// 当前作答进度
    pub fn progress(&self) -> QuizProgress {
        let current = (self.current + 1).min(self.questions.len());
        QuizProgress::new(current, self.questions.len())
    }

    /// 当前已选择的选项文本
    pub fn current_selection(&self) -> Option<&str> {
        let question = self.current_question()?;
        let index = self.selected?;
        question.options.get(index).map(String::as_str)
    }

    /// 当前选择是否与正确答案一致（尚未选择时返回 None）
    ///
    /// 只做展示用途，作答记录在确认时才生成
    pub fn selection_is_correct(&self) -> Option<bool> {
        let question = self.current_question()?;
        let selection = self.current_selection()?;
        Some(matches_correct_answer(question, selection))
    }

    /// 选择当前题目的一个选项
    ///
    /// 每题只接受一次选择，选定后不允许更改
    pub fn select(&mut self, option_index: usize) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        if self.selected.is_some() {
            return Err(QuizError::InvalidState {
                state: "已选择",
                action: "重新选择",
            });
        }

        let question = &self.questions[self.current];
        if option_index >= question.options.len() {
            return Err(QuizError::OptionOutOfRange {
                index: option_index,
                max_index: question.options.len().saturating_sub(1),
            });
        }

        debug!(
            "{} 选择了选项 {}: {}",
            self.progress(),
            option_index,
            question.options[option_index]
        );
        self.selected = Some(option_index);
        Ok(())
    }

    /// 确认当前选择并前进
    ///
    /// 未选择任何选项时返回错误，当前题号保持不变
    pub fn advance(&mut self) -> Result<McqStep, QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        let option_index = self.selected.ok_or(QuizError::NoSelection)?;

        let question = &self.questions[self.current];
        let selected_answer = question.options[option_index].clone();
        let is_correct = matches_correct_answer(question, &selected_answer);

        debug!(
            "{} 确认答案: {} ({})",
            self.progress(),
            selected_answer,
            if is_correct { "正确" } else { "错误" }
        );

        self.records.push(McqAnswerRecord {
            question_id: question.id.clone(),
            selected_answer,
            is_correct,
        });
        self.selected = None;
        self.current += 1;

        if self.current == self.questions.len() {
            self.finished = true;
            debug!("选择题部分完成，共 {} 条记录", self.records.len());
            Ok(McqStep::Completed(std::mem::take(&mut self.records)))
        } else {
            Ok(McqStep::Advanced)
        }
    }

    /// 是否已全部作答完毕
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// 选项与正确答案是否一致
///
/// 只做大小写不敏感的全文比较，不做空白或标点归一化
fn matches_correct_answer(question: &Mcq, selection: &str) -> bool {
    selection.to_lowercase() == question.correct_answer.to_lowercase()
}
