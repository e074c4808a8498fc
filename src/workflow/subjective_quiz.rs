//! 主观题作答流程 - 流程层
//!
//! 核心职责：定义主观题部分的完整作答流程
//!
//! 每道题内部是一个小状态机：
//! 1. 空闲 → 开始录音（清空上一次的转写）
//! 2. 录音中 → 累积识别片段 → 停止录音
//! 3. 待提交 → 提交评分 → 评分中
//! 4. 评分成功生成作答记录，评分失败退回待提交可重试
//! 5. 前进到下一题，最后一题完成后交出全部记录

use tracing::debug;

use crate::error::QuizError;
use crate::models::{
    Evaluation, SubjectiveAnswerRecord, SubjectiveQuestion, TranscriptBuffer, TranscriptSegment,
};
use crate::workflow::progress::QuizProgress;

/// 单道主观题的作答状态
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerState {
    /// 没有转写内容，等待开始录音
    Idle,
    /// 录音中，识别片段持续到达
    Recording,
    /// 已有转写内容，等待提交评分或重新录音
    Ready,
    /// 评分请求已发出，等待结果
    Evaluating,
    /// 评分完成，等待前进到下一题
    Evaluated(Evaluation),
}

impl AnswerState {
    /// 状态名称，用于错误信息
    pub fn name(&self) -> &'static str {
        match self {
            AnswerState::Idle => "空闲",
            AnswerState::Recording => "录音中",
            AnswerState::Ready => "待提交",
            AnswerState::Evaluating => "评分中",
            AnswerState::Evaluated(_) => "已评分",
        }
    }
}

/// 前进后的下一步
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectiveStep {
    /// 前进到下一题
    Advanced,
    /// 全部题目作答完毕，交出按题目顺序排列的记录
    Completed(Vec<SubjectiveAnswerRecord>),
}

/// 一次评分请求的全部输入
///
/// 由状态机在进入评分中状态时产出，调用方原样转交给评分服务
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    /// 题干
    pub question: String,
    /// 评分要点
    pub key_points: Vec<String>,
    /// 参考答案
    pub model_answer: String,
    /// 用户作答的转写全文
    pub transcript: String,
}

/// 主观题作答状态机
///
/// - 按原始顺序逐题呈现，不回退、不重复
/// - 录音中和转写为空时不允许提交评分
/// - 评分失败不产生记录，转写保持原样可重新提交
/// - 不持有任何外部资源，识别片段和评分结果由调用方喂入
pub struct SubjectiveQuiz {
    questions: Vec<SubjectiveQuestion>,
    current: usize,
    state: AnswerState,
    buffer: TranscriptBuffer,
    records: Vec<SubjectiveAnswerRecord>,
    finished: bool,
}

impl SubjectiveQuiz {
    /// 创建新的主观题作答流程
    ///
    /// 题目列表为空时拒绝创建，调用方应跳过该部分
    pub fn new(questions: Vec<SubjectiveQuestion>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        debug!("主观题部分开始，共 {} 题", questions.len());

        Ok(Self {
            questions,
            current: 0,
            state: AnswerState::Idle,
            buffer: TranscriptBuffer::new(),
            records: Vec::new(),
            finished: false,
        })
    }

    /// 当前题目，全部作答完毕后返回 None
    pub fn current_question(&self) -> Option<&SubjectiveQuestion> {
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

    /// 当前题目的作答状态
    pub fn state(&self) -> &AnswerState {
        &self.state
    }

    /// 可提交的转写全文
    pub fn transcript(&self) -> String {
        self.buffer.transcript()
    }

    /// 实时展示文本（含最新的临时片段）
    pub fn display_text(&self) -> String {
        self.buffer.display_text()
    }

    /// 开始录音
    ///
    /// 重新录音会丢弃本题此前的全部转写内容
    pub fn start_recording(&mut self) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        match self.state {
            AnswerState::Idle | AnswerState::Ready => {
                self.buffer.clear();
                self.state = AnswerState::Recording;
                debug!("{} 开始录音", self.progress());
                Ok(())
            }
            ref other => Err(QuizError::InvalidState {
                state: other.name(),
                action: "开始录音",
            }),
        }
    }

    /// 喂入一段识别结果（仅录音中有效）
    pub fn push_segment(&mut self, segment: &TranscriptSegment) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        if self.state != AnswerState::Recording {
            return Err(QuizError::InvalidState {
                state: self.state.name(),
                action: "喂入识别片段",
            });
        }
        self.buffer.apply(segment);
        Ok(())
    }

    /// 停止录音
    ///
    /// 丢弃未定稿的临时片段；没有任何最终片段时回到空闲状态。
    /// 采集服务中途报错时也走这条路径，已有的最终片段保留。
    pub fn stop_recording(&mut self) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        if self.state != AnswerState::Recording {
            return Err(QuizError::InvalidState {
                state: self.state.name(),
                action: "停止录音",
            });
        }

        self.buffer.discard_interim();
        self.state = if self.buffer.is_empty() {
            AnswerState::Idle
        } else {
            AnswerState::Ready
        };
        debug!(
            "{} 停止录音，转写 {} 字",
            self.progress(),
            self.buffer.transcript().chars().count()
        );
        Ok(())
    }

    /// 提交当前转写进入评分
    ///
    /// 只有待提交状态允许，录音中或转写为空时直接拒绝
    pub fn begin_evaluation(&mut self) -> Result<EvaluationRequest, QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        if self.state != AnswerState::Ready {
            return Err(QuizError::InvalidState {
                state: self.state.name(),
                action: "提交评分",
            });
        }

        let question = &self.questions[self.current];
        let request = EvaluationRequest {
            question: question.question.clone(),
            key_points: question.key_points.clone(),
            model_answer: question.model_answer.clone(),
            transcript: self.buffer.transcript(),
        };
        self.state = AnswerState::Evaluating;
        debug!("{} 提交评分", self.progress());
        Ok(request)
    }

    /// 评分成功，生成本题的作答记录
    pub fn complete_evaluation(&mut self, evaluation: Evaluation) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        if self.state != AnswerState::Evaluating {
            return Err(QuizError::InvalidState {
                state: self.state.name(),
                action: "写入评分结果",
            });
        }

        let question = &self.questions[self.current];
        debug!("{} 评分完成: {:.0} 分", self.progress(), evaluation.score);
        self.records.push(SubjectiveAnswerRecord {
            question_id: question.id.clone(),
            transcript: self.buffer.transcript(),
            score: evaluation.score,
            feedback: evaluation.feedback.clone(),
        });
        self.state = AnswerState::Evaluated(evaluation);
        Ok(())
    }

    /// 评分失败，退回待提交状态
    ///
    /// 不产生记录，转写保持原样，用户可以重新提交或重新录音
    pub fn fail_evaluation(&mut self) -> Result<(), QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        if self.state != AnswerState::Evaluating {
            return Err(QuizError::InvalidState {
                state: self.state.name(),
                action: "标记评分失败",
            });
        }

        debug!("{} 评分失败，可重新提交", self.progress());
        self.state = AnswerState::Ready;
        Ok(())
    }

    /// 前进到下一题
    ///
    /// 只有已评分状态允许，转写随之清空
    pub fn advance(&mut self) -> Result<SubjectiveStep, QuizError> {
        if self.finished {
            return Err(QuizError::AlreadyCompleted);
        }
        if !matches!(self.state, AnswerState::Evaluated(_)) {
            return Err(QuizError::InvalidState {
                state: self.state.name(),
                action: "前进到下一题",
            });
        }

        self.buffer.clear();
        self.state = AnswerState::Idle;
        self.current += 1;

        if self.current == self.questions.len() {
            self.finished = true;
            debug!("主观题部分完成，共 {} 条记录", self.records.len());
            Ok(SubjectiveStep::Completed(std::mem::take(&mut self.records)))
        } else {
            Ok(SubjectiveStep::Advanced)
        }
    }

    /// 是否已全部作答完毕
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str) -> SubjectiveQuestion {
        SubjectiveQuestion {
            id: id.to_string(),
            question: format!("题目 {}", id),
            key_points: vec!["要点".to_string()],
            model_answer: format!("参考答案 {}", id),
        }
    }

    fn record_answer(quiz: &mut SubjectiveQuiz, text: &str) {
        quiz.start_recording().expect("开始录音失败");
        quiz.push_segment(&TranscriptSegment::final_text(text))
            .expect("喂入片段失败");
        quiz.stop_recording().expect("停止录音失败");
    }

    fn evaluation(score: f64) -> Evaluation {
        Evaluation {
            score,
            feedback: "讲到了要点".to_string(),
        }
    }

    #[test]
    fn test_empty_question_list_is_rejected() {
        assert_eq!(
            SubjectiveQuiz::new(Vec::new()).err(),
            Some(QuizError::NoQuestions)
        );
    }

    #[test]
    fn test_full_flow_produces_ordered_records() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1"), question("s2")]).unwrap();

        record_answer(&mut quiz, "第一题的回答");
        let request = quiz.begin_evaluation().unwrap();
        assert_eq!(request.question, "题目 s1");
        assert_eq!(request.model_answer, "参考答案 s1");
        assert_eq!(request.transcript, "第一题的回答");
        quiz.complete_evaluation(evaluation(80.0)).unwrap();
        assert_eq!(quiz.advance().unwrap(), SubjectiveStep::Advanced);

        // 前进后转写已清空，回到空闲状态
        assert_eq!(quiz.state(), &AnswerState::Idle);
        assert_eq!(quiz.transcript(), "");

        record_answer(&mut quiz, "第二题的回答");
        quiz.begin_evaluation().unwrap();
        quiz.complete_evaluation(evaluation(60.0)).unwrap();
        match quiz.advance().unwrap() {
            SubjectiveStep::Completed(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].question_id, "s1");
                assert_eq!(records[0].transcript, "第一题的回答");
                assert_eq!(records[0].score, 80.0);
                assert_eq!(records[1].question_id, "s2");
            }
            other => panic!("应当完成，实际为 {:?}", other),
        }
        assert!(quiz.is_finished());
    }

    #[test]
    fn test_restart_recording_discards_previous_transcript() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1")]).unwrap();

        record_answer(&mut quiz, "第一次的回答");
        assert_eq!(quiz.transcript(), "第一次的回答");

        // 重新录音清空旧转写
        quiz.start_recording().unwrap();
        assert_eq!(quiz.transcript(), "");
        quiz.push_segment(&TranscriptSegment::final_text("第二次的回答"))
            .unwrap();
        quiz.stop_recording().unwrap();
        assert_eq!(quiz.transcript(), "第二次的回答");
    }

    #[test]
    fn test_grading_failure_keeps_transcript_and_allows_resubmit() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1")]).unwrap();

        record_answer(&mut quiz, "我的回答");
        quiz.begin_evaluation().unwrap();
        quiz.fail_evaluation().unwrap();

        // 没有产生记录，转写原样保留
        assert_eq!(quiz.state(), &AnswerState::Ready);
        assert_eq!(quiz.transcript(), "我的回答");

        // 可以直接重新提交
        let request = quiz.begin_evaluation().unwrap();
        assert_eq!(request.transcript, "我的回答");
        quiz.complete_evaluation(evaluation(75.0)).unwrap();
        match quiz.advance().unwrap() {
            SubjectiveStep::Completed(records) => assert_eq!(records.len(), 1),
            other => panic!("应当完成，实际为 {:?}", other),
        }
    }

    #[test]
    fn test_interim_segments_never_enter_transcript() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1")]).unwrap();

        quiz.start_recording().unwrap();
        quiz.push_segment(&TranscriptSegment::final_text("定稿部分。"))
            .unwrap();
        quiz.push_segment(&TranscriptSegment::interim("临时部分"))
            .unwrap();
        assert_eq!(quiz.display_text(), "定稿部分。临时部分");

        quiz.stop_recording().unwrap();
        assert_eq!(quiz.transcript(), "定稿部分。");
        assert_eq!(quiz.display_text(), "定稿部分。");
    }

    #[test]
    fn test_stop_with_no_finals_returns_to_idle() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1")]).unwrap();

        quiz.start_recording().unwrap();
        quiz.push_segment(&TranscriptSegment::interim("只有临时片段"))
            .unwrap();
        quiz.stop_recording().unwrap();

        assert_eq!(quiz.state(), &AnswerState::Idle);
        // 转写为空，不允许提交评分
        assert!(matches!(
            quiz.begin_evaluation().err(),
            Some(QuizError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_submission_blocked_while_recording() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1")]).unwrap();

        quiz.start_recording().unwrap();
        quiz.push_segment(&TranscriptSegment::final_text("回答"))
            .unwrap();
        assert!(matches!(
            quiz.begin_evaluation().err(),
            Some(QuizError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_segments_rejected_outside_recording() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1")]).unwrap();

        let err = quiz
            .push_segment(&TranscriptSegment::final_text("迟到的片段"))
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidState { .. }));
        assert_eq!(quiz.transcript(), "");
    }

    #[test]
    fn test_advance_requires_evaluation() {
        let mut quiz = SubjectiveQuiz::new(vec![question("s1")]).unwrap();

        record_answer(&mut quiz, "回答");
        assert!(matches!(
            quiz.advance().err(),
            Some(QuizError::InvalidState { .. })
        ));
        // 题号不变
        assert_eq!(quiz.progress(), QuizProgress::new(1, 1));
    }
}
