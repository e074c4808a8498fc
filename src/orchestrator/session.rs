//! 练习会话 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个练习流程的状态机，按阶段推进一次完整的会话。
//!
//! ## 阶段顺序
//!
//! 1. **等待上传** → 用户选定试卷文件后进入解析
//! 2. **解析中** → 解析服务返回试卷后按题型分流
//! 3. **选择题作答** → 全部确认后进入小结
//! 4. **选择题小结** → 继续进入主观题或直接出报告
//! 5. **主观题作答** → 全部评分后进入报告
//! 6. **成绩报告** → 重置后回到等待上传
//!
//! 状态机本身不发起任何外部调用：解析和评分的成功/失败
//! 由调用方在调用结束后喂入，进行中的调用对应停留在相应阶段。

use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::models::{Evaluation, ExamData, SessionResults, TranscriptSegment};
use crate::report::PerformanceReport;
use crate::workflow::{
    EvaluationRequest, McqQuiz, McqStep, SubjectiveQuiz, SubjectiveStep,
};

/// 会话所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// 等待上传试卷文件
    Upload,
    /// 解析服务调用进行中
    Analyzing,
    /// 选择题作答
    QuizMcq,
    /// 选择题小结，等待用户继续
    McqIntermediate,
    /// 主观题作答
    QuizSubjective,
    /// 成绩报告
    Results,
}

impl SessionPhase {
    /// 阶段名称，用于错误信息和日志
    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Upload => "等待上传",
            SessionPhase::Analyzing => "解析中",
            SessionPhase::QuizMcq => "选择题作答",
            SessionPhase::McqIntermediate => "选择题小结",
            SessionPhase::QuizSubjective => "主观题作答",
            SessionPhase::Results => "成绩报告",
        }
    }
}

/// 解析结果分流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// 有选择题，从选择题部分开始
    McqStarted,
    /// 没有选择题但有主观题，直接进入主观题部分
    SubjectiveStarted,
    /// 两个部分都是空的，退回上传阶段
    NothingExtracted,
}

/// 确认一道题后会话层面的下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    /// 继续作答下一题
    NextQuestion,
    /// 本部分完成，会话已进入下一阶段
    SectionComplete,
}

/// 练习会话状态机
///
/// - 持有试卷数据、累计结果和当前部分的作答状态机
/// - 每个用户动作对应一个方法，阶段不符时拒绝并保持原状
/// - 已落账的作答记录只会在重置时被丢弃
pub struct ExamSession {
    phase: SessionPhase,
    exam: Option<ExamData>,
    results: SessionResults,
    mcq_quiz: Option<McqQuiz>,
    subjective_quiz: Option<SubjectiveQuiz>,
}

impl Default for ExamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamSession {
    /// 创建新会话，从等待上传阶段开始
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Upload,
            exam: None,
            results: SessionResults::default(),
            mcq_quiz: None,
            subjective_quiz: None,
        }
    }

    // ========== 只读访问 ==========

    /// 当前阶段
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// 本会话的试卷（解析成功后可用）
    pub fn exam(&self) -> Option<&ExamData> {
        self.exam.as_ref()
    }

    /// 累计的作答结果
    pub fn results(&self) -> &SessionResults {
        &self.results
    }

    /// 选择题作答状态机（选择题作答阶段可用）
    pub fn mcq_quiz(&self) -> Option<&McqQuiz> {
        self.mcq_quiz.as_ref()
    }

    /// 主观题作答状态机（主观题作答阶段可用）
    pub fn subjective_quiz(&self) -> Option<&SubjectiveQuiz> {
        self.subjective_quiz.as_ref()
    }

    // ========== 上传与解析 ==========

    /// 开始解析上传的试卷
    ///
    /// 进入解析中阶段后，调用方负责发起解析调用，
    /// 并用 [`analysis_succeeded`](Self::analysis_succeeded) 或
    /// [`analysis_failed`](Self::analysis_failed) 喂入结果。
    pub fn begin_analysis(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::Upload, "开始解析")?;
        self.phase = SessionPhase::Analyzing;
        info!("🔍 开始解析试卷文档...");
        Ok(())
    }

    /// 解析成功，按题型分流
    ///
    /// # 参数
    /// - `exam`: 解析服务产出的试卷数据
    ///
    /// # 返回
    /// 返回会话接下来进入的部分；两个部分都为空时退回上传阶段
    pub fn analysis_succeeded(&mut self, exam: ExamData) -> Result<AnalysisOutcome, SessionError> {
        self.expect_phase(SessionPhase::Analyzing, "写入解析结果")?;

        for warning in exam.validate() {
            warn!("⚠️ 试卷数据质量问题: {}", warning);
        }

        let outcome = if let Ok(quiz) = McqQuiz::new(exam.mcqs.clone()) {
            self.mcq_quiz = Some(quiz);
            self.phase = SessionPhase::QuizMcq;
            AnalysisOutcome::McqStarted
        } else if let Ok(quiz) = SubjectiveQuiz::new(exam.subjective.clone()) {
            self.subjective_quiz = Some(quiz);
            self.phase = SessionPhase::QuizSubjective;
            AnalysisOutcome::SubjectiveStarted
        } else {
            // 两个部分都是空的，不保留试卷数据
            warn!("⚠️ 解析成功但没有提取到任何题目");
            self.phase = SessionPhase::Upload;
            return Ok(AnalysisOutcome::NothingExtracted);
        };

        info!(
            "✓ 解析完成: {} (选择题 {} 道, 主观题 {} 道)",
            exam.title,
            exam.mcqs.len(),
            exam.subjective.len()
        );
        self.exam = Some(exam);
        Ok(outcome)
    }

    /// 解析失败，退回上传阶段
    ///
    /// 不保留任何部分解析结果
    pub fn analysis_failed(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::Analyzing, "标记解析失败")?;
        warn!("❌ 试卷解析失败，退回上传阶段");
        self.phase = SessionPhase::Upload;
        self.exam = None;
        Ok(())
    }

    // ========== 选择题部分 ==========

    /// 选择当前选择题的一个选项
    pub fn mcq_select(&mut self, option_index: usize) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::QuizMcq, "选择选项")?;
        self.mcq_quiz_mut()?.select(option_index)?;
        Ok(())
    }

    /// 确认当前选择题并前进
    ///
    /// 全部题目确认后把记录落账，并进入选择题小结阶段
    pub fn mcq_advance(&mut self) -> Result<QuizOutcome, SessionError> {
        self.expect_phase(SessionPhase::QuizMcq, "确认答案")?;

        match self.mcq_quiz_mut()?.advance()? {
            McqStep::Advanced => Ok(QuizOutcome::NextQuestion),
            McqStep::Completed(records) => {
                info!(
                    "✅ 选择题部分完成: {}/{} 答对",
                    records.iter().filter(|r| r.is_correct).count(),
                    records.len()
                );
                self.results.mcq_results = records;
                self.mcq_quiz = None;
                self.phase = SessionPhase::McqIntermediate;
                Ok(QuizOutcome::SectionComplete)
            }
        }
    }

    /// 看完选择题小结后继续
    ///
    /// 有主观题时进入主观题部分，否则直接出成绩报告
    pub fn proceed_after_mcq(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::McqIntermediate, "继续下一部分")?;

        let subjective = self
            .exam
            .as_ref()
            .map(|exam| exam.subjective.clone())
            .unwrap_or_default();

        if let Ok(quiz) = SubjectiveQuiz::new(subjective) {
            self.subjective_quiz = Some(quiz);
            self.phase = SessionPhase::QuizSubjective;
        } else {
            // 没有主观题，直接出报告
            self.phase = SessionPhase::Results;
        }
        Ok(())
    }

    // ========== 主观题部分 ==========

    /// 开始录音作答当前主观题
    pub fn start_recording(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::QuizSubjective, "开始录音")?;
        self.subjective_quiz_mut()?.start_recording()?;
        Ok(())
    }

    /// 喂入一段语音识别结果
    pub fn push_segment(&mut self, segment: &TranscriptSegment) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::QuizSubjective, "喂入识别片段")?;
        self.subjective_quiz_mut()?.push_segment(segment)?;
        Ok(())
    }

    /// 停止录音
    pub fn stop_recording(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::QuizSubjective, "停止录音")?;
        self.subjective_quiz_mut()?.stop_recording()?;
        Ok(())
    }

    /// 提交当前转写进入评分
    ///
    /// 返回的请求由调用方转交评分服务，结果用
    /// [`complete_evaluation`](Self::complete_evaluation) 或
    /// [`fail_evaluation`](Self::fail_evaluation) 喂回
    pub fn begin_evaluation(&mut self) -> Result<EvaluationRequest, SessionError> {
        self.expect_phase(SessionPhase::QuizSubjective, "提交评分")?;
        let request = self.subjective_quiz_mut()?.begin_evaluation()?;
        Ok(request)
    }

    /// 评分成功
    pub fn complete_evaluation(&mut self, evaluation: Evaluation) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::QuizSubjective, "写入评分结果")?;
        self.subjective_quiz_mut()?.complete_evaluation(evaluation)?;
        Ok(())
    }

    /// 评分失败，当前题保持可重新提交
    pub fn fail_evaluation(&mut self) -> Result<(), SessionError> {
        self.expect_phase(SessionPhase::QuizSubjective, "标记评分失败")?;
        self.subjective_quiz_mut()?.fail_evaluation()?;
        Ok(())
    }

    /// 前进到下一道主观题
    ///
    /// 全部题目评分后把记录落账，并进入成绩报告阶段
    pub fn subjective_advance(&mut self) -> Result<QuizOutcome, SessionError> {
        self.expect_phase(SessionPhase::QuizSubjective, "前进到下一题")?;

        match self.subjective_quiz_mut()?.advance()? {
            SubjectiveStep::Advanced => Ok(QuizOutcome::NextQuestion),
            SubjectiveStep::Completed(records) => {
                info!("✅ 主观题部分完成: 共 {} 道", records.len());
                self.results.subjective_results = records;
                self.subjective_quiz = None;
                self.phase = SessionPhase::Results;
                Ok(QuizOutcome::SectionComplete)
            }
        }
    }

    // ========== 报告与重置 ==========

    /// 生成成绩报告
    pub fn report(&self) -> Result<PerformanceReport, SessionError> {
        self.expect_phase(SessionPhase::Results, "生成报告")?;

        let exam = self.exam.as_ref().ok_or(SessionError::InvalidAction {
            phase: self.phase.name(),
            action: "生成报告",
        })?;
        Ok(PerformanceReport::build(exam, &self.results))
    }

    /// 重置会话，丢弃试卷数据和全部作答结果
    ///
    /// 解析调用进行中不允许重置；等待上传阶段没有可重置的内容
    pub fn reset(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Upload | SessionPhase::Analyzing => {
                Err(SessionError::InvalidAction {
                    phase: self.phase.name(),
                    action: "重置会话",
                })
            }
            _ => {
                info!("🔄 重置会话");
                self.phase = SessionPhase::Upload;
                self.exam = None;
                self.results = SessionResults::default();
                self.mcq_quiz = None;
                self.subjective_quiz = None;
                Ok(())
            }
        }
    }

    // ========== 内部辅助 ==========

    fn expect_phase(&self, expected: SessionPhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            debug!("阶段 {} 拒绝操作: {}", self.phase.name(), action);
            Err(SessionError::InvalidAction {
                phase: self.phase.name(),
                action,
            })
        }
    }

    fn mcq_quiz_mut(&mut self) -> Result<&mut McqQuiz, SessionError> {
        self.mcq_quiz.as_mut().ok_or(SessionError::InvalidAction {
            phase: self.phase.name(),
            action: "访问选择题状态机",
        })
    }

    fn subjective_quiz_mut(&mut self) -> Result<&mut SubjectiveQuiz, SessionError> {
        self.subjective_quiz
            .as_mut()
            .ok_or(SessionError::InvalidAction {
                phase: self.phase.name(),
                action: "访问主观题状态机",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mcq, SubjectiveQuestion};

    fn mcq(id: &str, correct: &str) -> Mcq {
        Mcq {
            id: id.to_string(),
            question: format!("题目 {}", id),
            options: vec!["A".to_string(), "B".to_string()],
            correct_answer: correct.to_string(),
            explanation: None,
        }
    }

    fn subjective(id: &str) -> SubjectiveQuestion {
        SubjectiveQuestion {
            id: id.to_string(),
            question: format!("题目 {}", id),
            key_points: Vec::new(),
            model_answer: "参考答案".to_string(),
        }
    }

    fn mixed_exam() -> ExamData {
        ExamData {
            title: "混合试卷".to_string(),
            mcqs: vec![mcq("m1", "A"), mcq("m2", "B")],
            subjective: vec![subjective("s1")],
        }
    }

    fn start_with(exam: ExamData) -> (ExamSession, AnalysisOutcome) {
        let mut session = ExamSession::new();
        session.begin_analysis().unwrap();
        let outcome = session.analysis_succeeded(exam).unwrap();
        (session, outcome)
    }

    #[test]
    fn test_full_session_walkthrough() {
        let (mut session, outcome) = start_with(mixed_exam());
        assert_eq!(outcome, AnalysisOutcome::McqStarted);
        assert_eq!(session.phase(), SessionPhase::QuizMcq);

        // 选择题部分：第一题答对，第二题答错
        session.mcq_select(0).unwrap();
        assert_eq!(session.mcq_advance().unwrap(), QuizOutcome::NextQuestion);
        session.mcq_select(0).unwrap();
        assert_eq!(session.mcq_advance().unwrap(), QuizOutcome::SectionComplete);

        assert_eq!(session.phase(), SessionPhase::McqIntermediate);
        assert_eq!(session.results().mcq_results.len(), 2);
        assert_eq!(session.results().correct_mcq_count(), 1);

        // 小结后进入主观题部分
        session.proceed_after_mcq().unwrap();
        assert_eq!(session.phase(), SessionPhase::QuizSubjective);

        session.start_recording().unwrap();
        session
            .push_segment(&TranscriptSegment::final_text("我的口头回答"))
            .unwrap();
        session.stop_recording().unwrap();
        let request = session.begin_evaluation().unwrap();
        assert_eq!(request.transcript, "我的口头回答");
        session
            .complete_evaluation(Evaluation {
                score: 90.0,
                feedback: "很好".to_string(),
            })
            .unwrap();
        assert_eq!(
            session.subjective_advance().unwrap(),
            QuizOutcome::SectionComplete
        );

        // 报告阶段
        assert_eq!(session.phase(), SessionPhase::Results);
        let report = session.report().unwrap();
        assert_eq!(report.mcq_score, 50.0);
        assert_eq!(report.average_subjective, 90.0);
        assert_eq!(report.overall, 70.0);

        // 重置后一切归零
        session.reset().unwrap();
        assert_eq!(session.phase(), SessionPhase::Upload);
        assert!(session.exam().is_none());
        assert!(session.results().mcq_results.is_empty());
        assert!(session.results().subjective_results.is_empty());
    }

    #[test]
    fn test_analysis_failure_returns_to_upload() {
        let mut session = ExamSession::new();
        session.begin_analysis().unwrap();
        session.analysis_failed().unwrap();

        assert_eq!(session.phase(), SessionPhase::Upload);
        assert!(session.exam().is_none());
        // 可以立即重新开始解析
        session.begin_analysis().unwrap();
    }

    #[test]
    fn test_empty_extraction_returns_to_upload() {
        let empty = ExamData {
            title: "空试卷".to_string(),
            mcqs: Vec::new(),
            subjective: Vec::new(),
        };
        let (session, outcome) = start_with(empty);

        assert_eq!(outcome, AnalysisOutcome::NothingExtracted);
        assert_eq!(session.phase(), SessionPhase::Upload);
        assert!(session.exam().is_none());
    }

    #[test]
    fn test_mcq_only_exam_skips_subjective() {
        let exam = ExamData {
            title: "只有选择题".to_string(),
            mcqs: vec![mcq("m1", "A")],
            subjective: Vec::new(),
        };
        let (mut session, outcome) = start_with(exam);
        assert_eq!(outcome, AnalysisOutcome::McqStarted);

        session.mcq_select(0).unwrap();
        assert_eq!(session.mcq_advance().unwrap(), QuizOutcome::SectionComplete);
        session.proceed_after_mcq().unwrap();

        // 没有主观题，小结后直接出报告
        assert_eq!(session.phase(), SessionPhase::Results);
        let report = session.report().unwrap();
        assert_eq!(report.sections_present, 1);
        assert_eq!(report.overall, 100.0);
    }

    #[test]
    fn test_subjective_only_exam_skips_mcq() {
        let exam = ExamData {
            title: "只有主观题".to_string(),
            mcqs: Vec::new(),
            subjective: vec![subjective("s1")],
        };
        let (session, outcome) = start_with(exam);

        assert_eq!(outcome, AnalysisOutcome::SubjectiveStarted);
        assert_eq!(session.phase(), SessionPhase::QuizSubjective);
    }

    #[test]
    fn test_grading_failure_keeps_results_intact() {
        let exam = ExamData {
            title: "只有主观题".to_string(),
            mcqs: Vec::new(),
            subjective: vec![subjective("s1")],
        };
        let (mut session, _) = start_with(exam);

        session.start_recording().unwrap();
        session
            .push_segment(&TranscriptSegment::final_text("回答"))
            .unwrap();
        session.stop_recording().unwrap();
        session.begin_evaluation().unwrap();
        session.fail_evaluation().unwrap();

        // 结果序列不变，仍停留在主观题作答阶段
        assert!(session.results().subjective_results.is_empty());
        assert_eq!(session.phase(), SessionPhase::QuizSubjective);

        // 重新提交成功后才落账
        session.begin_evaluation().unwrap();
        session
            .complete_evaluation(Evaluation {
                score: 70.0,
                feedback: "可以".to_string(),
            })
            .unwrap();
        session.subjective_advance().unwrap();
        assert_eq!(session.results().subjective_results.len(), 1);
    }

    #[test]
    fn test_actions_rejected_in_wrong_phase() {
        let mut session = ExamSession::new();

        // 等待上传阶段只允许开始解析
        assert!(matches!(
            session.mcq_select(0).err(),
            Some(SessionError::InvalidAction { .. })
        ));
        assert!(matches!(
            session.start_recording().err(),
            Some(SessionError::InvalidAction { .. })
        ));
        assert!(matches!(
            session.report().err(),
            Some(SessionError::InvalidAction { .. })
        ));
        assert!(matches!(
            session.reset().err(),
            Some(SessionError::InvalidAction { .. })
        ));

        // 解析中不允许重置
        session.begin_analysis().unwrap();
        assert!(matches!(
            session.reset().err(),
            Some(SessionError::InvalidAction { .. })
        ));
        // 也不允许重复开始解析
        assert!(matches!(
            session.begin_analysis().err(),
            Some(SessionError::InvalidAction { .. })
        ));
    }

    #[test]
    fn test_reset_allowed_mid_quiz() {
        let (mut session, _) = start_with(mixed_exam());

        session.mcq_select(0).unwrap();
        session.reset().unwrap();

        assert_eq!(session.phase(), SessionPhase::Upload);
        assert!(session.exam().is_none());
        assert!(session.mcq_quiz().is_none());
    }

    #[test]
    fn test_quiz_errors_pass_through() {
        let (mut session, _) = start_with(mixed_exam());

        // 未选择就确认，错误透传且题号不变
        let err = session.mcq_advance().unwrap_err();
        assert_eq!(err, SessionError::Quiz(crate::error::QuizError::NoSelection));
        assert_eq!(session.phase(), SessionPhase::QuizMcq);
        let quiz = session.mcq_quiz().unwrap();
        assert_eq!(quiz.progress(), crate::workflow::QuizProgress::new(1, 2));
    }
}
