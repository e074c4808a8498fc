//! 会话流程集成测试
//!
//! 不依赖浏览器和模型服务，直接驱动会话状态机走完整流程

use exam_voice_practice::models::{Evaluation, ExamData, TranscriptSegment};
use exam_voice_practice::orchestrator::{AnalysisOutcome, ExamSession, QuizOutcome, SessionPhase};
use exam_voice_practice::services::SessionLogWriter;

/// 两道选择题加一道主观题的样例试卷
fn sample_exam() -> ExamData {
    serde_json::from_value(serde_json::json!({
        "title": "生物期末模拟卷",
        "mcqs": [
            {
                "id": "m1",
                "question": "细胞的能量工厂是？",
                "options": ["线粒体", "核糖体", "高尔基体"],
                "correctAnswer": "线粒体",
                "explanation": "线粒体通过有氧呼吸产生 ATP"
            },
            {
                "id": "m2",
                "question": "植物细胞特有的结构是？",
                "options": ["细胞膜", "细胞壁"],
                "correctAnswer": "细胞壁"
            }
        ],
        "subjective": [
            {
                "id": "s1",
                "question": "简述光合作用的两个阶段",
                "keyPoints": ["光反应", "暗反应"],
                "modelAnswer": "光反应在类囊体膜上进行，暗反应在基质中固定二氧化碳"
            }
        ]
    }))
    .unwrap()
}

#[test]
fn test_full_practice_session() {
    let mut session = ExamSession::new();
    assert_eq!(session.phase(), SessionPhase::Upload);

    // 上传并解析
    session.begin_analysis().unwrap();
    assert_eq!(session.phase(), SessionPhase::Analyzing);
    let outcome = session.analysis_succeeded(sample_exam()).unwrap();
    assert_eq!(outcome, AnalysisOutcome::McqStarted);
    assert_eq!(session.phase(), SessionPhase::QuizMcq);

    // 第一题答对
    session.mcq_select(0).unwrap();
    assert_eq!(session.mcq_advance().unwrap(), QuizOutcome::NextQuestion);

    // 第二题答错
    session.mcq_select(0).unwrap();
    assert_eq!(session.mcq_advance().unwrap(), QuizOutcome::SectionComplete);
    assert_eq!(session.phase(), SessionPhase::McqIntermediate);
    assert_eq!(session.results().correct_mcq_count(), 1);

    // 小结后进入主观题
    session.proceed_after_mcq().unwrap();
    assert_eq!(session.phase(), SessionPhase::QuizSubjective);

    // 录音 → 转写 → 评分
    session.start_recording().unwrap();
    session
        .push_segment(&TranscriptSegment::interim("光合作用"))
        .unwrap();
    session
        .push_segment(&TranscriptSegment::final_text(
            "光合作用分为光反应和暗反应两个阶段",
        ))
        .unwrap();
    session.stop_recording().unwrap();

    let request = session.begin_evaluation().unwrap();
    assert_eq!(request.transcript, "光合作用分为光反应和暗反应两个阶段");
    assert!(request.key_points.contains(&"光反应".to_string()));

    session
        .complete_evaluation(Evaluation {
            score: 90.0,
            feedback: "两个阶段都提到了".to_string(),
        })
        .unwrap();
    assert_eq!(
        session.subjective_advance().unwrap(),
        QuizOutcome::SectionComplete
    );
    assert_eq!(session.phase(), SessionPhase::Results);

    // 最终报告
    let report = session.report().unwrap();
    assert_eq!(report.mcq_correct, 1);
    assert_eq!(report.mcq_total, 2);
    assert_eq!(report.mcq_score, 50.0);
    assert_eq!(report.average_subjective, 90.0);
    assert_eq!(report.overall, 70.0);
}

#[test]
fn test_subjective_only_exam_skips_mcq_phase() {
    let exam: ExamData = serde_json::from_value(serde_json::json!({
        "title": "口语表达练习",
        "mcqs": [],
        "subjective": [
            {
                "id": "s1",
                "question": "介绍一下你的家乡",
                "keyPoints": [],
                "modelAnswer": "言之有物即可"
            }
        ]
    }))
    .unwrap();

    let mut session = ExamSession::new();
    session.begin_analysis().unwrap();
    let outcome = session.analysis_succeeded(exam).unwrap();

    assert_eq!(outcome, AnalysisOutcome::SubjectiveStarted);
    assert_eq!(session.phase(), SessionPhase::QuizSubjective);
}

#[test]
fn test_reset_clears_session() {
    let mut session = ExamSession::new();
    session.begin_analysis().unwrap();
    session.analysis_succeeded(sample_exam()).unwrap();
    session.mcq_select(0).unwrap();
    session.mcq_advance().unwrap();

    session.reset().unwrap();

    assert_eq!(session.phase(), SessionPhase::Upload);
    assert!(session.exam().is_none());
    assert!(session.results().mcq_results.is_empty());

    // 复位后可以开始新一轮
    session.begin_analysis().unwrap();
    assert_eq!(session.phase(), SessionPhase::Analyzing);
}

#[test]
fn test_session_log_round_trip() {
    let path = std::env::temp_dir().join(format!("practice_flow_log_{}.txt", std::process::id()));
    let writer = SessionLogWriter::with_path(path.to_string_lossy().to_string());

    writer.init().unwrap();
    tokio_test::block_on(writer.append("综合表现: 70/100")).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("练习会话日志"));
    assert!(content.contains("综合表现: 70/100"));

    let _ = std::fs::remove_file(&path);
}
