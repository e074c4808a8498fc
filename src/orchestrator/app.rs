//! 应用入口 - 编排层
//!
//! 把会话状态机、三个业务服务和控制台交互串成完整的练习流程

use anyhow::Result;
use chromiumoxide::Browser;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::error::{AppError, AppResult, FileError, QuizError, SessionError};
use crate::models::{ExamData, SessionResults, TranscriptSegment};
use crate::orchestrator::session::{AnalysisOutcome, ExamSession, QuizOutcome, SessionPhase};
use crate::report;
use crate::services::{
    AnswerGrader, BrowserSpeechCapture, ExamAnalyzer, SessionLogWriter, SpeechCapture,
};
use crate::utils::logging::{log_startup, truncate_text};
use crate::workflow::AnswerState;

/// 应用主结构
///
/// 职责：
/// - 持有浏览器连接和三个业务服务
/// - 驱动 `ExamSession` 状态机，把外部结果喂回去
/// - 所有控制台交互都在这里，状态机和服务不碰终端
pub struct App {
    config: Config,
    session: ExamSession,
    analyzer: ExamAnalyzer,
    grader: AnswerGrader,
    capture: Box<dyn SpeechCapture>,
    session_log: SessionLogWriter,
    _browser: Browser,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化会话日志文件
        let session_log = SessionLogWriter::new(&config);
        session_log.init()?;

        log_startup(config.browser_debug_port, &config.speech_language);

        // 连接浏览器（语音识别运行在真实页面里）
        let (browser, page) = browser::connect_to_browser_and_page(config.browser_debug_port).await?;

        let capture: Box<dyn SpeechCapture> = Box::new(BrowserSpeechCapture::new(page, &config));

        Ok(Self {
            session: ExamSession::new(),
            analyzer: ExamAnalyzer::new(&config),
            grader: AnswerGrader::new(&config),
            capture,
            session_log,
            config,
            _browser: browser,
        })
    }

    /// 运行应用主逻辑
    ///
    /// 按会话阶段分发到各个处理函数，处理函数返回 false 时退出
    pub async fn run(&mut self) -> Result<()> {
        let mut input = BufReader::new(tokio::io::stdin()).lines();

        println!("\n{}", "=".repeat(60));
        println!("🎓 语音刷题 - 上传试卷，口述作答");
        println!("{}", "=".repeat(60));

        loop {
            let keep_going = match self.session.phase() {
                SessionPhase::Upload | SessionPhase::Analyzing => {
                    self.handle_upload(&mut input).await?
                }
                SessionPhase::QuizMcq => self.handle_mcq(&mut input).await?,
                SessionPhase::McqIntermediate => self.handle_mcq_summary(&mut input).await?,
                SessionPhase::QuizSubjective => self.handle_subjective(&mut input).await?,
                SessionPhase::Results => self.handle_results(&mut input).await?,
            };

            if !keep_going {
                break;
            }
        }

        println!("\n👋 练习结束，再见");
        Ok(())
    }

    /// 上传阶段：读入文档并交给解析服务
    async fn handle_upload(&mut self, input: &mut Lines<BufReader<Stdin>>) -> Result<bool> {
        println!("\n输入试卷文件路径或 URL 开始练习（q 退出）：");
        let Some(line) = prompt_line(input).await? else {
            return Ok(false);
        };

        if line.is_empty() {
            return Ok(true);
        }
        if line == "q" || line == "quit" {
            return Ok(false);
        }

        let (file_name, bytes) = match load_exam_document(&line).await {
            Ok(pair) => pair,
            Err(e) => {
                error!("❌ 读取文档失败: {}", e);
                println!("读取文档失败: {}", e);
                return Ok(true);
            }
        };

        self.session.begin_analysis()?;
        println!("🔍 正在解析试卷，请稍候...");

        match self.analyzer.analyze(&file_name, &bytes).await {
            Ok(exam) => {
                self.log_exam_overview(&exam).await;

                match self.session.analysis_succeeded(exam)? {
                    AnalysisOutcome::McqStarted => {
                        println!("\n{}", "=".repeat(60));
                        println!("📋 选择题部分");
                        println!("{}", "=".repeat(60));
                    }
                    AnalysisOutcome::SubjectiveStarted => {
                        println!("\n{}", "=".repeat(60));
                        println!("🎤 主观题部分");
                        println!("{}", "=".repeat(60));
                    }
                    AnalysisOutcome::NothingExtracted => {
                        println!("⚠️ 没能从文档中提取到题目，请换一份更清晰的试卷");
                    }
                }
            }
            Err(e) => {
                self.session.analysis_failed()?;
                error!("❌ 试卷解析失败: {}", e);
                println!("解析失败，可重新上传。原因: {}", e);
            }
        }

        Ok(true)
    }

    /// 选择题阶段：显示题目，接收选择或前进
    async fn handle_mcq(&mut self, input: &mut Lines<BufReader<Stdin>>) -> Result<bool> {
        let (question, progress, selection) = {
            let quiz = match self.session.mcq_quiz() {
                Some(quiz) => quiz,
                None => anyhow::bail!("选择题流程缺失"),
            };
            let question = match quiz.current_question() {
                Some(question) => question.clone(),
                None => anyhow::bail!("选择题流程状态异常"),
            };
            (
                question,
                quiz.progress(),
                quiz.current_selection().map(|s| s.to_string()),
            )
        };

        println!("\n───────── {} ─────────", progress);
        println!("{}", question.question);
        for (i, option) in question.options.iter().enumerate() {
            let marker = match &selection {
                Some(selected) if selected == option => "●",
                _ => "○",
            };
            println!("  {} {}. {}", marker, i + 1, option);
        }
        if selection.is_some() {
            println!("(已选定，回车进入下一题)");
        } else {
            println!("(输入选项编号作答)");
        }

        let Some(line) = prompt_line(input).await? else {
            return Ok(false);
        };

        if line.is_empty() {
            // 回车确认，前进到下一题
            match self.session.mcq_advance() {
                Ok(QuizOutcome::NextQuestion) => {}
                Ok(QuizOutcome::SectionComplete) => {
                    println!("\n✅ 选择题部分完成！");
                }
                Err(SessionError::Quiz(QuizError::NoSelection)) => {
                    println!("⚠️ 请先选择一个答案");
                }
                Err(e) => return Err(e.into()),
            }
            return Ok(true);
        }

        let Ok(number) = line.parse::<usize>() else {
            println!("无法识别的输入: {}", line);
            return Ok(true);
        };
        if number == 0 {
            println!("选项编号从 1 开始");
            return Ok(true);
        }

        match self.session.mcq_select(number - 1) {
            Ok(()) => {
                // 选定即锁定，立刻给出对错反馈
                if let Some(correct) = self
                    .session
                    .mcq_quiz()
                    .and_then(|quiz| quiz.selection_is_correct())
                {
                    if correct {
                        println!("✓ 回答正确！");
                    } else {
                        println!("✗ 回答错误，正确答案: {}", question.correct_answer);
                    }
                    if let Some(explanation) = &question.explanation {
                        println!("💡 {}", explanation);
                    }
                }
                println!("(回车进入下一题)");
            }
            Err(SessionError::Quiz(QuizError::OptionOutOfRange { max_index, .. })) => {
                println!("选项编号超出范围，本题最大编号 {}", max_index + 1);
            }
            Err(SessionError::Quiz(QuizError::InvalidState { .. })) => {
                println!("⚠️ 本题已选定答案，不能更改，回车进入下一题");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(true)
    }

    /// 选择题小结阶段
    async fn handle_mcq_summary(&mut self, input: &mut Lines<BufReader<Stdin>>) -> Result<bool> {
        let (correct, total) = {
            let results = self.session.results();
            (results.correct_mcq_count(), results.mcq_results.len())
        };
        let percent = report::mcq_score_percent(correct, total);

        println!("\n───────── 选择题小结 ─────────");
        println!("答对 {}/{} 题，正确率 {:.0}%", correct, total, percent);
        println!("(回车继续)");

        if prompt_line(input).await?.is_none() {
            return Ok(false);
        }

        self.session.proceed_after_mcq()?;

        if self.session.phase() == SessionPhase::QuizSubjective {
            println!("\n{}", "=".repeat(60));
            println!("🎤 主观题部分");
            println!("{}", "=".repeat(60));
        }

        Ok(true)
    }

    /// 主观题阶段：按作答状态分发
    async fn handle_subjective(&mut self, input: &mut Lines<BufReader<Stdin>>) -> Result<bool> {
        let (question, progress, state) = {
            let quiz = match self.session.subjective_quiz() {
                Some(quiz) => quiz,
                None => anyhow::bail!("主观题流程缺失"),
            };
            let question = match quiz.current_question() {
                Some(question) => question.clone(),
                None => anyhow::bail!("主观题流程状态异常"),
            };
            (question, quiz.progress(), quiz.state().clone())
        };

        match state {
            AnswerState::Idle => {
                println!("\n───────── {} ─────────", progress);
                println!("{}", question.question);
                println!("(回车开始录音作答)");

                if prompt_line(input).await?.is_none() {
                    return Ok(false);
                }
                self.start_answer_recording(input).await?;
            }
            AnswerState::Ready => {
                let transcript = self
                    .session
                    .subjective_quiz()
                    .map(|quiz| quiz.display_text())
                    .unwrap_or_default();
                println!("\n📝 已转写内容：");
                println!("  {}", transcript);
                println!("(s 提交评分 / r 重新录音)");

                let Some(line) = prompt_line(input).await? else {
                    return Ok(false);
                };

                match line.as_str() {
                    "s" | "" => self.submit_for_grading().await?,
                    "r" => self.start_answer_recording(input).await?,
                    other => println!("无法识别的输入: {}", other),
                }
            }
            AnswerState::Evaluated(evaluation) => {
                println!("\n📊 得分: {:.0}/100", evaluation.score);
                println!("💬 {}", evaluation.feedback);
                println!("📖 参考答案: {}", question.model_answer);
                println!("(回车进入下一题)");

                if prompt_line(input).await?.is_none() {
                    return Ok(false);
                }

                match self.session.subjective_advance()? {
                    QuizOutcome::NextQuestion => {}
                    QuizOutcome::SectionComplete => {
                        println!("\n✅ 主观题部分完成！");
                    }
                }
            }
            other => anyhow::bail!("作答状态异常: {}", other.name()),
        }

        Ok(true)
    }

    /// 成绩报告阶段：展示报告，询问是否再来一轮
    async fn handle_results(&mut self, input: &mut Lines<BufReader<Stdin>>) -> Result<bool> {
        let report = self.session.report()?;
        let detail = match self.session.exam() {
            Some(exam) => render_session_detail(exam, self.session.results()),
            None => String::new(),
        };

        println!("\n{}", "=".repeat(60));
        println!("📊 成绩报告");
        println!("{}", "=".repeat(60));
        println!("{}", report);
        if !detail.is_empty() {
            println!("{}", detail);
        }

        // 报告落盘，方便回顾
        let log_entry = format!("{}\n{}", report, detail);
        if let Err(e) = self.session_log.append(&log_entry).await {
            warn!("写入会话日志失败: {}", e);
        } else {
            info!("日志已保存至: {}", self.config.output_log_file);
        }

        println!("\n再练一份试卷？(y/n)");
        let Some(line) = prompt_line(input).await? else {
            return Ok(false);
        };

        if line == "y" || line == "yes" {
            self.session.reset()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 开始录音并进入录音循环
    async fn start_answer_recording(
        &mut self,
        input: &mut Lines<BufReader<Stdin>>,
    ) -> Result<()> {
        let rx = match self.capture.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("❌ 无法开始录音: {}", e);
                println!("录音不可用: {}", e);
                return Ok(());
            }
        };

        if let Err(e) = self.session.start_recording() {
            // 状态机拒绝时把采集端也停掉，避免识别器悬空
            let _ = self.capture.stop().await;
            return Err(e.into());
        }

        self.record_loop(input, rx).await
    }

    /// 录音循环：同时等待识别片段和用户的停止指令
    ///
    /// 识别通道关闭视为录音已停止，不中断会话
    async fn record_loop(
        &mut self,
        input: &mut Lines<BufReader<Stdin>>,
        mut rx: mpsc::UnboundedReceiver<TranscriptSegment>,
    ) -> Result<()> {
        println!("🎤 录音中... 说出你的答案，回车结束录音");

        loop {
            tokio::select! {
                line = input.next_line() => {
                    let _ = line?;
                    break;
                }
                segment = rx.recv() => match segment {
                    Some(segment) => {
                        if segment.is_final {
                            println!("  [识别] {}", segment.text);
                        }
                        self.session.push_segment(&segment)?;
                    }
                    None => {
                        println!("⚠️ 录音已停止");
                        break;
                    }
                }
            }
        }

        // 停止采集，残留片段也要喂进流程
        match self.capture.stop().await {
            Ok(trailing) => {
                for segment in trailing {
                    if segment.is_final {
                        println!("  [识别] {}", segment.text);
                    }
                    self.session.push_segment(&segment)?;
                }
            }
            Err(e) => warn!("停止录音时出错: {}", e),
        }

        self.session.stop_recording()?;

        if let Some(quiz) = self.session.subjective_quiz() {
            if quiz.state() == &AnswerState::Idle {
                println!("⚠️ 没有识别到内容，请重新录音");
            }
        }

        Ok(())
    }

    /// 提交当前转写进入评分
    async fn submit_for_grading(&mut self) -> Result<()> {
        let request = self.session.begin_evaluation()?;
        println!("📤 正在评分，请稍候...");

        match self
            .grader
            .evaluate(
                &request.question,
                &request.key_points,
                &request.model_answer,
                &request.transcript,
            )
            .await
        {
            Ok(evaluation) => {
                self.session.complete_evaluation(evaluation)?;
            }
            Err(e) => {
                self.session.fail_evaluation()?;
                error!("❌ 评分失败: {}", e);
                println!("评分失败，转写已保留，可再次提交。原因: {}", e);
            }
        }

        Ok(())
    }

    /// 把解析出的试卷概要写进会话日志
    async fn log_exam_overview(&self, exam: &ExamData) {
        debug!(
            "解析结果: {} / 选择题 {} / 主观题 {}",
            exam.title,
            exam.mcqs.len(),
            exam.subjective.len()
        );
        let overview = format!(
            "试卷: {}\n选择题: {} 道 | 主观题: {} 道\n",
            exam.title,
            exam.mcqs.len(),
            exam.subjective.len()
        );
        if let Err(e) = self.session_log.append(&overview).await {
            warn!("写入会话日志失败: {}", e);
        }
    }
}

/// 打印提示符并读取一行输入，EOF 返回 None
async fn prompt_line(input: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(input
        .next_line()
        .await?
        .map(|line| line.trim().to_string()))
}

/// 读取试卷文档，支持本地路径和 http(s) URL
///
/// # 返回
/// 返回 (文件名, 文档字节)
async fn load_exam_document(source: &str) -> AppResult<(String, Vec<u8>)> {
    if source.starts_with("http://") || source.starts_with("https://") {
        debug!("下载试卷文档: {}", source);

        let response = reqwest::get(source)
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                AppError::File(FileError::DownloadFailed {
                    url: source.to_string(),
                    source: Box::new(e),
                })
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| {
                AppError::File(FileError::DownloadFailed {
                    url: source.to_string(),
                    source: Box::new(e),
                })
            })?
            .to_vec();

        // URL 末段去掉查询参数后作为文件名
        let file_name = source
            .rsplit('/')
            .next()
            .and_then(|name| name.split('?').next())
            .unwrap_or(source)
            .to_string();

        Ok((file_name, bytes))
    } else {
        let path = std::path::Path::new(source);
        if !path.exists() {
            return Err(AppError::File(FileError::NotFound {
                path: source.to_string(),
            }));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(source, e))?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| source.to_string());

        Ok((file_name, bytes))
    }
}

// ========== 报告辅助函数 ==========

/// 渲染逐题明细，附在总分报告后面
fn render_session_detail(exam: &ExamData, results: &SessionResults) -> String {
    let mut out = String::new();

    if !results.mcq_results.is_empty() {
        out.push_str("\n选择题明细：\n");
        for record in &results.mcq_results {
            let mark = if record.is_correct { "✓" } else { "✗" };
            match exam.find_mcq(&record.question_id) {
                Some(question) => {
                    out.push_str(&format!("  {} {}\n", mark, question.question));
                    if !record.is_correct {
                        out.push_str(&format!(
                            "     你的答案: {} | 正确答案: {}\n",
                            record.selected_answer, question.correct_answer
                        ));
                    }
                }
                None => out.push_str(&format!("  {} {}\n", mark, record.question_id)),
            }
        }
    }

    if !results.subjective_results.is_empty() {
        out.push_str("\n主观题明细：\n");
        for record in &results.subjective_results {
            let header = match exam.find_subjective(&record.question_id) {
                Some(question) => question.question.as_str(),
                None => record.question_id.as_str(),
            };
            out.push_str(&format!("  [{:.1} 分] {}\n", record.score, header));
            out.push_str(&format!(
                "     作答: {}\n",
                truncate_text(&record.transcript, 80)
            ));
            out.push_str(&format!("     反馈: {}\n", record.feedback));
        }
    }

    out
}
