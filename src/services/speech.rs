//! 语音采集服务 - 业务能力层
//!
//! 只负责"麦克风 → 转写片段"能力，不关心流程
//!
//! ## 技术栈
//! - 通过 `chromiumoxide` 在浏览器页面内驱动 webkitSpeechRecognition
//! - 识别结果先写进页面全局队列，由 tokio 轮询任务取回
//! - 片段通过 `tokio::sync::mpsc` 通道持续送出

use async_trait::async_trait;
use chromiumoxide::Page;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, CaptureError};
use crate::infrastructure::JsExecutor;
use crate::models::TranscriptSegment;

/// 页面队列的轮询间隔
const POLL_INTERVAL_MS: u64 = 250;

/// 语音采集能力
///
/// 实现只需要提供"开始"和"停止"两个动作，
/// 识别片段通过 `start` 返回的通道持续送出，
/// 通道关闭即代表采集已经停止（出错也走这条路）。
#[async_trait]
pub trait SpeechCapture: Send {
    /// 开始采集
    ///
    /// # 返回
    /// 返回接收识别片段的通道
    async fn start(&mut self) -> AppResult<mpsc::UnboundedReceiver<TranscriptSegment>>;

    /// 停止采集
    ///
    /// # 返回
    /// 返回停止瞬间还没来得及轮询走的残留片段
    async fn stop(&mut self) -> AppResult<Vec<TranscriptSegment>>;
}

/// 页面队列里的单条识别结果
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentEvent {
    text: String,
    is_final: bool,
}

impl From<SegmentEvent> for TranscriptSegment {
    fn from(event: SegmentEvent) -> Self {
        if event.is_final {
            TranscriptSegment::final_text(event.text)
        } else {
            TranscriptSegment::interim(event.text)
        }
    }
}

/// 一次轮询取回的全部内容
#[derive(Debug, Deserialize)]
struct PollPayload {
    segments: Vec<SegmentEvent>,
    error: Option<String>,
    active: bool,
}

/// 注入脚本的执行结果
#[derive(Debug, Deserialize)]
struct StartOutcome {
    ok: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// 构建启动识别的注入脚本
///
/// 识别回调只往 `window.__speechQueue` 里堆结果，取回的事情交给轮询
fn build_start_script(language: &str) -> String {
    // 语言代码经 serde_json 转义后嵌入，避免破坏脚本
    let lang_literal =
        serde_json::to_string(language).unwrap_or_else(|_| "\"en-US\"".to_string());
    format!(
        r#"(() => {{
    if (!('webkitSpeechRecognition' in window)) {{
        return {{ ok: false, reason: 'unsupported' }};
    }}
    window.__speechQueue = [];
    window.__speechError = null;
    window.__speechActive = true;
    const recognition = new webkitSpeechRecognition();
    recognition.continuous = true;
    recognition.interimResults = true;
    recognition.lang = {lang};
    recognition.onresult = (event) => {{
        for (let i = event.resultIndex; i < event.results.length; i++) {{
            const result = event.results[i];
            window.__speechQueue.push({{
                text: result[0].transcript,
                isFinal: result.isFinal
            }});
        }}
    }};
    recognition.onerror = (event) => {{
        window.__speechError = event.error || 'unknown';
        window.__speechActive = false;
    }};
    recognition.onend = () => {{
        window.__speechActive = false;
    }};
    try {{
        recognition.start();
    }} catch (e) {{
        return {{ ok: false, reason: String(e) }};
    }}
    window.__speechRecognition = recognition;
    return {{ ok: true }};
}})()"#,
        lang = lang_literal
    )
}

/// 取回并清空页面队列，同时带回识别器的存活状态
const POLL_SCRIPT: &str = r#"(() => {
    const queue = window.__speechQueue || [];
    window.__speechQueue = [];
    return {
        segments: queue,
        error: window.__speechError,
        active: window.__speechActive === true
    };
})()"#;

/// 停止识别器并取走最后残留的队列内容
const STOP_SCRIPT: &str = r#"(() => {
    try {
        if (window.__speechRecognition) {
            window.__speechRecognition.stop();
        }
    } catch (e) {}
    window.__speechRecognition = null;
    window.__speechActive = false;
    const queue = window.__speechQueue || [];
    window.__speechQueue = [];
    return queue;
})()"#;

/// 基于浏览器页面的语音采集
///
/// 职责：
/// - 在页面里启动 / 停止 webkitSpeechRecognition
/// - 轮询页面队列，把识别片段转成 `TranscriptSegment` 送出
/// - 只管采集，不出现题目和作答状态
/// - 不关心片段如何拼装
pub struct BrowserSpeechCapture {
    executor: JsExecutor,
    language: String,
    poll_task: Option<JoinHandle<()>>,
    active: bool,
}

impl BrowserSpeechCapture {
    /// 创建新的语音采集服务
    ///
    /// # 参数
    /// - `page`: 语音识别所在的页面
    /// - `config`: 应用配置（取识别语言）
    pub fn new(page: Page, config: &Config) -> Self {
        Self {
            executor: JsExecutor::new(page),
            language: config.speech_language.clone(),
            poll_task: None,
            active: false,
        }
    }
}

#[async_trait]
impl SpeechCapture for BrowserSpeechCapture {
    async fn start(&mut self) -> AppResult<mpsc::UnboundedReceiver<TranscriptSegment>> {
        if self.active {
            return Err(AppError::Capture(CaptureError::AlreadyActive));
        }

        debug!("注入语音识别脚本，语言: {}", self.language);

        let outcome: StartOutcome = self
            .executor
            .eval_as(build_start_script(&self.language))
            .await
            .map_err(|e| AppError::Capture(CaptureError::ScriptFailed { source: e.into() }))?;

        if !outcome.ok {
            let reason = outcome.reason.unwrap_or_else(|| "unknown".to_string());
            return Err(if reason == "unsupported" {
                AppError::Capture(CaptureError::RecognitionUnavailable)
            } else {
                AppError::Capture(CaptureError::RecognitionError { message: reason })
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();

        // page 内部是 Arc，克隆一份给轮询任务独立使用
        let executor = JsExecutor::new(self.executor.page().clone());
        let handle = tokio::spawn(async move {
            poll_recognition(executor, tx).await;
        });

        self.poll_task = Some(handle);
        self.active = true;
        info!("✓ 录音已开始，语言: {}", self.language);

        Ok(rx)
    }

    async fn stop(&mut self) -> AppResult<Vec<TranscriptSegment>> {
        if !self.active {
            return Err(AppError::Capture(CaptureError::NotActive));
        }

        // 先停轮询任务，残留片段由停止脚本一次性取回
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.active = false;

        let events: Vec<SegmentEvent> = self
            .executor
            .eval_as(STOP_SCRIPT)
            .await
            .map_err(|e| AppError::Capture(CaptureError::ScriptFailed { source: e.into() }))?;

        info!("✓ 录音已停止，残留片段 {} 条", events.len());

        Ok(events.into_iter().map(TranscriptSegment::from).collect())
    }
}

/// 轮询页面队列，把识别片段送进通道
///
/// 识别报错或自行结束时退出循环，通道随之关闭，
/// 调用方把通道关闭当作"录音已停止"处理。
async fn poll_recognition(executor: JsExecutor, tx: mpsc::UnboundedSender<TranscriptSegment>) {
    let mut interval = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));

    loop {
        interval.tick().await;

        let payload: PollPayload = match executor.eval_as(POLL_SCRIPT).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("轮询识别结果失败: {}", e);
                break;
            }
        };

        // 先送片段再看状态，避免丢掉报错前的最后一批结果
        for event in payload.segments {
            if tx.send(event.into()).is_err() {
                // 接收端已丢弃，采集随之结束
                return;
            }
        }

        if let Some(error) = payload.error {
            warn!("⚠️ 语音识别报错: {}", error);
            break;
        }

        if !payload.active {
            debug!("语音识别已自行结束");
            break;
        }
    }
}
