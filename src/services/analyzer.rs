//! 试卷解析服务 - 业务能力层
//!
//! 只负责"文档 → 试卷结构"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 调用视觉模型
//! - 文档以 base64 data URL 形式随用户消息上传
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use phf::phf_map;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AnalysisError, AppError, AppResult, FileError};
use crate::models::ExamData;
use crate::utils::llm_json::clean_json_response;
use crate::utils::logging::truncate_text;

/// 支持的文档扩展名与 MIME 类型对照表
static MIME_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "pdf" => "application/pdf",
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "webp" => "image/webp",
    "gif" => "image/gif",
};

/// 根据文件名推断 MIME 类型
///
/// 扩展名大小写不敏感，不在对照表里的格式返回 `None`
pub fn mime_type_of(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit('.').next()?.to_lowercase();
    MIME_TYPES.get(ext.as_str()).copied()
}

/// 把文档字节编码成 data URL
fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// 试卷解析服务
///
/// 职责：
/// - 调用视觉模型从试卷文档中提取题目结构
/// - 校验并反序列化模型返回的 JSON
/// - 只处理单份文档
/// - 不出现会话阶段
/// - 不关心流程顺序
pub struct ExamAnalyzer {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl ExamAnalyzer {
    /// 创建新的试卷解析服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.analyzer_model.clone(),
        }
    }

    /// 解析试卷文档，提取选择题和主观题
    ///
    /// 失败后不会自动重试，由调用方决定是否重新上传。
    ///
    /// # 参数
    /// - `file_name`: 文档文件名（用于推断格式）
    /// - `bytes`: 文档原始字节
    ///
    /// # 返回
    /// 返回提取出的试卷结构；两类题目都为空时视为提取失败
    pub async fn analyze(&self, file_name: &str, bytes: &[u8]) -> AppResult<ExamData> {
        debug!("开始解析文档: {} ({} 字节)", file_name, bytes.len());

        // 不支持的格式在调用模型之前就拒绝
        let mime_type = mime_type_of(file_name).ok_or_else(|| {
            AppError::File(FileError::UnsupportedFormat {
                path: file_name.to_string(),
            })
        })?;

        let data_url = to_data_url(mime_type, bytes);
        let (user_message, system_message) = self.build_analysis_messages();

        let response = self
            .request_extraction(&user_message, &system_message, &data_url)
            .await?;

        let cleaned = clean_json_response(&response);
        let exam: ExamData = serde_json::from_str(&cleaned).map_err(|e| {
            warn!("试卷 JSON 解析失败: {}", e);
            AppError::Analysis(AnalysisError::ResponseParseFailed {
                response: truncate_text(&cleaned, 200),
                source: Box::new(e),
            })
        })?;

        if exam.is_empty() {
            warn!("模型没有从文档中提取到任何题目");
            return Err(AppError::Analysis(AnalysisError::NothingExtracted));
        }

        debug!(
            "✓ 解析完成: {} (选择题 {} 道, 主观题 {} 道)",
            exam.title,
            exam.mcqs.len(),
            exam.subjective.len()
        );

        Ok(exam)
    }

    /// 构建用于试卷提取的消息
    ///
    /// 返回 (user_message, system_message)
    fn build_analysis_messages(&self) -> (String, String) {
        let system_message = "你是一个专业的试卷解析助手，擅长从试卷图片或 PDF 中识别题目结构。\
                             你需要完整提取每道题的题干、选项和参考答案，不遗漏任何题目。"
            .to_string();

        let user_message = r#"请分析这份试卷文档，提取其中的所有选择题和主观题。

【提取要求】
- 选择题：提取题干、全部选项和正确答案，并为每道题写一句简短解析
- 选项内容不要带 "A." "B." 这类字母前缀，correctAnswer 必须与某个选项的原文完全一致
- 主观题（简答、论述、翻译等）：提取题干、评分要点列表和参考答案
- 题目编号：选择题用 m1、m2 依次编号，主观题用 s1、s2 依次编号
- 试卷没有明显标题时，根据内容概括一个简短标题
- 某一类题目不存在时，对应数组返回 []

返回严格符合以下结构的 JSON：
{
  "title": "试卷标题",
  "mcqs": [
    {
      "id": "m1",
      "question": "题干",
      "options": ["选项一", "选项二", "选项三", "选项四"],
      "correctAnswer": "选项一",
      "explanation": "解析"
    }
  ],
  "subjective": [
    {
      "id": "s1",
      "question": "题干",
      "keyPoints": ["要点一", "要点二"],
      "modelAnswer": "参考答案"
    }
  ]
}

只返回 JSON，不要返回任何其他内容。"#
            .to_string();

        (user_message, system_message)
    }

    /// 调用视觉模型提取试卷内容
    ///
    /// # 参数
    /// - `user_message`: 提取指令
    /// - `system_message`: 系统消息
    /// - `data_url`: 文档的 base64 data URL
    ///
    /// # 返回
    /// 返回模型的响应内容（字符串）
    async fn request_extraction(
        &self,
        user_message: &str,
        system_message: &str,
        data_url: &str,
    ) -> AppResult<String> {
        debug!("调用解析模型: {}", self.model_name);

        // 构建消息列表
        let mut messages = Vec::new();

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(|e| AppError::analysis_request_failed(&self.model_name, e))?;
        messages.push(ChatCompletionRequestMessage::System(system_msg));

        // 使用 Vision API：文档以 data URL 形式和文本一起放进用户消息
        let content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: user_message.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: data_url.to_string(),
                        detail: Some(ImageDetail::Auto), // Auto, High, Low
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(
                content_parts,
            ))
            .build()
            .map_err(|e| AppError::analysis_request_failed(&self.model_name, e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求（整份试卷的 JSON 较长，max_tokens 给足）
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(4096u32)
            .build()
            .map_err(|e| AppError::analysis_request_failed(&self.model_name, e))?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("解析模型调用失败: {}", e);
            AppError::analysis_request_failed(&self.model_name, e)
        })?;

        debug!("解析模型调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Analysis(AnalysisError::EmptyResponse {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }
}
