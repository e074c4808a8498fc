//! 答案评分服务 - 业务能力层
//!
//! 只负责"转写 → 评分"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, GradingError};
use crate::models::Evaluation;
use crate::utils::llm_json::clean_json_response;
use crate::utils::logging::truncate_text;

/// 答案评分服务
///
/// 职责：
/// - 调用评分模型评判口头作答的转写文本
/// - 解析并收敛模型给出的分数
/// - 只处理单道题目
/// - 不出现会话阶段
/// - 不关心流程顺序
pub struct AnswerGrader {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl AnswerGrader {
    /// 创建新的答案评分服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.grader_model.clone(),
        }
    }

    /// 评判一道主观题的口头作答
    ///
    /// 失败后不会自动重试，转写保留在流程中可重新提交。
    ///
    /// # 参数
    /// - `question`: 题干
    /// - `key_points`: 评分要点（可以为空）
    /// - `model_answer`: 参考答案
    /// - `transcript`: 用户作答的转写全文
    ///
    /// # 返回
    /// 返回 0-100 的评分和文字反馈
    pub async fn evaluate(
        &self,
        question: &str,
        key_points: &[String],
        model_answer: &str,
        transcript: &str,
    ) -> AppResult<Evaluation> {
        debug!("开始评分，转写长度: {} 字符", transcript.chars().count());

        let (user_message, system_message) =
            self.build_grading_messages(question, key_points, model_answer, transcript);

        let response = self.request_grading(&user_message, &system_message).await?;
        let evaluation = self.parse_grading_response(&response)?;

        debug!("✓ 评分完成: {:.0} 分", evaluation.score);

        Ok(evaluation)
    }

    /// 构建用于评分的消息
    ///
    /// 返回 (user_message, system_message)
    fn build_grading_messages(
        &self,
        question: &str,
        key_points: &[String],
        model_answer: &str,
        transcript: &str,
    ) -> (String, String) {
        let system_message = "你是一个经验丰富的阅卷老师，擅长评判口头作答的质量。\
                             学生的答案来自语音转写，可能存在同音字和标点缺失，\
                             评分时关注内容本身而不是转写瑕疵。"
            .to_string();

        // 构建评分要点列表
        let key_points_info = if key_points.is_empty() {
            "  无".to_string()
        } else {
            key_points
                .iter()
                .enumerate()
                .map(|(i, point)| format!("  {}. {}", i + 1, point))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let user_message = format!(
            r#"请评判学生对下面这道主观题的口头作答。

题目：
  {}

评分要点：
{}

参考答案：
  {}

学生作答（语音转写）：
  {}

【评分标准】
1. 对照评分要点逐条检查学生是否覆盖
2. 内容正确、要点完整给高分，答非所问或明显错误给低分
3. 不因转写造成的错别字、缺少标点扣分
4. 反馈要具体指出答对了什么、遗漏了什么，并给出改进建议

返回严格符合以下结构的 JSON：
{{
  "score": 85,
  "feedback": "反馈内容"
}}

score 是 0 到 100 之间的数字。只返回 JSON，不要返回任何其他内容。"#,
            question, key_points_info, model_answer, transcript
        );

        (user_message, system_message)
    }

    /// 调用评分模型
    ///
    /// # 返回
    /// 返回模型的响应内容（字符串）
    async fn request_grading(
        &self,
        user_message: &str,
        system_message: &str,
    ) -> AppResult<String> {
        debug!("调用评分模型: {}", self.model_name);

        // 构建消息列表
        let mut messages = Vec::new();

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(|e| AppError::grading_request_failed(&self.model_name, e))?;
        messages.push(ChatCompletionRequestMessage::System(system_msg));

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| AppError::grading_request_failed(&self.model_name, e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(1024u32)
            .build()
            .map_err(|e| AppError::grading_request_failed(&self.model_name, e))?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("评分模型调用失败: {}", e);
            AppError::grading_request_failed(&self.model_name, e)
        })?;

        debug!("评分模型调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Grading(GradingError::EmptyResponse {
                    model: self.model_name.clone(),
                })
            })?;

        Ok(content.trim().to_string())
    }

    /// 解析评分模型的响应
    ///
    /// 分数超出 0-100 时收敛到边界值
    fn parse_grading_response(&self, response: &str) -> AppResult<Evaluation> {
        let cleaned = clean_json_response(response);

        let mut evaluation: Evaluation = serde_json::from_str(&cleaned).map_err(|e| {
            warn!("评分 JSON 解析失败: {}", e);
            AppError::Grading(GradingError::ResponseParseFailed {
                response: truncate_text(&cleaned, 200),
                source: Box::new(e),
            })
        })?;

        if !(0.0..=100.0).contains(&evaluation.score) {
            warn!("评分 {} 超出范围 [0, 100]，已收敛到边界", evaluation.score);
            evaluation.score = evaluation.score.clamp(0.0, 100.0);
        }

        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 创建测试用的 AnswerGrader
    fn create_test_service() -> AnswerGrader {
        let config = OpenAIConfig::new()
            .with_api_key("26e96c4d312e48feacbd78b7c42bd71e")
            .with_api_base("http://menshen.xdf.cn/v1");

        let client = Client::with_config(config);

        AnswerGrader {
            client,
            model_name: "gemini-3.0-flash-preview".to_string(),
        }
    }

    #[test]
    fn test_parse_grading_response_plain() {
        let service = create_test_service();

        let evaluation = service
            .parse_grading_response(r#"{"score": 85, "feedback": "要点覆盖完整"}"#)
            .unwrap();

        assert_eq!(evaluation.score, 85.0);
        assert_eq!(evaluation.feedback, "要点覆盖完整");
    }

    #[test]
    fn test_parse_grading_response_fenced() {
        let service = create_test_service();

        let raw = "```json\n{\"score\": 60.5, \"feedback\": \"遗漏了第二个要点\"}\n```";
        let evaluation = service.parse_grading_response(raw).unwrap();

        assert_eq!(evaluation.score, 60.5);
    }

    #[test]
    fn test_parse_grading_response_clamps_out_of_range() {
        let service = create_test_service();

        let high = service
            .parse_grading_response(r#"{"score": 150, "feedback": "满分"}"#)
            .unwrap();
        assert_eq!(high.score, 100.0);

        let low = service
            .parse_grading_response(r#"{"score": -10, "feedback": "未作答"}"#)
            .unwrap();
        assert_eq!(low.score, 0.0);
    }

    #[test]
    fn test_parse_grading_response_rejects_invalid() {
        let service = create_test_service();

        // 缺少 feedback 字段
        assert!(service
            .parse_grading_response(r#"{"score": 90}"#)
            .is_err());
        // 完全不是 JSON
        assert!(service.parse_grading_response("答得不错").is_err());
    }

    #[test]
    fn test_grading_messages_carry_answer_context() {
        let service = create_test_service();

        let key_points = vec!["位于华北平原".to_string(), "是政治中心".to_string()];
        let (user_message, _) = service.build_grading_messages(
            "简述北京的地理位置",
            &key_points,
            "北京位于华北平原北部，是中国的政治文化中心",
            "北京在华北平原",
        );

        assert!(user_message.contains("简述北京的地理位置"));
        assert!(user_message.contains("1. 位于华北平原"));
        assert!(user_message.contains("北京在华北平原"));

        // 没有评分要点时显示"无"
        let (without_points, _) =
            service.build_grading_messages("题目", &[], "参考答案", "转写");
        assert!(without_points.contains("  无"));
    }

    /// 测试真实评分
    ///
    /// 运行方式：
    /// ```bash
    /// cargo test test_evaluate_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_evaluate_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = create_test_service();

        println!("\n========== 测试答案评分 ==========");
        let question = "简述光合作用的过程";
        let key_points = vec![
            "光反应在类囊体膜上进行".to_string(),
            "暗反应在基质中固定二氧化碳".to_string(),
        ];
        let model_answer = "光合作用分为光反应和暗反应两个阶段，光反应将光能转化为化学能，暗反应利用这些能量固定二氧化碳合成有机物。";
        let transcript = "光合作用有光反应和暗反应，光反应产生能量，暗反应用这些能量把二氧化碳变成糖。";
        println!("题目: {}", question);
        println!("转写: {}", transcript);
        println!("==================================\n");

        let result = service
            .evaluate(question, &key_points, model_answer, transcript)
            .await;

        match result {
            Ok(evaluation) => {
                println!("\n========== 评分结果 ==========");
                println!("分数: {:.0}", evaluation.score);
                println!("反馈: {}", evaluation.feedback);
                println!("==============================\n");
                println!("✅ 答案评分成功！");
                assert!((0.0..=100.0).contains(&evaluation.score));
                assert!(!evaluation.feedback.is_empty());
            }
            Err(e) => {
                println!("\n❌ 答案评分失败: {}", e);
                panic!("测试失败: {}", e);
            }
        }
    }
}
