//! LLM 响应清理工具
//!
//! 模型偶尔会把 JSON 包在 markdown 代码块里返回，
//! 反序列化之前先把外层的围栏剥掉。

/// 剥掉 LLM 响应外层的 markdown 代码块围栏
///
/// # 参数
/// - `raw`: 模型返回的原始文本
///
/// # 返回
/// 去掉 ```json / ``` 围栏并修剪空白后的文本
pub fn clean_json_response(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let without_close = without_open.strip_suffix("```").unwrap_or(without_open);
    without_close.trim().to_string()
}
