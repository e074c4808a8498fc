//! 语音转写数据
//!
//! 语音采集服务产出带 final/interim 标记的文本片段，
//! 转写缓冲区负责把片段累积成可提交的全文。

use serde::{Deserialize, Serialize};

/// 一段语音识别结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// 识别出的文本
    pub text: String,
    /// 是否为最终结果（非最终结果只用于实时展示）
    pub is_final: bool,
}

impl TranscriptSegment {
    /// 创建最终片段
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    /// 创建临时片段
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// 转写缓冲区
///
/// 最终片段按到达顺序追加；临时片段只保留最新的一条，
/// 不进入提交文本，停止录音时整体丢弃。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptBuffer {
    finals: Vec<String>,
    interim: Option<String>,
}

impl TranscriptBuffer {
    /// 创建空缓冲区
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空全部内容
    pub fn clear(&mut self) {
        self.finals.clear();
        self.interim = None;
    }

    /// 应用一段识别结果
    pub fn apply(&mut self, segment: &TranscriptSegment) {
        if segment.is_final {
            self.finals.push(segment.text.clone());
            self.interim = None;
        } else {
            self.interim = Some(segment.text.clone());
        }
    }

    /// 丢弃未定稿的临时片段
    pub fn discard_interim(&mut self) {
        self.interim = None;
    }

    /// 可提交的转写全文（只包含最终片段，按到达顺序拼接）
    pub fn transcript(&self) -> String {
        self.finals.concat()
    }

    /// 实时展示文本（最终片段加上最新的临时片段）
    pub fn display_text(&self) -> String {
        match &self.interim {
            Some(interim) => format!("{}{}", self.finals.concat(), interim),
            None => self.finals.concat(),
        }
    }

    /// 是否没有任何最终片段（临时片段不算数）
    pub fn is_empty(&self) -> bool {
        self.finals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finals_accumulate_in_order() {
        let mut buffer = TranscriptBuffer::new();
        buffer.apply(&TranscriptSegment::final_text("今天 "));
        buffer.apply(&TranscriptSegment::final_text("天气很好"));

        assert_eq!(buffer.transcript(), "今天 天气很好");
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_interim_only_affects_display() {
        let mut buffer = TranscriptBuffer::new();
        buffer.apply(&TranscriptSegment::final_text("第一句。"));
        buffer.apply(&TranscriptSegment::interim("第二"));

        // 临时片段出现在实时展示中，但不进入提交文本
        assert_eq!(buffer.display_text(), "第一句。第二");
        assert_eq!(buffer.transcript(), "第一句。");

        // 新的临时片段覆盖旧的
        buffer.apply(&TranscriptSegment::interim("第二句"));
        assert_eq!(buffer.display_text(), "第一句。第二句");

        // 定稿后临时片段被清除
        buffer.apply(&TranscriptSegment::final_text("第二句话。"));
        assert_eq!(buffer.transcript(), "第一句。第二句话。");
        assert_eq!(buffer.display_text(), "第一句。第二句话。");
    }

    #[test]
    fn test_discard_interim() {
        let mut buffer = TranscriptBuffer::new();
        buffer.apply(&TranscriptSegment::interim("还没说完"));
        buffer.discard_interim();

        assert_eq!(buffer.display_text(), "");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut buffer = TranscriptBuffer::new();
        buffer.apply(&TranscriptSegment::final_text("旧内容"));
        buffer.apply(&TranscriptSegment::interim("旧临时"));
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.display_text(), "");
    }
}
