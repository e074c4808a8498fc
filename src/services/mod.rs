pub mod analyzer;
pub mod grader;
pub mod session_log;
pub mod speech;

pub use analyzer::ExamAnalyzer;
pub use grader::AnswerGrader;
pub use session_log::SessionLogWriter;
pub use speech::{BrowserSpeechCapture, SpeechCapture};
