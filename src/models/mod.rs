pub mod exam;
pub mod record;
pub mod transcript;

pub use exam::{ExamData, Mcq, SubjectiveQuestion};
pub use record::{Evaluation, McqAnswerRecord, SessionResults, SubjectiveAnswerRecord};
pub use transcript::{TranscriptBuffer, TranscriptSegment};
