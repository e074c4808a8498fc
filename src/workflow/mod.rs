pub mod mcq_quiz;
pub mod progress;
pub mod subjective_quiz;

pub use mcq_quiz::{McqQuiz, McqStep};
pub use progress::QuizProgress;
pub use subjective_quiz::{
    AnswerState, EvaluationRequest, SubjectiveQuiz, SubjectiveStep,
};
