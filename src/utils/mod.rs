pub mod llm_json;
pub mod logging;

pub use llm_json::clean_json_response;
