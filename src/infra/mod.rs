pub mod github;
pub mod llm;
pub mod session;
