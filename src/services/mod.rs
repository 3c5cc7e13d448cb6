pub mod language_model;
pub mod repository_host;
pub mod session;

pub use language_model::LanguageModelService;
pub use repository_host::{
    CommitBatch, CommitQuery, RepositoryHost, SkippedCommit, fetch_commits_with_diffs,
};
pub use session::{Session, SessionStore};
