use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SynthesisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Feature,
    Bugfix,
    Improvement,
    Breaking,
}

impl ChangeType {
    pub const ALL: [ChangeType; 4] = [
        ChangeType::Breaking,
        ChangeType::Feature,
        ChangeType::Improvement,
        ChangeType::Bugfix,
    ];

    fn heading(&self) -> &'static str {
        match self {
            ChangeType::Feature => "New features",
            ChangeType::Bugfix => "Bug fixes",
            ChangeType::Improvement => "Improvements",
            ChangeType::Breaking => "Breaking changes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    pub title: String,
    pub description: String,
    pub impact: Impact,
}

/// The part of a changelog the language model is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogBody {
    pub summary: String,
    pub changes: Vec<ChangeEntry>,
}

impl ChangelogBody {
    /// Parses model output against the changelog contract. Any deviation,
    /// including an unknown `type` or `impact`, is a schema error.
    pub fn parse(text: &str) -> Result<Self, SynthesisError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SynthesisError::Schema(
                "language model returned an empty response".to_string(),
            ));
        }
        serde_json::from_str(trimmed).map_err(|err| SynthesisError::Schema(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftMetadata {
    pub repository: String,
    pub since: Option<String>,
    pub total_commits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogDraft {
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    pub summary: String,
    pub changes: Vec<ChangeEntry>,
    pub generated_at: DateTime<Utc>,
    pub total_commits: usize,
}

impl ChangelogDraft {
    pub fn from_body(
        body: ChangelogBody,
        metadata: DraftMetadata,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            repository: metadata.repository,
            since: metadata.since,
            summary: body.summary,
            changes: body.changes,
            generated_at,
            total_commits: metadata.total_commits,
        }
    }

    pub fn no_commits(metadata: DraftMetadata, generated_at: DateTime<Utc>) -> Self {
        let summary = match &metadata.since {
            Some(since) => format!("No commits found since {since}"),
            None => "No commits found".to_string(),
        };
        Self {
            repository: metadata.repository,
            since: metadata.since,
            summary,
            changes: Vec::new(),
            generated_at,
            total_commits: 0,
        }
    }

    pub fn body(&self) -> ChangelogBody {
        ChangelogBody {
            summary: self.summary.clone(),
            changes: self.changes.clone(),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Changelog for {}", self.repository);
        let _ = write!(out, "_");
        if let Some(since) = &self.since {
            let _ = write!(out, "Since {since} · ");
        }
        let _ = writeln!(
            out,
            "{} commits analyzed · generated {}_",
            self.total_commits,
            crate::domain::format_timestamp(&self.generated_at)
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.summary.trim());

        if self.changes.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "_No user-visible changes._");
            return out;
        }

        for kind in ChangeType::ALL {
            let mut entries = self.changes.iter().filter(|entry| entry.kind == kind).peekable();
            if entries.peek().is_none() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "## {}", kind.heading());
            for entry in entries {
                let _ = writeln!(
                    out,
                    "- **{}** ({} impact): {}",
                    entry.title.trim(),
                    entry.impact.as_str(),
                    entry.description.trim()
                );
            }
        }
        out
    }
}
