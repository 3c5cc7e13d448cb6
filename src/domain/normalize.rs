//! Bounded, prompt-ready projection of raw commit data.
//!
//! Patches arrive from the host with no size limit. Everything that leaves this
//! module carries patches of at most [`PatchBudget::max_bytes`] bytes.

use serde::Serialize;

use crate::domain::commit::{CommitRecord, FileChange, FileStatus};
use crate::domain::format_timestamp;

pub const ELISION_MARKER: &str = "...";
pub const SHORT_SHA_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchBudget {
    pub max_bytes: usize,
    pub head_lines: usize,
    pub tail_lines: usize,
}

impl PatchBudget {
    /// Smallest byte budget that still leaves room for a useful excerpt.
    pub const MIN_BYTES: usize = 64;

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }
}

impl Default for PatchBudget {
    fn default() -> Self {
        Self {
            max_bytes: 2000,
            head_lines: 10,
            tail_lines: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedFile {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
    pub changes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedCommit {
    pub sha: String,
    pub short_sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub files_changed: usize,
    pub additions: u64,
    pub deletions: u64,
    pub files: Vec<NormalizedFile>,
}

pub fn normalize_commits(records: &[CommitRecord], budget: &PatchBudget) -> Vec<NormalizedCommit> {
    records
        .iter()
        .map(|record| normalize_commit(record, budget))
        .collect()
}

pub fn normalize_commit(record: &CommitRecord, budget: &PatchBudget) -> NormalizedCommit {
    NormalizedCommit {
        sha: record.sha.clone(),
        short_sha: record.sha.chars().take(SHORT_SHA_LEN).collect(),
        message: record.message.clone(),
        author: record.author.name.clone(),
        date: format_timestamp(&record.author.timestamp),
        files_changed: record.files.len(),
        additions: record.stats.additions,
        deletions: record.stats.deletions,
        files: record
            .files
            .iter()
            .map(|file| normalize_file(file, budget))
            .collect(),
    }
}

fn normalize_file(file: &FileChange, budget: &PatchBudget) -> NormalizedFile {
    NormalizedFile {
        filename: file.filename.clone(),
        previous_filename: file.previous_filename.clone(),
        status: file.status,
        additions: file.additions,
        deletions: file.deletions,
        changes: file.changes,
        patch: file.patch.as_deref().map(|patch| bound_patch(patch, budget)),
    }
}

/// Applies the patch-size policy: verbatim up to the budget (inclusive), else a
/// head/tail line excerpt, clamped to the byte budget when lines are very long.
pub fn bound_patch(patch: &str, budget: &PatchBudget) -> String {
    if patch.len() <= budget.max_bytes {
        return patch.to_string();
    }

    let lines: Vec<&str> = patch.split('\n').collect();
    let kept = budget.head_lines + budget.tail_lines;
    let excerpt = if lines.len() > kept {
        let mut selected = Vec::with_capacity(kept + 1);
        selected.extend_from_slice(&lines[..budget.head_lines]);
        selected.push(ELISION_MARKER);
        selected.extend_from_slice(&lines[lines.len() - budget.tail_lines..]);
        selected.join("\n")
    } else {
        patch.to_string()
    };

    clamp_to_budget(excerpt, budget.max_bytes)
}

fn clamp_to_budget(text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }

    let marker_len = ELISION_MARKER.len() + 1;
    let mut cut = max_bytes.saturating_sub(marker_len);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut clamped = String::with_capacity(cut + marker_len);
    clamped.push_str(&text[..cut]);
    clamped.push('\n');
    clamped.push_str(ELISION_MARKER);
    clamped
}
