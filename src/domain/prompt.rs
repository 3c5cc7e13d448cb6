use std::fmt::Write as _;

use crate::domain::normalize::NormalizedCommit;

pub const SYSTEM_PROMPT: &str = "You are an experienced software engineer who writes clear, \
accurate changelogs for end users. Always respond with valid JSON only.";

const AUDIENCE_INSTRUCTIONS: &str = "\
Report ONLY changes that end users would notice:
- New features and functionality
- Bug fixes that affect the user experience
- Breaking changes that affect user workflows
- Performance improvements users can feel

IGNORE developer-only changes such as:
- Tests, refactoring and code cleanup
- Documentation updates
- Dependency bumps
- Internal configuration, build and CI changes
- Internal code structure changes
";

const OUTPUT_CONTRACT: &str = r#"Respond with a JSON object of exactly this shape:
{
  "summary": "One or two sentences describing the user-visible changes",
  "changes": [
    {
      "type": "feature|bugfix|improvement|breaking",
      "title": "Short, user-friendly title",
      "description": "What this means for users, in plain language",
      "impact": "low|medium|high"
    }
  ]
}

"type" must be one of feature, bugfix, improvement, breaking.
"impact" must be one of low, medium, high.
If there are no user-visible changes, return an empty "changes" array.
"#;

const JSON_ONLY: &str =
    "Return ONLY the JSON object: no explanation, no markdown code fences, no text before or after it.";

/// Renders the changelog prompt. Pure and deterministic: identical inputs give
/// byte-identical output.
pub fn build_prompt(repository: &str, since: &str, commits: &[NormalizedCommit]) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are a product manager writing the public changelog for \"{repository}\", \
covering user-visible changes since {since}."
    );
    prompt.push('\n');
    prompt.push_str(AUDIENCE_INSTRUCTIONS);
    prompt.push('\n');

    let _ = writeln!(prompt, "COMMIT DATA ({} commits):", commits.len());
    for (index, commit) in commits.iter().enumerate() {
        prompt.push('\n');
        render_commit(&mut prompt, index + 1, commit);
    }
    prompt.push('\n');

    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');
    prompt.push_str(JSON_ONLY);
    prompt
}

fn render_commit(out: &mut String, position: usize, commit: &NormalizedCommit) {
    let _ = writeln!(out, "COMMIT {position}");
    let _ = writeln!(out, "sha: {}", commit.short_sha);
    let _ = writeln!(out, "author: {}", commit.author);
    let _ = writeln!(out, "date: {}", commit.date);
    let _ = writeln!(out, "message:");
    push_indented(out, commit.message.trim_end(), 2);
    let _ = writeln!(
        out,
        "stats: +{} -{} across {} files",
        commit.additions, commit.deletions, commit.files_changed
    );

    if commit.files.is_empty() {
        return;
    }
    let _ = writeln!(out, "files:");
    for file in &commit.files {
        match &file.previous_filename {
            Some(previous) => {
                let _ = writeln!(
                    out,
                    "  - {} ({} from {}, +{} -{})",
                    file.filename,
                    file.status.as_str(),
                    previous,
                    file.additions,
                    file.deletions
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "  - {} ({}, +{} -{})",
                    file.filename,
                    file.status.as_str(),
                    file.additions,
                    file.deletions
                );
            }
        }
        if let Some(patch) = file.patch.as_deref().filter(|patch| !patch.is_empty()) {
            let _ = writeln!(out, "    diff:");
            push_indented(out, patch, 6);
        }
    }
}

fn push_indented(out: &mut String, text: &str, indent: usize) {
    for line in text.split('\n') {
        let _ = writeln!(out, "{:indent$}{}", "", line.trim_end_matches('\r'), indent = indent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commit::FileStatus;
    use crate::domain::normalize::NormalizedFile;

    fn commit(sha: &str, message: &str) -> NormalizedCommit {
        NormalizedCommit {
            sha: format!("{sha}00000000"),
            short_sha: sha.to_string(),
            message: message.to_string(),
            author: "Ada".to_string(),
            date: "2024-01-05T10:00:00Z".to_string(),
            files_changed: 1,
            additions: 3,
            deletions: 1,
            files: vec![NormalizedFile {
                filename: "src/export.rs".to_string(),
                previous_filename: None,
                status: FileStatus::Modified,
                additions: 3,
                deletions: 1,
                changes: 4,
                patch: Some("@@ -1 +1 @@\n-old\n+new".to_string()),
            }],
        }
    }

    #[test]
    fn identical_inputs_render_identical_prompts() {
        let commits = vec![commit("aaaa1111", "Add export"), commit("bbbb2222", "Fix login")];
        let first = build_prompt("acme/widgets", "2024-01-01T00:00:00Z", &commits);
        let second = build_prompt("acme/widgets", "2024-01-01T00:00:00Z", &commits.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn sections_appear_in_order() {
        let prompt = build_prompt(
            "acme/widgets",
            "2024-01-01T00:00:00Z",
            &[commit("aaaa1111", "Add export")],
        );

        let context = prompt.find("\"acme/widgets\"").unwrap();
        let since = prompt.find("since 2024-01-01T00:00:00Z").unwrap();
        let audience = prompt.find("IGNORE developer-only changes").unwrap();
        let data = prompt.find("COMMIT DATA").unwrap();
        let contract = prompt.find("\"summary\":").unwrap();
        let json_only = prompt.find("Return ONLY the JSON object").unwrap();

        assert!(context < audience && since < audience);
        assert!(audience < data);
        assert!(data < contract);
        assert!(contract < json_only);
    }

    #[test]
    fn includes_every_commit_and_diff() {
        let prompt = build_prompt(
            "acme/widgets",
            "2024-01-01T00:00:00Z",
            &[commit("aaaa1111", "Add export"), commit("bbbb2222", "Fix login")],
        );
        assert!(prompt.contains("sha: aaaa1111"));
        assert!(prompt.contains("sha: bbbb2222"));
        assert!(prompt.contains("  - src/export.rs (modified, +3 -1)"));
        assert!(prompt.contains("      +new"));
        assert!(!prompt.contains("aaaa111100000000"));
    }

    #[test]
    fn labels_previous_names_with_their_status() {
        let mut renamed = commit("aaaa1111", "Move table");
        renamed.files[0].status = FileStatus::Renamed;
        renamed.files[0].previous_filename = Some("src/table.rs".to_string());
        let mut copied = commit("bbbb2222", "Split export");
        copied.files[0].status = FileStatus::Copied;
        copied.files[0].previous_filename = Some("src/csv.rs".to_string());

        let prompt = build_prompt("acme/widgets", "2024-01-01T00:00:00Z", &[renamed, copied]);

        assert!(prompt.contains("  - src/export.rs (renamed from src/table.rs, +3 -1)"));
        assert!(prompt.contains("  - src/export.rs (copied from src/csv.rs, +3 -1)"));
        assert!(!prompt.contains("renamed from src/csv.rs"));
    }

    #[test]
    fn mentions_dependency_bumps_and_enumerations() {
        let prompt = build_prompt("acme/widgets", "2024-01-01T00:00:00Z", &[]);
        assert!(prompt.contains("Dependency bumps"));
        assert!(prompt.contains("feature, bugfix, improvement, breaking"));
        assert!(prompt.contains("low, medium, high"));
        assert!(prompt.contains("COMMIT DATA (0 commits):"));
    }
}
