//! Configuration diffing between the device running config and a
//! candidate held in memory.
//!
//! Three views are provided:
//! - [`unified_diff`] -- line-level unified diff used for replace candidates.
//! - [`merge_diff`] -- lines a merge candidate would add.
//! - [`diff_sections`] -- block-by-block comparison keyed on top-level
//!   command lines (`interface ...`, `object network ...`, etc.).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use similar::TextDiff;

/// Number of unchanged context lines around each hunk.
pub const CONTEXT_LINES: usize = 3;

const FROM_LABEL: &str = "running";
const TO_LABEL: &str = "candidate";

// ---------------------------------------------------------------------------
// Diff status
// ---------------------------------------------------------------------------

/// How a top-level block (`interface ...`, `object network ...`) compares
/// between the running config and the candidate.
///
/// A block is `Changed` when its header exists on both sides but the
/// indented lines under it differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One top-level configuration block and how it differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChange {
    /// The top-level command line that opens the block.
    pub header: String,
    pub status: DiffStatus,
}

// ---------------------------------------------------------------------------
// Line diffs
// ---------------------------------------------------------------------------

/// Unified diff of `running` against `candidate`.
///
/// Lines are compared without their terminators, so CRLF and LF inputs
/// compare equal. Identical inputs produce an empty string.
pub fn unified_diff(running: &str, candidate: &str) -> String {
    let old = normalize_lines(running);
    let new = normalize_lines(candidate);

    TextDiff::from_lines(old.as_str(), new.as_str())
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .missing_newline_hint(false)
        .header(FROM_LABEL, TO_LABEL)
        .to_string()
        .trim_end_matches('\n')
        .to_string()
}

/// What a merge candidate would add to the running config.
///
/// Lines are matched within their block: a child line only counts as
/// present when the same header already holds it. New blocks are listed
/// with every child prefixed `+`; existing blocks that gain children show
/// the header as a context line (leading space) followed by the added
/// children.
pub fn merge_diff(running: &str, candidate: &str) -> String {
    let existing: HashMap<String, HashSet<String>> = split_sections(running)
        .into_iter()
        .map(|(header, children)| (header, children.into_iter().collect()))
        .collect();

    let mut out = Vec::new();
    for (header, children) in split_sections(candidate) {
        match existing.get(&header) {
            None => {
                out.push(format!("+{header}"));
                out.extend(children.iter().map(|child| format!("+ {child}")));
            }
            Some(present) => {
                let added: Vec<&String> =
                    children.iter().filter(|c| !present.contains(*c)).collect();
                if !added.is_empty() {
                    out.push(format!(" {header}"));
                    out.extend(added.into_iter().map(|child| format!("+ {child}")));
                }
            }
        }
    }
    out.join("\n")
}

fn normalize_lines(text: &str) -> String {
    text.lines().map(|line| format!("{line}\n")).collect()
}

// ---------------------------------------------------------------------------
// Section diffs
// ---------------------------------------------------------------------------

/// Compare two configurations block by block.
///
/// Candidate blocks are reported in candidate order, followed by blocks
/// that exist only in the running config.
pub fn diff_sections(running: &str, candidate: &str) -> Vec<SectionChange> {
    let old = split_sections(running);
    let new = split_sections(candidate);
    let old_index: HashMap<&str, &Vec<String>> =
        old.iter().map(|(h, body)| (h.as_str(), body)).collect();
    let new_headers: HashSet<&str> = new.iter().map(|(h, _)| h.as_str()).collect();

    let mut changes: Vec<SectionChange> = new
        .iter()
        .map(|(header, body)| {
            let status = match old_index.get(header.as_str()) {
                None => DiffStatus::Added,
                Some(old_body) if *old_body == body => DiffStatus::Unchanged,
                Some(_) => DiffStatus::Changed,
            };
            SectionChange {
                header: header.clone(),
                status,
            }
        })
        .collect();

    changes.extend(
        old.iter()
            .filter(|(header, _)| !new_headers.contains(header.as_str()))
            .map(|(header, _)| SectionChange {
                header: header.clone(),
                status: DiffStatus::Removed,
            }),
    );

    changes
}

/// Split a configuration into `(header, children)` blocks.
///
/// Comment (`!`), banner-style metadata (`:`) and blank lines are
/// ignored. Repeated headers are folded into one block.
fn split_sections(text: &str) -> Vec<(String, Vec<String>)> {
    let mut sections: Vec<(String, Vec<String>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut current: Option<usize> = None;

    for raw in text.lines() {
        let line = raw.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('!') || trimmed.starts_with(':') {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let Some(idx) = current {
                sections[idx].1.push(trimmed.to_string());
            }
            continue;
        }

        let idx = *positions.entry(line.to_string()).or_insert_with(|| {
            sections.push((line.to_string(), Vec::new()));
            sections.len() - 1
        });
        current = Some(idx);
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNNING: &str = "\
hostname fw01
interface Management0/0
 nameif management
 security-level 100
 ip address 10.0.0.1 255.255.255.0
!
ftp mode passive
dns domain-lookup management
";

    #[test]
    fn section_status_serializes_as_its_name() {
        let change = SectionChange {
            header: "interface Management0/0".into(),
            status: DiffStatus::Changed,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["status"], "changed");
        assert_eq!(DiffStatus::Unchanged.to_string(), "unchanged");
    }

    #[test]
    fn unified_diff_of_identical_configs_is_empty() {
        assert_eq!(unified_diff(RUNNING, RUNNING), "");
    }

    #[test]
    fn unified_diff_ignores_line_endings() {
        let crlf = RUNNING.replace('\n', "\r\n");
        assert_eq!(unified_diff(RUNNING, &crlf), "");
    }

    #[test]
    fn unified_diff_reports_changed_line() {
        let candidate = RUNNING.replace("hostname fw01", "hostname fw02");
        let diff = unified_diff(RUNNING, &candidate);

        let lines: Vec<&str> = diff.lines().collect();
        assert_eq!(lines[0], "--- running");
        assert_eq!(lines[1], "+++ candidate");
        assert!(lines[2].starts_with("@@ -1,4 +1,4 @@"));
        assert!(lines.contains(&"-hostname fw01"));
        assert!(lines.contains(&"+hostname fw02"));
        assert!(!diff.ends_with('\n'));
    }

    #[test]
    fn unified_diff_against_empty_running_adds_everything() {
        let diff = unified_diff("", "hostname fw01\n");
        assert!(diff.contains("+hostname fw01"));
    }

    #[test]
    fn merge_diff_lists_only_new_lines() {
        let candidate = "!\nhostname fw01\nlogging enable\n\nntp server 10.0.0.5\n";
        assert_eq!(
            merge_diff(RUNNING, candidate),
            "+logging enable\n+ntp server 10.0.0.5"
        );
    }

    #[test]
    fn merge_diff_matches_children_within_their_block() {
        let running = "\
interface GigabitEthernet0/0
 nameif outside
 security-level 0
interface GigabitEthernet0/1
 no nameif
 no security-level
";
        let candidate = "interface GigabitEthernet0/1\n nameif outside\n security-level 0\n";
        assert_eq!(
            merge_diff(running, candidate),
            " interface GigabitEthernet0/1\n+ nameif outside\n+ security-level 0"
        );
    }

    #[test]
    fn merge_diff_lists_new_blocks_with_children() {
        let candidate = "object network web\n host 10.0.0.10\n";
        assert_eq!(
            merge_diff(RUNNING, candidate),
            "+object network web\n+ host 10.0.0.10"
        );
    }

    #[test]
    fn merge_diff_skips_children_already_in_block() {
        let candidate = "interface Management0/0\n nameif management\n security-level 100\n";
        assert_eq!(merge_diff(RUNNING, candidate), "");
    }

    #[test]
    fn merge_diff_of_existing_lines_is_empty() {
        assert_eq!(merge_diff(RUNNING, "ftp mode passive\n"), "");
    }

    #[test]
    fn section_diff_classifies_blocks() {
        let candidate = "\
hostname fw01
interface Management0/0
 nameif management
 security-level 0
 ip address 10.0.0.1 255.255.255.0
ftp mode passive
logging enable
";
        let changes = diff_sections(RUNNING, candidate);
        let statuses: Vec<(&str, DiffStatus)> = changes
            .iter()
            .map(|c| (c.header.as_str(), c.status))
            .collect();

        assert_eq!(
            statuses,
            vec![
                ("hostname fw01", DiffStatus::Unchanged),
                ("interface Management0/0", DiffStatus::Changed),
                ("ftp mode passive", DiffStatus::Unchanged),
                ("logging enable", DiffStatus::Added),
                ("dns domain-lookup management", DiffStatus::Removed),
            ]
        );
    }

    #[test]
    fn section_diff_skips_saved_metadata_lines() {
        let running = ": Saved\n: Serial Number: 9A1\nhostname fw01\n";
        let changes = diff_sections(running, "hostname fw01\n");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, DiffStatus::Unchanged);
    }
}
