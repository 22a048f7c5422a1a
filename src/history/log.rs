//! Parser for `git log --pretty=format:%H%x01%an%x01%ae[%x01%ad] --numstat`
//! output.
//!
//! Header lines carry the reserved `\x01` delimiter and never a tab; numstat
//! lines are `additions<TAB>deletions<TAB>path`. A new header (or the end of
//! input) finalizes the previous commit. Malformed lines are skipped, never
//! an error: the stream is machine-generated and a bad line means a bad
//! line, not a bad stream.

const FIELD_SEP: char = '\x01';

/// One file's delta within a commit. Binary files ('-' in numstat) count
/// as 0/0 and are flagged so accumulators can tell "binary" from "empty".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDelta {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
    pub is_binary: bool,
}

/// One non-merge commit inside the requested window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    /// "YYYY-MM-DD", present when the log was asked for dates.
    pub date: Option<String>,
    /// "00".."23", present when the log was asked for dates.
    pub hour: Option<String>,
    pub files: Vec<FileDelta>,
}

/// Parse a whole log stream into commit events.
pub fn parse_log(input: &str) -> Vec<CommitEvent> {
    let mut commits = Vec::new();
    let mut current: Option<CommitEvent> = None;

    for raw_line in input.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains(FIELD_SEP) && !line.contains('\t') {
            // header finalizes the previous commit
            if let Some(done) = current.take() {
                commits.push(done);
            }
            current = parse_header(line);
            continue;
        }

        if line.contains('\t') {
            if let Some(commit) = current.as_mut() {
                if let Some(delta) = parse_numstat(line) {
                    commit.files.push(delta);
                }
            }
        }
    }

    if let Some(done) = current.take() {
        commits.push(done);
    }
    commits
}

fn parse_header(line: &str) -> Option<CommitEvent> {
    let parts: Vec<&str> = line.split(FIELD_SEP).collect();
    if parts.len() < 3 {
        // malformed header: drop it rather than letting following numstat
        // lines attach to the previous commit
        return None;
    }
    let (date, hour) = match parts.get(3) {
        Some(stamp) => match stamp.split_once(' ') {
            Some((d, h)) => (Some(d.to_string()), normalize_hour(h)),
            None => (Some(stamp.to_string()), None),
        },
        None => (None, None),
    };
    Some(CommitEvent {
        sha: parts[0].to_string(),
        author_name: parts[1].to_string(),
        author_email: parts[2].to_string(),
        date,
        hour,
        files: Vec::new(),
    })
}

fn normalize_hour(hour: &str) -> Option<String> {
    let h: u32 = hour.trim().parse().ok()?;
    if h <= 23 {
        Some(format!("{h:02}"))
    } else {
        None
    }
}

fn parse_numstat(line: &str) -> Option<FileDelta> {
    let mut parts = line.splitn(3, '\t');
    let add_str = parts.next()?;
    let del_str = parts.next()?;
    let path = parts.next()?;
    if path.is_empty() {
        return None;
    }
    let is_binary = add_str == "-" || del_str == "-";
    Some(FileDelta {
        path: path.to_string(),
        additions: parse_count(add_str),
        deletions: parse_count(del_str),
        is_binary,
    })
}

fn parse_count(field: &str) -> u64 {
    if field == "-" {
        return 0;
    }
    field.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header(sha: &str, name: &str, email: &str) -> String {
        format!("{sha}\u{1}{name}\u{1}{email}")
    }

    #[test]
    fn parses_commits_with_numstat() {
        let input = format!(
            "{}\n10\t2\tsrc/a.rs\n0\t5\tdocs/b.md\n{}\n1\t1\tsrc/a.rs\n",
            header("abc", "Jane", "jane@example.com"),
            header("def", "Bob", "bob@example.com"),
        );
        let commits = parse_log(&input);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "abc");
        assert_eq!(commits[0].files.len(), 2);
        assert_eq!(commits[0].files[0].additions, 10);
        assert_eq!(commits[0].files[1].deletions, 5);
        assert_eq!(commits[1].author_name, "Bob");
        assert_eq!(commits[1].files.len(), 1);
    }

    #[test]
    fn binary_numstat_counts_zero() {
        let input = format!("{}\n-\t-\tassets/logo.png\n", header("abc", "J", "j@e"));
        let commits = parse_log(&input);
        assert_eq!(commits[0].files[0].additions, 0);
        assert_eq!(commits[0].files[0].deletions, 0);
        assert!(commits[0].files[0].is_binary);
    }

    #[test]
    fn header_with_timestamp_splits_date_and_hour() {
        let input = format!(
            "{}\u{1}2025-03-14 09\n3\t1\ta.py\n",
            header("abc", "J", "j@e")
        );
        let commits = parse_log(&input);
        assert_eq!(commits[0].date.as_deref(), Some("2025-03-14"));
        assert_eq!(commits[0].hour.as_deref(), Some("09"));
    }

    #[test]
    fn malformed_header_drops_following_numstat() {
        let input = format!(
            "{}\n1\t1\tok.rs\nbroken\u{1}header\n9\t9\tstray.rs\n{}\n2\t0\tnext.rs\n",
            header("abc", "J", "j@e"),
            header("def", "K", "k@e"),
        );
        let commits = parse_log(&input);
        assert_eq!(commits.len(), 2);
        // the stray numstat line after the malformed header is discarded
        assert_eq!(commits[0].files.len(), 1);
        assert_eq!(commits[1].files.len(), 1);
        assert_eq!(commits[1].files[0].path, "next.rs");
    }

    #[test]
    fn short_numstat_lines_are_skipped() {
        let input = format!("{}\n5\t3\n7\t1\tkept.rs\n", header("abc", "J", "j@e"));
        let commits = parse_log(&input);
        assert_eq!(commits[0].files.len(), 1);
        assert_eq!(commits[0].files[0].path, "kept.rs");
    }

    #[test]
    fn empty_input_yields_no_commits() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("\n\n").is_empty());
    }

    #[test]
    fn paths_may_contain_the_field_separator_safely() {
        // a tab in the line always means numstat, even if a path were odd
        let input = format!("{}\n1\t0\tdir/with\u{1}odd.rs\n", header("abc", "J", "j@e"));
        let commits = parse_log(&input);
        assert_eq!(commits[0].files.len(), 1);
    }
}
