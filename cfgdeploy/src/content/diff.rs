//! Line-oriented diff of normalized configuration documents

use serde::Serialize;

use crate::content::kind::{ConfigurationProfileKind, FileKind};
use crate::content::normalize::normalize;
use crate::errors::DeployError;

/// Above this many comparison cells the differ stops looking for a minimal
/// edit script and reports the differing middle block as replaced.
const MAX_LCS_CELLS: usize = 4_000_000;

/// Classification of one diff entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Context,
    Insert,
    Delete,
}

impl DiffOp {
    pub fn prefix(&self) -> char {
        match self {
            DiffOp::Context => ' ',
            DiffOp::Insert => '+',
            DiffOp::Delete => '-',
        }
    }
}

/// One line of a diff, without its line terminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub op: DiffOp,
    pub text: String,
}

/// Result of comparing the deployed document with the local one
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub remote_text: String,
    pub local_text: String,
    pub unified_diff: String,
    pub has_changes: bool,
    pub source_name: String,
    pub lines: Vec<DiffLine>,
}

impl DiffResult {
    /// Build a result from two already-normalized texts
    pub fn from_normalized(remote_text: String, local_text: String, source_name: &str) -> Self {
        let lines = diff_lines(&remote_text, &local_text);
        let has_changes = lines.iter().any(|l| l.op != DiffOp::Context);
        let unified_diff = if has_changes {
            render(&lines)
        } else {
            String::new()
        };

        Self {
            remote_text,
            local_text,
            unified_diff,
            has_changes,
            source_name: source_name.to_string(),
            lines,
        }
    }

    /// Number of inserted and deleted lines
    pub fn stats(&self) -> (usize, usize) {
        self.lines.iter().fold((0, 0), |(ins, del), line| match line.op {
            DiffOp::Insert => (ins + 1, del),
            DiffOp::Delete => (ins, del + 1),
            DiffOp::Context => (ins, del),
        })
    }
}

/// Normalize both documents and diff them.
///
/// The syntax is taken from `source_name`'s extension.
pub fn calculate(
    remote: &[u8],
    local: &[u8],
    source_name: &str,
    profile_kind: ConfigurationProfileKind,
) -> Result<DiffResult, DeployError> {
    let kind = FileKind::from_path(source_name);
    let remote_text = normalize(remote, kind, profile_kind)?;
    let local_text = normalize(local, kind, profile_kind)?;

    Ok(DiffResult::from_normalized(remote_text, local_text, source_name))
}

/// Diff a local document against nothing, for a profile that was never deployed
pub fn calculate_initial(
    local: &[u8],
    source_name: &str,
    profile_kind: ConfigurationProfileKind,
) -> Result<DiffResult, DeployError> {
    let kind = FileKind::from_path(source_name);
    let local_text = normalize(local, kind, profile_kind)?;

    Ok(DiffResult::from_normalized(String::new(), local_text, source_name))
}

/// Whether two documents of the given syntax differ after normalization
pub fn content_changed(
    remote: &[u8],
    local: &[u8],
    kind: FileKind,
    profile_kind: ConfigurationProfileKind,
) -> Result<bool, DeployError> {
    let remote_text = normalize(remote, kind, profile_kind)?;
    let local_text = normalize(local, kind, profile_kind)?;
    Ok(remote_text != local_text)
}

fn render(lines: &[DiffLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push(line.op.prefix());
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}

/// Compute a line diff. Lines keep their terminator while comparing so that
/// a missing final newline still counts as a difference.
fn diff_lines(old: &str, new: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = old.split_inclusive('\n').collect();
    let b: Vec<&str> = new.split_inclusive('\n').collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut out = Vec::with_capacity(a.len().max(b.len()));
    push_all(&mut out, DiffOp::Context, &a[..prefix]);

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];
    if a_mid.len().saturating_mul(b_mid.len()) > MAX_LCS_CELLS {
        push_all(&mut out, DiffOp::Delete, a_mid);
        push_all(&mut out, DiffOp::Insert, b_mid);
    } else {
        lcs_diff(&mut out, a_mid, b_mid);
    }

    push_all(&mut out, DiffOp::Context, &a[a.len() - suffix..]);
    out
}

fn lcs_diff(out: &mut Vec<DiffLine>, a: &[&str], b: &[&str]) {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;

    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            push_line(out, DiffOp::Context, a[i]);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            push_line(out, DiffOp::Delete, a[i]);
            i += 1;
        } else {
            push_line(out, DiffOp::Insert, b[j]);
            j += 1;
        }
    }
    push_all(out, DiffOp::Delete, &a[i..]);
    push_all(out, DiffOp::Insert, &b[j..]);
}

fn push_all(out: &mut Vec<DiffLine>, op: DiffOp, lines: &[&str]) {
    for line in lines {
        push_line(out, op, line);
    }
}

fn push_line(out: &mut Vec<DiffLine>, op: DiffOp, line: &str) {
    out.push(DiffLine {
        op,
        text: line.trim_end_matches('\n').to_string(),
    });
}
