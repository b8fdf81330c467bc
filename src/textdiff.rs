//! Unified-diff rendering for text content
//!
//! Backs [`Diff::unified`](crate::diff::Diff::unified). The algorithm finds
//! the longest common subsequence of lines via dynamic programming, converts
//! it to a keep/delete/insert operation stream, and renders the operations
//! as standard `@@ -a,b +c,d @@` hunks with three lines of context.
//!
//! Rendering assumes UTF-8 text; callers are responsible for keeping binary
//! content away from it.

/// Context lines included around each change in a hunk.
const CONTEXT_LINES: usize = 3;

/// Render a unified diff between two texts
///
/// Returns the empty string when the texts are identical. The header names
/// the sides `old` and `new`; path labeling is the caller's concern.
///
/// Lines are split on `'\n'` keeping the trailing empty segment, so a text
/// without a final newline differs from one with it and the change renders
/// as a visible inserted or deleted line.
pub fn unified_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();

    let ops = compute_ops(&old_lines, &new_lines);
    if !ops.iter().any(|op| !matches!(op, ChangeOp::Keep(_, _))) {
        return String::new();
    }

    let mut out = String::from("--- old\n+++ new\n");
    for hunk in hunk_ranges(&ops) {
        render_hunk(&ops, hunk, &old_lines, &new_lines, &mut out);
    }
    out
}

#[derive(Debug, Clone, Copy)]
enum ChangeOp {
    /// Line present on both sides: (old index, new index)
    Keep(usize, usize),
    /// Line only on the old side
    Delete(usize),
    /// Line only on the new side
    Insert(usize),
}

/// Turn two line lists into a keep/delete/insert operation stream.
fn compute_ops(old_lines: &[&str], new_lines: &[&str]) -> Vec<ChangeOp> {
    let lcs = compute_lcs(old_lines, new_lines);

    let mut ops = Vec::with_capacity(old_lines.len().max(new_lines.len()));
    let mut old_idx = 0;
    let mut new_idx = 0;
    for &(lcs_old, lcs_new) in &lcs {
        while old_idx < lcs_old {
            ops.push(ChangeOp::Delete(old_idx));
            old_idx += 1;
        }
        while new_idx < lcs_new {
            ops.push(ChangeOp::Insert(new_idx));
            new_idx += 1;
        }
        ops.push(ChangeOp::Keep(old_idx, new_idx));
        old_idx += 1;
        new_idx += 1;
    }
    while old_idx < old_lines.len() {
        ops.push(ChangeOp::Delete(old_idx));
        old_idx += 1;
    }
    while new_idx < new_lines.len() {
        ops.push(ChangeOp::Insert(new_idx));
        new_idx += 1;
    }
    ops
}

/// Longest common subsequence of lines, O(m*n) dynamic programming.
fn compute_lcs(old_lines: &[&str], new_lines: &[&str]) -> Vec<(usize, usize)> {
    let m = old_lines.len();
    let n = new_lines.len();
    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for i in 1..=m {
        for j in 1..=n {
            if old_lines[i - 1] == new_lines[j - 1] {
                dp[i][j] = dp[i - 1][j - 1] + 1;
            } else {
                dp[i][j] = dp[i - 1][j].max(dp[i][j - 1]);
            }
        }
    }

    let mut lcs = Vec::new();
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if old_lines[i - 1] == new_lines[j - 1] {
            lcs.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] > dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    lcs.reverse();
    lcs
}

/// Split the op stream into hunk ranges: maximal runs of changed ops padded
/// with context, merged where their context would overlap.
fn hunk_ranges(ops: &[ChangeOp]) -> Vec<std::ops::Range<usize>> {
    let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();

    for (i, op) in ops.iter().enumerate() {
        if matches!(op, ChangeOp::Keep(_, _)) {
            continue;
        }
        let start = i.saturating_sub(CONTEXT_LINES);
        let end = (i + CONTEXT_LINES + 1).min(ops.len());
        match ranges.last_mut() {
            Some(last) if start <= last.end => last.end = end,
            _ => ranges.push(start..end),
        }
    }
    ranges
}

/// Append one rendered hunk to `out`.
fn render_hunk(
    ops: &[ChangeOp],
    range: std::ops::Range<usize>,
    old_lines: &[&str],
    new_lines: &[&str],
    out: &mut String,
) {
    // Old/new line numbers consumed before the hunk starts.
    let mut old_cursor = 0usize;
    let mut new_cursor = 0usize;
    for op in &ops[..range.start] {
        match op {
            ChangeOp::Keep(_, _) => {
                old_cursor += 1;
                new_cursor += 1;
            }
            ChangeOp::Delete(_) => old_cursor += 1,
            ChangeOp::Insert(_) => new_cursor += 1,
        }
    }

    let hunk = &ops[range];
    let old_count = hunk
        .iter()
        .filter(|op| !matches!(op, ChangeOp::Insert(_)))
        .count();
    let new_count = hunk
        .iter()
        .filter(|op| !matches!(op, ChangeOp::Delete(_)))
        .count();

    // Unified format uses the line *before* the hunk when a side is empty.
    let old_start = if old_count == 0 { old_cursor } else { old_cursor + 1 };
    let new_start = if new_count == 0 { new_cursor } else { new_cursor + 1 };

    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        old_start, old_count, new_start, new_count
    ));
    for op in hunk {
        match op {
            ChangeOp::Keep(o, _) => {
                out.push(' ');
                out.push_str(old_lines[*o]);
            }
            ChangeOp::Delete(o) => {
                out.push('-');
                out.push_str(old_lines[*o]);
            }
            ChangeOp::Insert(n) => {
                out.push('+');
                out.push_str(new_lines[*n]);
            }
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_render_empty() {
        assert_eq!(unified_diff("a\nb\nc", "a\nb\nc"), "");
        assert_eq!(unified_diff("", ""), "");
    }

    #[test]
    fn test_one_line_change() {
        let rendered = unified_diff("hello", "hello!");
        assert!(rendered.contains("-hello\n"));
        assert!(rendered.contains("+hello!\n"));
        assert!(rendered.starts_with("--- old\n+++ new\n"));
    }

    #[test]
    fn test_change_in_the_middle_keeps_context() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8\n9";
        let new = "1\n2\n3\nX\n5\n6\n7\n8\n9";
        let rendered = unified_diff(old, new);

        assert!(rendered.contains("@@ -1,7 +1,7 @@\n"));
        assert!(rendered.contains("-4\n"));
        assert!(rendered.contains("+X\n"));
        // Lines beyond the context window stay out of the hunk.
        assert!(!rendered.contains(" 8\n"));
    }

    #[test]
    fn test_pure_insertion_into_empty() {
        // The empty text is one empty line, replaced wholesale.
        let rendered = unified_diff("", "only\nnew");
        assert!(rendered.contains("@@ -1,1 +1,2 @@\n"));
        assert!(rendered.contains("+only\n"));
        assert!(rendered.contains("+new\n"));
    }

    #[test]
    fn test_pure_deletion_to_empty() {
        let rendered = unified_diff("gone", "");
        assert!(rendered.contains("@@ -1,1 +1,1 @@\n"));
        assert!(rendered.contains("-gone\n"));
    }

    #[test]
    fn test_trailing_newline_only_change_renders() {
        let rendered = unified_diff("a", "a\n");
        assert!(!rendered.is_empty());
        assert!(rendered.contains(" a\n"));
        assert!(rendered.contains("@@ -1,1 +1,2 @@\n"));

        let reverse = unified_diff("a\n", "a");
        assert!(!reverse.is_empty());
        assert!(reverse.contains("@@ -1,2 +1,1 @@\n"));
    }

    #[test]
    fn test_distant_changes_get_separate_hunks() {
        let old: String = (1..=30).map(|i| format!("line{i}\n")).collect();
        let new = old
            .replace("line2\n", "two\n")
            .replace("line29\n", "twentynine\n");
        let rendered = unified_diff(&old, &new);
        assert_eq!(rendered.matches("@@").count(), 4); // two hunks, two @@ each
    }
}
