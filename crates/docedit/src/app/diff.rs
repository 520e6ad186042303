//! Before/after views of pending proposals.

use similar::{ChangeTag, TextDiff};

/// Line counts for a rendered diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.insertions == 0 && self.deletions == 0
    }
}

/// A line-oriented diff ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffView {
    pub rendered: String,
    pub stats: DiffStats,
}

/// Render a unified-style diff of `before` against `after` with `context_lines` of
/// unchanged text around each hunk.
pub fn render_diff(before: &str, after: &str, context_lines: usize) -> DiffView {
    let diff = TextDiff::from_lines(before, after);
    let mut stats = DiffStats::default();
    let mut rendered = String::new();

    for group in diff.grouped_ops(context_lines) {
        let Some(first) = group.first() else {
            continue;
        };
        let old = first.old_range().start
            ..group.iter().map(|op| op.old_range().end).max().unwrap_or_default();
        let new = first.new_range().start
            ..group.iter().map(|op| op.new_range().end).max().unwrap_or_default();
        rendered.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old.start + 1,
            old.len(),
            new.start + 1,
            new.len()
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => {
                        stats.deletions += 1;
                        '-'
                    }
                    ChangeTag::Insert => {
                        stats.insertions += 1;
                        '+'
                    }
                    ChangeTag::Equal => ' ',
                };
                rendered.push(sign);
                rendered.push_str(change.value());
                if change.missing_newline() {
                    rendered.push('\n');
                }
            }
        }
    }

    DiffView { rendered, stats }
}

/// One-line summary such as `2 insertions(+), 1 deletion(-)`.
pub fn summarize(stats: &DiffStats) -> String {
    if stats.is_empty() {
        return "no changes".to_owned();
    }
    format!(
        "{} insertion{}(+), {} deletion{}(-)",
        stats.insertions,
        if stats.insertions == 1 { "" } else { "s" },
        stats.deletions,
        if stats.deletions == 1 { "" } else { "s" },
    )
}
