// Copyright 2026 The Forge Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Line-level diffing: a Myers LCS line diff, hunk formation with bounded
//! context, and a unified-diff formatter. Feeds both PR-view diffs
//! ([`crate::repo::Repository::diff_commits`]) and the three-way file merge
//! ([`crate::merge`]), which runs this twice (source-vs-base,
//! target-vs-base) and overlays the two edit scripts.
//!
//! Lines are copied into the returned [`Hunk`]s rather than borrowed from
//! the input buffers: a diff outlives the blob reads that produced it
//! (it crosses the facade's call boundary into host-rendered PR views),
//! and the line count here is small enough that the clone is not worth
//! the lifetime plumbing it would otherwise force onto every caller.

use bstr::ByteSlice as _;

pub const BINARY_SNIFF_LEN: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Context,
    Add,
    Remove,
}

/// One line of a diff, tagged and carrying the line number(s) it occupies
/// in whichever image(s) it appears in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub tag: LineTag,
    pub content: Vec<u8>,
    /// 1-based line number in the pre-image, for `Context`/`Remove`.
    pub old_line: Option<usize>,
    /// 1-based line number in the post-image, for `Context`/`Add`.
    pub new_line: Option<usize>,
}

/// A contiguous region of a diff surrounded by unchanged context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

/// Splits `text` into lines without a trailing empty line for a final
/// newline — `"a\nb\n"` is `["a", "b"]`, not `["a", "b", ""]`.
pub fn split_lines(text: &[u8]) -> Vec<&[u8]> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&[u8]> = text.split_str(b"\n").collect();
    if text.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

pub fn is_binary(content: &[u8]) -> bool {
    let sniff_len = content.len().min(BINARY_SNIFF_LEN);
    content[..sniff_len].contains(&0)
}

/// One edit-script entry: either a matched (context) pair, a deletion from
/// the old side, or an insertion on the new side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Match { old_index: usize, new_index: usize },
    Delete { old_index: usize },
    Insert { new_index: usize },
}

/// Computes the Myers LCS edit script between two line arrays. This is the
/// O(ND) greedy algorithm: walk diagonals of increasing edit distance `d`
/// until the bottom-right corner of the edit graph is reached, then
/// backtrack the recorded frontier to recover the script in order.
pub fn myers_diff<T: PartialEq>(old: &[T], new: &[T]) -> Vec<EditOp> {
    let n = old.len();
    let m = new.len();
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }
    let offset = max as isize;
    let size = 2 * max + 1;
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut v = vec![0isize; size];

    'outer: for d in 0..=max {
        let snapshot = v.clone();
        for k in (-(d as isize)..=(d as isize)).step_by(2) {
            let idx = (k + offset) as usize;
            let mut x = if k == -(d as isize)
                || (k != d as isize && v[idx.wrapping_sub(1)] < v[idx + 1])
            {
                v[idx + 1]
            } else {
                v[idx.wrapping_sub(1)] + 1
            };
            let mut y = x - k;
            while x < n as isize && y < m as isize && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n as isize && y >= m as isize {
                trace.push(snapshot);
                trace.push(v.clone());
                break 'outer;
            }
        }
        trace.push(snapshot);
    }

    backtrack(&trace, n, m, offset)
}

fn backtrack(trace: &[Vec<isize>], n: usize, m: usize, offset: isize) -> Vec<EditOp> {
    let mut ops = Vec::new();
    let mut x = n as isize;
    let mut y = m as isize;
    for d in (0..trace.len()).rev() {
        let v = &trace[d];
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -(d as isize)
            || (k != d as isize && v.get(idx.wrapping_sub(1)).copied().unwrap_or(isize::MIN) < v[idx + 1])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_idx = (prev_k + offset) as usize;
        let prev_x = v[prev_idx];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push(EditOp::Match {
                old_index: (x - 1) as usize,
                new_index: (y - 1) as usize,
            });
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops.push(EditOp::Insert {
                    new_index: (y - 1) as usize,
                });
                y -= 1;
            } else {
                ops.push(EditOp::Delete {
                    old_index: (x - 1) as usize,
                });
                x -= 1;
            }
        }
    }
    ops.reverse();
    ops
}

/// Turns the raw edit script into aligned [`DiffLine`]s carrying line
/// numbers, then groups them into [`Hunk`]s with up to `context` lines of
/// padding, merging runs where the unchanged gap is `<= 2 * context + 1`.
pub fn diff_lines(old: &[u8], new: &[u8], context: usize) -> Vec<Hunk> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let ops = myers_diff(&old_lines, &new_lines);

    let mut all_lines: Vec<DiffLine> = Vec::with_capacity(ops.len());
    for op in ops {
        match op {
            EditOp::Match { old_index, new_index } => all_lines.push(DiffLine {
                tag: LineTag::Context,
                content: old_lines[old_index].to_vec(),
                old_line: Some(old_index + 1),
                new_line: Some(new_index + 1),
            }),
            EditOp::Delete { old_index } => all_lines.push(DiffLine {
                tag: LineTag::Remove,
                content: old_lines[old_index].to_vec(),
                old_line: Some(old_index + 1),
                new_line: None,
            }),
            EditOp::Insert { new_index } => all_lines.push(DiffLine {
                tag: LineTag::Add,
                content: new_lines[new_index].to_vec(),
                old_line: None,
                new_line: Some(new_index + 1),
            }),
        }
    }

    form_hunks(all_lines, context)
}

fn form_hunks(lines: Vec<DiffLine>, context: usize) -> Vec<Hunk> {
    let merge_gap = 2 * context + 1;
    let mut hunks = Vec::new();
    let mut current: Vec<DiffLine> = Vec::new();
    // Whether `current` holds an Add/Remove yet. A run of pure context never
    // becomes a hunk on its own — only flush when this is true.
    let mut has_change = false;
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        if line.tag == LineTag::Context {
            // Count the run of consecutive context lines starting here.
            let mut run_end = i;
            while run_end < lines.len() && lines[run_end].tag == LineTag::Context {
                run_end += 1;
            }
            let run_len = run_end - i;

            if !has_change {
                // Leading context before the first change: keep only the
                // trailing `context` lines of the run.
                let keep_from = i + run_len.saturating_sub(context);
                current.extend(lines[keep_from..run_end].iter().cloned());
            } else if run_end == lines.len() || run_len >= merge_gap {
                // Gap big enough (or end of input) to close the hunk: keep
                // only up to `context` trailing lines in this hunk.
                let keep = run_len.min(context);
                current.extend(lines[i..i + keep].iter().cloned());
                hunks.push(finish_hunk(std::mem::take(&mut current)));
                has_change = false;
            } else {
                // Small gap: absorb the whole run as context, keep going.
                current.extend(lines[i..run_end].iter().cloned());
            }
            i = run_end;
        } else {
            current.push(line.clone());
            has_change = true;
            i += 1;
        }
    }
    if has_change {
        hunks.push(finish_hunk(current));
    }
    hunks
}

fn finish_hunk(lines: Vec<DiffLine>) -> Hunk {
    let old_count = lines.iter().filter(|l| l.old_line.is_some()).count();
    let new_count = lines.iter().filter(|l| l.new_line.is_some()).count();
    let old_start = lines
        .iter()
        .find_map(|l| l.old_line)
        .unwrap_or_else(|| lines.iter().rev().find_map(|l| l.old_line).unwrap_or(0));
    let new_start = lines
        .iter()
        .find_map(|l| l.new_line)
        .unwrap_or_else(|| lines.iter().rev().find_map(|l| l.new_line).unwrap_or(0));
    Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines,
    }
}

/// Per-file special-case state that changes how the unified formatter
/// renders the mode line and whether it emits a body at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDiffState {
    Modified,
    NewFile,
    DeletedFile,
    Binary,
}

pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    pub state: FileDiffState,
    pub hunks: Vec<Hunk>,
}

/// Renders a single file's diff in `git diff`-style unified format.
pub fn format_unified(diff: &FileDiff) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- a/{}\n", diff.old_path));
    out.push_str(&format!("+++ b/{}\n", diff.new_path));
    match diff.state {
        FileDiffState::NewFile => out.push_str("new file mode 100644\n"),
        FileDiffState::DeletedFile => out.push_str("deleted file mode 100644\n"),
        FileDiffState::Binary => {
            out.push_str("Binary files differ\n");
            return out;
        }
        FileDiffState::Modified => {}
    }
    for hunk in &diff.hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        ));
        for line in &hunk.lines {
            let prefix = match line.tag {
                LineTag::Context => ' ',
                LineTag::Add => '+',
                LineTag::Remove => '-',
            };
            out.push(prefix);
            out.push_str(&line.content.to_str_lossy());
            out.push('\n');
        }
    }
    out
}
