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

//! The server-side pull-request merge machine: ancestor-aware fast-forward
//! detection, per-path tree reconciliation, three-way line-level file
//! merge with conflict markers, and merge/squash commit synthesis. No
//! working directory is ever touched — every step reads and writes
//! through the object store and advances the target ref with a single
//! compare-and-set.
//!
//! `MergeOutcome` is deliberately not a `Result` variant: a conflict is
//! structured, expected data the caller renders to the PR author, not a
//! failure. Only genuine errors (missing branch, missing ancestor, I/O,
//! lost CAS race) go through `MergeError`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::ConflictStyle;
use crate::config::RepoConfig;
use crate::diff::is_binary;
use crate::diff::split_lines;
use crate::diff::myers_diff;
use crate::diff::EditOp;
use crate::error::MergeError;
use crate::graph;
use crate::hash::Hash;
use crate::object::Commit;
use crate::object::Mode;
use crate::object::Object;
use crate::object::Signature;
use crate::refs::RefStore;
use crate::store::ObjectStore;
use crate::tree::PathMap;
use crate::tree::TreeWalker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Merge,
    Squash,
    FastForwardOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The target ref now resolves to this hash — either because a new
    /// merge/squash commit was created and CAS-advanced onto it, or
    /// because the merge was a fast-forward or a no-op.
    Ok(Hash),
    /// No ref was touched. `paths` lists every file that could not be
    /// reconciled automatically.
    Conflict(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mergeability {
    pub can_merge: bool,
    pub conflicts: Vec<String>,
    pub ahead_by: usize,
    pub behind_by: usize,
}

pub struct MergeEngine<'s> {
    store: &'s ObjectStore,
    refs: &'s RefStore,
    config: &'s RepoConfig,
}

impl<'s> MergeEngine<'s> {
    pub fn new(store: &'s ObjectStore, refs: &'s RefStore, config: &'s RepoConfig) -> Self {
        Self { store, refs, config }
    }

    /// Merges `source` into `target`, following the procedure in order:
    /// no-op if source is already merged, fast-forward if target has not
    /// diverged, otherwise a three-way reconciliation followed by commit
    /// synthesis and a CAS ref advance.
    pub fn merge_pr(
        &self,
        source: &str,
        target: &str,
        strategy: MergeStrategy,
        author: &Signature,
        message: Option<&str>,
    ) -> Result<MergeOutcome, MergeError> {
        let source_sha = self
            .refs
            .resolve(source)?
            .ok_or_else(|| MergeError::BranchNotFound(source.to_owned()))?;
        let target_sha = self
            .refs
            .resolve(target)?
            .ok_or_else(|| MergeError::BranchNotFound(target.to_owned()))?;

        if graph::is_ancestor(self.store, source_sha, target_sha)? {
            debug!(%source, %target, "source already merged, no-op");
            return Ok(MergeOutcome::Ok(target_sha));
        }

        let allows_fast_forward = matches!(strategy, MergeStrategy::Merge | MergeStrategy::FastForwardOnly);
        if allows_fast_forward && graph::is_ancestor(self.store, target_sha, source_sha)? {
            self.refs.update_branch(target, source_sha, Some(target_sha))?;
            info!(%source, %target, merge_sha = %source_sha, "fast-forwarded");
            return Ok(MergeOutcome::Ok(source_sha));
        }

        if strategy == MergeStrategy::FastForwardOnly {
            return Err(MergeError::NotFastForwardable {
                branch_source: source.to_owned(),
                target: target.to_owned(),
            });
        }

        let base_sha = graph::merge_base(self.store, source_sha, target_sha)?.ok_or_else(|| {
            MergeError::NoCommonAncestor {
                branch_source: source.to_owned(),
                target: target.to_owned(),
            }
        })?;

        let (merged_tree, conflicts) =
            self.reconcile(base_sha, source_sha, target_sha, source, target)?;

        if !conflicts.is_empty() {
            warn!(%source, %target, conflict_count = conflicts.len(), "merge conflict");
            return Ok(MergeOutcome::Conflict(conflicts));
        }

        let parents = match strategy {
            MergeStrategy::Merge => vec![target_sha, source_sha],
            MergeStrategy::Squash => vec![target_sha],
            MergeStrategy::FastForwardOnly => unreachable!("handled above"),
        };
        let default_message = match strategy {
            MergeStrategy::Merge => format!("Merge branch '{source}' into {target}"),
            MergeStrategy::Squash => format!("Squash merge branch '{source}' into {target}"),
            MergeStrategy::FastForwardOnly => unreachable!("handled above"),
        };
        let commit = Commit {
            tree: merged_tree,
            parents,
            author: author.clone(),
            committer: author.clone(),
            message: message.map_or(default_message, str::to_owned),
        };
        let merge_sha = self.store.write(&Object::Commit(commit))?;

        self.refs.update_branch(target, merge_sha, Some(target_sha))?;
        info!(%source, %target, merge_sha = %merge_sha, "merged");
        Ok(MergeOutcome::Ok(merge_sha))
    }

    /// Runs the same reconciliation `merge_pr` would, without writing
    /// anything, for the PR UI's mergeability indicator.
    pub fn check_mergeability(&self, source: &str, target: &str) -> Result<Mergeability, MergeError> {
        let source_sha = self
            .refs
            .resolve(source)?
            .ok_or_else(|| MergeError::BranchNotFound(source.to_owned()))?;
        let target_sha = self
            .refs
            .resolve(target)?
            .ok_or_else(|| MergeError::BranchNotFound(target.to_owned()))?;

        let (ahead_by, behind_by) = graph::distance(self.store, target_sha, source_sha)?;

        if graph::is_ancestor(self.store, source_sha, target_sha)?
            || graph::is_ancestor(self.store, target_sha, source_sha)?
        {
            return Ok(Mergeability {
                can_merge: true,
                conflicts: Vec::new(),
                ahead_by,
                behind_by,
            });
        }

        let base_sha = graph::merge_base(self.store, source_sha, target_sha)?.ok_or_else(|| {
            MergeError::NoCommonAncestor {
                branch_source: source.to_owned(),
                target: target.to_owned(),
            }
        })?;
        let (_tree, conflicts) = self.reconcile(base_sha, source_sha, target_sha, source, target)?;

        Ok(Mergeability {
            can_merge: conflicts.is_empty(),
            conflicts,
            ahead_by,
            behind_by,
        })
    }

    /// Flattens the three trees, reconciles every path, and builds the
    /// merged tree. Any blob invented while resolving a content conflict
    /// is written through the store before the tree is built, even when
    /// the overall result ends up reported as a conflict.
    fn reconcile(
        &self,
        base_sha: Hash,
        source_sha: Hash,
        target_sha: Hash,
        source_label: &str,
        target_label: &str,
    ) -> Result<(Hash, Vec<String>), MergeError> {
        let walker = TreeWalker::new(self.store);
        let base_commit = self.store.read_commit(&base_sha)?;
        let source_commit = self.store.read_commit(&source_sha)?;
        let target_commit = self.store.read_commit(&target_sha)?;

        let base_paths = walker.flatten(&base_commit.tree)?;
        let source_paths = walker.flatten(&source_commit.tree)?;
        let target_paths = walker.flatten(&target_commit.tree)?;

        let mut all_paths: BTreeSet<&str> = BTreeSet::new();
        all_paths.extend(base_paths.keys().map(String::as_str));
        all_paths.extend(source_paths.keys().map(String::as_str));
        all_paths.extend(target_paths.keys().map(String::as_str));

        let mut merged: PathMap = BTreeMap::new();
        let mut conflicts = Vec::new();

        for path in all_paths {
            let b = base_paths.get(path).copied();
            let s = source_paths.get(path).copied();
            let t = target_paths.get(path).copied();

            if s == t {
                if let Some(v) = s {
                    merged.insert(path.to_owned(), v);
                }
                continue;
            }
            if s == b {
                if let Some(v) = t {
                    merged.insert(path.to_owned(), v);
                }
                continue;
            }
            if t == b {
                if let Some(v) = s {
                    merged.insert(path.to_owned(), v);
                }
                continue;
            }

            match (b, s, t) {
                (Some(_), Some(source_value), None) => {
                    // Source modified, target deleted.
                    conflicts.push(path.to_owned());
                    merged.insert(path.to_owned(), source_value);
                }
                (Some(_), None, Some(target_value)) => {
                    // Target modified, source deleted.
                    conflicts.push(path.to_owned());
                    merged.insert(path.to_owned(), target_value);
                }
                (_, Some((source_hash, source_mode)), Some((target_hash, target_mode))) => {
                    if source_hash == target_hash && source_mode != target_mode {
                        conflicts.push(path.to_owned());
                        merged.insert(path.to_owned(), (target_hash, target_mode));
                        continue;
                    }
                    let base_content = match b {
                        Some((base_hash, _)) => self.store.read_blob(&base_hash)?,
                        None => Vec::new(),
                    };
                    let source_content = self.store.read_blob(&source_hash)?;
                    let target_content = self.store.read_blob(&target_hash)?;
                    let result = merge_file(
                        &base_content,
                        &source_content,
                        &target_content,
                        source_label,
                        target_label,
                        self.config.conflict_style,
                    );
                    let mode = if source_mode == target_mode { source_mode } else { target_mode };
                    let blob_hash = self.store.write(&Object::Blob(result.content))?;
                    merged.insert(path.to_owned(), (blob_hash, mode));
                    if result.conflicted {
                        conflicts.push(path.to_owned());
                    }
                }
                (None, None, None) => unreachable!("path came from a union of non-empty maps"),
                _ => unreachable!("remaining combinations are covered by the equality checks above"),
            }
        }

        let tree_hash = walker.build(&merged)?;
        Ok((tree_hash, conflicts))
    }
}

struct FileMergeResult {
    content: Vec<u8>,
    conflicted: bool,
}

/// A maximal run of non-matching edits from one side, expressed as the
/// half-open `[start, end)` range of base lines it replaces (`start ==
/// end` for a pure insertion) together with its replacement content.
struct EditGroup<'a> {
    start: usize,
    end: usize,
    lines: Vec<&'a [u8]>,
}

fn edit_groups<'a>(base_lines: &[&'a [u8]], other_lines: &[&'a [u8]]) -> Vec<EditGroup<'a>> {
    let ops = myers_diff(base_lines, other_lines);
    let mut groups = Vec::new();
    let mut open: Option<EditGroup<'a>> = None;
    let mut old_pos = 0usize;

    for op in ops {
        match op {
            EditOp::Match { .. } => {
                if let Some(group) = open.take() {
                    groups.push(EditGroup { end: old_pos, ..group });
                }
                old_pos += 1;
            }
            EditOp::Delete { .. } => {
                open.get_or_insert_with(|| EditGroup { start: old_pos, end: old_pos, lines: Vec::new() });
                old_pos += 1;
            }
            EditOp::Insert { new_index } => {
                let group = open.get_or_insert_with(|| EditGroup {
                    start: old_pos,
                    end: old_pos,
                    lines: Vec::new(),
                });
                group.lines.push(other_lines[new_index]);
            }
        }
    }
    if let Some(group) = open.take() {
        groups.push(EditGroup { end: old_pos, ..group });
    }
    groups
}

fn ranges_overlap(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    let a_zero = a_start == a_end;
    let b_zero = b_start == b_end;
    if a_zero && b_zero {
        a_start == b_start
    } else {
        a_start < b_end && b_start < a_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Target,
}

enum ClusterKind<'a> {
    OneSided(Vec<&'a [u8]>),
    Conflict {
        source_lines: Vec<&'a [u8]>,
        target_lines: Vec<&'a [u8]>,
    },
}

struct Cluster<'a> {
    start: usize,
    end: usize,
    kind: ClusterKind<'a>,
}

/// Groups the two independent edit scripts into clusters: a maximal run
/// of groups (from either side) whose base ranges transitively overlap.
/// A cluster touched by only one side applies cleanly; one touched by
/// both applies cleanly only if the two sides agree byte-for-byte, and
/// is a conflict otherwise.
fn cluster_groups<'a>(
    source_groups: Vec<EditGroup<'a>>,
    target_groups: Vec<EditGroup<'a>>,
) -> Vec<Cluster<'a>> {
    let mut tagged: Vec<(Side, EditGroup<'a>)> = source_groups
        .into_iter()
        .map(|g| (Side::Source, g))
        .chain(target_groups.into_iter().map(|g| (Side::Target, g)))
        .collect();
    tagged.sort_by_key(|(_, g)| g.start);

    let mut clusters: Vec<Cluster<'a>> = Vec::new();
    let mut members: Vec<(Side, EditGroup<'a>)> = Vec::new();
    let mut range: Option<(usize, usize)> = None;

    for (side, group) in tagged {
        let overlaps = range.is_some_and(|(s, e)| ranges_overlap(s, e, group.start, group.end));
        if overlaps {
            let (s, e) = range.unwrap();
            range = Some((s.min(group.start), e.max(group.end)));
        } else {
            if let Some((start, end)) = range.take() {
                clusters.push(finish_cluster(start, end, std::mem::take(&mut members)));
            }
            range = Some((group.start, group.end));
        }
        members.push((side, group));
    }
    if let Some((start, end)) = range {
        clusters.push(finish_cluster(start, end, members));
    }
    clusters
}

fn finish_cluster<'a>(start: usize, end: usize, members: Vec<(Side, EditGroup<'a>)>) -> Cluster<'a> {
    let mut source_lines = Vec::new();
    let mut target_lines = Vec::new();
    let mut has_source = false;
    let mut has_target = false;
    for (side, group) in members {
        match side {
            Side::Source => {
                has_source = true;
                source_lines.extend(group.lines);
            }
            Side::Target => {
                has_target = true;
                target_lines.extend(group.lines);
            }
        }
    }
    let kind = if has_source && has_target {
        if source_lines == target_lines {
            ClusterKind::OneSided(source_lines)
        } else {
            ClusterKind::Conflict { source_lines, target_lines }
        }
    } else if has_source {
        ClusterKind::OneSided(source_lines)
    } else {
        ClusterKind::OneSided(target_lines)
    };
    Cluster { start, end, kind }
}

fn conflict_markers(style: ConflictStyle) -> (&'static str, &'static str, &'static str) {
    match style {
        ConflictStyle::Diff3Labels => ("<<<<<<<", "=======", ">>>>>>>"),
    }
}

/// Three-way merges a single file's content. Binary content on any side
/// is an immediate conflict, per the source's behavior. Otherwise each
/// side's edit script against `base` is computed independently and
/// overlaid; overlapping edits are wrapped in conflict markers labeled
/// with the branch names.
fn merge_file(
    base: &[u8],
    source: &[u8],
    target: &[u8],
    source_label: &str,
    target_label: &str,
    style: ConflictStyle,
) -> FileMergeResult {
    if is_binary(base) || is_binary(source) || is_binary(target) {
        return FileMergeResult {
            content: target.to_vec(),
            conflicted: true,
        };
    }

    let base_lines = split_lines(base);
    let source_lines = split_lines(source);
    let target_lines = split_lines(target);

    let source_groups = edit_groups(&base_lines, &source_lines);
    let target_groups = edit_groups(&base_lines, &target_lines);
    let clusters = cluster_groups(source_groups, target_groups);

    let (start_marker, sep_marker, end_marker) = conflict_markers(style);
    let mut out: Vec<Vec<u8>> = Vec::new();
    let mut conflicted = false;
    let mut cursor = 0usize;

    for cluster in clusters {
        for line in &base_lines[cursor..cluster.start] {
            out.push((*line).to_vec());
        }
        match cluster.kind {
            ClusterKind::OneSided(lines) => out.extend(lines.into_iter().map(<[u8]>::to_vec)),
            ClusterKind::Conflict { source_lines, target_lines } => {
                conflicted = true;
                out.push(format!("{start_marker} {target_label}").into_bytes());
                out.extend(target_lines.into_iter().map(<[u8]>::to_vec));
                out.push(sep_marker.as_bytes().to_vec());
                out.extend(source_lines.into_iter().map(<[u8]>::to_vec));
                out.push(format!("{end_marker} {source_label}").into_bytes());
            }
        }
        cursor = cluster.end;
    }
    for line in &base_lines[cursor..] {
        out.push((*line).to_vec());
    }

    let mut content = Vec::with_capacity(base.len().max(source.len()).max(target.len()));
    for line in &out {
        content.extend_from_slice(line);
        content.push(b'\n');
    }
    FileMergeResult { content, conflicted }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::object::Tree;
    use crate::object::TreeEntry;

    fn env() -> (tempfile::TempDir, ObjectStore, RefStore, RepoConfig) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::init(&dir.path().join("objects"), true).unwrap();
        let refs = RefStore::init(dir.path()).unwrap();
        (dir, store, refs, RepoConfig::default())
    }

    fn author() -> Signature {
        Signature {
            name: "Tester".into(),
            email: "t@example.com".into(),
            timestamp_secs: 0,
            tz_offset_minutes: 0,
        }
    }

    fn blob(store: &ObjectStore, content: &str) -> Hash {
        store.write(&Object::Blob(content.as_bytes().to_vec())).unwrap()
    }

    fn single_file_tree(store: &ObjectStore, name: &str, content: &str) -> Hash {
        let hash = blob(store, content);
        let tree = Tree::from_entries(vec![TreeEntry { mode: Mode::File, name: name.into(), hash }]).unwrap();
        store.write(&Object::Tree(tree)).unwrap()
    }

    fn commit(store: &ObjectStore, tree: Hash, parents: Vec<Hash>) -> Hash {
        let sig = author();
        store
            .write(&Object::Commit(Commit {
                tree,
                parents,
                author: sig.clone(),
                committer: sig,
                message: "msg\n".into(),
            }))
            .unwrap()
    }

    #[test]
    fn merge_file_takes_disjoint_edits_from_both_sides() {
        let base = b"a\nb\nc\n";
        let source = b"a\nB\nc\n";
        let target = b"a\nb\nC\n";
        let result = merge_file(base, source, target, "source", "target", ConflictStyle::Diff3Labels);
        assert!(!result.conflicted);
        assert_eq!(result.content, b"a\nB\nC\n");
    }

    #[test]
    fn merge_file_flags_overlapping_edits() {
        let base = b"a\n";
        let source = b"source-version\n";
        let target = b"target-version\n";
        let result = merge_file(base, source, target, "source", "target", ConflictStyle::Diff3Labels);
        assert!(result.conflicted);
        let text = String::from_utf8(result.content).unwrap();
        assert!(text.contains("<<<<<<< target"));
        assert!(text.contains("target-version"));
        assert!(text.contains("======="));
        assert!(text.contains("source-version"));
        assert!(text.contains(">>>>>>> source"));
    }

    #[test]
    fn merge_file_treats_identical_edits_as_agreement() {
        let base = b"a\n";
        let source = b"same\n";
        let target = b"same\n";
        let result = merge_file(base, source, target, "source", "target", ConflictStyle::Diff3Labels);
        assert!(!result.conflicted);
        assert_eq!(result.content, b"same\n");
    }

    #[test]
    fn merge_file_flags_binary_content() {
        let result = merge_file(b"a", b"\0binary", b"a", "source", "target", ConflictStyle::Diff3Labels);
        assert!(result.conflicted);
    }

    #[test]
    fn fast_forward_merge_moves_ref_without_new_commit() {
        let (_dir, store, refs, config) = env();
        let t1 = single_file_tree(&store, "a.txt", "hi\n");
        let c1 = commit(&store, t1, vec![]);
        refs.create_branch("main", c1).unwrap();
        let t2 = single_file_tree(&store, "a.txt", "hi\n");
        let c2 = commit(&store, t2, vec![c1]);
        refs.create_branch("feat", c2).unwrap();

        let engine = MergeEngine::new(&store, &refs, &config);
        let outcome = engine
            .merge_pr("feat", "main", MergeStrategy::Merge, &author(), None)
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Ok(c2));
        assert_eq!(refs.resolve("main").unwrap(), Some(c2));
    }

    #[test]
    fn non_fast_forward_merge_creates_merge_commit_with_both_parents() {
        let (_dir, store, refs, config) = env();
        let base_tree = single_file_tree(&store, "base.txt", "base\n");
        let base = commit(&store, base_tree, vec![]);
        refs.create_branch("main", base).unwrap();
        refs.create_branch("feat", base).unwrap();

        let main_tree = Tree::from_entries(vec![
            TreeEntry { mode: Mode::File, name: "base.txt".into(), hash: blob(&store, "base\n") },
            TreeEntry { mode: Mode::File, name: "b.txt".into(), hash: blob(&store, "B") },
        ])
        .unwrap();
        let main_tree_hash = store.write(&Object::Tree(main_tree)).unwrap();
        let main_commit = commit(&store, main_tree_hash, vec![base]);
        refs.update_branch("main", main_commit, Some(base)).unwrap();

        let feat_tree = Tree::from_entries(vec![
            TreeEntry { mode: Mode::File, name: "base.txt".into(), hash: blob(&store, "base\n") },
            TreeEntry { mode: Mode::File, name: "c.txt".into(), hash: blob(&store, "C") },
        ])
        .unwrap();
        let feat_tree_hash = store.write(&Object::Tree(feat_tree)).unwrap();
        let feat_commit = commit(&store, feat_tree_hash, vec![base]);
        refs.update_branch("feat", feat_commit, Some(base)).unwrap();

        let engine = MergeEngine::new(&store, &refs, &config);
        let outcome = engine
            .merge_pr("feat", "main", MergeStrategy::Merge, &author(), None)
            .unwrap();
        let MergeOutcome::Ok(merge_sha) = outcome else { panic!("expected Ok") };
        let merged_commit = store.read_commit(&merge_sha).unwrap();
        assert_eq!(merged_commit.parents, vec![main_commit, feat_commit]);

        let walker = TreeWalker::new(&store);
        let paths = walker.flatten(&merged_commit.tree).unwrap();
        assert!(paths.contains_key("b.txt"));
        assert!(paths.contains_key("c.txt"));
    }

    #[test]
    fn conflicting_merge_reports_paths_and_leaves_ref_untouched() {
        let (_dir, store, refs, config) = env();
        let base_tree = single_file_tree(&store, "README.md", "a\n");
        let base = commit(&store, base_tree, vec![]);
        refs.create_branch("main", base).unwrap();
        refs.create_branch("feat", base).unwrap();

        let main_tree = single_file_tree(&store, "README.md", "A\n");
        let main_commit = commit(&store, main_tree, vec![base]);
        refs.update_branch("main", main_commit, Some(base)).unwrap();

        let feat_tree = single_file_tree(&store, "README.md", "B\n");
        let feat_commit = commit(&store, feat_tree, vec![base]);
        refs.update_branch("feat", feat_commit, Some(base)).unwrap();

        let engine = MergeEngine::new(&store, &refs, &config);
        let outcome = engine
            .merge_pr("feat", "main", MergeStrategy::Merge, &author(), None)
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Conflict(vec!["README.md".to_owned()]));
        assert_eq!(refs.resolve("main").unwrap(), Some(main_commit));
    }

    #[test]
    fn squash_merge_has_single_parent() {
        let (_dir, store, refs, config) = env();
        let base_tree = single_file_tree(&store, "a.txt", "a\n");
        let base = commit(&store, base_tree, vec![]);
        refs.create_branch("main", base).unwrap();
        refs.create_branch("feat", base).unwrap();

        let feat_tree = single_file_tree(&store, "b.txt", "b\n");
        let feat_commit = commit(&store, feat_tree, vec![base]);
        refs.update_branch("feat", feat_commit, Some(base)).unwrap();

        let engine = MergeEngine::new(&store, &refs, &config);
        let outcome = engine
            .merge_pr("feat", "main", MergeStrategy::Squash, &author(), None)
            .unwrap();
        let MergeOutcome::Ok(squash_sha) = outcome else { panic!("expected Ok") };
        let squash_commit = store.read_commit(&squash_sha).unwrap();
        assert_eq!(squash_commit.parents, vec![base]);
    }

    #[test]
    fn check_mergeability_reports_conflicts_without_writing() {
        let (_dir, store, refs, config) = env();
        let base_tree = single_file_tree(&store, "README.md", "a\n");
        let base = commit(&store, base_tree, vec![]);
        refs.create_branch("main", base).unwrap();
        refs.create_branch("feat", base).unwrap();

        let main_tree = single_file_tree(&store, "README.md", "A\n");
        let main_commit = commit(&store, main_tree, vec![base]);
        refs.update_branch("main", main_commit, Some(base)).unwrap();

        let feat_tree = single_file_tree(&store, "README.md", "B\n");
        let feat_commit = commit(&store, feat_tree, vec![base]);
        refs.update_branch("feat", feat_commit, Some(base)).unwrap();

        let engine = MergeEngine::new(&store, &refs, &config);
        let probe = engine.check_mergeability("feat", "main").unwrap();
        assert!(!probe.can_merge);
        assert_eq!(probe.conflicts, vec!["README.md".to_owned()]);
        assert_eq!(probe.ahead_by, 1);
        assert_eq!(probe.behind_by, 1);
        assert_eq!(refs.resolve("main").unwrap(), Some(main_commit));
    }

    #[test]
    fn merge_pr_with_unknown_branch_fails() {
        let (_dir, store, refs, config) = env();
        let engine = MergeEngine::new(&store, &refs, &config);
        let result = engine.merge_pr("ghost", "main", MergeStrategy::Merge, &author(), None);
        assert_matches!(result, Err(MergeError::BranchNotFound(_)));
    }
}
