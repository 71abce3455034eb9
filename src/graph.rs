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

//! Commit ancestor graph walks: reachability, merge-base discovery,
//! fast-forward detection and ahead/behind distance counting. Everything
//! here walks `Commit::parents` through the [`ObjectStore`] — there is no
//! separate index, so each query is a fresh BFS. That is the right
//! trade-off for a server that handles one PR merge at a time rather than
//! answering revset queries over a whole repository's history.

use std::collections::HashSet;
use std::collections::VecDeque;

use crate::error::ObjectError;
use crate::hash::Hash;
use crate::store::ObjectStore;

/// Breadth-first iterator over `tip` and all of its ancestors, each
/// yielded once. Order is not meaningful beyond "parents are yielded no
/// earlier than their first reachable child" (BFS layer order).
pub struct Ancestors<'s> {
    store: &'s ObjectStore,
    queue: VecDeque<Hash>,
    seen: HashSet<Hash>,
}

impl<'s> Ancestors<'s> {
    pub fn new(store: &'s ObjectStore, tip: Hash) -> Self {
        let mut seen = HashSet::new();
        seen.insert(tip);
        let mut queue = VecDeque::new();
        queue.push_back(tip);
        Self { store, queue, seen }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = Result<Hash, ObjectError>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.queue.pop_front()?;
        match self.store.read_commit(&hash) {
            Ok(commit) => {
                for parent in commit.parents {
                    if self.seen.insert(parent) {
                        self.queue.push_back(parent);
                    }
                }
                Some(Ok(hash))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

pub fn ancestors(store: &ObjectStore, tip: Hash) -> Ancestors<'_> {
    Ancestors::new(store, tip)
}

fn reachable_set(store: &ObjectStore, tip: Hash) -> Result<HashSet<Hash>, ObjectError> {
    ancestors(store, tip).collect()
}

/// Is `candidate` reachable from `tip` by following parent edges
/// (inclusive — a commit is its own ancestor)?
pub fn is_ancestor(store: &ObjectStore, candidate: Hash, tip: Hash) -> Result<bool, ObjectError> {
    if candidate == tip {
        return Ok(true);
    }
    for hash in ancestors(store, tip) {
        if hash? == candidate {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Finds a merge base of `a` and `b`: a commit reachable from both that is
/// not itself an ancestor of any other common ancestor. Histories here are
/// simple enough (no octopus merges to reconcile pairwise) that the first
/// common ancestor discovered in BFS order from `a`, checked against full
/// reachability from `b`, is deterministic and is kept even when a
/// criss-cross merge would admit more than one candidate — see the
/// decision recorded for this in the project's design notes.
pub fn merge_base(store: &ObjectStore, a: Hash, b: Hash) -> Result<Option<Hash>, ObjectError> {
    let b_ancestors = reachable_set(store, b)?;
    for hash in ancestors(store, a) {
        let hash = hash?;
        if b_ancestors.contains(&hash) {
            return Ok(Some(hash));
        }
    }
    Ok(None)
}

/// `true` if `tip` can be fast-forwarded onto `target`, i.e. `tip` is an
/// ancestor of `target` (advancing the ref is a pure pointer move with no
/// merge commit needed).
pub fn is_fast_forward(store: &ObjectStore, tip: Hash, target: Hash) -> Result<bool, ObjectError> {
    is_ancestor(store, tip, target)
}

/// Counts commits reachable from `tip` but not from `base` (ahead) and
/// vice versa (behind), for the mergeability probe's "N ahead, M behind"
/// summary.
pub fn distance(store: &ObjectStore, base: Hash, tip: Hash) -> Result<(usize, usize), ObjectError> {
    let base_set = reachable_set(store, base)?;
    let tip_set = reachable_set(store, tip)?;
    let ahead = tip_set.difference(&base_set).count();
    let behind = base_set.difference(&tip_set).count();
    Ok((ahead, behind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Commit;
    use crate::object::Object;
    use crate::object::Signature;
    use crate::object::Tree;

    fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::init(&dir.path().join("objects"), true).unwrap();
        (dir, store)
    }

    fn commit(store: &ObjectStore, parents: Vec<Hash>, label: &str) -> Hash {
        let tree = store.write(&Object::Tree(Tree::default())).unwrap();
        let sig = Signature {
            name: "A".into(),
            email: "a@example.com".into(),
            timestamp_secs: 0,
            tz_offset_minutes: 0,
        };
        let commit = Commit {
            tree,
            parents,
            author: sig.clone(),
            committer: sig,
            message: label.into(),
        };
        store.write(&Object::Commit(commit)).unwrap()
    }

    #[test]
    fn ancestors_of_root_is_itself() {
        let (_dir, store) = store();
        let root = commit(&store, vec![], "root");
        let all: Vec<Hash> = ancestors(&store, root).map(|r| r.unwrap()).collect();
        assert_eq!(all, vec![root]);
    }

    #[test]
    fn linear_history_is_ancestor_chain() {
        let (_dir, store) = store();
        let a = commit(&store, vec![], "a");
        let b = commit(&store, vec![a], "b");
        let c = commit(&store, vec![b], "c");
        assert!(is_ancestor(&store, a, c).unwrap());
        assert!(is_ancestor(&store, b, c).unwrap());
        assert!(!is_ancestor(&store, c, a).unwrap());
    }

    #[test]
    fn merge_base_of_diverged_branches() {
        let (_dir, store) = store();
        let base = commit(&store, vec![], "base");
        let left = commit(&store, vec![base], "left");
        let right = commit(&store, vec![base], "right");
        assert_eq!(merge_base(&store, left, right).unwrap(), Some(base));
    }

    #[test]
    fn merge_base_of_unrelated_histories_is_none() {
        let (_dir, store) = store();
        let a = commit(&store, vec![], "a");
        let b = commit(&store, vec![], "b");
        assert_eq!(merge_base(&store, a, b).unwrap(), None);
    }

    #[test]
    fn fast_forward_detects_linear_advance() {
        let (_dir, store) = store();
        let a = commit(&store, vec![], "a");
        let b = commit(&store, vec![a], "b");
        assert!(is_fast_forward(&store, a, b).unwrap());
        assert!(!is_fast_forward(&store, b, a).unwrap());
    }

    #[test]
    fn distance_counts_ahead_and_behind() {
        let (_dir, store) = store();
        let base = commit(&store, vec![], "base");
        let left = commit(&store, vec![base], "left1");
        let left = commit(&store, vec![left], "left2");
        let right = commit(&store, vec![base], "right1");
        let (ahead, behind) = distance(&store, right, left).unwrap();
        assert_eq!(ahead, 2);
        assert_eq!(behind, 1);
    }

    #[test]
    fn merge_commit_sees_both_parent_histories() {
        let (_dir, store) = store();
        let base = commit(&store, vec![], "base");
        let left = commit(&store, vec![base], "left");
        let right = commit(&store, vec![base], "right");
        let merge = commit(&store, vec![left, right], "merge");
        assert!(is_ancestor(&store, left, merge).unwrap());
        assert!(is_ancestor(&store, right, merge).unwrap());
    }
}
