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

//! Flatten a tree hash to a `path → (hash, mode)` map and rebuild a tree
//! hash from such a map, without ever touching a working directory.
//!
//! `build` groups paths by directory and writes bottom-up — the same shape
//! as the teacher's `TreeBuilder::write_tree`, which also collects
//! overridden entries into per-directory maps and pops them off in reverse
//! lexicographical order so every child is written before its parent.

use std::collections::BTreeMap;

use crate::error::TreeError;
use crate::hash::Hash;
use crate::object::Mode;
use crate::object::Object;
use crate::object::Tree;
use crate::object::TreeEntry;
use crate::store::ObjectStore;

/// `path → (blob hash, mode)`. Ordered so iteration is deterministic and
/// directory-prefix checks are cheap.
pub type PathMap = BTreeMap<String, (Hash, Mode)>;

pub struct TreeWalker<'s> {
    store: &'s ObjectStore,
}

impl<'s> TreeWalker<'s> {
    pub fn new(store: &'s ObjectStore) -> Self {
        Self { store }
    }

    /// Recursively walks `tree_hash`, emitting only non-directory entries.
    /// Symlinks are kept as entries whose blob holds the link target.
    pub fn flatten(&self, tree_hash: &Hash) -> Result<PathMap, TreeError> {
        let mut out = PathMap::new();
        self.flatten_into(tree_hash, "", &mut out)?;
        Ok(out)
    }

    fn flatten_into(
        &self,
        tree_hash: &Hash,
        prefix: &str,
        out: &mut PathMap,
    ) -> Result<(), TreeError> {
        let tree = self.store.read_tree(tree_hash)?;
        for entry in tree.entries() {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };
            if entry.mode.is_directory() {
                self.flatten_into(&entry.hash, &path, out)?;
            } else {
                out.insert(path, (entry.hash, entry.mode));
            }
        }
        Ok(())
    }

    /// Rebuilds a tree hash from a path map, writing every intermediate
    /// directory tree through the object store. `build(flatten(T)) == T`
    /// for every well-formed `T`.
    pub fn build(&self, paths: &PathMap) -> Result<Hash, TreeError> {
        let mut by_dir: BTreeMap<String, BTreeMap<String, (Hash, Mode)>> = BTreeMap::new();
        by_dir.entry(String::new()).or_default();
        for (path, value) in paths {
            let (dir, name) = split_path(path);
            ensure_ancestors(&mut by_dir, &dir);
            by_dir
                .entry(dir)
                .or_default()
                .insert(name.to_owned(), *value);
        }

        // Write deepest directories first: reverse lexicographical order on
        // the directory path guarantees every child directory is written
        // before the parent that references it.
        let mut written: BTreeMap<String, Hash> = BTreeMap::new();
        let dirs: Vec<String> = by_dir.keys().cloned().collect();
        for dir in dirs.into_iter().rev() {
            let mut entries: Vec<TreeEntry> = by_dir[&dir]
                .iter()
                .map(|(name, (hash, mode))| TreeEntry {
                    mode: *mode,
                    name: name.clone(),
                    hash: *hash,
                })
                .collect();
            for (child_dir, child_hash) in &written {
                if let Some((parent, name)) = split_path_owned(child_dir) {
                    if parent == dir {
                        entries.push(TreeEntry {
                            mode: Mode::Directory,
                            name,
                            hash: *child_hash,
                        });
                    }
                }
            }
            if entries.is_empty() && !dir.is_empty() {
                return Err(TreeError::EmptyDirectory(dir));
            }
            let tree = Tree::from_entries(entries).map_err(TreeError::Object)?;
            let hash = self
                .store
                .write(&Object::Tree(tree))
                .map_err(TreeError::Object)?;
            written.insert(dir, hash);
        }

        Ok(*written
            .get("")
            .expect("root directory is always present in by_dir"))
    }
}

fn split_path(path: &str) -> (String, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir.to_owned(), name),
        None => (String::new(), path),
    }
}

fn split_path_owned(path: &str) -> Option<(String, String)> {
    if path.is_empty() {
        return None;
    }
    let (dir, name) = split_path(path);
    Some((dir, name.to_owned()))
}

/// Registers every ancestor directory of `dir` (including `dir` itself) in
/// `by_dir` so empty intermediate directories still get a node to attach
/// their one child entry to.
fn ensure_ancestors(by_dir: &mut BTreeMap<String, BTreeMap<String, (Hash, Mode)>>, dir: &str) {
    let mut current = dir;
    loop {
        if by_dir.contains_key(current) {
            return;
        }
        by_dir.entry(current.to_owned()).or_default();
        match current.rsplit_once('/') {
            Some((parent, _)) => current = parent,
            None => {
                if !current.is_empty() {
                    by_dir.entry(String::new()).or_default();
                }
                return;
            }
        }
    }
}
