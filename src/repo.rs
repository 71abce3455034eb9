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

//! The thin facade binding the object store, refs store, tree walker,
//! diff engine, and merge engine into the operations a hosting service
//! actually calls. `Repository` owns the two small on-disk handles
//! (object root, refs root); every component below it borrows them for
//! the lifetime of a single call.

use std::path::Path;
use std::path::PathBuf;

use itertools::Itertools as _;
use tracing::info_span;
use tracing::instrument;

use crate::config::RepoConfig;
use crate::diff::diff_lines;
use crate::diff::is_binary;
use crate::diff::FileDiff;
use crate::diff::FileDiffState;
use crate::error::ForgeError;
use crate::error::ForgeResult;
use crate::hash::Hash;
use crate::merge::MergeEngine;
use crate::merge::MergeOutcome;
use crate::merge::MergeStrategy;
use crate::merge::Mergeability;
use crate::object::Commit;
use crate::object::Object;
use crate::object::Signature;
use crate::refs::RefStore;
use crate::store::ObjectStore;
use crate::tree::TreeWalker;

pub struct Repository {
    root: PathBuf,
    store: ObjectStore,
    refs: RefStore,
    config: RepoConfig,
}

impl Repository {
    pub fn open(path: &Path) -> ForgeResult<Self> {
        Self::open_with_config(path, RepoConfig::default())
    }

    #[instrument(skip(config), fields(path = %path.display()))]
    pub fn open_with_config(path: &Path, config: RepoConfig) -> ForgeResult<Self> {
        let store = ObjectStore::init(&path.join("objects"), config.fsync_objects)
            .map_err(ForgeError::from)?;
        let refs = RefStore::init(path).map_err(ForgeError::from)?;
        Ok(Self {
            root: path.to_path_buf(),
            store,
            refs,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[instrument(skip(self))]
    pub fn resolve(&self, name: &str) -> ForgeResult<Option<Hash>> {
        Ok(self.refs.resolve(name).map_err(ForgeError::from)?)
    }

    #[instrument(skip(self))]
    pub fn read_object(&self, hash: &Hash) -> ForgeResult<Object> {
        Ok(self.store.read(hash).map_err(ForgeError::from)?)
    }

    #[instrument(skip(self, object))]
    pub fn write_object(&self, object: &Object) -> ForgeResult<Hash> {
        Ok(self.store.write(object).map_err(ForgeError::from)?)
    }

    #[instrument(skip(self))]
    pub fn merge_pr(
        &self,
        source: &str,
        target: &str,
        strategy: MergeStrategy,
        author: &Signature,
        message: Option<&str>,
    ) -> ForgeResult<MergeOutcome> {
        let engine = MergeEngine::new(&self.store, &self.refs, &self.config);
        engine
            .merge_pr(source, target, strategy, author, message)
            .map_err(ForgeError::from)
            .map_err(|err| err.context(format!("merging {source:?} into {target:?}")))
    }

    #[instrument(skip(self))]
    pub fn check_mergeability(&self, source: &str, target: &str) -> ForgeResult<Mergeability> {
        let engine = MergeEngine::new(&self.store, &self.refs, &self.config);
        engine
            .check_mergeability(source, target)
            .map_err(ForgeError::from)
            .map_err(|err| err.context(format!("checking mergeability of {source:?} into {target:?}")))
    }

    /// Diffs the trees of two commits, file by file, in unified-diff form
    /// using `RepoConfig.diff_context` lines of context.
    #[instrument(skip(self))]
    pub fn diff_commits(&self, base: Hash, head: Hash) -> ForgeResult<Vec<FileDiff>> {
        let walker = TreeWalker::new(&self.store);
        let base_commit = self.store.read_commit(&base).map_err(ForgeError::from)?;
        let head_commit = self.store.read_commit(&head).map_err(ForgeError::from)?;
        let base_paths = walker.flatten(&base_commit.tree).map_err(ForgeError::from)?;
        let head_paths = walker.flatten(&head_commit.tree).map_err(ForgeError::from)?;

        let paths: Vec<&str> = base_paths
            .keys()
            .chain(head_paths.keys())
            .map(String::as_str)
            .sorted_unstable()
            .dedup()
            .collect();

        let mut diffs = Vec::new();
        for path in paths {
            let before = base_paths.get(path);
            let after = head_paths.get(path);
            let (state, old_bytes, new_bytes) = match (before, after) {
                (None, Some((hash, _))) => {
                    (FileDiffState::NewFile, Vec::new(), self.store.read_blob(hash).map_err(ForgeError::from)?)
                }
                (Some((hash, _)), None) => {
                    (FileDiffState::DeletedFile, self.store.read_blob(hash).map_err(ForgeError::from)?, Vec::new())
                }
                (Some((old_hash, _)), Some((new_hash, _))) => {
                    if old_hash == new_hash {
                        continue;
                    }
                    (
                        FileDiffState::Modified,
                        self.store.read_blob(old_hash).map_err(ForgeError::from)?,
                        self.store.read_blob(new_hash).map_err(ForgeError::from)?,
                    )
                }
                (None, None) => unreachable!("path came from the union of both maps"),
            };

            let state = if is_binary(&old_bytes) || is_binary(&new_bytes) {
                FileDiffState::Binary
            } else {
                state
            };
            let hunks = if matches!(state, FileDiffState::Binary) {
                Vec::new()
            } else {
                diff_lines(&old_bytes, &new_bytes, self.config.diff_context)
            };
            diffs.push(FileDiff {
                old_path: path.to_owned(),
                new_path: path.to_owned(),
                state,
                hunks,
            });
        }
        Ok(diffs)
    }

    /// Applies a single-file edit on top of `branch`'s current tip:
    /// replace (or delete, when `new_content` is `None`) the blob at
    /// `path`, rebuild the tree, synthesize a commit, and CAS-advance the
    /// branch. Used for "apply suggestion" and in-browser edits.
    #[instrument(skip(self, new_content, author))]
    pub fn edit_file(
        &self,
        branch: &str,
        path: &str,
        new_content: Option<&[u8]>,
        author: &Signature,
        message: &str,
    ) -> ForgeResult<Hash> {
        let _span = info_span!("edit_file", branch, path).entered();
        let previous_sha = self
            .refs
            .resolve(branch)
            .map_err(ForgeError::from)?
            .ok_or_else(|| ForgeError::from(crate::error::RefError::NotFound(branch.to_owned())))?;
        let previous_commit = self.store.read_commit(&previous_sha).map_err(ForgeError::from)?;

        let walker = TreeWalker::new(&self.store);
        let mut paths = walker.flatten(&previous_commit.tree).map_err(ForgeError::from)?;

        match new_content {
            Some(bytes) => {
                let hash = self
                    .store
                    .write(&Object::Blob(bytes.to_vec()))
                    .map_err(ForgeError::from)?;
                paths.insert(path.to_owned(), (hash, crate::object::Mode::File));
            }
            None => {
                paths.remove(path);
            }
        }

        let new_tree = walker.build(&paths).map_err(ForgeError::from)?;
        let commit = Commit {
            tree: new_tree,
            parents: vec![previous_sha],
            author: author.clone(),
            committer: author.clone(),
            message: message.to_owned(),
        };
        let new_sha = self
            .store
            .write(&Object::Commit(commit))
            .map_err(ForgeError::from)?;
        self.refs
            .update_branch(branch, new_sha, Some(previous_sha))
            .map_err(ForgeError::from)?;
        Ok(new_sha)
    }
}
