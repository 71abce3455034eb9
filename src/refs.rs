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

//! The refs namespace: one file per ref, atomic compare-and-set updates.
//!
//! Refs are the only mutable shared state in the engine (objects are
//! create-once). Every write goes through [`RefStore::cas_write`], which
//! write-temp-and-renames into place; linearizability across concurrent
//! mergers comes entirely from the `expected` parameter, never from an
//! in-process lock — see the module-level concurrency notes in
//! [`crate::merge`].

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::error::RefError;
use crate::hash::Hash;

const MAX_SYMBOLIC_DEPTH: usize = 8;

fn validate_name(name: &str) -> Result<(), RefError> {
    let valid = !name.is_empty()
        && !name.starts_with('/')
        && !name.ends_with('/')
        && !name.contains("..")
        && !name.contains("@{")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._/-".contains(c));
    if valid {
        Ok(())
    } else {
        Err(RefError::InvalidName(name.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RefContent {
    Hash(Hash),
    Symbolic(String),
}

impl RefContent {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim_end_matches(['\n', '\r']);
        if let Some(target) = text.strip_prefix("ref: ") {
            Some(Self::Symbolic(target.to_owned()))
        } else {
            text.parse::<Hash>().ok().map(Self::Hash)
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Hash(hash) => format!("{}\n", hash.hex()),
            Self::Symbolic(target) => format!("ref: {target}\n"),
        }
    }
}

#[derive(Debug)]
pub struct RefStore {
    root: PathBuf,
}

impl RefStore {
    /// `root` is the repository root (the directory containing `HEAD` and
    /// `refs/`).
    pub fn init(root: &Path) -> Result<Self, RefError> {
        let store = Self {
            root: root.to_path_buf(),
        };
        for dir in [store.heads_dir(), store.tags_dir()] {
            fs::create_dir_all(&dir).map_err(|source| RefError::Io { path: dir, source })?;
        }
        Ok(store)
    }

    fn heads_dir(&self) -> PathBuf {
        self.root.join("refs").join("heads")
    }

    fn tags_dir(&self) -> PathBuf {
        self.root.join("refs").join("tags")
    }

    fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    /// Maps a ref-ish name to the file that backs it. Accepts `HEAD`, a full
    /// `refs/...` path, or a bare name (tried as a branch, then a tag).
    fn path_for(&self, name: &str) -> Result<PathBuf, RefError> {
        if name == "HEAD" {
            return Ok(self.head_path());
        }
        if let Some(branch) = name.strip_prefix("refs/heads/") {
            validate_name(branch)?;
            return Ok(self.heads_dir().join(branch));
        }
        if let Some(tag) = name.strip_prefix("refs/tags/") {
            validate_name(tag)?;
            return Ok(self.tags_dir().join(tag));
        }
        validate_name(name)?;
        let branch_path = self.heads_dir().join(name);
        if branch_path.is_file() {
            return Ok(branch_path);
        }
        Ok(self.tags_dir().join(name))
    }

    fn read_content(&self, path: &Path) -> Result<Option<RefContent>, RefError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(RefContent::parse(&text).ok_or_else(|| {
                RefError::BadRef(path.display().to_string())
            })?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RefError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Resolves `name` to the commit (or tag-object) hash it ultimately
    /// points at, following at most [`MAX_SYMBOLIC_DEPTH`] `ref: ...`
    /// indirections. Returns `None` if the ref does not exist.
    pub fn resolve(&self, name: &str) -> Result<Option<Hash>, RefError> {
        let mut current = name.to_owned();
        for _ in 0..MAX_SYMBOLIC_DEPTH {
            let path = self.path_for(&current)?;
            match self.read_content(&path)? {
                None => return Ok(None),
                Some(RefContent::Hash(hash)) => return Ok(Some(hash)),
                Some(RefContent::Symbolic(target)) => current = target,
            }
        }
        Err(RefError::CycleInSymbolicRef(name.to_owned()))
    }

    pub fn list_branches(&self) -> Result<Vec<String>, RefError> {
        list_names(&self.heads_dir())
    }

    pub fn list_tags(&self) -> Result<Vec<String>, RefError> {
        list_names(&self.tags_dir())
    }

    /// Atomically sets `refs/heads/<name>` to `new_hash`. `expected == None`
    /// means "create only"; `Some(hash)` means the current value must equal
    /// `hash` or the update is rejected with
    /// [`RefError::ConcurrentlyModified`].
    pub fn update_branch(
        &self,
        name: &str,
        new_hash: Hash,
        expected: Option<Hash>,
    ) -> Result<(), RefError> {
        validate_name(name)?;
        let path = self.heads_dir().join(name);
        self.cas_write(&path, name, Some(new_hash), expected)
    }

    pub fn create_branch(&self, name: &str, start_hash: Hash) -> Result<(), RefError> {
        self.update_branch(name, start_hash, None)
    }

    pub fn delete_branch(&self, name: &str) -> Result<(), RefError> {
        validate_name(name)?;
        let path = self.heads_dir().join(name);
        fs::remove_file(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                RefError::NotFound(name.to_owned())
            } else {
                RefError::Io { path: path.clone(), source }
            }
        })
    }

    /// Shared compare-and-set primitive backing [`Self::update_branch`].
    /// `new_hash = None` is reserved for future ref-deletion-by-CAS callers;
    /// today only writes go through here.
    fn cas_write(
        &self,
        path: &Path,
        display_name: &str,
        new_hash: Option<Hash>,
        expected: Option<Hash>,
    ) -> Result<(), RefError> {
        let dir = path.parent().expect("ref path has a parent");
        fs::create_dir_all(dir).map_err(|source| RefError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        // Hold a per-ref lockfile for the compare-then-rename so two racing
        // CAS attempts can't both observe the same `current` value. This is
        // the lockfile option from the concurrency design notes rather than
        // O_CREAT|O_EXCL, since the final write is a rename, not a create.
        let lock_path = dir.join(format!(
            "{}.lock",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("ref")
        ));
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&lock_path)
            .map_err(|source| RefError::Io {
                path: lock_path.clone(),
                source,
            })?;
        fs2::FileExt::lock_exclusive(&lock_file).map_err(|source| RefError::Io {
            path: lock_path.clone(),
            source,
        })?;
        let result = self.cas_write_locked(path, dir, display_name, new_hash, expected);
        let _ = fs2::FileExt::unlock(&lock_file);
        let _ = fs::remove_file(&lock_path);
        result
    }

    fn cas_write_locked(
        &self,
        path: &Path,
        dir: &Path,
        display_name: &str,
        new_hash: Option<Hash>,
        expected: Option<Hash>,
    ) -> Result<(), RefError> {
        let current = self.read_content(path)?;
        let current_hash = match &current {
            Some(RefContent::Hash(hash)) => Some(*hash),
            Some(RefContent::Symbolic(_)) | None => None,
        };
        match expected {
            None if current.is_some() => {
                return Err(RefError::AlreadyExists(display_name.to_owned()));
            }
            None => {}
            Some(wanted) if current_hash != Some(wanted) => {
                return Err(RefError::ConcurrentlyModified {
                    name: display_name.to_owned(),
                    expected: Some(wanted.hex()),
                    found: current_hash.map(|h| h.hex()),
                });
            }
            Some(_) => {}
        }

        let new_hash = new_hash.expect("ref deletion by CAS is not yet a caller");
        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|source| RefError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        use std::io::Write as _;
        temp.write_all(RefContent::Hash(new_hash).render().as_bytes())
            .map_err(|source| RefError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        temp.persist(path).map_err(|err| RefError::Io {
            path: path.to_path_buf(),
            source: err.error,
        })?;
        Ok(())
    }

    /// Points `HEAD` at `refs/heads/<branch>`.
    pub fn set_head_to_branch(&self, branch: &str) -> Result<(), RefError> {
        validate_name(branch)?;
        let path = self.head_path();
        use std::io::Write as _;
        let dir = path.parent().expect("HEAD has a parent");
        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|source| RefError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        temp.write_all(format!("ref: refs/heads/{branch}\n").as_bytes())
            .map_err(|source| RefError::Io {
                path: path.clone(),
                source,
            })?;
        temp.persist(&path).map_err(|err| RefError::Io {
            path,
            source: err.error,
        })?;
        Ok(())
    }
}

fn list_names(dir: &Path) -> Result<Vec<String>, RefError> {
    let mut names = Vec::new();
    collect_names(dir, dir, &mut names)?;
    names.sort();
    Ok(names)
}

fn collect_names(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), RefError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(RefError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    for entry in entries {
        let entry = entry.map_err(|source| RefError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_names(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            if let Some(name) = relative.to_str() {
                out.push(name.replace(std::path::MAIN_SEPARATOR, "/"));
            }
        }
    }
    Ok(())
}
