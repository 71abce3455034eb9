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

//! Error taxonomy, one `thiserror` enum per domain.
//!
//! Each variant carries the identifying context (a hash, a path, a ref
//! name) rather than an opaque string, following the granularity the
//! teacher's `BackendError` uses. `MergeConflict` is deliberately not an
//! error at all — see [`crate::merge::MergeOutcome`] — because it is
//! structured, expected data, not a failure.

use std::path::PathBuf;

use thiserror::Error;

use crate::hash::Hash;

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("object {0} not found")]
    NotFound(Hash),
    #[error("object {0} is corrupt: {1}")]
    Corrupt(Hash, String),
    #[error("malformed object: {0}")]
    MalformedObject(String),
    #[error("invalid file mode {0:?}")]
    InvalidMode(String),
    #[error("expected object {hash} to be a {expected}, found a {actual}")]
    WrongKind {
        hash: Hash,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("failed to decompress object {0}")]
    Decompress(Hash, #[source] std::io::Error),
    #[error("I/O error on object store at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RefError {
    #[error("invalid ref name {0:?}")]
    InvalidName(String),
    #[error("ref {0:?} not found")]
    NotFound(String),
    #[error("{0:?} does not resolve to a valid object (broken symbolic ref chain)")]
    BadRef(String),
    #[error("symbolic ref chain starting at {0:?} cycles")]
    CycleInSymbolicRef(String),
    #[error("ref {name:?} was concurrently modified (expected {expected:?}, found {found:?})")]
    ConcurrentlyModified {
        name: String,
        expected: Option<String>,
        found: Option<String>,
    },
    #[error("ref {0:?} already exists")]
    AlreadyExists(String),
    #[error("I/O error on refs store at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("tree map has an orphan path component with no content at {0:?}")]
    EmptyDirectory(String),
    #[error(transparent)]
    Object(#[from] ObjectError),
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("branch {0:?} not found")]
    BranchNotFound(String),
    #[error("no common ancestor between {branch_source:?} and {target:?}")]
    NoCommonAncestor { branch_source: String, target: String },
    #[error("{branch_source:?} cannot be fast-forwarded into {target:?}")]
    NotFastForwardable { branch_source: String, target: String },
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The facade's top-level error, one transparent variant per domain.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("while {context}")]
    Context {
        context: String,
        #[source]
        source: Box<ForgeError>,
    },
}

impl ForgeError {
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;
