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

//! The four object kinds and their canonical byte encoding.
//!
//! Hashing is defined over the framed serialization `"<kind> <len>\0<payload>"`
//! (see [`Hash::of`]), matching the on-disk loose-object format described in
//! the module layout's external-interfaces section. Every object is a plain
//! tagged variant; there is no subtyping, only pattern matching, the same
//! dispatch style the teacher uses for its `TreeValue` enum.

use std::fmt;

use crate::error::ObjectError;
use crate::hash::Hash;

/// A file mode as it appears in a tree entry. Stored as the canonical octal
/// string so the byte encoding matches Git's loose-object format exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    File,
    Executable,
    Symlink,
    Directory,
}

impl Mode {
    pub fn as_octal(self) -> &'static str {
        match self {
            Self::File => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Directory => "40000",
        }
    }

    pub fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }

    pub fn parse(text: &str) -> Result<Self, ObjectError> {
        match text {
            "100644" => Ok(Self::File),
            "100755" => Ok(Self::Executable),
            "120000" => Ok(Self::Symlink),
            "40000" | "040000" => Ok(Self::Directory),
            other => Err(ObjectError::InvalidMode(other.to_owned())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_octal())
    }
}

/// One entry of a [`Tree`]. `name` never contains `/` or a NUL byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: Mode,
    pub name: String,
    pub hash: Hash,
}

/// An ordered, already-sorted sequence of tree entries.
///
/// Sort key: lexicographic by name, except directory entries sort as though
/// their name carried a trailing `/` — this is what makes `build(flatten(T))`
/// reproduce `T` byte-for-byte instead of merely semantically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Result<Self, ObjectError> {
        entries.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        let mut seen = std::collections::HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.name.is_empty() || entry.name.contains('/') || entry.name.contains('\0') {
                return Err(ObjectError::MalformedObject(format!(
                    "invalid tree entry name {:?}",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.clone()) {
                return Err(ObjectError::MalformedObject(format!(
                    "duplicate tree entry name {:?}",
                    entry.name
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

fn sort_key(entry: &TreeEntry) -> Vec<u8> {
    let mut key = entry.name.as_bytes().to_vec();
    if entry.mode.is_directory() {
        key.push(b'/');
    }
    key
}

/// Author/committer identity attached to a commit or tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub timestamp_secs: i64,
    /// Minutes east of UTC, matching [`crate::hash`]-free arithmetic used
    /// when rendering the `±HHMM` form.
    pub tz_offset_minutes: i32,
}

impl Signature {
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        let timestamp_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self {
            name: name.into(),
            email: email.into(),
            timestamp_secs,
            tz_offset_minutes: 0,
        }
    }

    fn format(&self) -> String {
        let sign = if self.tz_offset_minutes < 0 { '-' } else { '+' };
        let abs = self.tz_offset_minutes.unsigned_abs();
        format!(
            "{} <{}> {} {sign}{:02}{:02}",
            self.name,
            self.email,
            self.timestamp_secs,
            abs / 60,
            abs % 60
        )
    }

    fn parse(text: &str) -> Result<Self, ObjectError> {
        let err = || ObjectError::MalformedObject(format!("bad signature line: {text}"));
        let lt = text.find('<').ok_or_else(err)?;
        let gt = text.find('>').ok_or_else(err)?;
        if gt < lt {
            return Err(err());
        }
        let name = text[..lt].trim_end().to_owned();
        let email = text[lt + 1..gt].to_owned();
        let rest = text[gt + 1..].trim_start();
        let mut parts = rest.split_whitespace();
        let timestamp_secs: i64 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let tz = parts.next().ok_or_else(err)?;
        if tz.len() != 5 {
            return Err(err());
        }
        let sign = if &tz[..1] == "-" { -1 } else { 1 };
        let hours: i32 = tz[1..3].parse().map_err(|_| err())?;
        let minutes: i32 = tz[3..5].parse().map_err(|_| err())?;
        Ok(Self {
            name,
            email,
            timestamp_secs,
            tz_offset_minutes: sign * (hours * 60 + minutes),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    pub fn parse(text: &str) -> Result<Self, ObjectError> {
        match text {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            other => Err(ObjectError::MalformedObject(format!(
                "unknown object kind {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: Hash,
    pub parents: Vec<Hash>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagTargetKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl TagTargetKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub target: Hash,
    pub target_kind: TagTargetKind,
    pub name: String,
    pub tagger: Signature,
    pub message: String,
}

/// The tagged union over which every component but the codec itself operates
/// opaquely, addressing objects purely by [`Hash`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Vec<u8>),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Deterministic byte serialization. Hashing and storage both go through
    /// this, never through `Debug` or any other representation.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Self::Blob(bytes) => bytes.clone(),
            Self::Tree(tree) => serialize_tree(tree),
            Self::Commit(commit) => serialize_commit(commit).into_bytes(),
            Self::Tag(tag) => serialize_tag(tag).into_bytes(),
        }
    }

    pub fn hash(&self) -> Hash {
        Hash::of(self.kind().as_str(), &self.serialize())
    }

    pub fn parse(kind: ObjectKind, payload: &[u8]) -> Result<Self, ObjectError> {
        match kind {
            ObjectKind::Blob => Ok(Self::Blob(payload.to_vec())),
            ObjectKind::Tree => Ok(Self::Tree(parse_tree(payload)?)),
            ObjectKind::Commit => Ok(Self::Commit(parse_commit(payload)?)),
            ObjectKind::Tag => Ok(Self::Tag(parse_tag(payload)?)),
        }
    }
}

fn serialize_tree(tree: &Tree) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in tree.entries() {
        out.extend_from_slice(entry.mode.as_octal().as_bytes());
        out.push(b' ');
        out.extend_from_slice(entry.name.as_bytes());
        out.push(0);
        out.extend_from_slice(entry.hash.as_bytes());
    }
    out
}

fn parse_tree(payload: &[u8]) -> Result<Tree, ObjectError> {
    let mut entries = Vec::new();
    let mut cursor = 0;
    while cursor < payload.len() {
        let space = find_byte(payload, cursor, b' ')
            .ok_or_else(|| ObjectError::MalformedObject("tree entry missing mode".into()))?;
        let mode_text = std::str::from_utf8(&payload[cursor..space])
            .map_err(|_| ObjectError::MalformedObject("tree entry mode is not utf8".into()))?;
        let mode = Mode::parse(mode_text)?;
        let nul = find_byte(payload, space + 1, 0)
            .ok_or_else(|| ObjectError::MalformedObject("tree entry missing name".into()))?;
        let name = std::str::from_utf8(&payload[space + 1..nul])
            .map_err(|_| ObjectError::MalformedObject("tree entry name is not utf8".into()))?
            .to_owned();
        let hash_start = nul + 1;
        let hash_end = hash_start + crate::hash::HASH_LEN;
        if hash_end > payload.len() {
            return Err(ObjectError::MalformedObject(
                "tree entry hash truncated".into(),
            ));
        }
        let hash = Hash::from_bytes(&payload[hash_start..hash_end])
            .map_err(|err| ObjectError::MalformedObject(err.to_string()))?;
        entries.push(TreeEntry { mode, name, hash });
        cursor = hash_end;
    }
    Tree::from_entries(entries)
}

fn find_byte(haystack: &[u8], from: usize, needle: u8) -> Option<usize> {
    haystack[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|pos| pos + from)
}

fn serialize_commit(commit: &Commit) -> String {
    let mut out = String::new();
    out.push_str(&format!("tree {}\n", commit.tree.hex()));
    for parent in &commit.parents {
        out.push_str(&format!("parent {}\n", parent.hex()));
    }
    out.push_str(&format!("author {}\n", commit.author.format()));
    out.push_str(&format!("committer {}\n", commit.committer.format()));
    out.push('\n');
    out.push_str(&commit.message);
    out
}

fn parse_commit(payload: &[u8]) -> Result<Commit, ObjectError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| ObjectError::MalformedObject("commit is not utf8".into()))?;
    let (header, message) = text
        .split_once("\n\n")
        .ok_or_else(|| ObjectError::MalformedObject("commit missing header/message split".into()))?;
    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;
    for line in header.lines() {
        if let Some(rest) = line.strip_prefix("tree ") {
            tree = Some(
                rest.parse::<Hash>()
                    .map_err(|err| ObjectError::MalformedObject(err.to_string()))?,
            );
        } else if let Some(rest) = line.strip_prefix("parent ") {
            parents.push(
                rest.parse::<Hash>()
                    .map_err(|err| ObjectError::MalformedObject(err.to_string()))?,
            );
        } else if let Some(rest) = line.strip_prefix("author ") {
            author = Some(Signature::parse(rest)?);
        } else if let Some(rest) = line.strip_prefix("committer ") {
            committer = Some(Signature::parse(rest)?);
        }
    }
    Ok(Commit {
        tree: tree.ok_or_else(|| ObjectError::MalformedObject("commit missing tree".into()))?,
        parents,
        author: author.ok_or_else(|| ObjectError::MalformedObject("commit missing author".into()))?,
        committer: committer
            .ok_or_else(|| ObjectError::MalformedObject("commit missing committer".into()))?,
        message: message.to_owned(),
    })
}

fn serialize_tag(tag: &Tag) -> String {
    format!(
        "object {}\ntype {}\ntag {}\ntagger {}\n\n{}",
        tag.target.hex(),
        tag.target_kind.as_str(),
        tag.name,
        tag.tagger.format(),
        tag.message
    )
}

fn parse_tag(payload: &[u8]) -> Result<Tag, ObjectError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| ObjectError::MalformedObject("tag is not utf8".into()))?;
    let (header, message) = text
        .split_once("\n\n")
        .ok_or_else(|| ObjectError::MalformedObject("tag missing header/message split".into()))?;
    let mut target = None;
    let mut target_kind = None;
    let mut name = None;
    let mut tagger = None;
    for line in header.lines() {
        if let Some(rest) = line.strip_prefix("object ") {
            target = Some(
                rest.parse::<Hash>()
                    .map_err(|err| ObjectError::MalformedObject(err.to_string()))?,
            );
        } else if let Some(rest) = line.strip_prefix("type ") {
            target_kind = Some(match rest {
                "blob" => TagTargetKind::Blob,
                "tree" => TagTargetKind::Tree,
                "commit" => TagTargetKind::Commit,
                "tag" => TagTargetKind::Tag,
                other => {
                    return Err(ObjectError::MalformedObject(format!(
                        "unknown tag target kind {other:?}"
                    )));
                }
            });
        } else if let Some(rest) = line.strip_prefix("tag ") {
            name = Some(rest.to_owned());
        } else if let Some(rest) = line.strip_prefix("tagger ") {
            tagger = Some(Signature::parse(rest)?);
        }
    }
    Ok(Tag {
        target: target.ok_or_else(|| ObjectError::MalformedObject("tag missing object".into()))?,
        target_kind: target_kind
            .ok_or_else(|| ObjectError::MalformedObject("tag missing type".into()))?,
        name: name.ok_or_else(|| ObjectError::MalformedObject("tag missing name".into()))?,
        tagger: tagger.ok_or_else(|| ObjectError::MalformedObject("tag missing tagger".into()))?,
        message: message.to_owned(),
    })
}
