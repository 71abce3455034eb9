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

//! The loose-object store: content-addressed read/write of [`Object`]s under
//! `<repo>/objects/<ab>/<cdef...>`, zlib-compressed, written atomically via
//! write-to-temp-and-rename in the same directory as the final file (so the
//! rename is same-filesystem and therefore atomic on every platform we
//! support).

use std::fs;
use std::io::Read as _;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::ObjectError;
use crate::hash::Hash;
use crate::object::Commit;
use crate::object::Object;
use crate::object::ObjectKind;
use crate::object::Tag;
use crate::object::Tree;

#[derive(Debug)]
pub struct ObjectStore {
    root: PathBuf,
    fsync: bool,
}

impl ObjectStore {
    /// `root` is the repository's `objects/` directory; it is created if
    /// absent.
    pub fn init(root: &Path, fsync: bool) -> Result<Self, ObjectError> {
        fs::create_dir_all(root).map_err(|source| ObjectError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            fsync,
        })
    }

    fn path_for(&self, hash: &Hash) -> PathBuf {
        let (dir, rest) = hash.shard();
        self.root.join(dir).join(rest)
    }

    pub fn exists(&self, hash: &Hash) -> bool {
        self.path_for(hash).is_file()
    }

    pub fn write(&self, object: &Object) -> Result<Hash, ObjectError> {
        let hash = object.hash();
        let path = self.path_for(&hash);
        if path.is_file() {
            // Content-addressed: an existing file with this hash already
            // holds these exact bytes. Second write is a no-op.
            return Ok(hash);
        }
        let dir = path.parent().expect("sharded path has a parent");
        fs::create_dir_all(dir).map_err(|source| ObjectError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let payload = object.serialize();
        let framed = frame(object.kind(), &payload);
        let compressed = compress(&framed);

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|source| ObjectError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        temp.write_all(&compressed)
            .and_then(|()| temp.flush())
            .map_err(|source| ObjectError::Io {
                path: path.clone(),
                source,
            })?;
        if self.fsync {
            temp.as_file().sync_all().map_err(|source| ObjectError::Io {
                path: path.clone(),
                source,
            })?;
        }
        temp.persist(&path).map_err(|err| ObjectError::Io {
            path: path.clone(),
            source: err.error,
        })?;
        Ok(hash)
    }

    pub fn read(&self, hash: &Hash) -> Result<Object, ObjectError> {
        let path = self.path_for(hash);
        let compressed = fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ObjectError::NotFound(*hash)
            } else {
                ObjectError::Io { path: path.clone(), source }
            }
        })?;
        let framed = decompress(&compressed, hash)?;
        let (kind, payload) = unframe(&framed, hash)?;
        Object::parse(kind, payload).map_err(|err| ObjectError::Corrupt(*hash, err.to_string()))
    }

    pub fn read_blob(&self, hash: &Hash) -> Result<Vec<u8>, ObjectError> {
        match self.read(hash)? {
            Object::Blob(bytes) => Ok(bytes),
            other => Err(wrong_kind(hash, "blob", other.kind())),
        }
    }

    pub fn read_tree(&self, hash: &Hash) -> Result<Tree, ObjectError> {
        match self.read(hash)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(wrong_kind(hash, "tree", other.kind())),
        }
    }

    pub fn read_commit(&self, hash: &Hash) -> Result<Commit, ObjectError> {
        match self.read(hash)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(wrong_kind(hash, "commit", other.kind())),
        }
    }

    pub fn read_tag(&self, hash: &Hash) -> Result<Tag, ObjectError> {
        match self.read(hash)? {
            Object::Tag(tag) => Ok(tag),
            other => Err(wrong_kind(hash, "tag", other.kind())),
        }
    }
}

fn wrong_kind(hash: &Hash, expected: &'static str, actual: ObjectKind) -> ObjectError {
    ObjectError::WrongKind {
        hash: *hash,
        expected,
        actual: actual.as_str(),
    }
}

fn frame(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 16);
    out.extend_from_slice(kind.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(0);
    out.extend_from_slice(payload);
    out
}

fn unframe<'a>(framed: &'a [u8], hash: &Hash) -> Result<(ObjectKind, &'a [u8]), ObjectError> {
    let corrupt = |msg: &str| ObjectError::Corrupt(*hash, msg.to_owned());
    let space = framed
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| corrupt("missing frame header"))?;
    let nul = framed
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| corrupt("missing frame NUL"))?;
    if nul < space {
        return Err(corrupt("malformed frame header"));
    }
    let kind_text =
        std::str::from_utf8(&framed[..space]).map_err(|_| corrupt("frame kind is not utf8"))?;
    let kind =
        ObjectKind::parse(kind_text).map_err(|err| ObjectError::Corrupt(*hash, err.to_string()))?;
    let len_text = std::str::from_utf8(&framed[space + 1..nul])
        .map_err(|_| corrupt("frame length is not utf8"))?;
    let len: usize = len_text
        .parse()
        .map_err(|_| corrupt("frame length is not a number"))?;
    let payload = &framed[nul + 1..];
    if payload.len() != len {
        return Err(corrupt("frame length does not match payload size"));
    }
    Ok((kind, payload))
}

fn compress(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .expect("writing to an in-memory buffer cannot fail");
    encoder
        .finish()
        .expect("writing to an in-memory buffer cannot fail")
}

fn decompress(bytes: &[u8], hash: &Hash) -> Result<Vec<u8>, ObjectError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| ObjectError::Decompress(*hash, err))?;
    Ok(out)
}
