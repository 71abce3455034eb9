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

//! The content-addressed identifier shared by every object kind.
//!
//! A [`Hash`] is a 20-byte SHA-1 digest, rendered as 40 lowercase hex
//! characters wherever it crosses a boundary (ref files, directory names,
//! the public API). Unlike the teacher's per-kind `id_type!` newtypes, all
//! four object kinds here share one hash type: the loose-object layout
//! addresses blobs, trees, commits, and tags by the same 20-byte space.

use std::fmt;
use std::str::FromStr;

use sha1::Digest as _;
use sha1::Sha1;

pub const HASH_LEN: usize = 20;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_LEN]);

#[derive(Debug, thiserror::Error)]
#[error("invalid hash: {0}")]
pub struct InvalidHash(String);

impl Hash {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidHash> {
        <[u8; HASH_LEN]>::try_from(bytes)
            .map(Self)
            .map_err(|_| InvalidHash(format!("expected {HASH_LEN} bytes, got {}", bytes.len())))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Splits the hex form into the `objects/<ab>/<cdef...>` shard used by
    /// the loose-object layout.
    pub fn shard(&self) -> (String, String) {
        let hex = self.hex();
        (hex[..2].to_owned(), hex[2..].to_owned())
    }

    pub fn of(kind: &str, payload: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(kind.as_bytes());
        hasher.update(b" ");
        hasher.update(payload.len().to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(payload);
        Self(hasher.finalize().into())
    }
}

impl FromStr for Hash {
    type Err = InvalidHash;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        if hex_str.len() != HASH_LEN * 2 {
            return Err(InvalidHash(format!(
                "expected {} hex chars, got {}",
                HASH_LEN * 2,
                hex_str.len()
            )));
        }
        let mut bytes = [0u8; HASH_LEN];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|err| InvalidHash(format!("{hex_str}: {err}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.hex())
    }
}
