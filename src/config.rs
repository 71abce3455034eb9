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

//! The handful of knobs the core owns. Read once at [`crate::repo::Repository::open`]
//! and held for the life of the handle; the host configures everything else
//! (auth, routing, storage quotas) on its own side.

/// Rendering style for three-way merge conflict markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStyle {
    /// `<<<<<<< target` / `=======` / `>>>>>>> source`, the style described
    /// in the merge engine's conflict procedure.
    Diff3Labels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Lines of context kept on each side of a diff hunk.
    pub diff_context: usize,
    /// Whether the object store fsyncs before renaming a new object into
    /// place. Tests that construct many throwaway repositories may want to
    /// disable this.
    pub fsync_objects: bool,
    pub conflict_style: ConflictStyle,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            diff_context: 3,
            fsync_objects: true,
            conflict_style: ConflictStyle::Diff3Labels,
        }
    }
}
