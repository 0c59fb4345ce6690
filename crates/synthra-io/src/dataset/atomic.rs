// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Write-then-rename helpers.

use crate::error::IoError;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// The `.tmp` sibling a file is staged in.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to the staging sibling of `path` and returns the sibling.
pub(crate) fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf, IoError> {
    let staged = staging_path(path);
    fs::write(&staged, bytes).map_err(|e| IoError::io(&staged, e))?;
    Ok(staged)
}

/// Moves a staged file into place.
pub(crate) fn commit(staged: &Path, path: &Path) -> Result<(), IoError> {
    fs::rename(staged, path).map_err(|e| IoError::io(path, e))
}

/// Writes a whole file so that readers see either the old content or the new
/// one, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let staged = stage(path, bytes)?;
    commit(&staged, path)
}
