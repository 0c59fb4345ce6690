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

//! Log output that goes to stderr and, during a run, to the run log file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// An `env_logger` pipe target copying every record to an optional file.
///
/// Clones share the same file, so the pipeline can attach the run log after
/// the logger was installed.
#[derive(Debug, Clone, Default)]
pub struct LogTee {
    file: Arc<Mutex<Option<File>>>,
}

impl LogTee {
    /// A tee that only writes to stderr until a file is attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts copying records to `path`, truncating it.
    pub fn attach(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        *self.file.lock().unwrap_or_else(|e| e.into_inner()) = Some(file);
        Ok(())
    }

    /// Stops copying records to the file and flushes it.
    pub fn detach(&self) {
        let file = self.file.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut file) = file {
            if let Err(e) = file.flush() {
                eprintln!("failed to flush the run log file: {e}");
            }
        }
    }

    /// `true` while a file is attached.
    pub fn is_attached(&self) -> bool {
        self.file
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Attaches `path` until the returned guard is dropped.
    pub fn attach_scoped(&self, path: &Path) -> io::Result<AttachedLog<'_>> {
        self.attach(path)?;
        Ok(AttachedLog { tee: self })
    }
}

impl Write for LogTee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        match file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Detaches the run log file when dropped.
#[derive(Debug)]
pub struct AttachedLog<'a> {
    tee: &'a LogTee,
}

impl Drop for AttachedLog<'_> {
    fn drop(&mut self) {
        self.tee.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn records_reach_the_file_only_while_attached() {
        // --- 1. ARRANGE ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generate.log");
        let tee = LogTee::new();
        let mut writer = tee.clone();

        // --- 2. ACT ---
        writer.write_all(b"before\n").unwrap();
        {
            let _guard = tee.attach_scoped(&path).unwrap();
            assert!(tee.is_attached());
            writer.write_all(b"INFO GenerationAgent: during\n").unwrap();
        }
        writer.write_all(b"after\n").unwrap();

        // --- 3. ASSERT ---
        assert!(!tee.is_attached());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "INFO GenerationAgent: during\n"
        );
    }
}
