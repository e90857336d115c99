// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::prelude::*;

/// Where graph files (and exported terrain) are read from and written to.
pub trait FileStorage {
    /// Returns `None` when there is no file at `path`.
    fn read_text(&self, path: &Path) -> Result<Option<String>>;
    /// Replaces the whole contents of the file at `path`.
    fn write_text(&self, path: &Path, contents: &str) -> Result<()>;
}

/// The local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskStorage;

impl FileStorage for DiskStorage {
    fn read_text(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Could not read {}", path.display())),
        }
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create directory {}", parent.display()))?;
        }
        std::fs::write(path, contents)
            .with_context(|| format!("Could not write {}", path.display()))
    }
}

/// An in-memory file store. Used by tests and by tools that want to inspect
/// what would be written without touching the disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RefCell<HashMap<PathBuf, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let storage = Self::new();
        storage
            .files
            .borrow_mut()
            .insert(path.into(), contents.into());
        storage
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }

    pub fn num_files(&self) -> usize {
        self.files.borrow().len()
    }
}

impl FileStorage for MemoryStorage {
    fn read_text(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.get(path))
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_owned(), contents.to_owned());
        Ok(())
    }
}

impl<T: FileStorage + ?Sized> FileStorage for &T {
    fn read_text(&self, path: &Path) -> Result<Option<String>> {
        (**self).read_text(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
        (**self).write_text(path, contents)
    }
}
