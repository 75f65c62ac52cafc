// src/storage/filesystem.rs
use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use super::{folder_prefix, BlobEntry, BlobStorage};

/// Containers as directories under a base path: `{base}/{container}/{blob}`.
#[derive(Debug)]
pub struct FilesystemStorage {
    base: PathBuf,
}

impl FilesystemStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.base.join(container)
    }
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<BlobEntry>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            walk(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(BlobEntry { name });
        }
    }
    Ok(())
}

#[async_trait]
impl BlobStorage for FilesystemStorage {
    async fn list(&self, container: &str, prefix: &str) -> Result<Vec<BlobEntry>> {
        let root = self.container_dir(container);
        if !root.is_dir() {
            anyhow::bail!("Container '{}' does not exist", container);
        }

        let start = root.join(folder_prefix(prefix));
        let mut entries = Vec::new();
        // A missing folder lists as empty, as object stores do
        if start.is_dir() {
            walk(&root, &start, &mut entries)?;
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, container: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.container_dir(container).join(name);
        Ok(fs::read(path)?)
    }
}
