// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem object store for raw document blobs.
//!
//! Blobs live in a keyed tree: `{base_dir}/{id[0:2]}/{id}_{rand8}.bin`.
//! Every path handed to `get` or `delete` is normalized to an absolute
//! form and must stay under the base directory; anything else is refused
//! before a file descriptor is opened.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use corvus_core::CorvusError;

/// Filesystem-backed blob store.
#[derive(Debug, Clone)]
pub struct FsStore {
    base_dir: PathBuf,
}

impl FsStore {
    /// Creates the base directory if needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self, CorvusError> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| CorvusError::storage("create base directory", e))?;
        Ok(Self { base_dir })
    }

    /// Writes a blob and returns its relative path.
    ///
    /// The two-character prefix directory spreads documents across the
    /// tree; the random suffix keeps re-uploads from clobbering.
    pub async fn save(&self, document_id: &str, content: &[u8]) -> Result<String, CorvusError> {
        let sub_dir: String = document_id.chars().take(2).collect();
        let rand8: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let filename = format!("{document_id}_{rand8}.bin");

        let rel_path = if sub_dir.is_empty() {
            PathBuf::from(&filename)
        } else {
            Path::new(&sub_dir).join(&filename)
        };
        let full_path = self.resolve(&rel_path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CorvusError::storage("create subdirectory", e))?;
        }

        tokio::fs::write(&full_path, content)
            .await
            .map_err(|e| CorvusError::storage("write blob", e))?;

        debug!(document_id, path = %rel_path.display(), "blob saved");
        Ok(rel_path.to_string_lossy().into_owned())
    }

    /// Reads a blob by its relative path.
    pub async fn get(&self, file_path: &str) -> Result<Vec<u8>, CorvusError> {
        let full_path = self.resolve(Path::new(file_path))?;
        tokio::fs::read(&full_path)
            .await
            .map_err(|e| CorvusError::storage(format!("open blob {file_path}"), e))
    }

    /// Deletes a blob; missing files are not an error.
    pub async fn delete(&self, file_path: &str) -> Result<(), CorvusError> {
        let full_path = self.resolve(Path::new(file_path))?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CorvusError::storage(format!("delete blob {file_path}"), e)),
        }
    }

    /// Joins onto the base directory and refuses anything that escapes it.
    fn resolve(&self, rel: &Path) -> Result<PathBuf, CorvusError> {
        let base = normalize_absolute(&self.base_dir);
        let full = normalize_absolute(&self.base_dir.join(rel));

        if !full.starts_with(&base) {
            return Err(CorvusError::Storage {
                message: format!("invalid file path: path traversal detected ({})", rel.display()),
                source: None,
            });
        }
        Ok(full)
    }
}

/// Lexically normalizes a path to absolute form, resolving `.` and `..`.
fn normalize_absolute(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (FsStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let (store, _dir) = store().await;
        let path = store.save("doc-42", b"hello blob").await.unwrap();

        assert!(path.starts_with("do/"), "unexpected layout: {path}");
        assert!(path.contains("doc-42_"));
        assert!(path.ends_with(".bin"));

        let content = store.get(&path).await.unwrap();
        assert_eq!(content, b"hello blob");
    }

    #[tokio::test]
    async fn saves_of_same_document_do_not_collide() {
        let (store, _dir) = store().await;
        let a = store.save("doc-42", b"first").await.unwrap();
        let b = store.save("doc-42", b"second").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get(&a).await.unwrap(), b"first");
        assert_eq!(store.get(&b).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn short_ids_use_a_shorter_prefix_dir() {
        let (store, _dir) = store().await;
        let path = store.save("x", b"tiny").await.unwrap();
        assert!(path.starts_with("x/"), "single-char prefix dir: {path}");
        store.get(&path).await.unwrap();
    }

    #[tokio::test]
    async fn get_refuses_path_traversal() {
        let (store, _dir) = store().await;
        let err = store.get("../../etc/passwd").await.unwrap_err();
        assert!(
            err.to_string().contains("path traversal"),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn delete_refuses_path_traversal() {
        let (store, _dir) = store().await;
        let err = store.delete("../outside.bin").await.unwrap_err();
        assert!(err.to_string().contains("path traversal"));
    }

    #[tokio::test]
    async fn traversal_that_stays_inside_is_allowed() {
        let (store, _dir) = store().await;
        let path = store.save("doc-42", b"data").await.unwrap();
        // A no-op detour inside the base dir normalizes fine.
        let detoured = format!("do/../{path}");
        assert_eq!(store.get(&detoured).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (store, _dir) = store().await;
        let path = store.save("doc-9", b"bye").await.unwrap();
        store.delete(&path).await.unwrap();
        store.delete(&path).await.unwrap();
        assert!(store.get(&path).await.is_err());
    }

    #[test]
    fn normalize_resolves_dot_segments() {
        let normalized = normalize_absolute(Path::new("/a/b/../c/./d"));
        assert_eq!(normalized, PathBuf::from("/a/c/d"));
    }
}
