//! File and image storage collaborators.
//!
//! The core never performs raw byte storage itself: fields or hooks that
//! need assets go through these narrow traits, and a backend (local disk,
//! object store) implements them. In-memory implementations ship for tests
//! and the demo binary.

use crate::error::{Result, StrataError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub filesize: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub extension: String,
    pub filesize: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Public URL for a stored file.
    async fn get_url(&self, filename: &str) -> Result<String>;

    /// Stores file data and returns its metadata.
    async fn put_data(&self, filename: &str, data: Vec<u8>) -> Result<FileMetadata>;

    async fn delete_at_source(&self, filename: &str) -> Result<()>;
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn get_url(&self, id: &str, extension: &str) -> Result<String>;

    async fn put_data(&self, id: &str, extension: &str, data: Vec<u8>) -> Result<ImageMetadata>;

    async fn delete_at_source(&self, id: &str, extension: &str) -> Result<()>;
}

/// In-memory file storage for tests and demos.
#[derive(Default)]
pub struct MemoryFileStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn get_url(&self, filename: &str) -> Result<String> {
        let files = self.files.lock().unwrap();
        if !files.contains_key(filename) {
            return Err(StrataError::NotFound(format!("file '{}'", filename)));
        }
        Ok(format!("memory://files/{}", filename))
    }

    async fn put_data(&self, filename: &str, data: Vec<u8>) -> Result<FileMetadata> {
        let filesize = data.len();
        self.files
            .lock()
            .unwrap()
            .insert(filename.to_string(), data);
        Ok(FileMetadata {
            filename: filename.to_string(),
            filesize,
        })
    }

    async fn delete_at_source(&self, filename: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(filename)
            .map(|_| ())
            .ok_or_else(|| StrataError::NotFound(format!("file '{}'", filename)))
    }
}

/// In-memory image storage for tests and demos. Does not decode image data,
/// so intrinsic dimensions are unknown.
#[derive(Default)]
pub struct MemoryImageStorage {
    images: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(id: &str, extension: &str) -> String {
        format!("{}.{}", id, extension)
    }
}

#[async_trait]
impl ImageStorage for MemoryImageStorage {
    async fn get_url(&self, id: &str, extension: &str) -> Result<String> {
        let key = Self::key(id, extension);
        let images = self.images.lock().unwrap();
        if !images.contains_key(&key) {
            return Err(StrataError::NotFound(format!("image '{}'", key)));
        }
        Ok(format!("memory://images/{}", key))
    }

    async fn put_data(&self, id: &str, extension: &str, data: Vec<u8>) -> Result<ImageMetadata> {
        let filesize = data.len();
        self.images
            .lock()
            .unwrap()
            .insert(Self::key(id, extension), data);
        Ok(ImageMetadata {
            extension: extension.to_string(),
            filesize,
            width: None,
            height: None,
        })
    }

    async fn delete_at_source(&self, id: &str, extension: &str) -> Result<()> {
        self.images
            .lock()
            .unwrap()
            .remove(&Self::key(id, extension))
            .map(|_| ())
            .ok_or_else(|| StrataError::NotFound(format!("image '{}.{}'", id, extension)))
    }
}
