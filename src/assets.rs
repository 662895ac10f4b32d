/// Asset resolution and decoding
/// Texture bytes come from a `TextureSource`; decoded images are cached by key
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::GenericImageView;

use crate::{SkydomeError, SkydomeResult};

/// Resolves a texture key to its encoded bytes
pub trait TextureSource: Send + Sync {
    fn load(&self, key: &str) -> SkydomeResult<Vec<u8>>;
}

/// Reads textures from files under an asset directory
#[derive(Debug, Clone)]
pub struct FileTextureSource {
    root: PathBuf,
}

impl FileTextureSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl TextureSource for FileTextureSource {
    fn load(&self, key: &str) -> SkydomeResult<Vec<u8>> {
        let path = self.resolve(key);
        fs::read(&path).map_err(|e| {
            SkydomeError::AssetLoading(format!("Failed to read {}: {}", path.display(), e))
        })
    }
}

/// In-memory textures, keyed the same way as files
#[derive(Debug, Clone, Default)]
pub struct MemoryTextureSource {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryTextureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(key.into(), bytes);
    }
}

impl TextureSource for MemoryTextureSource {
    fn load(&self, key: &str) -> SkydomeResult<Vec<u8>> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| SkydomeError::AssetLoading(format!("No texture registered as {}", key)))
    }
}

/// Decoded RGBA8 pixels ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn decode_texture(key: &str, bytes: &[u8]) -> SkydomeResult<DecodedImage> {
    let image = image::load_from_memory(bytes).map_err(|e| SkydomeError::TextureDecode {
        key: key.to_string(),
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SkydomeError::TextureDecode {
            key: key.to_string(),
            message: "image has no pixels".to_string(),
        });
    }

    Ok(DecodedImage {
        width,
        height,
        rgba: image.to_rgba8().into_raw(),
    })
}

/// Key-deduplicated cache of shared resources with explicit teardown
#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: HashMap<String, Arc<T>>,
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).cloned()
    }

    /// Borrow an entry without taking a new reference
    pub fn peek(&self, key: &str) -> Option<&T> {
        self.entries.get(key).map(Arc::as_ref)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the cached entry or build, store and return a new one.
    /// A failed build leaves the cache untouched.
    pub fn get_or_try_insert_with<F>(&mut self, key: &str, create: F) -> SkydomeResult<Arc<T>>
    where
        F: FnOnce() -> SkydomeResult<T>,
    {
        if let Some(existing) = self.entries.get(key) {
            return Ok(Arc::clone(existing));
        }
        let created = Arc::new(create()?);
        self.entries.insert(key.to_string(), Arc::clone(&created));
        Ok(created)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, returning how many were held
    pub fn release(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}
