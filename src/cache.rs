//! De-duplication caches for loaded textures and models.
//!
//! One `ResourceCache` is owned explicitly by the application (typically one
//! per session) and passed by reference to loaders, so cache lifetime and
//! test isolation are controllable. Entries are weak: the cache never keeps
//! a resource alive on its own, and eviction follows the last real owner.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use log::trace;

use crate::model::{Model, SharedModel};
use crate::texture::{SharedTexture, Texture};

pub struct ResourceCache {
    textures: HashMap<PathBuf, Weak<RefCell<Texture>>>,
    models: HashMap<PathBuf, Weak<RefCell<Model>>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            models: HashMap::new(),
        }
    }

    /// Resource identity is the resolved on-disk path, so two spellings of
    /// one file share a cache entry. Paths that do not resolve (missing
    /// files) fall back to the given spelling.
    fn resolve(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Looks up the texture for `path`, decoding and inserting on a miss.
    /// Returns `None` when the image cannot be decoded (already logged);
    /// failed decodes are not cached, so a later load may retry.
    pub fn load_texture(&mut self, path: &Path) -> Option<SharedTexture> {
        let key = Self::resolve(path);
        if let Some(existing) = self.textures.get(&key).and_then(Weak::upgrade) {
            trace!("texture cache hit for {}", key.display());
            return Some(existing);
        }

        let texture = Texture::from_path(&key);
        if !texture.is_loaded() {
            return None;
        }
        let texture = Rc::new(RefCell::new(texture));
        self.textures.insert(key, Rc::downgrade(&texture));
        Some(texture)
    }

    /// Looks up the model for `path`, loading and inserting on a miss. Every
    /// caller of the same path shares one model instance; a model whose file
    /// failed to parse is still returned (empty) and shared.
    pub fn load_model(&mut self, path: &Path) -> SharedModel {
        let key = Self::resolve(path);
        if let Some(existing) = self.models.get(&key).and_then(Weak::upgrade) {
            trace!("model cache hit for {}", key.display());
            return existing;
        }

        let model = Rc::new(RefCell::new(Model::load(&key, self)));
        self.models.insert(key, Rc::downgrade(&model));
        model
    }

    /// Peeks for a live cached texture without loading.
    pub fn texture(&self, path: &Path) -> Option<SharedTexture> {
        self.textures
            .get(&Self::resolve(path))
            .and_then(Weak::upgrade)
    }

    /// Peeks for a live cached model without loading.
    pub fn model(&self, path: &Path) -> Option<SharedModel> {
        self.models
            .get(&Self::resolve(path))
            .and_then(Weak::upgrade)
    }

    /// Number of cached textures that still have a live owner.
    pub fn live_texture_count(&self) -> usize {
        self.textures
            .values()
            .filter(|entry| entry.upgrade().is_some())
            .count()
    }

    /// Number of cached models that still have a live owner.
    pub fn live_model_count(&self) -> usize {
        self.models
            .values()
            .filter(|entry| entry.upgrade().is_some())
            .count()
    }

    /// Drops entries whose resource has been released by every owner.
    pub fn purge(&mut self) {
        self.textures.retain(|_, entry| entry.upgrade().is_some());
        self.models.retain(|_, entry| entry.upgrade().is_some());
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    #[test]
    fn same_path_shares_one_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_png(dir.path(), "tex.png");

        let mut cache = ResourceCache::new();
        let first = cache.load_texture(&path).unwrap();
        let second = cache.load_texture(&path).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.live_texture_count(), 1);
    }

    #[test]
    fn distinct_spellings_resolve_to_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_png(dir.path(), "tex.png");
        let dotted = dir.path().join(".").join("tex.png");

        let mut cache = ResourceCache::new();
        let first = cache.load_texture(&path).unwrap();
        let second = cache.load_texture(&dotted).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.live_texture_count(), 1);
    }

    #[test]
    fn entries_do_not_outlive_their_owners() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_png(dir.path(), "tex.png");

        let mut cache = ResourceCache::new();
        let texture = cache.load_texture(&path).unwrap();
        assert_eq!(cache.live_texture_count(), 1);

        drop(texture);
        assert_eq!(cache.live_texture_count(), 0);

        cache.purge();
        assert!(cache.texture(&path).is_none());

        // A fresh load decodes again and repopulates the entry.
        let reloaded = cache.load_texture(&path).unwrap();
        assert!(reloaded.borrow().is_loaded());
        assert_eq!(cache.live_texture_count(), 1);
    }

    #[test]
    fn undecodable_file_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut cache = ResourceCache::new();
        assert!(cache.load_texture(&path).is_none());
        assert_eq!(cache.live_texture_count(), 0);
    }

    #[test]
    fn same_path_shares_one_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_triangle_gltf(dir.path());

        let mut cache = ResourceCache::new();
        let first = cache.load_model(&path);
        let second = cache.load_model(&path);

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.live_model_count(), 1);
        assert_eq!(first.borrow().meshes().len(), 1);
    }
}
