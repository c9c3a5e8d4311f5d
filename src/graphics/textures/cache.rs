use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::graphics::gpu::{GpuBackend, GpuResult};

/// Resolves image paths into shared textures, loading each path only once.
pub struct TextureCache<B: GpuBackend> {
    textures: FxHashMap<PathBuf, Rc<B::Texture>>,
}

impl<B: GpuBackend> TextureCache<B> {
    pub fn new() -> Self {
        Self {
            textures: FxHashMap::default(),
        }
    }

    /// Get the texture for `path`, loading it through `backend` if it isn't cached yet.
    pub fn get_or_load(&mut self, backend: &B, path: impl AsRef<Path>) -> GpuResult<Rc<B::Texture>> {
        let path = path.as_ref();
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }

        let texture = Rc::new(backend.load_texture(path)?);
        log::debug!("Loaded texture {}", path.display());
        self.textures.insert(path.to_path_buf(), texture.clone());
        Ok(texture)
    }

    /// Forget every texture only the cache still holds on to.
    ///
    /// Returns how many were dropped.
    pub fn remove_unused(&mut self) -> usize {
        let before = self.textures.len();
        self.textures
            .retain(|_, texture| Rc::strong_count(texture) > 1);
        let removed = before - self.textures.len();
        if removed > 0 {
            log::debug!("Dropped {removed} unused textures");
        }
        removed
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.textures.contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl<B: GpuBackend> Default for TextureCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::gpu::{GpuError, recording::RecordingBackend};

    #[test]
    fn repeated_loads_share_one_texture() {
        let backend = RecordingBackend::new();
        backend.register_texture("sprites.png", 64, 32);
        let mut cache = TextureCache::new();

        let first = cache.get_or_load(&backend, "sprites.png").unwrap();
        let second = cache.get_or_load(&backend, "sprites.png").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!((first.width, first.height), (64, 32));
    }

    #[test]
    fn unknown_paths_fail_and_are_not_cached() {
        let backend = RecordingBackend::new();
        let mut cache = TextureCache::new();

        let result = cache.get_or_load(&backend, "missing.png");

        assert!(matches!(result, Err(GpuError::TextureNotFound(_))));
        assert!(!cache.contains("missing.png"));
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_unused_keeps_textures_still_held() {
        let backend = RecordingBackend::new();
        backend.register_texture("a.png", 1, 1);
        backend.register_texture("b.png", 1, 1);
        let mut cache = TextureCache::new();

        let held = cache.get_or_load(&backend, "a.png").unwrap();
        cache.get_or_load(&backend, "b.png").unwrap();

        assert_eq!(cache.remove_unused(), 1);
        assert!(cache.contains("a.png"));
        assert!(!cache.contains("b.png"));
        drop(held);
        assert_eq!(cache.remove_unused(), 1);
        assert!(cache.is_empty());
    }
}
