//! Asset loading contract.
//!
//! Shader compilation and image decoding live outside this crate; the
//! pipeline consumes them through [`ResourceLoader`], a narrow trait the
//! host's asset cache implements. A handle returned from the loader is
//! proof of successful resolution; downstream code never re-checks.

use rustc_hash::FxHashSet;

use crate::errors::{RenderError, Result};
use crate::renderer::device::{ShaderHandle, TextureHandle};

/// The asset-cache contract.
///
/// Both methods return `Err` for missing or broken sources; callers
/// either propagate (built-in shaders, where a miss is fatal) or degrade
/// deliberately with a log entry (optional material textures).
pub trait ResourceLoader {
    /// Resolves and compiles a shader program from vertex/fragment source
    /// paths with optional preprocessor defines.
    fn load_shader(
        &mut self,
        name: &str,
        vs_path: &str,
        fs_path: &str,
        defines: &[&str],
    ) -> Result<ShaderHandle>;

    /// Resolves and decodes a 2D texture.
    fn load_texture(&mut self, name: &str, path: &str) -> Result<TextureHandle>;
}

/// A loader that vends handles without touching any backing store.
///
/// Used for headless operation and tests. Individual names can be marked
/// missing to exercise the error paths.
#[derive(Default)]
pub struct NullLoader {
    next_shader: u32,
    next_texture: u32,
    missing_shaders: FxHashSet<String>,
    missing_textures: FxHashSet<String>,
    loaded_shaders: Vec<String>,
    loaded_textures: Vec<String>,
}

impl NullLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a shader name as unresolvable.
    pub fn mark_shader_missing(&mut self, name: &str) {
        self.missing_shaders.insert(name.to_owned());
    }

    /// Marks a texture name as unresolvable.
    pub fn mark_texture_missing(&mut self, name: &str) {
        self.missing_textures.insert(name.to_owned());
    }

    /// Names of all shaders loaded so far, in load order.
    #[must_use]
    pub fn loaded_shaders(&self) -> &[String] {
        &self.loaded_shaders
    }

    /// Names of all textures loaded so far, in load order.
    #[must_use]
    pub fn loaded_textures(&self) -> &[String] {
        &self.loaded_textures
    }
}

impl ResourceLoader for NullLoader {
    fn load_shader(
        &mut self,
        name: &str,
        vs_path: &str,
        _fs_path: &str,
        _defines: &[&str],
    ) -> Result<ShaderHandle> {
        if self.missing_shaders.contains(name) {
            return Err(RenderError::ShaderNotFound {
                name: name.to_owned(),
                path: vs_path.to_owned(),
            });
        }
        self.loaded_shaders.push(name.to_owned());
        let handle = ShaderHandle::new(self.next_shader);
        self.next_shader += 1;
        Ok(handle)
    }

    fn load_texture(&mut self, name: &str, path: &str) -> Result<TextureHandle> {
        if self.missing_textures.contains(name) {
            return Err(RenderError::TextureNotFound {
                name: name.to_owned(),
                path: path.to_owned(),
            });
        }
        self.loaded_textures.push(name.to_owned());
        let handle = TextureHandle::new(self.next_texture);
        self.next_texture += 1;
        Ok(handle)
    }
}
