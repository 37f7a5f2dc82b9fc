//! 2D textures: decoded once on the CPU, instantiated lazily on any number
//! of registered surfaces.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glow::HasContext;
use log::{error, trace};

use crate::context::{ContextGuard, ContextMap, SurfaceId};
use crate::surface::{Surface, SurfaceShared};

/// Shared-ownership handle to a texture. Meshes, models, and the resource
/// cache all refer to one de-duplicated texture through this.
pub type SharedTexture = Rc<RefCell<Texture>>;

struct DecodedImage {
    width: u32,
    height: u32,
    /// Tightly packed RGBA8 rows.
    pixels: Vec<u8>,
}

/// A 2D texture.
///
/// Owns at most one decoded CPU-side image and one GPU texture object per
/// registered surface. The wrap/filter/border configuration record is kept
/// on the CPU and pushed to every registered surface when it changes.
pub struct Texture {
    path: Option<PathBuf>,
    image: Option<DecodedImage>,
    handles: ContextMap<glow::Texture>,
    wrap_s: u32,
    wrap_t: u32,
    min_filter: u32,
    mag_filter: u32,
    border_color: [f32; 4],
}

impl Texture {
    /// An unbound texture: no pixels, no registrations.
    pub fn new() -> Self {
        Self {
            path: None,
            image: None,
            handles: ContextMap::new(),
            wrap_s: glow::MIRRORED_REPEAT,
            wrap_t: glow::MIRRORED_REPEAT,
            min_filter: glow::LINEAR_MIPMAP_LINEAR,
            mag_filter: glow::LINEAR,
            border_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// Decodes `path` immediately; the texture stays unbound until
    /// registered. A failed decode is logged and leaves the failed-load
    /// state (no pixels), never a panic.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let mut texture = Self::new();
        texture.load(path, true);
        texture
    }

    /// A texture registered on `surface` with no pixel data yet.
    pub fn for_surface(surface: &Surface) -> Self {
        let mut texture = Self::new();
        texture.register_on_surface(surface);
        texture
    }

    /// Decodes `path` and registers on `surface`, uploading immediately.
    pub fn from_path_for_surface(surface: &Surface, path: impl AsRef<Path>) -> Self {
        let mut texture = Self::for_surface(surface);
        texture.load(path, true);
        texture
    }

    /// Decodes the image at `path` into this texture, replacing any previous
    /// pixels, and pushes it to every surface the texture is registered on.
    /// `flip` mirrors the image vertically during the load.
    pub fn load(&mut self, path: impl AsRef<Path>, flip: bool) {
        let path = path.as_ref();
        trace!("loading texture from {}", path.display());

        let decoded = match image::open(path) {
            Ok(decoded) => decoded,
            Err(err) => {
                error!("failed to decode texture {}: {err}", path.display());
                return;
            }
        };
        let decoded = if flip { decoded.flipv() } else { decoded }.to_rgba8();
        let (width, height) = decoded.dimensions();

        self.image = Some(DecodedImage {
            width,
            height,
            pixels: decoded.into_raw(),
        });
        self.path = Some(path.to_path_buf());
        self.upload_to_registered();
    }

    /// Creates this texture's GPU object on `surface`. Idempotent: a surface
    /// that is already registered keeps its existing object, so repeated
    /// registration can never leak handles.
    pub fn register_on_surface(&mut self, surface: &Surface) {
        self.register_on_shared(surface.shared());
    }

    pub(crate) fn register_on_shared(&mut self, shared: &Rc<SurfaceShared>) {
        self.handles.prune();
        if self.handles.contains(shared.id()) {
            return;
        }

        let Some(guard) = ContextGuard::acquire(shared) else {
            return;
        };
        let gl = guard.gl();
        let handle = match unsafe { gl.create_texture() } {
            Ok(handle) => handle,
            Err(err) => {
                error!(
                    "surface {:?}: failed to create texture object: {err}",
                    shared.id()
                );
                return;
            }
        };

        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(handle));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, self.wrap_s as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, self.wrap_t as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                self.min_filter as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                self.mag_filter as i32,
            );
            gl.tex_parameter_f32_slice(
                glow::TEXTURE_2D,
                glow::TEXTURE_BORDER_COLOR,
                &self.border_color,
            );

            if let Some(image) = &self.image {
                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    glow::RGBA as i32,
                    image.width as i32,
                    image.height as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(&image.pixels)),
                );
                gl.generate_mipmap(glow::TEXTURE_2D);
            }

            gl.bind_texture(glow::TEXTURE_2D, None);
        }

        self.handles.insert(shared.id(), Rc::downgrade(shared), handle);
    }

    /// The GPU texture object registered for `surface`, or `None` when the
    /// surface was never registered. The handle is only meaningful while
    /// that surface's context is active.
    pub fn gpu_handle(&self, surface: &Surface) -> Option<glow::Texture> {
        self.gpu_handle_for_id(surface.id())
    }

    pub(crate) fn gpu_handle_for_id(&self, id: SurfaceId) -> Option<glow::Texture> {
        self.handles.get(id).copied()
    }

    /// Deletes this texture's GPU object on `surface`.
    pub fn unregister(&mut self, surface: &Surface) {
        if let Some(handle) = self.handles.remove(surface.id()) {
            if let Some(guard) = ContextGuard::acquire(surface.shared()) {
                unsafe { guard.gl().delete_texture(handle) };
            }
        }
    }

    /// Sets the wrap mode for both S and T, e.g. `glow::CLAMP_TO_BORDER`.
    pub fn set_wrap_mode(&mut self, mode: u32) {
        self.set_wrap_mode_s(mode);
        self.set_wrap_mode_t(mode);
    }

    pub fn set_wrap_mode_s(&mut self, mode: u32) {
        self.wrap_s = mode;
        self.apply_to_registered(|gl| unsafe {
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, mode as i32);
        });
    }

    pub fn set_wrap_mode_t(&mut self, mode: u32) {
        self.wrap_t = mode;
        self.apply_to_registered(|gl| unsafe {
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, mode as i32);
        });
    }

    /// Sets minification and magnification filters.
    pub fn set_filter(&mut self, min_filter: u32, mag_filter: u32) {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self.apply_to_registered(|gl| unsafe {
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min_filter as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag_filter as i32);
        });
    }

    /// Border color used with `glow::CLAMP_TO_BORDER` wrapping.
    pub fn set_border_color(&mut self, color: [f32; 4]) {
        self.border_color = color;
        self.apply_to_registered(move |gl| unsafe {
            gl.tex_parameter_f32_slice(glow::TEXTURE_2D, glow::TEXTURE_BORDER_COLOR, &color);
        });
    }

    /// The path this texture was decoded from; used for de-duplication.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Pixel dimensions of the decoded image, if one is loaded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|image| (image.width, image.height))
    }

    fn upload_to_registered(&mut self) {
        self.handles.prune();
        let Some(image) = &self.image else {
            return;
        };
        for (shared, handle) in self.handles.iter_live() {
            let Some(guard) = ContextGuard::acquire(&shared) else {
                continue;
            };
            let gl = guard.gl();
            unsafe {
                gl.bind_texture(glow::TEXTURE_2D, Some(*handle));
                gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    glow::RGBA as i32,
                    image.width as i32,
                    image.height as i32,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(&image.pixels)),
                );
                gl.generate_mipmap(glow::TEXTURE_2D);
                gl.bind_texture(glow::TEXTURE_2D, None);
            }
        }
    }

    /// Runs `apply` once per registered live surface with the texture bound,
    /// switching contexts one surface at a time.
    fn apply_to_registered(&mut self, apply: impl Fn(&glow::Context)) {
        self.handles.prune();
        for (shared, handle) in self.handles.iter_live() {
            let Some(guard) = ContextGuard::acquire(&shared) else {
                continue;
            };
            let gl = guard.gl();
            unsafe { gl.bind_texture(glow::TEXTURE_2D, Some(*handle)) };
            apply(gl);
            unsafe { gl.bind_texture(glow::TEXTURE_2D, None) };
        }
    }
}

impl Default for Texture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        for (shared, handle) in self.handles.drain_live() {
            if let Some(guard) = ContextGuard::acquire(&shared) {
                unsafe { guard.gl().delete_texture(handle) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let mut image = image::RgbaImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = image::Rgba([x as u8, y as u8, 0, 255]);
        }
        let path = dir.join(name);
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn missing_file_leaves_failed_load_state() {
        let texture = Texture::from_path("/definitely/not/here.png");
        assert!(!texture.is_loaded());
        assert!(texture.path().is_none());
        assert!(texture.dimensions().is_none());
    }

    #[test]
    fn load_decodes_rgba8() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), "gradient.png", 4, 2);

        let texture = Texture::from_path(&path);
        assert!(texture.is_loaded());
        assert_eq!(texture.dimensions(), Some((4, 2)));
        assert_eq!(texture.path(), Some(path.as_path()));
        assert_eq!(
            texture.image.as_ref().unwrap().pixels.len(),
            4 * 2 * 4,
        );
    }

    #[test]
    fn flip_on_load_mirrors_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), "rows.png", 1, 2);

        let mut flipped = Texture::new();
        flipped.load(&path, true);
        let mut unflipped = Texture::new();
        unflipped.load(&path, false);

        let top_flipped = &flipped.image.as_ref().unwrap().pixels[..4];
        let top_unflipped = &unflipped.image.as_ref().unwrap().pixels[..4];
        // Row y=1 ends up on top after the flip.
        assert_eq!(top_flipped[1], 1);
        assert_eq!(top_unflipped[1], 0);
    }

    #[test]
    fn configuration_record_updates_without_registrations() {
        let mut texture = Texture::new();
        texture.set_wrap_mode(glow::CLAMP_TO_BORDER);
        texture.set_border_color([0.0, 0.5, 0.0, 1.0]);
        texture.set_filter(glow::NEAREST, glow::NEAREST);

        assert_eq!(texture.wrap_s, glow::CLAMP_TO_BORDER);
        assert_eq!(texture.wrap_t, glow::CLAMP_TO_BORDER);
        assert_eq!(texture.border_color, [0.0, 0.5, 0.0, 1.0]);
        assert_eq!(texture.min_filter, glow::NEAREST);
        assert_eq!(texture.mag_filter, glow::NEAREST);
    }
}
