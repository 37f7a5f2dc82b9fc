//! Multi-window OpenGL rendering layer with cross-context resource sharing.
//!
//! An application opens any number of [`Surface`]s, each owning a native
//! window and an independent GL context, and registers logical resources —
//! [`Texture`]s, [`Mesh`]es, [`Model`]s — onto whichever surfaces should be
//! able to draw them. A resource is loaded once on the CPU and instantiated
//! per registered context on the GPU; every call that touches context-scoped
//! GL state transparently switches to the owning context and restores the
//! previously active one afterwards.
//!
//! The execution model is strictly single-threaded: one logical thread
//! drives a frame loop that activates each surface in turn, issues draws
//! through [`RenderObject`]s, swaps buffers, and polls events.
//!
//! Construction failures (window, context) are fatal and surface as
//! [`Error`]; everything else — decode failures, parse failures, shader
//! compile errors, draws on unregistered surfaces — is logged through the
//! `log` facade and degrades gracefully instead of panicking.

pub mod cache;
pub mod camera;
pub mod context;
pub mod error;
pub mod mesh;
pub mod model;
pub mod render_object;
pub mod shader;
mod shader_uniforms;
pub mod surface;
pub mod texture;

#[cfg(test)]
mod test_fixtures;

pub use cache::ResourceCache;
pub use camera::{Camera, Projection};
pub use context::{active_surface_id, live_surface_count, SurfaceId};
pub use error::{Error, Result};
pub use mesh::{Mesh, Vertex};
pub use model::{Model, SharedModel};
pub use render_object::RenderObject;
pub use shader::{ShaderProgram, ShaderStage};
pub use surface::{FocusCallback, KeyCallback, ResizeCallback, Surface, SurfaceConfig};
pub use texture::{SharedTexture, Texture};
