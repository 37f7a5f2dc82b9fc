//! Shader programs.
//!
//! A [`ShaderProgram`] is scoped to exactly one surface. Unlike textures and
//! meshes it is not multi-surface: every surface that needs the same shader
//! gets its own program instance, because program objects cannot be shared
//! across unshared contexts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::{Rc, Weak};

use glow::HasContext;
use log::{debug, error, warn};

use crate::context::{ContextGuard, SurfaceId};
use crate::error::{Error, Result};
use crate::surface::{Surface, SurfaceShared};

/// Shader stage kinds accepted by [`ShaderProgram::register_shader_source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
    Compute,
}

impl ShaderStage {
    pub(crate) fn gl_const(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
            ShaderStage::TessControl => glow::TESS_CONTROL_SHADER,
            ShaderStage::TessEvaluation => glow::TESS_EVALUATION_SHADER,
            ShaderStage::Compute => glow::COMPUTE_SHADER,
        }
    }
}

/// A linked GL program plus its not-yet-linked compiled stages.
///
/// Compile and link failures are recoverable: they log the driver's info log
/// and leave the program degraded (usable but empty) rather than failing
/// construction.
pub struct ShaderProgram {
    surface: Weak<SurfaceShared>,
    surface_id: SurfaceId,
    program: glow::Program,
    /// Compiled stages attached but not yet linked; emptied by a successful
    /// [`ShaderProgram::link`].
    stages: BTreeMap<ShaderStage, glow::Shader>,
}

impl ShaderProgram {
    /// Creates an empty program owned by `surface`'s context.
    pub fn new(surface: &Surface) -> Result<Self> {
        let shared = surface.shared();
        let guard = ContextGuard::acquire(shared)
            .ok_or_else(|| Error::ProgramCreation("owning context unavailable".into()))?;
        let program = unsafe { guard.gl().create_program() }.map_err(Error::ProgramCreation)?;
        Ok(Self {
            surface: Rc::downgrade(shared),
            surface_id: shared.id(),
            program,
            stages: BTreeMap::new(),
        })
    }

    /// Two-stage convenience construction: vertex + fragment from files,
    /// then link. Compile or link failures inside are logged, not fatal.
    pub fn from_files(
        surface: &Surface,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let mut program = Self::new(surface)?;
        program.register_shader_file(vertex_path, ShaderStage::Vertex);
        program.register_shader_file(fragment_path, ShaderStage::Fragment);
        program.link();
        Ok(program)
    }

    /// Compiles `source` as `stage` and attaches it to this program.
    /// Remember to [`ShaderProgram::link`] once all stages are registered.
    /// Returns false (with the info log reported) on a failed compile.
    pub fn register_shader_source(&mut self, source: &str, stage: ShaderStage) -> bool {
        let Some(shared) = self.owning_surface("shader compilation") else {
            return false;
        };
        let Some(guard) = ContextGuard::acquire(&shared) else {
            return false;
        };
        let gl = guard.gl();

        unsafe {
            let shader = match gl.create_shader(stage.gl_const()) {
                Ok(shader) => shader,
                Err(err) => {
                    error!("failed to create {stage:?} shader object: {err}");
                    return false;
                }
            };
            gl.shader_source(shader, source);
            gl.compile_shader(shader);

            if !gl.get_shader_compile_status(shader) {
                error!(
                    "{stage:?} shader compilation failed: {}",
                    gl.get_shader_info_log(shader)
                );
                debug!("source of failed {stage:?} shader:\n{source}");
                gl.delete_shader(shader);
                return false;
            }

            gl.attach_shader(self.program, shader);
            if let Some(previous) = self.stages.insert(stage, shader) {
                // The same stage registered twice: the newer compile wins.
                gl.detach_shader(self.program, previous);
                gl.delete_shader(previous);
            }
        }
        true
    }

    /// Reads `path` whole and compiles it as `stage`. No preprocessing is
    /// performed on the source.
    pub fn register_shader_file(&mut self, path: impl AsRef<Path>, stage: ShaderStage) -> bool {
        let path = path.as_ref();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                error!("failed to read shader source {}: {err}", path.display());
                return false;
            }
        };
        self.register_shader_source(&source, stage)
    }

    /// Links the registered stages into the complete program. On success the
    /// stage objects are deleted and the stage table emptied.
    pub fn link(&mut self) -> bool {
        let Some(shared) = self.owning_surface("program linking") else {
            return false;
        };
        let Some(guard) = ContextGuard::acquire(&shared) else {
            return false;
        };
        let gl = guard.gl();

        unsafe {
            gl.link_program(self.program);
            if !gl.get_program_link_status(self.program) {
                error!(
                    "failed to link shader program on surface {:?}: {}",
                    self.surface_id,
                    gl.get_program_info_log(self.program)
                );
                return false;
            }
            for (_, shader) in std::mem::take(&mut self.stages) {
                gl.detach_shader(self.program, shader);
                gl.delete_shader(shader);
            }
        }
        true
    }

    /// Binds this program for use in its owning context. Call before
    /// submitting draw calls that should use it.
    pub fn use_program(&self) {
        let Some(shared) = self.owning_surface("program bind") else {
            return;
        };
        let Some(guard) = ContextGuard::acquire(&shared) else {
            return;
        };
        unsafe { guard.gl().use_program(Some(self.program)) };
    }

    /// Identity of the surface this program is bound to.
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub(crate) fn raw_program(&self) -> glow::Program {
        self.program
    }

    /// The owning surface, or `None` (with a warning naming `operation`)
    /// when it has been destroyed.
    pub(crate) fn owning_surface(&self, operation: &str) -> Option<Rc<SurfaceShared>> {
        let shared = self.surface.upgrade();
        if shared.is_none() {
            warn!(
                "surface {:?} owning this shader program no longer exists; {operation} skipped",
                self.surface_id
            );
        }
        shared
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        let Some(shared) = self.surface.upgrade() else {
            // The context died and took the GL objects with it.
            return;
        };
        let Some(guard) = ContextGuard::acquire(&shared) else {
            return;
        };
        let gl = guard.gl();
        unsafe {
            for (_, shader) in std::mem::take(&mut self.stages) {
                gl.delete_shader(shader);
            }
            gl.delete_program(self.program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_constants_map_to_gl() {
        assert_eq!(ShaderStage::Vertex.gl_const(), glow::VERTEX_SHADER);
        assert_eq!(ShaderStage::Fragment.gl_const(), glow::FRAGMENT_SHADER);
        assert_eq!(ShaderStage::Geometry.gl_const(), glow::GEOMETRY_SHADER);
        assert_eq!(ShaderStage::Compute.gl_const(), glow::COMPUTE_SHADER);
    }
}
