//! Triangle meshes with per-surface vertex-array state.

use std::collections::BTreeMap;
use std::rc::Rc;

use glow::HasContext;
use log::{error, warn};

use crate::context::{ContextGuard, ContextMap};
use crate::shader::ShaderProgram;
use crate::surface::{Surface, SurfaceShared};
use crate::texture::SharedTexture;

/// One interleaved vertex record: position, normal, texture coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// GL objects backing one mesh on one surface.
struct MeshBuffers {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: glow::Buffer,
}

/// An immutable indexed triangle list plus a named texture binding table,
/// drawable on any surface it has been registered on.
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    /// Binding name to shared texture. Ordered, so texture-unit assignment
    /// at draw time is deterministic.
    texture_bindings: BTreeMap<String, SharedTexture>,
    buffers: ContextMap<MeshBuffers>,
}

impl Mesh {
    pub fn new(
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        texture_bindings: BTreeMap<String, SharedTexture>,
        initial_surface: Option<&Surface>,
    ) -> Self {
        let mut mesh = Self {
            vertices,
            indices,
            texture_bindings,
            buffers: ContextMap::new(),
        };
        if let Some(surface) = initial_surface {
            mesh.register_on_surface(surface);
        }
        mesh
    }

    /// Builds this mesh's vertex array, vertex buffer, and index buffer on
    /// `surface` and uploads the geometry once. Idempotent per surface.
    pub fn register_on_surface(&mut self, surface: &Surface) {
        self.register_on_shared(surface.shared());
    }

    pub(crate) fn register_on_shared(&mut self, shared: &Rc<SurfaceShared>) {
        self.buffers.prune();
        if self.buffers.contains(shared.id()) {
            return;
        }

        let Some(guard) = ContextGuard::acquire(shared) else {
            return;
        };
        let gl = guard.gl();

        unsafe {
            let (vao, vbo, ebo) = match (
                gl.create_vertex_array(),
                gl.create_buffer(),
                gl.create_buffer(),
            ) {
                (Ok(vao), Ok(vbo), Ok(ebo)) => (vao, vbo, ebo),
                _ => {
                    error!("surface {:?}: failed to create mesh buffers", shared.id());
                    return;
                }
            };

            gl.bind_vertex_array(Some(vao));

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&self.vertices),
                glow::STATIC_DRAW,
            );

            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&self.indices),
                glow::STATIC_DRAW,
            );

            let stride = std::mem::size_of::<Vertex>() as i32;
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(
                1,
                3,
                glow::FLOAT,
                false,
                stride,
                (3 * std::mem::size_of::<f32>()) as i32,
            );
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(
                2,
                2,
                glow::FLOAT,
                false,
                stride,
                (6 * std::mem::size_of::<f32>()) as i32,
            );
            gl.enable_vertex_attrib_array(2);

            gl.bind_vertex_array(None);

            self.buffers.insert(
                shared.id(),
                Rc::downgrade(shared),
                MeshBuffers { vao, vbo, ebo },
            );
        }
    }

    /// Draws this mesh with `program`, on the surface the program belongs
    /// to. If the mesh was never registered there, the draw is skipped with
    /// a warning; multi-surface registration ordering is easy to get wrong
    /// and must not crash.
    pub fn render(&self, program: &ShaderProgram) {
        let Some(shared) = program.owning_surface("mesh draw") else {
            return;
        };
        let id = shared.id();
        let Some(buffers) = self.buffers.get(id) else {
            warn!("mesh is not registered on surface {id:?}; skipping draw");
            return;
        };

        let Some(guard) = ContextGuard::acquire(&shared) else {
            return;
        };
        let gl = guard.gl();

        // Bind textures to sequential units and tell the program which unit
        // each binding name lives on.
        let mut unit: u32 = 0;
        for (binding_name, texture) in &self.texture_bindings {
            let texture = texture.borrow();
            let Some(handle) = texture.gpu_handle_for_id(id) else {
                warn!("texture for binding '{binding_name}' is not registered on surface {id:?}");
                continue;
            };
            unsafe { gl.active_texture(glow::TEXTURE0 + unit) };
            program.set_uniform_1i(binding_name, unit as i32);
            unsafe { gl.bind_texture(glow::TEXTURE_2D, Some(handle)) };
            unit += 1;
        }
        unsafe { gl.active_texture(glow::TEXTURE0) };

        program.use_program();
        unsafe {
            gl.bind_vertex_array(Some(buffers.vao));
            gl.draw_elements(
                glow::TRIANGLES,
                self.indices.len() as i32,
                glow::UNSIGNED_INT,
                0,
            );
            gl.bind_vertex_array(None);
        }
    }

    pub fn is_registered_on(&self, surface: &Surface) -> bool {
        self.buffers.contains(surface.id())
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn texture_bindings(&self) -> &BTreeMap<String, SharedTexture> {
        &self.texture_bindings
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        for (shared, buffers) in self.buffers.drain_live() {
            if let Some(guard) = ContextGuard::acquire(&shared) {
                let gl = guard.gl();
                unsafe {
                    gl.delete_vertex_array(buffers.vao);
                    gl.delete_buffer(buffers.vbo);
                    gl.delete_buffer(buffers.ebo);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_record_is_tightly_packed() {
        // Three attributes at fixed offsets inside one 32-byte record.
        assert_eq!(std::mem::size_of::<Vertex>(), 8 * std::mem::size_of::<f32>());
        assert_eq!(std::mem::offset_of!(Vertex, position), 0);
        assert_eq!(std::mem::offset_of!(Vertex, normal), 12);
        assert_eq!(std::mem::offset_of!(Vertex, tex_coords), 24);
    }

    #[test]
    fn vertices_cast_to_upload_bytes() {
        let vertices = vec![
            Vertex {
                position: [0.0, 1.0, 2.0],
                normal: [0.0, 0.0, 1.0],
                tex_coords: [0.5, 0.5],
            };
            3
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 3 * std::mem::size_of::<Vertex>());
    }

    #[test]
    fn unregistered_mesh_keeps_cpu_data() {
        let mesh = Mesh::new(Vec::new(), vec![0, 1, 2], BTreeMap::new(), None);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert!(mesh.vertices().is_empty());
        assert!(mesh.texture_bindings().is_empty());
    }
}
