//! Typed uniform setters for [`ShaderProgram`].
//!
//! These are mechanical pass-throughs to the GL uniform calls. Every setter
//! runs through the context guard: setting a uniform on a program whose
//! surface is not active is permitted and switches there and back. Slice
//! setters derive the array count from the slice length; matrix setters take
//! the values column-major unless `transpose` is set.

use glow::HasContext;
use log::debug;

use crate::context::ContextGuard;
use crate::shader::ShaderProgram;

impl ShaderProgram {
    /// Locates `name` in this program and applies `set` with the program
    /// bound, under the guard. A missing uniform is reported at debug level
    /// and skipped; drivers routinely strip unused uniforms.
    fn set_uniform(
        &self,
        name: &str,
        set: impl FnOnce(&glow::Context, &<glow::Context as HasContext>::UniformLocation),
    ) {
        let Some(shared) = self.owning_surface("uniform upload") else {
            return;
        };
        let Some(guard) = ContextGuard::acquire(&shared) else {
            return;
        };
        let gl = guard.gl();
        unsafe { gl.use_program(Some(self.raw_program())) };
        match unsafe { gl.get_uniform_location(self.raw_program(), name) } {
            Some(location) => set(gl, &location),
            None => debug!("uniform '{name}' not found in program"),
        }
    }

    pub fn set_uniform_1f(&self, name: &str, v0: f32) {
        self.set_uniform(name, |gl, loc| unsafe { gl.uniform_1_f32(Some(loc), v0) });
    }

    pub fn set_uniform_2f(&self, name: &str, v0: f32, v1: f32) {
        self.set_uniform(name, |gl, loc| unsafe { gl.uniform_2_f32(Some(loc), v0, v1) });
    }

    pub fn set_uniform_3f(&self, name: &str, v0: f32, v1: f32, v2: f32) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_3_f32(Some(loc), v0, v1, v2)
        });
    }

    pub fn set_uniform_4f(&self, name: &str, v0: f32, v1: f32, v2: f32, v3: f32) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_4_f32(Some(loc), v0, v1, v2, v3)
        });
    }

    pub fn set_uniform_1i(&self, name: &str, v0: i32) {
        self.set_uniform(name, |gl, loc| unsafe { gl.uniform_1_i32(Some(loc), v0) });
    }

    pub fn set_uniform_2i(&self, name: &str, v0: i32, v1: i32) {
        self.set_uniform(name, |gl, loc| unsafe { gl.uniform_2_i32(Some(loc), v0, v1) });
    }

    pub fn set_uniform_3i(&self, name: &str, v0: i32, v1: i32, v2: i32) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_3_i32(Some(loc), v0, v1, v2)
        });
    }

    pub fn set_uniform_4i(&self, name: &str, v0: i32, v1: i32, v2: i32, v3: i32) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_4_i32(Some(loc), v0, v1, v2, v3)
        });
    }

    pub fn set_uniform_1ui(&self, name: &str, v0: u32) {
        self.set_uniform(name, |gl, loc| unsafe { gl.uniform_1_u32(Some(loc), v0) });
    }

    pub fn set_uniform_2ui(&self, name: &str, v0: u32, v1: u32) {
        self.set_uniform(name, |gl, loc| unsafe { gl.uniform_2_u32(Some(loc), v0, v1) });
    }

    pub fn set_uniform_3ui(&self, name: &str, v0: u32, v1: u32, v2: u32) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_3_u32(Some(loc), v0, v1, v2)
        });
    }

    pub fn set_uniform_4ui(&self, name: &str, v0: u32, v1: u32, v2: u32, v3: u32) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_4_u32(Some(loc), v0, v1, v2, v3)
        });
    }

    pub fn set_uniform_1fv(&self, name: &str, values: &[f32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_1_f32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_2fv(&self, name: &str, values: &[f32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_2_f32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_3fv(&self, name: &str, values: &[f32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_3_f32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_4fv(&self, name: &str, values: &[f32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_4_f32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_1iv(&self, name: &str, values: &[i32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_1_i32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_2iv(&self, name: &str, values: &[i32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_2_i32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_3iv(&self, name: &str, values: &[i32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_3_i32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_4iv(&self, name: &str, values: &[i32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_4_i32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_1uiv(&self, name: &str, values: &[u32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_1_u32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_2uiv(&self, name: &str, values: &[u32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_2_u32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_3uiv(&self, name: &str, values: &[u32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_3_u32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_4uiv(&self, name: &str, values: &[u32]) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_4_u32_slice(Some(loc), values)
        });
    }

    pub fn set_uniform_matrix_2fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_2_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_3fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_3_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_4fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_4_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_2x3fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_2x3_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_3x2fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_3x2_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_2x4fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_2x4_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_4x2fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_4x2_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_3x4fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_3x4_f32_slice(Some(loc), transpose, values)
        });
    }

    pub fn set_uniform_matrix_4x3fv(&self, name: &str, values: &[f32], transpose: bool) {
        self.set_uniform(name, |gl, loc| unsafe {
            gl.uniform_matrix_4x3_f32_slice(Some(loc), transpose, values)
        });
    }

    // cgmath conveniences

    pub fn set_uniform_vec2(&self, name: &str, value: cgmath::Vector2<f32>) {
        let value: &[f32; 2] = value.as_ref();
        self.set_uniform_2fv(name, value);
    }

    pub fn set_uniform_vec3(&self, name: &str, value: cgmath::Vector3<f32>) {
        let value: &[f32; 3] = value.as_ref();
        self.set_uniform_3fv(name, value);
    }

    pub fn set_uniform_vec4(&self, name: &str, value: cgmath::Vector4<f32>) {
        let value: &[f32; 4] = value.as_ref();
        self.set_uniform_4fv(name, value);
    }

    pub fn set_uniform_mat2(&self, name: &str, value: &cgmath::Matrix2<f32>, transpose: bool) {
        let value: &[f32; 4] = value.as_ref();
        self.set_uniform_matrix_2fv(name, value, transpose);
    }

    pub fn set_uniform_mat3(&self, name: &str, value: &cgmath::Matrix3<f32>, transpose: bool) {
        let value: &[f32; 9] = value.as_ref();
        self.set_uniform_matrix_3fv(name, value, transpose);
    }

    pub fn set_uniform_mat4(&self, name: &str, value: &cgmath::Matrix4<f32>, transpose: bool) {
        let value: &[f32; 16] = value.as_ref();
        self.set_uniform_matrix_4fv(name, value, transpose);
    }
}
