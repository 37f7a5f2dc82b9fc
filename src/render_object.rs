//! The unit an application manipulates and draws each frame: a shared
//! model, a shader program, and this object's own local transform.

use std::path::Path;
use std::rc::Rc;

use cgmath::{InnerSpace, Matrix4, Rad, SquareMatrix, Vector3};
use log::warn;

use crate::cache::ResourceCache;
use crate::model::SharedModel;
use crate::shader::ShaderProgram;
use crate::surface::Surface;

pub struct RenderObject {
    model: Option<SharedModel>,
    program: Option<Rc<ShaderProgram>>,
    /// Local-to-world transform, exclusively owned. Sharing a model never
    /// shares placement.
    transform: Matrix4<f32>,
}

impl RenderObject {
    pub fn new(model: Option<SharedModel>, program: Option<Rc<ShaderProgram>>) -> Self {
        Self {
            model,
            program,
            transform: Matrix4::identity(),
        }
    }

    /// Loads the model at `path` through the cache: the same path yields the
    /// same shared model instance across render objects.
    pub fn from_path(
        path: impl AsRef<Path>,
        program: Option<Rc<ShaderProgram>>,
        cache: &mut ResourceCache,
    ) -> Self {
        let mut object = Self::new(None, program);
        object.load_model(path, cache);
        object
    }

    pub fn load_model(&mut self, path: impl AsRef<Path>, cache: &mut ResourceCache) {
        self.model = Some(cache.load_model(path.as_ref()));
    }

    pub fn assign_program(&mut self, program: Rc<ShaderProgram>) {
        self.program = Some(program);
    }

    /// Registers this object's model (meshes and textures) on `surface`.
    pub fn register_on_surface(&self, surface: &Surface) {
        if let Some(model) = &self.model {
            model.borrow_mut().register_on_surface(surface);
        }
    }

    /// Pushes a projection-view matrix to the program's "pvMatrix" uniform.
    pub fn set_pv_matrix(&self, pv: &Matrix4<f32>, transpose: bool) {
        let Some(program) = &self.program else {
            warn!("render object has no shader program; PV matrix upload skipped");
            return;
        };
        program.set_uniform_mat4("pvMatrix", pv, transpose);
    }

    /// Uploads this object's transform to the program's "modelMatrix"
    /// uniform, then renders the model through the program.
    pub fn render(&self) {
        let (Some(model), Some(program)) = (&self.model, &self.program) else {
            warn!("render object is missing a model or shader program; skipping draw");
            return;
        };
        program.set_uniform_mat4("modelMatrix", &self.transform, false);
        model.borrow().render(program);
    }

    /// Moves the object in its local space. Transforms compose in call
    /// order: earlier calls apply first.
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.transform = self.transform * Matrix4::from_translation(offset);
    }

    /// Rotates the object about `axis` through its current origin. The axis
    /// need not be normalized.
    pub fn rotate(&mut self, angle: impl Into<Rad<f32>>, axis: Vector3<f32>) {
        self.transform = self.transform * Matrix4::from_axis_angle(axis.normalize(), angle.into());
    }

    /// Uniform scale about the object's current origin.
    pub fn scale(&mut self, factor: f32) {
        self.transform = self.transform * Matrix4::from_scale(factor);
    }

    /// Per-axis scale about the object's current origin.
    pub fn scale_nonuniform(&mut self, factors: Vector3<f32>) {
        self.transform =
            self.transform * Matrix4::from_nonuniform_scale(factors.x, factors.y, factors.z);
    }

    pub fn transform(&self) -> &Matrix4<f32> {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Matrix4<f32>) {
        self.transform = transform;
    }

    pub fn model(&self) -> Option<&SharedModel> {
        self.model.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use cgmath::{vec3, Vector4};

    fn assert_approx(a: Vector4<f32>, b: Vector4<f32>) {
        for i in 0..4 {
            assert!((a[i] - b[i]).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn starts_at_identity() {
        let object = RenderObject::new(None, None);
        assert_eq!(*object.transform(), Matrix4::identity());
    }

    #[test]
    fn translate_fills_last_column() {
        let mut object = RenderObject::new(None, None);
        object.translate(vec3(1.0, 2.0, 3.0));
        assert_eq!(object.transform()[3], Vector4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn rotate_about_y_maps_x_to_negative_z() {
        let mut object = RenderObject::new(None, None);
        object.rotate(Rad(std::f32::consts::FRAC_PI_2), vec3(0.0, 1.0, 0.0));
        let mapped = object.transform() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_approx(mapped, Vector4::new(0.0, 0.0, -1.0, 1.0));
    }

    #[test]
    fn rotation_axis_is_normalized() {
        let mut scaled_axis = RenderObject::new(None, None);
        scaled_axis.rotate(Rad(0.9), vec3(0.0, 5.0, 0.0));
        let mut unit_axis = RenderObject::new(None, None);
        unit_axis.rotate(Rad(0.9), vec3(0.0, 1.0, 0.0));

        let point = Vector4::new(1.0, 2.0, 3.0, 1.0);
        assert_approx(scaled_axis.transform() * point, unit_axis.transform() * point);
    }

    #[test]
    fn scale_doubles_object_space_positions_after_prior_transforms() {
        let mut object = RenderObject::new(None, None);
        object.translate(vec3(-4.0, 0.5, 9.0));
        object.rotate(Rad(0.7), vec3(0.3, 1.0, 0.2));
        let before = *object.transform();

        object.scale(2.0);
        let after = *object.transform();

        // Scaling composes in object-local space: applying the scaled
        // transform to p equals applying the unscaled one to 2p, exactly.
        let p = Vector4::new(0.25, -1.5, 3.0, 1.0);
        let doubled = Vector4::new(2.0 * p.x, 2.0 * p.y, 2.0 * p.z, 1.0);
        assert_eq!(after * p, before * doubled);
    }

    #[test]
    fn transforms_compose_in_call_order() {
        // Translate then scale: the translation is unscaled, the local
        // geometry is scaled.
        let mut object = RenderObject::new(None, None);
        object.translate(vec3(10.0, 0.0, 0.0));
        object.scale(3.0);
        let origin = object.transform() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(origin, Vector4::new(10.0, 0.0, 0.0, 1.0));
        let unit = object.transform() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(unit, Vector4::new(13.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn cached_model_is_shared_but_transforms_are_not() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_fixtures::write_triangle_gltf(dir.path());
        let mut cache = ResourceCache::new();

        let mut first = RenderObject::from_path(&path, None, &mut cache);
        let second = RenderObject::from_path(&path, None, &mut cache);

        assert!(Rc::ptr_eq(first.model().unwrap(), second.model().unwrap()));
        assert_eq!(cache.live_model_count(), 1);

        first.scale(2.0);
        assert_eq!(*second.transform(), Matrix4::identity());
    }
}
