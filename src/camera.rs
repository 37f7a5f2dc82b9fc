//! A free camera producing view/projection matrices for shader upload.
//!
//! Pure math plus one query: a perspective camera re-derives its aspect
//! ratio from whichever surface is active when the matrices are
//! recalculated, so one camera can serve several differently sized
//! surfaces.

use cgmath::{ortho, perspective, InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::context;

const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

#[derive(Debug, Clone, Copy)]
pub enum Projection {
    /// Aspect ratio follows the active surface on recalculation.
    Perspective { fov: Rad<f32>, near: f32, far: f32 },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

pub struct Camera {
    position: Point3<f32>,
    direction: Vector3<f32>,
    up: Vector3<f32>,
    projection_mode: Projection,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    pv: Matrix4<f32>,
}

impl Camera {
    /// A perspective camera at `position` facing `direction`.
    pub fn new(position: Point3<f32>, direction: Vector3<f32>) -> Self {
        let mode = Projection::Perspective {
            fov: Rad(1.0),
            near: 0.1,
            far: 100.0,
        };
        let mut camera = Self {
            position,
            direction: direction.normalize(),
            up: WORLD_UP,
            projection_mode: mode,
            view: Matrix4::from_scale(1.0),
            projection: perspective(Rad(1.0), 4.0 / 3.0, 0.1, 100.0),
            pv: Matrix4::from_scale(1.0),
        };
        camera.recalculate_matrices();
        camera
    }

    /// Recomputes view, projection, and PV. Call between changing the
    /// camera (e.g. after [`Camera::translate`]) and reading its matrices.
    pub fn recalculate_matrices(&mut self) {
        if let Projection::Perspective { fov, near, far } = self.projection_mode {
            // Aspect tracks whichever surface is active right now; keep the
            // previous projection when none is.
            if let Some(shared) = context::active_shared() {
                let (width, height) = shared.size();
                if width > 0 && height > 0 {
                    self.projection = perspective(fov, width as f32 / height as f32, near, far);
                }
            }
        }
        self.view = Matrix4::look_at_rh(self.position, self.position + self.direction, self.up);
        self.pv = self.projection * self.view;
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn view_matrix(&self) -> &Matrix4<f32> {
        &self.view
    }

    /// Projection times view, ready for a "pvMatrix" uniform.
    pub fn pv_matrix(&self) -> &Matrix4<f32> {
        &self.pv
    }

    /// Turns the camera to face a point in world space.
    pub fn look_at(&mut self, target: Point3<f32>) {
        self.direction = (target - self.position).normalize();
    }

    pub fn move_to(&mut self, position: Point3<f32>) {
        self.position = position;
    }

    pub fn translate(&mut self, displacement: Vector3<f32>) {
        self.position += displacement;
    }

    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.direction * distance;
    }

    pub fn move_backward(&mut self, distance: f32) {
        self.position -= self.direction * distance;
    }

    pub fn move_left(&mut self, distance: f32) {
        self.position -= self.right() * distance;
    }

    pub fn move_right(&mut self, distance: f32) {
        self.position += self.right() * distance;
    }

    pub fn set_projection_perspective(&mut self, fov: Rad<f32>, aspect: f32, near: f32, far: f32) {
        self.projection_mode = Projection::Perspective { fov, near, far };
        self.projection = perspective(fov, aspect, near, far);
        self.pv = self.projection * self.view;
    }

    pub fn set_projection_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        self.projection_mode = Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        };
        self.projection = ortho(left, right, bottom, top, near, far);
        self.pv = self.projection * self.view;
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    fn right(&self) -> Vector3<f32> {
        self.direction.cross(self.up).normalize()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{point3, vec3};

    #[test]
    fn look_at_normalizes_direction() {
        let mut camera = Camera::new(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0));
        camera.look_at(point3(10.0, 0.0, 0.0));
        let direction = camera.direction();
        assert!((direction.magnitude() - 1.0).abs() < 1e-6);
        assert!((direction.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pv_is_projection_times_view() {
        let mut camera = Camera::default();
        camera.move_to(point3(3.0, 1.0, 4.0));
        camera.recalculate_matrices();
        assert_eq!(
            *camera.pv_matrix(),
            camera.projection_matrix() * camera.view_matrix()
        );
    }

    #[test]
    fn forward_and_backward_move_along_direction() {
        let mut camera = Camera::new(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0));
        camera.move_forward(5.0);
        assert_eq!(camera.position(), point3(0.0, 0.0, -5.0));
        camera.move_backward(2.0);
        assert_eq!(camera.position(), point3(0.0, 0.0, -3.0));
    }

    #[test]
    fn strafing_is_perpendicular_to_direction() {
        let mut camera = Camera::new(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, -1.0));
        camera.move_right(2.0);
        assert!((camera.position().x - 2.0).abs() < 1e-6);
        assert!(camera.position().z.abs() < 1e-6);
    }

    #[test]
    fn orthographic_projection_sticks_across_recalculation() {
        let mut camera = Camera::default();
        camera.set_projection_orthographic(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
        let expected = *camera.projection_matrix();
        // No active surface in tests; the projection must survive as set.
        camera.recalculate_matrices();
        assert_eq!(*camera.projection_matrix(), expected);
    }
}
