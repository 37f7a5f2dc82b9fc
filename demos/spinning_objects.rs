//! Two render objects sharing one cached model on a single surface.
//!
//! Both objects are loaded from the same path and therefore share the same
//! underlying model instance; each carries its own transform.
//!
//! Usage: spinning_objects [path/to/model.gltf]

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use cgmath::{point3, vec3, Deg};
use glow::HasContext;
use polyview::{
    Camera, RenderObject, ResourceCache, ShaderProgram, ShaderStage, Surface, SurfaceConfig,
};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;

const VERTEX_SHADER: &str = r#"
#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aNormal;
layout (location = 2) in vec2 aTexCoords;

out vec2 TexCoords;

uniform mat4 modelMatrix;
uniform mat4 pvMatrix;

void main() {
    TexCoords = aTexCoords;
    gl_Position = pvMatrix * modelMatrix * vec4(aPos, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"
#version 330 core
in vec2 TexCoords;
out vec4 FragColor;

uniform sampler2D diffuse1;

void main() {
    FragColor = texture(diffuse1, TexCoords);
}
"#;

struct Scene {
    surface: Surface,
    objects: Vec<RenderObject>,
    camera: Camera,
    _cache: ResourceCache,
}

impl Scene {
    fn create(event_loop: &ActiveEventLoop) -> polyview::Result<Scene> {
        let model_path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| "resources/models/backpack/backpack.gltf".to_string());

        let surface = Surface::new(
            event_loop,
            SurfaceConfig {
                title: "polyview - render objects".into(),
                ..Default::default()
            },
            None,
        )?;

        let mut program = ShaderProgram::new(&surface)?;
        program.register_shader_source(VERTEX_SHADER, ShaderStage::Vertex);
        program.register_shader_source(FRAGMENT_SHADER, ShaderStage::Fragment);
        program.link();
        let program = Rc::new(program);

        let mut cache = ResourceCache::new();
        let mut left = RenderObject::from_path(&model_path, Some(Rc::clone(&program)), &mut cache);
        let mut right = RenderObject::from_path(&model_path, Some(program), &mut cache);
        assert!(cache.model(Path::new(&model_path)).is_some());

        left.translate(vec3(-3.0, 0.0, 0.0));
        right.translate(vec3(3.0, 0.0, 0.0));
        right.scale(0.5);

        left.register_on_surface(&surface);
        right.register_on_surface(&surface);

        let mut camera = Camera::new(point3(0.0, 2.0, 12.0), vec3(0.0, 0.0, -1.0));
        camera.look_at(point3(0.0, 0.0, 0.0));

        Ok(Scene {
            surface,
            objects: vec![left, right],
            camera,
            _cache: cache,
        })
    }

    fn render_frame(&mut self) {
        self.surface.activate();
        unsafe {
            let gl = self.surface.gl();
            gl.enable(glow::DEPTH_TEST);
            gl.clear_color(0.1, 0.1, 0.15, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        self.camera.recalculate_matrices();
        let pv = *self.camera.pv_matrix();

        // One spins, the other wobbles the opposite way.
        self.objects[0].rotate(Deg(1.0), vec3(0.0, 1.0, 0.0));
        self.objects[1].rotate(Deg(-0.5), vec3(0.0, 1.0, 0.3));

        for object in &self.objects {
            object.set_pv_matrix(&pv, false);
            object.render();
        }
        self.surface.swap_buffers();
    }
}

#[derive(Default)]
struct App {
    scene: Option<Scene>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_none() {
            match Scene::create(event_loop) {
                Ok(scene) => self.scene = Some(scene),
                Err(err) => {
                    eprintln!("failed to set up the demo: {err}");
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if let Some(scene) = &self.scene {
            if scene.surface.window_id() == id {
                scene.surface.handle_event(&event);
            }
        }
    }
}

fn main() {
    env_logger::init();

    let mut event_loop = EventLoop::new().expect("failed to create the event loop");
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::default();

    loop {
        if let PumpStatus::Exit(_) = event_loop.pump_app_events(Some(Duration::ZERO), &mut app) {
            break;
        }
        let Some(scene) = app.scene.as_mut() else {
            continue;
        };
        if scene.surface.should_close() {
            break;
        }
        scene.render_frame();
    }
}
