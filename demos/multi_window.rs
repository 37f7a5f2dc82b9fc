//! Two surfaces sharing one model.
//!
//! The model is loaded once, registered on both surfaces, and drawn through
//! a per-surface shader program. The camera orbits the origin; its aspect
//! ratio follows whichever surface is being rendered.
//!
//! Usage: multi_window [path/to/model.gltf]

use std::path::Path;
use std::time::{Duration, Instant};

use cgmath::{point3, vec3, Matrix4, SquareMatrix};
use glow::HasContext;
use polyview::{
    Camera, ResourceCache, ShaderProgram, ShaderStage, SharedModel, Surface, SurfaceConfig,
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
    surfaces: Vec<Surface>,
    programs: Vec<ShaderProgram>,
    model: SharedModel,
    camera: Camera,
    started: Instant,
    // Keeps cached resources addressable for the lifetime of the demo.
    _cache: ResourceCache,
}

impl Scene {
    fn create(event_loop: &ActiveEventLoop) -> polyview::Result<Scene> {
        let model_path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| "resources/models/backpack/backpack.gltf".to_string());

        let first = Surface::new(
            event_loop,
            SurfaceConfig {
                title: "polyview - surface one".into(),
                ..Default::default()
            },
            None,
        )?;
        let second = Surface::new(
            event_loop,
            SurfaceConfig {
                title: "polyview - surface two".into(),
                ..Default::default()
            },
            None,
        )?;

        first.register_key_callback(Box::new(|surface, event| {
            println!("surface {:?} key {:?}", surface.id(), event.logical_key);
        }));

        // Each surface gets its own program; programs are not multi-surface.
        let mut programs = Vec::new();
        for surface in [&first, &second] {
            let mut program = ShaderProgram::new(surface)?;
            program.register_shader_source(VERTEX_SHADER, ShaderStage::Vertex);
            program.register_shader_source(FRAGMENT_SHADER, ShaderStage::Fragment);
            program.link();
            programs.push(program);
        }

        let mut cache = ResourceCache::new();
        let model = cache.load_model(Path::new(&model_path));
        model.borrow_mut().register_on_surface(&first);
        model.borrow_mut().register_on_surface(&second);

        Ok(Scene {
            surfaces: vec![first, second],
            programs,
            model,
            camera: Camera::new(point3(0.0, 0.0, 10.0), vec3(0.0, 0.0, -1.0)),
            started: Instant::now(),
            _cache: cache,
        })
    }

    fn render_frame(&mut self) {
        let t = self.started.elapsed().as_secs_f32();
        self.camera
            .move_to(point3(10.0 * t.sin(), 10.0 * t.cos(), 10.0));
        self.camera.look_at(point3(0.0, 0.0, 0.0));

        let clear_colors = [[0.2, 0.3, 0.3], [0.5, 0.1, 0.1]];
        for ((surface, program), clear) in
            self.surfaces.iter().zip(&self.programs).zip(clear_colors)
        {
            surface.activate();
            unsafe {
                let gl = surface.gl();
                gl.enable(glow::DEPTH_TEST);
                gl.clear_color(clear[0], clear[1], clear[2], 1.0);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }

            // Recalculated per surface so the aspect follows the one being
            // rendered.
            self.camera.recalculate_matrices();
            program.set_uniform_mat4("pvMatrix", self.camera.pv_matrix(), false);
            program.set_uniform_mat4("modelMatrix", &Matrix4::identity(), false);
            program.use_program();

            self.model.borrow().render(program);
            surface.swap_buffers();
        }
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
            for surface in &scene.surfaces {
                if surface.window_id() == id {
                    surface.handle_event(&event);
                }
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
        if scene.surfaces.iter().any(Surface::should_close) {
            break;
        }
        scene.render_frame();
    }
}
