//! A rendering surface: one native window paired with one OpenGL context
//! and the per-context [`glow::Context`] function table.

use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::num::NonZeroU32;
use std::rc::Rc;

use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{debug, error};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::monitor::MonitorHandle;
use winit::raw_window_handle::HasWindowHandle;
use winit::window::{Fullscreen, UserAttentionType, Window, WindowId};

use crate::context::{self, ContextGuard, SurfaceId};
use crate::error::{Error, Result};

/// External callback invoked after the framebuffer resizes.
pub type ResizeCallback = Box<dyn FnMut(&Surface, u32, u32)>;
/// External callback invoked when the surface gains or loses focus.
pub type FocusCallback = Box<dyn FnMut(&Surface, bool)>;
/// External callback invoked for keyboard input on the surface.
pub type KeyCallback = Box<dyn FnMut(&Surface, &KeyEvent)>;

/// Construction parameters for [`Surface::new`].
pub struct SurfaceConfig {
    /// Desired width in physical pixels. Must be greater than zero.
    pub width: u32,
    /// Desired height in physical pixels. Must be greater than zero.
    pub height: u32,
    /// Initial UTF-8 window title.
    pub title: String,
    /// Monitor to use for borderless fullscreen, or `None` for windowed mode.
    pub fullscreen: Option<MonitorHandle>,
    /// Make this surface's context current immediately.
    pub activate: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: String::new(),
            fullscreen: None,
            activate: true,
        }
    }
}

/// Shared interior of a [`Surface`]. Resources hold weak references to this
/// so registrations never extend a surface's lifetime.
pub(crate) struct SurfaceShared {
    id: SurfaceId,
    window: Window,
    gl_surface: glutin::surface::Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    gl: glow::Context,
    size: Cell<(u32, u32)>,
    should_close: Cell<bool>,
    resize_callback: RefCell<Option<ResizeCallback>>,
    focus_callback: RefCell<Option<FocusCallback>>,
    key_callback: RefCell<Option<KeyCallback>>,
}

impl SurfaceShared {
    pub(crate) fn id(&self) -> SurfaceId {
        self.id
    }

    pub(crate) fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Current framebuffer size in physical pixels.
    pub(crate) fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    /// Raw context switch, without touching the viewport. A no-op when this
    /// context is already current. Returns false (logged) on driver failure.
    pub(crate) fn make_current(self: &Rc<Self>) -> bool {
        if context::active_surface_id() == Some(self.id) {
            return true;
        }
        match self.gl_context.make_current(&self.gl_surface) {
            Ok(()) => {
                context::set_active(self);
                true
            }
            Err(err) => {
                error!("surface {:?}: failed to make context current: {err}", self.id);
                false
            }
        }
    }

    /// Detaches this context from the thread and clears the active tracker.
    pub(crate) fn release_current(&self) {
        if let Err(err) = self.gl_context.make_not_current_in_place() {
            error!("surface {:?}: failed to release context: {err}", self.id);
        }
        context::clear_active();
    }
}

impl Drop for SurfaceShared {
    fn drop(&mut self) {
        context::surface_dropped(self.id);
    }
}

/// One native window plus one OpenGL context.
///
/// GPU resources are registered onto surfaces; every GL-touching operation
/// in this crate switches to the owning surface's context and restores the
/// previously active one afterwards.
pub struct Surface {
    shared: Rc<SurfaceShared>,
}

impl Surface {
    /// Creates a native window and an OpenGL 3.3 core context for it.
    ///
    /// `share` requests GL object sharing with another surface's context.
    /// Any failure here is fatal and no partially initialized surface is
    /// left behind.
    pub fn new(
        event_loop: &ActiveEventLoop,
        config: SurfaceConfig,
        share: Option<&Surface>,
    ) -> Result<Surface> {
        let attributes = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height))
            .with_fullscreen(config.fullscreen.map(|m| Fullscreen::Borderless(Some(m))));

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, ConfigTemplateBuilder::new(), |mut configs| {
                configs
                    .next()
                    .expect("display offered no OpenGL configurations")
            })
            .map_err(|err| Error::ConfigSelection(err.to_string()))?;
        let window = window
            .ok_or_else(|| Error::WindowCreation("display builder produced no window".into()))?;

        let raw_window_handle = window
            .window_handle()
            .map_err(|err| Error::WindowCreation(err.to_string()))?
            .as_raw();
        let display = gl_config.display();

        let mut context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))));
        if let Some(share) = share {
            context_attributes = context_attributes.with_sharing(&share.shared.gl_context);
        }
        let context_attributes = context_attributes.build(Some(raw_window_handle));

        let not_current = unsafe { display.create_context(&gl_config, &context_attributes) }
            .map_err(Error::ContextCreation)?;

        let surface_attributes = window
            .build_surface_attributes(SurfaceAttributesBuilder::<WindowSurface>::new())
            .map_err(|err| Error::WindowCreation(err.to_string()))?;
        let gl_surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(Error::SurfaceCreation)?;

        // The context has to be current once regardless of `activate`, both
        // to load the function pointers and to set the swap interval.
        let gl_context = not_current
            .make_current(&gl_surface)
            .map_err(Error::MakeCurrent)?;

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| {
                let symbol = CString::new(symbol).unwrap();
                display.get_proc_address(&symbol) as *const _
            })
        };

        if let Err(err) = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN)) {
            debug!("vsync unavailable: {err}");
        }

        let size = window.inner_size();
        let shared = Rc::new(SurfaceShared {
            id: context::surface_created(),
            window,
            gl_surface,
            gl_context,
            gl,
            size: Cell::new((size.width, size.height)),
            should_close: Cell::new(false),
            resize_callback: RefCell::new(None),
            focus_callback: RefCell::new(None),
            key_callback: RefCell::new(None),
        });
        context::set_active(&shared);

        let surface = Surface { shared };
        if config.activate {
            surface.activate();
        } else {
            surface.shared.release_current();
        }
        Ok(surface)
    }

    /// Makes this surface's context current for all subsequent graphics
    /// calls and sizes the viewport to the surface. No-op if already active.
    pub fn activate(&self) {
        if !self.shared.make_current() {
            return;
        }
        let (width, height) = self.shared.size.get();
        unsafe { self.shared.gl.viewport(0, 0, width as i32, height as i32) };
    }

    /// Whether this surface's context is the currently active one.
    pub fn is_active(&self) -> bool {
        context::active_surface_id() == Some(self.shared.id)
    }

    pub fn id(&self) -> SurfaceId {
        self.shared.id
    }

    pub fn window_id(&self) -> WindowId {
        self.shared.window.id()
    }

    pub fn width(&self) -> u32 {
        self.shared.size.get().0
    }

    pub fn height(&self) -> u32 {
        self.shared.size.get().1
    }

    pub fn should_close(&self) -> bool {
        self.shared.should_close.get()
    }

    pub fn request_close(&self) {
        self.shared.should_close.set(true);
    }

    /// Presents the rendered frame. Call once per frame.
    pub fn swap_buffers(&self) {
        let Some(_guard) = ContextGuard::acquire(&self.shared) else {
            return;
        };
        if let Err(err) = self
            .shared
            .gl_surface
            .swap_buffers(&self.shared.gl_context)
        {
            error!("surface {:?}: failed to swap buffers: {err}", self.shared.id);
        }
    }

    /// Brings this surface to the foreground and gives it input focus.
    /// Generally prefer [`Surface::request_attention`].
    pub fn set_focused(&self) {
        self.shared.window.focus_window();
    }

    pub fn is_focused(&self) -> bool {
        self.shared.window.has_focus()
    }

    /// Requests the user's attention in an OS-specific way.
    pub fn request_attention(&self) {
        self.shared
            .window
            .request_user_attention(Some(UserAttentionType::Informational));
    }

    pub fn request_redraw(&self) {
        self.shared.window.request_redraw();
    }

    /// The raw GL interface for this surface's context. Calls through it are
    /// only valid while this surface is active; use with caution.
    pub fn gl(&self) -> &glow::Context {
        &self.shared.gl
    }

    /// Registers the external framebuffer-resize callback, returning the
    /// previous occupant of the slot. Chaining is the caller's
    /// responsibility.
    pub fn register_framebuffer_resize_callback(
        &self,
        callback: ResizeCallback,
    ) -> Option<ResizeCallback> {
        self.shared.resize_callback.borrow_mut().replace(callback)
    }

    /// Registers the external focus callback, returning the previous one.
    pub fn register_focus_callback(&self, callback: FocusCallback) -> Option<FocusCallback> {
        self.shared.focus_callback.borrow_mut().replace(callback)
    }

    /// Registers the external key callback, returning the previous one.
    /// Escape is intercepted as a close request before forwarding.
    pub fn register_key_callback(&self, callback: KeyCallback) -> Option<KeyCallback> {
        self.shared.key_callback.borrow_mut().replace(callback)
    }

    /// Event dispatch seam. Feed this surface's window events here from the
    /// application's event handler; callbacks run synchronously inside.
    pub fn handle_event(&self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(new_size) => self.on_resized(new_size.width, new_size.height),
            WindowEvent::Focused(focused) => self.on_focus(*focused),
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event),
            WindowEvent::CloseRequested => self.shared.should_close.set(true),
            _ => {}
        }
    }

    pub(crate) fn shared(&self) -> &Rc<SurfaceShared> {
        &self.shared
    }

    fn on_resized(&self, width: u32, height: u32) {
        self.shared.size.set((width, height));

        // Zero-sized framebuffers happen while minimized; skip the GL side.
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            if let Some(guard) = ContextGuard::acquire(&self.shared) {
                self.shared.gl_surface.resize(&self.shared.gl_context, w, h);
                unsafe { guard.gl().viewport(0, 0, width as i32, height as i32) };
            }
        }

        let callback = self.shared.resize_callback.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback(self, width, height);
            let mut slot = self.shared.resize_callback.borrow_mut();
            // The callback may have registered a replacement while running;
            // the newer registration wins.
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }

    fn on_focus(&self, focused: bool) {
        debug!("surface {:?}: focus {}", self.shared.id, focused);
        if focused {
            self.activate();
        }

        let callback = self.shared.focus_callback.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback(self, focused);
            let mut slot = self.shared.focus_callback.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }

    fn on_key(&self, event: &KeyEvent) {
        if event.state == ElementState::Pressed
            && matches!(event.logical_key, Key::Named(NamedKey::Escape))
        {
            self.request_close();
        }

        let callback = self.shared.key_callback.borrow_mut().take();
        if let Some(mut callback) = callback {
            callback(self, event);
            let mut slot = self.shared.key_callback.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = SurfaceConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.title.is_empty());
        assert!(config.fullscreen.is_none());
        assert!(config.activate);
    }
}
