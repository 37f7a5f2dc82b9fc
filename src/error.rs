use thiserror::Error;

/// Fatal, construction-time failures.
///
/// Only unrecoverable conditions live here: a surface (window + context)
/// that cannot be brought up, or a program object that cannot be created.
/// Recoverable conditions (decode failures, parse failures, shader compile
/// errors, draws on unregistered surfaces) are logged where they occur and
/// leave the affected object in a defined degraded state instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create native window: {0}")]
    WindowCreation(String),

    #[error("no suitable OpenGL configuration: {0}")]
    ConfigSelection(String),

    #[error("failed to create OpenGL context: {0}")]
    ContextCreation(glutin::error::Error),

    #[error("failed to create window surface: {0}")]
    SurfaceCreation(glutin::error::Error),

    #[error("failed to make OpenGL context current: {0}")]
    MakeCurrent(glutin::error::Error),

    #[error("failed to create shader program object: {0}")]
    ProgramCreation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
