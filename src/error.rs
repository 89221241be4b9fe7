//! Crate-level error type.
//!
//! Only the edges of the viewer can fail at runtime: creating the window and
//! GPU objects, and writing a captured frame. Invariant violations in the
//! transform core panic instead of returning one of these.

use std::fmt;

/// Errors produced while setting up or running the viewer.
#[derive(Debug)]
pub enum ViewerError {
    /// The winit event loop could not be created or exited abnormally.
    EventLoop(winit::error::EventLoopError),
    /// The OS refused to create the window.
    Window(winit::error::OsError),
    /// No rendering surface could be created for the window.
    Surface(wgpu::CreateSurfaceError),
    /// No GPU adapter matched the surface.
    Adapter(wgpu::RequestAdapterError),
    /// The adapter refused to create a device.
    Device(wgpu::RequestDeviceError),
    /// The window surface failed in a way that reconfiguring cannot fix.
    Render(wgpu::SurfaceError),
    /// Reading back or encoding a captured frame failed.
    Capture(String),
    /// Writing the captured image failed.
    Image(image::ImageError),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventLoop(e) => write!(f, "event loop error: {e}"),
            Self::Window(e) => write!(f, "window creation failed: {e}"),
            Self::Surface(e) => write!(f, "surface creation failed: {e}"),
            Self::Adapter(e) => write!(f, "no suitable GPU adapter: {e}"),
            Self::Device(e) => write!(f, "GPU device request failed: {e}"),
            Self::Render(e) => write!(f, "rendering failed: {e}"),
            Self::Capture(msg) => write!(f, "frame capture failed: {msg}"),
            Self::Image(e) => write!(f, "image write failed: {e}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EventLoop(e) => Some(e),
            Self::Window(e) => Some(e),
            Self::Surface(e) => Some(e),
            Self::Adapter(e) => Some(e),
            Self::Device(e) => Some(e),
            Self::Render(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Capture(_) => None,
        }
    }
}

impl From<winit::error::EventLoopError> for ViewerError {
    fn from(e: winit::error::EventLoopError) -> Self {
        Self::EventLoop(e)
    }
}

impl From<winit::error::OsError> for ViewerError {
    fn from(e: winit::error::OsError) -> Self {
        Self::Window(e)
    }
}

impl From<wgpu::CreateSurfaceError> for ViewerError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        Self::Surface(e)
    }
}

impl From<wgpu::RequestAdapterError> for ViewerError {
    fn from(e: wgpu::RequestAdapterError) -> Self {
        Self::Adapter(e)
    }
}

impl From<wgpu::RequestDeviceError> for ViewerError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        Self::Device(e)
    }
}

impl From<wgpu::SurfaceError> for ViewerError {
    fn from(e: wgpu::SurfaceError) -> Self {
        Self::Render(e)
    }
}

impl From<image::ImageError> for ViewerError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_errors_have_no_source() {
        let err = ViewerError::Capture("buffer map failed".to_string());
        assert_eq!(err.to_string(), "frame capture failed: buffer map failed");
        assert!(std::error::Error::source(&err).is_none());
    }
}
