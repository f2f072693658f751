//! Session event callbacks raised by the router.

use tracing::warn;

/// Callbacks for commands the router does not handle itself.
///
/// Pipeline-facing commands (bitrate, framerate, resize, clipboard
/// content headed to the client) are surfaced through this trait, which
/// is registered at router construction. Every method has a default body
/// that logs a warning and drops the event, so integrations only
/// implement the hooks they care about.
pub trait RouterEvents: Send + Sync + 'static {
    fn on_video_bitrate(&self, bps: u32) {
        warn!(bps, "unhandled video bitrate request");
    }

    fn on_audio_bitrate(&self, bps: u32) {
        warn!(bps, "unhandled audio bitrate request");
    }

    fn on_pointer_visible(&self, visible: bool) {
        warn!(visible, "unhandled pointer visibility request");
    }

    /// Clipboard content to forward to the client. Raised by both the
    /// explicit read command and the outbound change monitor.
    fn on_clipboard_read(&self, text: &str) {
        warn!(length = text.len(), "unhandled clipboard content");
    }

    /// Validated and clamped resolution in `WxH` form.
    fn on_resize(&self, resolution: &str) {
        warn!(resolution, "unhandled resize request");
    }

    fn on_set_fps(&self, fps: u32) {
        warn!(fps, "unhandled framerate request");
    }

    fn on_set_enable_audio(&self, enabled: bool) {
        warn!(enabled, "unhandled audio enable request");
    }

    fn on_client_fps(&self, fps: u32) {
        let _ = fps;
    }

    fn on_client_latency(&self, ms: u32) {
        let _ = ms;
    }
}

/// Events sink that drops everything through the trait defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl RouterEvents for NullEvents {}
