//! Display-server injection seam.

use async_trait::async_trait;

use crate::error::RouterError;

/// Pointer buttons addressable by the absolute button mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// Injects keyboard and pointer input into the session's display server.
///
/// The router uses this backend for keysym presses and absolute pointer
/// actions. Relative motion, buttons and scrolling go through the virtual
/// mouse socket instead whenever one is configured; this trait only sees
/// them when no socket is in play.
#[async_trait]
pub trait DisplayInput: Send + 'static {
    /// Press or release the key bound to `keysym`.
    async fn key(&mut self, keysym: u32, down: bool) -> Result<(), RouterError>;

    /// Warp the pointer to an absolute position.
    async fn pointer_position(&mut self, x: i32, y: i32) -> Result<(), RouterError>;

    /// Move the pointer by a relative delta.
    async fn pointer_motion(&mut self, dx: i32, dy: i32) -> Result<(), RouterError>;

    /// Press or release a pointer button.
    async fn button(&mut self, button: PointerButton, down: bool) -> Result<(), RouterError>;

    /// Scroll one notch, up or down.
    async fn scroll(&mut self, up: bool) -> Result<(), RouterError>;

    /// Flush pending requests to the display server.
    async fn sync(&mut self) -> Result<(), RouterError>;
}
