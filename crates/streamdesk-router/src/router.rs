//! The data-channel command router.

use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use streamdesk_protocol::encode_envelope;
use streamdesk_types::{
    codes, ClipboardPolicy, Command, CommandEnvelope, CommandError, JoystickCommand,
};
use tokio::net::UnixDatagram;
use tracing::{debug, info, warn};

use crate::clipboard::ClipboardAccess;
use crate::display::{DisplayInput, PointerButton};
use crate::error::RouterError;
use crate::events::RouterEvents;
use crate::gamepad::{GamepadDevice, GamepadFactory};

/// Keysyms force-released by a keyboard reset: both Ctrl, Shift, Alt and
/// Meta variants, the fullscreen and pointer-lock toggles in both cases,
/// and Escape.
const RESET_KEYSYMS: [u32; 13] = [
    65507, 65505, 65513, 65508, 65506, 65027, 65511, 65512, 102, 70, 109, 77, 65307,
];

/// Resolution bounds applied after rounding up to even dimensions.
const MIN_WIDTH: u32 = 100;
const MAX_WIDTH: u32 = 3840;
const MIN_HEIGHT: u32 = 100;
const MAX_HEIGHT: u32 = 2160;

/// Where the router sends virtual-device traffic.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Fan-out socket of the session's virtual mouse. When unset, all
    /// pointer actions go through the display backend.
    pub mouse_socket: Option<PathBuf>,
    /// Fan-out socket of the session's virtual joystick. When unset,
    /// `js,c` builds a local gamepad through the factory.
    pub joystick_socket: Option<PathBuf>,
    /// Clipboard direction policy.
    pub clipboard: ClipboardPolicy,
}

/// Unbound datagram socket aimed at one device endpoint.
struct DeviceSocket {
    socket: UnixDatagram,
    path: PathBuf,
}

impl DeviceSocket {
    fn open(path: PathBuf) -> Result<Self, RouterError> {
        let socket = UnixDatagram::unbound().map_err(|e| RouterError::Socket {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { socket, path })
    }

    async fn send(&self, envelope: &CommandEnvelope) -> Result<(), RouterError> {
        let bytes = encode_envelope(envelope)?;
        self.socket
            .send_to(&bytes, &self.path)
            .await
            .map_err(|e| RouterError::Socket {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(())
    }
}

enum Joystick {
    Socket(DeviceSocket),
    Local(Box<dyn GamepadDevice>),
}

/// Routes parsed data-channel commands to input backends and callbacks.
///
/// One router serves one client session. The absolute button mask is
/// retained across calls so press/release edges can be derived from each
/// incoming mask.
pub struct InputRouter {
    config: RouterConfig,
    display: Box<dyn DisplayInput>,
    clipboard: Arc<dyn ClipboardAccess>,
    events: Arc<dyn RouterEvents>,
    gamepads: Arc<dyn GamepadFactory>,
    mouse: Option<DeviceSocket>,
    joystick: Option<Joystick>,
    button_mask: u8,
}

impl InputRouter {
    pub fn new(
        config: RouterConfig,
        display: Box<dyn DisplayInput>,
        clipboard: Arc<dyn ClipboardAccess>,
        events: Arc<dyn RouterEvents>,
        gamepads: Arc<dyn GamepadFactory>,
    ) -> Self {
        Self {
            config,
            display,
            clipboard,
            events,
            gamepads,
            mouse: None,
            joystick: None,
            button_mask: 0,
        }
    }

    /// Prepare for a new client session: open the mouse socket when one is
    /// configured and release any modifiers stuck from a previous session.
    pub async fn connect(&mut self) -> Result<(), RouterError> {
        if let Some(path) = &self.config.mouse_socket {
            info!(path = %path.display(), "connecting to virtual mouse socket");
            self.mouse = Some(DeviceSocket::open(path.clone())?);
        }
        self.reset_keyboard().await?;
        Ok(())
    }

    /// Tear down per-session state.
    pub fn disconnect(&mut self) {
        self.mouse = None;
        self.joystick = None;
        self.button_mask = 0;
    }

    /// Handle one raw data-channel line. Failures are logged and dropped
    /// so a bad command never ends the session.
    pub async fn handle_message(&mut self, line: &str) {
        match Command::parse(line) {
            Ok(command) => {
                if let Err(err) = self.dispatch(command).await {
                    warn!(message = line, error = %err, "command dispatch failed");
                }
            }
            Err(CommandError::UnknownVerb(_)) => {
                info!(message = line, "unknown data channel message");
            }
            Err(CommandError::BadResolution(payload)) => {
                warn!(resolution = %payload, "rejecting resolution change");
            }
            Err(err) => {
                warn!(message = line, error = %err, "malformed command");
            }
        }
    }

    /// Dispatch one parsed command.
    pub async fn dispatch(&mut self, command: Command) -> Result<(), RouterError> {
        match command {
            Command::KeyDown(keysym) => self.display.key(keysym, true).await,
            Command::KeyUp(keysym) => self.display.key(keysym, false).await,
            Command::KeyboardReset => self.reset_keyboard().await,
            Command::Mouse {
                x,
                y,
                mask,
                relative,
            } => self.pointer(x, y, mask, relative).await,
            Command::PointerVisible(visible) => {
                info!(visible, "setting pointer visibility");
                self.events.on_pointer_visible(visible);
                Ok(())
            }
            Command::VideoBitrate(bps) => {
                info!(bps, "setting video bitrate");
                self.events.on_video_bitrate(bps);
                Ok(())
            }
            Command::AudioBitrate(bps) => {
                info!(bps, "setting audio bitrate");
                self.events.on_audio_bitrate(bps);
                Ok(())
            }
            Command::Joystick(js) => self.joystick_command(js).await,
            Command::ClipboardRead => self.clipboard_read().await,
            Command::ClipboardWrite(payload) => self.clipboard_write(&payload).await,
            Command::Resize { width, height } => {
                let (width, height) = clamp_resolution(width, height);
                self.events.on_resize(&format!("{width}x{height}"));
                Ok(())
            }
            Command::SetFps(fps) => {
                info!(fps, "setting framerate");
                self.events.on_set_fps(fps);
                Ok(())
            }
            Command::SetAudioEnabled(enabled) => {
                info!(enabled, "setting audio enabled");
                self.events.on_set_enable_audio(enabled);
                Ok(())
            }
            Command::ClientFps(fps) => {
                self.events.on_client_fps(fps);
                Ok(())
            }
            Command::ClientLatency(ms) => {
                self.events.on_client_latency(ms);
                Ok(())
            }
        }
    }

    /// Release every modifier and toggle keysym a client could have left
    /// held down.
    pub async fn reset_keyboard(&mut self) -> Result<(), RouterError> {
        info!("resetting keyboard modifiers");
        for keysym in RESET_KEYSYMS {
            self.display.key(keysym, false).await?;
        }
        self.display.sync().await
    }

    async fn pointer(
        &mut self,
        x: i32,
        y: i32,
        mask: u8,
        relative: bool,
    ) -> Result<(), RouterError> {
        if relative {
            self.motion(x, y).await?;
        } else {
            // Absolute positioning always goes through the display server,
            // even with a virtual mouse attached.
            self.display.pointer_position(x, y).await?;
        }

        if mask != self.button_mask {
            for bit in 0..5u8 {
                if (mask ^ self.button_mask) & (1 << bit) == 0 {
                    continue;
                }
                let pressed = mask & (1 << bit) != 0;
                match bit {
                    0 => self.button(PointerButton::Left, pressed).await?,
                    1 => self.button(PointerButton::Middle, pressed).await?,
                    2 => self.button(PointerButton::Right, pressed).await?,
                    3 => self.scroll(true).await?,
                    _ => self.scroll(false).await?,
                }
            }
            self.button_mask = mask;
        }

        if relative {
            Ok(())
        } else {
            self.display.sync().await
        }
    }

    async fn motion(&mut self, dx: i32, dy: i32) -> Result<(), RouterError> {
        if let Some(mouse) = &self.mouse {
            // Suppress the sync on X so both axes land in one frame.
            mouse
                .send(&CommandEnvelope::without_sync(codes::EV_REL, codes::REL_X, dx))
                .await?;
            mouse
                .send(&CommandEnvelope::new(codes::EV_REL, codes::REL_Y, dy))
                .await
        } else {
            self.display.pointer_motion(dx, dy).await
        }
    }

    async fn button(&mut self, button: PointerButton, pressed: bool) -> Result<(), RouterError> {
        if let Some(mouse) = &self.mouse {
            let code = match button {
                PointerButton::Left => codes::BTN_LEFT,
                PointerButton::Middle => codes::BTN_MIDDLE,
                PointerButton::Right => codes::BTN_RIGHT,
            };
            mouse
                .send(&CommandEnvelope::new(codes::EV_KEY, code, i32::from(pressed)))
                .await
        } else {
            self.display.button(button, pressed).await
        }
    }

    async fn scroll(&mut self, up: bool) -> Result<(), RouterError> {
        if let Some(mouse) = &self.mouse {
            let value = if up { 1 } else { -1 };
            mouse
                .send(&CommandEnvelope::new(codes::EV_REL, codes::REL_WHEEL, value))
                .await
        } else {
            self.display.scroll(up).await
        }
    }

    async fn joystick_command(&mut self, command: JoystickCommand) -> Result<(), RouterError> {
        match command {
            JoystickCommand::Connect { axes, buttons } => {
                self.joystick = Some(match &self.config.joystick_socket {
                    Some(path) => {
                        info!(path = %path.display(), "connecting to virtual joystick socket");
                        Joystick::Socket(DeviceSocket::open(path.clone())?)
                    }
                    None => {
                        info!(buttons, axes, "initializing local gamepad");
                        Joystick::Local(self.gamepads.connect(axes, buttons).await?)
                    }
                });
                Ok(())
            }
            JoystickCommand::Disconnect => {
                self.joystick = None;
                Ok(())
            }
            JoystickCommand::Button { index, pressed } => {
                self.joystick_emit(codes::EV_KEY, index, i32::from(pressed))
                    .await
            }
            JoystickCommand::Axis { index, value } => {
                self.joystick_emit(codes::EV_ABS, index, value).await
            }
        }
    }

    async fn joystick_emit(
        &mut self,
        event_type: u16,
        code: u16,
        value: i32,
    ) -> Result<(), RouterError> {
        match &mut self.joystick {
            None => {
                debug!("dropping gamepad event, no gamepad connected");
                Ok(())
            }
            Some(Joystick::Socket(socket)) => {
                socket
                    .send(&CommandEnvelope::new(event_type, code, value))
                    .await
            }
            Some(Joystick::Local(device)) => device.emit(event_type, code, value),
        }
    }

    async fn clipboard_read(&mut self) -> Result<(), RouterError> {
        if !self.config.clipboard.allows_read() {
            warn!("rejecting clipboard read, outbound clipboard is disabled");
            return Ok(());
        }
        let text = self.clipboard.read().await?;
        if text.is_empty() {
            warn!("no clipboard content to send");
        } else {
            info!(length = text.len(), "read clipboard content");
            self.events.on_clipboard_read(&text);
        }
        Ok(())
    }

    async fn clipboard_write(&mut self, payload: &str) -> Result<(), RouterError> {
        if !self.config.clipboard.allows_write() {
            warn!("rejecting clipboard write, inbound clipboard is disabled");
            return Ok(());
        }
        let bytes = BASE64
            .decode(payload)
            .map_err(|_| RouterError::ClipboardPayload)?;
        let text = String::from_utf8(bytes).map_err(|_| RouterError::ClipboardPayload)?;
        self.clipboard.write(&text).await?;
        info!(length = text.len(), "set clipboard content");
        Ok(())
    }
}

/// Round each dimension up to even, then clamp to the supported range.
pub fn clamp_resolution(width: u32, height: u32) -> (u32, u32) {
    let width = width.saturating_add(width % 2).clamp(MIN_WIDTH, MAX_WIDTH);
    let height = height.saturating_add(height % 2).clamp(MIN_HEIGHT, MAX_HEIGHT);
    (width, height)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use streamdesk_types::ClipboardPolicy;

    use super::*;
    use crate::mock::{
        DisplayCall, EventCall, MockClipboard, MockDisplay, MockGamepadFactory, RecordingEvents,
    };

    fn router_with(config: RouterConfig) -> (InputRouter, TestHandles) {
        let display = MockDisplay::new();
        let clipboard = Arc::new(MockClipboard::new());
        let events = Arc::new(RecordingEvents::new());
        let gamepads = Arc::new(MockGamepadFactory::new());
        let handles = TestHandles {
            display: display.handle(),
            clipboard: Arc::clone(&clipboard),
            events: Arc::clone(&events),
            gamepads: Arc::clone(&gamepads),
        };
        let router = InputRouter::new(config, Box::new(display), clipboard, events, gamepads);
        (router, handles)
    }

    struct TestHandles {
        display: crate::mock::MockDisplayHandle,
        clipboard: Arc<MockClipboard>,
        events: Arc<RecordingEvents>,
        gamepads: Arc<MockGamepadFactory>,
    }

    #[tokio::test]
    async fn absolute_motion_with_button_edges() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("m,100,200,0").await;
        router.handle_message("m,100,200,1").await;
        router.handle_message("m,100,200,0").await;

        let calls = handles.display.calls();
        assert_eq!(
            calls,
            vec![
                DisplayCall::Position { x: 100, y: 200 },
                DisplayCall::Sync,
                DisplayCall::Position { x: 100, y: 200 },
                DisplayCall::Button {
                    button: PointerButton::Left,
                    down: true,
                },
                DisplayCall::Sync,
                DisplayCall::Position { x: 100, y: 200 },
                DisplayCall::Button {
                    button: PointerButton::Left,
                    down: false,
                },
                DisplayCall::Sync,
            ]
        );
    }

    #[tokio::test]
    async fn unchanged_mask_emits_no_buttons() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("m,10,10,5").await;
        router.handle_message("m,20,20,5").await;

        let buttons = handles
            .display
            .calls()
            .into_iter()
            .filter(|c| matches!(c, DisplayCall::Button { .. }))
            .count();
        assert_eq!(buttons, 2);
    }

    #[tokio::test]
    async fn scroll_bits_fire_on_any_change() {
        let (mut router, handles) = router_with(RouterConfig::default());

        // Bit 3 set then cleared: both transitions scroll up.
        router.handle_message("m,0,0,8").await;
        router.handle_message("m,0,0,0").await;
        // Bit 4 set: scroll down.
        router.handle_message("m,0,0,16").await;

        let scrolls: Vec<bool> = handles
            .display
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DisplayCall::Scroll { up } => Some(up),
                _ => None,
            })
            .collect();
        assert_eq!(scrolls, vec![true, true, false]);
    }

    #[tokio::test]
    async fn relative_motion_without_socket_uses_display() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("m2,5,-3,0").await;

        let calls = handles.display.calls();
        assert_eq!(calls, vec![DisplayCall::Motion { dx: 5, dy: -3 }]);
    }

    #[tokio::test]
    async fn relative_motion_proxies_atomic_frame_to_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("event0");
        let receiver = UnixDatagram::bind(&socket_path).unwrap();

        let (mut router, _handles) = router_with(RouterConfig {
            mouse_socket: Some(socket_path),
            ..RouterConfig::default()
        });
        router.connect().await.unwrap();
        router.handle_message("m2,5,-3,0").await;

        let mut buf = [0u8; 256];
        let n = receiver.recv(&mut buf).await.unwrap();
        let first: CommandEnvelope = rmp_serde::from_slice(&buf[..n]).unwrap();
        assert_eq!(first.args, ((codes::EV_REL, codes::REL_X), 5));
        assert!(!first.kwargs.syn);

        let n = receiver.recv(&mut buf).await.unwrap();
        let second: CommandEnvelope = rmp_serde::from_slice(&buf[..n]).unwrap();
        assert_eq!(second.args, ((codes::EV_REL, codes::REL_Y), -3));
        assert!(second.kwargs.syn);
    }

    #[tokio::test]
    async fn buttons_proxy_to_socket_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("event0");
        let receiver = UnixDatagram::bind(&socket_path).unwrap();

        let (mut router, handles) = router_with(RouterConfig {
            mouse_socket: Some(socket_path),
            ..RouterConfig::default()
        });
        router.connect().await.unwrap();
        router.handle_message("m,50,60,4").await;

        let mut buf = [0u8; 256];
        let n = receiver.recv(&mut buf).await.unwrap();
        let envelope: CommandEnvelope = rmp_serde::from_slice(&buf[..n]).unwrap();
        assert_eq!(envelope.args, ((codes::EV_KEY, codes::BTN_RIGHT), 1));

        // Absolute positioning still goes to the display.
        assert!(handles
            .display
            .calls()
            .contains(&DisplayCall::Position { x: 50, y: 60 }));
    }

    #[tokio::test]
    async fn connect_resets_the_keyboard() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.connect().await.unwrap();

        let calls = handles.display.calls();
        let releases: Vec<u32> = calls
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Key { keysym, down: false } => Some(*keysym),
                _ => None,
            })
            .collect();
        assert_eq!(releases, RESET_KEYSYMS.to_vec());
        assert_eq!(calls.last(), Some(&DisplayCall::Sync));
    }

    #[tokio::test]
    async fn key_commands_reach_the_display() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("kd,65307").await;
        router.handle_message("ku,65307").await;

        assert_eq!(
            handles.display.calls(),
            vec![
                DisplayCall::Key {
                    keysym: 65307,
                    down: true,
                },
                DisplayCall::Key {
                    keysym: 65307,
                    down: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn callbacks_receive_pipeline_commands() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("vb,4000000").await;
        router.handle_message("ab,128000").await;
        router.handle_message("p,1").await;
        router.handle_message("_arg_fps,60").await;
        router.handle_message("_arg_audio,true").await;
        router.handle_message("_f,58").await;
        router.handle_message("_l,23").await;

        assert_eq!(
            handles.events.calls(),
            vec![
                EventCall::VideoBitrate(4_000_000),
                EventCall::AudioBitrate(128_000),
                EventCall::PointerVisible(true),
                EventCall::SetFps(60),
                EventCall::SetEnableAudio(true),
                EventCall::ClientFps(58),
                EventCall::ClientLatency(23),
            ]
        );
    }

    #[tokio::test]
    async fn resize_rounds_and_clamps() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("r,641x481").await;
        router.handle_message("r,99x2161").await;
        router.handle_message("r,640x480").await;

        assert_eq!(
            handles.events.calls(),
            vec![
                EventCall::Resize("642x482".to_string()),
                EventCall::Resize("100x2160".to_string()),
                EventCall::Resize("640x480".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn malformed_resize_is_dropped_outright() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("r,1920x").await;
        router.handle_message("r,ax1080").await;

        assert!(handles.events.calls().is_empty());
    }

    #[test]
    fn clamp_handles_extreme_dimensions() {
        // Odd values at the top of the integer range must round without
        // wrapping; the clamp bounds take over afterwards.
        assert_eq!(clamp_resolution(u32::MAX, 100), (MAX_WIDTH, 100));
        assert_eq!(clamp_resolution(100, u32::MAX), (100, MAX_HEIGHT));
        assert_eq!(clamp_resolution(0, 0), (MIN_WIDTH, MIN_HEIGHT));
    }

    #[test]
    fn clamp_is_idempotent_on_valid_output() {
        for (w, h) in [(641, 481), (99, 2161), (3841, 100), (2, 2)] {
            let once = clamp_resolution(w, h);
            assert_eq!(clamp_resolution(once.0, once.1), once);
        }
    }

    #[tokio::test]
    async fn clipboard_gating_by_policy() {
        let (mut router, handles) = router_with(RouterConfig {
            clipboard: ClipboardPolicy::Inbound,
            ..RouterConfig::default()
        });
        handles.clipboard.set_content("secret");

        // Outbound read rejected, inbound write allowed.
        router.handle_message("cr").await;
        router.handle_message("cw,aGVsbG8=").await;

        assert!(handles.events.calls().is_empty());
        assert_eq!(handles.clipboard.written(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn clipboard_read_forwards_content() {
        let (mut router, handles) = router_with(RouterConfig {
            clipboard: ClipboardPolicy::Bidirectional,
            ..RouterConfig::default()
        });
        handles.clipboard.set_content("copied text");

        router.handle_message("cr").await;
        router.handle_message("cw,aGVsbG8=").await;

        assert_eq!(
            handles.events.calls(),
            vec![EventCall::ClipboardRead("copied text".to_string())]
        );
        assert_eq!(handles.clipboard.written(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn local_gamepad_lifecycle() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("js,c,8,11").await;
        router.handle_message("js,b,3,1").await;
        router.handle_message("js,a,1,-32768").await;
        router.handle_message("js,d").await;
        router.handle_message("js,b,3,0").await;

        assert_eq!(handles.gamepads.connects(), vec![(8, 11)]);
        assert_eq!(
            handles.gamepads.emitted(),
            vec![
                (codes::EV_KEY, 3, 1),
                (codes::EV_ABS, 1, -32768),
            ]
        );
    }

    #[tokio::test]
    async fn joystick_socket_proxies_raw_events() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("js0");
        let receiver = UnixDatagram::bind(&socket_path).unwrap();

        let (mut router, handles) = router_with(RouterConfig {
            joystick_socket: Some(socket_path),
            ..RouterConfig::default()
        });
        router.handle_message("js,c,8,11").await;
        router.handle_message("js,b,0,1").await;

        let mut buf = [0u8; 256];
        let n = receiver.recv(&mut buf).await.unwrap();
        let envelope: CommandEnvelope = rmp_serde::from_slice(&buf[..n]).unwrap();
        assert_eq!(envelope.args, ((codes::EV_KEY, 0), 1));

        // The local factory is never consulted in socket mode.
        assert!(handles.gamepads.connects().is_empty());
    }

    #[tokio::test]
    async fn unknown_verbs_are_ignored() {
        let (mut router, handles) = router_with(RouterConfig::default());

        router.handle_message("zz,1,2,3").await;
        router.handle_message("").await;

        assert!(handles.display.calls().is_empty());
        assert!(handles.events.calls().is_empty());
    }
}
