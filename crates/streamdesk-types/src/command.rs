//! The client-facing text command protocol.
//!
//! One command per line, `<verb>,<arg1>,<arg2>,...`. All arguments are
//! decimal integers except the clipboard-write payload (base64 text) and
//! the audio-enable flag (`"true"`/anything, case-insensitive).

use thiserror::Error;

/// A parsed data-channel command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `kd,<keysym>` — key press.
    KeyDown(u32),
    /// `ku,<keysym>` — key release.
    KeyUp(u32),
    /// `kr` — force-release stuck modifiers.
    KeyboardReset,
    /// `m,<x>,<y>,<mask>` / `m2,<dx>,<dy>,<mask>` — pointer motion plus the
    /// absolute 5-bit button mask.
    Mouse {
        x: i32,
        y: i32,
        mask: u8,
        relative: bool,
    },
    /// `p,<0|1>` — pointer visibility toggle.
    PointerVisible(bool),
    /// `vb,<bps>` — video encoder bitrate.
    VideoBitrate(u32),
    /// `ab,<bps>` — audio encoder bitrate.
    AudioBitrate(u32),
    /// `js,...` — joystick subcommand.
    Joystick(JoystickCommand),
    /// `cr` — clipboard read request.
    ClipboardRead,
    /// `cw,<base64>` — clipboard write; payload still base64-encoded.
    ClipboardWrite(String),
    /// `r,<W>x<H>` — display resize request, dimensions unvalidated beyond
    /// the `digits x digits` shape.
    Resize { width: u32, height: u32 },
    /// `_arg_fps,<fps>` — encoder framerate.
    SetFps(u32),
    /// `_arg_audio,<flag>` — audio enable.
    SetAudioEnabled(bool),
    /// `_f,<fps>` — client-reported framerate.
    ClientFps(u32),
    /// `_l,<ms>` — client-reported latency.
    ClientLatency(u32),
}

/// Joystick subcommands carried by the `js` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickCommand {
    /// `js,c,<axes>,<buttons>`
    Connect { axes: usize, buttons: usize },
    /// `js,d`
    Disconnect,
    /// `js,b,<index>,<0|1>`
    Button { index: u16, pressed: bool },
    /// `js,a,<index>,<value>`
    Axis { index: u16, value: i32 },
}

/// Why a command line failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown verbs are ignored by the router, not treated as failures.
    #[error("unknown command verb: {0}")]
    UnknownVerb(String),

    #[error("unknown joystick subcommand: {0}")]
    UnknownJoystickOp(String),

    #[error("missing argument {index} for {verb}")]
    MissingArgument { verb: String, index: usize },

    #[error("bad argument {index} for {verb}: {value:?}")]
    BadArgument {
        verb: String,
        index: usize,
        value: String,
    },

    /// Resize payloads that are not `digits x digits`. Rejected outright,
    /// never fed into the clamping rule.
    #[error("malformed resolution: {0:?}")]
    BadResolution(String),
}

impl Command {
    /// Parse one command line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut toks = line.split(',');
        let verb = toks.next().unwrap_or("");
        let args: Vec<&str> = toks.collect();

        match verb {
            "kd" => Ok(Self::KeyDown(parse_int(verb, &args, 0)?)),
            "ku" => Ok(Self::KeyUp(parse_int(verb, &args, 0)?)),
            "kr" => Ok(Self::KeyboardReset),
            "m" | "m2" => Ok(Self::Mouse {
                x: parse_int(verb, &args, 0)?,
                y: parse_int(verb, &args, 1)?,
                mask: parse_int(verb, &args, 2)?,
                relative: verb == "m2",
            }),
            "p" => {
                let value: i32 = parse_int(verb, &args, 0)?;
                Ok(Self::PointerVisible(value != 0))
            }
            "vb" => Ok(Self::VideoBitrate(parse_int(verb, &args, 0)?)),
            "ab" => Ok(Self::AudioBitrate(parse_int(verb, &args, 0)?)),
            "js" => parse_joystick(&args).map(Self::Joystick),
            "cr" => Ok(Self::ClipboardRead),
            "cw" => {
                let payload = arg(verb, &args, 0)?;
                Ok(Self::ClipboardWrite(payload.to_string()))
            }
            "r" => parse_resolution(arg(verb, &args, 0)?),
            "_arg_fps" => Ok(Self::SetFps(parse_int(verb, &args, 0)?)),
            "_arg_audio" => {
                let flag = arg(verb, &args, 0)?;
                Ok(Self::SetAudioEnabled(flag.eq_ignore_ascii_case("true")))
            }
            "_f" => Ok(Self::ClientFps(parse_int(verb, &args, 0)?)),
            "_l" => Ok(Self::ClientLatency(parse_int(verb, &args, 0)?)),
            other => Err(CommandError::UnknownVerb(other.to_string())),
        }
    }
}

fn arg<'a>(verb: &str, args: &[&'a str], index: usize) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .ok_or_else(|| CommandError::MissingArgument {
            verb: verb.to_string(),
            index,
        })
}

fn parse_int<T: std::str::FromStr>(
    verb: &str,
    args: &[&str],
    index: usize,
) -> Result<T, CommandError> {
    let raw = arg(verb, args, index)?;
    raw.parse().map_err(|_| CommandError::BadArgument {
        verb: verb.to_string(),
        index,
        value: raw.to_string(),
    })
}

fn parse_joystick(args: &[&str]) -> Result<JoystickCommand, CommandError> {
    match arg("js", args, 0)? {
        "c" => Ok(JoystickCommand::Connect {
            axes: parse_int("js", args, 1)?,
            buttons: parse_int("js", args, 2)?,
        }),
        "d" => Ok(JoystickCommand::Disconnect),
        "b" => Ok(JoystickCommand::Button {
            index: parse_int("js", args, 1)?,
            pressed: arg("js", args, 2)? == "1",
        }),
        "a" => Ok(JoystickCommand::Axis {
            index: parse_int("js", args, 1)?,
            value: parse_int("js", args, 2)?,
        }),
        other => Err(CommandError::UnknownJoystickOp(other.to_string())),
    }
}

fn parse_resolution(payload: &str) -> Result<Command, CommandError> {
    let malformed = || CommandError::BadResolution(payload.to_string());

    let (w, h) = payload.split_once('x').ok_or_else(malformed)?;
    if w.is_empty() || h.is_empty() {
        return Err(malformed());
    }
    if !w.bytes().all(|b| b.is_ascii_digit()) || !h.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    Ok(Command::Resize {
        width: w.parse().map_err(|_| malformed())?,
        height: h.parse().map_err(|_| malformed())?,
    })
}
