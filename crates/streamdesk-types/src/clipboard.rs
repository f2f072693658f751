//! Clipboard direction policy.

use serde::{Deserialize, Serialize};

/// Which clipboard directions the session permits.
///
/// Parsed from the session flag the client environment supplies: `"true"`
/// enables both directions, `"out"` only server-to-client reads, `"in"`
/// only client-to-server writes, anything else disables the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardPolicy {
    #[default]
    Disabled,
    /// Server-to-client only.
    Outbound,
    /// Client-to-server only.
    Inbound,
    Bidirectional,
}

impl ClipboardPolicy {
    /// Parse the session flag, case-insensitively.
    pub fn from_flag(flag: &str) -> Self {
        match flag.to_ascii_lowercase().as_str() {
            "true" => Self::Bidirectional,
            "out" => Self::Outbound,
            "in" => Self::Inbound,
            _ => Self::Disabled,
        }
    }

    /// Whether clipboard reads (outbound content) are permitted.
    pub fn allows_read(self) -> bool {
        matches!(self, Self::Outbound | Self::Bidirectional)
    }

    /// Whether clipboard writes (inbound content) are permitted.
    pub fn allows_write(self) -> bool {
        matches!(self, Self::Inbound | Self::Bidirectional)
    }
}
