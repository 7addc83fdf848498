//! Payload mode envelope.
//!
//! The application prefixes every payload with a 2-bit mode tag, written as
//! two `'0'`/`'1'` characters, before handing it to the link. Layers below
//! never look inside: compression, FEC and framing see one opaque string.

use crate::error::EnvelopeError;
use std::fmt;

/// Application-level payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadMode {
    /// Raw application data
    Legacy,
    /// Authentication challenge or token
    Auth,
    /// Configuration by reference
    Config,
    /// Signed command
    Command,
}

impl PayloadMode {
    /// Mode for a 2-bit tag value.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0b00 => Some(PayloadMode::Legacy),
            0b01 => Some(PayloadMode::Auth),
            0b10 => Some(PayloadMode::Config),
            0b11 => Some(PayloadMode::Command),
            _ => None,
        }
    }

    /// The tag as it appears on the wire, e.g. `"10"`.
    pub fn prefix(self) -> &'static str {
        match self {
            PayloadMode::Legacy => "00",
            PayloadMode::Auth => "01",
            PayloadMode::Config => "10",
            PayloadMode::Command => "11",
        }
    }
}

impl fmt::Display for PayloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadMode::Legacy => "legacy",
            PayloadMode::Auth => "auth",
            PayloadMode::Config => "config",
            PayloadMode::Command => "command",
        };
        f.write_str(name)
    }
}

/// A payload with its mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub mode: PayloadMode,
    pub body: String,
}

impl Envelope {
    pub fn new(mode: PayloadMode, body: impl Into<String>) -> Self {
        Self {
            mode,
            body: body.into(),
        }
    }

    /// Prefix `body` with the tag for `mode`.
    pub fn wrap(mode: PayloadMode, body: &str) -> String {
        let mut wrapped = String::with_capacity(2 + body.len());
        wrapped.push_str(mode.prefix());
        wrapped.push_str(body);
        wrapped
    }

    /// Serialized form.
    pub fn to_wire(&self) -> String {
        Self::wrap(self.mode, &self.body)
    }

    /// Split a received string into mode and body.
    ///
    /// # Errors
    /// - `EnvelopeError::MissingTag` if shorter than the tag
    /// - `EnvelopeError::InvalidTag` if the tag is not two binary digits
    pub fn parse(wire: &str) -> Result<Self, EnvelopeError> {
        let tag = match wire.get(..2) {
            Some(tag) => tag,
            None if wire.len() < 2 => return Err(EnvelopeError::MissingTag),
            None => return Err(EnvelopeError::InvalidTag(wire.chars().take(1).collect())),
        };

        let mut value = 0u8;
        for c in tag.chars() {
            let bit = match c {
                '0' => 0,
                '1' => 1,
                _ => return Err(EnvelopeError::InvalidTag(tag.to_string())),
            };
            value = (value << 1) | bit;
        }

        let mode = PayloadMode::from_tag(value).ok_or_else(|| EnvelopeError::InvalidTag(tag.to_string()))?;

        Ok(Self {
            mode,
            body: wire[2..].to_string(),
        })
    }

    /// Parse from received bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let wire = std::str::from_utf8(bytes).map_err(|_| EnvelopeError::InvalidUtf8)?;
        Self::parse(wire)
    }
}
