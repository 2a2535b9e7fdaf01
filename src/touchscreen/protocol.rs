//! Touchscreen serial protocol
//!
//! Every frame in both directions ends with `FF FF FF`.
//!
//! Outbound instructions are ASCII (`btn1.val=1`, `t0.txt="128"`,
//! `get slider1.val`). Inbound frames start with a type byte:
//!
//! | first byte | meaning                                   |
//! |------------|-------------------------------------------|
//! | `0x23` `#` | component event, ASCII name follows       |
//! | `0x71`     | numeric reply, 4-byte little-endian `i32` |
//! | other      | status / unhandled return code            |

use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

/// Frame terminator
pub const TERMINATOR: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Leading byte of a component event
pub const EVENT_COMPONENT: u8 = 0x23;

/// Leading byte of a numeric reply
pub const RETURN_NUMBER: u8 = 0x71;

/// Numeric replies have a fixed length because the payload may contain 0xFF
const NUMBER_FRAME_LEN: usize = 1 + 4 + TERMINATOR.len();

/// Unterminated input beyond this is line noise and gets dropped
const MAX_PENDING: usize = 256;

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    /// A named widget or page reported an event
    Component(String),
    /// Reply to a `get` instruction
    Number(i32),
    /// Any other return code
    Status(u8),
}

/// Outbound instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `<property>=<value>`
    SetNumber { property: String, value: i32 },
    /// `<property>="<text>"`
    SetText { property: String, text: String },
    /// `get <property>`
    Get { property: String },
}

impl Instruction {
    pub fn set_number(property: impl Into<String>, value: i32) -> Self {
        Instruction::SetNumber {
            property: property.into(),
            value,
        }
    }

    pub fn set_text(property: impl Into<String>, text: impl Into<String>) -> Self {
        Instruction::SetText {
            property: property.into(),
            text: text.into(),
        }
    }

    pub fn get(property: impl Into<String>) -> Self {
        Instruction::Get {
            property: property.into(),
        }
    }

    /// Encode as wire bytes, terminator included
    pub fn encode(&self) -> Vec<u8> {
        let body = match self {
            Instruction::SetNumber { property, value } => format!("{}={}", property, value),
            Instruction::SetText { property, text } => {
                format!("{}=\"{}\"", property, text.replace('"', "\\\""))
            }
            Instruction::Get { property } => format!("get {}", property),
        };

        let mut bytes = body.into_bytes();
        bytes.extend_from_slice(&TERMINATOR);
        bytes
    }
}

/// Incremental frame decoder for the inbound byte stream
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the link
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete frame, if one is buffered
    pub fn next_event(&mut self) -> Option<ScreenEvent> {
        loop {
            let first = *self.buf.first()?;

            if first == RETURN_NUMBER {
                if self.buf.len() < NUMBER_FRAME_LEN {
                    return None;
                }
                if self.buf[5..NUMBER_FRAME_LEN] != TERMINATOR {
                    warn!("Malformed numeric reply, resynchronizing");
                    self.buf.advance(1);
                    continue;
                }
                let raw = [self.buf[1], self.buf[2], self.buf[3], self.buf[4]];
                self.buf.advance(NUMBER_FRAME_LEN);
                return Some(ScreenEvent::Number(i32::from_le_bytes(raw)));
            }

            let Some(end) = find_terminator(&self.buf) else {
                if self.buf.len() > MAX_PENDING {
                    warn!("Dropping {} unterminated bytes", self.buf.len());
                    self.buf.clear();
                }
                return None;
            };

            let frame = self.buf.split_to(end + TERMINATOR.len());
            let body = &frame[..end];
            trace!("Frame: {}", hex::encode(body));

            match body.split_first() {
                Some((&EVENT_COMPONENT, name)) if !name.is_empty() => {
                    return Some(ScreenEvent::Component(
                        String::from_utf8_lossy(name).into_owned(),
                    ));
                }
                Some((&code, _)) => return Some(ScreenEvent::Status(code)),
                // Bare terminator
                None => continue,
            }
        }
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}
