//! Outbound commands: a one-byte opcode followed by a fixed parameter record.
//!
//! ```text
//! 0x00 nop                  -
//! 0x01 request IDR          -
//! 0x10..0x13 touch          id:u32 x:i32 y:i32     (begin/move/end/cancel)
//! 0x20 key char             code:u32
//! 0x21/0x22 key down/up     vk:u32
//! 0x28 mouse move           x:i32 y:i32
//! 0x29 mouse buttons        bits:u32
//! 0x2a mouse wheel          x:i32 y:i32
//! 0x30 encode parameters    mode:u32 value:u32
//! ```
//!
//! Parameters are little-endian, like the rest of the wire layout.

use std::io::{ErrorKind, Read};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ChunkError, Result};

pub const OP_NOP: u8 = 0x00;
pub const OP_REQUEST_IDR: u8 = 0x01;
pub const OP_TOUCH_BEGIN: u8 = 0x10;
pub const OP_TOUCH_MOVE: u8 = 0x11;
pub const OP_TOUCH_END: u8 = 0x12;
pub const OP_TOUCH_CANCEL: u8 = 0x13;
pub const OP_KEY_CHAR: u8 = 0x20;
pub const OP_KEY_DOWN: u8 = 0x21;
pub const OP_KEY_UP: u8 = 0x22;
pub const OP_MOUSE_MOVE: u8 = 0x28;
pub const OP_MOUSE_BUTTONS: u8 = 0x29;
pub const OP_MOUSE_WHEEL: u8 = 0x2a;
pub const OP_SET_ENCODE_PARAMS: u8 = 0x30;

/// Longest parameter record (touch: id + x + y).
const MAX_PARAMS_LEN: usize = 12;

/// Encoder rate-control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    ConstantQp = 0,
    ConstantRate = 1,
}

impl TryFrom<u32> for RateControl {
    type Error = ChunkError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::ConstantQp),
            1 => Ok(Self::ConstantRate),
            other => Err(ChunkError::UnknownRateControl(other)),
        }
    }
}

/// Pressed mouse buttons as a bitfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseButtons(u32);

impl MouseButtons {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const MIDDLE: Self = Self(1 << 2);
    pub const X1: Self = Self(1 << 3);
    pub const X2: Self = Self(1 << 4);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A message from the client to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Nop,
    RequestIdr,
    TouchBegin { id: u32, x: i32, y: i32 },
    TouchMove { id: u32, x: i32, y: i32 },
    TouchEnd { id: u32, x: i32, y: i32 },
    TouchCancel { id: u32, x: i32, y: i32 },
    KeyChar { code: u32 },
    KeyDown { vk: u32 },
    KeyUp { vk: u32 },
    MouseMove { x: i32, y: i32 },
    MouseButtons(MouseButtons),
    /// Only `y` is meaningful to current hosts.
    MouseWheel { x: i32, y: i32 },
    SetEncodeParams { mode: RateControl, value: u32 },
}

impl Command {
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Nop => OP_NOP,
            Command::RequestIdr => OP_REQUEST_IDR,
            Command::TouchBegin { .. } => OP_TOUCH_BEGIN,
            Command::TouchMove { .. } => OP_TOUCH_MOVE,
            Command::TouchEnd { .. } => OP_TOUCH_END,
            Command::TouchCancel { .. } => OP_TOUCH_CANCEL,
            Command::KeyChar { .. } => OP_KEY_CHAR,
            Command::KeyDown { .. } => OP_KEY_DOWN,
            Command::KeyUp { .. } => OP_KEY_UP,
            Command::MouseMove { .. } => OP_MOUSE_MOVE,
            Command::MouseButtons(_) => OP_MOUSE_BUTTONS,
            Command::MouseWheel { .. } => OP_MOUSE_WHEEL,
            Command::SetEncodeParams { .. } => OP_SET_ENCODE_PARAMS,
        }
    }

    /// Opcode byte plus parameter record.
    pub fn encoded_len(&self) -> usize {
        // Every opcode produced by `opcode()` has a known parameter length.
        1 + params_len(self.opcode()).unwrap_or(0)
    }

    /// Serialize into a standalone buffer, ready to enqueue.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    pub fn encode_into(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.opcode());
        match *self {
            Command::Nop | Command::RequestIdr => {}
            Command::TouchBegin { id, x, y }
            | Command::TouchMove { id, x, y }
            | Command::TouchEnd { id, x, y }
            | Command::TouchCancel { id, x, y } => {
                dst.put_u32_le(id);
                dst.put_i32_le(x);
                dst.put_i32_le(y);
            }
            Command::KeyChar { code } => dst.put_u32_le(code),
            Command::KeyDown { vk } | Command::KeyUp { vk } => dst.put_u32_le(vk),
            Command::MouseMove { x, y } | Command::MouseWheel { x, y } => {
                dst.put_i32_le(x);
                dst.put_i32_le(y);
            }
            Command::MouseButtons(buttons) => dst.put_u32_le(buttons.bits()),
            Command::SetEncodeParams { mode, value } => {
                dst.put_u32_le(mode as u32);
                dst.put_u32_le(value);
            }
        }
    }

    /// Decode one command from the front of `src`.
    ///
    /// Returns `Ok(None)` if `src` does not hold a complete command yet,
    /// otherwise the command and the number of bytes it occupied.
    pub fn decode(src: &[u8]) -> Result<Option<(Command, usize)>> {
        let Some(&opcode) = src.first() else {
            return Ok(None);
        };
        let total = 1 + params_len(opcode)?;
        if src.len() < total {
            return Ok(None);
        }

        let mut p = &src[1..total];
        let command = match opcode {
            OP_NOP => Command::Nop,
            OP_REQUEST_IDR => Command::RequestIdr,
            OP_TOUCH_BEGIN | OP_TOUCH_MOVE | OP_TOUCH_END | OP_TOUCH_CANCEL => {
                let (id, x, y) = (p.get_u32_le(), p.get_i32_le(), p.get_i32_le());
                match opcode {
                    OP_TOUCH_BEGIN => Command::TouchBegin { id, x, y },
                    OP_TOUCH_MOVE => Command::TouchMove { id, x, y },
                    OP_TOUCH_END => Command::TouchEnd { id, x, y },
                    _ => Command::TouchCancel { id, x, y },
                }
            }
            OP_KEY_CHAR => Command::KeyChar {
                code: p.get_u32_le(),
            },
            OP_KEY_DOWN => Command::KeyDown { vk: p.get_u32_le() },
            OP_KEY_UP => Command::KeyUp { vk: p.get_u32_le() },
            OP_MOUSE_MOVE => Command::MouseMove {
                x: p.get_i32_le(),
                y: p.get_i32_le(),
            },
            OP_MOUSE_BUTTONS => Command::MouseButtons(MouseButtons::from_bits(p.get_u32_le())),
            OP_MOUSE_WHEEL => Command::MouseWheel {
                x: p.get_i32_le(),
                y: p.get_i32_le(),
            },
            OP_SET_ENCODE_PARAMS => Command::SetEncodeParams {
                mode: RateControl::try_from(p.get_u32_le())?,
                value: p.get_u32_le(),
            },
            other => return Err(ChunkError::UnknownOpcode(other)),
        };

        Ok(Some((command, total)))
    }

    /// Read one command from a blocking stream (host side).
    ///
    /// A stream that ends anywhere inside a command yields `EndOfStream`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Command> {
        let mut buf = [0u8; 1 + MAX_PARAMS_LEN];
        read_exact_or_eof(reader, &mut buf[..1])?;
        let total = 1 + params_len(buf[0])?;
        read_exact_or_eof(reader, &mut buf[1..total])?;

        match Command::decode(&buf[..total])? {
            Some((command, _)) => Ok(command),
            None => Err(ChunkError::Truncated {
                what: "command",
                needed: total,
                available: total,
            }),
        }
    }
}

impl From<Command> for Bytes {
    fn from(command: Command) -> Self {
        command.encode()
    }
}

fn params_len(opcode: u8) -> Result<usize> {
    match opcode {
        OP_NOP | OP_REQUEST_IDR => Ok(0),
        OP_TOUCH_BEGIN | OP_TOUCH_MOVE | OP_TOUCH_END | OP_TOUCH_CANCEL => Ok(12),
        OP_KEY_CHAR | OP_KEY_DOWN | OP_KEY_UP | OP_MOUSE_BUTTONS => Ok(4),
        OP_MOUSE_MOVE | OP_MOUSE_WHEEL | OP_SET_ENCODE_PARAMS => Ok(8),
        other => Err(ChunkError::UnknownOpcode(other)),
    }
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => ChunkError::EndOfStream,
        _ => ChunkError::Io(err),
    })
}
