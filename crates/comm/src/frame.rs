//! Wire format of the TCP process group
//!
//! Each frame is a little-endian `u32` body length followed by the body:
//!
//! ```text
//! +------+----+-------+------------------+
//! | kind | op | count | count x u64 (LE) |
//! | u8   | u8 | u32   |                  |
//! +------+----+-------+------------------+
//! ```
//!
//! Floating point payloads travel as their IEEE-754 bit patterns.

use crate::communicator::ReduceOp;
use crate::error::{CommError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Fixed part of a frame body: kind + op + count
const BODY_HEADER_LEN: u32 = 1 + 1 + 4;

/// Upper bound on a frame body; larger lengths indicate a corrupt stream
pub(crate) const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Hello = 1,
    ReduceF64 = 2,
    ReduceU64 = 3,
    Barrier = 4,
    Finalize = 5,
    Reply = 6,
}

impl FrameKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FrameKind::Hello),
            2 => Some(FrameKind::ReduceF64),
            3 => Some(FrameKind::ReduceU64),
            4 => Some(FrameKind::Barrier),
            5 => Some(FrameKind::Finalize),
            6 => Some(FrameKind::Reply),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Frame {
    pub kind: FrameKind,
    pub op: ReduceOp,
    pub values: Vec<u64>,
}

impl Frame {
    pub fn new(kind: FrameKind, op: ReduceOp, values: Vec<u64>) -> Self {
        Self { kind, op, values }
    }

    pub fn hello(rank: usize, size: usize) -> Self {
        Self::new(FrameKind::Hello, ReduceOp::Sum, vec![rank as u64, size as u64])
    }

    pub fn control(kind: FrameKind) -> Self {
        Self::new(kind, ReduceOp::Sum, Vec::new())
    }

    /// Human-readable call signature, used in mismatch reports
    pub fn describe(&self) -> String {
        match self.kind {
            FrameKind::Hello => "hello".to_string(),
            FrameKind::ReduceF64 => format!("all_reduce_f64({}, {})", self.op, self.values.len()),
            FrameKind::ReduceU64 => format!("all_reduce_u64({}, {})", self.op, self.values.len()),
            FrameKind::Barrier => "barrier".to_string(),
            FrameKind::Finalize => "finalize".to_string(),
            FrameKind::Reply => format!("reply({})", self.values.len()),
        }
    }

    /// Whether `other` is the same collective call as `self`
    pub fn same_call(&self, other: &Frame) -> bool {
        self.kind == other.kind && self.op == other.op && self.values.len() == other.values.len()
    }
}

pub(crate) fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<()> {
    let count = u32::try_from(frame.values.len())
        .map_err(|_| CommError::Protocol("frame payload too large".to_string()))?;
    let body_len = count
        .checked_mul(8)
        .and_then(|payload| payload.checked_add(BODY_HEADER_LEN))
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| CommError::Protocol(format!("frame of {count} values exceeds limit")))?;
    let mut buf = Vec::with_capacity(4 + body_len as usize);
    buf.write_u32::<LittleEndian>(body_len)?;
    buf.write_u8(frame.kind as u8)?;
    buf.write_u8(frame.op.code())?;
    buf.write_u32::<LittleEndian>(count)?;
    for value in &frame.values {
        buf.write_u64::<LittleEndian>(*value)?;
    }
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    let body_len = reader.read_u32::<LittleEndian>()?;
    if !(BODY_HEADER_LEN..=MAX_FRAME_LEN).contains(&body_len) {
        return Err(CommError::Protocol(format!("bad frame length {body_len}")));
    }
    let raw_kind = reader.read_u8()?;
    let kind = FrameKind::from_u8(raw_kind)
        .ok_or_else(|| CommError::Protocol(format!("unknown frame kind {raw_kind}")))?;
    let raw_op = reader.read_u8()?;
    let op = ReduceOp::from_code(raw_op)
        .ok_or_else(|| CommError::Protocol(format!("unknown reduce op {raw_op}")))?;
    let count = reader.read_u32::<LittleEndian>()?;
    let expected = count
        .checked_mul(8)
        .and_then(|payload| payload.checked_add(BODY_HEADER_LEN));
    if expected != Some(body_len) {
        return Err(CommError::Protocol(format!(
            "frame length {body_len} does not match {count} values"
        )));
    }
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        values.push(reader.read_u64::<LittleEndian>()?);
    }
    Ok(Frame { kind, op, values })
}

pub(crate) fn f64s_to_bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

pub(crate) fn bits_to_f64s(bits: &[u64], out: &mut [f64]) {
    for (slot, b) in out.iter_mut().zip(bits) {
        *slot = f64::from_bits(*b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_frame_round_trip() {
        let frame = Frame::new(
            FrameKind::ReduceF64,
            ReduceOp::Max,
            f64s_to_bits(&[1.0, -2.5]),
        );
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).unwrap();
        assert_eq!(buf.len(), 4 + 6 + 16);

        let decoded = read_frame(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, frame);
        let mut out = [0.0; 2];
        bits_to_f64s(&decoded.values, &mut out);
        assert_eq!(out, [1.0, -2.5]);
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(6).unwrap();
        buf.extend_from_slice(&[42, 0, 0, 0, 0, 0]);
        let err = read_frame(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CommError::Protocol(_)));
    }

    #[test]
    fn test_rejects_inconsistent_length() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(6).unwrap();
        buf.push(FrameKind::ReduceU64 as u8);
        buf.push(0);
        buf.write_u32::<LittleEndian>(3).unwrap();
        let err = read_frame(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CommError::Protocol(_)));
    }

    #[test]
    fn test_rejects_oversized_length() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(MAX_FRAME_LEN + 1).unwrap();
        let err = read_frame(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CommError::Protocol(_)));
    }

    #[test]
    fn test_truncated_stream_is_io_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Frame::control(FrameKind::Barrier)).unwrap();
        buf.truncate(5);
        let err = read_frame(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CommError::Io(_)));
    }

    #[test]
    fn test_same_call() {
        let a = Frame::new(FrameKind::ReduceU64, ReduceOp::Sum, vec![1]);
        let b = Frame::new(FrameKind::ReduceU64, ReduceOp::Sum, vec![9]);
        let c = Frame::new(FrameKind::ReduceU64, ReduceOp::Min, vec![9]);
        assert!(a.same_call(&b));
        assert!(!a.same_call(&c));
        assert_eq!(c.describe(), "all_reduce_u64(min, 1)");
    }
}
