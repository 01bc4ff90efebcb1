//! The byte sink all PTH sections are emitted through.

use std::io::{Seek, SeekFrom, Write};

/// A position-tracked little-endian byte sink.
///
/// All multi-byte values are emitted fixed little-endian; on big-endian hosts
/// the helpers swap explicitly rather than copying host integers. The tracked
/// position is `u64` while every offset embedded in the artifact is `u32`, so
/// [`Emitter::offset`] is the single place a 4 GiB overflow can be caught.
#[derive(Debug)]
pub struct Emitter<W> {
    out: W,
    position: u64,
}

impl<W: Write + Seek> Emitter<W> {
    /// Creates an emitter at position zero of `out`.
    pub fn new(out: W) -> Self {
        Emitter { out, position: 0 }
    }

    /// The current write position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The current write position as an artifact offset.
    pub fn offset(&self) -> u32 {
        debug_assert!(self.position <= u64::from(u32::MAX));
        self.position as u32
    }

    /// Writes raw bytes.
    pub fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.out.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Emits a single byte.
    pub fn emit_u8(&mut self, value: u8) -> std::io::Result<()> {
        self.write_all(&[value])
    }

    /// Emits the low 16 bits of `value` little-endian.
    ///
    /// The high bits must be zero; release builds truncate silently.
    pub fn emit_u16(&mut self, value: u32) -> std::io::Result<()> {
        debug_assert_eq!(value >> 16, 0);
        self.write_all(&(value as u16).to_le_bytes())
    }

    /// Emits the low 24 bits of `value` little-endian.
    ///
    /// The high bits must be zero; release builds truncate silently.
    pub fn emit_u24(&mut self, value: u32) -> std::io::Result<()> {
        debug_assert_eq!(value >> 24, 0);
        self.write_all(&value.to_le_bytes()[..3])
    }

    /// Emits a `u32` little-endian.
    pub fn emit_u32(&mut self, value: u32) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    /// Emits a `u64` little-endian.
    pub fn emit_u64(&mut self, value: u64) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    /// Pads with zero bytes to the next multiple of `align`.
    ///
    /// `align` must be a power of two.
    pub fn pad(&mut self, align: u64) -> std::io::Result<()> {
        debug_assert!(align.is_power_of_two());
        let n = (align - self.position % align) % align;
        for _ in 0..n {
            self.emit_u8(0)?;
        }
        Ok(())
    }

    /// Seeks to an absolute position, for prologue back-patching.
    pub fn seek(&mut self, position: u64) -> std::io::Result<()> {
        self.out.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    /// Unwraps the emitter, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}
