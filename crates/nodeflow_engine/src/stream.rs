// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary stream protocol.
//!
//! Every encoding is little-endian with a fixed width; `usize` counts travel
//! as `u64`. Streams are forward-only and carry a single sticky status: once
//! an operation fails, all later reads and writes are no-ops and the first
//! error is kept, so a caller can issue a whole sequence of operations and
//! check [`InputStream::status`] / [`OutputStream::status`] once at the end.
//!
//! Text comes in two flavours:
//! - narrow strings: byte count followed by UTF-8 bytes (type identifiers, slot ids)
//! - wide strings: code unit count followed by 32-bit Unicode scalar values
//!   (user-facing text such as node names and string values)

use std::io::{ErrorKind, Read, Write};

/// Largest chunk allocated at once while reading a length-prefixed payload.
const READ_CHUNK: usize = 64 * 1024;

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Error state of a stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Not enough bytes left to satisfy a read
    #[error("Truncated stream: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes requested
        needed: usize,
        /// Bytes still available
        remaining: usize,
    },

    /// Stored object version is newer than this build understands
    #[error("Unsupported format version {found} for {type_id} (newest known: {supported})")]
    FormatVersion {
        /// Type identifier from the header
        type_id: String,
        /// Version found in the stream
        found: u32,
        /// Newest version this build can read
        supported: u32,
    },

    /// Dynamic header names a type that is not registered
    #[error("Unknown type identifier: {0}")]
    UnknownType(String),

    /// Structurally invalid content
    #[error("Malformed stream: {0}")]
    Malformed(String),

    /// Underlying reader or writer failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Sink for binary data
pub trait OutputStream {
    /// Append raw bytes. Ignored once the stream is in an error state.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Current status; `Err` holds the first error that occurred.
    fn status(&self) -> StreamResult<()>;

    /// Put the stream into the error state. The first error wins.
    fn fail(&mut self, error: StreamError);

    /// Write a boolean as a single byte
    fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Write an unsigned byte
    fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Write a 16-bit signed integer
    fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 32-bit signed integer
    fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 32-bit unsigned integer
    fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 64-bit unsigned integer
    fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 32-bit float
    fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 64-bit float
    fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write an element count
    fn write_count(&mut self, count: usize) {
        self.write_u64(count as u64);
    }

    /// Write a narrow (UTF-8) string
    fn write_str(&mut self, value: &str) {
        self.write_count(value.len());
        self.write_bytes(value.as_bytes());
    }

    /// Write a wide string as 32-bit code units
    fn write_wide_str(&mut self, value: &str) {
        let units: Vec<u8> = value
            .chars()
            .flat_map(|ch| u32::from(ch).to_le_bytes())
            .collect();
        self.write_count(units.len() / 4);
        self.write_bytes(&units);
    }
}

/// Source of binary data
pub trait InputStream {
    /// Fill `buf` completely. On failure the stream enters the error state
    /// and the contents of `buf` are unspecified.
    fn read_bytes(&mut self, buf: &mut [u8]);

    /// Current status; `Err` holds the first error that occurred.
    fn status(&self) -> StreamResult<()>;

    /// Put the stream into the error state. The first error wins.
    fn fail(&mut self, error: StreamError);

    /// Number of bytes known to remain, if the stream can tell.
    fn remaining(&self) -> Option<usize> {
        None
    }

    /// Whether no error has occurred so far
    fn is_ok(&self) -> bool {
        self.status().is_ok()
    }

    /// Read a boolean byte (0 or 1)
    fn read_bool(&mut self) -> bool {
        match self.read_u8() {
            0 => false,
            1 => true,
            other => {
                self.fail(StreamError::Malformed(format!("invalid bool byte {other}")));
                false
            }
        }
    }

    /// Read an unsigned byte
    fn read_u8(&mut self) -> u8 {
        let mut buf = [0u8; 1];
        self.read_bytes(&mut buf);
        buf[0]
    }

    /// Read a 16-bit signed integer
    fn read_i16(&mut self) -> i16 {
        let mut buf = [0u8; 2];
        self.read_bytes(&mut buf);
        i16::from_le_bytes(buf)
    }

    /// Read a 32-bit signed integer
    fn read_i32(&mut self) -> i32 {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf);
        i32::from_le_bytes(buf)
    }

    /// Read a 32-bit unsigned integer
    fn read_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    /// Read a 64-bit unsigned integer
    fn read_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Read a 32-bit float
    fn read_f32(&mut self) -> f32 {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf);
        f32::from_le_bytes(buf)
    }

    /// Read a 64-bit float
    fn read_f64(&mut self) -> f64 {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf);
        f64::from_le_bytes(buf)
    }

    /// Read an element count
    fn read_count(&mut self) -> usize {
        let count = self.read_u64();
        match usize::try_from(count) {
            Ok(count) => count,
            Err(_) => {
                self.fail(StreamError::Malformed(format!("count {count} out of range")));
                0
            }
        }
    }

    /// Read exactly `len` bytes into a fresh buffer.
    ///
    /// The length is checked against the remaining input before anything is
    /// allocated; streams that cannot tell are read in bounded chunks.
    fn read_byte_vec(&mut self, len: usize) -> Vec<u8> {
        if !self.is_ok() {
            return Vec::new();
        }
        if let Some(remaining) = self.remaining() {
            if len > remaining {
                self.fail(StreamError::Truncated { needed: len, remaining });
                return Vec::new();
            }
        }
        let mut out = Vec::new();
        while out.len() < len {
            let start = out.len();
            let chunk = (len - start).min(READ_CHUNK);
            out.resize(start + chunk, 0);
            self.read_bytes(&mut out[start..]);
            if !self.is_ok() {
                return Vec::new();
            }
        }
        out
    }

    /// Read a narrow (UTF-8) string
    fn read_str(&mut self) -> String {
        let len = self.read_count();
        let bytes = self.read_byte_vec(len);
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                self.fail(StreamError::Malformed("invalid UTF-8 in string".into()));
                String::new()
            }
        }
    }

    /// Read a wide string of 32-bit code units
    fn read_wide_str(&mut self) -> String {
        let count = self.read_count();
        let Some(byte_len) = count.checked_mul(4) else {
            self.fail(StreamError::Malformed(format!("string length {count} out of range")));
            return String::new();
        };
        let bytes = self.read_byte_vec(byte_len);
        let mut text = String::with_capacity(bytes.len() / 4);
        for unit in bytes.chunks_exact(4) {
            let code = u32::from_le_bytes([unit[0], unit[1], unit[2], unit[3]]);
            match char::from_u32(code) {
                Some(ch) => text.push(ch),
                None => {
                    self.fail(StreamError::Malformed(format!("invalid code point {code:#x}")));
                    return String::new();
                }
            }
        }
        text
    }
}

/// Output stream collecting bytes in memory
#[derive(Debug, Default)]
pub struct MemoryOutputStream {
    buffer: Vec<u8>,
    error: Option<StreamError>,
}

impl MemoryOutputStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the stream, returning the buffer or the sticky error
    pub fn into_inner(self) -> StreamResult<Vec<u8>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.buffer),
        }
    }
}

impl OutputStream for MemoryOutputStream {
    fn write_bytes(&mut self, bytes: &[u8]) {
        if self.error.is_none() {
            self.buffer.extend_from_slice(bytes);
        }
    }

    fn status(&self) -> StreamResult<()> {
        self.error.clone().map_or(Ok(()), Err)
    }

    fn fail(&mut self, error: StreamError) {
        self.error.get_or_insert(error);
    }
}

/// Bounds-checked input stream over a byte slice
#[derive(Debug)]
pub struct MemoryInputStream<'a> {
    buffer: &'a [u8],
    position: usize,
    error: Option<StreamError>,
}

impl<'a> MemoryInputStream<'a> {
    /// Create a stream reading from the start of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
            error: None,
        }
    }

    /// Current read offset
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether every byte has been consumed
    pub fn is_at_end(&self) -> bool {
        self.position == self.buffer.len()
    }
}

impl InputStream for MemoryInputStream<'_> {
    fn read_bytes(&mut self, buf: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        let remaining = self.buffer.len() - self.position;
        if buf.len() > remaining {
            self.fail(StreamError::Truncated {
                needed: buf.len(),
                remaining,
            });
            return;
        }
        let end = self.position + buf.len();
        buf.copy_from_slice(&self.buffer[self.position..end]);
        self.position = end;
    }

    fn status(&self) -> StreamResult<()> {
        self.error.clone().map_or(Ok(()), Err)
    }

    fn fail(&mut self, error: StreamError) {
        self.error.get_or_insert(error);
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.buffer.len() - self.position)
    }
}

/// Output stream adapter over any [`Write`]
#[derive(Debug)]
pub struct WriterOutputStream<W: Write> {
    writer: W,
    error: Option<StreamError>,
}

impl<W: Write> WriterOutputStream<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer, error: None }
    }

    /// Flush and return the writer, or the sticky error
    pub fn finish(mut self) -> StreamResult<W> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.writer
            .flush()
            .map_err(|e| StreamError::Io(e.to_string()))?;
        Ok(self.writer)
    }
}

impl<W: Write> OutputStream for WriterOutputStream<W> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_all(bytes) {
            self.fail(StreamError::Io(e.to_string()));
        }
    }

    fn status(&self) -> StreamResult<()> {
        self.error.clone().map_or(Ok(()), Err)
    }

    fn fail(&mut self, error: StreamError) {
        self.error.get_or_insert(error);
    }
}

/// Forward-only input stream adapter over any [`Read`]
#[derive(Debug)]
pub struct ReaderInputStream<R: Read> {
    reader: R,
    error: Option<StreamError>,
}

impl<R: Read> ReaderInputStream<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self { reader, error: None }
    }

    /// Return the wrapped reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> InputStream for ReaderInputStream<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.fail(StreamError::Truncated {
                        needed: buf.len(),
                        remaining: filled,
                    });
                    return;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    self.fail(StreamError::Io(e.to_string()));
                    return;
                }
            }
        }
    }

    fn status(&self) -> StreamResult<()> {
        self.error.clone().map_or(Ok(()), Err)
    }

    fn fail(&mut self, error: StreamError) {
        self.error.get_or_insert(error);
    }
}
