// SPDX-License-Identifier: MIT OR Apache-2.0
//! Versioned object headers.
//!
//! Both header kinds share one wire layout: the type identifier as a narrow
//! string followed by the version as `u32`. They differ in how the reader
//! uses them:
//! - a static header precedes a fixed-schema type; the reader already knows
//!   the type and only validates the identifier and version
//! - a dynamic header precedes a polymorphic object; the reader resolves the
//!   identifier through the [`TypeRegistry`](crate::registry::TypeRegistry)
//!   to construct the concrete type before reading its fields

use crate::stream::{InputStream, OutputStream, StreamError};

/// Per-type serialization record: stable identifier and current version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializationInfo {
    /// Stable type identifier, never changed once published
    pub type_id: &'static str,
    /// Newest format version this build writes and reads
    pub version: u32,
}

impl SerializationInfo {
    /// Create a serialization record
    pub const fn new(type_id: &'static str, version: u32) -> Self {
        Self { type_id, version }
    }

    /// Fail the stream if `found` is newer than this build understands
    pub fn check_version(&self, stream: &mut dyn InputStream, found: u32) {
        if found > self.version {
            stream.fail(StreamError::FormatVersion {
                type_id: self.type_id.to_string(),
                found,
                supported: self.version,
            });
        }
    }
}

/// Header as it was read from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Type identifier
    pub type_id: String,
    /// Stored version
    pub version: u32,
}

impl ObjectHeader {
    /// Read a raw header without interpreting it
    pub fn read(stream: &mut dyn InputStream) -> Self {
        let type_id = stream.read_str();
        let version = stream.read_u32();
        Self { type_id, version }
    }
}

/// Write a header for `info`
pub fn write_header(stream: &mut dyn OutputStream, info: &SerializationInfo) {
    stream.write_str(info.type_id);
    stream.write_u32(info.version);
}

/// Read and validate the static header of a fixed-schema type.
///
/// Returns the stored version so the caller can migrate older layouts.
/// An identifier mismatch or a newer version fails the stream.
pub fn read_static_header(stream: &mut dyn InputStream, info: &SerializationInfo) -> u32 {
    let header = ObjectHeader::read(stream);
    if !stream.is_ok() {
        return 0;
    }
    if header.type_id != info.type_id {
        stream.fail(StreamError::Malformed(format!(
            "expected {} header, found {}",
            info.type_id, header.type_id
        )));
        return 0;
    }
    info.check_version(stream, header.version);
    header.version
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemoryInputStream, MemoryOutputStream};

    const INFO: SerializationInfo = SerializationInfo::new("Sample", 2);

    #[test]
    fn test_static_header_accepts_older_versions() {
        let mut out = MemoryOutputStream::new();
        write_header(&mut out, &SerializationInfo::new("Sample", 1));
        let bytes = out.into_inner().unwrap();

        let mut input = MemoryInputStream::new(&bytes);
        assert_eq!(read_static_header(&mut input, &INFO), 1);
        assert!(input.status().is_ok());
    }

    #[test]
    fn test_static_header_rejects_newer_version() {
        let mut out = MemoryOutputStream::new();
        write_header(&mut out, &SerializationInfo::new("Sample", 3));
        let bytes = out.into_inner().unwrap();

        let mut input = MemoryInputStream::new(&bytes);
        read_static_header(&mut input, &INFO);
        assert_eq!(
            input.status(),
            Err(StreamError::FormatVersion {
                type_id: "Sample".into(),
                found: 3,
                supported: 2
            })
        );
    }

    #[test]
    fn test_static_header_rejects_other_type() {
        let mut out = MemoryOutputStream::new();
        write_header(&mut out, &SerializationInfo::new("Other", 1));
        let bytes = out.into_inner().unwrap();

        let mut input = MemoryInputStream::new(&bytes);
        read_static_header(&mut input, &INFO);
        assert!(matches!(input.status(), Err(StreamError::Malformed(_))));
    }
}
