//! Binary encode/decode for the archive format.
//!
//! All integers and floats are little-endian. Vectors are three
//! consecutive `f64` components. There is no padding and no
//! self-describing schema: the header fixes every row size.

use std::io::{Read, Write};

use glam::DVec3;
use orrery_core::{SystemLayout, TimeStep};

use crate::error::ArchiveError;
use crate::{FORMAT_VERSION, MAGIC};

/// Byte offset of the committed row counter inside the header.
pub const COMMITTED_OFFSET: u64 = 4 + 1 + 4 + 4 + 8 + 8;

/// Total header size in bytes.
pub const HEADER_LEN: u64 = COMMITTED_OFFSET + 8;

/// Encoded size of one vector.
pub const VEC3_BYTES: usize = 24;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), ArchiveError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), ArchiveError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ArchiveError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Append a vector's three little-endian f64 components to `buf`.
pub fn put_dvec3(buf: &mut Vec<u8>, v: DVec3) {
    buf.extend_from_slice(&v.x.to_le_bytes());
    buf.extend_from_slice(&v.y.to_le_bytes());
    buf.extend_from_slice(&v.z.to_le_bytes());
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, ArchiveError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, ArchiveError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, ArchiveError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Decode a vector from exactly [`VEC3_BYTES`] bytes.
pub fn get_dvec3(bytes: &[u8]) -> Result<DVec3, ArchiveError> {
    if bytes.len() != VEC3_BYTES {
        return Err(ArchiveError::Malformed {
            detail: format!("vector needs {VEC3_BYTES} bytes, got {}", bytes.len()),
        });
    }
    let mut parts = [0.0f64; 3];
    for (part, chunk) in parts.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *part = f64::from_le_bytes(raw);
    }
    Ok(DVec3::from_array(parts))
}

// ── Header encode/decode ────────────────────────────────────────

/// Decoded archive header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Body counts of every archived snapshot.
    pub layout: SystemLayout,
    /// Timestep of row 0.
    pub first_timestep: TimeStep,
    /// Fingerprint of the system that produced the rows.
    pub system_hash: u64,
    /// Rows visible to readers.
    pub committed_rows: u64,
}

/// Encode the full header.
pub fn encode_header(w: &mut dyn Write, header: &ArchiveHeader) -> Result<(), ArchiveError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_u32_le(w, count_to_u32(header.layout.planets)?)?;
    write_u32_le(w, count_to_u32(header.layout.satellites)?)?;
    write_u64_le(w, header.first_timestep.0)?;
    write_u64_le(w, header.system_hash)?;
    write_u64_le(w, header.committed_rows)?;
    Ok(())
}

/// Decode and validate the full header.
pub fn decode_header(r: &mut dyn Read) -> Result<ArchiveHeader, ArchiveError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(ArchiveError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion { found: version });
    }
    let planets = read_u32_le(r)? as usize;
    let satellites = read_u32_le(r)? as usize;
    let first_timestep = TimeStep(read_u64_le(r)?);
    if first_timestep.0 == 0 {
        return Err(ArchiveError::Malformed {
            detail: "first timestep is 0".into(),
        });
    }
    Ok(ArchiveHeader {
        layout: SystemLayout {
            planets,
            satellites,
        },
        first_timestep,
        system_hash: read_u64_le(r)?,
        committed_rows: read_u64_le(r)?,
    })
}

fn count_to_u32(n: usize) -> Result<u32, ArchiveError> {
    u32::try_from(n).map_err(|_| ArchiveError::Malformed {
        detail: format!("body count {n} exceeds u32::MAX"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> ArchiveHeader {
        ArchiveHeader {
            layout: SystemLayout {
                planets: 3,
                satellites: 2,
            },
            first_timestep: TimeStep(1),
            system_hash: 0xdead_beef,
            committed_rows: 42,
        }
    }

    #[test]
    fn header_has_fixed_length() {
        let mut buf = Vec::new();
        encode_header(&mut buf, &header()).unwrap();
        assert_eq!(buf.len() as u64, HEADER_LEN);
        let committed = &buf[COMMITTED_OFFSET as usize..];
        assert_eq!(committed, &42u64.to_le_bytes());
    }

    #[test]
    fn header_decodes() {
        let mut buf = Vec::new();
        encode_header(&mut buf, &header()).unwrap();
        assert_eq!(decode_header(&mut buf.as_slice()).unwrap(), header());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut buf = Vec::new();
        encode_header(&mut buf, &header()).unwrap();
        buf[0] = b'X';
        match decode_header(&mut buf.as_slice()) {
            Err(ArchiveError::InvalidMagic) => {}
            other => panic!("expected InvalidMagic, got {other:?}"),
        }
    }

    #[test]
    fn future_version_rejected() {
        let mut buf = Vec::new();
        encode_header(&mut buf, &header()).unwrap();
        buf[4] = FORMAT_VERSION + 1;
        match decode_header(&mut buf.as_slice()) {
            Err(ArchiveError::UnsupportedVersion { found }) => {
                assert_eq!(found, FORMAT_VERSION + 1)
            }
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn truncated_header_is_io_error() {
        let mut buf = Vec::new();
        encode_header(&mut buf, &header()).unwrap();
        buf.truncate(10);
        match decode_header(&mut buf.as_slice()) {
            Err(ArchiveError::Io(_)) => {}
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn dvec3_preserves_bits() {
        let v = DVec3::new(-0.0, f64::MIN_POSITIVE, 1.0e300);
        let mut buf = Vec::new();
        put_dvec3(&mut buf, v);
        let back = get_dvec3(&buf).unwrap();
        assert_eq!(back.x.to_bits(), v.x.to_bits());
        assert_eq!(back.y, v.y);
        assert_eq!(back.z, v.z);
    }

    #[test]
    fn short_vector_is_malformed() {
        match get_dvec3(&[0u8; 16]) {
            Err(ArchiveError::Malformed { .. }) => {}
            other => panic!("expected Malformed, got {other:?}"),
        }
    }
}
