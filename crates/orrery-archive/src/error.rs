//! Error types for the archive.

use std::fmt;
use std::io;

use orrery_core::{SystemLayout, TimeStep};

/// Errors that can occur while writing or reading the archive.
#[derive(Debug)]
pub enum ArchiveError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The header does not start with the expected `b"ORRA"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the header.
        found: u8,
    },
    /// The archive was written for a different number of bodies.
    LayoutMismatch {
        /// Layout recorded in the archive (or expected by it).
        archived: SystemLayout,
        /// Layout supplied by the caller.
        supplied: SystemLayout,
    },
    /// The archive was written for a different system.
    SystemMismatch {
        /// Hash recorded in the header.
        recorded: u64,
        /// Hash of the current system.
        current: u64,
    },
    /// Part of the requested range has not been archived.
    RangeNotArchived {
        /// First requested timestep.
        start: TimeStep,
        /// One past the last requested timestep.
        end: TimeStep,
        /// Highest archived timestep, or 0 when empty.
        latest: TimeStep,
    },
    /// An appended snapshot does not continue the archive.
    NonContiguousAppend {
        /// The timestep the archive expects next.
        expected: TimeStep,
        /// The timestep supplied.
        found: TimeStep,
    },
    /// Stored data could not be decoded.
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"ORRA\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::LayoutMismatch { archived, supplied } => write!(
                f,
                "layout mismatch: archive has {}+{} bodies, got {}+{}",
                archived.planets, archived.satellites, supplied.planets, supplied.satellites
            ),
            Self::SystemMismatch { recorded, current } => write!(
                f,
                "system hash mismatch: recorded={recorded:#018x}, current={current:#018x}"
            ),
            Self::RangeNotArchived { start, end, latest } => write!(
                f,
                "timesteps [{start}, {end}) not archived (latest archived: {latest})"
            ),
            Self::NonContiguousAppend { expected, found } => write!(
                f,
                "non-contiguous append: expected timestep {expected}, got {found}"
            ),
            Self::Malformed { detail } => write!(f, "malformed archive: {detail}"),
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
