//! Append-only, durable snapshot archive for Orrery simulations.
//!
//! Snapshots that age out of the engine's in-memory cache are appended
//! here and read back by absolute timestep when the consumer rewinds.
//!
//! # Architecture
//!
//! - [`Archive`] owns one header and six column tables
//! - Tables live on any [`Storage`] backend: files in production,
//!   growable byte buffers in tests
//! - All I/O uses a little-endian binary codec (no serde dependency)
//! - [`snapshot_hash`] and [`system_hash`] provide FNV-1a fingerprints
//!
//! # Layout
//!
//! ```text
//! <dir>/archive.hdr        [MAGIC "ORRA"] [VERSION u8] [planets u32] [satellites u32]
//!                          [first_timestep u64] [system_hash u64] [committed_rows u64]
//! <dir>/planets/pos.tbl    rows of planets × 3 f64
//! <dir>/planets/vel.tbl    rows of planets × 3 f64
//! <dir>/satellites/pos.tbl rows of satellites × 3 f64
//! <dir>/satellites/vel.tbl rows of satellites × 3 f64
//! <dir>/satellites/acc.tbl rows of satellites × 3 f64
//! <dir>/satellites/burn.tbl rows of satellites × u8
//! ```
//!
//! Row `i` of every table belongs to timestep `first_timestep + i`. Rows
//! past `committed_rows` are invisible and are overwritten by the next
//! append.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod codec;
pub mod error;
pub mod hash;
pub mod storage;

pub use archive::Archive;
pub use error::ArchiveError;
pub use hash::{snapshot_hash, system_hash};
pub use storage::{Storage, TableKind};

/// Magic bytes at the start of every archive header.
pub const MAGIC: [u8; 4] = *b"ORRA";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;

/// File name of the archive header inside the archive directory.
pub const HEADER_FILE: &str = "archive.hdr";
