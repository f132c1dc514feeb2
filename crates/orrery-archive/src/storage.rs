//! Storage backends and the column tables of an archive.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use glam::DVec3;
use orrery_core::{Snapshot, SystemLayout};

use crate::codec::{get_dvec3, put_dvec3, VEC3_BYTES};
use crate::error::ArchiveError;

/// A seekable byte store holding one archive table or the header.
pub trait Storage: Read + Write + Seek + Send {
    /// Make written data durable. Defaults to [`Write::flush`].
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Storage for File {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl Storage for Cursor<Vec<u8>> {}

/// One column of the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Planet positions.
    PlanetPos,
    /// Planet velocities.
    PlanetVel,
    /// Satellite positions.
    SatPos,
    /// Satellite velocities.
    SatVel,
    /// Satellite accelerations.
    SatAcc,
    /// Per-satellite burn flags, one byte each.
    SatBurn,
}

impl TableKind {
    /// Every table, in write order.
    pub const ALL: [TableKind; 6] = [
        Self::PlanetPos,
        Self::PlanetVel,
        Self::SatPos,
        Self::SatVel,
        Self::SatAcc,
        Self::SatBurn,
    ];

    /// Path of this table relative to the archive directory.
    pub fn relative_path(self) -> PathBuf {
        let (group, file) = match self {
            Self::PlanetPos => ("planets", "pos.tbl"),
            Self::PlanetVel => ("planets", "vel.tbl"),
            Self::SatPos => ("satellites", "pos.tbl"),
            Self::SatVel => ("satellites", "vel.tbl"),
            Self::SatAcc => ("satellites", "acc.tbl"),
            Self::SatBurn => ("satellites", "burn.tbl"),
        };
        Path::new(group).join(file)
    }

    /// Bytes per row for `layout`.
    pub fn row_bytes(self, layout: SystemLayout) -> usize {
        match self {
            Self::PlanetPos | Self::PlanetVel => layout.planets * VEC3_BYTES,
            Self::SatPos | Self::SatVel | Self::SatAcc => layout.satellites * VEC3_BYTES,
            Self::SatBurn => layout.satellites,
        }
    }

    /// Append this table's row for `snap` to `buf`.
    pub fn encode_row(self, snap: &Snapshot, buf: &mut Vec<u8>) {
        match self {
            Self::PlanetPos => put_all(buf, &snap.planet_pos),
            Self::PlanetVel => put_all(buf, &snap.planet_vel),
            Self::SatPos => put_all(buf, &snap.sat_pos),
            Self::SatVel => put_all(buf, &snap.sat_vel),
            Self::SatAcc => put_all(buf, &snap.sat_acc),
            Self::SatBurn => {
                for idx in 0..snap.sat_pos.len() {
                    let fired = snap
                        .maneuvers
                        .iter()
                        .any(|s| s.0 as usize == idx);
                    buf.push(u8::from(fired));
                }
            }
        }
    }

    /// Decode a row of vectors. Not valid for [`TableKind::SatBurn`].
    pub fn decode_vectors(self, row: &[u8]) -> Result<Vec<DVec3>, ArchiveError> {
        debug_assert!(self != Self::SatBurn);
        row.chunks_exact(VEC3_BYTES).map(get_dvec3).collect()
    }
}

fn put_all(buf: &mut Vec<u8>, vs: &[DVec3]) {
    for v in vs {
        put_dvec3(buf, *v);
    }
}
