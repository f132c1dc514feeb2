//! The [`Archive`]: append-only column tables with a committed row count.

use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use orrery_core::{SatelliteIndex, Snapshot, SystemLayout, TimeStep};
use smallvec::SmallVec;

use crate::codec::{decode_header, encode_header, ArchiveHeader, COMMITTED_OFFSET, HEADER_LEN};
use crate::error::ArchiveError;
use crate::storage::{Storage, TableKind};
use crate::HEADER_FILE;

/// Durable, append-only store of snapshots indexed by timestep.
///
/// Single writer. Every [`append`](Archive::append) writes the new rows to
/// all six tables first and only then bumps the committed row count in the
/// header, so a reader (or a later [`open`](Archive::open)) never observes
/// a partially appended snapshot.
///
/// # Examples
///
/// ```
/// use orrery_archive::Archive;
/// use orrery_core::{DVec3, Snapshot, SystemLayout, TimeStep};
///
/// let layout = SystemLayout { planets: 1, satellites: 0 };
/// let mut archive = Archive::in_memory(layout, 0).unwrap();
/// assert_eq!(archive.latest_timestep(), TimeStep(0));
///
/// let snap = Snapshot {
///     timestep: TimeStep(1),
///     planet_pos: vec![DVec3::ZERO],
///     planet_vel: vec![DVec3::X],
///     sat_pos: vec![],
///     sat_vel: vec![],
///     sat_acc: vec![],
///     maneuvers: Default::default(),
/// };
/// archive.append([&snap]).unwrap();
/// assert_eq!(archive.latest_timestep(), TimeStep(1));
/// assert_eq!(archive.get(TimeStep(1)).unwrap(), snap);
/// ```
pub struct Archive {
    dir: Option<PathBuf>,
    header: ArchiveHeader,
    header_store: Box<dyn Storage>,
    tables: Vec<(TableKind, Box<dyn Storage>)>,
    scratch: Vec<u8>,
}

impl Archive {
    /// Create an archive backed by growable in-memory buffers.
    pub fn in_memory(layout: SystemLayout, system_hash: u64) -> Result<Self, ArchiveError> {
        let tables = TableKind::ALL
            .iter()
            .map(|&kind| (kind, Box::new(Cursor::new(Vec::<u8>::new())) as Box<dyn Storage>))
            .collect();
        Self::initialise(
            None,
            Box::new(Cursor::new(Vec::<u8>::new())),
            tables,
            layout,
            system_hash,
        )
    }

    /// Create a fresh archive in `dir`, replacing any archive already there.
    pub fn create(
        dir: impl AsRef<Path>,
        layout: SystemLayout,
        system_hash: u64,
    ) -> Result<Self, ArchiveError> {
        let dir = dir.as_ref();
        let mut tables = Vec::with_capacity(TableKind::ALL.len());
        for kind in TableKind::ALL {
            let path = dir.join(kind.relative_path());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            tables.push((kind, Box::new(create_file(&path)?) as Box<dyn Storage>));
        }
        let header = Box::new(create_file(&dir.join(HEADER_FILE))?);
        log::debug!("created archive at {}", dir.display());
        Self::initialise(Some(dir.to_path_buf()), header, tables, layout, system_hash)
    }

    /// Reopen an archive previously written to `dir`.
    ///
    /// The recorded layout and system hash must match. Rows written after
    /// the last committed append are ignored and will be overwritten.
    pub fn open(
        dir: impl AsRef<Path>,
        layout: SystemLayout,
        system_hash: u64,
    ) -> Result<Self, ArchiveError> {
        let dir = dir.as_ref();
        let mut header_store = open_file(&dir.join(HEADER_FILE))?;
        let mut raw = vec![0u8; HEADER_LEN as usize];
        header_store.read_exact(&mut raw)?;
        let header = decode_header(&mut raw.as_slice())?;
        if header.layout != layout {
            return Err(ArchiveError::LayoutMismatch {
                archived: header.layout,
                supplied: layout,
            });
        }
        if header.system_hash != system_hash {
            return Err(ArchiveError::SystemMismatch {
                recorded: header.system_hash,
                current: system_hash,
            });
        }

        let mut tables = Vec::with_capacity(TableKind::ALL.len());
        for kind in TableKind::ALL {
            let file = open_file(&dir.join(kind.relative_path()))?;
            let needed = header.committed_rows * kind.row_bytes(layout) as u64;
            let found = file.metadata()?.len();
            if found < needed {
                return Err(ArchiveError::Malformed {
                    detail: format!(
                        "table {kind:?} holds {found} bytes, {needed} committed"
                    ),
                });
            }
            tables.push((kind, Box::new(file) as Box<dyn Storage>));
        }
        log::debug!(
            "reopened archive at {} with {} rows",
            dir.display(),
            header.committed_rows
        );
        Ok(Self {
            dir: Some(dir.to_path_buf()),
            header,
            header_store: Box::new(header_store),
            tables,
            scratch: Vec::new(),
        })
    }

    fn initialise(
        dir: Option<PathBuf>,
        mut header_store: Box<dyn Storage>,
        tables: Vec<(TableKind, Box<dyn Storage>)>,
        layout: SystemLayout,
        system_hash: u64,
    ) -> Result<Self, ArchiveError> {
        let header = ArchiveHeader {
            layout,
            first_timestep: TimeStep::FIRST,
            system_hash,
            committed_rows: 0,
        };
        let mut raw = Vec::with_capacity(HEADER_LEN as usize);
        encode_header(&mut raw, &header)?;
        header_store.write_all(&raw)?;
        header_store.sync()?;
        Ok(Self {
            dir,
            header,
            header_store,
            tables,
            scratch: Vec::new(),
        })
    }

    /// Directory backing this archive, if any.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Body counts of archived snapshots.
    pub fn layout(&self) -> SystemLayout {
        self.header.layout
    }

    /// Fingerprint of the system recorded in the header.
    pub fn system_hash(&self) -> u64 {
        self.header.system_hash
    }

    /// Timestep of the first archived row.
    pub fn first_timestep(&self) -> TimeStep {
        self.header.first_timestep
    }

    /// Number of committed rows.
    pub fn len(&self) -> u64 {
        self.header.committed_rows
    }

    /// Whether nothing has been archived.
    pub fn is_empty(&self) -> bool {
        self.header.committed_rows == 0
    }

    /// Highest archived timestep; `TimeStep(0)` when empty.
    ///
    /// Monotonically non-decreasing.
    pub fn latest_timestep(&self) -> TimeStep {
        if self.is_empty() {
            TimeStep(0)
        } else {
            self.header
                .first_timestep
                .advance(self.header.committed_rows - 1)
        }
    }

    /// Whether `timestep` has been archived.
    pub fn contains(&self, timestep: TimeStep) -> bool {
        !self.is_empty() && timestep >= self.first_timestep() && timestep <= self.latest_timestep()
    }

    /// Append snapshots that continue the archive.
    ///
    /// The first snapshot must be `latest_timestep() + 1` (or the first
    /// timestep of an empty archive) and the rest must follow without
    /// gaps. Returns the number of rows appended.
    pub fn append<'a, I>(&mut self, snapshots: I) -> Result<usize, ArchiveError>
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let batch: Vec<&Snapshot> = snapshots.into_iter().collect();
        if batch.is_empty() {
            return Ok(0);
        }

        let layout = self.header.layout;
        let mut expected = self.header.first_timestep.advance(self.header.committed_rows);
        for snap in &batch {
            if snap.timestep != expected {
                return Err(ArchiveError::NonContiguousAppend {
                    expected,
                    found: snap.timestep,
                });
            }
            if !snap.matches(layout) {
                return Err(ArchiveError::LayoutMismatch {
                    archived: layout,
                    supplied: snap.layout(),
                });
            }
            expected = expected.next();
        }

        let committed = self.header.committed_rows;
        for (kind, store) in &mut self.tables {
            let row_bytes = kind.row_bytes(layout);
            self.scratch.clear();
            self.scratch.reserve(row_bytes * batch.len());
            for snap in &batch {
                kind.encode_row(snap, &mut self.scratch);
            }
            store.seek(SeekFrom::Start(committed * row_bytes as u64))?;
            store.write_all(&self.scratch)?;
            store.sync()?;
        }

        let rows = committed + batch.len() as u64;
        self.header_store.seek(SeekFrom::Start(COMMITTED_OFFSET))?;
        self.header_store.write_all(&rows.to_le_bytes())?;
        self.header_store.sync()?;
        self.header.committed_rows = rows;
        Ok(batch.len())
    }

    /// Read every snapshot in `range`.
    ///
    /// Fails with [`ArchiveError::RangeNotArchived`] if any timestep in
    /// the range has not been committed. An empty range reads nothing.
    pub fn read(&mut self, range: Range<TimeStep>) -> Result<Vec<Snapshot>, ArchiveError> {
        if range.start >= range.end {
            return Ok(Vec::new());
        }
        let first = self.header.first_timestep;
        if range.start < first || range.end > self.latest_timestep().next() || self.is_empty() {
            return Err(ArchiveError::RangeNotArchived {
                start: range.start,
                end: range.end,
                latest: self.latest_timestep(),
            });
        }

        let layout = self.header.layout;
        let count = (range.end.0 - range.start.0) as usize;
        let first_row = range.start.0 - first.0;
        let mut out: Vec<Snapshot> = (0..count as u64)
            .map(|i| Snapshot {
                timestep: range.start.advance(i),
                planet_pos: Vec::new(),
                planet_vel: Vec::new(),
                sat_pos: Vec::new(),
                sat_vel: Vec::new(),
                sat_acc: Vec::new(),
                maneuvers: SmallVec::new(),
            })
            .collect();

        for (kind, store) in &mut self.tables {
            let row_bytes = kind.row_bytes(layout);
            if row_bytes == 0 {
                continue;
            }
            self.scratch.resize(row_bytes * count, 0);
            store.seek(SeekFrom::Start(first_row * row_bytes as u64))?;
            store.read_exact(&mut self.scratch)?;
            for (snap, row) in out.iter_mut().zip(self.scratch.chunks_exact(row_bytes)) {
                match kind {
                    TableKind::PlanetPos => snap.planet_pos = kind.decode_vectors(row)?,
                    TableKind::PlanetVel => snap.planet_vel = kind.decode_vectors(row)?,
                    TableKind::SatPos => snap.sat_pos = kind.decode_vectors(row)?,
                    TableKind::SatVel => snap.sat_vel = kind.decode_vectors(row)?,
                    TableKind::SatAcc => snap.sat_acc = kind.decode_vectors(row)?,
                    TableKind::SatBurn => {
                        snap.maneuvers = row
                            .iter()
                            .enumerate()
                            .filter(|(_, flag)| **flag != 0)
                            .map(|(i, _)| SatelliteIndex(i as u32))
                            .collect();
                    }
                }
            }
        }
        Ok(out)
    }

    /// Read a single snapshot.
    pub fn get(&mut self, timestep: TimeStep) -> Result<Snapshot, ArchiveError> {
        let mut rows = self.read(timestep..timestep.next())?;
        rows.pop().ok_or(ArchiveError::RangeNotArchived {
            start: timestep,
            end: timestep.next(),
            latest: self.latest_timestep(),
        })
    }
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("dir", &self.dir)
            .field("header", &self.header)
            .finish()
    }
}

fn create_file(path: &Path) -> Result<File, ArchiveError> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

fn open_file(path: &Path) -> Result<File, ArchiveError> {
    Ok(OpenOptions::new().read(true).write(true).open(path)?)
}
