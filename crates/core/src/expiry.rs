//! Tile expiry list: the set of tiles at one base zoom that must be
//! regenerated.
//!
//! The list is filled once from a text file of `zoom/x/y` records and then
//! queried read-only, possibly from many worker threads at once.
//!
//! A disabled list filters nothing: [`TileExpiryList::contains`] answers
//! `true` for every tile, ingestion is a no-op and
//! [`TileExpiryList::clone_at_zoom`] returns no tiles.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::tile::{TileCoordinate, MAX_ZOOM};
use crate::{Error, Result};

/// Why a single expiry record was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpiryLineError {
    #[error("zoom {found} does not match base zoom {expected}")]
    ZoomMismatch { found: u8, expected: u8 },

    #[error("tile {x}/{y} out of range at zoom {zoom}")]
    OutOfRange { x: u64, y: u64, zoom: u8 },

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Sorted, de-duplicated tile coordinates at a fixed base zoom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileExpiryList {
    base_zoom: u8,
    enabled: bool,
    tiles: Vec<TileCoordinate>,
}

impl TileExpiryList {
    /// # Panics
    ///
    /// Panics if `zoom` exceeds [`MAX_ZOOM`].
    pub fn new(zoom: u8, enabled: bool) -> Self {
        Self::with_tiles(zoom, enabled, Vec::new())
    }

    /// Create a list pre-seeded with `tiles`.
    ///
    /// # Panics
    ///
    /// Panics if `zoom` exceeds [`MAX_ZOOM`].
    pub fn with_tiles(zoom: u8, enabled: bool, tiles: Vec<TileCoordinate>) -> Self {
        assert!(zoom <= MAX_ZOOM, "base zoom {} above {}", zoom, MAX_ZOOM);
        let mut list = Self {
            base_zoom: zoom,
            enabled,
            tiles,
        };
        list.prepare_for_query();
        list
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn base_zoom(&self) -> u8 {
        self.base_zoom
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Stored tiles in ascending order.
    pub fn tiles(&self) -> &[TileCoordinate] {
        &self.tiles
    }

    /// Read `zoom/x/y` records from `path`. Does nothing (not even open the
    /// file) when the list is disabled.
    pub fn read_list_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::ExpiryRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.read_list(BufReader::new(file), path)
    }

    /// Read `zoom/x/y` records from `reader`. `source` names the input in
    /// error messages.
    ///
    /// Blank lines are skipped. Either every record is added or, on the
    /// first bad record, none are.
    pub fn read_list<R: BufRead>(&mut self, reader: R, source: impl Into<PathBuf>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let source = source.into();

        let mut parsed = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::ExpiryRead {
                path: source.clone(),
                source: e,
            })?;
            let record = line.trim_end();
            if record.is_empty() {
                continue;
            }
            let tile = self.parse_record(record).map_err(|reason| Error::ExpiryList {
                path: source.clone(),
                line: index + 1,
                reason,
            })?;
            parsed.push(tile);
        }

        self.tiles.extend(parsed);
        self.prepare_for_query();
        log::debug!(
            "Loaded expiry list {}: {} tiles at zoom {}",
            source.display(),
            self.tiles.len(),
            self.base_zoom
        );
        Ok(())
    }

    fn parse_record(&self, record: &str) -> std::result::Result<TileCoordinate, ExpiryLineError> {
        let mut fields = record.split('/');
        let (Some(zoom), Some(x), Some(y), None) = (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(ExpiryLineError::Malformed(format!("expected zoom/x/y, got {:?}", record)));
        };

        let zoom: u8 = parse_field("zoom", zoom)?;
        if zoom != self.base_zoom {
            return Err(ExpiryLineError::ZoomMismatch {
                found: zoom,
                expected: self.base_zoom,
            });
        }

        let x: u64 = parse_field("x", x)?;
        let y: u64 = parse_field("y", y)?;
        let limit = 2u64 << self.base_zoom;
        if x >= limit || y >= limit {
            return Err(ExpiryLineError::OutOfRange { x, y, zoom });
        }
        // limit is at most 2^31
        Ok(TileCoordinate::new(x as u32, y as u32))
    }

    /// Whether `tile` is listed. Always `true` for a disabled list.
    pub fn contains(&self, tile: TileCoordinate) -> bool {
        !self.enabled || self.tiles.binary_search(&tile).is_ok()
    }

    /// The listed tiles coarsened to `dest_zoom`, sorted and de-duplicated.
    /// The list itself is left untouched. Empty for a disabled list.
    ///
    /// # Panics
    ///
    /// Panics if `dest_zoom` is finer than the base zoom.
    pub fn clone_at_zoom(&self, dest_zoom: u8) -> Vec<TileCoordinate> {
        assert!(
            dest_zoom <= self.base_zoom,
            "cannot refine expiry list from zoom {} to {}",
            self.base_zoom,
            dest_zoom
        );
        if !self.enabled {
            return Vec::new();
        }
        if dest_zoom == self.base_zoom {
            return self.tiles.clone();
        }

        let levels = self.base_zoom - dest_zoom;
        let mut tiles: Vec<_> = self.tiles.iter().map(|t| t.coarsen(levels)).collect();
        sort_and_dedup(&mut tiles);
        tiles
    }

    fn prepare_for_query(&mut self) {
        if self.enabled {
            sort_and_dedup(&mut self.tiles);
        }
    }
}

fn parse_field<T: std::str::FromStr>(name: &str, field: &str) -> std::result::Result<T, ExpiryLineError>
where
    T::Err: std::fmt::Display,
{
    field
        .parse()
        .map_err(|e| ExpiryLineError::Malformed(format!("invalid {} {:?}: {}", name, field, e)))
}

fn sort_and_dedup(tiles: &mut Vec<TileCoordinate>) {
    tiles.sort_unstable();
    tiles.dedup();
}
