//! Track stores: where the universe and bias sub-queries come from.
//!
//! The solver only ever *reads* from a [`TrackStore`]. Two implementations are
//! provided:
//!
//! - [`MemoryTrackStore`] - a plain vector of [`TrackRecord`]s, handy for tests
//!   and for callers that already hold their library in memory
//! - [`SqliteTrackStore`] - a `tracks` table in a SQLite database
//!
//! Both answer immediately; the trait returns futures so that stores backed by a
//! remote service or a worker thread can suspend the solver instead of blocking it.

use anyhow::{Context, Result};
use futures::future::{FutureExt, LocalBoxFuture};
use log::{debug, trace};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Tag a [`TagFilter`] matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagField {
    Artist,
    Album,
    Genre,
    Title,
}

impl TagField {
    /// Column holding this tag in the `tracks` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Genre => "genre",
            Self::Title => "title",
        }
    }

    fn value_of(self, track: &TrackRecord) -> &str {
        match self {
            Self::Artist => &track.artist,
            Self::Album => &track.album,
            Self::Genre => &track.genre,
            Self::Title => &track.title,
        }
    }
}

impl FromStr for TagField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "artist" => Ok(Self::Artist),
            "album" => Ok(Self::Album),
            "genre" => Ok(Self::Genre),
            "title" => Ok(Self::Title),
            other => Err(anyhow::anyhow!(
                "Unknown tag field '{other}'. Use artist, album, genre or title"
            )),
        }
    }
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Case-insensitive "tag equals value" filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub field: TagField,
    pub value: String,
}

impl TagFilter {
    pub fn new(field: TagField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, track: &TrackRecord) -> bool {
        self.field
            .value_of(track)
            .eq_ignore_ascii_case(self.value.trim())
    }
}

/// Parses `field=value`, e.g. `genre=Jazz`.
impl FromStr for TagFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (field, value) = s
            .split_once('=')
            .with_context(|| format!("Expected FIELD=VALUE, got '{s}'"))?;
        let value = value.trim();
        if value.is_empty() {
            anyhow::bail!("Empty value in filter '{s}'");
        }
        Ok(Self::new(field.parse()?, value))
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// A track as the store knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Stable unique identifier, e.g. a content hash or URL.
    pub id: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub title: String,
}

impl TrackRecord {
    /// Parse a tab-separated `id, artist, album, genre, title` line.
    /// Missing trailing columns are left empty.
    pub fn from_tsv_line(line: &str) -> Result<Self> {
        let mut columns = line.split('\t').map(str::trim);
        let id = columns
            .next()
            .filter(|id| !id.is_empty())
            .with_context(|| format!("Missing track identifier in line '{line}'"))?;
        let mut next = || columns.next().unwrap_or_default().to_string();

        Ok(Self {
            id: id.to_string(),
            artist: next(),
            album: next(),
            genre: next(),
            title: next(),
        })
    }
}

/// Read-only access to the track library.
pub trait TrackStore {
    /// Every track identifier, in a stable order. Queried once per generation run.
    fn fetch_all_track_identifiers(&self) -> LocalBoxFuture<'_, Result<Vec<String>>>;

    /// Identifiers of the tracks matching `filter`.
    fn query<'a>(&'a self, filter: &'a TagFilter) -> LocalBoxFuture<'a, Result<Vec<String>>>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackStore {
    tracks: Vec<TrackRecord>,
}

impl MemoryTrackStore {
    #[must_use]
    pub fn new(tracks: Vec<TrackRecord>) -> Self {
        Self { tracks }
    }

    /// Store with bare identifiers and no tags.
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            identifiers
                .into_iter()
                .map(|id| TrackRecord {
                    id: id.into(),
                    ..TrackRecord::default()
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }
}

impl TrackStore for MemoryTrackStore {
    fn fetch_all_track_identifiers(&self) -> LocalBoxFuture<'_, Result<Vec<String>>> {
        let ids = self.tracks.iter().map(|track| track.id.clone()).collect();
        futures::future::ready(Ok(ids)).boxed_local()
    }

    fn query<'a>(&'a self, filter: &'a TagFilter) -> LocalBoxFuture<'a, Result<Vec<String>>> {
        let ids: Vec<String> = self
            .tracks
            .iter()
            .filter(|track| filter.matches(track))
            .map(|track| track.id.clone())
            .collect();
        trace!("Memory store matched {} tracks for {filter}", ids.len());
        futures::future::ready(Ok(ids)).boxed_local()
    }
}

/// SQLite-backed store over a `tracks` table.
#[derive(Debug)]
pub struct SqliteTrackStore {
    conn: Connection,
}

impl SqliteTrackStore {
    /// Open (creating if needed) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open track database at {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the `tracks` table if it does not exist.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS tracks (
                    id     TEXT PRIMARY KEY,
                    artist TEXT NOT NULL DEFAULT '',
                    album  TEXT NOT NULL DEFAULT '',
                    genre  TEXT NOT NULL DEFAULT '',
                    title  TEXT NOT NULL DEFAULT ''
                )",
                (),
            )
            .context("Failed to create tracks table")?;
        Ok(())
    }

    /// Insert or update `tracks` in one transaction. Returns how many rows were written.
    ///
    /// Updated tracks keep their `rowid`, so the universe order survives a re-import.
    pub fn insert_tracks(&mut self, tracks: &[TrackRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO tracks (id, artist, album, genre, title)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     artist = excluded.artist,
                     album = excluded.album,
                     genre = excluded.genre,
                     title = excluded.title",
            )?;

            for track in tracks {
                stmt.execute((
                    &track.id,
                    &track.artist,
                    &track.album,
                    &track.genre,
                    &track.title,
                ))
                .with_context(|| format!("Failed to insert track '{}'", track.id))?;
            }
        }

        tx.commit().context("Committing track import failed")?;
        debug!("Imported {} tracks", tracks.len());
        Ok(tracks.len())
    }

    fn select_ids(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("Invalid SQL statement: {sql}"))?;

        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id.context("Failed to read track identifier")?);
        }
        Ok(ids)
    }
}

impl TrackStore for SqliteTrackStore {
    fn fetch_all_track_identifiers(&self) -> LocalBoxFuture<'_, Result<Vec<String>>> {
        async move { self.select_ids("SELECT id FROM tracks ORDER BY rowid", []) }.boxed_local()
    }

    fn query<'a>(&'a self, filter: &'a TagFilter) -> LocalBoxFuture<'a, Result<Vec<String>>> {
        async move {
            let sql = format!(
                "SELECT id FROM tracks WHERE lower({}) = lower(?1) ORDER BY rowid",
                filter.field.column()
            );
            let ids = self.select_ids(&sql, [filter.value.trim()])?;
            trace!("SQLite store matched {} tracks for {filter}", ids.len());
            Ok(ids)
        }
        .boxed_local()
    }
}
