//! Command handlers behind the `dynplay` binary.
//!
//! Each handler opens the track database, does its work and returns plain
//! data; printing is left to `main`.

use crate::bias::{Bias, BiasMode, TagMatchBias};
use crate::cli::BiasArgs;
use crate::config::{self, SolverConfig};
use crate::solver::{BiasSolver, PlaylistOutcome, Survey};
use crate::store::{SqliteTrackStore, TrackRecord, TrackStore};
use anyhow::{Context, Result};
use futures::executor::block_on;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

fn resolve_db_path(db: Option<PathBuf>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => config::get_db_path(),
    }
}

/// Parse a tab-separated track list. Blank lines and `#` comments are skipped.
pub fn parse_track_list(text: &str) -> Result<Vec<TrackRecord>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|(number, line)| {
            TrackRecord::from_tsv_line(line).with_context(|| format!("Line {}", number + 1))
        })
        .collect()
}

/// Import the track list at `file` into the database. Returns the number of tracks written.
pub fn import_tracks(file: &Path, db: Option<PathBuf>) -> Result<usize> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read track list {}", file.display()))?;
    let tracks = parse_track_list(&text)?;

    let db_path = resolve_db_path(db)?;
    info!("Importing {} tracks into {}", tracks.len(), db_path.display());
    let mut store = SqliteTrackStore::open(&db_path)?;
    store.insert_tracks(&tracks)
}

/// One [`TagMatchBias`] per flag: matches first, then excludes, each lower in priority
/// than the one before.
pub fn build_biases(store: &Rc<dyn TrackStore>, args: &BiasArgs) -> Vec<Box<dyn Bias>> {
    let includes = args.matches.iter().map(|filter| (filter, BiasMode::Include));
    let excludes = args.excludes.iter().map(|filter| (filter, BiasMode::Exclude));

    includes
        .chain(excludes)
        .zip(0..)
        .map(|((filter, mode), priority)| {
            let bias = TagMatchBias::new(Rc::clone(store), filter.clone(), mode).with_priority(priority);
            Box::new(bias) as Box<dyn Bias>
        })
        .collect()
}

fn solver_for<'s>(store: &'s Rc<dyn TrackStore>, config: SolverConfig, args: &BiasArgs) -> BiasSolver<'s> {
    let mut solver = BiasSolver::new(&**store, config);
    for bias in build_biases(store, args) {
        solver.add_bias(bias);
    }
    solver
}

/// Options for [`generate_playlist`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub db: Option<PathBuf>,
    pub length: Option<usize>,
    pub seed: Option<u64>,
    pub config: Option<PathBuf>,
    pub biases: BiasArgs,
}

/// Run the solver against the track database.
pub fn generate_playlist(options: GenerateOptions) -> Result<PlaylistOutcome> {
    let mut config = config::load_or_default(options.config.as_deref())?;
    if let Some(seed) = options.seed {
        config.seed = Some(seed);
    }
    let length = options.length.unwrap_or(config.playlist_length);

    let db_path = resolve_db_path(options.db)?;
    let store: Rc<dyn TrackStore> = Rc::new(SqliteTrackStore::open(&db_path)?);
    let solver = solver_for(&store, config, &options.biases);

    info!("Generating {length}-track playlist from {}", db_path.display());
    Ok(block_on(solver.solve(length))?)
}

/// Evaluate the biases and report their sizes.
pub fn count_tracks(db: Option<PathBuf>, biases: &BiasArgs) -> Result<Survey> {
    let db_path = resolve_db_path(db)?;
    let store: Rc<dyn TrackStore> = Rc::new(SqliteTrackStore::open(&db_path)?);
    let solver = solver_for(&store, SolverConfig::default(), biases);

    Ok(block_on(solver.survey())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTrackStore, TagFilter, TagField};

    #[test]
    fn test_parse_track_list_skips_comments() {
        let text = "# id\tartist\n\na\tMiles Davis\tKind of Blue\tJazz\tSo What\nb\tKraftwerk\n";
        let tracks = parse_track_list(text).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "So What");
        assert_eq!(tracks[1].artist, "Kraftwerk");
    }

    #[test]
    fn test_parse_track_list_reports_line() {
        let err = parse_track_list("a\tArtist\n\tno id\n").unwrap_err();
        assert!(format!("{err:#}").contains("Line 2"));
    }

    #[test]
    fn test_build_biases_orders_priorities() {
        let store: Rc<dyn TrackStore> = Rc::new(MemoryTrackStore::default());
        let args = BiasArgs {
            matches: vec![TagFilter::new(TagField::Genre, "Jazz")],
            excludes: vec![
                TagFilter::new(TagField::Artist, "Kenny G"),
                TagFilter::new(TagField::Album, "Live"),
            ],
        };

        let biases = build_biases(&store, &args);
        let summary: Vec<(String, i32)> = biases.iter().map(|b| (b.name(), b.priority())).collect();
        assert_eq!(
            summary,
            vec![
                ("match genre=Jazz".to_string(), 0),
                ("exclude artist=Kenny G".to_string(), 1),
                ("exclude album=Live".to_string(), 2),
            ]
        );
    }
}
