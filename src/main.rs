//! # Dynplay - Dynamic Playlist Generator
//!
//! Builds playlists from a track library by applying bias constraints
//! ("only jazz", "no live albums") with fast bit-vector set algebra.
//!
//! ## Usage
//!
//! ```bash
//! # Load a tab-separated track list into the database
//! dynplay import library.tsv
//!
//! # Generate a 15-track jazz playlist without Kenny G
//! dynplay generate --length 15 --match genre=Jazz --exclude "artist=Kenny G"
//!
//! # See how much each bias narrows the library
//! dynplay count --match genre=Jazz
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use dynplay::cli::{self, Command};
use dynplay::commands::{self, GenerateOptions};
use dynplay::completion;
use dynplay::solver::Relaxation;
use log::info;

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug dynplay generate ...` - solver state transitions and bias sizes
/// - `RUST_LOG=dynplay::track_set=trace dynplay generate ...` - every random draw
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        Command::Import { file, db } => {
            info!("Importing tracks from: {}", file.display());
            let count = commands::import_tracks(&file, db)?;
            println!("Imported {count} tracks");
        }
        Command::Generate {
            db,
            length,
            seed,
            config,
            biases,
        } => {
            let outcome = commands::generate_playlist(GenerateOptions {
                db,
                length,
                seed,
                config,
                biases,
            })?;

            for track in &outcome.tracks {
                println!("{track}");
            }

            for relaxation in &outcome.relaxations {
                match relaxation {
                    Relaxation::Widened { bias, into } => eprintln!("Relaxed '{bias}' to '{into}'"),
                    Relaxation::Dropped { bias } => eprintln!("Dropped '{bias}'"),
                }
            }
            if !outcome.is_complete() {
                eprintln!(
                    "Only {} of {} tracks could be found ({} short)",
                    outcome.tracks.len(),
                    outcome.requested,
                    outcome.shortfall()
                );
            }
        }
        Command::Count { db, biases } => {
            let survey = commands::count_tracks(db, &biases)?;

            println!("{:>8}  library", survey.universe_size);
            for (name, count) in &survey.biases {
                println!("{count:>8}  {name}");
            }
            println!("{:>8}  all biases combined", survey.combined);
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
    }

    Ok(())
}
