//! # Command-Line Interface Module
//!
//! Defines the `dynplay` command line with Clap derive macros.
//!
//! ## Commands
//!
//! - `import`: load tab-separated track records into the track database
//! - `generate`: build a dynamic playlist from `--match` / `--exclude` biases
//! - `count`: show how many tracks each bias keeps
//! - `completion`: print a shell completion script
//!
//! ## Examples
//!
//! ```bash
//! dynplay import library.tsv
//! dynplay generate --length 15 --match genre=Jazz --exclude "artist=Kenny G"
//! dynplay count --match genre=Jazz
//! ```

use crate::store::TagFilter;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments.
#[derive(Parser, Debug)]
#[command(name = "dynplay")]
#[command(about = "Dynplay: dynamic playlists from bias constraints")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Bias flags shared by `generate` and `count`.
///
/// Biases are applied in the order listed here: every `--match` first, then
/// every `--exclude`. Later biases have lower priority and are relaxed first
/// when the playlist cannot be filled.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct BiasArgs {
    /// Keep only tracks whose tag equals the value (FIELD=VALUE, repeatable)
    ///
    /// FIELD is one of artist, album, genre, title. Matching is case-insensitive.
    #[arg(long = "match", value_name = "FIELD=VALUE")]
    pub matches: Vec<TagFilter>,

    /// Remove tracks whose tag equals the value (FIELD=VALUE, repeatable)
    #[arg(long = "exclude", value_name = "FIELD=VALUE")]
    pub excludes: Vec<TagFilter>,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import tracks into the database
    ///
    /// Reads one track per line: id, artist, album, genre, title separated by
    /// tabs. Blank lines and lines starting with '#' are skipped. Existing
    /// tracks with the same id are replaced.
    Import {
        /// Tab-separated track list
        file: PathBuf,

        /// Track database (defaults to the platform data directory)
        #[arg(long, env = "DYNPLAY_DB")]
        db: Option<PathBuf>,
    },

    /// Generate a dynamic playlist
    ///
    /// Prints one track identifier per line. If the biases cannot be satisfied
    /// the lowest-priority bias is relaxed; if the library runs out, a shorter
    /// playlist is printed and the shortfall is reported on stderr.
    Generate {
        /// Track database (defaults to the platform data directory)
        #[arg(long, env = "DYNPLAY_DB")]
        db: Option<PathBuf>,

        /// Number of tracks (defaults to the configured playlist length)
        #[arg(short, long)]
        length: Option<usize>,

        /// RNG seed for a reproducible playlist
        #[arg(long)]
        seed: Option<u64>,

        /// Solver settings file (JSON)
        #[arg(long, env = "DYNPLAY_CONFIG")]
        config: Option<PathBuf>,

        #[command(flatten)]
        biases: BiasArgs,
    },

    /// Show how many tracks each bias keeps
    Count {
        /// Track database (defaults to the platform data directory)
        #[arg(long, env = "DYNPLAY_DB")]
        db: Option<PathBuf>,

        #[command(flatten)]
        biases: BiasArgs,
    },

    /// Generate shell completions
    ///
    /// Usage: dynplay completion bash > ~/.local/share/bash-completion/completions/dynplay
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TagField;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_generate_parses_biases_in_order() {
        let args = Args::try_parse_from([
            "dynplay",
            "generate",
            "--length",
            "12",
            "--match",
            "genre=Jazz",
            "--exclude",
            "artist=Kenny G",
            "--match",
            "album=Kind of Blue",
        ])
        .unwrap();

        let Command::Generate { length, biases, seed, .. } = args.command else {
            panic!("expected generate");
        };
        assert_eq!(length, Some(12));
        assert_eq!(seed, None);
        assert_eq!(
            biases.matches,
            vec![
                TagFilter::new(TagField::Genre, "Jazz"),
                TagFilter::new(TagField::Album, "Kind of Blue"),
            ]
        );
        assert_eq!(biases.excludes, vec![TagFilter::new(TagField::Artist, "Kenny G")]);
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        assert!(Args::try_parse_from(["dynplay", "count", "--match", "mood=happy"]).is_err());
        assert!(Args::try_parse_from(["dynplay", "count", "--match", "genre"]).is_err());
    }
}
