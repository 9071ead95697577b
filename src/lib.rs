//! Dynamic playlist generation over bit-vector track sets.
//!
//! Core modules:
//! - [`universe`] - Identifier ↔ index mapping for one generation run
//! - [`track_set`] - Bit-vector track sets and their set algebra
//! - [`bias`] - Bias constraints that narrow the candidate pool
//! - [`solver`] - The bias solver: evaluate, select, backtrack
//! - [`store`] - Track stores supplying the universe and sub-queries
//!
//! ### Supporting Modules
//!
//! - [`error`] - Error types
//! - [`config`] - Solver settings and data file locations
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`commands`] - Handlers behind the command-line interface
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use dynplay::bias::{BiasMode, IdentifierBias, TagMatchBias};
//! use dynplay::config::SolverConfig;
//! use dynplay::solver::BiasSolver;
//! use dynplay::store::{MemoryTrackStore, TagField, TagFilter, TrackRecord, TrackStore};
//! use futures::executor::block_on;
//! use std::rc::Rc;
//!
//! let tracks = (1..=6)
//!     .map(|i| TrackRecord {
//!         id: format!("t{i}"),
//!         genre: if i % 2 == 0 { "Jazz" } else { "Rock" }.to_string(),
//!         ..TrackRecord::default()
//!     })
//!     .collect();
//! let store: Rc<dyn TrackStore> = Rc::new(MemoryTrackStore::new(tracks));
//!
//! let jazz = TagMatchBias::new(
//!     Rc::clone(&store),
//!     TagFilter::new(TagField::Genre, "jazz"),
//!     BiasMode::Include,
//! );
//! let solver = BiasSolver::new(&*store, SolverConfig::default())
//!     .with_bias(jazz)
//!     .with_bias(IdentifierBias::exclude("not t2", ["t2"]));
//!
//! let outcome = block_on(solver.solve(2))?;
//! let mut tracks = outcome.tracks.clone();
//! tracks.sort();
//! assert_eq!(tracks, vec!["t4", "t6"]);
//! # Ok::<(), dynplay::error::SolverError>(())
//! ```
//!
//! ## Error Handling
//!
//! Track-set misuse (combining sets from different universes, reading an
//! outstanding set, drawing from an empty one) is reported as
//! [`error::TrackSetError`]. A playlist request fails with
//! [`error::SolverError`] only when the store or a bias query fails; a playlist
//! that comes up short is a normal [`solver::PlaylistOutcome`].

pub mod bias;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod solver;
pub mod store;
pub mod track_set;
pub mod universe;
