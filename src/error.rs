//! Error types for track sets and the bias solver.
//!
//! [`TrackSetError`] covers contract violations on [`TrackUniverse`](crate::universe::TrackUniverse)
//! and [`TrackSet`](crate::track_set::TrackSet). These are bugs in the calling code's sequencing
//! and are surfaced immediately.
//!
//! [`SolverError`] is what a playlist request can fail with. A short playlist is *not* an error;
//! see [`PlaylistOutcome`](crate::solver::PlaylistOutcome).

use thiserror::Error;

/// Precondition failures on universes and track sets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackSetError {
    /// Universe construction was given the same identifier twice.
    #[error("duplicate track identifier `{0}` in universe")]
    DuplicateIdentifier(String),

    /// Index past the end of the universe.
    #[error("index {index} out of range for universe of {size} tracks")]
    IndexOutOfRange { index: usize, size: usize },

    /// Two track sets built against different universes were combined.
    #[error("track sets belong to different universes")]
    MismatchedUniverse,

    /// The set is still outstanding; its contents are not known yet.
    #[error("track set is outstanding, its contents are not available yet")]
    NotReady,

    /// Random draw from a set with no tracks.
    #[error("cannot draw a track from an empty set")]
    EmptySet,
}

/// Errors returned by [`BiasSolver`](crate::solver::BiasSolver).
#[derive(Error, Debug)]
pub enum SolverError {
    /// The track store or a bias query failed.
    #[error("playlist generation failed: {context}")]
    SolverFailed {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// The request was aborted before it finished.
    #[error("playlist generation was cancelled")]
    Cancelled,

    /// The solver misused a track set.
    #[error(transparent)]
    TrackSet(#[from] TrackSetError),
}

impl SolverError {
    pub(crate) fn failed(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::SolverFailed {
            context: context.into(),
            source,
        }
    }
}
