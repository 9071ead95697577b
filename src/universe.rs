//! The track universe: every identifier one generation run may pick from.
//!
//! Each identifier gets a dense zero-based index in input order. [`TrackSet`]s
//! address tracks by these indices, so a universe never changes once built and
//! is shared read-only behind an [`Arc`].
//!
//! [`TrackSet`]: crate::track_set::TrackSet

use crate::error::TrackSetError;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable identifier ↔ index mapping.
#[derive(Debug, Default)]
pub struct TrackUniverse {
    identifiers: Vec<String>,
    indices: HashMap<String, usize>,
}

impl TrackUniverse {
    /// Build a universe, assigning indices in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`TrackSetError::DuplicateIdentifier`] naming the first identifier
    /// seen twice. Use [`TrackUniverse::from_unique`] to de-duplicate instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynplay::universe::TrackUniverse;
    ///
    /// let universe = TrackUniverse::new(["a", "b", "c"])?;
    /// assert_eq!(universe.index_of("b"), Some(1));
    /// assert_eq!(universe.identifier_at(2)?, "c");
    /// # Ok::<(), dynplay::error::TrackSetError>(())
    /// ```
    pub fn new<I, S>(identifiers: I) -> Result<Self, TrackSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut universe = Self::default();
        for identifier in identifiers {
            let identifier = identifier.into();
            if universe.indices.contains_key(&identifier) {
                return Err(TrackSetError::DuplicateIdentifier(identifier));
            }
            universe.push(identifier);
        }

        debug!("Built track universe with {} tracks", universe.size());
        Ok(universe)
    }

    /// Build a universe keeping only the first occurrence of each identifier.
    pub fn from_unique<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut universe = Self::default();
        let mut dropped = 0usize;
        for identifier in identifiers {
            let identifier = identifier.into();
            if universe.indices.contains_key(&identifier) {
                dropped += 1;
                continue;
            }
            universe.push(identifier);
        }

        if dropped > 0 {
            warn!("Dropped {dropped} duplicate identifiers while building track universe");
        }
        universe
    }

    fn push(&mut self, identifier: String) {
        self.indices.insert(identifier.clone(), self.identifiers.len());
        self.identifiers.push(identifier);
    }

    /// Wrap in an [`Arc`] so track sets can share it.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Index of `identifier`, or `None` if it is not part of this universe.
    #[must_use]
    pub fn index_of(&self, identifier: &str) -> Option<usize> {
        self.indices.get(identifier).copied()
    }

    /// Identifier stored at `index`.
    ///
    /// # Errors
    ///
    /// [`TrackSetError::IndexOutOfRange`] when `index >= self.size()`.
    pub fn identifier_at(&self, index: usize) -> Result<&str, TrackSetError> {
        self.identifiers
            .get(index)
            .map(String::as_str)
            .ok_or(TrackSetError::IndexOutOfRange {
                index,
                size: self.size(),
            })
    }

    /// Number of tracks.
    #[must_use]
    pub fn size(&self) -> usize {
        self.identifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// All identifiers in index order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.identifiers.iter().map(String::as_str)
    }
}
