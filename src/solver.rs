//! # Bias Solver
//!
//! Turns a list of [`Bias`]es into a playlist.
//!
//! ## States
//!
//! ```text
//! Initializing ──▶ EvaluatingBiases ──▶ Selecting ──▶ Done
//!                        ▲                  │
//!                        └──── Backtrack ◀──┘  (candidates ran out)
//! ```
//!
//! - **Initializing**: fetch every identifier from the [`TrackStore`] and build the universe.
//! - **EvaluatingBiases**: every bias without a result gets an outstanding slot and is
//!   evaluated. Pending evaluations are polled together, so a slow store query
//!   does not hold up the others. The candidate pool is the intersection of all
//!   slots in priority order, minus tracks already picked.
//! - **Selecting**: draw uniformly at random without replacement.
//! - **Backtrack**: relax the lowest-priority bias (largest priority value, later
//!   declaration on ties) that actually narrows the pool. A bias that every
//!   remaining candidate already satisfies is kept. The relaxed bias is replaced
//!   by its widened form if it has one, otherwise it is dropped.
//! - **Done**: no bias is left to relax, or enough tracks were picked.
//!
//! Running out of tracks is not an error: the [`PlaylistOutcome`] reports the
//! shortfall. Only store or bias failures end in [`SolverError::SolverFailed`].

use crate::bias::Bias;
use crate::config::SolverConfig;
use crate::error::{SolverError, TrackSetError};
use crate::store::TrackStore;
use crate::track_set::TrackSet;
use crate::universe::TrackUniverse;
use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Where the solver is in generating one playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Initializing,
    EvaluatingBiases,
    Selecting,
    Backtrack,
    Done,
}

/// One relaxation step taken while backtracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relaxation {
    /// The bias was replaced by its wider form.
    Widened { bias: String, into: String },
    /// The bias was removed.
    Dropped { bias: String },
}

/// Result of a playlist request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistOutcome {
    /// Picked track identifiers, in playlist order.
    pub tracks: Vec<String>,
    /// Number of tracks asked for.
    pub requested: usize,
    /// Tracks picked after at least one bias was relaxed.
    pub relaxed_slots: usize,
    /// Relaxations in the order they happened.
    pub relaxations: Vec<Relaxation>,
}

impl PlaylistOutcome {
    /// How many requested tracks could not be found.
    #[must_use]
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.tracks.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

/// Per-bias sizes, for inspecting a bias list without generating a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Survey {
    pub universe_size: usize,
    /// `(bias name, matching tracks)` in priority order.
    pub biases: Vec<(String, usize)>,
    /// Size of the intersection of every bias.
    pub combined: usize,
}

/// Generates playlists from a track store and an ordered list of biases.
///
/// # Examples
///
/// ```
/// use dynplay::bias::IdentifierBias;
/// use dynplay::config::SolverConfig;
/// use dynplay::solver::BiasSolver;
/// use dynplay::store::MemoryTrackStore;
/// use futures::executor::block_on;
///
/// let store = MemoryTrackStore::from_identifiers(["a", "b", "c", "d"]);
/// let solver = BiasSolver::new(&store, SolverConfig::default())
///     .with_bias(IdentifierBias::exclude("not d", ["d"]));
///
/// let outcome = block_on(solver.solve(2))?;
/// assert_eq!(outcome.tracks.len(), 2);
/// assert!(!outcome.tracks.contains(&"d".to_string()));
/// # Ok::<(), dynplay::error::SolverError>(())
/// ```
pub struct BiasSolver<'s> {
    store: &'s dyn TrackStore,
    biases: Vec<Box<dyn Bias>>,
    config: SolverConfig,
}

impl<'s> BiasSolver<'s> {
    #[must_use]
    pub fn new(store: &'s dyn TrackStore, config: SolverConfig) -> Self {
        Self {
            store,
            biases: Vec::new(),
            config,
        }
    }

    /// Append a bias. Declaration order breaks priority ties.
    #[must_use]
    pub fn with_bias(mut self, bias: impl Bias + 'static) -> Self {
        self.biases.push(Box::new(bias));
        self
    }

    pub fn add_bias(&mut self, bias: Box<dyn Bias>) {
        self.biases.push(bias);
    }

    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Generate a playlist of up to `length` tracks.
    ///
    /// Dropping the returned future cancels the run; nothing is written to the store.
    ///
    /// # Errors
    ///
    /// [`SolverError::SolverFailed`] if the store or a bias evaluation fails.
    pub async fn solve(&self, length: usize) -> Result<PlaylistOutcome, SolverError> {
        debug!("Solver state: {:?}", SolverState::Initializing);
        let universe = self.initialize().await?;
        let mut run = Run::new(self, universe, length);

        let mut state = SolverState::EvaluatingBiases;
        loop {
            debug!("Solver state: {state:?}");
            state = match state {
                SolverState::EvaluatingBiases => {
                    run.evaluate_biases().await?;
                    SolverState::Selecting
                }
                SolverState::Selecting => {
                    if run.select()? {
                        SolverState::Done
                    } else {
                        SolverState::Backtrack
                    }
                }
                SolverState::Backtrack => {
                    if run.relax()? {
                        SolverState::EvaluatingBiases
                    } else {
                        SolverState::Done
                    }
                }
                // Initializing only happens once, before the loop.
                SolverState::Initializing | SolverState::Done => break,
            };
        }

        let outcome = run.finish();
        if outcome.is_complete() {
            debug!("Generated playlist of {} tracks", outcome.tracks.len());
        } else {
            warn!(
                "Generated {} of {} requested tracks ({} short)",
                outcome.tracks.len(),
                outcome.requested,
                outcome.shortfall()
            );
        }
        Ok(outcome)
    }

    /// Like [`BiasSolver::solve`], plus a handle that cancels the run.
    ///
    /// An aborted run resolves to [`SolverError::Cancelled`].
    pub fn solve_abortable(
        &self,
        length: usize,
    ) -> (LocalBoxFuture<'_, Result<PlaylistOutcome, SolverError>>, AbortHandle) {
        let (handle, registration) = AbortHandle::new_pair();
        let run = Abortable::new(self.solve(length), registration).map(|result| {
            result.unwrap_or_else(|_aborted| {
                debug!("Playlist generation aborted");
                Err(SolverError::Cancelled)
            })
        });
        (run.boxed_local(), handle)
    }

    /// Evaluate every bias once and report how many tracks each one keeps.
    pub async fn survey(&self) -> Result<Survey, SolverError> {
        let universe = self.initialize().await?;
        let mut run = Run::new(self, Arc::clone(&universe), 0);
        run.evaluate_biases().await?;

        let mut combined = TrackSet::full(&universe);
        let mut biases = Vec::with_capacity(run.slots.len());
        for slot in &run.slots {
            biases.push((slot.bias.get().name(), slot.set.track_count()?));
            combined.intersect_set(&slot.set)?;
        }

        Ok(Survey {
            universe_size: universe.size(),
            biases,
            combined: combined.track_count()?,
        })
    }

    async fn initialize(&self) -> Result<Arc<TrackUniverse>, SolverError> {
        let identifiers = self
            .store
            .fetch_all_track_identifiers()
            .await
            .map_err(|err| SolverError::failed("fetching the track universe", err))?;

        let universe = TrackUniverse::new(identifiers)
            .map_err(|err| SolverError::failed("building the track universe", err.into()))?;
        Ok(universe.shared())
    }

    fn new_rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// A bias as used by one run: either declared on the solver or a widened copy.
enum RunBias<'a> {
    Declared(&'a dyn Bias),
    Widened(Box<dyn Bias>),
}

impl RunBias<'_> {
    fn get(&self) -> &dyn Bias {
        match self {
            Self::Declared(bias) => *bias,
            Self::Widened(bias) => &**bias,
        }
    }
}

struct Slot<'a> {
    bias: RunBias<'a>,
    set: TrackSet,
    /// Declaration index, the tie-break within one priority.
    order: usize,
}

impl Slot<'_> {
    fn rank(&self) -> (i32, usize) {
        (self.bias.get().priority(), self.order)
    }
}

/// Mutable state of one `solve` call.
struct Run<'a> {
    universe: Arc<TrackUniverse>,
    slots: Vec<Slot<'a>>,
    length: usize,
    max_backtracks: usize,
    rng: StdRng,
    picked: Vec<String>,
    picked_set: TrackSet,
    relaxed_slots: usize,
    relaxations: Vec<Relaxation>,
}

impl<'a> Run<'a> {
    fn new(solver: &'a BiasSolver<'_>, universe: Arc<TrackUniverse>, length: usize) -> Self {
        let mut declared: Vec<(usize, &'a dyn Bias)> = solver
            .biases
            .iter()
            .map(|bias| &**bias)
            .enumerate()
            .collect();
        declared.sort_by_key(|(order, bias)| (bias.priority(), *order));

        let slots = declared
            .into_iter()
            .map(|(order, bias)| Slot {
                bias: RunBias::Declared(bias),
                set: TrackSet::outstanding(&universe),
                order,
            })
            .collect();

        Self {
            picked_set: TrackSet::empty(&universe),
            universe,
            slots,
            length,
            max_backtracks: solver.config.max_backtracks,
            rng: solver.new_rng(),
            picked: Vec::with_capacity(length),
            relaxed_slots: 0,
            relaxations: Vec::new(),
        }
    }

    /// Evaluate every outstanding slot, polling pending evaluations together.
    async fn evaluate_biases(&mut self) -> Result<(), SolverError> {
        let universe = &self.universe;
        let resolved = {
            let mut pending: FuturesUnordered<_> = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.set.is_outstanding())
                .map(|(index, slot)| {
                    let bias = slot.bias.get();
                    bias.evaluate(universe).map(move |result| (index, bias.name(), result))
                })
                .collect();

            let mut resolved = Vec::with_capacity(pending.len());
            while let Some((index, name, result)) = pending.next().await {
                let set = result
                    .map_err(|err| SolverError::failed(format!("evaluating bias '{name}'"), err))?;
                if !Arc::ptr_eq(set.universe(), universe) {
                    return Err(TrackSetError::MismatchedUniverse.into());
                }
                debug!("Bias '{name}' keeps {} tracks", set.track_count()?);
                resolved.push((index, set));
            }
            resolved
        };

        for (index, set) in resolved {
            self.slots[index].set = set;
        }
        Ok(())
    }

    /// Candidate pool: every slot intersected in priority order, minus picked tracks.
    fn candidates(&self) -> Result<TrackSet, TrackSetError> {
        let mut candidates = TrackSet::full(&self.universe);
        for slot in &self.slots {
            candidates.intersect_set(&slot.set)?;
        }
        candidates.subtract_set(&self.picked_set)?;
        Ok(candidates)
    }

    /// Draw until the playlist is full. Returns false if the candidates ran out first.
    fn select(&mut self) -> Result<bool, SolverError> {
        let mut candidates = self.candidates()?;
        trace!("Selecting from {} candidates", candidates.track_count()?);

        while self.picked.len() < self.length {
            let track = match candidates.random_track_with(&mut self.rng) {
                Ok(track) => track.to_owned(),
                Err(TrackSetError::EmptySet) => return Ok(false),
                Err(err) => return Err(err.into()),
            };

            candidates.remove(&track)?;
            self.picked_set.insert(&track)?;
            if !self.relaxations.is_empty() {
                self.relaxed_slots += 1;
            }
            trace!("Picked '{track}' for slot {}", self.picked.len());
            self.picked.push(track);
        }
        Ok(true)
    }

    /// Lowest-priority slot whose removal would let more tracks through. Falls back to
    /// the last slot when no single slot is to blame.
    fn slot_to_relax(&self) -> Result<Option<usize>, TrackSetError> {
        for index in (0..self.slots.len()).rev() {
            let mut others = TrackSet::full(&self.universe);
            for (other, slot) in self.slots.iter().enumerate() {
                if other != index {
                    others.intersect_set(&slot.set)?;
                }
            }
            others.subtract_set(&self.picked_set)?;
            others.subtract_set(&self.slots[index].set)?;

            if !others.is_empty()? {
                return Ok(Some(index));
            }
            trace!("Bias '{}' is still satisfiable", self.slots[index].bias.get().name());
        }
        Ok(self.slots.len().checked_sub(1))
    }

    /// Widen or drop the lowest-priority bias that narrows the pool. Returns false if
    /// nothing is left to relax.
    fn relax(&mut self) -> Result<bool, SolverError> {
        if self.relaxations.len() >= self.max_backtracks {
            warn!("Backtrack limit of {} reached", self.max_backtracks);
            return Ok(false);
        }

        let Some(index) = self.slot_to_relax()? else {
            debug!("No bias left to relax");
            return Ok(false);
        };

        let slot = &mut self.slots[index];
        let name = slot.bias.get().name();
        let relaxation = match slot.bias.get().widen() {
            Some(wider) => {
                let into = wider.name();
                slot.bias = RunBias::Widened(wider);
                slot.set = TrackSet::outstanding(&self.universe);
                // The wider bias may carry a different priority.
                self.slots.sort_by_key(Slot::rank);
                Relaxation::Widened { bias: name, into }
            }
            None => {
                self.slots.remove(index);
                Relaxation::Dropped { bias: name }
            }
        };

        debug!("Backtracking: {relaxation:?}");
        self.relaxations.push(relaxation);
        Ok(true)
    }

    fn finish(self) -> PlaylistOutcome {
        PlaylistOutcome {
            tracks: self.picked,
            requested: self.length,
            relaxed_slots: self.relaxed_slots,
            relaxations: self.relaxations,
        }
    }
}
