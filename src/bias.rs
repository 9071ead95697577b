//! Bias constraints.
//!
//! A bias turns a domain rule ("only jazz", "not these tracks") into a
//! [`TrackSet`] over the run's universe. The solver intersects the sets of all
//! active biases to find the candidate pool.
//!
//! Evaluation returns a future. A bias that answers from memory returns an
//! already-completed one; a bias that queries the [`TrackStore`] may suspend
//! the solver until the store answers. Other biases keep evaluating meanwhile.
//!
//! # Stock biases
//!
//! - [`IdentifierBias`] - include or exclude a fixed identifier list
//! - [`TagMatchBias`] - include or exclude tracks whose tag matches a [`TagFilter`]
//! - [`AndBias`] / [`OrBias`] - combine other biases by intersection / union

use crate::store::{TagFilter, TrackStore};
use crate::track_set::TrackSet;
use crate::universe::TrackUniverse;
use anyhow::{Context, Result};
use futures::future::{self, FutureExt, LocalBoxFuture};
use log::debug;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::Arc;

/// A constraint the solver narrows the candidate pool with.
pub trait Bias {
    /// Human-readable label used in logs and relaxation reports.
    fn name(&self) -> String;

    /// Lower values are applied first and relaxed last. Ties keep declaration order.
    fn priority(&self) -> i32 {
        0
    }

    /// Compute this bias's track set against `universe`.
    ///
    /// The returned set must be built against `universe` itself and must not be
    /// outstanding.
    fn evaluate<'a>(&'a self, universe: &Arc<TrackUniverse>) -> LocalBoxFuture<'a, Result<TrackSet>>;

    /// A looser version of this bias, tried before the solver drops it entirely.
    fn widen(&self) -> Option<Box<dyn Bias>> {
        None
    }
}

/// Whether a bias keeps or removes the tracks it matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasMode {
    #[default]
    Include,
    Exclude,
}

impl BiasMode {
    /// Apply to a full set: keep only `identifiers`, or remove them.
    fn apply<I, S>(self, universe: &Arc<TrackUniverse>, identifiers: I) -> Result<TrackSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = TrackSet::full(universe);
        match self {
            Self::Include => set.intersect_identifiers(identifiers)?,
            Self::Exclude => set.subtract_identifiers(identifiers)?,
        }
        Ok(set)
    }

    const fn verb(self) -> &'static str {
        match self {
            Self::Include => "match",
            Self::Exclude => "exclude",
        }
    }
}

/// Fixed identifier list.
#[derive(Debug, Clone)]
pub struct IdentifierBias {
    label: String,
    identifiers: Vec<String>,
    mode: BiasMode,
    priority: i32,
}

impl IdentifierBias {
    pub fn include<I, S>(label: impl Into<String>, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            mode: BiasMode::Include,
            priority: 0,
        }
    }

    pub fn exclude<I, S>(label: impl Into<String>, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: BiasMode::Exclude,
            ..Self::include(label, identifiers)
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Bias for IdentifierBias {
    fn name(&self) -> String {
        self.label.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn evaluate<'a>(&'a self, universe: &Arc<TrackUniverse>) -> LocalBoxFuture<'a, Result<TrackSet>> {
        future::ready(self.mode.apply(universe, &self.identifiers)).boxed_local()
    }
}

/// Tracks whose tag equals a value, looked up in the [`TrackStore`].
pub struct TagMatchBias {
    store: Rc<dyn TrackStore>,
    filter: TagFilter,
    mode: BiasMode,
    priority: i32,
}

impl TagMatchBias {
    pub fn new(store: Rc<dyn TrackStore>, filter: TagFilter, mode: BiasMode) -> Self {
        Self {
            store,
            filter,
            mode,
            priority: 0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Bias for TagMatchBias {
    fn name(&self) -> String {
        format!("{} {}", self.mode.verb(), self.filter)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn evaluate<'a>(&'a self, universe: &Arc<TrackUniverse>) -> LocalBoxFuture<'a, Result<TrackSet>> {
        let universe = Arc::clone(universe);
        async move {
            let matches = self
                .store
                .query(&self.filter)
                .await
                .with_context(|| format!("Track store query for '{}' failed", self.filter))?;
            debug!("{} matched {} tracks", self.name(), matches.len());
            self.mode.apply(&universe, &matches)
        }
        .boxed_local()
    }
}

/// Intersection of its children: a track must satisfy all of them.
#[derive(Clone)]
pub struct AndBias {
    children: Vec<Rc<dyn Bias>>,
    priority: i32,
}

impl AndBias {
    #[must_use]
    pub fn new(children: Vec<Rc<dyn Bias>>) -> Self {
        Self {
            children,
            priority: 0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Bias for AndBias {
    fn name(&self) -> String {
        format!("all of ({})", join_names(&self.children))
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn evaluate<'a>(&'a self, universe: &Arc<TrackUniverse>) -> LocalBoxFuture<'a, Result<TrackSet>> {
        let pending = future::try_join_all(self.children.iter().map(|child| child.evaluate(universe)));
        let universe = Arc::clone(universe);
        async move {
            let mut combined = TrackSet::full(&universe);
            for set in pending.await? {
                combined.intersect_set(&set)?;
            }
            Ok(combined)
        }
        .boxed_local()
    }

    /// Drops the last child, as long as one would remain.
    fn widen(&self) -> Option<Box<dyn Bias>> {
        if self.children.len() < 2 {
            return None;
        }
        let mut wider = self.clone();
        wider.children.pop();
        Some(Box::new(wider))
    }
}

/// Union of its children: a track must satisfy at least one.
#[derive(Clone)]
pub struct OrBias {
    children: Vec<Rc<dyn Bias>>,
    priority: i32,
}

impl OrBias {
    #[must_use]
    pub fn new(children: Vec<Rc<dyn Bias>>) -> Self {
        Self {
            children,
            priority: 0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Bias for OrBias {
    fn name(&self) -> String {
        format!("any of ({})", join_names(&self.children))
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn evaluate<'a>(&'a self, universe: &Arc<TrackUniverse>) -> LocalBoxFuture<'a, Result<TrackSet>> {
        let pending = future::try_join_all(self.children.iter().map(|child| child.evaluate(universe)));
        let universe = Arc::clone(universe);
        async move {
            let mut combined = TrackSet::empty(&universe);
            for set in pending.await? {
                combined.unite_set(&set)?;
            }
            Ok(combined)
        }
        .boxed_local()
    }
}

fn join_names(children: &[Rc<dyn Bias>]) -> String {
    children
        .iter()
        .map(|child| child.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryTrackStore, TagField, TrackRecord};
    use futures::executor::block_on;
    use std::collections::BTreeSet;

    fn universe(n: usize) -> Arc<TrackUniverse> {
        TrackUniverse::new((1..=n).map(|i| format!("t{i}")))
            .unwrap()
            .shared()
    }

    fn members(set: &TrackSet) -> BTreeSet<String> {
        set.identifiers().unwrap().map(str::to_owned).collect()
    }

    fn expected(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| (*id).to_owned()).collect()
    }

    fn tagged_store() -> Rc<dyn TrackStore> {
        let genres = ["Jazz", "Rock", "Jazz", "Pop"];
        Rc::new(MemoryTrackStore::new(
            genres
                .iter()
                .enumerate()
                .map(|(i, genre)| TrackRecord {
                    id: format!("t{}", i + 1),
                    genre: (*genre).to_string(),
                    ..TrackRecord::default()
                })
                .collect(),
        ))
    }

    #[test]
    fn test_identifier_bias_include_and_exclude() {
        let universe = universe(5);

        let include = IdentifierBias::include("firsts", ["t1", "t2", "zzz"]);
        let set = block_on(include.evaluate(&universe)).unwrap();
        assert_eq!(members(&set), expected(&["t1", "t2"]));

        let exclude = IdentifierBias::exclude("no firsts", ["t1", "t2"]);
        let set = block_on(exclude.evaluate(&universe)).unwrap();
        assert_eq!(members(&set), expected(&["t3", "t4", "t5"]));
    }

    #[test]
    fn test_tag_match_bias_queries_store() {
        let universe = universe(4);
        let store = tagged_store();

        let jazz = TagMatchBias::new(
            Rc::clone(&store),
            TagFilter::new(TagField::Genre, "jazz"),
            BiasMode::Include,
        );
        assert_eq!(jazz.name(), "match genre=jazz");
        let set = block_on(jazz.evaluate(&universe)).unwrap();
        assert_eq!(members(&set), expected(&["t1", "t3"]));

        let no_rock = TagMatchBias::new(store, TagFilter::new(TagField::Genre, "rock"), BiasMode::Exclude);
        let set = block_on(no_rock.evaluate(&universe)).unwrap();
        assert_eq!(members(&set), expected(&["t1", "t3", "t4"]));
    }

    #[test]
    fn test_and_or_composition() {
        let universe = universe(6);
        let odd: Rc<dyn Bias> = Rc::new(IdentifierBias::include("odd", ["t1", "t3", "t5"]));
        let low: Rc<dyn Bias> = Rc::new(IdentifierBias::include("low", ["t1", "t2", "t3"]));

        let both = AndBias::new(vec![Rc::clone(&odd), Rc::clone(&low)]);
        assert_eq!(both.name(), "all of (odd, low)");
        let set = block_on(both.evaluate(&universe)).unwrap();
        assert_eq!(members(&set), expected(&["t1", "t3"]));

        let either = OrBias::new(vec![odd, low]);
        let set = block_on(either.evaluate(&universe)).unwrap();
        assert_eq!(members(&set), expected(&["t1", "t2", "t3", "t5"]));
    }

    #[test]
    fn test_and_bias_widens_by_dropping_last_child() {
        let universe = universe(6);
        let odd: Rc<dyn Bias> = Rc::new(IdentifierBias::include("odd", ["t1", "t3", "t5"]));
        let low: Rc<dyn Bias> = Rc::new(IdentifierBias::include("low", ["t1", "t2", "t3"]));
        let both = AndBias::new(vec![odd, low]).with_priority(3);

        let wider = both.widen().expect("two children can be widened");
        assert_eq!(wider.name(), "all of (odd)");
        assert_eq!(wider.priority(), 3);
        let set = block_on(wider.evaluate(&universe)).unwrap();
        assert_eq!(members(&set), expected(&["t1", "t3", "t5"]));

        assert!(wider.widen().is_none());
    }

    #[test]
    fn test_empty_or_bias_matches_nothing() {
        let universe = universe(3);
        let set = block_on(OrBias::new(Vec::new()).evaluate(&universe)).unwrap();
        assert!(set.is_empty().unwrap());
    }
}
