//! Bit-vector track sets.
//!
//! A [`TrackSet`] is a subset of one [`TrackUniverse`]: bit `n` is set when the
//! track at universe index `n` is a member. Union, intersection and subtraction
//! are word-wise OR, AND and AND-NOT, which keeps the many set operations of a
//! playlist-generation pass linear and cache friendly.
//!
//! A set may also be *outstanding*: its contents are not known yet because the
//! query producing them has not finished. Outstanding is a separate state, never
//! a flag next to stale bits, so reading an outstanding set fails with
//! [`TrackSetError::NotReady`] instead of returning garbage.
//!
//! ```
//! use dynplay::track_set::TrackSet;
//! use dynplay::universe::TrackUniverse;
//!
//! let universe = TrackUniverse::new(["a", "b", "c", "d"])?.shared();
//!
//! let mut set = TrackSet::full(&universe);
//! set.intersect_identifiers(["a", "b", "c"])?;
//! set.subtract_identifiers(["b", "unknown"])?;
//!
//! assert_eq!(set.track_count()?, 2);
//! assert!(set.contains("c")?);
//! # Ok::<(), dynplay::error::TrackSetError>(())
//! ```

use crate::error::TrackSetError;
use crate::universe::TrackUniverse;
use log::trace;
use rand::Rng;
use std::sync::Arc;

const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-length bit vector packed into `u64` words.
///
/// Bits past `len` in the last word are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    fn filled(len: usize) -> Self {
        let mut bits = Self::zeroed(len);
        bits.fill();
        bits
    }

    fn fill(&mut self) {
        self.words.iter_mut().for_each(|word| *word = !0);
        self.mask_tail();
    }

    fn zero(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }

    fn mask_tail(&mut self) {
        let used = self.len % WORD_BITS;
        if used != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }
    }

    #[inline]
    fn get(&self, index: usize) -> bool {
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    #[inline]
    fn set(&mut self, index: usize) {
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
    }

    #[inline]
    fn unset(&mut self, index: usize) {
        self.words[index / WORD_BITS] &= !(1u64 << (index % WORD_BITS));
    }

    fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    fn is_zero(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    fn or_assign(&mut self, other: &Self) {
        self.words
            .iter_mut()
            .zip(&other.words)
            .for_each(|(a, b)| *a |= b);
    }

    fn and_assign(&mut self, other: &Self) {
        self.words
            .iter_mut()
            .zip(&other.words)
            .for_each(|(a, b)| *a &= b);
    }

    fn and_not_assign(&mut self, other: &Self) {
        self.words
            .iter_mut()
            .zip(&other.words)
            .for_each(|(a, b)| *a &= !b);
    }

    /// Position of the `n`th set bit (zero-based).
    fn nth_one(&self, mut n: usize) -> Option<usize> {
        for (word_index, &word) in self.words.iter().enumerate() {
            let ones = word.count_ones() as usize;
            if n >= ones {
                n -= ones;
                continue;
            }

            // Drop the lowest `n` set bits, the next one is ours.
            let mut rest = word;
            for _ in 0..n {
                rest &= rest - 1;
            }
            return Some(word_index * WORD_BITS + rest.trailing_zeros() as usize);
        }
        None
    }

    fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                let mut rest = word;
                std::iter::from_fn(move || {
                    if rest == 0 {
                        return None;
                    }
                    let bit = rest.trailing_zeros() as usize;
                    rest &= rest - 1;
                    Some(word_index * WORD_BITS + bit)
                })
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Membership {
    Outstanding,
    Ready(BitVector),
}

/// A set of tracks relative to one [`TrackUniverse`].
///
/// Cloning copies the bits; two clones never alias.
#[derive(Debug, Clone)]
pub struct TrackSet {
    universe: Arc<TrackUniverse>,
    membership: Membership,
}

impl TrackSet {
    /// A set containing every track of `universe`. This is the "no constraint yet" state.
    #[must_use]
    pub fn full(universe: &Arc<TrackUniverse>) -> Self {
        Self {
            universe: Arc::clone(universe),
            membership: Membership::Ready(BitVector::filled(universe.size())),
        }
    }

    /// A set whose contents are not known yet.
    #[must_use]
    pub fn outstanding(universe: &Arc<TrackUniverse>) -> Self {
        Self {
            universe: Arc::clone(universe),
            membership: Membership::Outstanding,
        }
    }

    #[must_use]
    pub fn empty(universe: &Arc<TrackUniverse>) -> Self {
        Self {
            universe: Arc::clone(universe),
            membership: Membership::Ready(BitVector::zeroed(universe.size())),
        }
    }

    /// A set holding exactly the listed tracks. Unknown identifiers are ignored.
    pub fn from_identifiers<I, S>(universe: &Arc<TrackUniverse>, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            universe: Arc::clone(universe),
            membership: Membership::Ready(mask_for(universe, identifiers)),
        }
    }

    #[must_use]
    pub fn universe(&self) -> &Arc<TrackUniverse> {
        &self.universe
    }

    /// Whether both sets were built against the very same universe instance.
    #[must_use]
    pub fn same_universe(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.universe, &other.universe)
    }

    /// Returns true if the results of this set are not yet available.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        matches!(self.membership, Membership::Outstanding)
    }

    /// Remove every track. An outstanding set becomes ready and empty.
    pub fn clear(&mut self) {
        match &mut self.membership {
            Membership::Ready(bits) => bits.zero(),
            Membership::Outstanding => {
                self.membership = Membership::Ready(BitVector::zeroed(self.universe.size()));
            }
        }
    }

    /// Add every track of the universe. An outstanding set becomes ready and full.
    pub fn reset(&mut self) {
        match &mut self.membership {
            Membership::Ready(bits) => bits.fill(),
            Membership::Outstanding => {
                self.membership = Membership::Ready(BitVector::filled(self.universe.size()));
            }
        }
    }

    fn bits(&self) -> Result<&BitVector, TrackSetError> {
        match &self.membership {
            Membership::Ready(bits) => Ok(bits),
            Membership::Outstanding => Err(TrackSetError::NotReady),
        }
    }

    fn bits_mut(&mut self) -> Result<&mut BitVector, TrackSetError> {
        match &mut self.membership {
            Membership::Ready(bits) => Ok(bits),
            Membership::Outstanding => Err(TrackSetError::NotReady),
        }
    }

    /// Number of tracks in the set.
    pub fn track_count(&self) -> Result<usize, TrackSetError> {
        Ok(self.bits()?.count_ones())
    }

    pub fn is_empty(&self) -> Result<bool, TrackSetError> {
        Ok(self.bits()?.is_zero())
    }

    pub fn is_full(&self) -> Result<bool, TrackSetError> {
        Ok(self.bits()?.count_ones() == self.universe.size())
    }

    /// Membership test. Identifiers outside the universe are never members.
    pub fn contains(&self, identifier: &str) -> Result<bool, TrackSetError> {
        let bits = self.bits()?;
        Ok(self
            .universe
            .index_of(identifier)
            .is_some_and(|index| bits.get(index)))
    }

    /// Add one track. Returns whether the set changed.
    pub fn insert(&mut self, identifier: &str) -> Result<bool, TrackSetError> {
        let index = self.universe.index_of(identifier);
        let bits = self.bits_mut()?;
        Ok(match index {
            Some(index) if !bits.get(index) => {
                bits.set(index);
                true
            }
            _ => false,
        })
    }

    /// Remove one track. Returns whether the set changed.
    pub fn remove(&mut self, identifier: &str) -> Result<bool, TrackSetError> {
        let index = self.universe.index_of(identifier);
        let bits = self.bits_mut()?;
        Ok(match index {
            Some(index) if bits.get(index) => {
                bits.unset(index);
                true
            }
            _ => false,
        })
    }

    /// Identifiers of all member tracks, in universe order.
    pub fn identifiers(&self) -> Result<impl Iterator<Item = &str> + '_, TrackSetError> {
        let bits = self.bits()?;
        let universe = &self.universe;
        Ok(bits
            .ones()
            .filter_map(move |index| universe.identifier_at(index).ok()))
    }

    /// Uniformly random member, drawn with the thread-local generator.
    pub fn random_track(&self) -> Result<&str, TrackSetError> {
        self.random_track_with(&mut rand::thread_rng())
    }

    /// Uniformly random member: every member has probability `1 / track_count()`.
    ///
    /// # Errors
    ///
    /// [`TrackSetError::EmptySet`] if there are no members, [`TrackSetError::NotReady`]
    /// if the set is outstanding.
    pub fn random_track_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&str, TrackSetError> {
        let bits = self.bits()?;
        let count = bits.count_ones();
        if count == 0 {
            return Err(TrackSetError::EmptySet);
        }

        let nth = rng.gen_range(0..count);
        let index = bits.nth_one(nth).ok_or(TrackSetError::EmptySet)?;
        trace!("Drew member {nth} of {count} (universe index {index})");
        self.universe.identifier_at(index)
    }

    /// Checks that `other` can be combined with `self` and returns its bits.
    fn operand<'a>(&self, other: &'a Self) -> Result<&'a BitVector, TrackSetError> {
        if !self.same_universe(other) {
            return Err(TrackSetError::MismatchedUniverse);
        }
        self.bits()?;
        other.bits()
    }

    /// `self ∪= other`.
    pub fn unite_set(&mut self, other: &Self) -> Result<(), TrackSetError> {
        let other = self.operand(other)?;
        self.bits_mut()?.or_assign(other);
        Ok(())
    }

    /// `self ∩= other`.
    pub fn intersect_set(&mut self, other: &Self) -> Result<(), TrackSetError> {
        let other = self.operand(other)?;
        self.bits_mut()?.and_assign(other);
        Ok(())
    }

    /// `self \= other`.
    pub fn subtract_set(&mut self, other: &Self) -> Result<(), TrackSetError> {
        let other = self.operand(other)?;
        self.bits_mut()?.and_not_assign(other);
        Ok(())
    }

    /// Add the listed tracks. Unknown identifiers are ignored.
    pub fn unite_identifiers<I, S>(&mut self, identifiers: I) -> Result<(), TrackSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mask = mask_for(&self.universe, identifiers);
        self.bits_mut()?.or_assign(&mask);
        Ok(())
    }

    /// Keep only the listed tracks. Unknown identifiers are ignored.
    pub fn intersect_identifiers<I, S>(&mut self, identifiers: I) -> Result<(), TrackSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mask = mask_for(&self.universe, identifiers);
        self.bits_mut()?.and_assign(&mask);
        Ok(())
    }

    /// Remove the listed tracks. Unknown identifiers are ignored.
    pub fn subtract_identifiers<I, S>(&mut self, identifiers: I) -> Result<(), TrackSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mask = mask_for(&self.universe, identifiers);
        self.bits_mut()?.and_not_assign(&mask);
        Ok(())
    }
}

/// Two sets are equal when they share a universe instance and hold the same state.
impl PartialEq for TrackSet {
    fn eq(&self, other: &Self) -> bool {
        self.same_universe(other) && self.membership == other.membership
    }
}

impl Eq for TrackSet {}

fn mask_for<I, S>(universe: &TrackUniverse, identifiers: I) -> BitVector
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut mask = BitVector::zeroed(universe.size());
    identifiers
        .into_iter()
        .filter_map(|identifier| universe.index_of(identifier.as_ref()))
        .for_each(|index| mask.set(index));
    mask
}
