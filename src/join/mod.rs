//! Spatial joins by merging two z-ordered record streams.
//!
//! Both inputs are scanned in z-value order. Because an ancestor cell
//! sorts before its descendants, every pair of records whose cells are
//! nested (or equal) can be found with one pass: each input keeps a stack
//! (the *nest*) of already-processed records whose cells contain the scan
//! position, and each new record is matched against the other input's
//! nest. When the other nest is empty the scanning input can seek ahead,
//! skipping records that cannot have partners.
//!
//! Candidate pairs are refined by an application-supplied [`JoinFilter`].
//!
//! ```rust
//! use std::sync::Arc;
//! use zjoin::prelude::*;
//!
//! let space = Arc::new(Space::new(&[0.0, 0.0], &[1000.0, 1000.0], &[20, 20])?);
//! let mut boxes: SpatialIndex<StableRecord<BBox>> = SpatialIndex::in_memory(space.clone());
//! let mut points: SpatialIndex<StableRecord<Point>> = SpatialIndex::in_memory(space);
//!
//! boxes.add(&mut BBox::new(4.0, 4.0, 10.0, 10.0), &mut StableRecord::<BBox>::factory())?;
//! let mut factory = StableRecord::<Point>::factory();
//! points.add(&mut Point::new(5.0, 5.0), &mut factory)?;
//! points.add(&mut Point::new(1.0, 5.0), &mut factory)?;
//!
//! let join = SpatialJoin::new(
//!     Duplicates::Exclude,
//!     |b: &StableRecord<BBox>, p: &StableRecord<Point>| {
//!         b.spatial_object().contains_point(p.spatial_object().coords())
//!     },
//! );
//! let pairs = join.iterator(&boxes, &points)?.collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(pairs.len(), 1);
//! assert_eq!(pairs[0].right.spatial_object().x(), 5.0);
//! # Ok::<(), zjoin::SpatialError>(())
//! ```

mod dedup;
mod input;

use crate::decompose::Decomposer;
use crate::error::{Result, SpatialError};
use crate::index::{Index, VecCursor};
use crate::record::{Record, StableRecord};
use crate::space::{Space, ZValue};
use crate::spatial_index::SpatialIndex;
use crate::spatial_object::SpatialObject;
use dedup::{EmittedPairs, Side};
use input::JoinInput;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::iter::FusedIterator;

/// What to do with a pair of objects that meet in more than one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Duplicates {
    /// Emit the pair once per cell pair it is found in.
    Include,
    /// Emit each pair of objects at most once.
    #[default]
    Exclude,
}

/// Decides whether a candidate pair is a real match.
pub trait JoinFilter<L, R> {
    fn overlap(&self, left: &L, right: &R) -> Result<bool>;
}

impl<L, R, F> JoinFilter<L, R> for F
where
    F: Fn(&L, &R) -> bool,
{
    fn overlap(&self, left: &L, right: &R) -> Result<bool> {
        Ok(self(left, right))
    }
}

/// A [`JoinFilter`] built from a fallible closure.
#[derive(Debug, Clone, Copy)]
pub struct TryFilter<F>(F);

/// Wrap a closure returning `Result<bool>` as a join filter. Errors abort
/// the join.
pub fn try_filter<L, R, F>(f: F) -> TryFilter<F>
where
    F: Fn(&L, &R) -> Result<bool>,
{
    TryFilter(f)
}

impl<L, R, F> JoinFilter<L, R> for TryFilter<F>
where
    F: Fn(&L, &R) -> Result<bool>,
{
    fn overlap(&self, left: &L, right: &R) -> Result<bool> {
        (self.0)(left, right).map_err(|e| match e {
            SpatialError::Predicate(_) => e,
            other => SpatialError::Predicate(other.to_string()),
        })
    }
}

/// A joined pair of records.
#[derive(Debug, Clone)]
pub struct Pair<L, R> {
    pub left: L,
    pub right: R,
}

/// Counters describing a join run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Records read from the left input
    pub left_scanned: u64,
    /// Records read from the right input
    pub right_scanned: u64,
    /// Forward seeks performed by both inputs
    pub seeks: u64,
    /// Nested cell pairs found
    pub candidates: u64,
    /// Calls to the join filter
    pub filter_calls: u64,
    /// Pairs returned
    pub emitted: u64,
    /// Pairs skipped because they were already returned
    pub duplicates_suppressed: u64,
}

/// A spatial join configuration: duplicate policy and filter.
#[derive(Debug, Clone)]
pub struct SpatialJoin<F> {
    duplicates: Duplicates,
    filter: F,
}

impl<F> SpatialJoin<F> {
    pub fn new(duplicates: Duplicates, filter: F) -> Self {
        Self { duplicates, filter }
    }

    pub fn duplicates(&self) -> Duplicates {
        self.duplicates
    }

    /// Join two spatial indexes built on the same space.
    ///
    /// Joining an index with itself is detected; pairs of an object with
    /// itself are dropped and each unordered pair is reported once, with
    /// the smaller soid on the left.
    pub fn iterator<'a, L, R, IL, IR>(
        &'a self,
        left: &'a SpatialIndex<L, IL>,
        right: &'a SpatialIndex<R, IR>,
    ) -> Result<SpatialJoinIterator<'a, L, R, F>>
    where
        L: Record,
        R: Record,
        IL: Index<L>,
        IR: Index<R>,
        F: JoinFilter<L, R>,
    {
        check_spaces(left.space(), right.space())?;
        let self_join = std::ptr::eq(
            left as *const SpatialIndex<L, IL> as *const (),
            right as *const SpatialIndex<R, IR> as *const (),
        );
        Ok(SpatialJoinIterator::new(
            JoinInput::new(left.cursor(ZValue::ROOT)?)?,
            JoinInput::new(right.cursor(ZValue::ROOT)?)?,
            Matcher::new(&self.filter, self.duplicates, self_join, left.space()),
        ))
    }

    /// Find the records of `index` that match a single object.
    ///
    /// The object is decomposed on the fly and joined as the left input;
    /// the filter sees it wrapped in a [`StableRecord`].
    pub fn query<'a, O, R, I>(
        &'a self,
        object: &O,
        index: &'a SpatialIndex<R, I>,
    ) -> Result<QueryIterator<'a, O, R, F>>
    where
        O: SpatialObject + Clone + 'a,
        R: Record,
        I: Index<R>,
        F: JoinFilter<StableRecord<O>, R>,
    {
        let space = index.space();
        let z_values = Decomposer::new(space).decompose(object)?;
        let template = StableRecord::new(object.clone());
        let records: Vec<_> = z_values
            .into_iter()
            .map(|z| {
                let mut record = template.clone();
                record.set_z(z);
                record
            })
            .collect();
        let inner = SpatialJoinIterator::new(
            JoinInput::new(Box::new(VecCursor::new(records)))?,
            JoinInput::new(index.cursor(ZValue::ROOT)?)?,
            Matcher::new(&self.filter, self.duplicates, false, space),
        );
        Ok(QueryIterator { inner })
    }
}

fn check_spaces(left: &Space, right: &Space) -> Result<()> {
    if std::ptr::eq(left, right) || left == right {
        Ok(())
    } else {
        Err(SpatialError::Configuration(
            "Cannot join indexes built on different spaces".into(),
        ))
    }
}

/// Applies the self-join rule, duplicate policy and filter to candidates.
struct Matcher<'a, L, R, F> {
    filter: &'a F,
    self_join: bool,
    decomposer: Decomposer<'a>,
    emitted: Option<EmittedPairs>,
    output: VecDeque<Pair<L, R>>,
    stats: JoinStats,
}

impl<'a, L, R, F> Matcher<'a, L, R, F>
where
    L: Record,
    R: Record,
    F: JoinFilter<L, R>,
{
    fn new(filter: &'a F, duplicates: Duplicates, self_join: bool, space: &'a Space) -> Self {
        Self {
            filter,
            self_join,
            decomposer: Decomposer::new(space),
            emitted: match duplicates {
                Duplicates::Include => None,
                Duplicates::Exclude => Some(EmittedPairs::new()),
            },
            output: VecDeque::new(),
            stats: JoinStats::default(),
        }
    }

    fn candidate(&mut self, left: &L, right: &R) -> Result<()> {
        self.stats.candidates += 1;
        let (l, r) = (left.soid(), right.soid());
        if self.self_join && l >= r {
            return Ok(());
        }
        if let Some(emitted) = &self.emitted
            && emitted.contains(l, r)
        {
            self.stats.duplicates_suppressed += 1;
            return Ok(());
        }
        self.stats.filter_calls += 1;
        if !self.filter.overlap(left, right)? {
            return Ok(());
        }
        if let Some(emitted) = &mut self.emitted {
            let left_hi =
                emitted.cover_hi(Side::Left, l, left.spatial_object(), &self.decomposer)?;
            let right_hi =
                emitted.cover_hi(Side::Right, r, right.spatial_object(), &self.decomposer)?;
            emitted.insert(l, r, left_hi.min(right_hi));
        }
        self.stats.emitted += 1;
        self.output.push_back(Pair {
            left: left.clone(),
            right: right.clone(),
        });
        Ok(())
    }
}

/// Lazy iterator over the pairs of a spatial join.
///
/// Yields `Err` at most once; the iterator is exhausted afterwards.
pub struct SpatialJoinIterator<'a, L, R, F> {
    left: JoinInput<'a, L>,
    right: JoinInput<'a, R>,
    matcher: Matcher<'a, L, R, F>,
    done: bool,
}

impl<'a, L, R, F> SpatialJoinIterator<'a, L, R, F>
where
    L: Record,
    R: Record,
    F: JoinFilter<L, R>,
{
    fn new(left: JoinInput<'a, L>, right: JoinInput<'a, R>, matcher: Matcher<'a, L, R, F>) -> Self {
        Self {
            left,
            right,
            matcher,
            done: false,
        }
    }

    /// Counters for the work done so far.
    pub fn stats(&self) -> JoinStats {
        JoinStats {
            left_scanned: self.left.scanned(),
            right_scanned: self.right.scanned(),
            seeks: self.left.seeks() + self.right.seeks(),
            ..self.matcher.stats.clone()
        }
    }

    /// Process the record with the smallest z-value.
    fn step(&mut self) -> Result<()> {
        let (position, left_first) = match (self.left.current_z(), self.right.current_z()) {
            (None, None) => {
                self.finish();
                return Ok(());
            }
            (Some(l), None) => (l, true),
            (None, Some(r)) => (r, false),
            (Some(l), Some(r)) => (l.min(r), l <= r),
        };
        self.left.pop_nest(position);
        self.right.pop_nest(position);
        if let Some(emitted) = &mut self.matcher.emitted {
            emitted.release(position);
        }

        if left_first {
            if self.right.nest().is_empty() {
                match self.right.current_z() {
                    None => {
                        self.finish();
                        return Ok(());
                    }
                    Some(target) if !position.contains(target) => {
                        return self.left.skip_to(position, target);
                    }
                    Some(_) => {}
                }
            }
            if let Some(record) = self.left.take()? {
                for other in self.right.nest() {
                    self.matcher.candidate(&record, other)?;
                }
                self.left.push(record);
            }
        } else {
            if self.left.nest().is_empty() {
                match self.left.current_z() {
                    None => {
                        self.finish();
                        return Ok(());
                    }
                    Some(target) if !position.contains(target) => {
                        return self.right.skip_to(position, target);
                    }
                    Some(_) => {}
                }
            }
            if let Some(record) = self.right.take()? {
                for other in self.left.nest() {
                    self.matcher.candidate(other, &record)?;
                }
                self.right.push(record);
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.done = true;
        log::debug!(
            "spatial join finished: {:?}, {} pairs still remembered",
            self.stats(),
            self.matcher.emitted.as_ref().map_or(0, EmittedPairs::len)
        );
    }
}

impl<L, R, F> Iterator for SpatialJoinIterator<'_, L, R, F>
where
    L: Record,
    R: Record,
    F: JoinFilter<L, R>,
{
    type Item = Result<Pair<L, R>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.matcher.output.pop_front() {
                return Some(Ok(pair));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.step() {
                self.done = true;
                self.matcher.output.clear();
                log::debug!("spatial join aborted: {}", e);
                return Some(Err(e));
            }
        }
    }
}

impl<L, R, F> FusedIterator for SpatialJoinIterator<'_, L, R, F>
where
    L: Record,
    R: Record,
    F: JoinFilter<L, R>,
{
}

/// Iterator over the records matching a single query object.
pub struct QueryIterator<'a, O, R, F> {
    inner: SpatialJoinIterator<'a, StableRecord<O>, R, F>,
}

impl<O, R, F> QueryIterator<'_, O, R, F>
where
    O: SpatialObject,
    R: Record,
    F: JoinFilter<StableRecord<O>, R>,
{
    pub fn stats(&self) -> JoinStats {
        self.inner.stats()
    }
}

impl<O, R, F> Iterator for QueryIterator<'_, O, R, F>
where
    O: SpatialObject,
    R: Record,
    F: JoinFilter<StableRecord<O>, R>,
{
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|pair| pair.map(|pair| pair.right))
    }
}

impl<O, R, F> FusedIterator for QueryIterator<'_, O, R, F>
where
    O: SpatialObject,
    R: Record,
    F: JoinFilter<StableRecord<O>, R>,
{
}
