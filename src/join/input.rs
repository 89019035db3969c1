//! One side of a spatial join: a cursor, the next record and the nest.

use crate::error::Result;
use crate::index::{Cursor, IndexKey};
use crate::record::Record;
use crate::space::ZValue;

/// Spare records kept for reuse by [`JoinInput::load`].
const SPARE_RECORDS: usize = 8;

pub(crate) struct JoinInput<'a, R> {
    cursor: Box<dyn Cursor<R> + 'a>,
    /// Next unprocessed record, copied out of the cursor.
    current: Option<R>,
    /// Processed records whose cells contain the scan position, each
    /// containing the one above it.
    nest: Vec<R>,
    spare: Vec<R>,
    scanned: u64,
    seeks: u64,
}

impl<'a, R: Record> JoinInput<'a, R> {
    pub(crate) fn new(cursor: Box<dyn Cursor<R> + 'a>) -> Result<Self> {
        let mut input = Self {
            cursor,
            current: None,
            nest: Vec::new(),
            spare: Vec::new(),
            scanned: 0,
            seeks: 0,
        };
        input.load()?;
        Ok(input)
    }

    pub(crate) fn current_z(&self) -> Option<ZValue> {
        self.current.as_ref().map(Record::z)
    }

    pub(crate) fn nest(&self) -> &[R] {
        &self.nest
    }

    pub(crate) fn scanned(&self) -> u64 {
        self.scanned
    }

    pub(crate) fn seeks(&self) -> u64 {
        self.seeks
    }

    /// Take the current record and load the next one.
    pub(crate) fn take(&mut self) -> Result<Option<R>> {
        let record = self.current.take();
        if record.is_some() {
            self.load()?;
        }
        Ok(record)
    }

    pub(crate) fn push(&mut self, record: R) {
        debug_assert!(self.nest.last().is_none_or(|top| top.z().contains(record.z())));
        self.nest.push(record);
    }

    /// Drop nest entries whose cells do not contain `position`.
    pub(crate) fn pop_nest(&mut self, position: ZValue) {
        while let Some(top) = self.nest.last() {
            if top.z().contains(position) {
                break;
            }
            if let Some(record) = self.nest.pop() {
                self.recycle(record);
            }
        }
    }

    /// Skip records that cannot pair with anything at or after `target`.
    ///
    /// The current record (at `from`) and every record before the first
    /// one that is an ancestor of `target` or sorts at or after it are
    /// discarded. Ancestors of `target` are probed coarsest first, then
    /// `target` itself.
    pub(crate) fn skip_to(&mut self, from: ZValue, target: ZValue) -> Result<()> {
        self.seeks += 1;
        for level in 0..=target.level() {
            let ancestor = target.ancestor(level);
            if ancestor <= from {
                continue;
            }
            self.cursor.seek(IndexKey::lower_bound(ancestor))?;
            self.load()?;
            match self.current_z() {
                None => return Ok(()),
                Some(z) if z == ancestor || z.contains(target) || z >= target => return Ok(()),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Copy the cursor's next record into `current`, reusing a spare
    /// record when there is one.
    fn load(&mut self) -> Result<()> {
        let slot = self.current.take().or_else(|| self.spare.pop());
        match self.cursor.next()? {
            Some(record) => {
                self.scanned += 1;
                self.current = Some(match slot {
                    Some(mut slot) => {
                        record.copy_to(&mut slot);
                        slot
                    }
                    None => record.clone(),
                });
            }
            None => {
                if let Some(slot) = slot
                    && self.spare.len() < SPARE_RECORDS
                {
                    self.spare.push(slot);
                }
            }
        }
        Ok(())
    }

    fn recycle(&mut self, record: R) {
        if self.spare.len() < SPARE_RECORDS {
            self.spare.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, TreeIndex};
    use crate::record::MutableRecord;
    use crate::spatial_object::{Point, SpatialObject};

    fn z(bits: &str) -> ZValue {
        bits.chars().fold(ZValue::ROOT, |z, c| z.child(c == '1'))
    }

    fn index(cells: &[&str]) -> TreeIndex<MutableRecord<Point>> {
        let mut index = TreeIndex::buffered();
        for (i, cell) in cells.iter().enumerate() {
            let mut p = Point::new(0.0, 0.0);
            p.set_id(i as u64);
            let mut r = MutableRecord::new(p);
            r.set_z(z(cell));
            index.insert(r).unwrap();
        }
        index
    }

    #[test]
    fn test_take_walks_in_order() {
        let index = index(&["1", "0", "01"]);
        let mut input = JoinInput::new(index.cursor(ZValue::ROOT).unwrap()).unwrap();
        let mut seen = Vec::new();
        while let Some(record) = input.take().unwrap() {
            seen.push(record.z());
        }
        assert_eq!(seen, vec![z("0"), z("01"), z("1")]);
        assert_eq!(input.scanned(), 3);
    }

    #[test]
    fn test_nest_pops_non_containing() {
        let index = index(&["0", "01", "011"]);
        let mut input = JoinInput::new(index.cursor(ZValue::ROOT).unwrap()).unwrap();
        for _ in 0..3 {
            let record = input.take().unwrap().unwrap();
            input.pop_nest(record.z());
            input.push(record);
        }
        assert_eq!(input.nest().len(), 3);
        input.pop_nest(z("0100"));
        assert_eq!(input.nest().len(), 2);
        input.pop_nest(z("1"));
        assert!(input.nest().is_empty());
    }

    #[test]
    fn test_skip_stops_at_ancestor() {
        // "0110" is skipped, "10" is an ancestor of the target "1011".
        let index = index(&["00", "0110", "10", "1010", "11"]);
        let mut input = JoinInput::new(index.cursor(ZValue::ROOT).unwrap()).unwrap();
        assert_eq!(input.current_z(), Some(z("00")));
        input.skip_to(z("00"), z("1011")).unwrap();
        assert_eq!(input.current_z(), Some(z("10")));
        assert_eq!(input.seeks(), 1);
    }

    #[test]
    fn test_skip_lands_after_target() {
        let index = index(&["00", "0110", "1010", "11"]);
        let mut input = JoinInput::new(index.cursor(ZValue::ROOT).unwrap()).unwrap();
        input.skip_to(z("00"), z("1011")).unwrap();
        assert_eq!(input.current_z(), Some(z("11")));

        input.skip_to(z("11"), z("111")).unwrap();
        assert_eq!(input.current_z(), None);
    }
}
