//! Retained rows outside the viewport
//!
//! History is kept as a sequence of segments. A segment is a contiguous run
//! of absolute row positions with one owner: either plain scrollback or a
//! single frame. Removing a frame's rows can leave gaps in the absolute
//! numbering, which is fine because nothing indexes history by position
//! except the owner lookups here.

use std::collections::VecDeque;
use std::ops::Range;

use crate::core::Row;

use super::frame::FrameId;

/// Who a retained row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Plain,
    Frame(FrameId),
}

#[derive(Debug, Clone)]
struct Segment {
    owner: Owner,
    /// Absolute position of `rows[0]`
    start: u64,
    rows: VecDeque<Row>,
}

impl Segment {
    fn end(&self) -> u64 {
        self.start + self.rows.len() as u64
    }
}

/// Rows that have left the top of the primary viewport, oldest first
#[derive(Debug, Clone, Default)]
pub struct ScrollbackStore {
    segments: VecDeque<Segment>,
    len: usize,
    /// Every position below this was discarded by a trim or clear
    trimmed_to: u64,
}

impl ScrollbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a row that just left the viewport at absolute position `abs`
    pub fn push(&mut self, abs: u64, mut row: Row, owner: Owner) {
        row.clear_dirty();
        self.len += 1;
        if let Some(last) = self.segments.back_mut() {
            if last.owner == owner && last.end() == abs {
                last.rows.push_back(row);
                return;
            }
        }
        self.segments.push_back(Segment {
            owner,
            start: abs,
            rows: VecDeque::from([row]),
        });
    }

    /// Drop up to `count` of the oldest rows regardless of owner. Returns
    /// how many were removed.
    pub fn trim_oldest(&mut self, count: usize) -> usize {
        let mut removed = 0;
        while removed < count {
            let Some(front) = self.segments.front_mut() else {
                break;
            };
            let take = (count - removed).min(front.rows.len());
            front.rows.drain(..take);
            front.start += take as u64;
            self.trimmed_to = self.trimmed_to.max(front.start);
            removed += take;
            if front.rows.is_empty() {
                self.segments.pop_front();
            }
        }
        self.len -= removed;
        removed
    }

    /// Remove every row owned by `id`
    pub fn remove_owner(&mut self, id: FrameId) -> usize {
        let owner = Owner::Frame(id);
        let mut removed = 0;
        self.segments.retain(|segment| {
            if segment.owner == owner {
                removed += segment.rows.len();
                false
            } else {
                true
            }
        });
        self.len -= removed;
        self.merge_adjacent();
        removed
    }

    /// Hand plain rows in `range` over to frame `id`. Rows owned by other
    /// frames are left alone. Returns how many rows changed owner.
    pub fn reassign(&mut self, range: Range<u64>, id: FrameId) -> usize {
        if range.start >= range.end {
            return 0;
        }
        let mut moved = 0;
        let mut result = VecDeque::with_capacity(self.segments.len() + 2);
        for mut segment in self.segments.drain(..) {
            let overlaps = segment.start < range.end && range.start < segment.end();
            if segment.owner != Owner::Plain || !overlaps {
                result.push_back(segment);
                continue;
            }
            let cut_start = range.start.max(segment.start);
            let cut_end = range.end.min(segment.end());
            let tail = segment
                .rows
                .split_off((cut_end - segment.start) as usize);
            let middle = segment
                .rows
                .split_off((cut_start - segment.start) as usize);
            moved += middle.len();
            if !segment.rows.is_empty() {
                result.push_back(Segment {
                    owner: Owner::Plain,
                    start: segment.start,
                    rows: segment.rows,
                });
            }
            result.push_back(Segment {
                owner: Owner::Frame(id),
                start: cut_start,
                rows: middle,
            });
            if !tail.is_empty() {
                result.push_back(Segment {
                    owner: Owner::Plain,
                    start: cut_end,
                    rows: tail,
                });
            }
        }
        self.segments = result;
        self.merge_adjacent();
        moved
    }

    /// Join neighbouring segments with the same owner and no gap between
    fn merge_adjacent(&mut self) {
        let mut merged: VecDeque<Segment> = VecDeque::with_capacity(self.segments.len());
        for segment in self.segments.drain(..) {
            if let Some(last) = merged.back_mut() {
                if last.owner == segment.owner && last.end() == segment.start {
                    last.rows.extend(segment.rows);
                    continue;
                }
            }
            merged.push_back(segment);
        }
        self.segments = merged;
    }

    pub fn rows_owned_by(&self, id: FrameId) -> usize {
        let owner = Owner::Frame(id);
        self.segments
            .iter()
            .filter(|s| s.owner == owner)
            .map(|s| s.rows.len())
            .sum()
    }

    /// Rows owned by `id`, oldest first
    pub fn frame_rows(&self, id: FrameId) -> impl Iterator<Item = &Row> {
        let owner = Owner::Frame(id);
        self.segments
            .iter()
            .filter(move |s| s.owner == owner)
            .flat_map(|s| s.rows.iter())
    }

    /// Every retained row with its absolute position and owner
    pub fn iter(&self) -> impl Iterator<Item = (u64, Owner, &Row)> {
        self.segments.iter().flat_map(|s| {
            s.rows
                .iter()
                .enumerate()
                .map(move |(i, row)| (s.start + i as u64, s.owner, row))
        })
    }

    pub fn trimmed_to(&self) -> u64 {
        self.trimmed_to
    }

    /// ED 3
    pub fn clear(&mut self) {
        if let Some(last) = self.segments.back() {
            self.trimmed_to = self.trimmed_to.max(last.end());
        }
        self.segments.clear();
        self.len = 0;
    }

    /// Truncate or pad every retained row to `cols`
    pub fn resize(&mut self, cols: usize) {
        for segment in &mut self.segments {
            for row in &mut segment.rows {
                row.resize(cols);
                row.clear_dirty();
            }
        }
    }

    /// Text of every retained row, one per line
    pub fn text(&self) -> String {
        self.iter()
            .map(|(_, _, row)| row.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[cfg(test)]
    fn segment_count(&self) -> usize {
        self.segments.len()
    }
}
