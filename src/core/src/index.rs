// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};

use serde::{Deserialize, Serialize};
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Slice with optional bounds: missing bounds mean "from the edge", negative bounds
/// count from the end, step defaults to `1` and may be negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceSpec {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl SliceSpec {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    pub fn full() -> Self {
        Self::default()
    }

    pub fn is_full(&self) -> bool {
        self.start.is_none() && self.stop.is_none() && matches!(self.step, None | Some(1))
    }

    /// Resolves the slice against a sequence of length `len` returning
    /// `(start, step, count)`
    pub fn indices(&self, len: usize) -> Result<(i64, i64, usize), IndexError> {
        let n = i64::try_from(len).unwrap_or(i64::MAX);
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(IndexError::ZeroStep);
        }

        let (lower, upper) = if step < 0 { (-1, n - 1) } else { (0, n) };
        let clamp = |v: i64| {
            if v < 0 {
                (v + n).max(lower)
            } else {
                v.min(upper)
            }
        };

        let start = self
            .start
            .map_or(if step < 0 { upper } else { lower }, clamp);
        let stop = self.stop.map_or(if step < 0 { lower } else { upper }, clamp);

        let count = if step > 0 && stop > start {
            (stop - start + step - 1) / step
        } else if step < 0 && start > stop {
            (start - stop - step - 1) / -step
        } else {
            0
        };

        Ok((start, step, usize::try_from(count).unwrap_or(0)))
    }
}

impl std::fmt::Display for SliceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{start}")?;
        }
        f.write_str(":")?;
        if let Some(stop) = self.stop {
            write!(f, "{stop}")?;
        }
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Single selector applied to one axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexEntry {
    Int(i64),
    Slice(SliceSpec),
    List(Vec<i64>),
}

impl IndexEntry {
    pub fn is_trivial(&self) -> bool {
        matches!(self, Self::Slice(s) if s.is_full())
    }
}

impl std::fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Slice(s) => write!(f, "{s}"),
            Self::List(l) => write!(f, "{l:?}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// What a caller may subscript a view with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Entry(IndexEntry),
    /// One entry per axis, starting from the sample axis
    Tuple(Vec<IndexEntry>),
}

impl From<IndexEntry> for Selector {
    fn from(v: IndexEntry) -> Self {
        Self::Entry(v)
    }
}

impl From<SliceSpec> for Selector {
    fn from(v: SliceSpec) -> Self {
        Self::Entry(IndexEntry::Slice(v))
    }
}

impl From<RangeFull> for Selector {
    fn from(_: RangeFull) -> Self {
        Self::Entry(IndexEntry::Slice(SliceSpec::full()))
    }
}

impl<A, B> From<(A, B)> for Selector
where
    A: Into<Selector>,
    B: Into<Selector>,
{
    fn from((a, b): (A, B)) -> Self {
        Self::Tuple(vec![a.into().into_entry(), b.into().into_entry()])
    }
}

impl<A, B, C> From<(A, B, C)> for Selector
where
    A: Into<Selector>,
    B: Into<Selector>,
    C: Into<Selector>,
{
    fn from((a, b, c): (A, B, C)) -> Self {
        Self::Tuple(vec![
            a.into().into_entry(),
            b.into().into_entry(),
            c.into().into_entry(),
        ])
    }
}

impl Selector {
    // Tuples nested into tuples are flattened to their first entry
    fn into_entry(self) -> IndexEntry {
        match self {
            Self::Entry(e) => e,
            Self::Tuple(mut entries) => {
                if entries.is_empty() {
                    IndexEntry::Slice(SliceSpec::full())
                } else {
                    entries.swap_remove(0)
                }
            }
        }
    }
}

macro_rules! impl_selector_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Selector {
                fn from(v: $t) -> Self {
                    Self::Entry(IndexEntry::Int(to_i64(v)))
                }
            }

            impl From<Range<$t>> for Selector {
                fn from(v: Range<$t>) -> Self {
                    Self::Entry(IndexEntry::Slice(SliceSpec::new(
                        Some(to_i64(v.start)),
                        Some(to_i64(v.end)),
                        None,
                    )))
                }
            }

            impl From<RangeInclusive<$t>> for Selector {
                fn from(v: RangeInclusive<$t>) -> Self {
                    let (start, end) = v.into_inner();
                    Self::Entry(IndexEntry::Slice(SliceSpec::new(
                        Some(to_i64(start)),
                        Some(to_i64(end).saturating_add(1)),
                        None,
                    )))
                }
            }

            impl From<RangeFrom<$t>> for Selector {
                fn from(v: RangeFrom<$t>) -> Self {
                    Self::Entry(IndexEntry::Slice(SliceSpec::new(Some(to_i64(v.start)), None, None)))
                }
            }

            impl From<RangeTo<$t>> for Selector {
                fn from(v: RangeTo<$t>) -> Self {
                    Self::Entry(IndexEntry::Slice(SliceSpec::new(None, Some(to_i64(v.end)), None)))
                }
            }

            impl From<Vec<$t>> for Selector {
                fn from(v: Vec<$t>) -> Self {
                    Self::Entry(IndexEntry::List(v.into_iter().map(to_i64).collect()))
                }
            }
        )*
    };
}

impl_selector_from_int!(i32, i64, usize);

fn to_i64<T: TryInto<i64>>(v: T) -> i64 {
    v.try_into().unwrap_or(i64::MAX)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Immutable description of a sub-selection over samples.
///
/// Every axis keeps the chain of selectors applied to it so far, the first
/// axis being the sample axis. Selectors are resolved against actual lengths
/// only when positions are requested, so composing never touches storage and
/// `index.compose(a).compose(b)` selects exactly what `b` selects from the
/// elements visible through `a`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexRepr")]
pub struct Index {
    axes: Vec<Vec<IndexEntry>>,
}

#[derive(Deserialize)]
struct IndexRepr {
    axes: Vec<Vec<IndexEntry>>,
}

/// Deserialized selectors go through the same checks as composed ones
impl TryFrom<IndexRepr> for Index {
    type Error = IndexError;

    fn try_from(value: IndexRepr) -> Result<Self, Self::Error> {
        if value.axes.is_empty() {
            return Err(IndexError::NoAxes);
        }

        let mut axes = vec![Vec::new(); value.axes.len()];
        for (axis, chain) in value.axes.into_iter().enumerate() {
            for entry in chain {
                Self::push(&mut axes, axis, entry)?;
            }
        }
        Ok(Self { axes })
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Index {
    pub fn new() -> Self {
        Self {
            axes: vec![Vec::new()],
        }
    }

    pub fn compose(&self, selector: impl Into<Selector>) -> Result<Self, IndexError> {
        let mut axes = self.axes.clone();

        match selector.into() {
            Selector::Entry(entry) => Self::push(&mut axes, 0, entry)?,
            Selector::Tuple(entries) => {
                for (axis, entry) in entries.into_iter().enumerate() {
                    Self::push(&mut axes, axis, entry)?;
                }
            }
        }

        Ok(Self { axes })
    }

    fn push(axes: &mut Vec<Vec<IndexEntry>>, axis: usize, entry: IndexEntry) -> Result<(), IndexError> {
        if let IndexEntry::Slice(SliceSpec { step: Some(0), .. }) = entry {
            return Err(IndexError::ZeroStep);
        }

        while axes.len() <= axis {
            axes.push(Vec::new());
        }

        let Some(chain) = axes.get_mut(axis) else {
            return Err(IndexError::NotSubscriptable { axis });
        };
        if let Some(IndexEntry::Int(_)) = chain.last() {
            return Err(IndexError::NotSubscriptable { axis });
        }

        // Full slices do not change the selection
        if !entry.is_trivial() {
            chain.push(entry);
        }
        Ok(())
    }

    /// True iff the index selects all elements of every axis in original
    /// order
    pub fn is_trivial(&self) -> bool {
        self.axes.iter().flatten().all(IndexEntry::is_trivial)
    }

    /// True if the sample axis was collapsed by an integer selector
    pub fn is_scalar(&self) -> bool {
        matches!(
            self.axes.first().and_then(|chain| chain.last()),
            Some(IndexEntry::Int(_))
        )
    }

    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    pub fn axis_entries(&self, axis: usize) -> &[IndexEntry] {
        self.axes.get(axis).map_or(&[], Vec::as_slice)
    }

    /// True if only the sample axis carries selectors
    pub fn is_sample_axis_only(&self) -> bool {
        self.axes.iter().skip(1).flatten().all(IndexEntry::is_trivial)
    }

    /// Resolves the selection of the given axis against its full length
    pub fn positions(&self, axis: usize, len: usize) -> Result<Positions, IndexError> {
        let mut positions = Positions::all(len);
        for entry in self.axis_entries(axis) {
            positions = positions.select(entry)?;
        }
        Ok(positions)
    }

    /// Number of samples visible through the index for a sequence of `len`
    pub fn length(&self, len: usize) -> Result<usize, IndexError> {
        Ok(self.positions(0, len)?.len())
    }

    pub fn validate(&self, len: usize) -> Result<(), IndexError> {
        self.positions(0, len).map(|_| ())
    }
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Index(")?;
        for (i, chain) in self.axes.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            if chain.is_empty() {
                f.write_str("[:]")?;
            }
            for entry in chain {
                write!(f, "[{entry}]")?;
            }
        }
        f.write_str(")")
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Concrete positions selected on one axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Positions {
    Single(usize),
    Range { start: usize, step: i64, len: usize },
    List(Vec<usize>),
}

impl Positions {
    pub fn all(len: usize) -> Self {
        Self::Range {
            start: 0,
            step: 1,
            len,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Range { len, .. } => *len,
            Self::List(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the `i`-th selected element
    pub fn get(&self, i: usize) -> Option<usize> {
        match self {
            Self::Single(p) => (i == 0).then_some(*p),
            Self::Range { start, step, len } => {
                if i >= *len {
                    return None;
                }
                let p = to_i64(*start) + to_i64(i) * step;
                usize::try_from(p).ok()
            }
            Self::List(l) => l.get(i).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    fn select(&self, entry: &IndexEntry) -> Result<Self, IndexError> {
        let n = match self {
            Self::Single(_) => return Err(IndexError::NotSubscriptable { axis: 0 }),
            _ => self.len(),
        };

        match entry {
            IndexEntry::Int(i) => Ok(Self::Single(self.nth(*i, n)?)),
            IndexEntry::List(items) => Ok(Self::List(
                items
                    .iter()
                    .map(|i| self.nth(*i, n))
                    .collect::<Result<_, _>>()?,
            )),
            IndexEntry::Slice(slice) => {
                let (start, step, count) = slice.indices(n)?;
                if count == 0 {
                    return Ok(Self::List(Vec::new()));
                }
                match self {
                    Self::Range {
                        start: base,
                        step: base_step,
                        ..
                    } => Ok(Self::Range {
                        start: usize::try_from(to_i64(*base) + start * base_step).unwrap_or(0),
                        step: base_step * step,
                        len: count,
                    }),
                    _ => Ok(Self::List(
                        (0..count)
                            .filter_map(|k| {
                                usize::try_from(start + to_i64(k) * step)
                                    .ok()
                                    .and_then(|i| self.get(i))
                            })
                            .collect(),
                    )),
                }
            }
        }
    }

    fn nth(&self, i: i64, n: usize) -> Result<usize, IndexError> {
        let signed_n = to_i64(n);
        let idx = if i < 0 { i + signed_n } else { i };

        usize::try_from(idx)
            .ok()
            .filter(|idx| *idx < n)
            .and_then(|idx| self.get(idx))
            .ok_or(IndexError::OutOfBounds { index: i, len: n })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Index {index} is out of bounds for an axis of length {len}")]
    OutOfBounds { index: i64, len: usize },
    #[error("Slice step cannot be zero")]
    ZeroStep,
    #[error("Axis {axis} is selected by an integer and cannot be subscripted further")]
    NotSubscriptable { axis: usize },
    #[error("Index has no axes")]
    NoAxes,
}
