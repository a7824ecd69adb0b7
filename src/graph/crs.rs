//! Compressed-row storage for sparse adjacency, plus its distributed
//! variant.
//!
//! `offsets[i]..offsets[i+1]` brackets row `i`'s entries in `indices`. The
//! distributed form adds a `distribution` array of per-color prefix sums:
//! color `r` pre-owns the contiguous global id range
//! `distribution[r]..distribution[r+1]`, and the array is bitwise identical
//! on every color because it is a pure function of the global entity count.

use std::fmt;

/// Compressed-row adjacency storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Crs {
    pub offsets: Vec<usize>,
    pub indices: Vec<usize>,
}

impl Crs {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries of row `i`.
    pub fn row(&self, i: usize) -> &[usize] {
        assert!(i < self.len(), "row index out of range");
        &self.indices[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Iterate rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }

    /// Append a row given its entries.
    pub fn push_row<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = usize>,
    {
        if self.offsets.is_empty() {
            self.offsets.push(0);
        }
        self.indices.extend(entries);
        self.offsets.push(self.indices.len());
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offsets:")?;
        for i in &self.offsets {
            write!(f, " {i}")?;
        }
        write!(f, "\nindices:")?;
        for i in &self.indices {
            write!(f, " {i}")?;
        }
        Ok(())
    }
}

/// Distributed compressed-row storage: local rows plus the global
/// per-color distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dcrs {
    pub graph: Crs,
    pub distribution: Vec<usize>,
}

impl Dcrs {
    /// Number of local rows.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Total number of entities across all colors.
    pub fn global_len(&self) -> usize {
        self.distribution.last().copied().unwrap_or(0)
    }

    /// Global id range pre-assigned to `color`.
    pub fn range_of(&self, color: usize) -> std::ops::Range<usize> {
        self.distribution[color]..self.distribution[color + 1]
    }

    /// Global id of local row `i` on `color`.
    pub fn global_id(&self, color: usize, i: usize) -> usize {
        self.distribution[color] + i
    }

    /// Color whose naive range contains global id `id`. Colors with empty
    /// ranges are skipped.
    pub fn color_of(&self, id: usize) -> usize {
        debug_assert!(id < self.global_len());
        self.distribution.partition_point(|&at| at <= id) - 1
    }
}

impl fmt::Display for Dcrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.graph)?;
        write!(f, "distribution:")?;
        for i in &self.distribution {
            write!(f, " {i}")?;
        }
        Ok(())
    }
}
