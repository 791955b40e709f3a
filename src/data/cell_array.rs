//! Count-prefixed cell connectivity.
//!
//! A cell array stores each cell as its point count followed by that many point
//! indices: `[n0, p.., n1, p.., ...]`. The wire format carries this buffer
//! verbatim, so the layout must not change.

use crate::schema_error::SchemaError;

/// Connectivity of a sequence of cells in count-prefixed form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellArray {
    num_cells: usize,
    data: Vec<i64>,
}

impl CellArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing count-prefixed buffer, checking it holds exactly `num_cells` cells.
    pub fn from_raw(num_cells: usize, data: Vec<i64>) -> Result<Self, SchemaError> {
        let locs = cell_locations(&data, num_cells)?;
        let end = match locs.last() {
            Some(&last) => last + data[last] as usize + 1,
            None => 0,
        };
        if end != data.len() {
            return Err(SchemaError::InvalidMetadata(format!(
                "cell array of {} entries holds {end} entries of {num_cells} cells",
                data.len()
            )));
        }
        Ok(Self { num_cells, data })
    }

    /// Build from per-cell point lists.
    pub fn from_cells<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a [i64]>,
    {
        let mut ca = Self::new();
        for cell in cells {
            ca.push_cell(cell);
        }
        ca
    }

    pub fn push_cell(&mut self, points: &[i64]) {
        self.data.push(points.len() as i64);
        self.data.extend_from_slice(points);
        self.num_cells += 1;
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Length of the count-prefixed buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_cells == 0
    }

    pub fn data(&self) -> &[i64] {
        &self.data
    }

    /// Point lists of each cell, in order.
    pub fn cells(&self) -> impl Iterator<Item = &[i64]> + '_ {
        let mut pos = 0usize;
        (0..self.num_cells).map(move |_| {
            let n = self.data[pos] as usize;
            let cell = &self.data[pos + 1..pos + 1 + n];
            pos += n + 1;
            cell
        })
    }

    /// Start offset of each cell within [`CellArray::data`].
    pub fn locations(&self) -> Vec<usize> {
        // from_raw/push_cell keep the buffer consistent with num_cells
        cell_locations(&self.data, self.num_cells).unwrap_or_default()
    }
}

/// Reconstruct per-cell start offsets by a forward scan:
/// `loc[0] = 0; loc[i] = loc[i-1] + conn[loc[i-1]] + 1`.
pub fn cell_locations(connectivity: &[i64], num_cells: usize) -> Result<Vec<usize>, SchemaError> {
    let mut locs = Vec::with_capacity(num_cells);
    let mut pos = 0usize;
    for i in 0..num_cells {
        let count = connectivity.get(pos).copied().ok_or_else(|| {
            SchemaError::InvalidMetadata(format!(
                "cell {i} starts at {pos}, past the end of {} connectivity entries",
                connectivity.len()
            ))
        })?;
        if count < 0 || pos + 1 + count as usize > connectivity.len() {
            return Err(SchemaError::InvalidMetadata(format!(
                "cell {i} at {pos} declares {count} points, overrunning connectivity"
            )));
        }
        locs.push(pos);
        pos += count as usize + 1;
    }
    Ok(locs)
}
