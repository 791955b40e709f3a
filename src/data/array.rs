//! Named point- and cell-centered data arrays attached to a block.

use crate::data::scalar::{ScalarType, TypedBuffer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an array's tuples live: one per point or one per cell.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Centering {
    Point,
    Cell,
}

impl Centering {
    pub const fn code(self) -> u8 {
        match self {
            Centering::Point => 0,
            Centering::Cell => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Centering::Point),
            1 => Some(Centering::Cell),
            _ => None,
        }
    }
}

impl fmt::Display for Centering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Centering::Point => "point",
            Centering::Cell => "cell",
        })
    }
}

/// A named, multi-component array of tuples.
#[derive(Clone, Debug, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    pub values: TypedBuffer,
}

impl DataArray {
    pub fn new(name: impl Into<String>, components: usize, values: TypedBuffer) -> Self {
        Self {
            name: name.into(),
            components,
            values,
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.values.scalar_type()
    }

    /// Number of tuples (elements divided by components).
    pub fn num_tuples(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }
}

/// Ordered collection of arrays, looked up by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrayCollection {
    arrays: Vec<DataArray>,
}

impl ArrayCollection {
    /// Insert `array`, replacing any array of the same name in place.
    pub fn add(&mut self, array: DataArray) {
        match self.arrays.iter_mut().find(|a| a.name == array.name) {
            Some(slot) => *slot = array,
            None => self.arrays.push(array),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<DataArray> {
        let idx = self.arrays.iter().position(|a| a.name == name)?;
        Some(self.arrays.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataArray> {
        self.arrays.iter()
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn clear(&mut self) {
        self.arrays.clear();
    }
}

/// Point and cell attribute sets of one block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetAttributes {
    pub point_data: ArrayCollection,
    pub cell_data: ArrayCollection,
}

impl DatasetAttributes {
    pub fn get(&self, centering: Centering) -> &ArrayCollection {
        match centering {
            Centering::Point => &self.point_data,
            Centering::Cell => &self.cell_data,
        }
    }

    pub fn get_mut(&mut self, centering: Centering) -> &mut ArrayCollection {
        match centering {
            Centering::Point => &mut self.point_data,
            Centering::Cell => &mut self.cell_data,
        }
    }
}
