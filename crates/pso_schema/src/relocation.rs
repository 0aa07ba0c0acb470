//! Locations of pointer fields inside a container.

use derive_more::Deref;

use crate::error::{Error, Result};

/// Offsets of pointer fields, the locations a loader has to rebase.
///
/// Locations are kept in insertion order until [`RelocationTable::into_sorted`] is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct RelocationTable(Vec<u32>);

impl RelocationTable {
    pub fn new() -> Self {
        RelocationTable(Vec::new())
    }

    /// Record a pointer field location. `owner` names the structure holding the field.
    pub fn record(&mut self, location: usize, owner: &str) -> Result<()> {
        let location = Self::check(location, owner)?;
        self.0.push(location);
        Ok(())
    }

    /// Validate a location without recording it: it has to be a non-zero multiple of 4 that
    /// fits in a pointer.
    pub fn check(location: usize, owner: &str) -> Result<u32> {
        check_alignment(location, owner)?;
        if location == 0 {
            return Err(Error::NullLocation {
                owner: owner.to_string(),
            });
        }
        u32::try_from(location).map_err(|_| Error::OffsetOverflow(location))
    }

    /// Record locations that already went through [`RelocationTable::check`]
    pub fn extend_checked(&mut self, locations: impl IntoIterator<Item = u32>) {
        self.0.extend(locations);
    }

    /// Forget every entry for `location`
    pub fn remove(&mut self, location: u32) {
        self.0.retain(|&recorded| recorded != location);
    }

    /// Locations in ascending order without duplicates
    pub fn into_sorted(mut self) -> Self {
        self.0.sort_unstable();
        self.0.dedup();
        self
    }

    /// Whether a location was recorded, only meaningful on a sorted table
    pub fn contains(&self, location: u32) -> bool {
        self.0.binary_search(&location).is_ok()
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }
}

/// Fails with [`Error::AlignmentViolation`] unless `location` is a multiple of 4
pub fn check_alignment(location: usize, owner: &str) -> Result<()> {
    if location % 4 != 0 {
        return Err(Error::AlignmentViolation {
            owner: owner.to_string(),
            offset: location,
        });
    }
    Ok(())
}

impl From<Vec<u32>> for RelocationTable {
    fn from(locations: Vec<u32>) -> Self {
        RelocationTable(locations)
    }
}
