//! Ordered track queue with an active cursor
//!
//! ```text
//! items:   [A] [B] [C] [D]
//! active:       ^
//! ```
//!
//! Every mutation validates its arguments before touching `items`, so a
//! failed call leaves the queue exactly as it was. The active cursor, when
//! present, always points inside `items`.

use crate::error::{PlayerError, Result};
use crate::track::Track;
use std::collections::BTreeSet;

/// What a removal did to the active cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveChange {
    /// Cursor untouched (or there was none)
    Unchanged,

    /// Same track, new position
    Shifted(usize),

    /// Active track removed; a later track took its place
    Replaced(usize),

    /// Active track removed and nothing came after it
    Cleared,
}

/// Ordered collection of tracks
#[derive(Debug, Clone, Default)]
pub struct Queue {
    items: Vec<Track>,
    active_index: Option<usize>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert tracks before `insert_before`
    ///
    /// `insert_before == len` appends. Inserting at or before the active
    /// track shifts the cursor so the same track stays active.
    pub fn add(&mut self, tracks: Vec<Track>, insert_before: usize) -> Result<()> {
        let len = self.items.len();
        if insert_before > len {
            return Err(PlayerError::IndexOutOfBounds {
                index: insert_before,
                len,
            });
        }

        let count = tracks.len();
        self.items.splice(insert_before..insert_before, tracks);

        if let Some(active) = self.active_index {
            if insert_before <= active {
                self.active_index = Some(active + count);
            }
        }

        Ok(())
    }

    /// Append tracks to the end
    pub fn append(&mut self, tracks: Vec<Track>) {
        let len = self.items.len();
        // Appending at len is always in bounds.
        self.items.splice(len..len, tracks);
    }

    /// Remove tracks at the given indexes
    ///
    /// All indexes are validated first; one bad index rejects the whole call.
    pub fn remove(&mut self, indexes: &[usize]) -> Result<ActiveChange> {
        let len = self.items.len();
        if let Some(&bad) = indexes.iter().find(|&&i| i >= len) {
            return Err(PlayerError::IndexOutOfBounds { index: bad, len });
        }

        let doomed: BTreeSet<usize> = indexes.iter().copied().collect();
        if doomed.is_empty() {
            return Ok(ActiveChange::Unchanged);
        }

        let change = match self.active_index {
            None => ActiveChange::Unchanged,
            Some(active) if doomed.contains(&active) => {
                // First surviving track after the removed active one.
                match (active + 1..len).find(|i| !doomed.contains(i)) {
                    Some(next) => {
                        ActiveChange::Replaced(next - doomed.range(..next).count())
                    }
                    None => ActiveChange::Cleared,
                }
            }
            Some(active) => {
                let below = doomed.range(..active).count();
                if below == 0 {
                    ActiveChange::Unchanged
                } else {
                    ActiveChange::Shifted(active - below)
                }
            }
        };

        let mut index = 0;
        self.items.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });

        match change {
            ActiveChange::Shifted(i) | ActiveChange::Replaced(i) => self.active_index = Some(i),
            ActiveChange::Cleared => self.active_index = None,
            ActiveChange::Unchanged => {}
        }

        Ok(change)
    }

    /// Move a track from one position to another
    ///
    /// The active cursor keeps pointing at the same track.
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(PlayerError::IndexOutOfBounds { index, len });
            }
        }

        if from == to {
            return Ok(());
        }

        let track = self.items.remove(from);
        self.items.insert(to, track);

        if let Some(active) = self.active_index {
            self.active_index = Some(if active == from {
                to
            } else if from < active && to >= active {
                active - 1
            } else if from > active && to <= active {
                active + 1
            } else {
                active
            });
        }

        Ok(())
    }

    /// Clear entire queue
    pub fn clear(&mut self) {
        self.items.clear();
        self.active_index = None;
    }

    /// Point the active cursor at `index`
    ///
    /// On an empty queue this is a no-op returning `None`.
    pub fn set_active(&mut self, index: usize) -> Result<Option<usize>> {
        let len = self.items.len();
        if len == 0 {
            return Ok(None);
        }
        if index >= len {
            return Err(PlayerError::IndexOutOfBounds { index, len });
        }

        self.active_index = Some(index);
        Ok(self.active_index)
    }

    /// Drop every track after the active one
    ///
    /// Returns the number of tracks removed. Without an active track
    /// nothing is removed.
    pub fn remove_upcoming(&mut self) -> usize {
        match self.active_index {
            Some(active) => {
                let removed = self.items.len() - (active + 1);
                self.items.truncate(active + 1);
                removed
            }
            None => 0,
        }
    }

    /// Replace the track at `index`, returning the old value
    pub fn replace(&mut self, index: usize, track: Track) -> Result<Track> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(PlayerError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, track))
    }

    /// Get track at index
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.items.get(index)
    }

    /// All tracks in queue order
    pub fn tracks(&self) -> &[Track] {
        &self.items
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn active_track(&self) -> Option<&Track> {
        self.active_index.and_then(|i| self.items.get(i))
    }

    /// Total number of tracks in queue
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
