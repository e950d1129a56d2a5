//! Per-lane track queue.
//!
//! The queue mirrors what the lane's engine holds. The coordinator mutates it
//! only after the engine accepted the same operation, so both stay in step.

use crate::error::{PlayerError, Result};
use crate::track::Track;
use std::collections::{BTreeSet, HashSet};

/// Ordered tracks plus the index of the current one.
///
/// `current` is either `None` or a valid index.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Index a batch would be inserted at: before `before_id`, or at the end.
    pub fn insertion_index(&self, before_id: Option<&str>) -> Result<usize> {
        match before_id {
            Some(id) => self
                .index_of(id)
                .ok_or_else(|| PlayerError::TrackNotFound(id.to_string())),
            None => Ok(self.tracks.len()),
        }
    }

    /// Reject batches whose ids repeat, within the batch or against the queue.
    pub fn check_unique(&self, batch: &[Track]) -> Result<()> {
        let mut seen: HashSet<&str> = self.tracks.iter().map(|t| t.id.as_str()).collect();
        for track in batch {
            if !seen.insert(track.id.as_str()) {
                return Err(PlayerError::InvalidTrack(format!(
                    "track id {} is already queued",
                    track.id
                )));
            }
        }
        Ok(())
    }

    /// Insert a validated batch at `index`.
    pub fn insert(&mut self, index: usize, batch: Vec<Track>) {
        let index = index.min(self.tracks.len());
        let count = batch.len();
        self.tracks.splice(index..index, batch);

        if let Some(current) = self.current.as_mut() {
            if index <= *current {
                *current += count;
            }
        }
    }

    /// Resolve ids to indexes, skipping unknown ids.
    pub fn resolve(&self, ids: &[String]) -> BTreeSet<usize> {
        ids.iter().filter_map(|id| self.index_of(id)).collect()
    }

    /// Remove a set of indexes. The current track, if removed, is replaced by
    /// the one sliding into its slot.
    pub fn remove_indexes(&mut self, indexes: &BTreeSet<usize>) {
        if indexes.is_empty() {
            return;
        }

        let current = self.current;
        let mut position = 0;
        self.tracks.retain(|_| {
            let keep = !indexes.contains(&position);
            position += 1;
            keep
        });

        self.current = current.and_then(|current| {
            let removed_before = indexes.range(..current).count();
            let shifted = current - removed_before;
            (shifted < self.tracks.len()).then_some(shifted)
        });
    }

    /// Keep everything up to and including the current track.
    pub fn truncate_upcoming(&mut self) {
        match self.current {
            Some(current) => self.tracks.truncate(current + 1),
            None => self.tracks.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    /// Point `current` at `id`. Unknown ids clear it.
    pub fn set_current(&mut self, id: Option<&str>) {
        self.current = id.and_then(|id| self.index_of(id));
    }

    pub fn set_current_index(&mut self, index: usize) {
        if index < self.tracks.len() {
            self.current = Some(index);
        }
    }

    pub fn has_next(&self) -> bool {
        match self.current {
            Some(current) => current + 1 < self.tracks.len(),
            None => !self.tracks.is_empty(),
        }
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.current, Some(current) if current > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track(id: &str) -> Track {
        Track::from_value(json!({ "id": id, "url": format!("file:///{}.mp3", id) })).unwrap()
    }

    fn queue_of(ids: &[&str]) -> Queue {
        let mut queue = Queue::new();
        queue.insert(0, ids.iter().map(|id| track(id)).collect());
        queue
    }

    fn ids(queue: &Queue) -> Vec<&str> {
        queue.tracks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn insert_before_current_shifts_it() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_current(Some("b"));

        queue.insert(1, vec![track("x"), track("y")]);
        assert_eq!(ids(&queue), ["a", "x", "y", "b", "c"]);
        assert_eq!(queue.current().map(|t| t.id.as_str()), Some("b"));

        queue.insert(5, vec![track("z")]);
        assert_eq!(queue.current_index(), Some(3));
    }

    #[test]
    fn insertion_index_requires_anchor() {
        let queue = queue_of(&["a", "b"]);
        assert_eq!(queue.insertion_index(Some("b")).unwrap(), 1);
        assert_eq!(queue.insertion_index(None).unwrap(), 2);
        assert!(matches!(
            queue.insertion_index(Some("missing")),
            Err(PlayerError::TrackNotFound(_))
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let queue = queue_of(&["a"]);
        assert!(queue.check_unique(&[track("a")]).is_err());
        assert!(queue.check_unique(&[track("b"), track("b")]).is_err());
        assert!(queue.check_unique(&[track("b"), track("c")]).is_ok());
    }

    #[test]
    fn remove_before_current_shifts_down() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.set_current(Some("c"));

        let indexes = queue.resolve(&["a".to_string(), "missing".to_string()]);
        queue.remove_indexes(&indexes);

        assert_eq!(ids(&queue), ["b", "c", "d"]);
        assert_eq!(queue.current().map(|t| t.id.as_str()), Some("c"));
    }

    #[test]
    fn removing_current_promotes_the_next_track() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_current(Some("b"));

        queue.remove_indexes(&BTreeSet::from([1]));
        assert_eq!(queue.current().map(|t| t.id.as_str()), Some("c"));

        queue.remove_indexes(&BTreeSet::from([1]));
        assert_eq!(queue.current_index(), None);
        assert_eq!(ids(&queue), ["a"]);
    }

    #[test]
    fn truncate_keeps_current() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_current(Some("a"));
        queue.truncate_upcoming();
        assert_eq!(ids(&queue), ["a"]);
        assert!(!queue.has_next());

        let mut unstarted = queue_of(&["a", "b"]);
        unstarted.truncate_upcoming();
        assert!(unstarted.is_empty());
    }

    #[test]
    fn navigation_predicates() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.has_next());
        assert!(!queue.has_previous());

        queue.set_current_index(1);
        assert!(!queue.has_next());
        assert!(queue.has_previous());

        queue.clear();
        assert!(!queue.has_next());
        assert_eq!(queue.current(), None);
    }
}
