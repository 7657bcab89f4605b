//! Ordered, write-through waypoint list.
//!
//! Waypoints are addressed by position. Every mutation builds the next list,
//! writes its snapshot to storage, and only then replaces the in-memory list,
//! so a failed write leaves both sides at the previous state.
//!
//! Out-of-range indices are rejected with [`PlannerError::IndexOutOfBounds`]
//! rather than ignored.

use std::sync::Arc;

use log::{info, warn};

use crate::error::{check_index, PlannerError, Result};
use crate::storage::StateStorage;
use crate::{GpsPoint, Waypoint, WaypointUpdate};

/// Storage key of the waypoint snapshot.
pub const WAYPOINTS_KEY: &str = "waypoints";

/// Waypoint list persisted under [`WAYPOINTS_KEY`].
pub struct WaypointStore {
    waypoints: Vec<Waypoint>,
    storage: Arc<dyn StateStorage>,
}

impl std::fmt::Debug for WaypointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaypointStore")
            .field("waypoints", &self.waypoints)
            .finish_non_exhaustive()
    }
}

impl WaypointStore {
    /// Restore the list from `storage`, or start empty.
    ///
    /// A missing snapshot gives an empty list. An unreadable or corrupt one is
    /// logged and also gives an empty list; it is overwritten by the next mutation.
    pub fn open(storage: Arc<dyn StateStorage>) -> Self {
        let waypoints = match storage.read(WAYPOINTS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<Waypoint>>(&json) {
                Ok(waypoints) => {
                    info!("[WaypointStore] Restored {} waypoints", waypoints.len());
                    waypoints
                }
                Err(e) => {
                    warn!("[WaypointStore] Ignoring corrupt snapshot: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("[WaypointStore] Could not read snapshot: {}", e);
                Vec::new()
            }
        };

        Self { waypoints, storage }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    /// Waypoint positions in order.
    pub fn positions(&self) -> Vec<GpsPoint> {
        self.waypoints.iter().map(|w| w.position).collect()
    }

    /// Append an unlabeled waypoint.
    pub fn add(&mut self, position: GpsPoint) -> Result<()> {
        let mut next = self.waypoints.clone();
        next.push(Waypoint::new(position));
        self.commit(next)
    }

    /// Insert an unlabeled waypoint at `index`, shifting later waypoints back.
    ///
    /// `index == len()` appends.
    pub fn insert(&mut self, index: usize, position: GpsPoint) -> Result<()> {
        if index > self.waypoints.len() {
            return Err(PlannerError::IndexOutOfBounds {
                index,
                len: self.waypoints.len(),
            });
        }
        let mut next = self.waypoints.clone();
        next.insert(index, Waypoint::new(position));
        self.commit(next)
    }

    /// Remove and return the waypoint at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Waypoint> {
        check_index(index, self.waypoints.len())?;
        let mut next = self.waypoints.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    /// Merge `update` into the waypoint at `index`.
    pub fn update(&mut self, index: usize, update: WaypointUpdate) -> Result<()> {
        check_index(index, self.waypoints.len())?;
        let mut next = self.waypoints.clone();
        update.apply_to(&mut next[index]);
        self.commit(next)
    }

    /// Move the waypoint at `from` so it ends up at `to`.
    ///
    /// All other waypoints keep their relative order.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.waypoints.len();
        check_index(from, len)?;
        check_index(to, len)?;
        let mut next = self.waypoints.clone();
        let moved = next.remove(from);
        next.insert(to, moved);
        self.commit(next)
    }

    /// Reverse the order of the whole list.
    pub fn reverse(&mut self) -> Result<()> {
        let mut next = self.waypoints.clone();
        next.reverse();
        self.commit(next)
    }

    /// Replace the whole list, e.g. with waypoints extracted from an imported track.
    pub fn replace_all(&mut self, waypoints: Vec<Waypoint>) -> Result<()> {
        self.commit(waypoints)
    }

    /// Remove every waypoint.
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }

    fn commit(&mut self, next: Vec<Waypoint>) -> Result<()> {
        let json = serde_json::to_string(&next)?;
        if let Err(e) = self.storage.write(WAYPOINTS_KEY, &json) {
            warn!("[WaypointStore] Snapshot write failed, keeping previous list: {}", e);
            return Err(e);
        }
        self.waypoints = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    struct FailingStorage;

    impl StateStorage for FailingStorage {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(PlannerError::Storage("disk full".to_string()))
        }
    }

    fn p(lat: f64, lng: f64) -> GpsPoint {
        GpsPoint::new(lat, lng)
    }

    fn store_with(points: &[GpsPoint]) -> (WaypointStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = WaypointStore::open(storage.clone());
        for &point in points {
            store.add(point).unwrap();
        }
        (store, storage)
    }

    #[test]
    fn test_starts_empty_without_snapshot() {
        let (store, storage) = store_with(&[]);
        assert!(store.is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_add_then_reorder() {
        let (mut store, _) = store_with(&[p(48.8, 2.3), p(48.9, 2.4)]);
        store.reorder(0, 1).unwrap();
        assert_eq!(store.positions(), vec![p(48.9, 2.4), p(48.8, 2.3)]);
    }

    #[test]
    fn test_reorder_is_a_move_not_a_swap() {
        let (mut store, _) = store_with(&[p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0), p(3.0, 3.0)]);
        store.reorder(0, 2).unwrap();
        assert_eq!(
            store.positions(),
            vec![p(1.0, 1.0), p(2.0, 2.0), p(0.0, 0.0), p(3.0, 3.0)]
        );
        store.reorder(3, 0).unwrap();
        assert_eq!(
            store.positions(),
            vec![p(3.0, 3.0), p(1.0, 1.0), p(2.0, 2.0), p(0.0, 0.0)]
        );
    }

    #[test]
    fn test_insert_then_remove_restores_list() {
        let (mut store, _) = store_with(&[p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)]);
        let before = store.waypoints().to_vec();

        for index in 0..=before.len() {
            store.insert(index, p(9.0, 9.0)).unwrap();
            assert_eq!(store.get(index).map(|w| w.position), Some(p(9.0, 9.0)));
            store.remove(index).unwrap();
            assert_eq!(store.waypoints(), before.as_slice());
        }
    }

    #[test]
    fn test_insert_at_len_appends() {
        let (mut store, _) = store_with(&[p(0.0, 0.0)]);
        store.insert(1, p(1.0, 1.0)).unwrap();
        assert_eq!(store.positions(), vec![p(0.0, 0.0), p(1.0, 1.0)]);
        assert_eq!(store.get(1).map(|w| w.label.as_str()), Some(""));
    }

    #[test]
    fn test_reverse_twice_restores_order() {
        let (mut store, _) = store_with(&[p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)]);
        let before = store.waypoints().to_vec();
        store.reverse().unwrap();
        assert_eq!(store.positions(), vec![p(2.0, 2.0), p(1.0, 1.0), p(0.0, 0.0)]);
        store.reverse().unwrap();
        assert_eq!(store.waypoints(), before.as_slice());
    }

    #[test]
    fn test_update_merges_partial_fields() {
        let (mut store, _) = store_with(&[p(0.0, 0.0), p(1.0, 1.0)]);
        store.update(1, WaypointUpdate::label("Summit")).unwrap();
        assert_eq!(store.get(1).unwrap().label, "Summit");
        assert_eq!(store.get(1).unwrap().position, p(1.0, 1.0));

        store.update(1, WaypointUpdate::position(p(5.0, 5.0))).unwrap();
        assert_eq!(store.get(1).unwrap().label, "Summit");
        assert_eq!(store.get(1).unwrap().position, p(5.0, 5.0));
    }

    #[test]
    fn test_out_of_range_indices_are_rejected() {
        let (mut store, _) = store_with(&[p(0.0, 0.0), p(1.0, 1.0)]);
        let before = store.waypoints().to_vec();

        assert!(matches!(
            store.remove(2),
            Err(PlannerError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(store.insert(3, p(9.0, 9.0)).is_err());
        assert!(store.update(5, WaypointUpdate::label("x")).is_err());
        assert!(store.reorder(0, 2).is_err());
        assert!(store.reorder(2, 0).is_err());
        assert_eq!(store.waypoints(), before.as_slice());
    }

    #[test]
    fn test_every_mutation_writes_through() {
        let (mut store, storage) = store_with(&[p(0.0, 0.0), p(1.0, 1.0)]);
        store.update(0, WaypointUpdate::label("Home")).unwrap();
        store.reverse().unwrap();

        let reloaded = WaypointStore::open(storage.clone());
        assert_eq!(reloaded.waypoints(), store.waypoints());
        assert_eq!(reloaded.get(1).unwrap().label, "Home");

        store.clear().unwrap();
        assert!(WaypointStore::open(storage).is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(WAYPOINTS_KEY, "{not json").unwrap();
        let store = WaypointStore::open(storage);
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_list() {
        let mut store = WaypointStore::open(Arc::new(FailingStorage));
        assert!(matches!(store.add(p(0.0, 0.0)), Err(PlannerError::Storage(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_all() {
        let (mut store, storage) = store_with(&[p(0.0, 0.0)]);
        store
            .replace_all(vec![
                Waypoint::with_label(p(1.0, 1.0), "Start"),
                Waypoint::with_label(p(2.0, 2.0), "End"),
            ])
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(WaypointStore::open(storage).len(), 2);
    }
}
