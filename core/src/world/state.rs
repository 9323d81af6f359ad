//! The world lock's contents: datasets, subdatasets, their metadata,
//! and the anchor round. Everything here lives behind `datasetMutex`
//! (§5) — no method takes any other lock, so callers decide nesting.

use hashbrown::HashMap;

use crate::error::CoreError;
use crate::ids::{DatasetId, HeadsetId, SubDatasetId};
use crate::world::anchor::AnchorState;
use crate::world::dataset::{Dataset, DatasetKind, SubDataset};
use crate::world::metadata::SubDatasetMetaData;

#[derive(Debug, Default)]
pub struct World {
    datasets: HashMap<DatasetId, Dataset>,
    metadata: HashMap<(DatasetId, SubDatasetId), SubDatasetMetaData>,
    next_dataset_id: u32,
    next_subdataset_id: u32,
    pub anchor: AnchorState,
}

impl World {
    pub fn new() -> Self {
        World::default()
    }

    pub fn alloc_dataset_id(&mut self) -> DatasetId {
        let id = DatasetId(self.next_dataset_id);
        self.next_dataset_id += 1;
        id
    }

    pub fn alloc_subdataset_id(&mut self) -> SubDatasetId {
        let id = SubDatasetId(self.next_subdataset_id);
        self.next_subdataset_id += 1;
        id
    }

    pub fn add_dataset(&mut self, kind: DatasetKind, name: String, pt_fields: Vec<u32>, cell_fields: Vec<u32>) -> DatasetId {
        let id = self.alloc_dataset_id();
        let mut dataset = Dataset::new(kind, name);
        dataset.pt_fields = pt_fields;
        dataset.cell_fields = cell_fields;
        self.datasets.insert(id, dataset);
        id
    }

    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.get(&id)
    }

    pub fn dataset_mut(&mut self, id: DatasetId) -> Option<&mut Dataset> {
        self.datasets.get_mut(&id)
    }

    pub fn datasets(&self) -> impl Iterator<Item = (&DatasetId, &Dataset)> {
        self.datasets.iter()
    }

    pub fn meta(&self, dataset_id: DatasetId, sd_id: SubDatasetId) -> Option<&SubDatasetMetaData> {
        self.metadata.get(&(dataset_id, sd_id))
    }

    pub fn meta_mut(&mut self, dataset_id: DatasetId, sd_id: SubDatasetId) -> Option<&mut SubDatasetMetaData> {
        self.metadata.get_mut(&(dataset_id, sd_id))
    }

    pub fn all_meta_mut(&mut self) -> impl Iterator<Item = &mut SubDatasetMetaData> {
        self.metadata.values_mut()
    }

    fn unknown(dataset_id: DatasetId, sd_id: SubDatasetId) -> CoreError {
        CoreError::UnknownTarget(format!("dataset {dataset_id} subdataset {sd_id}"))
    }

    /// §4.3 `AddSubDataset`. Fails with `UnknownTarget` if the dataset
    /// doesn't exist.
    pub fn add_subdataset(
        &mut self,
        dataset_id: DatasetId,
        name: String,
        owner: Option<HeadsetId>,
        now: u64,
    ) -> Result<SubDatasetId, CoreError> {
        if !self.datasets.contains_key(&dataset_id) {
            return Err(CoreError::UnknownTarget(format!("dataset {dataset_id}")));
        }
        let sd_id = self.alloc_subdataset_id();
        let sd = SubDataset::new(sd_id, name);
        self.datasets.get_mut(&dataset_id).unwrap().subdatasets.push(sd);
        self.metadata
            .insert((dataset_id, sd_id), SubDatasetMetaData::new(dataset_id, sd_id, owner, now));
        Ok(sd_id)
    }

    pub fn remove_subdataset(&mut self, dataset_id: DatasetId, sd_id: SubDatasetId) -> Result<(), CoreError> {
        let dataset = self
            .datasets
            .get_mut(&dataset_id)
            .ok_or_else(|| CoreError::UnknownTarget(format!("dataset {dataset_id}")))?;
        if !dataset.remove(sd_id) {
            return Err(Self::unknown(dataset_id, sd_id));
        }
        self.metadata.remove(&(dataset_id, sd_id));
        Ok(())
    }

    /// Duplicates geometry and metadata, copying the private-owner
    /// field from the source (resolved Open Question, DESIGN.md).
    pub fn duplicate_subdataset(
        &mut self,
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        now: u64,
    ) -> Result<SubDatasetId, CoreError> {
        let dataset = self
            .datasets
            .get_mut(&dataset_id)
            .ok_or_else(|| CoreError::UnknownTarget(format!("dataset {dataset_id}")))?;
        let source = dataset.find(sd_id).ok_or_else(|| Self::unknown(dataset_id, sd_id))?;
        let new_id = SubDatasetId(self.next_subdataset_id);
        self.next_subdataset_id += 1;

        let mut clone = source.clone_with_id(new_id);
        clone.name = format!("{} (copy)", clone.name);
        self.datasets.get_mut(&dataset_id).unwrap().subdatasets.push(clone);

        let source_meta = self.metadata.get(&(dataset_id, sd_id)).expect("metadata tracks subdatasets 1:1");
        let mut new_meta = SubDatasetMetaData::new(dataset_id, new_id, source_meta.owner, now);
        new_meta.tf_type = source_meta.tf_type;
        new_meta.tf_params = source_meta.tf_params.clone();
        new_meta.map_visibility = source_meta.map_visibility;
        self.metadata.insert((dataset_id, new_id), new_meta);
        Ok(new_id)
    }

    /// §4.5 automatic release: clears `lock_owner` on any metadata idle
    /// past `max_owner_time_us`. Returns the `(dataset, sd)` pairs that
    /// changed, for the caller to broadcast.
    pub fn expire_locks(&mut self, now: u64, max_owner_time_us: u64) -> Vec<(DatasetId, SubDatasetId)> {
        let mut released = Vec::new();
        for meta in self.metadata.values_mut() {
            if meta.lock_owner.is_some() && now.saturating_sub(meta.last_modification) >= max_owner_time_us {
                meta.lock_owner = None;
                released.push((meta.dataset_id, meta.sd_id));
            }
        }
        released
    }

    /// §4.5 owner-disconnect sweep. Returns subdatasets removed
    /// (private ownership) and subdatasets whose lock was relinquished.
    pub fn owner_disconnect_sweep(&mut self, h: HeadsetId) -> (Vec<(DatasetId, SubDatasetId)>, Vec<(DatasetId, SubDatasetId)>) {
        let mut removed = Vec::new();
        let mut released = Vec::new();
        let keys: Vec<(DatasetId, SubDatasetId)> = self.metadata.keys().copied().collect();
        for key in keys {
            let meta = self.metadata.get(&key).unwrap();
            if meta.owner == Some(h) {
                removed.push(key);
            } else if meta.lock_owner == Some(h) {
                released.push(key);
            }
        }
        for (dataset_id, sd_id) in &removed {
            if let Some(dataset) = self.datasets.get_mut(dataset_id) {
                dataset.remove(*sd_id);
            }
            self.metadata.remove(&(*dataset_id, *sd_id));
        }
        for (dataset_id, sd_id) in &released {
            if let Some(meta) = self.metadata.get_mut(&(*dataset_id, *sd_id)) {
                meta.lock_owner = None;
            }
        }
        (removed, released)
    }
}

impl SubDataset {
    pub fn clone_with_id(&self, id: SubDatasetId) -> SubDataset {
        let mut clone = self.clone();
        clone.id = id;
        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_subdataset_unknown_dataset() {
        let mut world = World::new();
        let err = world.add_subdataset(DatasetId(42), "x".into(), None, 0).unwrap_err();
        assert_eq!(err.action(), crate::error::ErrorAction::WarnAndDrop);
    }

    #[test]
    fn test_duplicate_copies_private_owner() {
        let mut world = World::new();
        let ds = world.add_dataset(DatasetKind::Vtk, "d".into(), vec![], vec![]);
        let sd = world.add_subdataset(ds, "s".into(), Some(HeadsetId(3)), 0).unwrap();
        let dup = world.duplicate_subdataset(ds, sd, 10).unwrap();
        assert_eq!(world.meta(ds, dup).unwrap().owner, Some(HeadsetId(3)));
    }

    #[test]
    fn test_owner_disconnect_sweep_removes_private_keeps_public() {
        let mut world = World::new();
        let ds = world.add_dataset(DatasetKind::Vtk, "d".into(), vec![], vec![]);
        let private = world.add_subdataset(ds, "p".into(), Some(HeadsetId(1)), 0).unwrap();
        let public = world.add_subdataset(ds, "q".into(), None, 0).unwrap();
        world.meta_mut(ds, public).unwrap().lock_owner = Some(HeadsetId(1));

        let (removed, released) = world.owner_disconnect_sweep(HeadsetId(1));
        assert_eq!(removed, vec![(ds, private)]);
        assert_eq!(released, vec![(ds, public)]);
        assert!(world.meta(ds, private).is_none());
        assert!(world.meta(ds, public).unwrap().lock_owner.is_none());
    }

    #[test]
    fn test_expire_locks() {
        let mut world = World::new();
        let ds = world.add_dataset(DatasetKind::Vtk, "d".into(), vec![], vec![]);
        let sd = world.add_subdataset(ds, "s".into(), None, 0).unwrap();
        world.meta_mut(ds, sd).unwrap().stamp(HeadsetId(0), 0);

        let released = world.expire_locks(500_000, 1_000_000);
        assert!(released.is_empty());
        let released = world.expire_locks(1_000_000, 1_000_000);
        assert_eq!(released, vec![(ds, sd)]);
        assert!(world.meta(ds, sd).unwrap().lock_owner.is_none());
    }
}
