//! Per-subdataset server-side metadata (§3): lock-owner, private-owner
//! and the transfer function reference. Kept alongside, not inside,
//! `SubDataset` because the permission engine and the tick-expiry scan
//! only ever need this slice of state, under the same lock as the rest
//! of the world.

use crate::ids::{DatasetId, HeadsetId, SubDatasetId};

#[derive(Debug, Clone)]
pub struct SubDatasetMetaData {
    pub dataset_id: DatasetId,
    pub sd_id: SubDatasetId,
    /// `None` ⇒ public.
    pub owner: Option<HeadsetId>,
    /// `None` ⇒ not currently being manipulated.
    pub lock_owner: Option<HeadsetId>,
    /// Monotonic microsecond timestamp of the last accepted mutation.
    pub last_modification: u64,
    pub tf_type: u16,
    pub tf_params: Vec<u8>,
    pub map_visibility: bool,
}

impl SubDatasetMetaData {
    pub fn new(dataset_id: DatasetId, sd_id: SubDatasetId, owner: Option<HeadsetId>, now: u64) -> Self {
        SubDatasetMetaData {
            dataset_id,
            sd_id,
            owner,
            lock_owner: None,
            last_modification: now,
            tf_type: 0,
            tf_params: Vec::new(),
            map_visibility: true,
        }
    }

    pub fn is_public(&self) -> bool {
        self.owner.is_none()
    }

    pub fn stamp(&mut self, h: HeadsetId, now: u64) {
        self.lock_owner = Some(h);
        self.last_modification = now;
    }
}
