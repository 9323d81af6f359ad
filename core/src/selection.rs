//! Volumetric selection hand-off (§5's compute thread, §9's "keep
//! selection geometry out of the world lock"). `ConfirmSelection`
//! packages the tablet's accumulated lasso/scale input into a job and
//! hands it to this seam; `coviz-core` ships only a `NullSelectionSink`
//! until the real compute thread (in `coviz-server`) is wired in, the
//! same shape as [`crate::loader::DatasetLoader`].

use crate::ids::{ConnectionId, DatasetId, HeadsetId, SubDatasetId};

/// One confirmed selection request, ready for the compute thread to
/// turn into element IDs outside any lock.
#[derive(Debug, Clone)]
pub struct SelectionJob {
    pub connection: ConnectionId,
    pub headset_id: HeadsetId,
    pub dataset_id: DatasetId,
    pub sd_id: SubDatasetId,
    pub method: u16,
    pub lasso: Vec<[f32; 2]>,
    pub scale: f32,
}

pub trait SelectionSink: Send + Sync {
    fn submit(&self, job: SelectionJob);
}

pub struct NullSelectionSink;

impl SelectionSink for NullSelectionSink {
    fn submit(&self, _job: SelectionJob) {}
}
