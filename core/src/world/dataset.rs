//! Dataset and subdataset aggregates (§3). Datasets are created by
//! handlers and never destroyed during a session; subdatasets are
//! added/removed/duplicated explicitly.

use crate::ids::SubDatasetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Vtk,
    VectorField,
    CloudPoint,
}

#[derive(Debug, Clone)]
pub struct ClippingVolume {
    pub normal: [f32; 3],
    pub distance: f32,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SubDataset {
    pub id: SubDatasetId,
    pub name: String,
    pub pos: [f32; 3],
    pub scale: [f32; 3],
    pub quat: [f32; 4],
    pub annotation_points: Vec<[f32; 3]>,
    pub clipping: Vec<ClippingVolume>,
}

impl SubDataset {
    pub fn new(id: SubDatasetId, name: String) -> Self {
        SubDataset {
            id,
            name,
            pos: [0.0; 3],
            scale: [1.0; 3],
            quat: [1.0, 0.0, 0.0, 0.0],
            annotation_points: Vec::new(),
            clipping: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: DatasetKind,
    pub name: String,
    pub pt_fields: Vec<u32>,
    pub cell_fields: Vec<u32>,
    /// Insertion order, matching the outbound enumeration order used
    /// for anchor provider election and similar "first in order" rules.
    pub subdatasets: Vec<SubDataset>,
}

impl Dataset {
    pub fn new(kind: DatasetKind, name: String) -> Self {
        Dataset {
            kind,
            name,
            pt_fields: Vec::new(),
            cell_fields: Vec::new(),
            subdatasets: Vec::new(),
        }
    }

    pub fn find(&self, sd_id: SubDatasetId) -> Option<&SubDataset> {
        self.subdatasets.iter().find(|sd| sd.id == sd_id)
    }

    pub fn find_mut(&mut self, sd_id: SubDatasetId) -> Option<&mut SubDataset> {
        self.subdatasets.iter_mut().find(|sd| sd.id == sd_id)
    }

    pub fn remove(&mut self, sd_id: SubDatasetId) -> bool {
        let before = self.subdatasets.len();
        self.subdatasets.retain(|sd| sd.id != sd_id);
        self.subdatasets.len() != before
    }
}
