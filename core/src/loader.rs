//! The dataset-loading seam (§1, §4.8): file parsing is an external
//! collaborator. Handlers depend only on this trait, so
//! `AddVtkDataset`/`AddCloudPointDataset` are fully testable without a
//! real VTK or point-cloud parser.

use crate::error::CoreError;
use crate::world::dataset::DatasetKind;

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub name: String,
    pub pt_fields: Vec<u32>,
    pub cell_fields: Vec<u32>,
}

pub trait DatasetLoader: Send + Sync {
    fn load(&self, kind: DatasetKind, path: &str) -> Result<LoadedDataset, CoreError>;
}

/// Always fails. Used until a real loader is wired into the binary —
/// exercises the `DatasetLoadFailure` path end to end without needing
/// an actual dataset file on disk.
pub struct NullLoader;

impl DatasetLoader for NullLoader {
    fn load(&self, _kind: DatasetKind, path: &str) -> Result<LoadedDataset, CoreError> {
        Err(CoreError::DatasetLoadFailure(format!(
            "no dataset loader configured (path: {path})"
        )))
    }
}

#[cfg(test)]
pub struct StubLoader;

#[cfg(test)]
impl DatasetLoader for StubLoader {
    fn load(&self, _kind: DatasetKind, path: &str) -> Result<LoadedDataset, CoreError> {
        Ok(LoadedDataset {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            pt_fields: vec![0, 1],
            cell_fields: vec![0],
        })
    }
}
