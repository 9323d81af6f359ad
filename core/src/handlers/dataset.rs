//! Dataset/subdataset lifecycle handlers (§4.3): loading, creation,
//! removal, duplication, renaming, visibility, and the public/private
//! toggle. Structural changes — everything here — fan out to every
//! connection, including the originator.

use crate::error::CoreError;
use crate::ids::{ConnectionId, DatasetId, SubDatasetId};
use crate::net::outbound::OutboundMessage;
use crate::permission::{can_modify, resolve_actor};
use crate::server::Server;
use crate::world::dataset::DatasetKind;

pub fn add_vtk_dataset(server: &Server, path: String) -> Result<(), CoreError> {
    add_dataset(server, DatasetKind::Vtk, path)
}

pub fn add_cloud_point_dataset(server: &Server, path: String) -> Result<(), CoreError> {
    add_dataset(server, DatasetKind::CloudPoint, path)
}

fn add_dataset(server: &Server, kind: DatasetKind, path: String) -> Result<(), CoreError> {
    let loaded = server.loader.load(kind, &path)?;
    let now = server.now_us();

    let mut world = server.world();
    let table = server.connections();

    let id = world.add_dataset(kind, loaded.name.clone(), loaded.pt_fields.clone(), loaded.cell_fields.clone());
    // An implicitly-created, public, unnamed subdataset — §3's "added
    // ... implicitly when a dataset without subdatasets is registered".
    let sd_id = world
        .add_subdataset(id, loaded.name.clone(), None, now)
        .expect("dataset was just created under the same lock");

    let add_msg = match kind {
        DatasetKind::Vtk | DatasetKind::VectorField => OutboundMessage::AddVtkDataset {
            id,
            name: loaded.name.clone(),
            pt_fields: loaded.pt_fields,
            cell_fields: loaded.cell_fields,
        },
        DatasetKind::CloudPoint => OutboundMessage::AddCloudPointDataset { id, name: loaded.name.clone() },
    };
    server.broadcast_all(&table, &add_msg);
    server.broadcast_all(
        &table,
        &OutboundMessage::AddSubDataset {
            dataset_id: id,
            sd_id,
            name: loaded.name,
            owner: None,
        },
    );
    Ok(())
}

pub fn add_subdataset(server: &Server, sender: ConnectionId, dataset_id: u32, is_public: bool) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);

    let mut world = server.world();
    let table = server.connections();

    let actor = resolve_actor(&table, sender);
    let owner = if is_public { None } else { actor };

    let sd_id = world.add_subdataset(dataset_id, String::new(), owner, now)?;
    server.broadcast_all(
        &table,
        &OutboundMessage::AddSubDataset {
            dataset_id,
            sd_id,
            name: String::new(),
            owner,
        },
    );
    Ok(())
}

pub fn remove_subdataset(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();

    let actor = resolve_actor(&table, sender);
    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    if let Some(h) = actor {
        world.meta_mut(dataset_id, sd_id).unwrap().stamp(h, now);
    }
    world.remove_subdataset(dataset_id, sd_id)?;
    server.broadcast_all(&table, &OutboundMessage::RemoveSubDataset { dataset_id, sd_id });
    Ok(())
}

pub fn duplicate_subdataset(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();

    let actor = resolve_actor(&table, sender);
    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    if let Some(h) = actor {
        world.meta_mut(dataset_id, sd_id).unwrap().stamp(h, now);
    }
    let new_id = world.duplicate_subdataset(dataset_id, sd_id, now)?;
    let name = world.dataset(dataset_id).and_then(|d| d.find(new_id)).map(|sd| sd.name.clone()).unwrap_or_default();
    let owner = world.meta(dataset_id, new_id).and_then(|m| m.owner);
    server.broadcast_all(
        &table,
        &OutboundMessage::AddSubDataset { dataset_id, sd_id: new_id, name, owner },
    );
    Ok(())
}

pub fn rename_subdataset(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32, name: String) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();

    let actor = resolve_actor(&table, sender);
    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    if let Some(h) = actor {
        world.meta_mut(dataset_id, sd_id).unwrap().stamp(h, now);
    }
    let dataset = world.dataset_mut(dataset_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    let sd = dataset.find_mut(sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    sd.name = name.clone();

    server.broadcast_all(&table, &OutboundMessage::RenameSubDataset { dataset_id, sd_id, name });
    Ok(())
}

pub fn make_subdataset_public(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();

    let actor = resolve_actor(&table, sender);
    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    let meta = world.meta_mut(dataset_id, sd_id).unwrap();
    meta.owner = None;
    if let Some(h) = actor {
        meta.stamp(h, now);
    }

    server.broadcast_all(&table, &OutboundMessage::SubDatasetOwner { dataset_id, sd_id, headset_id: None });
    Ok(())
}

pub fn toggle_map_visibility(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32, visible: bool) -> Result<(), CoreError> {
    let now = server.now_us();
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);

    let mut world = server.world();
    let table = server.connections();

    let actor = resolve_actor(&table, sender);
    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    let meta = world.meta_mut(dataset_id, sd_id).unwrap();
    meta.map_visibility = visible;
    if let Some(h) = actor {
        meta.stamp(h, now);
    }

    server.broadcast_all(&table, &OutboundMessage::ToggleMapVisibility { dataset_id, sd_id, visible });
    Ok(())
}

fn unknown(dataset_id: DatasetId, sd_id: SubDatasetId) -> CoreError {
    CoreError::UnknownTarget(format!("dataset {dataset_id} subdataset {sd_id}"))
}
