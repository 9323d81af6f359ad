//! Pure subdataset transforms and transfer-function edits (§4.3, §4.6).
//! Shares one shape: resolve target, `canModify`, stamp, mutate, fan
//! out to everyone except the originator — the transform is an
//! incremental update the sender already has applied locally.

use crate::error::CoreError;
use crate::ids::{ConnectionId, DatasetId, SubDatasetId};
use crate::net::outbound::OutboundMessage;
use crate::permission::{can_modify, resolve_actor};
use crate::server::Server;

fn unknown(dataset_id: DatasetId, sd_id: SubDatasetId) -> CoreError {
    CoreError::UnknownTarget(format!("dataset {dataset_id} subdataset {sd_id}"))
}

pub fn rotate(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32, quat: [f32; 4]) -> Result<(), CoreError> {
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);
    let now = server.now_us();

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
    sd.quat = quat;

    server.broadcast_except(
        &table,
        sender,
        &OutboundMessage::RotateDataset { dataset_id, sd_id, headset_id: actor, quat },
    );
    Ok(())
}

pub fn translate(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32, pos: [f32; 3]) -> Result<(), CoreError> {
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);
    let now = server.now_us();

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
    sd.pos = pos;

    server.broadcast_except(
        &table,
        sender,
        &OutboundMessage::MoveDataset { dataset_id, sd_id, headset_id: actor, pos },
    );
    Ok(())
}

pub fn scale(server: &Server, sender: ConnectionId, dataset_id: u32, sd_id: u32, scale: [f32; 3]) -> Result<(), CoreError> {
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);
    let now = server.now_us();

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
    sd.scale = scale;

    server.broadcast_except(
        &table,
        sender,
        &OutboundMessage::ScaleDataset { dataset_id, sd_id, headset_id: actor, scale },
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn set_clipping(
    server: &Server,
    sender: ConnectionId,
    dataset_id: u32,
    sd_id: u32,
    clip_index: u32,
    normal: [f32; 3],
    distance: f32,
    enabled: bool,
) -> Result<(), CoreError> {
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);
    let now = server.now_us();

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
    let volume = crate::world::dataset::ClippingVolume { normal, distance, enabled };
    match sd.clipping.get_mut(clip_index as usize) {
        Some(slot) => *slot = volume,
        None => sd.clipping.push(volume),
    }

    server.broadcast_except(
        &table,
        sender,
        &OutboundMessage::SetSubDatasetClipping { dataset_id, sd_id, clip_index, normal, distance, enabled },
    );
    Ok(())
}

pub fn tf_dataset(
    server: &Server,
    sender: ConnectionId,
    dataset_id: u32,
    sd_id: u32,
    tf_type: u16,
    params: Vec<u8>,
) -> Result<(), CoreError> {
    let dataset_id = DatasetId(dataset_id);
    let sd_id = SubDatasetId(sd_id);
    let now = server.now_us();

    let mut world = server.world();
    let table = server.connections();
    let actor = resolve_actor(&table, sender);

    let meta = world.meta(dataset_id, sd_id).ok_or_else(|| unknown(dataset_id, sd_id))?;
    if !can_modify(actor, meta) {
        return Ok(());
    }
    let meta = world.meta_mut(dataset_id, sd_id).unwrap();
    meta.tf_type = tf_type;
    meta.tf_params = params.clone();
    if let Some(h) = actor {
        meta.stamp(h, now);
    }

    // Transfer function edits change how the dataset looks for every
    // viewer, so they broadcast to everyone — not a per-frame transform.
    server.broadcast_all(
        &table,
        &OutboundMessage::TfDataset {
            dataset_id,
            sd_id,
            headset_id: actor,
            tf_type: tf_type as u8,
            color_mode: 0,
            params,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ids::HeadsetId;
    use crate::loader::NullLoader;
    use crate::session::connection::{Connection, HeadsetData, OutboundSink, Role, TabletData};
    use crate::world::dataset::DatasetKind;
    use sloggers::{null::NullLoggerBuilder, Build};
    use std::sync::{Arc, Mutex};

    struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);
    impl OutboundSink for RecordingSink {
        fn send(&self, frame: Vec<u8>) {
            self.0.lock().unwrap().push(frame);
        }
    }

    fn test_server() -> Server {
        let log = NullLoggerBuilder {}.build().unwrap();
        Server::new(Config::default(), Box::new(NullLoader), log)
    }

    #[test]
    fn test_rotate_excludes_originator_and_stamps_lock_owner() {
        let server = test_server();
        let ds = {
            let mut world = server.world();
            let ds = world.add_dataset(DatasetKind::Vtk, "d".into(), vec![], vec![]);
            world.add_subdataset(ds, "s".into(), None, 0).unwrap();
            ds
        };

        let tablet_sink = Arc::new(Mutex::new(Vec::new()));
        let headset_sink = Arc::new(Mutex::new(Vec::new()));
        {
            let mut table = server.connections();
            let mut headset = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(RecordingSink(headset_sink.clone())));
            headset.role = Role::Headset(HeadsetData::new(HeadsetId(0), 1));
            table.insert(headset);

            let mut tablet = Connection::new(ConnectionId(1), "10.0.0.3".into(), Box::new(RecordingSink(tablet_sink.clone())));
            tablet.role = Role::Tablet(TabletData {
                bound_headset: Some(ConnectionId(0)),
                ..Default::default()
            });
            table.insert(tablet);
        }

        rotate(&server, ConnectionId(1), ds.0, 0, [1.0, 0.0, 0.0, 0.0]).unwrap();

        assert!(tablet_sink.lock().unwrap().is_empty(), "originator must not receive its own transform");
        assert_eq!(headset_sink.lock().unwrap().len(), 1);

        let world = server.world();
        let meta = world.meta(ds, SubDatasetId(0)).unwrap();
        assert_eq!(meta.lock_owner, Some(HeadsetId(0)));
    }

    #[test]
    fn test_permission_denied_is_silent() {
        let server = test_server();
        let ds = {
            let mut world = server.world();
            let ds = world.add_dataset(DatasetKind::Vtk, "d".into(), vec![], vec![]);
            world.add_subdataset(ds, "s".into(), Some(HeadsetId(9)), 0).unwrap();
            ds
        };
        {
            let mut table = server.connections();
            let mut headset = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(RecordingSink(Arc::new(Mutex::new(Vec::new())))));
            headset.role = Role::Headset(HeadsetData::new(HeadsetId(5), 1));
            table.insert(headset);
        }

        translate(&server, ConnectionId(0), ds.0, 0, [1.0, 2.0, 3.0]).unwrap();

        let world = server.world();
        let sd = world.dataset(ds).unwrap().find(SubDatasetId(0)).unwrap();
        assert_eq!(sd.pos, [0.0, 0.0, 0.0]);
    }
}
