//! `IdentHeadset` / `IdentTablet` (§4.3) and the disconnect sweep that
//! undoes everything a connection's identity implied (§3 lifecycles,
//! §4.4, §4.5).

use slog::info;

use crate::error::CoreError;
use crate::ids::{headset_to_wire, ConnectionId, HeadsetId, TabletId};
use crate::net::outbound::OutboundMessage;
use crate::server::Server;
use crate::session::connection::{HeadsetData, Role, TabletData};

pub fn ident_headset(server: &Server, sender: ConnectionId) -> Result<(), CoreError> {
    // Anchor election touches `World`, so the world lock is acquired
    // first even though most of this handler only needs `connections`.
    let mut world = server.world();
    let mut table = server.connections();

    let role_is_unidentified = matches!(table.get(sender).map(|c| &c.role), Some(Role::Unidentified));
    if !role_is_unidentified {
        return Err(CoreError::RoleViolation("IdentHeadset from an already-identified connection".into()));
    }

    let color = table
        .acquire_color()
        .ok_or_else(|| CoreError::RoleViolation("headset capacity exhausted".into()))?;
    let headset_id = table.acquire_headset_id();

    let first_connected = world.anchor.provider.is_none();
    if first_connected {
        world.anchor.provider = Some(headset_id);
    }

    {
        let conn = table.get_mut(sender).expect("sender vanished under lock");
        conn.role = Role::Headset(HeadsetData::new(headset_id, color));
    }

    // Bind any tablet that announced this connection's IP before the
    // headset itself connected.
    let remote_ip = table.get(sender).unwrap().remote_ip.clone();
    let waiting = table.find_tablets_awaiting(&remote_ip);
    let mut binding_peer = None;
    if let Some(tablet_conn) = waiting.into_iter().next() {
        table.bind(tablet_conn, sender);
        binding_peer = table.get(tablet_conn).and_then(|c| c.as_tablet().cloned());
    }

    let (tablet_connected, handedness, tablet_id) = match &binding_peer {
        Some(t) => (true, t.handedness, t.tablet_id.0),
        None => (false, 0, 0),
    };

    server.send_to(
        &table,
        sender,
        &OutboundMessage::HeadsetBindingInfo {
            headset_id,
            color,
            tablet_connected,
            handedness,
            tablet_id,
            first_connected,
        },
    );

    info!(server.log, "headset connected"; "headset_id" => headset_id.0, "first_connected" => first_connected);
    Ok(())
}

pub fn ident_tablet(
    server: &Server,
    sender: ConnectionId,
    headset_ip: String,
    tablet_id: u32,
    handedness: u32,
) -> Result<(), CoreError> {
    let mut table = server.connections();

    let is_eligible = matches!(
        table.get(sender).map(|c| &c.role),
        Some(Role::Unidentified) | Some(Role::Tablet(_))
    );
    if !is_eligible {
        return Err(CoreError::RoleViolation("IdentTablet from a headset connection".into()));
    }

    let bound = table.find_headset_by_ip(&headset_ip);
    {
        let conn = table.get_mut(sender).expect("sender vanished under lock");
        conn.role = Role::Tablet(TabletData {
            tablet_id: TabletId(tablet_id),
            handedness,
            intended_headset_ip: headset_ip,
            bound_headset: None,
            selection_method: 0,
            lasso: Vec::new(),
            scale: 1.0,
        });
    }

    if let Some(headset_conn) = bound {
        table.bind(sender, headset_conn);
        let headset_id = table.get(headset_conn).and_then(|c| c.as_headset()).map(|h| h.headset_id);
        let info = OutboundMessage::HeadsetBindingInfo {
            headset_id: headset_id.unwrap_or(HeadsetId(0)),
            color: table.get(headset_conn).and_then(|c| c.as_headset()).map(|h| h.color).unwrap_or(0),
            tablet_connected: true,
            handedness,
            tablet_id,
            first_connected: false,
        };
        server.send_to(&table, sender, &info);
        server.send_to(&table, headset_conn, &info);
    }

    Ok(())
}

/// §3/§4.4/§4.5 disconnect handling, run by the runtime after a
/// connection's socket is confirmed closed.
pub fn disconnect(server: &Server, conn: ConnectionId) {
    let mut world = server.world();
    let mut table = server.connections();

    let removed = match table.remove(conn) {
        Some(c) => c,
        None => return,
    };

    match removed.role {
        Role::Headset(headset) => {
            table.release_color(headset.color);

            let (removed_sds, released_sds) = world.owner_disconnect_sweep(headset.headset_id);
            for (dataset_id, sd_id) in &removed_sds {
                server.broadcast_all(
                    &table,
                    &OutboundMessage::RemoveSubDataset {
                        dataset_id: *dataset_id,
                        sd_id: *sd_id,
                    },
                );
            }
            for (dataset_id, sd_id) in &released_sds {
                server.broadcast_all(
                    &table,
                    &OutboundMessage::SubDatasetLockOwner {
                        dataset_id: *dataset_id,
                        sd_id: *sd_id,
                        headset_id: None,
                    },
                );
            }

            if let Some(tablet_conn) = headset.bound_tablet {
                table.unbind(tablet_conn, conn);
                if let Some(t) = table.get(tablet_conn).and_then(|c| c.as_tablet()) {
                    server.send_to(
                        &table,
                        tablet_conn,
                        &OutboundMessage::HeadsetBindingInfo {
                            headset_id: HeadsetId(headset_to_wire(None)),
                            color: 0,
                            tablet_connected: false,
                            handedness: t.handedness,
                            tablet_id: t.tablet_id.0,
                            first_connected: false,
                        },
                    );
                }
            }

            if world.anchor.provider == Some(headset.headset_id) && !world.anchor.buffer.is_completed() {
                super::anchoring::reelect(&mut world, &mut table);
            }

            info!(server.log, "headset disconnected"; "headset_id" => headset.headset_id.0);
        }
        Role::Tablet(tablet) => {
            if let Some(headset_conn) = tablet.bound_headset {
                table.unbind(conn, headset_conn);
            }
        }
        Role::Unidentified => {}
    }
}
