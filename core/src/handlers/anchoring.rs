//! Anchor election and distribution (§4.4). `AnchoringDataSegment`
//! streams arrive only from the current provider; `AnchoringDataStatus`
//! commits or resets the round.

use slog::{info, warn};

use crate::error::CoreError;
use crate::ids::ConnectionId;
use crate::net::outbound::OutboundMessage;
use crate::server::Server;
use crate::session::table::ConnectionTable;
use crate::world::World;

fn is_provider(world: &World, table: &ConnectionTable, sender: ConnectionId) -> bool {
    let Some(headset) = table.get(sender).and_then(|c| c.as_headset()) else {
        return false;
    };
    world.anchor.provider == Some(headset.headset_id)
}

pub fn data_segment(server: &Server, sender: ConnectionId, data: Vec<u8>) -> Result<(), CoreError> {
    let mut world = server.world();
    let table = server.connections();

    if !is_provider(&world, &table, sender) {
        return Err(CoreError::Protocol("AnchoringDataSegment from a non-provider connection".into()));
    }
    world.anchor.buffer.push_segment(data);
    Ok(())
}

pub fn data_status(server: &Server, sender: ConnectionId, ok: bool) -> Result<(), CoreError> {
    let mut world = server.world();
    let mut table = server.connections();

    if !is_provider(&world, &table, sender) {
        return Err(CoreError::Protocol("AnchoringDataStatus from a non-provider connection".into()));
    }

    if ok {
        world.anchor.buffer.commit();
        distribute(server, &world, &mut table);
        info!(server.log, "anchor round committed");
    } else {
        warn!(server.log, "anchor round failed, re-electing provider");
        reelect(&mut world, &mut table);
    }
    Ok(())
}

/// Fans the committed anchor out, segment by segment then EOF, to
/// every connected headset whose `anchoringSent` is still false.
fn distribute(server: &Server, world: &World, table: &mut ConnectionTable) {
    let targets: Vec<ConnectionId> = table
        .iter()
        .filter(|c| matches!(c.as_headset(), Some(h) if !h.anchoring_sent))
        .map(|c| c.id)
        .collect();

    for target in &targets {
        for segment in world.anchor.buffer.segments() {
            server.send_to(table, *target, &OutboundMessage::HeadsetAnchorSegment { data: segment.clone() });
        }
        server.send_to(table, *target, &OutboundMessage::HeadsetAnchorEof);
        if let Some(h) = table.get_mut(*target).and_then(|c| c.as_headset_mut()) {
            h.anchoring_sent = true;
        }
    }
}

/// §4.4's "cycle repeats": clear the buffer, reset every headset's
/// `anchoringSent`, and elect the first headset in connection order.
pub(super) fn reelect(world: &mut World, table: &mut ConnectionTable) {
    world.anchor.buffer.reset();
    let ids: Vec<ConnectionId> = table.iter().map(|c| c.id).collect();
    for id in ids {
        if let Some(h) = table.get_mut(id).and_then(|c| c.as_headset_mut()) {
            h.anchoring_sent = false;
        }
    }
    world.anchor.provider = table.first_headset().map(|(_, h)| h);
}
