//! Permission & Ownership Engine (§4.5): `canModify` plus the two
//! time-driven sweeps that keep `lockOwner` honest. The sweeps
//! themselves live on `World` (`expire_locks`, `owner_disconnect_sweep`)
//! since they only touch `datasetMutex` state; this module is just the
//! per-mutation decision function.

use crate::ids::{ConnectionId, HeadsetId};
use crate::session::table::ConnectionTable;
use crate::world::metadata::SubDatasetMetaData;

/// The acting identity behind an inbound message: either a connected
/// headset, or nothing (an unbound tablet can never modify anything —
/// §8's permission-monotonicity property).
pub type Actor = Option<HeadsetId>;

/// `bound-headset(client)` from §4.5: a headset acts as itself; a
/// tablet acts as whatever headset it is currently bound to, if any.
pub fn resolve_actor(table: &ConnectionTable, sender: ConnectionId) -> Actor {
    let conn = table.get(sender)?;
    if let Some(h) = conn.as_headset() {
        return Some(h.headset_id);
    }
    let bound = conn.as_tablet()?.bound_headset?;
    table.get(bound)?.as_headset().map(|h| h.headset_id)
}

/// `canModify(client, sdMeta)` from §4.5. Server-internal operations
/// (dataset loading, the tick's own bookkeeping) never call this —
/// they mutate `World` directly.
pub fn can_modify(actor: Actor, meta: &SubDatasetMetaData) -> bool {
    let Some(h) = actor else { return false };
    if meta.is_public() {
        meta.lock_owner.is_none() || meta.lock_owner == Some(h)
    } else {
        meta.owner == Some(h)
    }
}
