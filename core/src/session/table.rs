//! The connection table: every live `Connection`, the color palette
//! pool, and the headset-ID counter. All guarded by `mapMutex`, nested
//! inside `datasetMutex` wherever a handler needs both (§5).

use hashbrown::HashMap;

use crate::ids::{ConnectionId, HeadsetId};
use crate::session::connection::{Connection, Role};
use crate::world::palette::ColorPalette;

#[derive(Default)]
pub struct ConnectionTable {
    connections: HashMap<ConnectionId, Connection>,
    palette: ColorPalette,
    next_headset_id: u32,
}

impl ConnectionTable {
    pub fn new() -> Self {
        ConnectionTable::default()
    }

    pub fn insert(&mut self, conn: Connection) {
        self.connections.insert(conn.id, conn);
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn acquire_headset_id(&mut self) -> HeadsetId {
        let id = HeadsetId(self.next_headset_id);
        self.next_headset_id += 1;
        id
    }

    pub fn acquire_color(&mut self) -> Option<u32> {
        self.palette.acquire()
    }

    pub fn release_color(&mut self, color: u32) {
        self.palette.release(color);
    }

    pub fn palette_capacity(&self) -> usize {
        self.palette.capacity()
    }

    /// First connected headset by connection-id enumeration order —
    /// used for initial anchor-provider election and re-election
    /// (§4.4's "first headset in enumeration order").
    pub fn first_headset(&self) -> Option<(ConnectionId, HeadsetId)> {
        let mut ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        ids.sort();
        for id in ids {
            if let Some(h) = self.connections[&id].as_headset() {
                return Some((id, h.headset_id));
            }
        }
        None
    }

    pub fn find_connection_by_headset(&self, h: HeadsetId) -> Option<ConnectionId> {
        self.connections
            .iter()
            .find(|(_, c)| matches!(&c.role, Role::Headset(hd) if hd.headset_id == h))
            .map(|(id, _)| *id)
    }

    /// A headset connected from this IP address, if any — used to
    /// auto-pair a tablet announcing its intended headset's IP.
    pub fn find_headset_by_ip(&self, ip: &str) -> Option<ConnectionId> {
        self.connections
            .iter()
            .find(|(_, c)| matches!(&c.role, Role::Headset(_)) && c.remote_ip == ip)
            .map(|(id, _)| *id)
    }

    /// Tablets still waiting to be bound to a headset at this IP,
    /// because they announced it before the headset connected.
    pub fn find_tablets_awaiting(&self, ip: &str) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, c)| {
                matches!(&c.role, Role::Tablet(t) if t.bound_headset.is_none() && t.intended_headset_ip == ip)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Links a tablet and a headset connection symmetrically.
    pub fn bind(&mut self, tablet: ConnectionId, headset: ConnectionId) {
        if let Some(c) = self.connections.get_mut(&tablet) {
            if let Some(t) = c.as_tablet_mut() {
                t.bound_headset = Some(headset);
            }
        }
        if let Some(c) = self.connections.get_mut(&headset) {
            if let Some(h) = c.as_headset_mut() {
                h.bound_tablet = Some(tablet);
            }
        }
    }

    /// Clears a binding from both sides; safe to call with either side
    /// already gone.
    pub fn unbind(&mut self, tablet: ConnectionId, headset: ConnectionId) {
        if let Some(c) = self.connections.get_mut(&tablet) {
            if let Some(t) = c.as_tablet_mut() {
                t.bound_headset = None;
            }
        }
        if let Some(c) = self.connections.get_mut(&headset) {
            if let Some(h) = c.as_headset_mut() {
                h.bound_tablet = None;
            }
        }
    }

    pub fn headset_count(&self) -> usize {
        self.connections
            .values()
            .filter(|c| matches!(c.role, Role::Headset(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::connection::OutboundSink;

    struct NullSink;
    impl OutboundSink for NullSink {
        fn send(&self, _frame: Vec<u8>) {}
    }

    #[test]
    fn test_headset_ids_monotonic() {
        let mut table = ConnectionTable::new();
        assert_eq!(table.acquire_headset_id(), HeadsetId(0));
        assert_eq!(table.acquire_headset_id(), HeadsetId(1));
    }

    #[test]
    fn test_first_headset_by_connection_order() {
        let mut table = ConnectionTable::new();
        let mut c0 = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(NullSink));
        c0.role = Role::Headset(crate::session::connection::HeadsetData::new(HeadsetId(0), 1));
        table.insert(c0);
        let mut c1 = Connection::new(ConnectionId(1), "10.0.0.3".into(), Box::new(NullSink));
        c1.role = Role::Headset(crate::session::connection::HeadsetData::new(HeadsetId(1), 2));
        table.insert(c1);

        assert_eq!(table.first_headset(), Some((ConnectionId(0), HeadsetId(0))));
    }
}
