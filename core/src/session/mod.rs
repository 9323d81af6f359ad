//! Connection-scoped session data — one `Connection` per TCP socket,
//! aggregated in a `ConnectionTable` behind `mapMutex` (§5). Bound-peer
//! references are connection IDs, stable for the connection's
//! lifetime, not raw pointers: a disconnect turns into a lookup miss
//! rather than a dangling reference (§9).

pub mod connection;
pub mod table;

pub use connection::{Connection, HeadsetData, OutboundSink, PointingState, Role, TabletData};
pub use table::ConnectionTable;
