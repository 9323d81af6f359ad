//! Newtype identifiers, following the EntityId pattern: a transparent
//! wrapper over the wire-level integer so dataset/subdataset/headset/
//! tablet/connection references can't be mixed up at a call site.

/// Sentinel for "no headset" on the wire (`0xFFFFFFFF`).
pub const NO_HEADSET: u32 = 0xFFFF_FFFF;

macro_rules! wire_id {
    ($name:ident, $repr:ty) => {
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $repr);

        impl From<$repr> for $name {
            fn from(v: $repr) -> Self {
                $name(v)
            }
        }

        impl From<$name> for $repr {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

wire_id!(DatasetId, u32);
wire_id!(SubDatasetId, u32);
wire_id!(HeadsetId, u32);
wire_id!(TabletId, u32);

/// Stable for the lifetime of a TCP connection; used as the "weak
/// reference" in place of raw pointers for bound-peer links.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub usize);

impl From<usize> for ConnectionId {
    fn from(v: usize) -> Self {
        ConnectionId(v)
    }
}

impl From<ConnectionId> for usize {
    fn from(v: ConnectionId) -> Self {
        v.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl HeadsetId {
    pub fn to_wire(self) -> u32 {
        self.0
    }
}

/// Encode an `Option<HeadsetId>` as the wire convention: `NO_HEADSET`
/// stands in for `None`.
pub fn headset_to_wire(h: Option<HeadsetId>) -> u32 {
    h.map(|h| h.0).unwrap_or(NO_HEADSET)
}
