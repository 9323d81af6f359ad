//! Per-connection session data (§3 "Connection"/"Tablet data"/"Headset
//! data"), the slice of state that lives behind `mapMutex`. The
//! decode-side parser buffers are intentionally *not* here — they are
//! only ever touched by the one read thread owning that socket and
//! never need the connection-table lock; see `coviz-server::runtime`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ids::{ConnectionId, HeadsetId, TabletId};

/// Where a connection's outbound frames go. The real implementation
/// (`coviz-server`) backs this with the per-connection write-queue
/// channel; tests can supply an in-memory recorder.
pub trait OutboundSink: Send {
    fn send(&self, frame: Vec<u8>);
}

/// Pointing substate transmitted in the periodic status broadcast.
#[derive(Debug, Clone, Default)]
pub struct PointingState {
    pub technique: u16,
    pub dataset_id: u32,
    pub sd_id: u32,
    pub in_public: bool,
    pub local_pos: [f32; 3],
    pub start_pos: [f32; 3],
    pub start_rot: [f32; 4],
}

#[derive(Debug, Clone, Default)]
pub struct TabletData {
    pub tablet_id: TabletId,
    pub handedness: u32,
    /// The IP address the tablet announced. Kept even after binding
    /// succeeds so a headset that connects later (announcement raced
    /// ahead of the headset's own connection) can still be linked.
    pub intended_headset_ip: String,
    pub bound_headset: Option<ConnectionId>,
    pub selection_method: u16,
    pub lasso: Vec<[f32; 2]>,
    pub scale: f32,
}

impl Default for TabletId {
    fn default() -> Self {
        TabletId(0)
    }
}

#[derive(Debug, Clone)]
pub struct HeadsetData {
    pub headset_id: HeadsetId,
    pub color: u32,
    pub pos: [f32; 3],
    pub rot: [f32; 4],
    pub current_action: u16,
    pub pointing: PointingState,
    pub bound_tablet: Option<ConnectionId>,
    pub anchoring_sent: bool,
    /// IDs of elements selected by the in-progress volumetric
    /// selection. Cleared on `HeadsetCurrentAction` leaving a selection
    /// state and on `ResetVolumetricSelection`.
    pub selection_working_set: Vec<u32>,
}

impl HeadsetData {
    pub fn new(headset_id: HeadsetId, color: u32) -> Self {
        HeadsetData {
            headset_id,
            color,
            pos: [0.0; 3],
            rot: [1.0, 0.0, 0.0, 0.0],
            current_action: 0,
            pointing: PointingState::default(),
            bound_tablet: None,
            anchoring_sent: false,
            selection_working_set: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Role {
    #[default]
    Unidentified,
    Tablet(TabletData),
    Headset(HeadsetData),
}

pub struct Connection {
    pub id: ConnectionId,
    pub remote_ip: String,
    pub role: Role,
    outstanding: Arc<AtomicUsize>,
    sink: Box<dyn OutboundSink>,
}

impl Connection {
    pub fn new(id: ConnectionId, remote_ip: String, sink: Box<dyn OutboundSink>) -> Self {
        Connection {
            id,
            remote_ip,
            role: Role::Unidentified,
            outstanding: Arc::new(AtomicUsize::new(0)),
            sink,
        }
    }

    pub fn outstanding_handle(&self) -> Arc<AtomicUsize> {
        self.outstanding.clone()
    }

    pub fn outstanding_bytes(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Hands the frame to the outbound sink and records its size
    /// against the backpressure counter; the writer thread is
    /// responsible for decrementing once it is actually flushed.
    pub fn send(&self, frame: Vec<u8>) {
        self.outstanding.fetch_add(frame.len(), Ordering::AcqRel);
        self.sink.send(frame);
    }

    pub fn as_tablet(&self) -> Option<&TabletData> {
        match &self.role {
            Role::Tablet(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tablet_mut(&mut self) -> Option<&mut TabletData> {
        match &mut self.role {
            Role::Tablet(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_headset(&self) -> Option<&HeadsetData> {
        match &self.role {
            Role::Headset(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_headset_mut(&mut self) -> Option<&mut HeadsetData> {
        match &mut self.role {
            Role::Headset(h) => Some(h),
            _ => None,
        }
    }
}
