//! Compute thread (§5, §9): drains confirmed `SelectionJob`s outside
//! any table/world lock, the way the spec's "keep selection geometry
//! out of the world lock, commit only the result" discipline requires.
//!
//! This repo carries no mesh/point-cloud geometry model — datasets are
//! tracked by field names and transforms only (§2) — so there is no
//! element-containment test to run here. The commit step still goes
//! through the lock exactly once per job, matching the shape a real
//! geometry backend would plug into.

use std::sync::mpsc;
use std::sync::Arc;

use coviz_core::selection::{SelectionJob, SelectionSink};
use coviz_core::Server;

pub struct ChannelSelectionSink(mpsc::Sender<SelectionJob>);

impl ChannelSelectionSink {
    pub fn new(tx: mpsc::Sender<SelectionJob>) -> Self {
        ChannelSelectionSink(tx)
    }
}

impl SelectionSink for ChannelSelectionSink {
    fn submit(&self, job: SelectionJob) {
        let _ = self.0.send(job);
    }
}

pub fn spawn(server: Arc<Server>, rx: mpsc::Receiver<SelectionJob>) {
    std::thread::spawn(move || {
        for job in rx {
            let mut table = server.connections();
            if let Some(conn) = table.find_connection_by_headset(job.headset_id) {
                if let Some(h) = table.get_mut(conn).and_then(|c| c.as_headset_mut()) {
                    // No geometry backend to intersect the lasso against
                    // yet; committing an empty result still exercises the
                    // exact hand-off path a real one would use.
                    h.selection_working_set.clear();
                }
            }
        }
    });
}
