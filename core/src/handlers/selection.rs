//! Selection pipeline (§4.3 item 97): `TabletScale`/`Lasso`/
//! `AddNewSelectionInput` accumulate input on the tablet's own state,
//! `ConfirmSelection` hands the accumulated input to the compute-thread
//! seam. None of these broadcast — the result of a confirmed selection
//! is private to the requesting pair until something else (an
//! annotation, a dataset edit) makes it visible. `ResetVolumetricSelection`
//! and `Location` are role-agnostic per §4.3's table.

use crate::error::CoreError;
use crate::ids::{ConnectionId, DatasetId, SubDatasetId};
use crate::permission::resolve_actor;
use crate::selection::SelectionJob;
use crate::server::Server;

fn require_tablet(server: &Server, sender: ConnectionId) -> Result<(), CoreError> {
    let table = server.connections();
    table
        .get(sender)
        .and_then(|c| c.as_tablet())
        .map(|_| ())
        .ok_or_else(|| CoreError::RoleViolation("selection-pipeline message from a non-tablet connection".into()))
}

pub fn tablet_scale(server: &Server, sender: ConnectionId, scale: f32) -> Result<(), CoreError> {
    require_tablet(server, sender)?;
    let mut table = server.connections();
    table.get_mut(sender).and_then(|c| c.as_tablet_mut()).unwrap().scale = scale;
    Ok(())
}

pub fn lasso(server: &Server, sender: ConnectionId, points: Vec<[f32; 2]>) -> Result<(), CoreError> {
    require_tablet(server, sender)?;
    let mut table = server.connections();
    table.get_mut(sender).and_then(|c| c.as_tablet_mut()).unwrap().lasso = points;
    Ok(())
}

pub fn add_new_selection_input(server: &Server, sender: ConnectionId, method: u16) -> Result<(), CoreError> {
    require_tablet(server, sender)?;
    let mut table = server.connections();
    table.get_mut(sender).and_then(|c| c.as_tablet_mut()).unwrap().selection_method = method;
    Ok(())
}

/// Packages the tablet's accumulated lasso/scale/method into a job for
/// the compute thread, targeting whatever subdataset the bound
/// headset's pointing substate currently names. Silently does nothing
/// if the tablet isn't bound or nothing is being pointed at — there is
/// no lasso to confirm without a target.
pub fn confirm_selection(server: &Server, sender: ConnectionId) -> Result<(), CoreError> {
    require_tablet(server, sender)?;
    let mut table = server.connections();

    let headset_id = match resolve_actor(&table, sender) {
        Some(h) => h,
        None => return Ok(()),
    };
    let headset_conn = table.find_connection_by_headset(headset_id);
    let pointing = headset_conn.and_then(|c| table.get(c)).and_then(|c| c.as_headset()).map(|h| h.pointing.clone());
    let Some(pointing) = pointing else { return Ok(()) };
    if pointing.dataset_id == 0 && pointing.sd_id == 0 {
        return Ok(());
    }

    let tablet = table.get_mut(sender).and_then(|c| c.as_tablet_mut()).unwrap();
    let job = SelectionJob {
        connection: sender,
        headset_id,
        dataset_id: DatasetId(pointing.dataset_id),
        sd_id: SubDatasetId(pointing.sd_id),
        method: tablet.selection_method,
        lasso: std::mem::take(&mut tablet.lasso),
        scale: tablet.scale,
    };
    server.selection.submit(job);
    Ok(())
}

/// Role-agnostic per §4.3's table; resolves to whatever headset the
/// sender is or is bound to and clears its in-progress working set.
pub fn reset_volumetric_selection(server: &Server, sender: ConnectionId) -> Result<(), CoreError> {
    let mut table = server.connections();
    let headset_id = match resolve_actor(&table, sender) {
        Some(h) => h,
        None => return Ok(()),
    };
    if let Some(conn) = table.find_connection_by_headset(headset_id) {
        if let Some(h) = table.get_mut(conn).and_then(|c| c.as_headset_mut()) {
            h.selection_working_set.clear();
        }
    }
    Ok(())
}

/// §4.3 item 27: a documented no-op so a tablet that sends its
/// out-of-core location update on the main port doesn't get its
/// connection closed as a protocol violation.
pub fn location(_server: &Server, _sender: ConnectionId, _pos: [f32; 3]) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ids::{HeadsetId, TabletId};
    use crate::loader::NullLoader;
    use crate::selection::{SelectionJob as Job, SelectionSink};
    use crate::session::connection::{Connection, HeadsetData, OutboundSink, PointingState, Role, TabletData};
    use sloggers::{null::NullLoggerBuilder, Build};
    use std::sync::{Arc, Mutex};

    struct NullSink;
    impl OutboundSink for NullSink {
        fn send(&self, _frame: Vec<u8>) {}
    }

    struct RecordingSelectionSink(Arc<Mutex<Vec<Job>>>);
    impl SelectionSink for RecordingSelectionSink {
        fn submit(&self, job: Job) {
            self.0.lock().unwrap().push(job);
        }
    }

    fn test_server() -> Server {
        let log = NullLoggerBuilder {}.build().unwrap();
        Server::new(Config::default(), Box::new(NullLoader), log)
    }

    #[test]
    fn test_lasso_from_headset_is_role_violation() {
        let server = test_server();
        {
            let mut table = server.connections();
            let mut c = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(NullSink));
            c.role = Role::Headset(HeadsetData::new(HeadsetId(0), 1));
            table.insert(c);
        }
        let err = lasso(&server, ConnectionId(0), vec![[0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, CoreError::RoleViolation(_)));
    }

    #[test]
    fn test_confirm_selection_without_target_is_silent() {
        let server = test_server();
        {
            let mut table = server.connections();
            let mut c = Connection::new(ConnectionId(0), "10.0.0.3".into(), Box::new(NullSink));
            c.role = Role::Tablet(TabletData {
                tablet_id: TabletId(0),
                bound_headset: None,
                ..Default::default()
            });
            table.insert(c);
        }
        confirm_selection(&server, ConnectionId(0)).unwrap();
    }

    #[test]
    fn test_confirm_selection_submits_job_for_pointed_subdataset() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let server = test_server().with_selection_sink(Box::new(RecordingSelectionSink(sink.clone())));
        {
            let mut table = server.connections();
            let mut headset = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(NullSink));
            let mut h = HeadsetData::new(HeadsetId(0), 1);
            h.pointing = PointingState {
                dataset_id: 2,
                sd_id: 5,
                ..Default::default()
            };
            headset.role = Role::Headset(h);
            table.insert(headset);

            let mut tablet = Connection::new(ConnectionId(1), "10.0.0.3".into(), Box::new(NullSink));
            tablet.role = Role::Tablet(TabletData {
                bound_headset: Some(ConnectionId(0)),
                lasso: vec![[1.0, 1.0]],
                scale: 2.0,
                ..Default::default()
            });
            table.insert(tablet);
        }

        confirm_selection(&server, ConnectionId(1)).unwrap();

        let jobs = sink.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].dataset_id, DatasetId(2));
        assert_eq!(jobs[0].sd_id, SubDatasetId(5));
        assert_eq!(jobs[0].lasso, vec![[1.0, 1.0]]);
    }
}
