//! `UpdateHeadset` and `HeadsetCurrentAction` (§4.3 items 93/95):
//! per-tick pose caching and the current-action state machine. Neither
//! broadcasts — pose/action are folded into the next `HeadsetsStatus`
//! tick frame (§4.7).

use crate::error::CoreError;
use crate::ids::ConnectionId;
use crate::server::Server;
use crate::session::connection::PointingState;

/// `VFVHeadsetCurrentActionType` values past which the current action is
/// "in a selection state" and leaving it clears the working set.
const SELECTION_STATES: [u16; 5] = [4, 5, 6, 7, 8];

#[allow(clippy::too_many_arguments)]
pub fn update_headset(
    server: &Server,
    sender: ConnectionId,
    pos: [f32; 3],
    rot: [f32; 4],
    action: u16,
    pointing_technique: u16,
    pointing_dataset_id: u32,
    pointing_sd_id: u32,
    pointing_local_pos: [f32; 3],
    pointing_start_pos: [f32; 3],
    pointing_start_rot: [f32; 4],
) -> Result<(), CoreError> {
    let mut table = server.connections();
    let headset = table
        .get_mut(sender)
        .and_then(|c| c.as_headset_mut())
        .ok_or_else(|| CoreError::RoleViolation("UpdateHeadset from a non-headset connection".into()))?;

    headset.pos = pos;
    headset.rot = rot;
    headset.current_action = action;
    // `in_public` is left at its default here and resolved against
    // `World` only when the tick broadcast builds a status record — it
    // depends on metadata this handler's lock doesn't cover.
    headset.pointing = PointingState {
        technique: pointing_technique,
        dataset_id: pointing_dataset_id,
        sd_id: pointing_sd_id,
        local_pos: pointing_local_pos,
        start_pos: pointing_start_pos,
        start_rot: pointing_start_rot,
        ..PointingState::default()
    };
    Ok(())
}

pub fn headset_current_action(server: &Server, sender: ConnectionId, action: u16) -> Result<(), CoreError> {
    let mut table = server.connections();
    let headset = table
        .get_mut(sender)
        .and_then(|c| c.as_headset_mut())
        .ok_or_else(|| CoreError::RoleViolation("HeadsetCurrentAction from a non-headset connection".into()))?;

    let was_selecting = SELECTION_STATES.contains(&headset.current_action);
    let still_selecting = SELECTION_STATES.contains(&action);
    headset.current_action = action;
    if was_selecting && !still_selecting {
        headset.selection_working_set.clear();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ids::HeadsetId;
    use crate::loader::NullLoader;
    use crate::session::connection::{Connection, HeadsetData, OutboundSink, Role};
    use sloggers::{null::NullLoggerBuilder, Build};

    struct NullSink;
    impl OutboundSink for NullSink {
        fn send(&self, _frame: Vec<u8>) {}
    }

    fn test_server() -> Server {
        let log = NullLoggerBuilder {}.build().unwrap();
        Server::new(Config::default(), Box::new(NullLoader), log)
    }

    #[test]
    fn test_update_headset_caches_pose_without_broadcast() {
        let server = test_server();
        {
            let mut table = server.connections();
            let mut c = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(NullSink));
            c.role = Role::Headset(HeadsetData::new(HeadsetId(0), 1));
            table.insert(c);
        }

        update_headset(&server, ConnectionId(0), [1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0], 1, 0, 0, 0, [0.0; 3], [0.0; 3], [0.0; 4]).unwrap();

        let table = server.connections();
        let headset = table.get(ConnectionId(0)).unwrap().as_headset().unwrap();
        assert_eq!(headset.pos, [1.0, 2.0, 3.0]);
        assert_eq!(headset.current_action, 1);
    }

    #[test]
    fn test_leaving_selection_state_clears_working_set() {
        let server = test_server();
        {
            let mut table = server.connections();
            let mut c = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(NullSink));
            let mut h = HeadsetData::new(HeadsetId(0), 1);
            h.current_action = 7; // SELECTING
            h.selection_working_set = vec![1, 2, 3];
            c.role = Role::Headset(h);
            table.insert(c);
        }

        headset_current_action(&server, ConnectionId(0), 0).unwrap(); // NOTHING

        let table = server.connections();
        let headset = table.get(ConnectionId(0)).unwrap().as_headset().unwrap();
        assert!(headset.selection_working_set.is_empty());
    }

    #[test]
    fn test_moving_between_selection_states_keeps_working_set() {
        let server = test_server();
        {
            let mut table = server.connections();
            let mut c = Connection::new(ConnectionId(0), "10.0.0.2".into(), Box::new(NullSink));
            let mut h = HeadsetData::new(HeadsetId(0), 1);
            h.current_action = 6; // LASSO
            h.selection_working_set = vec![1, 2, 3];
            c.role = Role::Headset(h);
            table.insert(c);
        }

        headset_current_action(&server, ConnectionId(0), 7).unwrap(); // SELECTING

        let table = server.connections();
        let headset = table.get(ConnectionId(0)).unwrap().as_headset().unwrap();
        assert_eq!(headset.selection_working_set, vec![1, 2, 3]);
    }
}
