//! Command Handlers (§4.6): one per inbound message kind. Every
//! mutating handler follows the same shape — resolve target, check
//! permission, stamp `lockOwner`/`lastModification`, mutate, fan out —
//! implemented once in `transform.rs` and reused by the handlers that
//! just plug in a different mutation closure.

mod anchoring;
mod annotation;
mod dataset;
mod identity;
mod misc;
mod selection;
mod transform;

use crate::audit::{AuditEvent, Direction};
use crate::error::CoreError;
use crate::ids::ConnectionId;
use crate::net::message::Message;
use crate::server::Server;

/// Variant name and, where the message carries one, the dataset/
/// subdataset it targets — enough to audit an accepted inbound message
/// without re-deriving its tag from the wire.
fn inbound_kind_and_ids(msg: &Message) -> (&'static str, Option<u32>, Option<u32>) {
    use Message::*;
    match msg {
        IdentHeadset => ("IdentHeadset", None, None),
        IdentTablet { .. } => ("IdentTablet", None, None),
        AddVtkDataset { .. } => ("AddVtkDataset", None, None),
        AddCloudPointDataset { .. } => ("AddCloudPointDataset", None, None),
        AddSubDataset { dataset_id, .. } => ("AddSubDataset", Some(*dataset_id), None),
        RemoveSubDataset { dataset_id, sd_id } => ("RemoveSubDataset", Some(*dataset_id), Some(*sd_id)),
        DuplicateSubDataset { dataset_id, sd_id } => ("DuplicateSubDataset", Some(*dataset_id), Some(*sd_id)),
        RenameSubDataset { dataset_id, sd_id, .. } => ("RenameSubDataset", Some(*dataset_id), Some(*sd_id)),
        MakeSubDatasetPublic { dataset_id, sd_id } => ("MakeSubDatasetPublic", Some(*dataset_id), Some(*sd_id)),
        ToggleMapVisibility { dataset_id, sd_id, .. } => ("ToggleMapVisibility", Some(*dataset_id), Some(*sd_id)),
        RotateDataset { dataset_id, sd_id, .. } => ("RotateDataset", Some(*dataset_id), Some(*sd_id)),
        TranslateDataset { dataset_id, sd_id, .. } => ("TranslateDataset", Some(*dataset_id), Some(*sd_id)),
        ScaleDataset { dataset_id, sd_id, .. } => ("ScaleDataset", Some(*dataset_id), Some(*sd_id)),
        SetSubDatasetClipping { dataset_id, sd_id, .. } => ("SetSubDatasetClipping", Some(*dataset_id), Some(*sd_id)),
        TfDataset { dataset_id, sd_id, .. } => ("TfDataset", Some(*dataset_id), Some(*sd_id)),
        UpdateHeadset { .. } => ("UpdateHeadset", None, None),
        HeadsetCurrentAction { .. } => ("HeadsetCurrentAction", None, None),
        AnchoringDataSegment { .. } => ("AnchoringDataSegment", None, None),
        AnchoringDataStatus { .. } => ("AnchoringDataStatus", None, None),
        StartAnnotation { dataset_id, sd_id, .. } => ("StartAnnotation", Some(*dataset_id), Some(*sd_id)),
        AnchorAnnotation { dataset_id, sd_id, .. } => ("AnchorAnnotation", Some(*dataset_id), Some(*sd_id)),
        ClearAnnotations { dataset_id, sd_id } => ("ClearAnnotations", Some(*dataset_id), Some(*sd_id)),
        TabletScale { .. } => ("TabletScale", None, None),
        Lasso { .. } => ("Lasso", None, None),
        AddNewSelectionInput { .. } => ("AddNewSelectionInput", None, None),
        ConfirmSelection => ("ConfirmSelection", None, None),
        ResetVolumetricSelection => ("ResetVolumetricSelection", None, None),
        Location { .. } => ("Location", None, None),
    }
}

/// Dispatches one fully-assembled inbound message. Role violations and
/// unknown targets surface as `Err` for the caller (the connection's
/// read loop) to act on per §7; permission failures are swallowed here
/// since they are a silent no-op, never an error.
pub fn dispatch(server: &Server, sender: ConnectionId, msg: Message) -> Result<(), CoreError> {
    let (kind, dataset_id, sd_id) = inbound_kind_and_ids(&msg);
    let mut event = AuditEvent::new(server.now_us(), Some(sender), Direction::Inbound, kind);
    if let Some(d) = dataset_id {
        event = event.with_dataset(d);
    }
    if let Some(s) = sd_id {
        event = event.with_sd(s);
    }
    server.audit.record(event);

    use Message::*;
    match msg {
        IdentHeadset => identity::ident_headset(server, sender),
        IdentTablet { headset_ip, tablet_id, handedness } => {
            identity::ident_tablet(server, sender, headset_ip, tablet_id, handedness)
        }
        AddVtkDataset { path } => dataset::add_vtk_dataset(server, path),
        AddCloudPointDataset { path } => dataset::add_cloud_point_dataset(server, path),
        AddSubDataset { dataset_id, is_public } => dataset::add_subdataset(server, sender, dataset_id, is_public),
        RemoveSubDataset { dataset_id, sd_id } => dataset::remove_subdataset(server, sender, dataset_id, sd_id),
        DuplicateSubDataset { dataset_id, sd_id } => dataset::duplicate_subdataset(server, sender, dataset_id, sd_id),
        RenameSubDataset { dataset_id, sd_id, name } => dataset::rename_subdataset(server, sender, dataset_id, sd_id, name),
        MakeSubDatasetPublic { dataset_id, sd_id } => dataset::make_subdataset_public(server, sender, dataset_id, sd_id),
        ToggleMapVisibility { dataset_id, sd_id, visible } => {
            dataset::toggle_map_visibility(server, sender, dataset_id, sd_id, visible)
        }
        RotateDataset { dataset_id, sd_id, quat } => transform::rotate(server, sender, dataset_id, sd_id, quat),
        TranslateDataset { dataset_id, sd_id, pos } => transform::translate(server, sender, dataset_id, sd_id, pos),
        ScaleDataset { dataset_id, sd_id, scale } => transform::scale(server, sender, dataset_id, sd_id, scale),
        SetSubDatasetClipping { dataset_id, sd_id, clip_index, normal, distance, enabled } => {
            transform::set_clipping(server, sender, dataset_id, sd_id, clip_index, normal, distance, enabled)
        }
        TfDataset { dataset_id, sd_id, tf_type, params } => transform::tf_dataset(server, sender, dataset_id, sd_id, tf_type, params),
        UpdateHeadset {
            pos,
            rot,
            action,
            pointing_technique,
            pointing_dataset_id,
            pointing_sd_id,
            pointing_local_pos,
            pointing_start_pos,
            pointing_start_rot,
        } => misc::update_headset(
            server,
            sender,
            pos,
            rot,
            action,
            pointing_technique,
            pointing_dataset_id,
            pointing_sd_id,
            pointing_local_pos,
            pointing_start_pos,
            pointing_start_rot,
        ),
        HeadsetCurrentAction { action } => misc::headset_current_action(server, sender, action),
        AnchoringDataSegment { data } => anchoring::data_segment(server, sender, data),
        AnchoringDataStatus { ok } => anchoring::data_status(server, sender, ok),
        StartAnnotation { dataset_id, sd_id, technique } => annotation::start(server, sender, dataset_id, sd_id, technique),
        AnchorAnnotation { dataset_id, sd_id, points } => annotation::anchor(server, sender, dataset_id, sd_id, points),
        ClearAnnotations { dataset_id, sd_id } => annotation::clear(server, sender, dataset_id, sd_id),
        TabletScale { scale } => selection::tablet_scale(server, sender, scale),
        Lasso { points } => selection::lasso(server, sender, points),
        AddNewSelectionInput { method } => selection::add_new_selection_input(server, sender, method),
        ConfirmSelection => selection::confirm_selection(server, sender),
        ResetVolumetricSelection => selection::reset_volumetric_selection(server, sender),
        Location { pos } => selection::location(server, sender, pos),
    }
}

/// §4.4/§4.5's disconnect sweep, called by the runtime when a
/// connection's socket closes for any reason.
pub fn handle_disconnect(server: &Server, conn: ConnectionId) {
    identity::disconnect(server, conn);
}
