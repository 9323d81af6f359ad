//! Outbound frame encoding (§6). Opcodes are a stable, gapless 16-bit
//! enumeration distinct from the inbound tag space — the two protocols
//! share a wire format, not a numbering.

use byteorder::{BigEndian, WriteBytesExt};

use crate::ids::{headset_to_wire, DatasetId, HeadsetId, SubDatasetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OutboundTag {
    AddVtkDataset = 0,
    AddCloudPointDataset = 1,
    AddSubDataset = 2,
    RemoveSubDataset = 3,
    RotateDataset = 4,
    MoveDataset = 5,
    ScaleDataset = 6,
    TfDataset = 7,
    SubDatasetLockOwner = 8,
    SubDatasetOwner = 9,
    HeadsetBindingInfo = 10,
    HeadsetsStatus = 11,
    HeadsetAnchorSegment = 12,
    HeadsetAnchorEof = 13,
    RenameSubDataset = 14,
    SetSubDatasetClipping = 15,
    ToggleMapVisibility = 16,
    StartAnnotation = 17,
    AnchorAnnotation = 18,
    ClearAnnotations = 19,
}

/// One connected headset's record within a `HeadsetsStatus` tick frame.
#[derive(Debug, Clone)]
pub struct HeadsetStatusRecord {
    pub id: HeadsetId,
    pub color: u32,
    pub action: u32,
    pub pos: [f32; 3],
    pub rot: [f32; 4],
    pub pointing_technique: u32,
    pub pointing_dataset_id: u32,
    pub pointing_sd_id: u32,
    pub pointing_in_public: bool,
    pub local_sd_pos: [f32; 3],
    pub headset_start_pos: [f32; 3],
    pub headset_start_rot: [f32; 4],
}

#[derive(Debug, Clone)]
pub enum OutboundMessage {
    AddVtkDataset {
        id: DatasetId,
        name: String,
        pt_fields: Vec<u32>,
        cell_fields: Vec<u32>,
    },
    AddCloudPointDataset {
        id: DatasetId,
        name: String,
    },
    AddSubDataset {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        name: String,
        owner: Option<HeadsetId>,
    },
    RemoveSubDataset {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
    },
    RotateDataset {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        headset_id: Option<HeadsetId>,
        quat: [f32; 4],
    },
    MoveDataset {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        headset_id: Option<HeadsetId>,
        pos: [f32; 3],
    },
    ScaleDataset {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        headset_id: Option<HeadsetId>,
        scale: [f32; 3],
    },
    TfDataset {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        headset_id: Option<HeadsetId>,
        tf_type: u8,
        color_mode: u8,
        params: Vec<u8>,
    },
    SubDatasetLockOwner {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        headset_id: Option<HeadsetId>,
    },
    SubDatasetOwner {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        headset_id: Option<HeadsetId>,
    },
    HeadsetBindingInfo {
        headset_id: HeadsetId,
        color: u32,
        tablet_connected: bool,
        handedness: u32,
        tablet_id: u32,
        first_connected: bool,
    },
    HeadsetsStatus {
        records: Vec<HeadsetStatusRecord>,
    },
    HeadsetAnchorSegment {
        data: Vec<u8>,
    },
    HeadsetAnchorEof,
    RenameSubDataset {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        name: String,
    },
    SetSubDatasetClipping {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        clip_index: u32,
        normal: [f32; 3],
        distance: f32,
        enabled: bool,
    },
    ToggleMapVisibility {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        visible: bool,
    },
    StartAnnotation {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        technique: u16,
    },
    AnchorAnnotation {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
        points: Vec<[f32; 3]>,
    },
    ClearAnnotations {
        dataset_id: DatasetId,
        sd_id: SubDatasetId,
    },
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.write_u32::<BigEndian>(s.len() as u32).unwrap();
    buf.extend_from_slice(s.as_bytes());
}

fn write_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    buf.write_u32::<BigEndian>(b.len() as u32).unwrap();
    buf.extend_from_slice(b);
}

fn write_bool(buf: &mut Vec<u8>, b: bool) {
    buf.push(if b { 1 } else { 0 });
}

impl OutboundMessage {
    pub fn tag(&self) -> OutboundTag {
        use OutboundMessage::*;
        match self {
            AddVtkDataset { .. } => OutboundTag::AddVtkDataset,
            AddCloudPointDataset { .. } => OutboundTag::AddCloudPointDataset,
            AddSubDataset { .. } => OutboundTag::AddSubDataset,
            RemoveSubDataset { .. } => OutboundTag::RemoveSubDataset,
            RotateDataset { .. } => OutboundTag::RotateDataset,
            MoveDataset { .. } => OutboundTag::MoveDataset,
            ScaleDataset { .. } => OutboundTag::ScaleDataset,
            TfDataset { .. } => OutboundTag::TfDataset,
            SubDatasetLockOwner { .. } => OutboundTag::SubDatasetLockOwner,
            SubDatasetOwner { .. } => OutboundTag::SubDatasetOwner,
            HeadsetBindingInfo { .. } => OutboundTag::HeadsetBindingInfo,
            HeadsetsStatus { .. } => OutboundTag::HeadsetsStatus,
            HeadsetAnchorSegment { .. } => OutboundTag::HeadsetAnchorSegment,
            HeadsetAnchorEof => OutboundTag::HeadsetAnchorEof,
            RenameSubDataset { .. } => OutboundTag::RenameSubDataset,
            SetSubDatasetClipping { .. } => OutboundTag::SetSubDatasetClipping,
            ToggleMapVisibility { .. } => OutboundTag::ToggleMapVisibility,
            StartAnnotation { .. } => OutboundTag::StartAnnotation,
            AnchorAnnotation { .. } => OutboundTag::AnchorAnnotation,
            ClearAnnotations { .. } => OutboundTag::ClearAnnotations,
        }
    }

    /// Encode the full frame, including the leading `u16` type tag.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(self.tag() as u16).unwrap();
        use OutboundMessage::*;
        match self {
            AddVtkDataset { id, name, pt_fields, cell_fields } => {
                buf.write_u32::<BigEndian>(id.0).unwrap();
                write_string(&mut buf, name);
                buf.write_u32::<BigEndian>(pt_fields.len() as u32).unwrap();
                for f in pt_fields {
                    buf.write_u32::<BigEndian>(*f).unwrap();
                }
                buf.write_u32::<BigEndian>(cell_fields.len() as u32).unwrap();
                for f in cell_fields {
                    buf.write_u32::<BigEndian>(*f).unwrap();
                }
            }
            AddCloudPointDataset { id, name } => {
                buf.write_u32::<BigEndian>(id.0).unwrap();
                write_string(&mut buf, name);
            }
            AddSubDataset { dataset_id, sd_id, name, owner } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                write_string(&mut buf, name);
                buf.write_u32::<BigEndian>(headset_to_wire(*owner)).unwrap();
            }
            RemoveSubDataset { dataset_id, sd_id } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
            }
            RotateDataset { dataset_id, sd_id, headset_id, quat } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u32::<BigEndian>(headset_to_wire(*headset_id)).unwrap();
                for v in quat {
                    buf.write_f32::<BigEndian>(*v).unwrap();
                }
            }
            MoveDataset { dataset_id, sd_id, headset_id, pos } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u32::<BigEndian>(headset_to_wire(*headset_id)).unwrap();
                for v in pos {
                    buf.write_f32::<BigEndian>(*v).unwrap();
                }
            }
            ScaleDataset { dataset_id, sd_id, headset_id, scale } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u32::<BigEndian>(headset_to_wire(*headset_id)).unwrap();
                for v in scale {
                    buf.write_f32::<BigEndian>(*v).unwrap();
                }
            }
            TfDataset { dataset_id, sd_id, headset_id, tf_type, color_mode, params } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u32::<BigEndian>(headset_to_wire(*headset_id)).unwrap();
                buf.push(*tf_type);
                buf.push(*color_mode);
                write_bytes(&mut buf, params);
            }
            SubDatasetLockOwner { dataset_id, sd_id, headset_id }
            | SubDatasetOwner { dataset_id, sd_id, headset_id } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u32::<BigEndian>(headset_to_wire(*headset_id)).unwrap();
            }
            HeadsetBindingInfo {
                headset_id,
                color,
                tablet_connected,
                handedness,
                tablet_id,
                first_connected,
            } => {
                buf.write_u32::<BigEndian>(headset_id.0).unwrap();
                buf.write_u32::<BigEndian>(*color).unwrap();
                write_bool(&mut buf, *tablet_connected);
                buf.write_u32::<BigEndian>(*handedness).unwrap();
                buf.write_u32::<BigEndian>(*tablet_id).unwrap();
                write_bool(&mut buf, *first_connected);
            }
            HeadsetsStatus { records } => {
                buf.write_u32::<BigEndian>(records.len() as u32).unwrap();
                for r in records {
                    buf.write_u32::<BigEndian>(r.id.0).unwrap();
                    buf.write_u32::<BigEndian>(r.color).unwrap();
                    buf.write_u32::<BigEndian>(r.action).unwrap();
                    for v in r.pos {
                        buf.write_f32::<BigEndian>(v).unwrap();
                    }
                    for v in r.rot {
                        buf.write_f32::<BigEndian>(v).unwrap();
                    }
                    buf.write_u32::<BigEndian>(r.pointing_technique).unwrap();
                    buf.write_u32::<BigEndian>(r.pointing_dataset_id).unwrap();
                    buf.write_u32::<BigEndian>(r.pointing_sd_id).unwrap();
                    write_bool(&mut buf, r.pointing_in_public);
                    for v in r.local_sd_pos {
                        buf.write_f32::<BigEndian>(v).unwrap();
                    }
                    for v in r.headset_start_pos {
                        buf.write_f32::<BigEndian>(v).unwrap();
                    }
                    for v in r.headset_start_rot {
                        buf.write_f32::<BigEndian>(v).unwrap();
                    }
                }
            }
            HeadsetAnchorSegment { data } => {
                write_bytes(&mut buf, data);
            }
            HeadsetAnchorEof => {}
            RenameSubDataset { dataset_id, sd_id, name } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                write_string(&mut buf, name);
            }
            SetSubDatasetClipping { dataset_id, sd_id, clip_index, normal, distance, enabled } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u32::<BigEndian>(*clip_index).unwrap();
                for v in normal {
                    buf.write_f32::<BigEndian>(*v).unwrap();
                }
                buf.write_f32::<BigEndian>(*distance).unwrap();
                write_bool(&mut buf, *enabled);
            }
            ToggleMapVisibility { dataset_id, sd_id, visible } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                write_bool(&mut buf, *visible);
            }
            StartAnnotation { dataset_id, sd_id, technique } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u16::<BigEndian>(*technique).unwrap();
            }
            AnchorAnnotation { dataset_id, sd_id, points } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
                buf.write_u32::<BigEndian>(points.len() as u32).unwrap();
                for p in points {
                    for v in p {
                        buf.write_f32::<BigEndian>(*v).unwrap();
                    }
                }
            }
            ClearAnnotations { dataset_id, sd_id } => {
                buf.write_u32::<BigEndian>(dataset_id.0).unwrap();
                buf.write_u32::<BigEndian>(sd_id.0).unwrap();
            }
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_sub_dataset_wire_shape() {
        let msg = OutboundMessage::RemoveSubDataset {
            dataset_id: DatasetId(7),
            sd_id: SubDatasetId(9),
        };
        let bytes = msg.encode();
        assert_eq!(
            bytes,
            vec![0, OutboundTag::RemoveSubDataset as u8, 0, 0, 0, 7, 0, 0, 0, 9]
        );
    }

    #[test]
    fn test_no_headset_sentinel() {
        let msg = OutboundMessage::SubDatasetLockOwner {
            dataset_id: DatasetId(0),
            sd_id: SubDatasetId(0),
            headset_id: None,
        };
        let bytes = msg.encode();
        assert_eq!(&bytes[bytes.len() - 4..], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_opcode_table_is_gapless() {
        let tags = [
            OutboundTag::AddVtkDataset,
            OutboundTag::AddCloudPointDataset,
            OutboundTag::AddSubDataset,
            OutboundTag::RemoveSubDataset,
            OutboundTag::RotateDataset,
            OutboundTag::MoveDataset,
            OutboundTag::ScaleDataset,
            OutboundTag::TfDataset,
            OutboundTag::SubDatasetLockOwner,
            OutboundTag::SubDatasetOwner,
            OutboundTag::HeadsetBindingInfo,
            OutboundTag::HeadsetsStatus,
            OutboundTag::HeadsetAnchorSegment,
            OutboundTag::HeadsetAnchorEof,
            OutboundTag::RenameSubDataset,
            OutboundTag::SetSubDatasetClipping,
            OutboundTag::ToggleMapVisibility,
            OutboundTag::StartAnnotation,
            OutboundTag::AnchorAnnotation,
            OutboundTag::ClearAnnotations,
        ];
        for (i, t) in tags.iter().enumerate() {
            assert_eq!(*t as u16, i as u16);
        }
    }
}
