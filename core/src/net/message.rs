//! The closed inbound message taxonomy (§4.3) as a tagged sum type,
//! plus the per-tag field schedule the streaming parser (`parser.rs`)
//! consults one field at a time. Replaces a hand-rolled tagged union
//! with variants carrying exactly the fields they need — there is no
//! shared mutable payload struct to stomp between messages.

use crate::error::CoreError;

/// Wire-level primitive type a single field is read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U16,
    U32,
    F32,
    Bool,
    String,
    Bytes,
}

/// A decoded field value, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    U16(u16),
    U32(u32),
    F32(f32),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
}

/// Closed 16-bit inbound opcode enumeration. Gaps disallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Tag {
    IdentHeadset = 0,
    IdentTablet = 1,
    AddVtkDataset = 2,
    AddCloudPointDataset = 3,
    AddSubDataset = 4,
    RemoveSubDataset = 5,
    DuplicateSubDataset = 6,
    RenameSubDataset = 7,
    MakeSubDatasetPublic = 8,
    RotateDataset = 9,
    TranslateDataset = 10,
    ScaleDataset = 11,
    SetSubDatasetClipping = 12,
    TfDataset = 13,
    UpdateHeadset = 14,
    AnchoringDataSegment = 15,
    AnchoringDataStatus = 16,
    HeadsetCurrentAction = 17,
    StartAnnotation = 18,
    AnchorAnnotation = 19,
    ClearAnnotations = 20,
    TabletScale = 21,
    Lasso = 22,
    AddNewSelectionInput = 23,
    ConfirmSelection = 24,
    ToggleMapVisibility = 25,
    ResetVolumetricSelection = 26,
    Location = 27,
}

impl Tag {
    pub fn from_u16(v: u16) -> Option<Tag> {
        use Tag::*;
        Some(match v {
            0 => IdentHeadset,
            1 => IdentTablet,
            2 => AddVtkDataset,
            3 => AddCloudPointDataset,
            4 => AddSubDataset,
            5 => RemoveSubDataset,
            6 => DuplicateSubDataset,
            7 => RenameSubDataset,
            8 => MakeSubDatasetPublic,
            9 => RotateDataset,
            10 => TranslateDataset,
            11 => ScaleDataset,
            12 => SetSubDatasetClipping,
            13 => TfDataset,
            14 => UpdateHeadset,
            15 => AnchoringDataSegment,
            16 => AnchoringDataStatus,
            17 => HeadsetCurrentAction,
            18 => StartAnnotation,
            19 => AnchorAnnotation,
            20 => ClearAnnotations,
            21 => TabletScale,
            22 => Lasso,
            23 => AddNewSelectionInput,
            24 => ConfirmSelection,
            25 => ToggleMapVisibility,
            26 => ResetVolumetricSelection,
            27 => Location,
            _ => return None,
        })
    }
}

/// Fixed-schedule messages: a plain slice of field kinds, one per
/// cursor value. Looked up directly; only the two messages with a
/// trailing point list need dynamic handling below.
fn fixed_schedule(tag: Tag) -> &'static [FieldKind] {
    use FieldKind::*;
    use Tag::*;
    match tag {
        IdentHeadset => &[],
        IdentTablet => &[String, U32, U32],
        AddVtkDataset => &[String],
        AddCloudPointDataset => &[String],
        AddSubDataset => &[U32, Bool],
        RemoveSubDataset => &[U32, U32],
        DuplicateSubDataset => &[U32, U32],
        RenameSubDataset => &[U32, U32, String],
        MakeSubDatasetPublic => &[U32, U32],
        RotateDataset => &[U32, U32, F32, F32, F32, F32],
        TranslateDataset => &[U32, U32, F32, F32, F32],
        ScaleDataset => &[U32, U32, F32, F32, F32],
        SetSubDatasetClipping => &[U32, U32, U32, F32, F32, F32, F32, Bool],
        TfDataset => &[U32, U32, U16, Bytes],
        UpdateHeadset => &[
            F32, F32, F32, // pos
            F32, F32, F32, F32, // rot
            U16, // action
            U16, U32, U32, // pointing technique / dataset / sd
            F32, F32, F32, // pointing local pos
            F32, F32, F32, // pointing start pos
            F32, F32, F32, F32, // pointing start rot
        ],
        AnchoringDataSegment => &[Bytes],
        AnchoringDataStatus => &[Bool],
        HeadsetCurrentAction => &[U16],
        StartAnnotation => &[U32, U32, U16],
        ClearAnnotations => &[U32, U32],
        TabletScale => &[F32],
        AddNewSelectionInput => &[U16],
        ConfirmSelection => &[],
        ToggleMapVisibility => &[U32, U32, Bool],
        ResetVolumetricSelection => &[],
        Location => &[F32, F32, F32],
        // dynamic schedules handled separately
        AnchorAnnotation | Lasso => &[],
    }
}

/// Field-schedule function consulted fresh before every field, per
/// §4.2's streaming rule. Returns `None` once the message is complete
/// (`cursor > maxCursor`).
pub fn next_field(tag: Tag, cursor: i32, parsed: &[FieldValue]) -> Option<FieldKind> {
    match tag {
        Tag::AnchorAnnotation => anchor_annotation_field(cursor, parsed),
        Tag::Lasso => lasso_field(cursor, parsed),
        _ => {
            let schedule = fixed_schedule(tag);
            schedule.get(cursor as usize).copied()
        }
    }
}

// datasetId:u32(0), sdId:u32(1), nPoints:u32(2), then 3*nPoints f32 fields.
fn anchor_annotation_field(cursor: i32, parsed: &[FieldValue]) -> Option<FieldKind> {
    match cursor {
        0 => Some(FieldKind::U32),
        1 => Some(FieldKind::U32),
        2 => Some(FieldKind::U32),
        c if c >= 3 => {
            let n_points = match parsed.get(2) {
                Some(FieldValue::U32(n)) => *n,
                _ => return None,
            };
            if (c as u32) < 3 + 3 * n_points {
                Some(FieldKind::F32)
            } else {
                None
            }
        }
        _ => None,
    }
}

// nPoints:u32(0), then 2*nPoints f32 fields (x,y pairs).
fn lasso_field(cursor: i32, parsed: &[FieldValue]) -> Option<FieldKind> {
    match cursor {
        0 => Some(FieldKind::U32),
        c if c >= 1 => {
            let n_points = match parsed.get(0) {
                Some(FieldValue::U32(n)) => *n,
                _ => return None,
            };
            if (c as u32) < 1 + 2 * n_points {
                Some(FieldKind::F32)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Fully assembled, typed inbound message — what handlers operate on.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    IdentHeadset,
    IdentTablet {
        headset_ip: String,
        tablet_id: u32,
        handedness: u32,
    },
    AddVtkDataset {
        path: String,
    },
    AddCloudPointDataset {
        path: String,
    },
    AddSubDataset {
        dataset_id: u32,
        is_public: bool,
    },
    RemoveSubDataset {
        dataset_id: u32,
        sd_id: u32,
    },
    DuplicateSubDataset {
        dataset_id: u32,
        sd_id: u32,
    },
    RenameSubDataset {
        dataset_id: u32,
        sd_id: u32,
        name: String,
    },
    MakeSubDatasetPublic {
        dataset_id: u32,
        sd_id: u32,
    },
    RotateDataset {
        dataset_id: u32,
        sd_id: u32,
        quat: [f32; 4],
    },
    TranslateDataset {
        dataset_id: u32,
        sd_id: u32,
        pos: [f32; 3],
    },
    ScaleDataset {
        dataset_id: u32,
        sd_id: u32,
        scale: [f32; 3],
    },
    SetSubDatasetClipping {
        dataset_id: u32,
        sd_id: u32,
        clip_index: u32,
        normal: [f32; 3],
        distance: f32,
        enabled: bool,
    },
    TfDataset {
        dataset_id: u32,
        sd_id: u32,
        tf_type: u16,
        params: Vec<u8>,
    },
    UpdateHeadset {
        pos: [f32; 3],
        rot: [f32; 4],
        action: u16,
        pointing_technique: u16,
        pointing_dataset_id: u32,
        pointing_sd_id: u32,
        pointing_local_pos: [f32; 3],
        pointing_start_pos: [f32; 3],
        pointing_start_rot: [f32; 4],
    },
    AnchoringDataSegment {
        data: Vec<u8>,
    },
    AnchoringDataStatus {
        ok: bool,
    },
    HeadsetCurrentAction {
        action: u16,
    },
    StartAnnotation {
        dataset_id: u32,
        sd_id: u32,
        technique: u16,
    },
    AnchorAnnotation {
        dataset_id: u32,
        sd_id: u32,
        points: Vec<[f32; 3]>,
    },
    ClearAnnotations {
        dataset_id: u32,
        sd_id: u32,
    },
    TabletScale {
        scale: f32,
    },
    Lasso {
        points: Vec<[f32; 2]>,
    },
    AddNewSelectionInput {
        method: u16,
    },
    ConfirmSelection,
    ToggleMapVisibility {
        dataset_id: u32,
        sd_id: u32,
        visible: bool,
    },
    ResetVolumetricSelection,
    Location {
        pos: [f32; 3],
    },
}

fn expect_u32(fields: &[FieldValue], i: usize) -> Result<u32, CoreError> {
    match fields.get(i) {
        Some(FieldValue::U32(v)) => Ok(*v),
        _ => Err(CoreError::Protocol(format!("expected u32 field at {i}"))),
    }
}
fn expect_u16(fields: &[FieldValue], i: usize) -> Result<u16, CoreError> {
    match fields.get(i) {
        Some(FieldValue::U16(v)) => Ok(*v),
        _ => Err(CoreError::Protocol(format!("expected u16 field at {i}"))),
    }
}
fn expect_f32(fields: &[FieldValue], i: usize) -> Result<f32, CoreError> {
    match fields.get(i) {
        Some(FieldValue::F32(v)) => Ok(*v),
        _ => Err(CoreError::Protocol(format!("expected f32 field at {i}"))),
    }
}
fn expect_bool(fields: &[FieldValue], i: usize) -> Result<bool, CoreError> {
    match fields.get(i) {
        Some(FieldValue::Bool(v)) => Ok(*v),
        _ => Err(CoreError::Protocol(format!("expected bool field at {i}"))),
    }
}
fn expect_string(fields: &[FieldValue], i: usize) -> Result<String, CoreError> {
    match fields.get(i) {
        Some(FieldValue::String(v)) => Ok(v.clone()),
        _ => Err(CoreError::Protocol(format!("expected string field at {i}"))),
    }
}
fn expect_bytes(fields: &[FieldValue], i: usize) -> Result<Vec<u8>, CoreError> {
    match fields.get(i) {
        Some(FieldValue::Bytes(v)) => Ok(v.clone()),
        _ => Err(CoreError::Protocol(format!("expected bytes field at {i}"))),
    }
}

impl Message {
    /// Build the typed message from a completed field list. The
    /// parser only calls this once `next_field` has returned `None`,
    /// so the shape always matches the tag; mismatches here would be
    /// an internal bug in the schedule tables, not bad client input.
    pub fn from_fields(tag: Tag, f: Vec<FieldValue>) -> Result<Message, CoreError> {
        use Tag::*;
        Ok(match tag {
            IdentHeadset => Message::IdentHeadset,
            IdentTablet => Message::IdentTablet {
                headset_ip: expect_string(&f, 0)?,
                tablet_id: expect_u32(&f, 1)?,
                handedness: expect_u32(&f, 2)?,
            },
            AddVtkDataset => Message::AddVtkDataset {
                path: expect_string(&f, 0)?,
            },
            AddCloudPointDataset => Message::AddCloudPointDataset {
                path: expect_string(&f, 0)?,
            },
            AddSubDataset => Message::AddSubDataset {
                dataset_id: expect_u32(&f, 0)?,
                is_public: expect_bool(&f, 1)?,
            },
            RemoveSubDataset => Message::RemoveSubDataset {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
            },
            DuplicateSubDataset => Message::DuplicateSubDataset {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
            },
            RenameSubDataset => Message::RenameSubDataset {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                name: expect_string(&f, 2)?,
            },
            MakeSubDatasetPublic => Message::MakeSubDatasetPublic {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
            },
            RotateDataset => Message::RotateDataset {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                quat: [
                    expect_f32(&f, 2)?,
                    expect_f32(&f, 3)?,
                    expect_f32(&f, 4)?,
                    expect_f32(&f, 5)?,
                ],
            },
            TranslateDataset => Message::TranslateDataset {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                pos: [expect_f32(&f, 2)?, expect_f32(&f, 3)?, expect_f32(&f, 4)?],
            },
            ScaleDataset => Message::ScaleDataset {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                scale: [expect_f32(&f, 2)?, expect_f32(&f, 3)?, expect_f32(&f, 4)?],
            },
            SetSubDatasetClipping => Message::SetSubDatasetClipping {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                clip_index: expect_u32(&f, 2)?,
                normal: [expect_f32(&f, 3)?, expect_f32(&f, 4)?, expect_f32(&f, 5)?],
                distance: expect_f32(&f, 6)?,
                enabled: expect_bool(&f, 7)?,
            },
            TfDataset => Message::TfDataset {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                tf_type: expect_u16(&f, 2)?,
                params: expect_bytes(&f, 3)?,
            },
            UpdateHeadset => Message::UpdateHeadset {
                pos: [expect_f32(&f, 0)?, expect_f32(&f, 1)?, expect_f32(&f, 2)?],
                rot: [
                    expect_f32(&f, 3)?,
                    expect_f32(&f, 4)?,
                    expect_f32(&f, 5)?,
                    expect_f32(&f, 6)?,
                ],
                action: expect_u16(&f, 7)?,
                pointing_technique: expect_u16(&f, 8)?,
                pointing_dataset_id: expect_u32(&f, 9)?,
                pointing_sd_id: expect_u32(&f, 10)?,
                pointing_local_pos: [expect_f32(&f, 11)?, expect_f32(&f, 12)?, expect_f32(&f, 13)?],
                pointing_start_pos: [expect_f32(&f, 14)?, expect_f32(&f, 15)?, expect_f32(&f, 16)?],
                pointing_start_rot: [
                    expect_f32(&f, 17)?,
                    expect_f32(&f, 18)?,
                    expect_f32(&f, 19)?,
                    expect_f32(&f, 20)?,
                ],
            },
            AnchoringDataSegment => Message::AnchoringDataSegment {
                data: expect_bytes(&f, 0)?,
            },
            AnchoringDataStatus => Message::AnchoringDataStatus {
                ok: expect_bool(&f, 0)?,
            },
            HeadsetCurrentAction => Message::HeadsetCurrentAction {
                action: expect_u16(&f, 0)?,
            },
            StartAnnotation => Message::StartAnnotation {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                technique: expect_u16(&f, 2)?,
            },
            AnchorAnnotation => {
                let dataset_id = expect_u32(&f, 0)?;
                let sd_id = expect_u32(&f, 1)?;
                let n_points = expect_u32(&f, 2)?;
                let mut points = Vec::with_capacity(n_points as usize);
                for i in 0..n_points as usize {
                    let base = 3 + i * 3;
                    points.push([
                        expect_f32(&f, base)?,
                        expect_f32(&f, base + 1)?,
                        expect_f32(&f, base + 2)?,
                    ]);
                }
                Message::AnchorAnnotation {
                    dataset_id,
                    sd_id,
                    points,
                }
            }
            ClearAnnotations => Message::ClearAnnotations {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
            },
            TabletScale => Message::TabletScale {
                scale: expect_f32(&f, 0)?,
            },
            Lasso => {
                let n_points = expect_u32(&f, 0)?;
                let mut points = Vec::with_capacity(n_points as usize);
                for i in 0..n_points as usize {
                    let base = 1 + i * 2;
                    points.push([expect_f32(&f, base)?, expect_f32(&f, base + 1)?]);
                }
                Message::Lasso { points }
            }
            AddNewSelectionInput => Message::AddNewSelectionInput {
                method: expect_u16(&f, 0)?,
            },
            ConfirmSelection => Message::ConfirmSelection,
            ToggleMapVisibility => Message::ToggleMapVisibility {
                dataset_id: expect_u32(&f, 0)?,
                sd_id: expect_u32(&f, 1)?,
                visible: expect_bool(&f, 2)?,
            },
            ResetVolumetricSelection => Message::ResetVolumetricSelection,
            Location => Message::Location {
                pos: [expect_f32(&f, 0)?, expect_f32(&f, 1)?, expect_f32(&f, 2)?],
            },
        })
    }
}
