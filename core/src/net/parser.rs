//! Per-connection streaming message parser (§4.2). An explicit state
//! object, not a resumable coroutine: `cursor` plus the in-progress
//! field buffer can be checkpointed, constructed directly in a test,
//! and fed arbitrary byte splits.

use byteorder::{BigEndian, ByteOrder};

use crate::error::CoreError;
use crate::net::message::{next_field, FieldKind, FieldValue, Message, Tag};

/// Declared-length fields larger than this are rejected outright —
/// `OversizedField`, folded into `ProtocolError` per §4.1.
const MAX_FIELD_LEN: usize = 1024 * 1024 * 1024;

#[derive(Debug)]
struct Accum {
    need: usize,
    buf: Vec<u8>,
}

impl Accum {
    fn new(need: usize) -> Self {
        Accum {
            need,
            buf: Vec::with_capacity(need.min(4096)),
        }
    }

    /// Consumes as much of `input` as needed, advancing the slice.
    /// Returns true once `need` bytes have been accumulated.
    fn feed(&mut self, input: &mut &[u8]) -> bool {
        let take = (self.need - self.buf.len()).min(input.len());
        self.buf.extend_from_slice(&input[..take]);
        *input = &input[take..];
        self.buf.len() == self.need
    }
}

#[derive(Debug)]
enum Stage {
    /// Waiting for the next 2-byte type tag.
    Tag(Accum),
    /// Reading a fixed-size field body (u16/u32/f32/bool).
    FixedBody(FieldKind, Accum),
    /// Reading the 4-byte length prefix of a string/bytes field.
    LenPrefix(FieldKind, Accum),
    /// Reading a length-prefixed field body.
    VarBody(FieldKind, Accum),
}

fn size_of(kind: FieldKind) -> usize {
    match kind {
        FieldKind::U16 => 2,
        FieldKind::U32 => 4,
        FieldKind::F32 => 4,
        FieldKind::Bool => 1,
        FieldKind::String | FieldKind::Bytes => unreachable!("variable-length kind"),
    }
}

fn decode_fixed(kind: FieldKind, buf: &[u8]) -> FieldValue {
    match kind {
        FieldKind::U16 => FieldValue::U16(BigEndian::read_u16(buf)),
        FieldKind::U32 => FieldValue::U32(BigEndian::read_u32(buf)),
        FieldKind::F32 => FieldValue::F32(BigEndian::read_f32(buf)),
        FieldKind::Bool => FieldValue::Bool(buf[0] != 0),
        FieldKind::String | FieldKind::Bytes => unreachable!("variable-length kind"),
    }
}

fn decode_var(kind: FieldKind, buf: Vec<u8>) -> Result<FieldValue, CoreError> {
    match kind {
        FieldKind::String => {
            String::from_utf8(buf).map(FieldValue::String).map_err(|_| {
                CoreError::Protocol("string field is not valid utf-8".to_string())
            })
        }
        FieldKind::Bytes => Ok(FieldValue::Bytes(buf)),
        _ => unreachable!("fixed-size kind"),
    }
}

/// Per-connection parser state. `cursor == -1` means "waiting for the
/// next tag", matching §4.2 exactly.
pub struct Parser {
    cursor: i32,
    tag: Option<Tag>,
    parsed: Vec<FieldValue>,
    stage: Stage,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            cursor: -1,
            tag: None,
            parsed: Vec::new(),
            stage: Stage::Tag(Accum::new(2)),
        }
    }

    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    fn stage_for(tag: Tag, cursor: i32, parsed: &[FieldValue]) -> Option<Stage> {
        let kind = next_field(tag, cursor, parsed)?;
        Some(match kind {
            FieldKind::String | FieldKind::Bytes => Stage::LenPrefix(kind, Accum::new(4)),
            fixed => Stage::FixedBody(fixed, Accum::new(size_of(fixed))),
        })
    }

    /// Feed newly arrived bytes. Returns every whole message completed
    /// by this call, in order. Consumes all of `input`.
    pub fn feed(&mut self, mut input: &[u8]) -> Result<Vec<Message>, CoreError> {
        let mut out = Vec::new();
        while !input.is_empty() {
            let stage = std::mem::replace(&mut self.stage, Stage::Tag(Accum::new(2)));
            match stage {
                Stage::Tag(mut accum) => {
                    if accum.feed(&mut input) {
                        let tag_val = BigEndian::read_u16(&accum.buf);
                        let tag = Tag::from_u16(tag_val)
                            .ok_or_else(|| CoreError::Protocol(format!("unknown tag {tag_val}")))?;
                        self.tag = Some(tag);
                        self.parsed.clear();
                        self.cursor = 0;
                        self.stage = match Self::stage_for(tag, 0, &self.parsed) {
                            Some(s) => s,
                            None => {
                                out.push(self.finish()?);
                                Stage::Tag(Accum::new(2))
                            }
                        };
                    } else {
                        self.stage = Stage::Tag(accum);
                    }
                }
                Stage::FixedBody(kind, mut accum) => {
                    if accum.feed(&mut input) {
                        self.parsed.push(decode_fixed(kind, &accum.buf));
                        self.cursor += 1;
                        self.advance(&mut out)?;
                    } else {
                        self.stage = Stage::FixedBody(kind, accum);
                    }
                }
                Stage::LenPrefix(kind, mut accum) => {
                    if accum.feed(&mut input) {
                        let len = BigEndian::read_u32(&accum.buf) as usize;
                        if len > MAX_FIELD_LEN {
                            return Err(CoreError::Protocol(format!(
                                "oversized field: {len} bytes"
                            )));
                        }
                        self.stage = Stage::VarBody(kind, Accum::new(len));
                    } else {
                        self.stage = Stage::LenPrefix(kind, accum);
                    }
                }
                Stage::VarBody(kind, mut accum) => {
                    if accum.feed(&mut input) {
                        self.parsed.push(decode_var(kind, accum.buf)?);
                        self.cursor += 1;
                        self.advance(&mut out)?;
                    } else {
                        self.stage = Stage::VarBody(kind, accum);
                    }
                }
            }
        }
        Ok(out)
    }

    /// After a field completes: either start the next field or, if the
    /// schedule says we're done, finish the message and reset.
    fn advance(&mut self, out: &mut Vec<Message>) -> Result<(), CoreError> {
        let tag = self.tag.expect("cursor advanced without a tag");
        match Self::stage_for(tag, self.cursor, &self.parsed) {
            Some(stage) => self.stage = stage,
            None => {
                out.push(self.finish()?);
                self.stage = Stage::Tag(Accum::new(2));
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Message, CoreError> {
        let tag = self.tag.take().expect("finish without a tag");
        let fields = std::mem::take(&mut self.parsed);
        self.cursor = -1;
        Message::from_fields(tag, fields)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn encode_remove_sub_dataset(dataset_id: u32, sd_id: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(Tag::RemoveSubDataset as u16).unwrap();
        buf.write_u32::<BigEndian>(dataset_id).unwrap();
        buf.write_u32::<BigEndian>(sd_id).unwrap();
        buf
    }

    #[test]
    fn test_single_chunk_parses_whole_message() {
        let bytes = encode_remove_sub_dataset(3, 4);
        let mut parser = Parser::new();
        let messages = parser.feed(&bytes).unwrap();
        assert_eq!(
            messages,
            vec![Message::RemoveSubDataset {
                dataset_id: 3,
                sd_id: 4
            }]
        );
        assert_eq!(parser.cursor(), -1);
    }

    #[test]
    fn test_streaming_equivalence_every_byte_boundary() {
        let bytes = encode_remove_sub_dataset(9, 10);
        for split in 0..=bytes.len() {
            let mut parser = Parser::new();
            let mut messages = parser.feed(&bytes[..split]).unwrap();
            messages.extend(parser.feed(&bytes[split..]).unwrap());
            assert_eq!(
                messages,
                vec![Message::RemoveSubDataset {
                    dataset_id: 9,
                    sd_id: 10
                }],
                "split at {split} produced different result"
            );
        }
    }

    #[test]
    fn test_byte_at_a_time_streaming() {
        let bytes = encode_remove_sub_dataset(1, 2);
        let mut parser = Parser::new();
        let mut messages = Vec::new();
        for b in &bytes {
            messages.extend(parser.feed(std::slice::from_ref(b)).unwrap());
        }
        assert_eq!(
            messages,
            vec![Message::RemoveSubDataset { dataset_id: 1, sd_id: 2 }]
        );
    }

    #[test]
    fn test_string_field_roundtrip() {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(Tag::AddVtkDataset as u16).unwrap();
        let path = b"/datasets/a.vtk";
        buf.write_u32::<BigEndian>(path.len() as u32).unwrap();
        buf.write_all(path).unwrap();

        let mut parser = Parser::new();
        let messages = parser.feed(&buf).unwrap();
        assert_eq!(
            messages,
            vec![Message::AddVtkDataset {
                path: "/datasets/a.vtk".to_string()
            }]
        );
    }

    #[test]
    fn test_unknown_tag_is_protocol_error() {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(9999).unwrap();
        let mut parser = Parser::new();
        assert!(parser.feed(&buf).is_err());
    }

    #[test]
    fn test_oversized_field_rejected() {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(Tag::AddVtkDataset as u16).unwrap();
        buf.write_u32::<BigEndian>(u32::MAX).unwrap();
        let mut parser = Parser::new();
        assert!(parser.feed(&buf).is_err());
    }

    #[test]
    fn test_dynamic_schedule_lasso_two_points() {
        let mut buf = Vec::new();
        buf.write_u16::<BigEndian>(Tag::Lasso as u16).unwrap();
        buf.write_u32::<BigEndian>(2).unwrap();
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            buf.write_f32::<BigEndian>(v).unwrap();
        }
        let mut parser = Parser::new();
        let messages = parser.feed(&buf).unwrap();
        assert_eq!(
            messages,
            vec![Message::Lasso {
                points: vec![[1.0, 2.0], [3.0, 4.0]]
            }]
        );
    }

    #[test]
    fn test_two_messages_back_to_back_in_one_chunk() {
        let mut bytes = encode_remove_sub_dataset(1, 1);
        bytes.extend(encode_remove_sub_dataset(2, 2));
        let mut parser = Parser::new();
        let messages = parser.feed(&bytes).unwrap();
        assert_eq!(
            messages,
            vec![
                Message::RemoveSubDataset { dataset_id: 1, sd_id: 1 },
                Message::RemoveSubDataset { dataset_id: 2, sd_id: 2 },
            ]
        );
    }
}
