//! Frame codec, streaming message parser and outbound frame encoding.
//!
//! 2024: reworked from a hand-rolled tagged union + parallel clear()
//! destructor into a closed sum type (`message::Message`) plus a table
//! of per-tag field schedules (`message::next_field`) that the
//! streaming parser (`parser::Parser`) consults one field at a time.
//! The buffer underneath (`buffer::Buffer`) is a plain `Vec<u8>` with a
//! head offset — no unsafe ring buffer, no crate dependency on top of
//! the standard library for the hot path.

pub mod buffer;
pub mod message;
pub mod outbound;
pub mod parser;
