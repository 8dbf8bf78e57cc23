//! # dbc_tools
//!
//! Rust utilities for parsing, editing and writing **automotive CAN** databases (`.dbc`).
//!
//! ## Highlights
//! - **DBC parser/writer**: line-oriented reader for `BO_`, `SG_`, `CM_` and `VAL_`
//!   records into a [`DbcFile`]; the header is kept verbatim and written back unchanged.
//! - **Signal decode/encode**: endian-aware bit extraction, sign extension and linear
//!   scaling ([`Signal::to_physical`]) plus the inverse path ([`Message::encode_value`]).
//! - **Multiplexing**: one multiplexor per message gates its multiplexed signals.
//! - **Stable keys**: signals live in a SlotMap arena addressed by [`SignalKey`];
//!   files in the [`Manager`] by [`FileKey`].
//! - **Source routing**: the [`Manager`] shares one file between several CAN
//!   sources and falls back to [`GLOBAL_SOURCE`] for sources without a file.
//!

pub mod dbc;

// Top-level re-exports (appear under Crate Items → Structs)
#[doc(inline)]
pub use crate::dbc::{
    DbcError, DbcEvent, DbcFile, Endianness, FileKey, GLOBAL_SOURCE, LayoutError, ListenerKey, Manager,
    Message, MessageId, ModelError, MuxRole, ParseError, ParseErrorKind, ReadOptions, Rgb, Signal,
    SignalKey, Signess, SourceId, SourceSet, TextEncoding, Theme,
};
