use std::io;
use thiserror::Error;

use crate::dbc::types::message_id::{MessageId, SourceId};

/// What went wrong on the offending line of a `.dbc` document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("Invalid record format")]
    InvalidSyntax,
    #[error("Signal defined before any message")]
    NoCurrentMessage,
    #[error("Duplicate message address")]
    DuplicateAddress,
    #[error("Duplicate signal name")]
    DuplicateSignalName,
    #[error("Multiple multiplexor")]
    MultipleMultiplexors,
}

/// Fatal error raised while parsing DBC text. The whole parse is aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{filename}:{line_number}]{kind}: {line}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based number of the first physical line of the record.
    pub line_number: usize,
    /// Trimmed text of the offending record.
    pub line: String,
    /// Filename of the document being parsed (empty for in-memory content).
    pub filename: String,
}

/// Errors produced while loading or saving `.dbc` files.
#[derive(Debug, Error)]
pub enum DbcError {
    #[error("Failed to open '{path}'. \nError: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed while reading '{path}'. \nError: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed while writing '{path}'. \nError: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to format DBC content")]
    Format,
    #[error("DBC file '{name}' has no filename to save to")]
    NoFilename { name: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors returned by programmatic edits of messages, files and the manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Signal '{signal}' already exists in message '{message}'")]
    DuplicateSignalName { message: String, signal: String },
    #[error("Message address {address} already assigned to an existing message")]
    DuplicateAddress { address: u32 },
    #[error("Message '{message}' already has a multiplexor signal")]
    MultipleMultiplexors { message: String },
    #[error("Message {id} not found")]
    MessageMissing { id: MessageId },
    #[error("Signal '{signal}' not found in message {id}")]
    SignalMissing { id: MessageId, signal: String },
    #[error("No DBC file is open for source {source_id}")]
    NoFileForSource { source_id: SourceId },
}

impl ModelError {
    /// The parse-time kind matching this structural violation, if any.
    pub fn kind(&self) -> Option<ParseErrorKind> {
        match self {
            ModelError::DuplicateSignalName { .. } => Some(ParseErrorKind::DuplicateSignalName),
            ModelError::DuplicateAddress { .. } => Some(ParseErrorKind::DuplicateAddress),
            ModelError::MultipleMultiplexors { .. } => Some(ParseErrorKind::MultipleMultiplexors),
            _ => None,
        }
    }
}

/// Errors produced while verifying that a signal fits a CAN frame layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Signal Bit Length cannot be zero")]
    ZeroBitLength,
    #[error(
        "Out of bounds (Intel)! \nSignal end bit = {end} \nMessage total bits = {total_bits} (bytes={bytes})"
    )]
    IntelOutOfBounds {
        end: usize,
        total_bits: usize,
        bytes: u32,
    },
    #[error(
        "Out of bounds (Motorola)! \nSignal start bit = {start} \nMessage total bits = {total_bits} (bytes={bytes})"
    )]
    MotorolaStartOutOfBounds {
        start: usize,
        total_bits: usize,
        bytes: u32,
    },
    #[error(
        "Out of bounds (Motorola)! \nSignal flipped end bit = {end} \nMessage total bits = {total_bits} (bytes={bytes})"
    )]
    MotorolaEndOutOfBounds {
        end: usize,
        total_bits: usize,
        bytes: u32,
    },
}
