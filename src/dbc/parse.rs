use std::fs;
use std::path::Path;

use crate::dbc::core::{self, ParseContext, strings::is_terminated_record};
use crate::dbc::options::ReadOptions;
use crate::dbc::types::{
    errors::{DbcError, ParseError, ParseErrorKind},
    file::DbcFile,
};

/// Record kinds recognized by the parser; everything else is header or dropped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Record {
    Message,
    Signal,
    Comment,
    ValueTable,
}

fn classify(line: &str) -> Option<Record> {
    if line.starts_with("BO_ ") {
        Some(Record::Message)
    } else if line.starts_with("SG_ ") {
        Some(Record::Signal)
    } else if line.starts_with("CM_ BO_") || line.starts_with("CM_ SG_") {
        Some(Record::Comment)
    } else if line.starts_with("VAL_ ") {
        Some(Record::ValueTable)
    } else {
        None
    }
}

/// Reads a `.dbc` file from disk and parses it into a [`DbcFile`].
///
/// Bytes are decoded according to `options` (UTF-8 with a Windows-1252
/// fallback by default). The returned file records `path` as its `filename`
/// and the file stem as its `name`.
///
/// # Errors
/// - [`DbcError::OpenFile`] / [`DbcError::Read`] when the file cannot be read
///   or decoded.
/// - [`DbcError::Parse`] on the first malformed record; no partial file is returned.
pub fn from_file(path: &Path, options: &ReadOptions) -> Result<DbcFile, DbcError> {
    let path_str: String = path.display().to_string();
    let bytes: Vec<u8> = fs::read(path).map_err(|source| DbcError::OpenFile {
        path: path_str.clone(),
        source,
    })?;
    let content: String = options.decode(&bytes).map_err(|source| DbcError::Read {
        path: path_str.clone(),
        source,
    })?;

    let name: String = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut file: DbcFile = DbcFile {
        name,
        filename: path_str,
        ..Default::default()
    };
    parse_into(&mut file, &content)?;
    Ok(file)
}

/// Parses in-memory DBC text. The result has an empty `filename`.
pub fn from_str(name: &str, content: &str) -> Result<DbcFile, ParseError> {
    let mut file: DbcFile = DbcFile::new(name);
    parse_into(&mut file, content)?;
    Ok(file)
}

/// Line-oriented parse of `content` into `file`.
///
/// `CM_ BO_`/`CM_ SG_` records continue over physical lines until the first
/// line ending with `;`. Lines before the first recognized record are
/// kept in `file.header`; later unrecognized lines are dropped. Every message
/// runs its recompute pass once all records are read.
pub(crate) fn parse_into(file: &mut DbcFile, content: &str) -> Result<(), ParseError> {
    let filename: String = file.filename.clone();
    let lines: Vec<&str> = content.lines().collect();

    let mut ctx: ParseContext = ParseContext::new(file);
    let mut seen_record: bool = false;
    let mut header: String = String::new();
    let mut i: usize = 0;

    while i < lines.len() {
        let line_number: usize = i + 1;
        let raw_line: &str = lines[i];
        let line: &str = raw_line.trim();

        let Some(kind) = classify(line) else {
            if !seen_record {
                header.push_str(raw_line);
                header.push('\n');
            }
            i += 1;
            continue;
        };
        seen_record = true;

        let mut record: String = line.to_string();
        if kind == Record::Comment {
            while !is_terminated_record(&record) && i + 1 < lines.len() {
                i += 1;
                record.push('\n');
                record.push_str(lines[i].trim_end());
            }
        }

        let result: Result<(), ParseErrorKind> = match kind {
            Record::Message => core::bo_::decode(&mut ctx, &record),
            Record::Signal => core::sg_::decode(&mut ctx, &record),
            Record::Comment => {
                core::cm_::decode(&mut ctx, &record);
                Ok(())
            }
            Record::ValueTable => {
                core::val_::decode(&mut ctx, &record);
                Ok(())
            }
        };
        if let Err(err_kind) = result {
            return Err(ParseError {
                kind: err_kind,
                line_number,
                line: record,
                filename,
            });
        }
        i += 1;
    }

    ctx.file.header = header;
    for msg in ctx.file.messages.values_mut() {
        msg.update();
    }

    log::debug!(
        "Parsed {} messages from '{}'",
        ctx.file.messages.len(),
        if filename.is_empty() { &ctx.file.name } else { &filename }
    );
    Ok(())
}
