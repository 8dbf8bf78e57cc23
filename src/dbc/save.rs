use std::fmt::{self, Write as FmtWrite};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dbc::core::strings::{escape_quotes, format_f64};
use crate::dbc::types::{
    errors::DbcError,
    file::DbcFile,
    message::Message,
    signal::{MuxRole, Signal},
};

/// Serializes a `DbcFile` into DBC text and writes it to `path`.
///
/// Creates intermediate directories when needed and reports structured
/// `DbcError` variants for I/O or formatting failures.
pub fn save_to_file(path: &Path, file: &DbcFile) -> Result<(), DbcError> {
    let serialized: String = serialize_file(file)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| DbcError::Write {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let out = File::create(path).map_err(|source| DbcError::OpenFile {
        path: path.display().to_string(),
        source,
    })?;
    let mut writer = BufWriter::new(out);
    writer
        .write_all(serialized.as_bytes())
        .map_err(|source| DbcError::Write {
            path: path.display().to_string(),
            source,
        })?;
    writer.flush().map_err(|source| DbcError::Write {
        path: path.display().to_string(),
        source,
    })?;

    log::debug!(
        "Saved {} messages to {}",
        file.messages.len(),
        path.display()
    );
    Ok(())
}

/// Canonical DBC text: header, message blocks, comments, value tables.
pub(crate) fn serialize_file(file: &DbcFile) -> Result<String, DbcError> {
    let mut out = String::new();
    out.push_str(&file.header);

    write_messages(file, &mut out)?;
    write_comments(file, &mut out)?;
    write_value_tables(file, &mut out)?;

    Ok(out)
}

fn write_messages(file: &DbcFile, out: &mut String) -> Result<(), DbcError> {
    for message in file.messages.values() {
        write_fmt(
            out,
            format_args!(
                "BO_ {} {}: {} {}\n",
                message.address, message.name, message.size, message.transmitter
            ),
        )?;

        for signal in message.signals() {
            write_signal(signal, out)?;
        }
        out.push('\n');
    }
    Ok(())
}

fn write_signal(signal: &Signal, out: &mut String) -> Result<(), DbcError> {
    write_fmt(
        out,
        format_args!(
            " SG_ {} {}: {}|{}@{}{} ({},{}) [{}|{}] \"{}\" {}\n",
            signal.name,
            format_mux_tag(signal),
            signal.start_bit,
            signal.size,
            signal.endian.dbc_digit(),
            signal.sign.dbc_char(),
            format_f64(signal.factor),
            format_f64(signal.offset),
            format_f64(signal.min),
            format_f64(signal.max),
            signal.unit,
            signal.receiver_name
        ),
    )
}

fn format_mux_tag(signal: &Signal) -> String {
    match signal.mux_role {
        MuxRole::Multiplexor => "M ".to_string(),
        MuxRole::Multiplexed => format!("m{} ", signal.multiplex_value),
        MuxRole::Normal => String::new(),
    }
}

fn write_comments(file: &DbcFile, out: &mut String) -> Result<(), DbcError> {
    for message in file.messages.values() {
        if !message.comment.is_empty() {
            write_fmt(
                out,
                format_args!(
                    "CM_ BO_ {} \"{}\";\n",
                    message.address,
                    escape_quotes(&message.comment)
                ),
            )?;
        }
        write_signal_comments(message, out)?;
    }
    Ok(())
}

fn write_signal_comments(message: &Message, out: &mut String) -> Result<(), DbcError> {
    for signal in message.signals().filter(|s| !s.comment.is_empty()) {
        write_fmt(
            out,
            format_args!(
                "CM_ SG_ {} {} \"{}\";\n",
                message.address,
                signal.name,
                escape_quotes(&signal.comment)
            ),
        )?;
    }
    Ok(())
}

fn write_value_tables(file: &DbcFile, out: &mut String) -> Result<(), DbcError> {
    for message in file.messages.values() {
        for signal in message.signals().filter(|s| !s.value_table.is_empty()) {
            write_fmt(out, format_args!("VAL_ {} {}", message.address, signal.name))?;
            for (value, desc) in &signal.value_table {
                write_fmt(out, format_args!(" {} \"{}\"", value, desc))?;
            }
            out.push_str(";\n");
        }
    }
    Ok(())
}

fn write_fmt(out: &mut String, args: fmt::Arguments<'_>) -> Result<(), DbcError> {
    out.write_fmt(args).map_err(|_| DbcError::Format)
}
