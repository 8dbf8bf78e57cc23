use crate::dbc::core::{
    ParseContext,
    strings::{is_word, parse_dbc_f64},
};
use crate::dbc::types::{
    errors::ParseErrorKind,
    signal::{Endianness, MuxRole, Signal, Signess},
};

/// Decode a `SG_` line belonging to the **current message** (the last parsed BO_).
/// Format:
/// SG_ <name> [M|mX]: <start>|<size>@<endian><sign> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers>
pub(crate) fn decode(ctx: &mut ParseContext, line: &str) -> Result<(), ParseErrorKind> {
    let Some(address) = ctx.current_msg else {
        return Err(ParseErrorKind::NoCurrentMessage);
    };

    let sig: Signal = parse_signal(line)?;

    let msg = ctx
        .file
        .messages
        .get_mut(&address)
        .ok_or(ParseErrorKind::NoCurrentMessage)?;
    if msg.sig(&sig.name).is_some() {
        return Err(ParseErrorKind::DuplicateSignalName);
    }
    if sig.mux_role == MuxRole::Multiplexor {
        ctx.multiplexor_cnt += 1;
        if ctx.multiplexor_cnt >= 2 {
            return Err(ParseErrorKind::MultipleMultiplexors);
        }
    }

    msg.push_signal(sig);
    Ok(())
}

pub(crate) fn parse_signal(line: &str) -> Result<Signal, ParseErrorKind> {
    const ERR: ParseErrorKind = ParseErrorKind::InvalidSyntax;

    let body: &str = line.strip_prefix("SG_").ok_or(ERR)?;
    let (left, right) = body.split_once(':').ok_or(ERR)?;

    // Left part analysis: NAME [M|mX]
    let mut left_it = left.split_ascii_whitespace();
    let name: &str = left_it.next().filter(|n| is_word(n)).ok_or(ERR)?;
    let tag: Option<&str> = left_it.next();
    if left_it.next().is_some() {
        return Err(ERR);
    }
    let (mux_role, multiplex_value) = match tag {
        None => (MuxRole::Normal, 0),
        Some("M") => (MuxRole::Multiplexor, 0),
        // extended tags such as "m1M" fall back to selector 0
        Some(tag) => match tag.strip_prefix('m') {
            Some(value) => (MuxRole::Multiplexed, value.parse::<u32>().unwrap_or(0)),
            None => return Err(ERR),
        },
    };

    // 1) bit info: "63|1@1+"
    let right: &str = right.trim_start();
    let (bit_info, rest) = right.split_once(char::is_whitespace).ok_or(ERR)?;
    let (pos_len, es) = bit_info.split_once('@').ok_or(ERR)?;
    let (start, size) = pos_len.split_once('|').ok_or(ERR)?;
    let start_bit: u16 = parse_digits(start).ok_or(ERR)?;
    let size: u16 = parse_digits(size).ok_or(ERR)?;
    let mut es_chars = es.chars();
    let endian: Endianness = match es_chars.next() {
        Some('1') => Endianness::Intel,
        Some('0') => Endianness::Motorola,
        _ => return Err(ERR),
    };
    let sign: Signess = match es_chars.next() {
        Some('+') => Signess::Unsigned,
        Some('-') => Signess::Signed,
        _ => return Err(ERR),
    };
    if es_chars.next().is_some() {
        return Err(ERR);
    }

    // 2) factor/offset: "(0.25,0)"
    let rest: &str = rest.trim_start().strip_prefix('(').ok_or(ERR)?;
    let (scale, rest) = rest.split_once(')').ok_or(ERR)?;
    let (factor, offset) = scale.split_once(',').ok_or(ERR)?;
    let factor: f64 = parse_dbc_f64(factor).ok_or(ERR)?;
    let offset: f64 = parse_dbc_f64(offset).ok_or(ERR)?;

    // 3) range: "[0|16383.75]"
    let rest: &str = rest.trim_start().strip_prefix('[').ok_or(ERR)?;
    let (range, rest) = rest.split_once(']').ok_or(ERR)?;
    let (min, max) = range.split_once('|').ok_or(ERR)?;
    let min: f64 = parse_dbc_f64(min).ok_or(ERR)?;
    let max: f64 = parse_dbc_f64(max).ok_or(ERR)?;

    // 4) unit runs to the last quote, receivers follow
    let rest: &str = rest.trim_start().strip_prefix('"').ok_or(ERR)?;
    let close: usize = rest.rfind('"').ok_or(ERR)?;
    let unit: &str = &rest[..close];
    let receiver_name: &str = rest[close + 1..].trim();

    Ok(Signal {
        name: name.to_string(),
        start_bit,
        size,
        endian,
        sign,
        factor,
        offset,
        min,
        max,
        unit: unit.to_string(),
        receiver_name: receiver_name.to_string(),
        mux_role,
        multiplex_value,
        ..Default::default()
    })
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
