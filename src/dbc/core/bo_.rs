use crate::dbc::core::{ParseContext, strings::is_word};
use crate::dbc::types::{errors::ParseErrorKind, message::Message};

/// Decode a `BO_` line and make it the **current message**.
/// Format:
/// BO_ <address> <name>: <size> <transmitter>
///
/// The message is stored without running its recompute pass; the parser does
/// that once every record has been read.
pub(crate) fn decode(ctx: &mut ParseContext, line: &str) -> Result<(), ParseErrorKind> {
    let rest: &str = line
        .strip_prefix("BO_")
        .ok_or(ParseErrorKind::InvalidSyntax)?
        .trim_start();

    let (address_tok, rest) = rest
        .split_once(char::is_whitespace)
        .ok_or(ParseErrorKind::InvalidSyntax)?;
    if !address_tok.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseErrorKind::InvalidSyntax);
    }
    let address: u32 = address_tok
        .parse()
        .map_err(|_| ParseErrorKind::InvalidSyntax)?;

    // "<name>:" or "<name> :"
    let (name, after) = rest.split_once(':').ok_or(ParseErrorKind::InvalidSyntax)?;
    let name: &str = name.trim();
    if !is_word(name) {
        return Err(ParseErrorKind::InvalidSyntax);
    }

    let mut it = after.split_ascii_whitespace();
    let size: u32 = it
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(ParseErrorKind::InvalidSyntax)?;
    let transmitter: &str = it.next().unwrap_or("").trim_end_matches(';');

    if ctx.file.messages.contains_key(&address) {
        return Err(ParseErrorKind::DuplicateAddress);
    }

    ctx.file.messages.insert(
        address,
        Message {
            address,
            name: name.to_string(),
            size,
            transmitter: transmitter.to_string(),
            ..Default::default()
        },
    );
    ctx.current_msg = Some(address);
    ctx.multiplexor_cnt = 0;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::file::DbcFile;

    #[test]
    fn test_decode_bo() {
        let mut file = DbcFile::default();
        let mut ctx = ParseContext::new(&mut file);
        decode(&mut ctx, "BO_ 100 ENGINE_DATA: 8 ECU").unwrap();
        decode(&mut ctx, "BO_ 2364540158 EEC1 : 8 Vector__XXX").unwrap();
        assert_eq!(ctx.current_msg, Some(2364540158));

        let msg = &file.messages[&100];
        assert_eq!(msg.name, "ENGINE_DATA");
        assert_eq!(msg.size, 8);
        assert_eq!(msg.transmitter, "ECU");
        assert_eq!(file.messages[&2364540158].name, "EEC1");
    }

    #[test]
    fn test_decode_bo_errors() {
        let mut file = DbcFile::default();
        let mut ctx = ParseContext::new(&mut file);
        decode(&mut ctx, "BO_ 100 A: 8 ECU").unwrap();
        assert_eq!(
            decode(&mut ctx, "BO_ 100 B: 8 ECU"),
            Err(ParseErrorKind::DuplicateAddress)
        );
        assert_eq!(
            decode(&mut ctx, "BO_ x100 B: 8 ECU"),
            Err(ParseErrorKind::InvalidSyntax)
        );
        assert_eq!(decode(&mut ctx, "BO_ 101 B 8 ECU"), Err(ParseErrorKind::InvalidSyntax));
        assert_eq!(decode(&mut ctx, "BO_ 101 B:"), Err(ParseErrorKind::InvalidSyntax));
    }
}
