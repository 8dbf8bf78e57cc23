use crate::dbc::core::{
    ParseContext,
    strings::{is_word, outer_quotes, unescape_quotes},
};

/// Decode a (possibly multi-line) `CM_ BO_` / `CM_ SG_` record.
/// Format:
/// CM_ BO_ <address> "<text>";
/// CM_ SG_ <address> <signal> "<text>";
///
/// Escaped quotes inside the text are unescaped and the text is trimmed.
/// Malformed records and unknown targets are skipped.
pub(crate) fn decode(ctx: &mut ParseContext, record: &str) {
    let Some(body) = record.strip_prefix("CM_") else {
        return;
    };
    let body: &str = body.trim_start();
    let Some((kind, rest)) = body.split_once(char::is_whitespace) else {
        return;
    };
    let rest: &str = rest.trim_start();
    let Some((address_tok, rest)) = rest.split_once(char::is_whitespace) else {
        return;
    };
    let Ok(address) = address_tok.parse::<u32>() else {
        return;
    };

    let Some((open, close)) = outer_quotes(rest) else {
        return;
    };
    if rest[close + 1..].trim() != ";" {
        return;
    }
    let target: &str = rest[..open].trim();
    let text: String = unescape_quotes(&rest[open + 1..close]).trim().to_string();

    let Some(msg) = ctx.file.messages.get_mut(&address) else {
        log::warn!("Comment for unknown message {address} ignored");
        return;
    };

    match kind {
        "BO_" => msg.comment = text,
        "SG_" => {
            if !is_word(target) {
                return;
            }
            match msg.sig_mut(target) {
                Some(sig) => sig.comment = text,
                None => log::warn!("Comment for unknown signal {target} in message {address} ignored"),
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::core::{bo_, sg_};
    use crate::dbc::types::file::DbcFile;

    fn file_with_message() -> DbcFile {
        let mut file = DbcFile::default();
        let mut ctx = ParseContext::new(&mut file);
        bo_::decode(&mut ctx, "BO_ 100 ENGINE: 8 ECU").unwrap();
        sg_::decode(&mut ctx, r#"SG_ RPM : 0|16@1+ (1,0) [0|0] "" X"#).unwrap();
        file
    }

    #[test]
    fn test_message_and_signal_comments() {
        let mut file = file_with_message();
        let mut ctx = ParseContext::new(&mut file);
        decode(&mut ctx, r#"CM_ BO_ 100 "Engine frame";"#);
        decode(&mut ctx, "CM_ SG_ 100 RPM \"Engine \\\"speed\\\"\nsecond line \";");

        let msg = &file.messages[&100];
        assert_eq!(msg.comment, "Engine frame");
        assert_eq!(msg.sig("RPM").unwrap().comment, "Engine \"speed\"\nsecond line");
    }

    #[test]
    fn test_unknown_targets_are_ignored() {
        let mut file = file_with_message();
        let mut ctx = ParseContext::new(&mut file);
        decode(&mut ctx, r#"CM_ BO_ 999 "nobody";"#);
        decode(&mut ctx, r#"CM_ SG_ 100 NOPE "nobody";"#);
        decode(&mut ctx, r#"CM_ BO_ 100 "unterminated""#);
        assert_eq!(file.messages[&100].comment, "");
        assert_eq!(file.messages.len(), 1);
    }
}
