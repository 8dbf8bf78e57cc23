use crate::dbc::core::{ParseContext, strings::is_word};
use crate::dbc::types::signal::ValueTable;

/// Decode a `VAL_` line and replace the signal's value table.
/// Format:
/// VAL_ <address> <signal> <value> "<text>" <value> "<text>" ... ;
///
/// Unknown messages or signals are skipped.
pub(crate) fn decode(ctx: &mut ParseContext, line: &str) {
    let Some(rest) = line.strip_prefix("VAL_") else {
        return;
    };
    let rest: &str = rest.trim_start();
    let Some((address_tok, rest)) = rest.split_once(char::is_whitespace) else {
        return;
    };
    let Ok(address) = address_tok.parse::<u32>() else {
        return;
    };

    let rest: &str = rest.trim_start();
    let name_end: usize = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (name, pairs) = rest.split_at(name_end);
    if !is_word(name) {
        return;
    }

    let table: ValueTable = parse_pairs(pairs);

    let Some(sig) = ctx
        .file
        .messages
        .get_mut(&address)
        .and_then(|msg| msg.sig_mut(name))
    else {
        log::warn!("Value table for unknown signal {name} in message {address} ignored");
        return;
    };
    sig.value_table = table;
}

// `<int> "<text>"` pairs until the first token that does not fit.
fn parse_pairs(mut rest: &str) -> ValueTable {
    let mut table: ValueTable = ValueTable::new();
    loop {
        rest = rest.trim_start();
        let num_end: usize = rest
            .find(|c: char| c.is_whitespace() || c == '"')
            .unwrap_or(rest.len());
        let Ok(value) = rest[..num_end].parse::<i64>() else {
            break;
        };
        let Some(quoted) = rest[num_end..].trim_start().strip_prefix('"') else {
            break;
        };
        let Some(close) = quoted.find('"') else {
            break;
        };
        table.push((value, quoted[..close].to_string()));
        rest = &quoted[close + 1..];
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::core::{bo_, sg_};
    use crate::dbc::types::file::DbcFile;

    #[test]
    fn test_value_table_replaces_previous() {
        let mut file = DbcFile::default();
        let mut ctx = ParseContext::new(&mut file);
        bo_::decode(&mut ctx, "BO_ 100 ENGINE: 8 ECU").unwrap();
        sg_::decode(&mut ctx, r#"SG_ STATE : 0|2@1+ (1,0) [0|3] "" X"#).unwrap();

        decode(&mut ctx, r#"VAL_ 100 STATE 9 "old";"#);
        decode(&mut ctx, r#"VAL_ 100 STATE 0 "Off" 1 "On" -1 "Error state" ;"#);
        decode(&mut ctx, r#"VAL_ 100 MISSING 0 "x";"#);
        decode(&mut ctx, r#"VAL_ 7 STATE 0 "x";"#);

        let sig = file.messages[&100].sig("STATE").unwrap();
        assert_eq!(
            sig.value_table,
            vec![
                (0, "Off".to_string()),
                (1, "On".to_string()),
                (-1, "Error state".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_pairs_stops_at_garbage() {
        assert_eq!(parse_pairs(r#" 1 "a" 2"b" x "c""#), vec![(1, "a".into()), (2, "b".into())]);
        assert!(parse_pairs(";").is_empty());
    }
}
