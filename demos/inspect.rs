//! Prints the messages of a DBC file and, optionally, decodes one payload.
//!
//! Usage:
//!   cargo run --example inspect -- <file.dbc> [<address> <hex payload>]
//!
//! Example:
//!   RUST_LOG=debug cargo run --example inspect -- powertrain.dbc 100 1000000000000000

use dbc_tools::{GLOBAL_SOURCE, Manager, MessageId, ReadOptions, SourceSet, TextEncoding};
use std::env;

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    if !text.is_ascii() || text.len() % 2 != 0 {
        return None;
    }
    text.as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair: &str = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("Usage: inspect <file.dbc> [<address> <hex payload>]");
        std::process::exit(1);
    };

    let options = ReadOptions::new()
        .with_encoding(TextEncoding::Auto)
        .with_transliteration(true);
    let mut manager = Manager::with_options(options);
    let sources: SourceSet = [GLOBAL_SOURCE].into_iter().collect();
    if let Err(e) = manager.open_file(&sources, path) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    for msg in manager.messages(0) {
        println!(
            "BO_ {} {} ({} bytes, tx {})",
            msg.address, msg.name, msg.size, msg.transmitter
        );
        for sig in msg.signals() {
            println!(
                "\t{} {}|{} {:?} {:?} x{} +{} [{}..{}] {}",
                sig.name,
                sig.start_bit,
                sig.size,
                sig.endian,
                sig.mux_role,
                sig.factor,
                sig.offset,
                sig.min,
                sig.max,
                sig.unit
            );
        }
        for (sig, err) in msg.out_of_bounds_signals() {
            println!("\t! {}: {}", sig.name, err);
        }
        for sig in msg.overlapping_signals() {
            println!("\t! {} overlaps another signal", sig.name);
        }
    }

    let (Some(address), Some(payload)) = (args.get(2), args.get(3)) else {
        return;
    };
    let Ok(address) = address.parse::<u32>() else {
        eprintln!("Invalid address: {address}");
        std::process::exit(1);
    };
    let Some(data) = parse_hex(payload) else {
        eprintln!("Invalid hex payload: {payload}");
        std::process::exit(1);
    };

    match manager.msg(MessageId::new(0, address)) {
        Some(msg) => {
            println!("\n{} [{}]", msg.name, payload);
            for (key, sig) in msg.iter_signals() {
                if let Some(value) = msg.value(key, &data) {
                    println!("\t{} = {}", sig.name, sig.format_value(value, true));
                }
            }
        }
        None => eprintln!("Message {address} not found"),
    }
}
