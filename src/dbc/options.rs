//! Options for turning `.dbc` bytes into text.

use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Serialize};
use std::io;

/// Character encoding assumed for `.dbc` files read from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// UTF-8, falling back to Windows-1252 when the bytes are not valid UTF-8.
    #[default]
    Auto,
    /// Strict UTF-8; invalid bytes fail the read.
    Utf8,
    /// Windows-1252 (the encoding most DBC editors write).
    Windows1252,
}

/// Configuration for reading DBC files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub encoding: TextEncoding,
    /// Replace German umlauts, `ß` and `¿` with ASCII fallbacks after decoding.
    pub transliterate: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_transliteration(mut self, enabled: bool) -> Self {
        self.transliterate = enabled;
        self
    }

    /// Decodes raw file bytes according to these options.
    pub fn decode(&self, bytes: &[u8]) -> io::Result<String> {
        let text: String = match self.encoding {
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
                .to_owned(),
            TextEncoding::Windows1252 => WINDOWS_1252.decode(bytes).0.into_owned(),
            TextEncoding::Auto => match std::str::from_utf8(bytes) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    log::warn!("DBC content is not UTF-8, decoding as Windows-1252");
                    WINDOWS_1252.decode(bytes).0.into_owned()
                }
            },
        };
        let text: String = match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_owned(),
            None => text,
        };

        if self.transliterate {
            Ok(transliterate(&text))
        } else {
            Ok(text)
        }
    }
}

fn transliterate(src: &str) -> String {
    let mut out: String = String::with_capacity(src.len());
    for ch in src.chars() {
        match ch {
            'ü' => out.push('u'),
            'ö' => out.push('o'),
            'ä' => out.push('a'),
            'ß' => out.push_str("ss"),
            'Ü' => out.push('U'),
            'Ö' => out.push('O'),
            'Ä' => out.push('A'),
            '¿' => out.push('?'),
            _ => out.push(ch),
        }
    }
    out
}
