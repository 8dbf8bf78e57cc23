pub mod bit_layout;
pub(crate) mod bo_;
pub(crate) mod cm_;
pub(crate) mod sg_;
pub(crate) mod strings;
pub(crate) mod val_;

use crate::dbc::types::file::DbcFile;

/// State shared by the record decoders while one document is parsed.
pub(crate) struct ParseContext<'a> {
    pub file: &'a mut DbcFile,
    /// Address of the last `BO_` record; `SG_` records attach to it.
    pub current_msg: Option<u32>,
    /// Multiplexor signals seen in the current message.
    pub multiplexor_cnt: u32,
}

impl<'a> ParseContext<'a> {
    pub fn new(file: &'a mut DbcFile) -> Self {
        ParseContext {
            file,
            current_msg: None,
            multiplexor_cnt: 0,
        }
    }
}
