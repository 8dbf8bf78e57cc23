use std::collections::BTreeMap;
use std::path::Path;

use crate::dbc::options::ReadOptions;
use crate::dbc::types::{
    errors::{DbcError, ModelError, ParseError},
    message::Message,
    signal::Signal,
};
use crate::dbc::{parse, save};

/// One DBC document: messages ordered by address, the preserved header and the
/// file it was loaded from.
///
/// The `header` holds every line preceding the first recognized record and is
/// written back unchanged. An empty `filename` marks in-memory content.
#[derive(Default, Clone, Debug)]
pub struct DbcFile {
    /// Display name (file stem for files read from disk).
    pub name: String,
    /// Path the file was read from / is saved to.
    pub filename: String,
    /// Verbatim preamble, one `\n`-terminated line per entry.
    pub header: String,

    pub(crate) messages: BTreeMap<u32, Message>,
}

impl DbcFile {
    /// Empty in-memory file.
    pub fn new(name: &str) -> Self {
        DbcFile {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Reads and parses a `.dbc` file from disk.
    pub fn open<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self, DbcError> {
        parse::from_file(path.as_ref(), options)
    }

    /// Parses in-memory DBC text.
    pub fn from_content(name: &str, content: &str) -> Result<Self, ParseError> {
        parse::from_str(name, content)
    }

    /// Writes the file back to `filename`.
    pub fn save(&self) -> Result<(), DbcError> {
        if self.filename.is_empty() {
            return Err(DbcError::NoFilename {
                name: self.name.clone(),
            });
        }
        save::save_to_file(Path::new(&self.filename), self)
    }

    /// Sets `filename` to `path`, then saves.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<(), DbcError> {
        self.filename = path.as_ref().display().to_string();
        self.save()
    }

    /// Canonical DBC text of this file.
    pub fn to_dbc_string(&self) -> Result<String, DbcError> {
        save::serialize_file(self)
    }

    // ---------- Messages ----------

    #[inline]
    pub fn messages(&self) -> &BTreeMap<u32, Message> {
        &self.messages
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn msg(&self, address: u32) -> Option<&Message> {
        self.messages.get(&address)
    }

    /// Mutable message. Call [`Message::update`] after changing `size`.
    pub fn msg_mut(&mut self, address: u32) -> Option<&mut Message> {
        self.messages.get_mut(&address)
    }

    pub fn msg_by_name(&self, name: &str) -> Option<&Message> {
        self.messages.values().find(|m| m.name == name)
    }

    pub fn signal(&self, address: u32, name: &str) -> Option<&Signal> {
        self.msg(address).and_then(|m| m.sig(name))
    }

    /// Inserts a message, rejecting an address that is already taken.
    pub fn add_message(&mut self, mut msg: Message) -> Result<&mut Message, ModelError> {
        if self.messages.contains_key(&msg.address) {
            return Err(ModelError::DuplicateAddress {
                address: msg.address,
            });
        }
        msg.update();
        Ok(self.messages.entry(msg.address).or_insert(msg))
    }

    /// Sets name, size, transmitter and comment of the message at `address`,
    /// creating it when absent, then reruns its recompute pass.
    pub fn update_msg(
        &mut self,
        address: u32,
        name: &str,
        size: u32,
        node: &str,
        comment: &str,
    ) -> &mut Message {
        let msg = self.messages.entry(address).or_insert_with(|| Message {
            address,
            ..Default::default()
        });
        msg.name = name.to_string();
        msg.size = size;
        msg.transmitter = node.to_string();
        msg.comment = comment.to_string();
        msg.update();
        msg
    }

    pub fn remove_msg(&mut self, address: u32) -> Option<Message> {
        self.messages.remove(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::signal::{DEFAULT_NODE_NAME, Endianness};

    #[test]
    fn test_update_msg_creates_and_edits() {
        let mut file = DbcFile::new("mem");
        let msg = file.update_msg(0x123, "BODY", 8, "", "door states");
        assert_eq!(msg.transmitter, DEFAULT_NODE_NAME);
        msg.add_signal(Signal::new("DOOR", 0, 4, Endianness::Intel)).unwrap();

        let msg = file.update_msg(0x123, "BODY2", 2, "BCM", "");
        assert_eq!(msg.name, "BODY2");
        assert_eq!(msg.transmitter, "BCM");
        assert_eq!(msg.mask().len(), 8);
        assert_eq!(msg.signal_count(), 1);

        assert_eq!(file.msg_by_name("BODY2").map(|m| m.address), Some(0x123));
        assert!(file.signal(0x123, "DOOR").is_some());
        assert!(file.remove_msg(0x123).is_some());
        assert!(file.is_empty());
    }

    #[test]
    fn test_add_message_rejects_duplicate_address() {
        let mut file = DbcFile::new("mem");
        file.add_message(Message::new(1, "A", 8, "ECU")).unwrap();
        let err = file.add_message(Message::new(1, "B", 8, "ECU")).unwrap_err();
        assert_eq!(err, ModelError::DuplicateAddress { address: 1 });
        assert_eq!(file.msg(1).unwrap().name, "A");
    }

    #[test]
    fn test_save_requires_filename() {
        let file = DbcFile::new("mem");
        assert!(matches!(file.save(), Err(DbcError::NoFilename { .. })));
    }

    #[test]
    fn test_save_as_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.dbc");

        let mut file = DbcFile::new("mem");
        file.update_msg(0x10, "BODY", 8, "BCM", "");
        file.save_as(&path).unwrap();
        assert_eq!(file.filename, path.display().to_string());

        let reopened = DbcFile::open(&path, &ReadOptions::default()).unwrap();
        assert_eq!(reopened.name, "body");
        assert_eq!(reopened.filename, file.filename);
        assert_eq!(reopened.msg(0x10).unwrap().transmitter, "BCM");
    }
}
