//! Manager: maps CAN sources to shared DBC files.
//!
//! Several sources (buses/channels) may share one [`DbcFile`]. Files live in a
//! **SlotMap** arena with stable [`FileKey`]s; `files_order` is the unique-file
//! list in open order and `source_to_file` the routing table. A file no source
//! maps to is pruned after every change to the routing table.
//!
//! Lookups for a source fall back to [`GLOBAL_SOURCE`] when the source has no
//! dedicated file. Mutations go through the manager so that listeners receive
//! a [`DbcEvent`] once the change is committed.

use slotmap::{SlotMap, new_key_type};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::dbc::events::{DbcEvent, EventBus, ListenerKey};
use crate::dbc::options::ReadOptions;
use crate::dbc::types::{
    errors::{DbcError, ModelError},
    file::DbcFile,
    message::{Message, SignalKey},
    message_id::{GLOBAL_SOURCE, MessageId, SourceId, SourceSet, sources_to_string},
    signal::Signal,
};

new_key_type! { pub struct FileKey; }

/// Owner of every open DBC file and of the source-to-file routing.
#[derive(Debug, Default)]
pub struct Manager {
    options: ReadOptions,

    // --- Main storage (stable-key map) ---
    files: SlotMap<FileKey, DbcFile>,
    // --- Order "view": unique files, in open order ---
    files_order: Vec<FileKey>,

    source_to_file: BTreeMap<SourceId, FileKey>,
    events: EventBus,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager that reads files from disk with `options`.
    pub fn with_options(options: ReadOptions) -> Self {
        Manager {
            options,
            ..Default::default()
        }
    }

    #[inline]
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    // ---------- Listeners ----------

    /// Registers a listener; listeners run synchronously in registration order.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerKey
    where
        F: FnMut(&DbcEvent) + Send + 'static,
    {
        self.events.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.events.unsubscribe(key)
    }

    // ---------- Open / close ----------

    /// Maps `sources` to the file at `path`, reusing an already open file with
    /// the same filename. Parse and I/O errors leave the manager unchanged.
    pub fn open_file<P: AsRef<Path>>(&mut self, sources: &SourceSet, path: P) -> Result<FileKey, DbcError> {
        let path: &Path = path.as_ref();
        let filename: String = path.display().to_string();

        let key: FileKey = match self.file_key_by_filename(&filename) {
            Some(key) => key,
            None => {
                let file: DbcFile = DbcFile::open(path, &self.options)?;
                self.insert_file(file)
            }
        };

        log::info!("Opened '{}' for sources [{}]", filename, sources_to_string(sources));
        self.map_sources(sources, key);
        Ok(key)
    }

    /// Parses `content` into a new file and maps `sources` to it.
    pub fn open_content(&mut self, sources: &SourceSet, name: &str, content: &str) -> Result<FileKey, DbcError> {
        let file: DbcFile = DbcFile::from_content(name, content)?;
        let key: FileKey = self.insert_file(file);

        log::info!("Opened '{}' for sources [{}]", name, sources_to_string(sources));
        self.map_sources(sources, key);
        Ok(key)
    }

    /// Removes the mappings of `sources`; files left without a source are closed.
    pub fn close_sources(&mut self, sources: &SourceSet) {
        for source in sources {
            self.source_to_file.remove(source);
        }
        log::info!("Closed sources [{}]", sources_to_string(sources));
        self.remove_orphaned_files();
        self.events.emit(&DbcEvent::FilesChanged);
    }

    /// Closes one file and every mapping to it.
    pub fn close_file(&mut self, key: FileKey) -> Option<DbcFile> {
        self.source_to_file.retain(|_, k| *k != key);
        self.files_order.retain(|&k| k != key);
        let file = self.files.remove(key)?;
        log::info!("Closed '{}'", file.name);
        self.events.emit(&DbcEvent::FilesChanged);
        Some(file)
    }

    pub fn close_all(&mut self) {
        self.source_to_file.clear();
        self.files_order.clear();
        self.files.clear();
        log::info!("Closed all DBC files");
        self.events.emit(&DbcEvent::FilesChanged);
    }

    fn insert_file(&mut self, file: DbcFile) -> FileKey {
        let key = self.files.insert(file);
        self.files_order.push(key);
        key
    }

    fn map_sources(&mut self, sources: &SourceSet, key: FileKey) {
        for &source in sources {
            self.source_to_file.insert(source, key);
        }
        self.remove_orphaned_files();
        self.events.emit(&DbcEvent::FilesChanged);
    }

    fn remove_orphaned_files(&mut self) {
        let used: BTreeSet<FileKey> = self.source_to_file.values().copied().collect();
        let files = &mut self.files;
        self.files_order.retain(|key| {
            if used.contains(key) {
                return true;
            }
            if let Some(file) = files.remove(*key) {
                log::debug!("Dropped orphaned DBC file '{}'", file.name);
            }
            false
        });
    }

    // ---------- Files ----------

    fn file_key_by_filename(&self, filename: &str) -> Option<FileKey> {
        self.files_order
            .iter()
            .copied()
            .find(|&key| self.files.get(key).is_some_and(|f| f.filename == filename))
    }

    /// Key of the file used for `source`: its own mapping, else the global one.
    pub fn find_file_key(&self, source: SourceId) -> Option<FileKey> {
        self.source_to_file
            .get(&source)
            .or_else(|| self.source_to_file.get(&GLOBAL_SOURCE))
            .copied()
    }

    pub fn find_dbc_file(&self, source: SourceId) -> Option<&DbcFile> {
        self.find_file_key(source).and_then(|key| self.files.get(key))
    }

    pub fn find_dbc_file_mut(&mut self, source: SourceId) -> Option<&mut DbcFile> {
        let key = self.find_file_key(source)?;
        self.files.get_mut(key)
    }

    #[inline]
    pub fn file(&self, key: FileKey) -> Option<&DbcFile> {
        self.files.get(key)
    }

    /// Mutable file, e.g. to save it. Structural edits should go through the
    /// manager so listeners are notified.
    #[inline]
    pub fn file_mut(&mut self, key: FileKey) -> Option<&mut DbcFile> {
        self.files.get_mut(key)
    }

    /// Unique open files, in open order.
    pub fn all_files(&self) -> impl Iterator<Item = (FileKey, &DbcFile)> + '_ {
        self.files_order
            .iter()
            .filter_map(move |&key| self.files.get(key).map(|f| (key, f)))
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.files_order.len()
    }

    pub fn non_empty_file_count(&self) -> usize {
        self.all_files().filter(|(_, f)| !f.is_empty()).count()
    }

    /// Sources routed to `key` (explicit mappings only).
    pub fn sources_for_file(&self, key: FileKey) -> SourceSet {
        self.source_to_file
            .iter()
            .filter(|(_, k)| **k == key)
            .map(|(source, _)| *source)
            .collect()
    }

    // ---------- Lookups ----------

    /// Messages of the file used for `source`; empty when there is none.
    pub fn messages(&self, source: SourceId) -> impl Iterator<Item = &Message> + '_ {
        self.find_dbc_file(source)
            .into_iter()
            .flat_map(|f| f.messages().values())
    }

    pub fn msg(&self, id: MessageId) -> Option<&Message> {
        self.find_dbc_file(id.source).and_then(|f| f.msg(id.address))
    }

    pub fn msg_by_name(&self, source: SourceId, name: &str) -> Option<&Message> {
        self.find_dbc_file(source).and_then(|f| f.msg_by_name(name))
    }

    /// Every signal name across all open files, deduplicated and sorted case-insensitively.
    pub fn signal_names(&self) -> Vec<String> {
        let unique: BTreeSet<&str> = self
            .all_files()
            .flat_map(|(_, f)| f.messages().values())
            .flat_map(|m| m.signals())
            .map(|s| s.name.as_str())
            .collect();
        let mut names: Vec<String> = unique.into_iter().map(str::to_string).collect();
        names.sort_by_key(|name| name.to_lowercase());
        names
    }

    /// Default name for a new message: `NEW_MSG_<ADDRESS>` in uppercase hex.
    pub fn new_msg_name(&self, id: MessageId) -> String {
        format!("NEW_MSG_{:X}", id.address)
    }

    pub fn new_signal_name(&self, id: MessageId) -> Option<String> {
        self.msg(id).map(Message::new_signal_name)
    }

    // ---------- Mutation passthroughs ----------

    fn msg_mut_for(&mut self, id: MessageId) -> Result<&mut Message, ModelError> {
        let file = self
            .find_dbc_file_mut(id.source)
            .ok_or(ModelError::NoFileForSource { source_id: id.source })?;
        file.msg_mut(id.address)
            .ok_or(ModelError::MessageMissing { id })
    }

    pub fn add_signal(&mut self, id: MessageId, sig: Signal) -> Result<SignalKey, ModelError> {
        let name: String = sig.name.clone();
        let key = self
            .msg_mut_for(id)?
            .add_signal(sig)
            .inspect_err(|err| log::warn!("Add signal rejected: {err}"))?;

        self.events.emit(&DbcEvent::SignalAdded { id, signal: name });
        self.events.emit(&DbcEvent::MaskUpdated(id));
        Ok(key)
    }

    /// Replaces signal `name` of message `id` with `sig`.
    pub fn update_signal(&mut self, id: MessageId, name: &str, sig: Signal) -> Result<SignalKey, ModelError> {
        let new_name: String = sig.name.clone();
        let key = self
            .msg_mut_for(id)?
            .update_signal(name, sig)
            .inspect_err(|err| log::warn!("Update signal rejected: {err}"))?
            .ok_or_else(|| ModelError::SignalMissing {
                id,
                signal: name.to_string(),
            })?;

        self.events.emit(&DbcEvent::SignalUpdated {
            id,
            signal: new_name,
        });
        self.events.emit(&DbcEvent::MaskUpdated(id));
        Ok(key)
    }

    pub fn remove_signal(&mut self, id: MessageId, name: &str) -> Result<Signal, ModelError> {
        let removed = self
            .msg_mut_for(id)?
            .remove_signal(name)
            .ok_or_else(|| ModelError::SignalMissing {
                id,
                signal: name.to_string(),
            })?;

        self.events.emit(&DbcEvent::SignalRemoved {
            id,
            signal: removed.name.clone(),
        });
        self.events.emit(&DbcEvent::MaskUpdated(id));
        Ok(removed)
    }

    /// Creates or edits message `id` in the file used for its source.
    pub fn update_msg(
        &mut self,
        id: MessageId,
        name: &str,
        size: u32,
        node: &str,
        comment: &str,
    ) -> Result<(), ModelError> {
        let file = self
            .find_dbc_file_mut(id.source)
            .ok_or(ModelError::NoFileForSource { source_id: id.source })?;
        file.update_msg(id.address, name, size, node, comment);

        self.events.emit(&DbcEvent::MessageUpdated(id));
        Ok(())
    }

    pub fn remove_msg(&mut self, id: MessageId) -> Result<Message, ModelError> {
        let file = self
            .find_dbc_file_mut(id.source)
            .ok_or(ModelError::NoFileForSource { source_id: id.source })?;
        let removed = file
            .remove_msg(id.address)
            .ok_or(ModelError::MessageMissing { id })?;

        self.events.emit(&DbcEvent::MessageRemoved(id));
        self.events.emit(&DbcEvent::MaskUpdated(id));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::signal::Endianness;
    use std::sync::{Arc, Mutex};

    const ENGINE: &str = "BO_ 100 ENGINE_DATA: 8 ECU\n SG_ RPM : 0|16@1+ (0.25,0) [0|16383.75] \"rpm\" XXX\n";
    const BODY: &str = "BO_ 200 BODY: 4 BCM\n SG_ door : 0|1@1+ (1,0) [0|1] \"\" XXX\n";

    fn sources(ids: &[SourceId]) -> SourceSet {
        ids.iter().copied().collect()
    }

    fn recorder(manager: &mut Manager) -> Arc<Mutex<Vec<DbcEvent>>> {
        let events: Arc<Mutex<Vec<DbcEvent>>> = Arc::default();
        let sink = Arc::clone(&events);
        manager.subscribe(move |ev| sink.lock().unwrap().push(ev.clone()));
        events
    }

    #[test]
    fn test_global_fallback() {
        let mut manager = Manager::new();
        manager
            .open_content(&sources(&[GLOBAL_SOURCE]), "engine", ENGINE)
            .unwrap();
        let body = manager.open_content(&sources(&[1]), "body", BODY).unwrap();

        assert_eq!(manager.find_file_key(1), Some(body));
        assert_eq!(manager.find_dbc_file(7).unwrap().name, "engine");
        assert!(manager.msg(MessageId::new(3, 100)).is_some());
        assert!(manager.msg(MessageId::new(1, 100)).is_none());
        assert_eq!(manager.messages(1).count(), 1);

        manager.close_sources(&sources(&[GLOBAL_SOURCE]));
        assert!(manager.find_dbc_file(7).is_none());
        assert_eq!(manager.messages(7).count(), 0);
        assert_eq!(manager.file_count(), 1);
    }

    #[test]
    fn test_orphans_are_pruned_on_remap() {
        let mut manager = Manager::new();
        let first = manager.open_content(&sources(&[0, 1]), "a", ENGINE).unwrap();
        let second = manager.open_content(&sources(&[0]), "b", BODY).unwrap();
        assert_eq!(manager.file_count(), 2);
        assert_eq!(manager.sources_for_file(first), sources(&[1]));

        manager.open_content(&sources(&[1]), "c", BODY).unwrap();
        assert_eq!(manager.file_count(), 2);
        assert!(manager.file(first).is_none());
        assert!(manager.file(second).is_some());
    }

    #[test]
    fn test_failed_parse_leaves_mapping_untouched() {
        let mut manager = Manager::new();
        let key = manager.open_content(&sources(&[0]), "a", ENGINE).unwrap();
        let events = recorder(&mut manager);

        let err = manager
            .open_content(&sources(&[0]), "bad", "BO_ 1 A: 8 X\nBO_ 1 B: 8 X\n")
            .unwrap_err();
        assert!(matches!(err, DbcError::Parse(_)));
        assert_eq!(manager.find_file_key(0), Some(key));
        assert_eq!(manager.file_count(), 1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_open_file_reuses_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.dbc");
        std::fs::write(&path, ENGINE).unwrap();

        let mut manager = Manager::new();
        let a = manager.open_file(&sources(&[0]), &path).unwrap();
        let b = manager.open_file(&sources(&[1]), &path).unwrap();
        assert_eq!(a, b);
        assert_eq!(manager.file_count(), 1);
        assert_eq!(manager.sources_for_file(a), sources(&[0, 1]));

        let missing = manager.open_file(&sources(&[2]), dir.path().join("missing.dbc"));
        assert!(matches!(missing, Err(DbcError::OpenFile { .. })));
        assert!(manager.find_file_key(2).is_none());
    }

    #[test]
    fn test_signal_passthroughs_emit_events() {
        let mut manager = Manager::new();
        manager.open_content(&sources(&[0]), "engine", ENGINE).unwrap();
        let events = recorder(&mut manager);
        let id = MessageId::new(0, 100);

        manager
            .add_signal(id, Signal::new("TEMP", 16, 8, Endianness::Intel))
            .unwrap();
        manager
            .update_signal(id, "TEMP", Signal::new("OIL_TEMP", 16, 8, Endianness::Intel))
            .unwrap();
        manager.remove_signal(id, "OIL_TEMP").unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                DbcEvent::SignalAdded { id, signal: "TEMP".into() },
                DbcEvent::MaskUpdated(id),
                DbcEvent::SignalUpdated { id, signal: "OIL_TEMP".into() },
                DbcEvent::MaskUpdated(id),
                DbcEvent::SignalRemoved { id, signal: "OIL_TEMP".into() },
                DbcEvent::MaskUpdated(id),
            ]
        );
    }

    #[test]
    fn test_rejected_edits_report_errors() {
        let mut manager = Manager::new();
        manager.open_content(&sources(&[0]), "engine", ENGINE).unwrap();
        let events = recorder(&mut manager);

        let dup = manager.add_signal(MessageId::new(0, 100), Signal::new("RPM", 16, 8, Endianness::Intel));
        assert!(matches!(dup, Err(ModelError::DuplicateSignalName { .. })));

        let missing = manager.remove_signal(MessageId::new(0, 100), "NOPE");
        assert!(matches!(missing, Err(ModelError::SignalMissing { .. })));

        let no_msg = manager.remove_msg(MessageId::new(0, 999));
        assert!(matches!(no_msg, Err(ModelError::MessageMissing { .. })));

        let no_file = manager.update_msg(MessageId::new(5, 1), "X", 8, "", "");
        assert_eq!(no_file, Err(ModelError::NoFileForSource { source_id: 5 }));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_message_passthroughs() {
        let mut manager = Manager::new();
        manager.open_content(&sources(&[0]), "engine", ENGINE).unwrap();
        let events = recorder(&mut manager);
        let id = MessageId::new(0, 0x1A0);

        let name = manager.new_msg_name(id);
        assert_eq!(name, "NEW_MSG_1A0");
        manager.update_msg(id, &name, 8, "", "").unwrap();
        assert_eq!(manager.msg(id).unwrap().transmitter, "XXX");
        assert_eq!(manager.new_signal_name(id).as_deref(), Some("NEW_SIGNAL_1"));

        let removed = manager.remove_msg(id).unwrap();
        assert_eq!(removed.name, "NEW_MSG_1A0");
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                DbcEvent::MessageUpdated(id),
                DbcEvent::MessageRemoved(id),
                DbcEvent::MaskUpdated(id),
            ]
        );
    }

    #[test]
    fn test_signal_names_and_counts() {
        let mut manager = Manager::new();
        manager.open_content(&sources(&[0]), "engine", ENGINE).unwrap();
        manager.open_content(&sources(&[1]), "body", BODY).unwrap();
        manager.open_content(&sources(&[2]), "empty", "VERSION \"\"\n").unwrap();

        assert_eq!(manager.signal_names(), vec!["door", "RPM"]);
        assert_eq!(manager.file_count(), 3);
        assert_eq!(manager.non_empty_file_count(), 2);
        assert_eq!(manager.msg_by_name(1, "BODY").map(|m| m.address), Some(200));

        let engine = manager.find_file_key(0).unwrap();
        assert!(manager.close_file(engine).is_some());
        assert!(manager.find_file_key(0).is_none());

        manager.close_all();
        assert_eq!(manager.file_count(), 0);
    }
}
