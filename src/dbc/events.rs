//! Change notifications emitted by the [`Manager`](crate::Manager).

use slotmap::{SlotMap, new_key_type};
use std::fmt;

use crate::dbc::types::message_id::MessageId;

new_key_type! { pub struct ListenerKey; }

/// Mutation notice, delivered after the change is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbcEvent {
    /// A file was opened, closed or remapped to other sources.
    FilesChanged,
    SignalAdded { id: MessageId, signal: String },
    SignalUpdated { id: MessageId, signal: String },
    SignalRemoved { id: MessageId, signal: String },
    MessageUpdated(MessageId),
    MessageRemoved(MessageId),
    /// The payload mask of a message changed.
    MaskUpdated(MessageId),
}

/// Callback invoked synchronously for each event.
pub type Listener = Box<dyn FnMut(&DbcEvent) + Send>;

#[derive(Default)]
pub(crate) struct EventBus {
    listeners: SlotMap<ListenerKey, Listener>,
    order: Vec<ListenerKey>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: Listener) -> ListenerKey {
        let key = self.listeners.insert(listener);
        self.order.push(key);
        key
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.order.retain(|&k| k != key);
        self.listeners.remove(key).is_some()
    }

    /// Calls every listener in registration order.
    pub fn emit(&mut self, event: &DbcEvent) {
        for key in &self.order {
            if let Some(listener) = self.listeners.get_mut(*key) {
                listener(event);
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.order.len())
            .finish()
    }
}
