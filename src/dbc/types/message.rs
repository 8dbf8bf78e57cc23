//! CAN message model (SlotMap-backed signal arena).
//!
//! Signals live in a per-message **SlotMap** with stable [`SignalKey`]s. The
//! `signals_order` view holds the canonical order established by
//! [`Message::update`]: the multiplexor first, then by multiplex value, start bit
//! and name. A multiplexed signal refers to its selector by key, never by pointer.
//!
//! [`Message::update`] also rebuilds the payload bit `mask` and resolves the
//! multiplexor; every structural edit runs it before returning.

use slotmap::{SlotMap, new_key_type};
use std::collections::HashSet;

use crate::dbc::core::bit_layout;
use crate::dbc::types::{
    errors::{LayoutError, ModelError},
    signal::{DEFAULT_NODE_NAME, MuxRole, Signal},
};

// --- Stable keys (SlotMap) ---
new_key_type! { pub struct SignalKey; }

/// CAN message defined in a DBC file.
#[derive(Default, Clone, Debug)]
pub struct Message {
    /// CAN address (identifier as written after `BO_`).
    pub address: u32,
    /// Message name.
    pub name: String,
    /// Payload length in bytes.
    pub size: u32,
    /// Transmitting node.
    pub transmitter: String,
    /// Associated comment (DBC `CM_ BO_` section).
    pub comment: String,

    // --- Main storage (stable-key map) ---
    pub(crate) signals: SlotMap<SignalKey, Signal>,
    // --- Order "view" ---
    pub(crate) signals_order: Vec<SignalKey>,

    // --- Derived by update() ---
    pub(crate) mask: Vec<u8>,
    pub(crate) multiplexor: Option<SignalKey>,
}

impl Message {
    pub fn new(address: u32, name: &str, size: u32, transmitter: &str) -> Self {
        let mut msg = Message {
            address,
            name: name.to_string(),
            size,
            transmitter: transmitter.to_string(),
            ..Default::default()
        };
        msg.update();
        msg
    }

    // ---------- Lookups ----------

    /// Signal by exact name.
    pub fn sig(&self, name: &str) -> Option<&Signal> {
        self.sig_key(name).and_then(|key| self.signals.get(key))
    }

    /// Mutable signal by exact name. Call [`Message::update`] after changing layout fields.
    pub fn sig_mut(&mut self, name: &str) -> Option<&mut Signal> {
        let key = self.sig_key(name)?;
        self.signals.get_mut(key)
    }

    pub fn sig_key(&self, name: &str) -> Option<SignalKey> {
        self.signals
            .iter()
            .find(|(_, sig)| sig.name == name)
            .map(|(key, _)| key)
    }

    #[inline]
    pub fn sig_by_key(&self, key: SignalKey) -> Option<&Signal> {
        self.signals.get(key)
    }

    /// Signals in canonical order.
    pub fn signals(&self) -> impl Iterator<Item = &Signal> + '_ {
        self.signals_order
            .iter()
            .filter_map(move |&key| self.signals.get(key))
    }

    /// `(key, signal)` pairs in canonical order.
    pub fn iter_signals(&self) -> impl Iterator<Item = (SignalKey, &Signal)> + '_ {
        self.signals_order
            .iter()
            .filter_map(move |&key| self.signals.get(key).map(|sig| (key, sig)))
    }

    #[inline]
    pub fn signal_keys(&self) -> &[SignalKey] {
        &self.signals_order
    }

    #[inline]
    pub fn signal_count(&self) -> usize {
        self.signals_order.len()
    }

    /// Position of a signal in canonical order.
    pub fn index_of(&self, key: SignalKey) -> Option<usize> {
        self.signals_order.iter().position(|&k| k == key)
    }

    /// Payload bytes covered by at least one signal, one byte per aligned payload byte.
    #[inline]
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    #[inline]
    pub fn multiplexor_key(&self) -> Option<SignalKey> {
        self.multiplexor
    }

    pub fn multiplexor(&self) -> Option<&Signal> {
        self.multiplexor.and_then(|key| self.signals.get(key))
    }

    /// First free `NEW_SIGNAL_<n>` name, `n` starting at 1.
    pub fn new_signal_name(&self) -> String {
        (1..)
            .map(|i| format!("NEW_SIGNAL_{i}"))
            .find(|name| self.sig(name).is_none())
            .unwrap_or_default()
    }

    // ---------- Edits ----------

    /// Adds a signal and recomputes the message.
    pub fn add_signal(&mut self, sig: Signal) -> Result<SignalKey, ModelError> {
        if self.sig(&sig.name).is_some() {
            return Err(ModelError::DuplicateSignalName {
                message: self.name.clone(),
                signal: sig.name,
            });
        }
        if sig.mux_role == MuxRole::Multiplexor && self.has_other_multiplexor(None) {
            return Err(ModelError::MultipleMultiplexors {
                message: self.name.clone(),
            });
        }
        let key = self.push_signal(sig);
        self.update();
        Ok(key)
    }

    /// Replaces the signal called `name` with `new_sig`, keeping its key.
    ///
    /// Returns `Ok(None)` when no signal has that name.
    pub fn update_signal(&mut self, name: &str, new_sig: Signal) -> Result<Option<SignalKey>, ModelError> {
        let Some(key) = self.sig_key(name) else {
            return Ok(None);
        };
        if new_sig.name != name && self.sig(&new_sig.name).is_some() {
            return Err(ModelError::DuplicateSignalName {
                message: self.name.clone(),
                signal: new_sig.name,
            });
        }
        if new_sig.mux_role == MuxRole::Multiplexor && self.has_other_multiplexor(Some(key)) {
            return Err(ModelError::MultipleMultiplexors {
                message: self.name.clone(),
            });
        }
        self.signals[key] = new_sig;
        self.update();
        Ok(Some(key))
    }

    /// Removes the signal called `name` and recomputes the message.
    pub fn remove_signal(&mut self, name: &str) -> Option<Signal> {
        let key = self.sig_key(name)?;
        let removed = self.signals.remove(key);
        self.signals_order.retain(|&k| k != key);
        self.update();
        removed
    }

    // Append without validation or recompute; the parser checks and updates itself.
    pub(crate) fn push_signal(&mut self, sig: Signal) -> SignalKey {
        let key = self.signals.insert(sig);
        self.signals_order.push(key);
        key
    }

    fn has_other_multiplexor(&self, except: Option<SignalKey>) -> bool {
        self.signals
            .iter()
            .any(|(key, sig)| Some(key) != except && sig.mux_role == MuxRole::Multiplexor)
    }

    /// Recompute pass run after every structural edit.
    ///
    /// Defaults the transmitter, re-sorts signals, refreshes each signal's derived
    /// fields, rebuilds the payload mask and resolves the multiplexor. A multiplexed
    /// signal without a multiplexor in the message is demoted to `Normal`.
    pub fn update(&mut self) {
        if self.transmitter.is_empty() {
            self.transmitter = DEFAULT_NODE_NAME.to_string();
        }

        let aligned: usize =
            ((self.size as usize).div_ceil(8) * 8).min(bit_layout::MAX_ADDRESSABLE_BYTES);
        self.mask.clear();
        self.mask.resize(aligned, 0);
        self.multiplexor = None;

        let signals = &self.signals;
        self.signals_order.retain(|&key| signals.contains_key(key));
        self.signals_order.sort_by(|&a, &b| {
            let (sa, sb) = (&signals[a], &signals[b]);
            (sa.mux_role != MuxRole::Multiplexor, sa.multiplex_value, sa.start_bit, &sa.name).cmp(&(
                sb.mux_role != MuxRole::Multiplexor,
                sb.multiplex_value,
                sb.start_bit,
                &sb.name,
            ))
        });

        for &key in &self.signals_order {
            let sig = &mut self.signals[key];
            if sig.mux_role == MuxRole::Multiplexor {
                self.multiplexor = Some(key);
            }
            sig.update();
            for i in 0..sig.size {
                let pos: usize = sig.bit_index(i) as usize;
                if let Some(byte) = self.mask.get_mut(pos / 8) {
                    *byte |= 1 << (pos % 8);
                }
            }
        }

        let multiplexor = self.multiplexor;
        for sig in self.signals.values_mut() {
            sig.multiplexor = match sig.mux_role {
                MuxRole::Multiplexed => multiplexor,
                _ => None,
            };
            if sig.multiplexor.is_none() {
                if sig.mux_role == MuxRole::Multiplexed {
                    sig.mux_role = MuxRole::Normal;
                }
                sig.multiplex_value = 0;
            }
        }
    }

    // ---------- Decode / encode ----------

    /// Physical value of a signal, honoring the multiplexor gate.
    pub fn value(&self, key: SignalKey, data: &[u8]) -> Option<f64> {
        let sig = self.signals.get(key)?;
        let mux = sig.multiplexor.and_then(|k| self.signals.get(k));
        sig.value(data, mux)
    }

    pub fn value_by_name(&self, name: &str, data: &[u8]) -> Option<f64> {
        self.value(self.sig_key(name)?, data)
    }

    /// Every signal value present in `data`, in canonical order.
    pub fn decode(&self, data: &[u8]) -> Vec<(&str, f64)> {
        self.iter_signals()
            .filter_map(|(key, sig)| self.value(key, data).map(|v| (sig.name.as_str(), v)))
            .collect()
    }

    /// Packs a physical value into `data`; for a multiplexed signal the
    /// multiplexor is set to its selector value too.
    pub fn encode_value(&self, key: SignalKey, data: &mut [u8], physical: f64) -> bool {
        let Some(sig) = self.signals.get(key) else {
            return false;
        };
        if let Some(mux) = sig.multiplexor.and_then(|k| self.signals.get(k))
            && !mux.encode_raw(data, sig.multiplex_value as u64)
        {
            return false;
        }
        sig.encode(data, physical)
    }

    // ---------- Layout checks ----------

    /// Signals sharing payload bits with another signal that can be present in
    /// the same frame. Multiplexed signals with different selector values never overlap.
    pub fn overlapping_signals(&self) -> Vec<&Signal> {
        let bits: Vec<(SignalKey, HashSet<u16>)> = self
            .iter_signals()
            .map(|(key, sig)| (key, (0..sig.size).map(|i| sig.bit_index(i)).collect()))
            .collect();

        let mut overlapping: Vec<SignalKey> = Vec::new();
        for (i, (ka, bits_a)) in bits.iter().enumerate() {
            for (kb, bits_b) in &bits[i + 1..] {
                let (a, b) = (&self.signals[*ka], &self.signals[*kb]);
                if a.mux_role == MuxRole::Multiplexed
                    && b.mux_role == MuxRole::Multiplexed
                    && a.multiplex_value != b.multiplex_value
                {
                    continue;
                }
                if !bits_a.is_disjoint(bits_b) {
                    for key in [*ka, *kb] {
                        if !overlapping.contains(&key) {
                            overlapping.push(key);
                        }
                    }
                }
            }
        }

        self.iter_signals()
            .filter(|(key, _)| overlapping.contains(key))
            .map(|(_, sig)| sig)
            .collect()
    }

    /// Signals that do not fit in a payload of `size` bytes.
    pub fn out_of_bounds_signals(&self) -> Vec<(&Signal, LayoutError)> {
        self.signals()
            .filter_map(|sig| {
                bit_layout::check_signal_fits(self.size, sig.start_bit, sig.size, sig.endian)
                    .err()
                    .map(|err| (sig, err))
            })
            .collect()
    }

    /// Resets all fields to their default values.
    pub fn clear(&mut self) {
        *self = Message::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::types::signal::Endianness;

    fn mux_message() -> Message {
        let mut msg = Message::new(0x200, "MUXED", 8, "ECU");
        msg.add_signal(Signal::new("MUX", 0, 8, Endianness::Intel).with_mux(MuxRole::Multiplexor, 0))
            .unwrap();
        msg.add_signal(Signal::new("B", 8, 8, Endianness::Intel).with_mux(MuxRole::Multiplexed, 1))
            .unwrap();
        msg.add_signal(Signal::new("A", 8, 8, Endianness::Intel).with_mux(MuxRole::Multiplexed, 0))
            .unwrap();
        msg
    }

    #[test]
    fn test_mask_covers_signal_bits() {
        let mut msg = Message::new(100, "ENGINE_DATA", 8, "");
        assert_eq!(msg.transmitter, DEFAULT_NODE_NAME);
        assert_eq!(msg.mask().len(), 8);

        msg.add_signal(Signal::new("RPM", 0, 16, Endianness::Intel)).unwrap();
        msg.add_signal(Signal::new("TEMP", 16, 8, Endianness::Intel)).unwrap();
        msg.add_signal(Signal::new("FLAG", 63, 1, Endianness::Intel)).unwrap();
        let popcount: u32 = msg.mask().iter().map(|b| b.count_ones()).sum();
        assert_eq!(popcount, 25);
        assert_eq!(msg.mask()[..3], [0xFF, 0xFF, 0xFF]);
        assert_eq!(msg.mask()[7], 0x80);
    }

    #[test]
    fn test_mask_is_byte_aligned_and_guarded() {
        let mut msg = Message::new(1, "ODD", 3, "ECU");
        assert_eq!(msg.mask().len(), 8);
        msg.add_signal(Signal::new("WIDE", 60, 16, Endianness::Intel)).unwrap();
        assert_eq!(msg.mask()[7], 0xF0);
    }

    #[test]
    fn test_mask_is_capped_for_oversized_payload() {
        let mut msg = Message::new(1, "HUGE", u32::MAX, "ECU");
        assert_eq!(msg.mask().len(), bit_layout::MAX_ADDRESSABLE_BYTES);
        msg.add_signal(Signal::new("LAST", u16::MAX, 1, Endianness::Intel)).unwrap();
        assert_eq!(msg.mask().last(), Some(&0x80));
    }

    #[test]
    fn test_multiplexor_sorted_first() {
        let msg = mux_message();
        let names: Vec<&str> = msg.signals().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["MUX", "A", "B"]);
        assert_eq!(msg.index_of(msg.multiplexor_key().unwrap()), Some(0));
        assert_eq!(msg.multiplexor().unwrap().name, "MUX");
        for sig in msg.signals().filter(|s| s.mux_role == MuxRole::Multiplexed) {
            assert_eq!(sig.multiplexor(), msg.multiplexor_key());
        }
    }

    #[test]
    fn test_mux_gated_decode() {
        let msg = mux_message();
        let data = [0x01, 0x2A, 0, 0, 0, 0, 0, 0];
        assert_eq!(msg.value_by_name("B", &data), Some(42.0));
        assert_eq!(msg.value_by_name("A", &data), None);
        assert_eq!(msg.decode(&data), vec![("MUX", 1.0), ("B", 42.0)]);
    }

    #[test]
    fn test_multiplexed_without_multiplexor_is_demoted() {
        let mut msg = mux_message();
        msg.remove_signal("MUX").unwrap();
        assert!(msg.multiplexor().is_none());
        for sig in msg.signals() {
            assert_eq!(sig.mux_role, MuxRole::Normal);
            assert_eq!(sig.multiplex_value, 0);
            assert!(sig.multiplexor().is_none());
        }
    }

    #[test]
    fn test_multiplexed_added_before_multiplexor_is_demoted() {
        let mut msg = Message::new(0x200, "MUXED", 8, "ECU");
        msg.add_signal(Signal::new("B", 8, 8, Endianness::Intel).with_mux(MuxRole::Multiplexed, 1))
            .unwrap();
        let b = msg.sig("B").unwrap();
        assert_eq!((b.mux_role, b.multiplex_value), (MuxRole::Normal, 0));

        // Adding the multiplexor later does not restore the earlier role.
        msg.add_signal(Signal::new("MUX", 0, 8, Endianness::Intel).with_mux(MuxRole::Multiplexor, 0))
            .unwrap();
        let b = msg.sig("B").unwrap();
        assert_eq!(b.mux_role, MuxRole::Normal);
        assert!(b.multiplexor().is_none());
        assert_eq!(msg.value_by_name("B", &[0x00, 0x2A, 0, 0, 0, 0, 0, 0]), Some(42.0));
    }

    #[test]
    fn test_duplicate_and_second_multiplexor_rejected() {
        let mut msg = mux_message();
        let err = msg.add_signal(Signal::new("A", 16, 8, Endianness::Intel)).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateSignalName { .. }));

        let err = msg
            .add_signal(Signal::new("MUX2", 16, 4, Endianness::Intel).with_mux(MuxRole::Multiplexor, 0))
            .unwrap_err();
        assert!(matches!(err, ModelError::MultipleMultiplexors { .. }));
        assert_eq!(msg.signal_count(), 3);
    }

    #[test]
    fn test_update_signal_keeps_key() {
        let mut msg = mux_message();
        let key = msg.sig_key("A").unwrap();
        let renamed = Signal::new("A2", 8, 8, Endianness::Intel).with_mux(MuxRole::Multiplexed, 0);
        assert_eq!(msg.update_signal("A", renamed).unwrap(), Some(key));
        assert_eq!(msg.sig_by_key(key).unwrap().name, "A2");
        assert!(msg.sig("A").is_none());

        let clash = Signal::new("B", 8, 8, Endianness::Intel);
        assert!(msg.update_signal("A2", clash).is_err());
        assert_eq!(msg.update_signal("missing", Signal::default()).unwrap(), None);
    }

    #[test]
    fn test_encode_sets_selector() {
        let msg = mux_message();
        let mut data = [0u8; 8];
        let key = msg.sig_key("B").unwrap();
        assert!(msg.encode_value(key, &mut data, 7.0));
        assert_eq!(data[..2], [0x01, 0x07]);
        assert_eq!(msg.value(key, &data), Some(7.0));
    }

    #[test]
    fn test_overlap_and_bounds() {
        let msg = mux_message();
        assert!(msg.overlapping_signals().is_empty());

        let mut msg = Message::new(1, "M", 2, "ECU");
        msg.add_signal(Signal::new("X", 0, 8, Endianness::Intel)).unwrap();
        msg.add_signal(Signal::new("Y", 4, 8, Endianness::Intel)).unwrap();
        msg.add_signal(Signal::new("Z", 10, 8, Endianness::Intel)).unwrap();
        let names: Vec<&str> = msg.overlapping_signals().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["X", "Y", "Z"]);

        let out: Vec<&str> = msg
            .out_of_bounds_signals()
            .iter()
            .map(|(s, _)| s.name.as_str())
            .collect();
        assert_eq!(out, ["Z"]);
    }

    #[test]
    fn test_new_signal_name() {
        let mut msg = Message::new(1, "M", 8, "ECU");
        assert_eq!(msg.new_signal_name(), "NEW_SIGNAL_1");
        msg.add_signal(Signal::new("NEW_SIGNAL_1", 0, 1, Endianness::Intel)).unwrap();
        assert_eq!(msg.new_signal_name(), "NEW_SIGNAL_2");
    }
}
