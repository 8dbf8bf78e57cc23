use serde::{Deserialize, Serialize};

use crate::dbc::core::{bit_layout, strings};
use crate::dbc::types::{
    color::{self, Rgb, Theme},
    message::SignalKey,
};

/// Node name used when a message has no transmitter or a signal no receiver.
pub const DEFAULT_NODE_NAME: &str = "XXX";

/// Raw-value to description mapping (DBC `VAL_` section), in file order.
pub type ValueTable = Vec<(i64, String)>;

/// Definition of a signal within a CAN message (DBC).
///
/// Describes position/bit-length, endianness, sign, scaling (factor/offset),
/// valid range, unit of measure, value table and multiplexing role.
/// `msb`, `lsb`, `precision` and `color` are derived by [`Signal::update`];
/// the owning [`Message`](crate::Message) runs it on every recompute pass.
#[derive(Clone, Debug)]
pub struct Signal {
    /// Signal name, unique within its message.
    pub name: String,
    /// Start bit as written in the DBC (LSB for Intel, MSB for Motorola).
    pub start_bit: u16,
    /// Bit length.
    pub size: u16,
    /// Endianness.
    pub endian: Endianness,
    /// Sign.
    pub sign: Signess,
    /// Scaling factor.
    pub factor: f64,
    /// Scaling offset.
    pub offset: f64,
    /// Minimum physical value (informational).
    pub min: f64,
    /// Maximum physical value (informational).
    pub max: f64,
    /// Unit of measure.
    pub unit: String,
    /// Associated comment (DBC `CM_ SG_` section).
    pub comment: String,
    /// Receiving node(s) as written after the unit.
    pub receiver_name: String,
    /// Value-to-text mapping (value table).
    pub value_table: ValueTable,
    /// Multiplexing role.
    pub mux_role: MuxRole,
    /// Selector value, meaningful only for [`MuxRole::Multiplexed`].
    pub multiplex_value: u32,

    // --- Derived by update() ---
    pub(crate) msb: u16,
    pub(crate) lsb: u16,
    pub(crate) precision: usize,
    pub(crate) color: Rgb,
    // The message's multiplexor, set for multiplexed signals only.
    pub(crate) multiplexor: Option<SignalKey>,
}

impl Default for Signal {
    fn default() -> Self {
        Signal {
            name: String::new(),
            start_bit: 0,
            size: 1,
            endian: Endianness::Intel,
            sign: Signess::Unsigned,
            factor: 1.0,
            offset: 0.0,
            min: 0.0,
            max: 0.0,
            unit: String::new(),
            comment: String::new(),
            receiver_name: String::new(),
            value_table: ValueTable::new(),
            mux_role: MuxRole::Normal,
            multiplex_value: 0,
            msb: 0,
            lsb: 0,
            precision: 0,
            color: Rgb::default(),
            multiplexor: None,
        }
    }
}

impl Signal {
    /// Creates an unsigned, unscaled signal and computes its derived layout.
    pub fn new(name: &str, start_bit: u16, size: u16, endian: Endianness) -> Self {
        let mut sig = Signal {
            name: name.to_string(),
            start_bit,
            size,
            endian,
            ..Default::default()
        };
        sig.update();
        sig
    }

    pub fn with_sign(mut self, sign: Signess) -> Self {
        self.sign = sign;
        self
    }

    pub fn with_scale(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self.update();
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn with_mux(mut self, role: MuxRole, multiplex_value: u32) -> Self {
        self.mux_role = role;
        self.multiplex_value = multiplex_value;
        self
    }

    pub fn with_value_table(mut self, table: ValueTable) -> Self {
        self.value_table = table;
        self
    }

    /// Recomputes `msb`/`lsb`, the default receiver, `precision` and `color`.
    pub fn update(&mut self) {
        let (msb, lsb) = bit_layout::msb_lsb(self.start_bit, self.size, self.endian);
        self.msb = msb;
        self.lsb = lsb;
        if self.receiver_name.is_empty() {
            self.receiver_name = DEFAULT_NODE_NAME.to_string();
        }
        self.precision = strings::num_decimals(self.factor).max(strings::num_decimals(self.offset));
        self.color = color::signal_color(self.lsb, Theme::Light);
    }

    #[inline]
    pub fn msb(&self) -> u16 {
        self.msb
    }

    #[inline]
    pub fn lsb(&self) -> u16 {
        self.lsb
    }

    /// Decimal digits used by [`Signal::format_value`].
    #[inline]
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Palette color for the light theme.
    #[inline]
    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn color_for(&self, theme: Theme) -> Rgb {
        color::signal_color(self.lsb, theme)
    }

    /// Key of the message's multiplexor when this signal is multiplexed.
    #[inline]
    pub fn multiplexor(&self) -> Option<SignalKey> {
        self.multiplexor
    }

    #[inline]
    pub fn is_little_endian(&self) -> bool {
        self.endian == Endianness::Intel
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.sign == Signess::Signed
    }

    /// Absolute bit index of the `i`-th bit of the field (0 = most significant).
    #[inline]
    pub fn bit_index(&self, i: u16) -> u16 {
        bit_layout::bit_index(self.start_bit, i, self.endian)
    }

    /// Unsigned raw value of the field; `0` if `data` is too short.
    #[inline]
    pub fn decode_raw(&self, data: &[u8]) -> u64 {
        bit_layout::decode_raw(data, self.msb, self.lsb, self.size, self.endian)
    }

    /// Raw value with sign extension and linear scaling applied.
    pub fn to_physical(&self, data: &[u8]) -> f64 {
        let raw: u64 = self.decode_raw(data);
        let n: u16 = self.size.min(64);
        if self.is_signed() && n > 0 && raw & (1u64 << (n - 1)) != 0 {
            let extended: u64 = if n == 64 { raw } else { raw | !((1u64 << n) - 1) };
            return (extended as i64) as f64 * self.factor + self.offset;
        }
        raw as f64 * self.factor + self.offset
    }

    /// Physical value, or `None` when `multiplexor` selects another signal set.
    ///
    /// Pass the owning message's multiplexor for multiplexed signals; the
    /// selector is checked before the signal itself is decoded.
    pub fn value(&self, data: &[u8], multiplexor: Option<&Signal>) -> Option<f64> {
        if let Some(mux) = multiplexor
            && mux.decode_raw(data) != self.multiplex_value as u64
        {
            return None;
        }
        Some(self.to_physical(data))
    }

    /// Inverse of the linear transform, truncated to `size` bits (two's complement if signed).
    pub fn to_raw(&self, physical: f64) -> u64 {
        if self.factor == 0.0 {
            return 0;
        }
        let n: u16 = self.size.min(64);
        let mask: u64 = if n >= 64 { u64::MAX } else { (1u64 << n) - 1 };
        let scaled: f64 = ((physical - self.offset) / self.factor).round();
        let raw: u64 = if self.is_signed() {
            (scaled as i64) as u64
        } else {
            scaled as u64
        };
        raw & mask
    }

    /// Packs `raw` into the signal's bits of `data`. Returns `false` if `data` is too short.
    pub fn encode_raw(&self, data: &mut [u8], raw: u64) -> bool {
        bit_layout::encode_raw(data, self.msb, self.lsb, self.size, self.endian, raw)
    }

    /// Packs a physical value into `data`.
    pub fn encode(&self, data: &mut [u8], physical: f64) -> bool {
        self.encode_raw(data, self.to_raw(physical))
    }

    /// Description for `raw` in the value table, if any.
    pub fn value_description(&self, raw: i64) -> Option<&str> {
        self.value_table
            .iter()
            .find(|(v, _)| *v == raw)
            .map(|(_, desc)| desc.as_str())
    }

    /// Text for a physical value: the value-table description if one matches,
    /// otherwise the number with `precision` decimals (plus the unit if asked).
    pub fn format_value(&self, value: f64, with_unit: bool) -> String {
        if !self.value_table.is_empty() && self.factor != 0.0 {
            let raw: i64 = ((value - self.offset) / self.factor).round() as i64;
            if let Some(desc) = self.value_description(raw) {
                return desc.to_string();
            }
        }

        let mut text: String = format!("{:.*}", self.precision, value);
        if with_unit && !self.unit.is_empty() {
            text.push(' ');
            text.push_str(&self.unit);
        }
        text
    }

    /// Resets all fields to their default values.
    pub fn clear(&mut self) {
        *self = Signal::default();
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.size == other.size
            && self.start_bit == other.start_bit
            && self.msb == other.msb
            && self.lsb == other.lsb
            && self.sign == other.sign
            && self.endian == other.endian
            && self.factor == other.factor
            && self.offset == other.offset
            && self.min == other.min
            && self.max == other.max
            && self.comment == other.comment
            && self.unit == other.unit
            && self.value_table == other.value_table
            && self.multiplex_value == other.multiplex_value
            && self.mux_role == other.mux_role
            && self.receiver_name == other.receiver_name
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Endianness {
    #[default]
    Motorola, // 0
    Intel, // 1
}

impl Endianness {
    /// Digit used after `@` in a `SG_` line.
    pub fn dbc_digit(self) -> char {
        match self {
            Endianness::Intel => '1',
            Endianness::Motorola => '0',
        }
    }
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Signess {
    #[default]
    Unsigned, // +
    Signed, // -
}

impl Signess {
    /// Sign character used in a `SG_` line.
    pub fn dbc_char(self) -> char {
        match self {
            Signess::Signed => '-',
            Signess::Unsigned => '+',
        }
    }
}

/// Multiplexing role of a signal within its message.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum MuxRole {
    #[default]
    Normal,
    /// Only decoded when the multiplexor's raw value equals `multiplex_value`.
    Multiplexed,
    /// Selector signal (`M`); at most one per message.
    Multiplexor,
}
