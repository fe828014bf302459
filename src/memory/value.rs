//! Cell values and the opaque address type
//!
//! - [`Value`]: the scalar a payload cell holds
//! - [`Address`]: opaque handle handed out by a heap
//!
//! Addresses print as `0x…` hex and parse back from that form, so they can be
//! round-tripped through a shed's string-only resource links.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar stored in a payload cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Char(char),
    Int(i64),
}

impl Value {
    /// Get the char value, returns None if not a Char
    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Get the integer value, returns None if not an Int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Check if this value is the string terminator
    pub fn is_terminator(&self) -> bool {
        matches!(self, Value::Char(super::constants::TERMINATOR))
    }

    /// Append the textual form of this value to `out`
    pub(crate) fn push_to(&self, out: &mut String) {
        match self {
            Value::Char(c) => out.push(*c),
            Value::Int(n) => out.push_str(&n.to_string()),
        }
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

const LOW_BITS: u64 = 0xffff_ffff;

/// Opaque storage handle (64-bit)
///
/// The upper 32 bits carry the owning heap's tag, the lower 32 bits the
/// offset-shifted cell index. Only [`AddressCodec`](super::address::AddressCodec)
/// should take one apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub(crate) u64);

impl Address {
    /// Raw 64-bit representation
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Build an address from its raw representation
    pub fn from_raw(raw: u64) -> Self {
        Address(raw)
    }

    /// Address `n` cells further along.
    ///
    /// Only the low 32 bits move and they saturate, so the heap tag is never
    /// disturbed. A saturated address decodes to nothing.
    pub fn offset(self, n: usize) -> Self {
        let low = (self.0 & LOW_BITS).saturating_add(n as u64).min(LOW_BITS);
        Address((self.0 & !LOW_BITS) | low)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for Address {
    type Err = std::num::ParseIntError;

    /// Accepts `0x`-prefixed hex (the `Display` form) or plain decimal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).map(Address),
            None => s.parse::<u64>().map(Address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_parse() {
        let addr = Address(0x2_1000_0005);
        let text = addr.to_string();
        assert_eq!(text, "0x210000005");
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        assert_eq!("42".parse::<Address>().unwrap(), Address(42));
        assert!("zz".parse::<Address>().is_err());
    }

    #[test]
    fn test_offset_keeps_tag() {
        let addr = Address(0x2_1000_0005);
        assert_eq!(addr.offset(3), Address(0x2_1000_0008));
        assert_eq!(addr.offset(usize::MAX), Address(0x2_ffff_ffff));
        assert_eq!(Address(0x2_ffff_fff0).offset(0x20), Address(0x2_ffff_ffff));
    }

    #[test]
    fn test_value_text() {
        let mut out = String::new();
        Value::Char('a').push_to(&mut out);
        Value::Int(-12).push_to(&mut out);
        assert_eq!(out, "a-12");
        assert!(Value::Char('\0').is_terminator());
        assert!(!Value::Int(0).is_terminator());
    }
}
