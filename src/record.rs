//! Wire-level protocol records exchanged with the traffic generator.
//!
//! A record holds the static value of every binary field of one protocol
//! layer, the override flags of computed fields, and a list of variable-field
//! descriptors for the attributes that change from one packet to the next.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Width of the counter used by a variable field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterType {
    Counter8,
    Counter16,
    Counter32,
}

impl CounterType {
    /// Smallest counter covering a binary field of the given full mask.
    pub const fn for_mask(full_mask: u64) -> Self {
        if full_mask > 0xffff {
            CounterType::Counter32
        } else if full_mask > 0xff {
            CounterType::Counter16
        } else {
            CounterType::Counter8
        }
    }
}

/// Generation mode of a variable field, as understood by the traffic generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableFieldMode {
    Increment,
    Decrement,
    Random,
}

/// A variable-field descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableFieldRecord {
    pub counter: CounterType,
    /// Byte offset of the binary field in the protocol header.
    pub offset: u32,
    /// Bits of the binary field that vary.
    pub mask: u64,
    /// Initial value of the whole binary field.
    pub value: u64,
    pub mode: VariableFieldMode,
    /// Number of packets after which the value restarts from `value`.
    pub count: u32,
    /// Amount added or subtracted per packet, aligned on `mask`.
    pub step: u64,
}

/// One protocol layer of a stream, in wire form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolRecord {
    pub protocol_id: u16,
    /// Static binary fields, by name. Unset fields are absent.
    #[serde(default)]
    pub fields: BTreeMap<String, u64>,
    /// Override flags of computed fields, by name.
    #[serde(default)]
    pub overrides: BTreeMap<String, bool>,
    #[serde(default)]
    pub variable_fields: Vec<VariableFieldRecord>,
}

impl ProtocolRecord {
    pub fn new(protocol_id: u16) -> Self {
        ProtocolRecord {
            protocol_id,
            ..Default::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).copied()
    }

    pub fn set_field(&mut self, name: &str, value: u64) {
        self.fields.insert(name.to_string(), value);
    }

    /// Value of an override flag, `false` when unset.
    pub fn is_override(&self, name: &str) -> bool {
        self.overrides.get(name).copied().unwrap_or(false)
    }

    pub fn set_override(&mut self, name: &str, value: bool) {
        self.overrides.insert(name.to_string(), value);
    }

    /// Return the variable field bound to the bits `mask` of the binary field at `offset`.
    pub fn variable_field(&self, offset: u32, mask: u64) -> Option<&VariableFieldRecord> {
        self.variable_fields
            .iter()
            .find(|field| field.offset == offset && field.mask == mask)
    }
}
