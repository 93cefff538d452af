use std::fmt::{Display, Formatter};

use pnet::packet::ethernet::EtherTypes;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::header::Header;
use crate::protocol::{render, Attributes, Protocol};
use crate::record::ProtocolRecord;
use crate::registry::{FieldSpec, ProtocolSpec};

pub const TPID: FieldSpec<Vlan> = FieldSpec::integer(
    "tpid",
    "tpid",
    0,
    0xffff,
    0xffff,
    EtherTypes::Vlan.0 as u64,
    "Tag protocol identifier",
)
.computed("is_override_tpid");
pub const PRIORITY: FieldSpec<Vlan> =
    FieldSpec::integer("priority", "vlan_tag", 2, 0xffff, 0xe000, 0, "Priority code point");
pub const CFI: FieldSpec<Vlan> =
    FieldSpec::integer("cfi", "vlan_tag", 2, 0xffff, 0x1000, 0, "Canonical format indicator");
pub const VLAN_ID: FieldSpec<Vlan> =
    FieldSpec::integer("vlan_id", "vlan_tag", 2, 0xffff, 0x0fff, 0, "VLAN identifier");

/// An IEEE 802.1Q tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vlan {
    header: Header<Vlan>,
}

impl ProtocolSpec for Vlan {
    const ID: u16 = 205;
    const NAME: &'static str = "Vlan";
    const FIELDS: &'static [FieldSpec<Self>] = &[TPID, PRIORITY, CFI, VLAN_ID];
}

impl Vlan {
    pub fn new(vlan_id: u16) -> Result<Self> {
        let mut vlan = Vlan::default();
        vlan.set(VLAN_ID, vlan_id as u64)?;
        Ok(vlan)
    }
}

impl Attributes for Vlan {
    fn header(&self) -> &Header<Self> {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header<Self> {
        &mut self.header
    }
}

impl Protocol for Vlan {
    fn save_fields(&self, record: &mut ProtocolRecord) {
        self.header.save(record);
    }

    fn fetch_fields(&mut self, record: &ProtocolRecord) -> Result<usize> {
        Ok(self.header.fetch(record))
    }

    fn dict_entries(&self, dict: &mut Map<String, Value>) {
        self.header.to_dict(dict);
    }

    fn set_entry(&mut self, key: &str, value: &Value) -> Result<bool> {
        self.header.set_entry(key, value)
    }
}

impl Display for Vlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        render(f, |field: &FieldSpec<Vlan>| {
            if *field == TPID {
                format!("{:#06x}", self.get(TPID))
            } else {
                self.header.render(*field)
            }
        })
    }
}
