use std::fmt::{Display, Formatter};

use pnet::packet::ethernet::EtherTypes;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::header::Header;
use crate::protocol::{render, Attributes, Protocol};
use crate::record::ProtocolRecord;
use crate::registry::{FieldSpec, ProtocolSpec};

pub const ETHER_TYPE: FieldSpec<Ethernet> = FieldSpec::integer(
    "ether_type",
    "type",
    0,
    0xffff,
    0xffff,
    EtherTypes::Ipv4.0 as u64,
    "EtherType of the encapsulated protocol, 0x0800 for IPv4",
)
.computed("is_override_type");

/// The Ethernet II layer, holding the EtherType only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ethernet {
    header: Header<Ethernet>,
}

impl ProtocolSpec for Ethernet {
    const ID: u16 = 200;
    const NAME: &'static str = "Ethernet";
    const FIELDS: &'static [FieldSpec<Self>] = &[ETHER_TYPE];
}

impl Attributes for Ethernet {
    fn header(&self) -> &Header<Self> {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header<Self> {
        &mut self.header
    }
}

impl Protocol for Ethernet {
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

impl Display for Ethernet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        render(f, |field: &FieldSpec<Ethernet>| format!("{:#06x}", self.get(*field)))
    }
}
