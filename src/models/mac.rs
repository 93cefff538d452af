use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};

use crate::address::{AddressProgram, Assign, MacAddress};
use crate::error::Result;
use crate::header::lookup;
use crate::protocol::{render, Protocol};
use crate::record::ProtocolRecord;
use crate::registry::{FieldKind, FieldSpec, ProtocolSpec};
use crate::utilities::u64_to_mac;

pub const DESTINATION: FieldSpec<Mac> = FieldSpec::mac(
    "destination",
    "dst_mac",
    0,
    0xffff_ffff_ffff,
    "Destination MAC address",
);
pub const SOURCE: FieldSpec<Mac> = FieldSpec::mac("source", "src_mac", 6, 0, "Source MAC address");

/// The MAC layer: source and destination addresses of the frames.
///
/// The EtherType is held by the [`Ethernet`](crate::models::Ethernet) layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mac {
    destination: MacAddress,
    source: MacAddress,
}

impl ProtocolSpec for Mac {
    const ID: u16 = 100;
    const NAME: &'static str = "Mac";
    const FIELDS: &'static [FieldSpec<Self>] = &[DESTINATION, SOURCE];
}

impl Default for Mac {
    fn default() -> Self {
        Mac {
            destination: MacAddress::new(u64_to_mac(DESTINATION.default_value())),
            source: MacAddress::new(u64_to_mac(SOURCE.default_value())),
        }
    }
}

impl Mac {
    pub fn new(
        destination: impl Into<Assign<MacAddress>>,
        source: impl Into<Assign<MacAddress>>,
    ) -> Self {
        let mut mac = Mac::default();
        mac.set_destination(destination);
        mac.set_source(source);
        mac
    }

    pub fn destination(&self) -> MacAddress {
        self.destination
    }

    pub fn destination_mut(&mut self) -> &mut MacAddress {
        &mut self.destination
    }

    /// Replace the destination address, or its whole program when given a [`MacAddress`].
    pub fn set_destination(&mut self, value: impl Into<Assign<MacAddress>>) {
        value.into().apply(&mut self.destination);
    }

    pub fn source(&self) -> MacAddress {
        self.source
    }

    pub fn source_mut(&mut self) -> &mut MacAddress {
        &mut self.source
    }

    /// Replace the source address, or its whole program when given a [`MacAddress`].
    pub fn set_source(&mut self, value: impl Into<Assign<MacAddress>>) {
        value.into().apply(&mut self.source);
    }

    fn address(&self, field: &FieldSpec<Mac>) -> &MacAddress {
        if *field == DESTINATION {
            &self.destination
        } else {
            &self.source
        }
    }

    fn address_mut(&mut self, field: &FieldSpec<Mac>) -> &mut MacAddress {
        if *field == DESTINATION {
            &mut self.destination
        } else {
            &mut self.source
        }
    }
}

impl Protocol for Mac {
    fn save_fields(&self, record: &mut ProtocolRecord) {
        for field in Self::FIELDS {
            self.address(field).save(field.slot(), record);
        }
    }

    fn fetch_fields(&mut self, record: &ProtocolRecord) -> Result<usize> {
        for field in Self::FIELDS {
            self.address_mut(field).fetch(field.slot(), record)?;
        }
        Ok(0)
    }

    fn dict_entries(&self, dict: &mut Map<String, Value>) {
        for field in Self::FIELDS {
            self.address(field).to_dict(field.name(), dict);
        }
    }

    fn set_entry(&mut self, key: &str, value: &Value) -> Result<bool> {
        match lookup::<Mac>(key, FieldKind::Mac) {
            Some((field, suffix)) => self.address_mut(&field).set_entry(key, suffix, value),
            None => Ok(false),
        }
    }
}

impl Display for Mac {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        render(f, |field: &FieldSpec<Mac>| self.address(field).to_string())
    }
}
