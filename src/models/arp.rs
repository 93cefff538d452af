use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

use pnet::packet::arp::ArpOperations;
use pnet::packet::ethernet::EtherTypes;
use serde_json::{Map, Value};

use crate::address::{AddressProgram, Assign, Ipv4Address, MacAddress};
use crate::error::Result;
use crate::header::{lookup, Header};
use crate::protocol::{render, Attributes, Protocol};
use crate::record::ProtocolRecord;
use crate::registry::{FieldKind, FieldSpec, ProtocolSpec};

pub const HARDWARE_TYPE: FieldSpec<Arp> = FieldSpec::integer(
    "hardware_type",
    "hw_type",
    0,
    0xffff,
    0xffff,
    1,
    "Hardware type, 1 for Ethernet",
);
pub const PROTOCOL_TYPE: FieldSpec<Arp> = FieldSpec::integer(
    "protocol_type",
    "proto_type",
    2,
    0xffff,
    0xffff,
    EtherTypes::Ipv4.0 as u64,
    "EtherType of the resolved protocol",
);
pub const HARDWARE_LENGTH: FieldSpec<Arp> = FieldSpec::integer(
    "hardware_length",
    "hw_addr_len",
    4,
    0xff,
    0xff,
    6,
    "Length of a hardware address",
)
.computed("is_override_hw_addr_len");
pub const PROTOCOL_LENGTH: FieldSpec<Arp> = FieldSpec::integer(
    "protocol_length",
    "proto_addr_len",
    5,
    0xff,
    0xff,
    4,
    "Length of a protocol address",
)
.computed("is_override_proto_addr_len");
pub const OPCODE: FieldSpec<Arp> = FieldSpec::integer(
    "opcode",
    "op_code",
    6,
    0xffff,
    0xffff,
    ArpOperations::Request.0 as u64,
    "Operation, 1 for a request and 2 for a reply",
);
pub const SENDER_HW_ADDRESS: FieldSpec<Arp> =
    FieldSpec::mac("sender_hw_address", "sender_hw_addr", 8, 0, "Sender MAC address");
pub const SENDER_PROTO_ADDRESS: FieldSpec<Arp> =
    FieldSpec::ipv4("sender_proto_address", "sender_proto_addr", 14, 0, "Sender IPv4 address");
pub const TARGET_HW_ADDRESS: FieldSpec<Arp> =
    FieldSpec::mac("target_hw_address", "target_hw_addr", 18, 0, "Target MAC address");
pub const TARGET_PROTO_ADDRESS: FieldSpec<Arp> =
    FieldSpec::ipv4("target_proto_address", "target_proto_addr", 24, 0, "Target IPv4 address");

/// An ARP message for IPv4 over Ethernet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Arp {
    header: Header<Arp>,
    sender_hw_address: MacAddress,
    sender_proto_address: Ipv4Address,
    target_hw_address: MacAddress,
    target_proto_address: Ipv4Address,
}

impl ProtocolSpec for Arp {
    const ID: u16 = 300;
    const NAME: &'static str = "Arp";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        HARDWARE_TYPE,
        PROTOCOL_TYPE,
        HARDWARE_LENGTH,
        PROTOCOL_LENGTH,
        OPCODE,
        SENDER_HW_ADDRESS,
        SENDER_PROTO_ADDRESS,
        TARGET_HW_ADDRESS,
        TARGET_PROTO_ADDRESS,
    ];
}

impl Arp {
    pub fn sender_hw_address(&self) -> MacAddress {
        self.sender_hw_address
    }

    pub fn sender_hw_address_mut(&mut self) -> &mut MacAddress {
        &mut self.sender_hw_address
    }

    pub fn set_sender_hw_address(&mut self, value: impl Into<Assign<MacAddress>>) {
        value.into().apply(&mut self.sender_hw_address);
    }

    pub fn sender_proto_address(&self) -> Ipv4Address {
        self.sender_proto_address
    }

    pub fn sender_proto_address_mut(&mut self) -> &mut Ipv4Address {
        &mut self.sender_proto_address
    }

    pub fn set_sender_proto_address(&mut self, value: impl Into<Assign<Ipv4Address>>) {
        value.into().apply(&mut self.sender_proto_address);
    }

    pub fn target_hw_address(&self) -> MacAddress {
        self.target_hw_address
    }

    pub fn target_hw_address_mut(&mut self) -> &mut MacAddress {
        &mut self.target_hw_address
    }

    pub fn set_target_hw_address(&mut self, value: impl Into<Assign<MacAddress>>) {
        value.into().apply(&mut self.target_hw_address);
    }

    pub fn target_proto_address(&self) -> Ipv4Address {
        self.target_proto_address
    }

    pub fn target_proto_address_mut(&mut self) -> &mut Ipv4Address {
        &mut self.target_proto_address
    }

    pub fn set_target_proto_address(&mut self, value: impl Into<Assign<Ipv4Address>>) {
        value.into().apply(&mut self.target_proto_address);
    }

    /// A request for the hardware address of `target`.
    pub fn request(sender: MacAddress, sender_ip: Ipv4Addr, target: Ipv4Addr) -> Self {
        let mut arp = Arp::default();
        arp.set_sender_hw_address(sender);
        arp.set_sender_proto_address(sender_ip);
        arp.set_target_proto_address(target);
        arp
    }

    fn mac(&self, field: &FieldSpec<Arp>) -> &MacAddress {
        if *field == SENDER_HW_ADDRESS {
            &self.sender_hw_address
        } else {
            &self.target_hw_address
        }
    }

    fn mac_mut(&mut self, field: &FieldSpec<Arp>) -> &mut MacAddress {
        if *field == SENDER_HW_ADDRESS {
            &mut self.sender_hw_address
        } else {
            &mut self.target_hw_address
        }
    }

    fn ipv4(&self, field: &FieldSpec<Arp>) -> &Ipv4Address {
        if *field == SENDER_PROTO_ADDRESS {
            &self.sender_proto_address
        } else {
            &self.target_proto_address
        }
    }

    fn ipv4_mut(&mut self, field: &FieldSpec<Arp>) -> &mut Ipv4Address {
        if *field == SENDER_PROTO_ADDRESS {
            &mut self.sender_proto_address
        } else {
            &mut self.target_proto_address
        }
    }
}

impl Attributes for Arp {
    fn header(&self) -> &Header<Self> {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header<Self> {
        &mut self.header
    }
}

impl Protocol for Arp {
    fn save_fields(&self, record: &mut ProtocolRecord) {
        self.header.save(record);
        for field in Self::FIELDS {
            match field.kind() {
                FieldKind::Integer => {}
                FieldKind::Mac => self.mac(field).save(field.slot(), record),
                FieldKind::Ipv4 => self.ipv4(field).save(field.slot(), record),
            }
        }
    }

    fn fetch_fields(&mut self, record: &ProtocolRecord) -> Result<usize> {
        let bound = self.header.fetch(record);
        for field in Self::FIELDS {
            match field.kind() {
                FieldKind::Integer => {}
                FieldKind::Mac => self.mac_mut(field).fetch(field.slot(), record)?,
                FieldKind::Ipv4 => self.ipv4_mut(field).fetch(field.slot(), record)?,
            }
        }
        Ok(bound)
    }

    fn dict_entries(&self, dict: &mut Map<String, Value>) {
        self.header.to_dict(dict);
        for field in Self::FIELDS {
            match field.kind() {
                FieldKind::Integer => {}
                FieldKind::Mac => self.mac(field).to_dict(field.name(), dict),
                FieldKind::Ipv4 => self.ipv4(field).to_dict(field.name(), dict),
            }
        }
    }

    fn set_entry(&mut self, key: &str, value: &Value) -> Result<bool> {
        if let Some((field, suffix)) = lookup::<Arp>(key, FieldKind::Mac) {
            return self.mac_mut(&field).set_entry(key, suffix, value);
        }
        if let Some((field, suffix)) = lookup::<Arp>(key, FieldKind::Ipv4) {
            return self.ipv4_mut(&field).set_entry(key, suffix, value);
        }
        self.header.set_entry(key, value)
    }
}

impl Display for Arp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        render(f, |field: &FieldSpec<Arp>| match field.kind() {
            FieldKind::Integer => self.header.render(*field),
            FieldKind::Mac => self.mac(field).to_string(),
            FieldKind::Ipv4 => self.ipv4(field).to_string(),
        })
    }
}
