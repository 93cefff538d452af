use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

use serde_json::{Map, Value};

use crate::address::{AddressProgram, Assign, Ipv4Address};
use crate::error::Result;
use crate::header::{lookup, Header};
use crate::protocol::{render, Attributes, Protocol};
use crate::record::ProtocolRecord;
use crate::registry::{FieldKind, FieldSpec, ProtocolSpec};

const LOCALHOST: u64 = 0x7f00_0001;

pub const VERSION: FieldSpec<IPv4> =
    FieldSpec::integer("version", "ver_hdrlen", 0, 0xff, 0xf0, 4, "Version of the protocol")
        .computed("is_override_ver");
pub const HEADER_LENGTH: FieldSpec<IPv4> = FieldSpec::integer(
    "header_length",
    "ver_hdrlen",
    0,
    0xff,
    0x0f,
    5,
    "Internet header length in 4-byte words, from 5 to 15",
)
.computed("is_override_hdrlen");
pub const DSCP: FieldSpec<IPv4> = FieldSpec::integer(
    "dscp",
    "tos",
    1,
    0xff,
    0xfc,
    0,
    "Differentiated services code point, formerly the type of service",
);
pub const ECN: FieldSpec<IPv4> =
    FieldSpec::integer("ecn", "tos", 1, 0xff, 0x03, 0, "Explicit congestion notification");
pub const TOTAL_LENGTH: FieldSpec<IPv4> = FieldSpec::integer(
    "total_length",
    "totlen",
    2,
    0xffff,
    0xffff,
    0,
    "Length of the packet in bytes, header included",
)
.computed("is_override_totlen");
pub const IDENTIFICATION: FieldSpec<IPv4> = FieldSpec::integer(
    "identification",
    "id",
    4,
    0xffff,
    0xffff,
    0,
    "Identifies the fragments of one packet",
);
// The record stores the flags in the low bits of their field, the packet in
// the three high bits of the word shared with the fragment offset.
pub const FLAG_UNUSED: FieldSpec<IPv4> =
    FieldSpec::integer("flag_unused", "flags", 6, 0xff, 0x04, 0, "Reserved flag")
        .packed(0xffff, 13);
pub const FLAG_DF: FieldSpec<IPv4> =
    FieldSpec::integer("flag_df", "flags", 6, 0xff, 0x02, 0, "Don't fragment flag")
        .packed(0xffff, 13);
pub const FLAG_MF: FieldSpec<IPv4> =
    FieldSpec::integer("flag_mf", "flags", 6, 0xff, 0x01, 0, "More fragments flag")
        .packed(0xffff, 13);
pub const FRAGMENTS_OFFSET: FieldSpec<IPv4> = FieldSpec::integer(
    "fragments_offset",
    "frag_ofs",
    6,
    0xffff,
    0x1fff,
    0,
    "Offset of the fragment in the original packet, in 8-byte blocks",
);
pub const TTL: FieldSpec<IPv4> =
    FieldSpec::integer("ttl", "ttl", 8, 0xff, 0xff, 127, "Time to live");
pub const PROTOCOL: FieldSpec<IPv4> = FieldSpec::integer(
    "protocol",
    "proto",
    9,
    0xff,
    0xff,
    0,
    "Protocol of the encapsulated packet",
)
.computed("is_override_proto");
pub const CHECKSUM: FieldSpec<IPv4> =
    FieldSpec::integer("checksum", "cksum", 10, 0xffff, 0xffff, 0, "Header checksum")
        .computed("is_override_cksum");
pub const SOURCE: FieldSpec<IPv4> =
    FieldSpec::ipv4("source", "src_ip", 12, LOCALHOST, "Source IPv4 address");
pub const DESTINATION: FieldSpec<IPv4> =
    FieldSpec::ipv4("destination", "dst_ip", 16, LOCALHOST, "Destination IPv4 address");

/// The IPv4 layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IPv4 {
    header: Header<IPv4>,
    source: Ipv4Address,
    destination: Ipv4Address,
}

impl ProtocolSpec for IPv4 {
    const ID: u16 = 301;
    const NAME: &'static str = "IPv4";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        VERSION,
        HEADER_LENGTH,
        DSCP,
        ECN,
        TOTAL_LENGTH,
        IDENTIFICATION,
        FLAG_UNUSED,
        FLAG_DF,
        FLAG_MF,
        FRAGMENTS_OFFSET,
        TTL,
        PROTOCOL,
        CHECKSUM,
        SOURCE,
        DESTINATION,
    ];
}

impl Default for IPv4 {
    fn default() -> Self {
        IPv4 {
            header: Header::default(),
            source: Ipv4Address::new(Ipv4Addr::from(SOURCE.default_value() as u32)),
            destination: Ipv4Address::new(Ipv4Addr::from(DESTINATION.default_value() as u32)),
        }
    }
}

impl IPv4 {
    pub fn new(
        source: impl Into<Assign<Ipv4Address>>,
        destination: impl Into<Assign<Ipv4Address>>,
    ) -> Self {
        let mut ip = IPv4::default();
        ip.set_source(source);
        ip.set_destination(destination);
        ip
    }

    pub fn source(&self) -> Ipv4Address {
        self.source
    }

    pub fn source_mut(&mut self) -> &mut Ipv4Address {
        &mut self.source
    }

    /// Replace the source address, or its whole program when given an [`Ipv4Address`].
    pub fn set_source(&mut self, value: impl Into<Assign<Ipv4Address>>) {
        value.into().apply(&mut self.source);
    }

    pub fn destination(&self) -> Ipv4Address {
        self.destination
    }

    pub fn destination_mut(&mut self) -> &mut Ipv4Address {
        &mut self.destination
    }

    /// Replace the destination address, or its whole program when given an [`Ipv4Address`].
    pub fn set_destination(&mut self, value: impl Into<Assign<Ipv4Address>>) {
        value.into().apply(&mut self.destination);
    }

    fn address(&self, field: &FieldSpec<IPv4>) -> &Ipv4Address {
        if *field == SOURCE {
            &self.source
        } else {
            &self.destination
        }
    }

    fn address_mut(&mut self, field: &FieldSpec<IPv4>) -> &mut Ipv4Address {
        if *field == SOURCE {
            &mut self.source
        } else {
            &mut self.destination
        }
    }
}

impl Attributes for IPv4 {
    fn header(&self) -> &Header<Self> {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header<Self> {
        &mut self.header
    }
}

impl Protocol for IPv4 {
    fn save_fields(&self, record: &mut ProtocolRecord) {
        self.header.save(record);
        self.source.save(SOURCE.slot(), record);
        self.destination.save(DESTINATION.slot(), record);
    }

    fn fetch_fields(&mut self, record: &ProtocolRecord) -> Result<usize> {
        let bound = self.header.fetch(record);
        self.source.fetch(SOURCE.slot(), record)?;
        self.destination.fetch(DESTINATION.slot(), record)?;
        Ok(bound)
    }

    fn dict_entries(&self, dict: &mut Map<String, Value>) {
        self.header.to_dict(dict);
        self.source.to_dict(SOURCE.name(), dict);
        self.destination.to_dict(DESTINATION.name(), dict);
    }

    fn set_entry(&mut self, key: &str, value: &Value) -> Result<bool> {
        match lookup::<IPv4>(key, FieldKind::Ipv4) {
            Some((field, suffix)) => self.address_mut(&field).set_entry(key, suffix, value),
            None => self.header.set_entry(key, value),
        }
    }
}

impl Display for IPv4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        render(f, |field: &FieldSpec<IPv4>| match field.kind() {
            FieldKind::Ipv4 => self.address(field).to_string(),
            _ => self.header.render(*field),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use crate::address::{AddressProgram, Ipv4Address};
    use crate::models::{ipv4, IPv4};
    use crate::protocol::{Attributes, Protocol};
    use crate::record::CounterType;
    use crate::variable::FieldMode;

    #[test]
    fn test_defaults() {
        let ip = IPv4::default();
        assert_eq!(ip.raw(ipv4::VERSION), 0x45);
        assert_eq!(ip.get(ipv4::TTL), 127);
        assert_eq!(ip.source().address(), Ipv4Addr::LOCALHOST);
        assert_eq!(
            ip.to_string(),
            "IPv4(version=4,header_length=5,dscp=0,ecn=0,total_length=0,identification=0,\
             flag_unused=0,flag_df=0,flag_mf=0,fragments_offset=0,ttl=127,protocol=0,\
             checksum=0,source=127.0.0.1,destination=127.0.0.1)"
        );
    }

    #[test]
    fn test_tos_packing() {
        let mut ip = IPv4::default();
        ip.set(ipv4::DSCP, 46).unwrap();
        ip.set(ipv4::ECN, 1).unwrap();
        assert_eq!(ip.raw(ipv4::DSCP), 0xb9);
        assert!(ip.set(ipv4::DSCP, 64).is_err());
    }

    #[test]
    fn test_flags_and_fragment_offset_are_separate_fields() {
        let mut ip = IPv4::default();
        ip.set(ipv4::FLAG_DF, 1).unwrap();
        ip.set(ipv4::FRAGMENTS_OFFSET, 0x1fff).unwrap();
        let record = ip.to_record();
        assert_eq!(record.field("flags"), Some(2));
        assert_eq!(record.field("frag_ofs"), Some(0x1fff));
    }

    #[test]
    fn test_variable_flag_addresses_packet_bits() {
        let mut ip = IPv4::default();
        ip.set(ipv4::FLAG_DF, 1).unwrap();
        ip.set(ipv4::FLAG_MF, 1).unwrap();
        ip.set_mode(ipv4::FLAG_DF, FieldMode::Decrement);
        let record = ip.to_record();
        assert_eq!(record.field("flags"), None);
        assert_eq!(record.variable_fields.len(), 1);

        let descriptor = &record.variable_fields[0];
        assert_eq!(descriptor.offset, 6);
        assert_eq!(descriptor.mask, 0x4000);
        assert_eq!(descriptor.counter, CounterType::Counter16);
        assert_eq!(descriptor.value, 0x6000);
        assert_eq!(descriptor.step, 0x4000);
        assert_eq!(descriptor.mask & ipv4::FRAGMENTS_OFFSET.mask(), 0);

        let fetched = IPv4::from_record(&record).unwrap();
        assert_eq!(fetched.get(ipv4::FLAG_DF), 1);
        assert_eq!(fetched.get(ipv4::FLAG_MF), 1);
        assert_eq!(fetched.step(ipv4::FLAG_DF), 1);
        assert_eq!(fetched, ip);
    }

    #[test]
    fn test_address_program_record() {
        let mut ip = IPv4::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 1, 1));
        ip.set_destination(Ipv4Address::with_program(
            Ipv4Addr::new(10, 0, 1, 1),
            FieldMode::Increment,
            100,
            1,
            Ipv4Addr::new(255, 255, 0, 0),
        ));
        let record = ip.to_record();
        assert_eq!(record.field("dst_ip_mode"), Some(1));
        assert_eq!(record.field("dst_ip_count"), Some(100));
        assert_eq!(record.field("src_ip"), Some(0x0a00_0001));
        assert_eq!(IPv4::from_record(&record).unwrap(), ip);
    }
}
