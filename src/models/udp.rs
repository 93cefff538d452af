use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};

use crate::error::Result;
use crate::header::Header;
use crate::protocol::{render, Attributes, Protocol};
use crate::record::ProtocolRecord;
use crate::registry::{FieldSpec, ProtocolSpec};

pub const SOURCE: FieldSpec<Udp> =
    FieldSpec::integer("source", "src_port", 0, 0xffff, 0xffff, 49152, "Source port")
        .computed("is_override_src_port");
pub const DESTINATION: FieldSpec<Udp> =
    FieldSpec::integer("destination", "dst_port", 2, 0xffff, 0xffff, 49153, "Destination port")
        .computed("is_override_dst_port");
pub const LENGTH: FieldSpec<Udp> = FieldSpec::integer(
    "length",
    "totlen",
    4,
    0xffff,
    0xffff,
    0,
    "Length of the datagram, header and payload",
)
.computed("is_override_totlen");
pub const CHECKSUM: FieldSpec<Udp> =
    FieldSpec::integer("checksum", "cksum", 6, 0xffff, 0xffff, 0, "Checksum over the pseudo-header")
        .computed("is_override_cksum");

/// A UDP datagram header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Udp {
    header: Header<Udp>,
}

impl ProtocolSpec for Udp {
    const ID: u16 = 401;
    const NAME: &'static str = "Udp";
    const FIELDS: &'static [FieldSpec<Self>] = &[SOURCE, DESTINATION, LENGTH, CHECKSUM];
}

impl Udp {
    pub fn new(source: u16, destination: u16) -> Self {
        let mut udp = Udp::default();
        udp.header.set_u16(SOURCE, source);
        udp.header.set_u16(DESTINATION, destination);
        udp
    }
}

impl Attributes for Udp {
    fn header(&self) -> &Header<Self> {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header<Self> {
        &mut self.header
    }
}

impl Protocol for Udp {
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

impl Display for Udp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        render(f, |field: &FieldSpec<Udp>| self.header.render(*field))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{udp, Udp};
    use crate::protocol::{Attributes, Protocol};
    use crate::variable::FieldMode;

    #[test]
    fn test_defaults() {
        let datagram = Udp::default();
        assert_eq!(
            datagram.to_string(),
            "Udp(source=49152,destination=49153,length=0,checksum=0)"
        );
    }

    #[test]
    fn test_new_ports() {
        let datagram = Udp::new(u16::MAX, 0);
        assert_eq!(datagram.get(udp::SOURCE), 0xffff);
        assert_eq!(datagram.get(udp::DESTINATION), 0);
    }

    #[test]
    fn test_random_source_port() {
        let mut datagram = Udp::new(5000, 53);
        datagram.set_mode(udp::SOURCE, FieldMode::Random);
        datagram.set_count(udp::SOURCE, 0);
        let record = datagram.to_record();
        assert_eq!(record.field("src_port"), None);
        assert_eq!(record.field("dst_port"), Some(53));
        assert_eq!(record.variable_fields.len(), 1);
        assert_eq!(record.variable_fields[0].value, 5000);
        assert_eq!(Udp::from_record(&record).unwrap(), datagram);
    }
}
