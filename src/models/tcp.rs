use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};

use crate::error::Result;
use crate::header::Header;
use crate::protocol::{render, Attributes, Protocol};
use crate::record::ProtocolRecord;
use crate::registry::{FieldSpec, ProtocolSpec};

pub const SOURCE: FieldSpec<Tcp> =
    FieldSpec::integer("source", "src_port", 0, 0xffff, 0xffff, 49152, "Source port")
        .computed("is_override_src_port");
pub const DESTINATION: FieldSpec<Tcp> =
    FieldSpec::integer("destination", "dst_port", 2, 0xffff, 0xffff, 49153, "Destination port")
        .computed("is_override_dst_port");
pub const SEQUENCE_NUM: FieldSpec<Tcp> = FieldSpec::integer(
    "sequence_num",
    "seq_num",
    4,
    0xffff_ffff,
    0xffff_ffff,
    0,
    "Sequence number, its meaning depends on the SYN flag",
);
pub const ACK_NUM: FieldSpec<Tcp> = FieldSpec::integer(
    "ack_num",
    "ack_num",
    8,
    0xffff_ffff,
    0xffff_ffff,
    0,
    "Acknowledgement number",
);
pub const HEADER_LENGTH: FieldSpec<Tcp> = FieldSpec::integer(
    "header_length",
    "hdrlen_rsvd",
    12,
    0xff,
    0xf0,
    0,
    "Size of the header in 4-byte words, also known as data offset",
)
.computed("is_override_hdrlen");
pub const RESERVED: FieldSpec<Tcp> =
    FieldSpec::integer("reserved", "hdrlen_rsvd", 12, 0xff, 0x0e, 0, "Reserved, must be zero");
pub const FLAG_NS: FieldSpec<Tcp> =
    FieldSpec::integer("flag_ns", "hdrlen_rsvd", 12, 0xff, 0x01, 0, "ECN-nonce flag");
pub const FLAG_CWR: FieldSpec<Tcp> =
    FieldSpec::integer("flag_cwr", "flags", 13, 0xff, 0x80, 0, "Congestion window reduced flag");
pub const FLAG_ECE: FieldSpec<Tcp> =
    FieldSpec::integer("flag_ece", "flags", 13, 0xff, 0x40, 0, "ECN-echo flag");
pub const FLAG_URG: FieldSpec<Tcp> =
    FieldSpec::integer("flag_urg", "flags", 13, 0xff, 0x20, 0, "Urgent pointer flag");
pub const FLAG_ACK: FieldSpec<Tcp> =
    FieldSpec::integer("flag_ack", "flags", 13, 0xff, 0x10, 0, "Acknowledgement flag");
pub const FLAG_PSH: FieldSpec<Tcp> =
    FieldSpec::integer("flag_psh", "flags", 13, 0xff, 0x08, 0, "Push flag");
pub const FLAG_RST: FieldSpec<Tcp> =
    FieldSpec::integer("flag_rst", "flags", 13, 0xff, 0x04, 0, "Reset flag");
pub const FLAG_SYN: FieldSpec<Tcp> =
    FieldSpec::integer("flag_syn", "flags", 13, 0xff, 0x02, 0, "Synchronize flag");
pub const FLAG_FIN: FieldSpec<Tcp> =
    FieldSpec::integer("flag_fin", "flags", 13, 0xff, 0x01, 0, "No more data flag");
pub const WINDOW_SIZE: FieldSpec<Tcp> =
    FieldSpec::integer("window_size", "window", 14, 0xffff, 0xffff, 0, "Receive window size");
pub const CHECKSUM: FieldSpec<Tcp> = FieldSpec::integer(
    "checksum",
    "cksum",
    16,
    0xffff,
    0xffff,
    0,
    "Checksum over the pseudo-header",
)
.computed("is_override_cksum");
pub const URGENT_POINTER: FieldSpec<Tcp> =
    FieldSpec::integer("urgent_pointer", "urg_ptr", 18, 0xffff, 0xffff, 0, "Urgent pointer");

/// A TCP segment header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tcp {
    header: Header<Tcp>,
}

impl ProtocolSpec for Tcp {
    const ID: u16 = 400;
    const NAME: &'static str = "Tcp";
    const FIELDS: &'static [FieldSpec<Self>] = &[
        SOURCE,
        DESTINATION,
        SEQUENCE_NUM,
        ACK_NUM,
        HEADER_LENGTH,
        RESERVED,
        FLAG_NS,
        FLAG_CWR,
        FLAG_ECE,
        FLAG_URG,
        FLAG_ACK,
        FLAG_PSH,
        FLAG_RST,
        FLAG_SYN,
        FLAG_FIN,
        WINDOW_SIZE,
        CHECKSUM,
        URGENT_POINTER,
    ];
}

impl Tcp {
    pub fn new(source: u16, destination: u16) -> Self {
        let mut tcp = Tcp::default();
        tcp.header.set_u16(SOURCE, source);
        tcp.header.set_u16(DESTINATION, destination);
        tcp
    }

    /// Names of the flags that are set, e.g. `["SYN", "ACK"]`.
    pub fn flags(&self) -> Vec<&'static str> {
        [
            (FLAG_CWR, "CWR"),
            (FLAG_ECE, "ECE"),
            (FLAG_URG, "URG"),
            (FLAG_ACK, "ACK"),
            (FLAG_PSH, "PSH"),
            (FLAG_RST, "RST"),
            (FLAG_SYN, "SYN"),
            (FLAG_FIN, "FIN"),
        ]
        .into_iter()
        .filter(|(field, _)| self.get(*field) == 1)
        .map(|(_, name)| name)
        .collect()
    }
}

impl Attributes for Tcp {
    fn header(&self) -> &Header<Self> {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header<Self> {
        &mut self.header
    }
}

impl Protocol for Tcp {
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

impl Display for Tcp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        render(f, |field: &FieldSpec<Tcp>| self.header.render(*field))
    }
}
