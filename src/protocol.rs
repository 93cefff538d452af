//! Behavior shared by all protocol layers.
use std::fmt::{Debug, Display, Formatter};

use log::warn;
use rand::Rng;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::header::Header;
use crate::record::ProtocolRecord;
use crate::registry::{FieldSpec, ProtocolSpec};
use crate::variable::{FieldMode, Sequence};

/// A protocol layer that can be written to and read from wire records and dictionaries.
pub trait Protocol: ProtocolSpec + Clone + Debug + Default + Display + PartialEq {
    /// Write the layer attributes into `record`.
    fn save_fields(&self, record: &mut ProtocolRecord);

    /// Read the layer attributes from `record`.
    /// Returns the number of variable-field descriptors bound to an attribute.
    fn fetch_fields(&mut self, record: &ProtocolRecord) -> Result<usize>;

    /// Add the dictionary entries of the layer to `dict`.
    fn dict_entries(&self, dict: &mut Map<String, Value>);

    /// Apply one dictionary entry. Returns `false` if no attribute claims `key`.
    fn set_entry(&mut self, key: &str, value: &Value) -> Result<bool>;

    /// Serialize the layer into `record`, replacing its variable fields.
    fn save(&self, record: &mut ProtocolRecord) {
        record.protocol_id = Self::ID;
        record.variable_fields.clear();
        self.save_fields(record);
    }

    fn fetch(&mut self, record: &ProtocolRecord) -> Result<()> {
        let bound = self.fetch_fields(record)?;
        if bound < record.variable_fields.len() {
            warn!(
                "{}: {} variable field(s) do not match any attribute",
                Self::NAME,
                record.variable_fields.len() - bound
            );
        }
        Ok(())
    }

    fn to_record(&self) -> ProtocolRecord {
        let mut record = ProtocolRecord::new(Self::ID);
        self.save(&mut record);
        record
    }

    fn from_record(record: &ProtocolRecord) -> Result<Self> {
        let mut protocol = Self::default();
        protocol.fetch(record)?;
        Ok(protocol)
    }

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        self.dict_entries(&mut dict);
        dict
    }

    /// Apply every entry of `dict`, rejecting keys that no attribute claims.
    fn update(&mut self, dict: &Map<String, Value>) -> Result<()> {
        for (key, value) in dict {
            if !self.set_entry(key, value)? {
                return Err(Error::UnknownKey {
                    protocol: Self::NAME.to_string(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build a layer from its defaults and the entries of `dict`.
    fn from_dict(dict: &Map<String, Value>) -> Result<Self> {
        let mut protocol = Self::default();
        protocol.update(dict)?;
        Ok(protocol)
    }
}

/// Typed access to the integer attributes of a protocol.
///
/// ```
/// use ostinato_protocols::models::{ipv4, IPv4};
/// use ostinato_protocols::Attributes;
///
/// let mut ip = IPv4::default();
/// ip.set(ipv4::HEADER_LENGTH, 15).unwrap();
/// ip.set(ipv4::VERSION, 6).unwrap();
/// assert_eq!(ip.get(ipv4::HEADER_LENGTH), 15);
/// assert_eq!(ip.raw(ipv4::VERSION), 0x6f);
/// ```
pub trait Attributes: ProtocolSpec {
    fn header(&self) -> &Header<Self>;

    fn header_mut(&mut self) -> &mut Header<Self>;

    fn get(&self, field: FieldSpec<Self>) -> u64 {
        self.header().get(field)
    }

    fn set(&mut self, field: FieldSpec<Self>, value: u64) -> Result<()> {
        self.header_mut().set(field, value)
    }

    /// Raw value of the binary field holding `field`.
    fn raw(&self, field: FieldSpec<Self>) -> u64 {
        self.header().raw(field)
    }

    fn mode(&self, field: FieldSpec<Self>) -> FieldMode {
        self.header().mode(field)
    }

    fn set_mode(&mut self, field: FieldSpec<Self>, mode: FieldMode) {
        self.header_mut().set_mode(field, mode)
    }

    fn step(&self, field: FieldSpec<Self>) -> u64 {
        self.header().step(field)
    }

    fn set_step(&mut self, field: FieldSpec<Self>, step: u64) -> Result<()> {
        self.header_mut().set_step(field, step)
    }

    fn count(&self, field: FieldSpec<Self>) -> u32 {
        self.header().count(field)
    }

    fn set_count(&mut self, field: FieldSpec<Self>, count: u32) {
        self.header_mut().set_count(field, count)
    }

    fn is_override(&self, field: FieldSpec<Self>) -> bool {
        self.header().is_override(field)
    }

    fn set_override(&mut self, field: FieldSpec<Self>, value: bool) {
        self.header_mut().set_override(field, value)
    }

    /// Values of the binary field holding `field` over the packets of a stream.
    fn sequence<R: Rng>(&self, field: FieldSpec<Self>, rng: R) -> Sequence<R> {
        self.header().sequence(field, rng)
    }
}

/// Write `Name(attribute=value,...)`, in declaration order.
pub(crate) fn render<P, F>(f: &mut Formatter<'_>, value: F) -> std::fmt::Result
where
    P: ProtocolSpec,
    F: Fn(&FieldSpec<P>) -> String,
{
    write!(f, "{}(", P::NAME)?;
    for (i, field) in P::FIELDS.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}={}", field.name(), value(field))?;
    }
    write!(f, ")")
}
