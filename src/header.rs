//! Table-driven storage of the integer attributes of a protocol.
//!
//! A [`Header`] holds one raw integer per binary field declared in the
//! protocol table, plus the variable-field program and override flag of each
//! attribute. Attributes sharing a binary field read and write their own bits
//! of the same integer.
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use log::debug;
use rand::Rng;
use serde_json::{Map, Value};

use crate::codec::{extract, inject};
use crate::error::{Error, Result};
use crate::record::ProtocolRecord;
use crate::registry::{FieldKind, FieldSpec, ProtocolSpec};
use crate::utilities::{parse_hex, parse_variant};
use crate::variable::{FieldMode, Sequence, VariableField};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct AttributeState {
    program: VariableField,
    is_override: bool,
}

/// Integer attributes of protocol `P`.
pub struct Header<P> {
    raw: BTreeMap<&'static str, u64>,
    states: Vec<AttributeState>,
    protocol: PhantomData<fn() -> P>,
}

impl<P: ProtocolSpec> Default for Header<P> {
    fn default() -> Self {
        let mut raw = BTreeMap::new();
        let mut states = Vec::with_capacity(P::FIELDS.len());
        for field in P::FIELDS {
            if field.kind() == FieldKind::Integer {
                let value = raw.entry(field.slot()).or_insert(0);
                *value = inject(*value, field.default_value(), field.mask(), field.shift());
            }
            states.push(AttributeState {
                program: VariableField::new(field.shift()),
                is_override: false,
            });
        }
        Header {
            raw,
            states,
            protocol: PhantomData,
        }
    }
}

impl<P> Clone for Header<P> {
    fn clone(&self) -> Self {
        Header {
            raw: self.raw.clone(),
            states: self.states.clone(),
            protocol: PhantomData,
        }
    }
}

impl<P> PartialEq for Header<P> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.states == other.states
    }
}

impl<P> Eq for Header<P> {}

impl<P> Debug for Header<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("raw", &self.raw)
            .field("states", &self.states)
            .finish()
    }
}

impl<P: ProtocolSpec> Header<P> {
    fn index(field: &FieldSpec<P>) -> usize {
        P::FIELDS
            .iter()
            .position(|declared| declared == field)
            .unwrap_or_else(|| unreachable!("{} is not an attribute of {}", field.name(), P::NAME))
    }

    fn integers() -> impl Iterator<Item = &'static FieldSpec<P>> {
        P::FIELDS
            .iter()
            .filter(|field| field.kind() == FieldKind::Integer)
    }

    /// Raw value of the binary field holding `field`.
    pub fn raw(&self, field: FieldSpec<P>) -> u64 {
        self.raw.get(field.slot()).copied().unwrap_or(0)
    }

    fn set_raw(&mut self, field: &FieldSpec<P>, value: u64) {
        self.raw.insert(field.slot(), value);
    }

    pub fn get(&self, field: FieldSpec<P>) -> u64 {
        extract(self.raw(field), field.mask(), field.shift())
    }

    /// Set the value of an attribute, leaving the other bits of its binary field untouched.
    pub fn set(&mut self, field: FieldSpec<P>, value: u64) -> Result<()> {
        check_range(&field, value)?;
        let raw = inject(self.raw(field), value, field.mask(), field.shift());
        self.set_raw(&field, raw);
        Ok(())
    }

    /// Set a 16-bit attribute. Bits outside the attribute mask are dropped.
    pub(crate) fn set_u16(&mut self, field: FieldSpec<P>, value: u16) {
        let raw = inject(self.raw(field), value.into(), field.mask(), field.shift());
        self.set_raw(&field, raw);
    }

    pub fn program(&self, field: FieldSpec<P>) -> &VariableField {
        &self.states[Self::index(&field)].program
    }

    fn program_mut(&mut self, field: &FieldSpec<P>) -> &mut VariableField {
        &mut self.states[Self::index(field)].program
    }

    pub fn mode(&self, field: FieldSpec<P>) -> FieldMode {
        self.program(field).mode()
    }

    pub fn set_mode(&mut self, field: FieldSpec<P>, mode: FieldMode) {
        self.program_mut(&field).set_mode(mode);
    }

    /// Step of the attribute, in attribute units.
    pub fn step(&self, field: FieldSpec<P>) -> u64 {
        self.program(field).step(field.shift())
    }

    pub fn set_step(&mut self, field: FieldSpec<P>, step: u64) -> Result<()> {
        check_range(&field, step)?;
        self.program_mut(&field).set_step(step, field.shift());
        Ok(())
    }

    pub fn count(&self, field: FieldSpec<P>) -> u32 {
        self.program(field).count()
    }

    pub fn set_count(&mut self, field: FieldSpec<P>, count: u32) {
        self.program_mut(&field).set_count(count);
    }

    /// Whether the explicit value of a computed attribute is used on the wire.
    pub fn is_override(&self, field: FieldSpec<P>) -> bool {
        self.states[Self::index(&field)].is_override
    }

    /// Set the override flag of an attribute.
    ///
    /// The flag is only written to the wire for computed attributes.
    pub fn set_override(&mut self, field: FieldSpec<P>, value: bool) {
        self.states[Self::index(&field)].is_override = value;
    }

    /// Binary field values of the packets of a stream, as generated from `field`'s program.
    pub fn sequence<R: Rng>(&self, field: FieldSpec<P>, rng: R) -> Sequence<R> {
        self.program(field)
            .sequence(self.raw(field), field.mask(), rng)
    }

    /// Write every integer attribute into `record`.
    ///
    /// Fixed attributes write their binary field into the static fields, the
    /// others append a variable-field descriptor instead.
    pub fn save(&self, record: &mut ProtocolRecord) {
        for field in Self::integers() {
            let state = &self.states[Self::index(field)];
            let raw = self.raw(*field);
            let shift = field.packet_shift();
            match state.program.to_record(
                field.offset(),
                field.packet_mask(),
                field.counter(),
                raw << shift,
            ) {
                None => record.set_field(field.slot(), raw),
                Some(mut descriptor) => {
                    descriptor.step <<= shift;
                    debug!(
                        "{}.{}: variable field {:?} with step {}",
                        P::NAME,
                        field.name(),
                        descriptor.mode,
                        descriptor.step
                    );
                    record.variable_fields.push(descriptor);
                }
            }
            if let Some(slot) = field.override_slot() {
                record.set_override(slot, state.is_override);
            }
        }
    }

    /// Read every integer attribute from `record`.
    ///
    /// A variable-field descriptor matching the attribute offset and mask takes
    /// precedence over the static field. Returns the number of descriptors used.
    pub fn fetch(&mut self, record: &ProtocolRecord) -> usize {
        let mut bound = 0;
        for field in Self::integers() {
            let index = Self::index(field);
            match record.variable_field(field.offset(), field.packet_mask()) {
                Some(descriptor) => {
                    debug!("{}.{}: bound variable field", P::NAME, field.name());
                    let shift = field.packet_shift();
                    self.set_raw(field, (descriptor.value >> shift) & field.full_mask());
                    let program = &mut self.states[index].program;
                    program.load_record(descriptor);
                    program.set_step(descriptor.step >> shift, 0);
                    bound += 1;
                }
                None => {
                    if let Some(raw) = record.field(field.slot()) {
                        self.set_raw(field, raw);
                    }
                    self.states[index].program = VariableField::new(field.shift());
                }
            }
            if let Some(slot) = field.override_slot() {
                self.states[index].is_override = record.is_override(slot);
            }
        }
        bound
    }

    /// Add the dictionary entries of every integer attribute to `dict`.
    pub fn to_dict(&self, dict: &mut Map<String, Value>) {
        for field in Self::integers() {
            let name = field.name();
            dict.insert(name.to_string(), self.get(*field).into());
            dict.insert(format!("{name}_mode"), self.mode(*field).to_string().into());
            dict.insert(format!("{name}_step"), self.step(*field).into());
            dict.insert(format!("{name}_count"), self.count(*field).into());
            if field.is_computed() {
                dict.insert(format!("{name}_override"), self.is_override(*field).into());
            }
        }
    }

    /// Apply one dictionary entry. Returns `false` if no integer attribute claims `key`.
    pub fn set_entry(&mut self, key: &str, value: &Value) -> Result<bool> {
        let Some((field, suffix)) = lookup::<P>(key, FieldKind::Integer) else {
            return Ok(false);
        };
        match suffix {
            "" => self.set(field, integer(key, value)?)?,
            "_mode" => self.set_mode(field, parse_variant(string(key, value)?)?),
            "_step" => self.set_step(field, integer(key, value)?)?,
            "_count" => self.set_count(field, count(key, value)?),
            "_override" if field.is_computed() => self.set_override(field, boolean(key, value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Rendered value of an integer attribute.
    pub fn render(&self, field: FieldSpec<P>) -> String {
        self.get(field).to_string()
    }
}

fn check_range<P>(field: &FieldSpec<P>, value: u64) -> Result<()> {
    if value > field.max_value() {
        return Err(Error::ValueOutOfRange {
            attribute: field.name().to_string(),
            value,
            max: field.max_value(),
        });
    }
    Ok(())
}

/// Find the attribute of kind `kind` addressed by a dictionary key, and the key suffix.
pub(crate) fn lookup<P: ProtocolSpec>(
    key: &str,
    kind: FieldKind,
) -> Option<(FieldSpec<P>, &str)> {
    if let Some(field) = P::field(key).filter(|field| field.kind() == kind) {
        return Some((field, ""));
    }
    let (name, _) = key.rsplit_once('_')?;
    let field = P::field(name).filter(|field| field.kind() == kind)?;
    Some((field, &key[name.len()..]))
}

pub(crate) fn integer(key: &str, value: &Value) -> Result<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| Error::invalid_value(key, "expected an unsigned integer")),
        Value::String(string) => parse_hex(string).map_err(|_| {
            Error::invalid_value(key, format!("cannot parse {string:?} as hexadecimal"))
        }),
        _ => Err(Error::invalid_value(key, "expected an integer or hexadecimal string")),
    }
}

pub(crate) fn count(key: &str, value: &Value) -> Result<u32> {
    let count = value
        .as_u64()
        .ok_or_else(|| Error::invalid_value(key, "expected an unsigned integer"))?;
    u32::try_from(count).map_err(|error| Error::invalid_value(key, error))
}

pub(crate) fn string<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::invalid_value(key, "expected a string"))
}

pub(crate) fn boolean(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::invalid_value(key, "expected a boolean"))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use crate::error::Error;
    use crate::header::Header;
    use crate::record::ProtocolRecord;
    use crate::registry::{FieldSpec, ProtocolSpec};
    use crate::variable::FieldMode;

    struct Toy;

    const HIGH: FieldSpec<Toy> = FieldSpec::integer("high", "byte", 0, 0xff, 0xf0, 4, "");
    const LOW: FieldSpec<Toy> =
        FieldSpec::integer("low", "byte", 0, 0xff, 0x0f, 5, "").computed("is_override_low");
    const WORD: FieldSpec<Toy> = FieldSpec::integer("word", "word", 2, 0xffff, 0xffff, 0, "");

    impl ProtocolSpec for Toy {
        const ID: u16 = 1;
        const NAME: &'static str = "Toy";
        const FIELDS: &'static [FieldSpec<Self>] = &[HIGH, LOW, WORD];
    }

    #[test]
    fn test_defaults_share_binary_field() {
        let header = Header::<Toy>::default();
        assert_eq!(header.raw(HIGH), 0x45);
        assert_eq!(header.raw(LOW), 0x45);
        assert_eq!(header.get(HIGH), 4);
        assert_eq!(header.get(LOW), 5);
        assert_eq!(header.get(WORD), 0);
    }

    #[test]
    fn test_set_out_of_range() {
        let mut header = Header::<Toy>::default();
        assert_eq!(
            header.set(LOW, 16),
            Err(Error::ValueOutOfRange {
                attribute: "low".to_string(),
                value: 16,
                max: 15
            })
        );
        assert_eq!(header.get(LOW), 5);
        assert!(header.set_step(HIGH, 16).is_err());
    }

    #[test]
    fn test_save_fixed() {
        let header = Header::<Toy>::default();
        let mut record = ProtocolRecord::new(Toy::ID);
        header.save(&mut record);
        assert_eq!(record.field("byte"), Some(0x45));
        assert_eq!(record.field("word"), Some(0));
        assert_eq!(record.overrides.get("is_override_low"), Some(&false));
        assert!(record.variable_fields.is_empty());
    }

    #[test]
    fn test_save_fetch_variable() {
        let mut header = Header::<Toy>::default();
        header.set_mode(WORD, FieldMode::Random);
        header.set_count(WORD, 7);
        header.set(WORD, 0xbeef).unwrap();

        let mut record = ProtocolRecord::new(Toy::ID);
        header.save(&mut record);
        assert_eq!(record.field("word"), None);
        assert_eq!(record.variable_fields.len(), 1);

        let mut fetched = Header::<Toy>::default();
        assert_eq!(fetched.fetch(&record), 1);
        assert_eq!(fetched, header);
    }

    #[test]
    fn test_fetch_missing_field_keeps_value() {
        let mut header = Header::<Toy>::default();
        header.fetch(&ProtocolRecord::new(Toy::ID));
        assert_eq!(header, Header::<Toy>::default());
    }

    #[test]
    fn test_fetch_resets_unbound_programs() {
        let mut header = Header::<Toy>::default();
        header.set_mode(WORD, FieldMode::Increment);
        header.set_step(WORD, 7).unwrap();
        header.set_count(WORD, 99);
        let mut record = ProtocolRecord::new(Toy::ID);
        header.save(&mut record);

        let mut fetched = Header::<Toy>::default();
        assert_eq!(fetched.fetch(&record), 1);
        assert_eq!(fetched.step(WORD), 7);

        let mut record = ProtocolRecord::new(Toy::ID);
        Header::<Toy>::default().save(&mut record);
        assert_eq!(fetched.fetch(&record), 0);
        assert_eq!(fetched, Header::<Toy>::default());
    }

    #[test]
    fn test_dict_entries() {
        let mut header = Header::<Toy>::default();
        let mut dict = Map::new();
        header.to_dict(&mut dict);
        assert_eq!(dict.len(), 13);
        assert_eq!(dict["high"], json!(4));
        assert_eq!(dict["high_mode"], json!("FIXED"));
        assert_eq!(dict["high_step"], json!(1));
        assert_eq!(dict["low_override"], json!(false));
        assert!(!dict.contains_key("high_override"));

        assert!(header.set_entry("word", &json!("0x0800")).unwrap());
        assert!(header.set_entry("low_mode", &json!("DECREMENT")).unwrap());
        assert!(header.set_entry("low_override", &json!(true)).unwrap());
        assert!(!header.set_entry("high_override", &json!(true)).unwrap());
        assert!(!header.set_entry("unknown", &json!(1)).unwrap());
        assert_eq!(header.get(WORD), 0x0800);
        assert_eq!(header.mode(LOW), FieldMode::Decrement);
        assert!(header.is_override(LOW));
    }

    #[test]
    fn test_dict_invalid_values() {
        let mut header = Header::<Toy>::default();
        assert!(matches!(
            header.set_entry("low_mode", &json!("UPWARDS")),
            Err(Error::InvalidMode { .. })
        ));
        assert!(matches!(
            header.set_entry("high", &Value::Bool(true)),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            header.set_entry("high_count", &json!(-1)),
            Err(Error::InvalidValue { .. })
        ));
    }
}
