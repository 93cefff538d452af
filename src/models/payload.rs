use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};
use strum::{Display, EnumString, EnumVariantNames, FromRepr};

use crate::error::{Error, Result};
use crate::header::{integer, string};
use crate::protocol::Protocol;
use crate::record::ProtocolRecord;
use crate::registry::{FieldSpec, ProtocolSpec};
use crate::utilities::{format_hex, parse_variant};

/// How the payload bytes are generated from the pattern word.
#[derive(
    Copy, Clone, Debug, Default, Display, EnumString, EnumVariantNames, FromRepr, PartialEq, Eq,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PayloadMode {
    /// The pattern word, repeated.
    #[default]
    FixedWord = 0,
    IncrementByte = 1,
    DecrementByte = 2,
    Random = 3,
}

/// The payload of the packets, generated from a 32-bit pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    pattern: u32,
    mode: PayloadMode,
}

impl ProtocolSpec for Payload {
    const ID: u16 = 101;
    const NAME: &'static str = "Payload";
    const FIELDS: &'static [FieldSpec<Self>] = &[];
}

impl Payload {
    pub fn new(pattern: u32, mode: PayloadMode) -> Self {
        Payload { pattern, mode }
    }

    /// Initial payload word.
    pub fn pattern(&self) -> u32 {
        self.pattern
    }

    pub fn set_pattern(&mut self, pattern: u32) {
        self.pattern = pattern;
    }

    pub fn mode(&self) -> PayloadMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PayloadMode) {
        self.mode = mode;
    }

    /// The pattern as spaced hexadecimal bytes, e.g. `00 00 00 00`.
    pub fn pattern_hex(&self) -> String {
        format_hex(self.pattern as u64, 4)
    }
}

impl Protocol for Payload {
    fn save_fields(&self, record: &mut ProtocolRecord) {
        record.set_field("pattern", self.pattern as u64);
        record.set_field("pattern_mode", self.mode as u64);
    }

    fn fetch_fields(&mut self, record: &ProtocolRecord) -> Result<usize> {
        if let Some(pattern) = record.field("pattern") {
            self.pattern = u32::try_from(pattern)
                .map_err(|error| Error::invalid_value("pattern", error))?;
        }
        if let Some(mode) = record.field("pattern_mode") {
            self.mode = u8::try_from(mode)
                .ok()
                .and_then(PayloadMode::from_repr)
                .ok_or_else(|| Error::InvalidMode {
                    value: mode.to_string(),
                    expected: "0,1,2,3".to_string(),
                })?;
        }
        Ok(0)
    }

    fn dict_entries(&self, dict: &mut Map<String, Value>) {
        dict.insert("pattern".to_string(), self.pattern_hex().into());
        dict.insert("mode".to_string(), self.mode.to_string().into());
    }

    fn set_entry(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "pattern" => {
                let pattern = integer(key, value)?;
                self.pattern = u32::try_from(pattern).map_err(|_| Error::ValueOutOfRange {
                    attribute: key.to_string(),
                    value: pattern,
                    max: u32::MAX as u64,
                })?;
            }
            "mode" => self.mode = parse_variant(string(key, value)?)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(pattern={},mode={})",
            Self::NAME,
            self.pattern_hex(),
            self.mode
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::error::Error;
    use crate::models::{Payload, PayloadMode};
    use crate::protocol::Protocol;
    use crate::record::ProtocolRecord;

    #[test]
    fn test_defaults() {
        let payload = Payload::default();
        assert_eq!(payload.to_string(), "Payload(pattern=00 00 00 00,mode=FIXED_WORD)");
    }

    #[test]
    fn test_record_round_trip() {
        let payload = Payload::new(0xdeadbeef, PayloadMode::DecrementByte);
        let record = payload.to_record();
        assert_eq!(record.field("pattern"), Some(0xdeadbeef));
        assert_eq!(record.field("pattern_mode"), Some(2));
        assert_eq!(Payload::from_record(&record).unwrap(), payload);
    }

    #[test]
    fn test_invalid_wire_mode() {
        let mut record = ProtocolRecord::new(101);
        record.set_field("pattern_mode", 7);
        assert!(matches!(
            Payload::from_record(&record),
            Err(Error::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_dict() {
        let payload = Payload::new(0x0102_0304, PayloadMode::Random);
        let dict = payload.to_dict();
        assert_eq!(dict["pattern"], json!("01 02 03 04"));
        assert_eq!(dict["mode"], json!("RANDOM"));
        assert_eq!(Payload::from_dict(&dict).unwrap(), payload);

        let dict = json!({"pattern": "0x1122334455"});
        assert!(matches!(
            Payload::from_dict(dict.as_object().unwrap()),
            Err(Error::ValueOutOfRange { .. })
        ));
        let dict = json!({"mode": "INCREMENT"});
        assert!(matches!(
            Payload::from_dict(dict.as_object().unwrap()),
            Err(Error::InvalidMode { .. })
        ));
    }
}
