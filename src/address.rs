//! Address attributes with their own generation program.
//!
//! MAC and IPv4 addresses are not plain integers: each carries a mode, a count
//! and a step (plus a mask for IPv4 addresses, selecting the varying bits).
//!
//! Assigning a bare address to an attribute only replaces the address and
//! keeps the configured program, while assigning an address object replaces
//! the whole program:
//!
//! ```
//! use ostinato_protocols::address::MacAddress;
//! use ostinato_protocols::models::Mac;
//! use ostinato_protocols::utilities::parse_mac;
//! use ostinato_protocols::variable::FieldMode;
//!
//! let mut mac = Mac::default();
//! mac.set_destination(MacAddress::with_program(
//!     parse_mac("00:00:00:00:00:01").unwrap(),
//!     FieldMode::Increment,
//!     255,
//!     8,
//! ).unwrap());
//! mac.set_destination(parse_mac("00:00:00:aa:bb:cc").unwrap());
//! assert_eq!(mac.destination().mode(), FieldMode::Increment);
//! assert_eq!(mac.destination().to_string(), "00:00:00:aa:bb:cc");
//! ```
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

use pnet::util::MacAddr;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::header::{count, integer, string};
use crate::record::ProtocolRecord;
use crate::utilities::{mac_to_u64, parse_ipv4, parse_mac, parse_variant, u64_to_mac};
use crate::variable::FieldMode;

const MAC_MAX: u64 = 0xffff_ffff_ffff;

/// An address value with its generation program.
pub trait AddressProgram: Sized + Display {
    type Address: Copy;

    fn address(&self) -> Self::Address;

    /// Replace the address, keeping the program.
    fn set_address(&mut self, address: Self::Address);

    /// Write the program into the static fields `<slot>`, `<slot>_mode`, ...
    fn save(&self, slot: &str, record: &mut ProtocolRecord);

    /// Read the program from the static fields written by [`AddressProgram::save`].
    fn fetch(&mut self, slot: &str, record: &ProtocolRecord) -> Result<()>;

    /// Add the flat dictionary entries `<name>`, `<name>_mode`, ... to `dict`.
    fn to_dict(&self, name: &str, dict: &mut Map<String, Value>);

    /// Apply the dictionary entry `<name><suffix>`. Returns `false` for unknown suffixes.
    fn set_entry(&mut self, key: &str, suffix: &str, value: &Value) -> Result<bool>;
}

/// An update of an address attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Assign<T: AddressProgram> {
    /// Replace only the address.
    Address(T::Address),
    /// Replace the address and its program.
    Program(T),
}

impl<T: AddressProgram> Assign<T> {
    pub fn apply(self, target: &mut T) {
        match self {
            Assign::Address(address) => target.set_address(address),
            Assign::Program(program) => *target = program,
        }
    }
}

fn mode_to_wire(mode: FieldMode) -> u64 {
    match mode {
        FieldMode::Fixed => 0,
        FieldMode::Increment => 1,
        FieldMode::Decrement => 2,
        FieldMode::Random => 3,
    }
}

fn mode_from_wire(value: u64) -> Result<FieldMode> {
    match value {
        0 => Ok(FieldMode::Fixed),
        1 => Ok(FieldMode::Increment),
        2 => Ok(FieldMode::Decrement),
        3 => Ok(FieldMode::Random),
        other => Err(Error::InvalidMode {
            value: other.to_string(),
            expected: "0,1,2,3".to_string(),
        }),
    }
}

fn mac_from_u64(key: &str, value: u64) -> Result<MacAddr> {
    if value > MAC_MAX {
        return Err(Error::ValueOutOfRange {
            attribute: key.to_string(),
            value,
            max: MAC_MAX,
        });
    }
    Ok(u64_to_mac(value))
}

fn ipv4_from_u64(key: &str, value: u64) -> Result<Ipv4Addr> {
    u32::try_from(value)
        .map(Ipv4Addr::from)
        .map_err(|_| Error::ValueOutOfRange {
            attribute: key.to_string(),
            value,
            max: u32::MAX.into(),
        })
}

fn fetch_u32(record: &ProtocolRecord, name: &str, current: u32) -> u32 {
    record
        .field(name)
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(current)
}

/// A MAC address and its generation program.
///
/// MAC addresses can be fixed, incremented or decremented, but not randomized.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MacAddress {
    address: MacAddr,
    mode: FieldMode,
    count: u32,
    step: u32,
}

impl Default for MacAddress {
    fn default() -> Self {
        MacAddress::new(MacAddr::zero())
    }
}

impl MacAddress {
    /// A fixed address.
    pub fn new(address: MacAddr) -> Self {
        MacAddress {
            address,
            mode: FieldMode::Fixed,
            count: 16,
            step: 1,
        }
    }

    pub fn with_program(address: MacAddr, mode: FieldMode, count: u32, step: u32) -> Result<Self> {
        let mut value = MacAddress::new(address);
        value.set_mode(mode)?;
        value.count = count;
        value.step = step;
        Ok(value)
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    /// Set the generation mode. `RANDOM` is rejected.
    pub fn set_mode(&mut self, mode: FieldMode) -> Result<()> {
        if mode == FieldMode::Random {
            return Err(Error::UnsupportedMode {
                attribute: "MAC address".to_string(),
                mode: mode.to_string(),
            });
        }
        self.mode = mode;
        Ok(())
    }

    /// Number of frames after which the address restarts from [`MacAddress::address`].
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn set_step(&mut self, step: u32) {
        self.step = step;
    }
}

impl AddressProgram for MacAddress {
    type Address = MacAddr;

    fn address(&self) -> MacAddr {
        self.address
    }

    fn set_address(&mut self, address: MacAddr) {
        self.address = address;
    }

    fn save(&self, slot: &str, record: &mut ProtocolRecord) {
        record.set_field(slot, mac_to_u64(self.address));
        record.set_field(&format!("{slot}_mode"), mode_to_wire(self.mode));
        record.set_field(&format!("{slot}_count"), self.count as u64);
        record.set_field(&format!("{slot}_step"), self.step as u64);
    }

    fn fetch(&mut self, slot: &str, record: &ProtocolRecord) -> Result<()> {
        if let Some(address) = record.field(slot) {
            self.address = mac_from_u64(slot, address)?;
        }
        if let Some(mode) = record.field(&format!("{slot}_mode")) {
            self.set_mode(mode_from_wire(mode)?)?;
        }
        self.count = fetch_u32(record, &format!("{slot}_count"), self.count);
        self.step = fetch_u32(record, &format!("{slot}_step"), self.step);
        Ok(())
    }

    fn to_dict(&self, name: &str, dict: &mut Map<String, Value>) {
        dict.insert(name.to_string(), self.to_string().into());
        dict.insert(format!("{name}_mode"), self.mode.to_string().into());
        dict.insert(format!("{name}_count"), self.count.into());
        dict.insert(format!("{name}_step"), self.step.into());
    }

    fn set_entry(&mut self, key: &str, suffix: &str, value: &Value) -> Result<bool> {
        match suffix {
            "" => {
                self.address = match value {
                    Value::String(address) => parse_mac(address)?,
                    _ => mac_from_u64(key, integer(key, value)?)?,
                }
            }
            "_mode" => self.set_mode(parse_variant(string(key, value)?)?)?,
            "_count" => self.count = count(key, value)?,
            "_step" => self.step = count(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Ok(MacAddress::new(parse_mac(value)?))
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl From<MacAddr> for Assign<MacAddress> {
    fn from(value: MacAddr) -> Self {
        Assign::Address(value)
    }
}

impl From<MacAddress> for Assign<MacAddress> {
    fn from(value: MacAddress) -> Self {
        Assign::Program(value)
    }
}

/// An IPv4 address and its generation program.
///
/// In non-fixed modes only the bits of the address selected by [`Ipv4Address::mask`] vary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ipv4Address {
    address: Ipv4Addr,
    mode: FieldMode,
    count: u32,
    step: u32,
    mask: Ipv4Addr,
}

impl Default for Ipv4Address {
    fn default() -> Self {
        Ipv4Address::new(Ipv4Addr::UNSPECIFIED)
    }
}

impl Ipv4Address {
    /// A fixed address.
    pub fn new(address: Ipv4Addr) -> Self {
        Ipv4Address {
            address,
            mode: FieldMode::Fixed,
            count: 16,
            step: 1,
            mask: Ipv4Addr::new(255, 255, 255, 0),
        }
    }

    pub fn with_program(
        address: Ipv4Addr,
        mode: FieldMode,
        count: u32,
        step: u32,
        mask: Ipv4Addr,
    ) -> Self {
        Ipv4Address {
            address,
            mode,
            count,
            step,
            mask,
        }
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FieldMode) {
        self.mode = mode;
    }

    /// Number of packets after which the address restarts from [`Ipv4Address::address`].
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn set_step(&mut self, step: u32) {
        self.step = step;
    }

    /// Host bits are the bits cleared in this mask.
    pub fn mask(&self) -> Ipv4Addr {
        self.mask
    }

    pub fn set_mask(&mut self, mask: Ipv4Addr) {
        self.mask = mask;
    }
}

impl AddressProgram for Ipv4Address {
    type Address = Ipv4Addr;

    fn address(&self) -> Ipv4Addr {
        self.address
    }

    fn set_address(&mut self, address: Ipv4Addr) {
        self.address = address;
    }

    fn save(&self, slot: &str, record: &mut ProtocolRecord) {
        record.set_field(slot, u32::from(self.address) as u64);
        record.set_field(&format!("{slot}_mode"), mode_to_wire(self.mode));
        record.set_field(&format!("{slot}_count"), self.count as u64);
        record.set_field(&format!("{slot}_step"), self.step as u64);
        record.set_field(&format!("{slot}_mask"), u32::from(self.mask) as u64);
    }

    fn fetch(&mut self, slot: &str, record: &ProtocolRecord) -> Result<()> {
        if let Some(address) = record.field(slot) {
            self.address = ipv4_from_u64(slot, address)?;
        }
        if let Some(mode) = record.field(&format!("{slot}_mode")) {
            self.mode = mode_from_wire(mode)?;
        }
        self.count = fetch_u32(record, &format!("{slot}_count"), self.count);
        self.step = fetch_u32(record, &format!("{slot}_step"), self.step);
        let name = format!("{slot}_mask");
        if let Some(mask) = record.field(&name) {
            self.mask = ipv4_from_u64(&name, mask)?;
        }
        Ok(())
    }

    fn to_dict(&self, name: &str, dict: &mut Map<String, Value>) {
        dict.insert(name.to_string(), self.to_string().into());
        dict.insert(format!("{name}_mode"), self.mode.to_string().into());
        dict.insert(format!("{name}_count"), self.count.into());
        dict.insert(format!("{name}_step"), self.step.into());
        dict.insert(format!("{name}_mask"), self.mask.to_string().into());
    }

    fn set_entry(&mut self, key: &str, suffix: &str, value: &Value) -> Result<bool> {
        match suffix {
            "" => {
                self.address = match value {
                    Value::String(address) => parse_ipv4(address)?,
                    _ => ipv4_from_u64(key, integer(key, value)?)?,
                }
            }
            "_mode" => self.mode = parse_variant(string(key, value)?)?,
            "_count" => self.count = count(key, value)?,
            "_step" => self.step = count(key, value)?,
            "_mask" => {
                self.mask = match value {
                    Value::String(mask) if mask.contains('.') => parse_ipv4(mask)?,
                    _ => ipv4_from_u64(key, integer(key, value)?)?,
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl FromStr for Ipv4Address {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Ok(Ipv4Address::new(parse_ipv4(value)?))
    }
}

impl Display for Ipv4Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl From<Ipv4Addr> for Assign<Ipv4Address> {
    fn from(value: Ipv4Addr) -> Self {
        Assign::Address(value)
    }
}

impl From<Ipv4Address> for Assign<Ipv4Address> {
    fn from(value: Ipv4Address) -> Self {
        Assign::Program(value)
    }
}
