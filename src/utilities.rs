//! Utilities.
use std::io::Write;
use std::net::Ipv4Addr;
use std::str::FromStr;

use log::LevelFilter;
use pnet::util::MacAddr;
use strum::VariantNames;

use crate::error::{Error, Result};

/// Parse a MAC address such as `00:11:22:33:44:55`.
pub fn parse_mac(value: &str) -> Result<MacAddr> {
    MacAddr::from_str(value.trim()).map_err(|_| Error::InvalidAddress {
        kind: "MAC",
        value: value.to_string(),
    })
}

/// Parse a dotted IPv4 address such as `192.0.2.1`.
pub fn parse_ipv4(value: &str) -> Result<Ipv4Addr> {
    Ipv4Addr::from_str(value.trim()).map_err(|_| Error::InvalidAddress {
        kind: "IPv4",
        value: value.to_string(),
    })
}

pub fn mac_to_u64(mac: MacAddr) -> u64 {
    let MacAddr(a, b, c, d, e, f) = mac;
    u64::from_be_bytes([0, 0, a, b, c, d, e, f])
}

pub fn u64_to_mac(value: u64) -> MacAddr {
    let [_, _, a, b, c, d, e, f] = value.to_be_bytes();
    MacAddr(a, b, c, d, e, f)
}

/// Parse an hexadecimal string into an integer.
///
/// An optional `0x` prefix is accepted, and spaces, colons and hyphens between
/// the digits are ignored.
///
/// ```
/// use ostinato_protocols::utilities::parse_hex;
///
/// assert_eq!(parse_hex("FF-01-A2").unwrap(), 0xff01a2);
/// assert_eq!(parse_hex("0xff01a2").unwrap(), 0xff01a2);
/// assert_eq!(parse_hex("0x800").unwrap(), 0x0800);
/// ```
pub fn parse_hex(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let mut digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '-'))
        .collect();
    if digits.is_empty() {
        return Err(Error::invalid_value(value, "empty hexadecimal string"));
    }
    if digits.len() % 2 == 1 {
        digits.insert(0, '0');
    }
    let bytes = hex::decode(&digits).map_err(|error| Error::invalid_value(value, error))?;
    if bytes.len() > 8 {
        return Err(Error::invalid_value(value, "more than 64 bits"));
    }
    Ok(bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | *byte as u64))
}

/// Format the `width` low bytes of `value` as space-separated hexadecimal.
///
/// ```
/// use ostinato_protocols::utilities::format_hex;
///
/// assert_eq!(format_hex(0x0800, 2), "08 00");
/// ```
pub fn format_hex(value: u64, width: usize) -> String {
    let bytes = value.to_be_bytes();
    let start = 8 - width.clamp(1, 8);
    hex::encode_upper(&bytes[start..])
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one of the string representations of a closed enumeration.
pub fn parse_variant<T>(value: &str) -> Result<T>
where
    T: FromStr + VariantNames,
{
    T::from_str(value).map_err(|_| Error::InvalidMode {
        value: value.to_string(),
        expected: T::VARIANTS.join(","),
    })
}

/// Configure the global logger, for binaries.
pub fn configure_logger(level: LevelFilter) {
    env_logger::builder()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
