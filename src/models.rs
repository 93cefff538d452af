//! Protocol layers.
//!
//! Each module declares the attribute descriptors of one protocol, e.g.
//! [`ipv4::TTL`], used with the [`Attributes`](crate::Attributes) accessors.
pub mod arp;
pub mod ethernet;
pub mod ipv4;
pub mod mac;
pub mod payload;
pub mod tcp;
pub mod udp;
pub mod vlan;

pub use arp::Arp;
pub use ethernet::Ethernet;
pub use ipv4::IPv4;
pub use mac::Mac;
pub use payload::{Payload, PayloadMode};
pub use tcp::Tcp;
pub use udp::Udp;
pub use vlan::Vlan;
