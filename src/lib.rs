#![doc = include_str!("../README.md")]

pub mod address;
pub mod codec;
pub mod config;
pub mod error;
pub mod header;
pub mod layers;
pub mod models;
pub mod protocol;
pub mod record;
pub mod registry;
pub mod utilities;
pub mod variable;

pub use address::{Assign, Ipv4Address, MacAddress};
pub use error::{Error, Result};
pub use layers::{Layer, LayerStack};
pub use protocol::*;
pub use record::*;
pub use registry::{FieldSpec, ProtocolSpec};
pub use variable::FieldMode;
