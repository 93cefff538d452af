//! Protocol layers of a stream, and their reconstruction from wire records.
use std::fmt::{Display, Formatter};

use log::debug;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::header::string;
use crate::models::{Arp, Ethernet, IPv4, Mac, Payload, Tcp, Udp, Vlan};
use crate::protocol::Protocol;
use crate::record::ProtocolRecord;
use crate::registry::ProtocolSpec;

/// Key of the protocol name in layer dictionaries. No protocol declares an attribute of this name.
pub const LAYER_KEY: &str = "layer";

/// Any protocol layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Layer {
    Mac(Mac),
    Payload(Payload),
    Ethernet(Ethernet),
    Vlan(Vlan),
    Arp(Arp),
    IPv4(IPv4),
    Tcp(Tcp),
    Udp(Udp),
}

// Apply `$body` to the protocol held by `$layer`, bound to `$inner`.
macro_rules! each_layer {
    ($layer:expr, $inner:ident => $body:expr) => {
        match $layer {
            Layer::Mac($inner) => $body,
            Layer::Payload($inner) => $body,
            Layer::Ethernet($inner) => $body,
            Layer::Vlan($inner) => $body,
            Layer::Arp($inner) => $body,
            Layer::IPv4($inner) => $body,
            Layer::Tcp($inner) => $body,
            Layer::Udp($inner) => $body,
        }
    };
}

macro_rules! layer_from {
    ($($protocol:ident),+) => {
        $(
            impl From<$protocol> for Layer {
                fn from(value: $protocol) -> Self {
                    Layer::$protocol(value)
                }
            }
        )+
    };
}

layer_from!(Mac, Payload, Ethernet, Vlan, Arp, IPv4, Tcp, Udp);

fn build<P: Protocol + Into<Layer>>(dict: &Map<String, Value>) -> Result<Layer> {
    let mut protocol = P::default();
    for (key, value) in dict {
        if key != LAYER_KEY && !protocol.set_entry(key, value)? {
            return Err(Error::UnknownKey {
                protocol: P::NAME.to_string(),
                key: key.clone(),
            });
        }
    }
    Ok(protocol.into())
}

impl Layer {
    /// Build the layer described by a wire record, dispatching on its protocol identifier.
    pub fn from_record(record: &ProtocolRecord) -> Result<Self> {
        debug!("fetching layer {}", record.protocol_id);
        let layer = match record.protocol_id {
            Mac::ID => Mac::from_record(record)?.into(),
            Payload::ID => Payload::from_record(record)?.into(),
            Ethernet::ID => Ethernet::from_record(record)?.into(),
            Vlan::ID => Vlan::from_record(record)?.into(),
            Arp::ID => Arp::from_record(record)?.into(),
            IPv4::ID => IPv4::from_record(record)?.into(),
            Tcp::ID => Tcp::from_record(record)?.into(),
            Udp::ID => Udp::from_record(record)?.into(),
            id => return Err(Error::UnknownProtocol(id)),
        };
        Ok(layer)
    }

    /// Build a layer from a dictionary holding its protocol name under [`LAYER_KEY`].
    pub fn from_dict(dict: &Map<String, Value>) -> Result<Self> {
        let name = dict
            .get(LAYER_KEY)
            .ok_or_else(|| Error::invalid_value(LAYER_KEY, "missing protocol name"))?;
        match string(LAYER_KEY, name)? {
            Mac::NAME => build::<Mac>(dict),
            Payload::NAME => build::<Payload>(dict),
            Ethernet::NAME => build::<Ethernet>(dict),
            Vlan::NAME => build::<Vlan>(dict),
            Arp::NAME => build::<Arp>(dict),
            IPv4::NAME => build::<IPv4>(dict),
            Tcp::NAME => build::<Tcp>(dict),
            Udp::NAME => build::<Udp>(dict),
            other => Err(Error::invalid_value(
                LAYER_KEY,
                format!("unknown protocol {other:?}"),
            )),
        }
    }

    pub fn protocol_id(&self) -> u16 {
        fn id<P: ProtocolSpec>(_: &P) -> u16 {
            P::ID
        }
        each_layer!(self, inner => id(inner))
    }

    pub fn name(&self) -> &'static str {
        fn name<P: ProtocolSpec>(_: &P) -> &'static str {
            P::NAME
        }
        each_layer!(self, inner => name(inner))
    }

    pub fn save(&self, record: &mut ProtocolRecord) {
        each_layer!(self, inner => inner.save(record))
    }

    pub fn to_record(&self) -> ProtocolRecord {
        each_layer!(self, inner => inner.to_record())
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert(LAYER_KEY.to_string(), self.name().into());
        each_layer!(self, inner => inner.dict_entries(&mut dict));
        dict
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        each_layer!(self, inner => Display::fmt(inner, f))
    }
}

/// The ordered layers of a stream. A protocol appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer. Fails if the stack already holds a layer of the same protocol.
    pub fn add(&mut self, layer: impl Into<Layer>) -> Result<()> {
        let layer = layer.into();
        if self.get(layer.name()).is_some() {
            return Err(Error::DuplicateLayer(layer.name().to_string()));
        }
        self.layers.push(layer);
        Ok(())
    }

    /// Remove the layer of protocol `name`, if any.
    pub fn remove(&mut self, name: &str) -> Option<Layer> {
        let index = self.layers.iter().position(|layer| layer.name() == name)?;
        Some(self.layers.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wire records of the layers, in order.
    pub fn save(&self) -> Vec<ProtocolRecord> {
        self.layers.iter().map(Layer::to_record).collect()
    }

    pub fn from_records(records: &[ProtocolRecord]) -> Result<Self> {
        let mut stack = LayerStack::new();
        for record in records {
            stack.add(Layer::from_record(record)?)?;
        }
        Ok(stack)
    }
}

impl Display for LayerStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.layers.iter().map(Layer::name).collect();
        write!(f, "{}", names.join(" > "))
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::error::Error;
    use crate::layers::{Layer, LayerStack};
    use crate::models::{Ethernet, IPv4, Mac, Udp};
    use crate::record::ProtocolRecord;

    #[test]
    fn test_unknown_protocol() {
        assert_eq!(
            Layer::from_record(&ProtocolRecord::new(999)),
            Err(Error::UnknownProtocol(999))
        );
    }

    #[test]
    fn test_duplicate_layer() {
        let mut stack = LayerStack::new();
        stack.add(Mac::default()).unwrap();
        stack.add(Ethernet::default()).unwrap();
        assert_eq!(
            stack.add(Mac::default()),
            Err(Error::DuplicateLayer("Mac".to_string()))
        );
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.to_string(), "Mac > Ethernet");
    }

    #[test]
    fn test_remove() {
        let mut stack = LayerStack::new();
        stack.add(IPv4::default()).unwrap();
        stack.add(Udp::default()).unwrap();
        assert!(stack.remove("IPv4").is_some());
        assert!(stack.remove("IPv4").is_none());
        assert_eq!(stack.iter().map(Layer::protocol_id).collect::<Vec<_>>(), [401]);
    }

    #[test]
    fn test_dict_discriminator() {
        let layer = Layer::from(Ethernet::default());
        let dict = layer.to_dict();
        assert_eq!(dict["layer"], json!("Ethernet"));
        assert_eq!(Layer::from_dict(&dict).unwrap(), layer);

        let dict = json!({"ether_type": 1});
        assert!(matches!(
            Layer::from_dict(dict.as_object().unwrap()),
            Err(Error::InvalidValue { .. })
        ));
        let dict = json!({"layer": "Ethernet", "ttl": 1});
        assert!(matches!(
            Layer::from_dict(dict.as_object().unwrap()),
            Err(Error::UnknownKey { .. })
        ));
    }
}
