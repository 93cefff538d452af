use std::fs;
use std::net::Ipv4Addr;

use ostinato_protocols::config::StackConfig;
use ostinato_protocols::layers::LAYER_KEY;
use ostinato_protocols::models::{ipv4, tcp, Arp, Ethernet, IPv4, Mac, Payload, Tcp, Udp, Vlan};
use ostinato_protocols::{Attributes, Error, FieldMode, Layer, LayerStack, Protocol, ProtocolSpec};
use serde_json::json;
use tempfile::tempdir;

fn sample_stack() -> LayerStack {
    let mut ip = IPv4::new(Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(198, 51, 100, 1));
    ip.set(ipv4::TTL, 32).unwrap();
    ip.set(ipv4::PROTOCOL, 6).unwrap();
    ip.set_override(ipv4::PROTOCOL, true);
    ip.destination_mut().set_mode(FieldMode::Random);

    let mut segment = Tcp::new(40000, 80);
    segment.set(tcp::FLAG_SYN, 1).unwrap();
    segment.set_mode(tcp::SOURCE, FieldMode::Increment);
    segment.set_count(tcp::SOURCE, 100);

    let mut stack = LayerStack::new();
    stack.add(Mac::default()).unwrap();
    stack.add(Ethernet::default()).unwrap();
    stack.add(Vlan::new(10).unwrap()).unwrap();
    stack.add(ip).unwrap();
    stack.add(segment).unwrap();
    stack.add(Payload::default()).unwrap();
    stack
}

#[test]
fn test_records_round_trip() {
    let stack = sample_stack();
    let records = stack.save();
    let ids: Vec<u16> = records.iter().map(|record| record.protocol_id).collect();
    assert_eq!(ids, [100, 200, 205, 301, 400, 101]);
    assert_eq!(LayerStack::from_records(&records).unwrap(), stack);
}

#[test]
fn test_records_serialize() {
    let records = sample_stack().save();
    let text = serde_json::to_string(&records).unwrap();
    let parsed: Vec<ostinato_protocols::ProtocolRecord> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, records);
}

#[test]
fn test_from_records_rejects_duplicates() {
    let records = vec![Mac::default().to_record(), Mac::default().to_record()];
    assert_eq!(
        LayerStack::from_records(&records),
        Err(Error::DuplicateLayer("Mac".to_string()))
    );
}

#[test]
fn test_layer_dispatch() {
    let record = Tcp::new(1, 2).to_record();
    let layer = Layer::from_record(&record).unwrap();
    assert_eq!(layer.protocol_id(), 400);
    assert_eq!(layer.name(), "Tcp");
    match layer {
        Layer::Tcp(segment) => assert_eq!(segment.get(tcp::DESTINATION), 2),
        other => panic!("unexpected layer {other}"),
    }
}

fn assert_layer_key_unused<P: Protocol>() {
    assert!(P::field(LAYER_KEY).is_none(), "{}", P::NAME);
    assert!(!P::default().to_dict().contains_key(LAYER_KEY), "{}", P::NAME);
}

#[test]
fn test_layer_key_is_not_an_attribute() {
    assert_layer_key_unused::<Mac>();
    assert_layer_key_unused::<Payload>();
    assert_layer_key_unused::<Ethernet>();
    assert_layer_key_unused::<Vlan>();
    assert_layer_key_unused::<Arp>();
    assert_layer_key_unused::<IPv4>();
    assert_layer_key_unused::<Tcp>();
    assert_layer_key_unused::<Udp>();
}

#[test]
fn test_ipv4_protocol_number_round_trip() {
    let mut ip = IPv4::default();
    ip.set(ipv4::PROTOCOL, 17).unwrap();
    ip.set_override(ipv4::PROTOCOL, true);
    let layer = Layer::from(ip);

    let dict = layer.to_dict();
    assert_eq!(dict[LAYER_KEY], json!("IPv4"));
    assert_eq!(dict["protocol"], json!(17));
    assert_eq!(Layer::from_dict(&dict).unwrap(), layer);

    let mut stack = LayerStack::new();
    stack.add(layer).unwrap();
    let config = StackConfig::from_stack("udp", &stack);
    assert_eq!(config.to_stack().unwrap(), stack);
}

#[test]
fn test_layer_display() {
    let layer = Layer::from(Payload::default());
    assert_eq!(layer.to_string(), "Payload(pattern=00 00 00 00,mode=FIXED_WORD)");
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack.json");

    let stack = sample_stack();
    StackConfig::from_stack("syn", &stack).to_file(&path).unwrap();

    let config = StackConfig::from_file(&path).unwrap();
    assert_eq!(config.name, "syn");
    assert_eq!(config.layers.len(), 6);
    assert_eq!(config.layers[3]["layer"], json!("IPv4"));
    assert_eq!(config.layers[3]["protocol"], json!(6));
    assert_eq!(config.layers[3]["destination_mode"], json!("RANDOM"));
    assert_eq!(config.to_stack().unwrap(), stack);
}

#[test]
fn test_config_file_partial_layers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack.json");
    fs::write(
        &path,
        r#"{
            "name": "dns",
            "layers": [
                {"layer": "Mac", "destination": "00:11:22:33:44:55"},
                {"layer": "Ethernet", "ether_type": "0x0800"},
                {"layer": "IPv4", "destination": "192.0.2.53", "ttl": 64},
                {"layer": "Udp", "destination": 53, "source_mode": "RANDOM"}
            ]
        }"#,
    )
    .unwrap();

    let stack = StackConfig::from_file(&path).unwrap().to_stack().unwrap();
    assert_eq!(stack.to_string(), "Mac > Ethernet > IPv4 > Udp");
    match stack.get("IPv4") {
        Some(Layer::IPv4(ip)) => {
            assert_eq!(ip.get(ipv4::TTL), 64);
            assert_eq!(ip.destination().to_string(), "192.0.2.53");
            assert_eq!(ip.source().to_string(), "127.0.0.1");
        }
        other => panic!("unexpected layer {other:?}"),
    }
}

#[test]
fn test_config_file_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(StackConfig::from_file(&missing).is_err());

    let invalid = dir.path().join("invalid.json");
    fs::write(&invalid, "{\"name\": 1}").unwrap();
    assert!(StackConfig::from_file(&invalid).is_err());

    let duplicated = StackConfig {
        name: "twice".to_string(),
        layers: vec![
            json!({"layer": "Mac"}).as_object().unwrap().clone(),
            json!({"layer": "Mac"}).as_object().unwrap().clone(),
        ],
    };
    let error = duplicated.to_stack().unwrap_err();
    assert_eq!(error.to_string(), "Mac found twice in layers");
}
