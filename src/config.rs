//! JSON files describing the layers of a stream.
//!
//! ```no_run
//! use std::path::Path;
//! use ostinato_protocols::config::StackConfig;
//!
//! let config = StackConfig::from_file(Path::new("stack.json")).unwrap();
//! let stack = config.to_stack().unwrap();
//! println!("{}", stack);
//! ```
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::layers::{Layer, LayerStack, LAYER_KEY};

/// A named layer stack, each layer given as a dictionary with a `layer` key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub name: String,
    #[serde(default)]
    pub layers: Vec<Map<String, Value>>,
}

impl StackConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let config: StackConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("cannot parse {}", path.display()))?;
        info!("loaded {}", config);
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn from_stack(name: &str, stack: &LayerStack) -> Self {
        StackConfig {
            name: name.to_string(),
            layers: stack.iter().map(Layer::to_dict).collect(),
        }
    }

    /// Build the layers, in order.
    pub fn to_stack(&self) -> Result<LayerStack> {
        let mut stack = LayerStack::new();
        for (i, dict) in self.layers.iter().enumerate() {
            let layer =
                Layer::from_dict(dict).with_context(|| format!("{}: layer {}", self.name, i))?;
            stack.add(layer)?;
        }
        Ok(stack)
    }
}

impl Display for StackConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let protocols: Vec<&str> = self
            .layers
            .iter()
            .map(|dict| {
                dict.get(LAYER_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or("?")
            })
            .collect();
        write!(f, "name={:?}", self.name)?;
        write!(f, " layers={:?}", protocols)
    }
}
