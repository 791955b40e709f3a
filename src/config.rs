//! Stream configuration.
//!
//! ```
//! use mesh_transit::config::{PartitionerKind, StreamConfig};
//!
//! let cfg = StreamConfig::from_json_str(
//!     r#"{ "file_name": "sim.bp", "engine": "SST", "partitioner": { "plane": { "plane_size": 4 } } }"#,
//! )
//! .unwrap();
//! assert_eq!(cfg.engine, "SST");
//! assert_eq!(cfg.partitioner, PartitionerKind::Plane { plane_size: 4 });
//! ```

use crate::partition::{
    BlockPartitioner, CyclicPartitioner, MappedPartitioner, Partitioner, PlanePartitioner,
};
use crate::schema_error::SchemaError;
use crate::transport::DEFAULT_ENGINE;
use serde::{Deserialize, Serialize};

/// Which receiver-layout strategy to use.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionerKind {
    #[default]
    Block,
    Cyclic,
    Plane {
        plane_size: usize,
    },
    Mapped {
        blocks: Vec<usize>,
        procs: Vec<usize>,
    },
}

impl PartitionerKind {
    pub fn build(&self) -> Box<dyn Partitioner> {
        match self {
            PartitionerKind::Block => Box::new(BlockPartitioner),
            PartitionerKind::Cyclic => Box::new(CyclicPartitioner),
            PartitionerKind::Plane { plane_size } => Box::new(PlanePartitioner::new(*plane_size)),
            PartitionerKind::Mapped { blocks, procs } => {
                Box::new(MappedPartitioner::new(blocks.clone(), procs.clone()))
            }
        }
    }
}

/// Consumer-side settings for one stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub file_name: String,
    pub engine: String,
    pub partitioner: PartitionerKind,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            file_name: String::new(),
            engine: DEFAULT_ENGINE.to_owned(),
            partitioner: PartitionerKind::Block,
        }
    }
}

impl StreamConfig {
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(s).map_err(|e| SchemaError::InvalidConfig(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, SchemaError> {
        serde_json::to_string_pretty(self).map_err(|e| SchemaError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = StreamConfig::from_json_str(r#"{ "file_name": "a.bp" }"#).unwrap();
        assert_eq!(cfg.engine, "BP4");
        assert_eq!(cfg.partitioner, PartitionerKind::Block);
        assert_eq!(cfg.partitioner.build().name(), "block");
    }

    #[test]
    fn unit_and_struct_variants_parse() {
        let cfg = StreamConfig::from_json_str(r#"{ "partitioner": "cyclic" }"#).unwrap();
        assert_eq!(cfg.partitioner.build().name(), "cyclic");
        let cfg = StreamConfig::from_json_str(
            r#"{ "partitioner": { "mapped": { "blocks": [0, 1], "procs": [1, 0] } } }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.partitioner,
            PartitionerKind::Mapped {
                blocks: vec![0, 1],
                procs: vec![1, 0]
            }
        );
    }

    #[test]
    fn bad_documents_are_reported() {
        assert!(matches!(
            StreamConfig::from_json_str("{ \"engine\": 4 }"),
            Err(SchemaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let cfg = StreamConfig {
            file_name: "x".into(),
            engine: "SST".into(),
            partitioner: PartitionerKind::Plane { plane_size: 2 },
        };
        let back = StreamConfig::from_json_str(&cfg.to_json_string().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }
}
