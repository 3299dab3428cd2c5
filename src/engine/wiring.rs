use super::DataTypeRegistry;
use crate::core::{FutureResult, InputPort, OutputPort, PortInfo};
use crate::registry::{InFutures, OutFutures, PortIndex};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Declared port of a stage in the wiring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub id: String,
    #[serde(default)]
    pub outputs: Vec<PortConfig>,
    #[serde(default)]
    pub inputs: Vec<PortConfig>,
}

/// Edge from `"<stage>.<output>"` to `"<stage>.<input>"`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WiringConfig {
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// Declared ports of one stage
#[derive(Debug)]
pub struct StagePorts {
    id: String,
    outputs: PortIndex<OutputPort>,
    inputs: PortIndex<InputPort>,
}

impl StagePorts {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Output port the stage fulfils when its computation finishes
    pub fn output(&self, name: &str) -> FutureResult<&OutputPort> {
        self.outputs.get(name)
    }

    pub fn input(&self, name: &str) -> FutureResult<&InputPort> {
        self.inputs.get(name)
    }

    pub fn out_futures(&self) -> FutureResult<OutFutures> {
        OutFutures::new(self.outputs.values().map(OutputPort::future).collect())
    }

    pub fn in_futures(&self) -> FutureResult<InFutures> {
        let ports: Vec<InputPort> = self.inputs.values().cloned().collect();
        InFutures::new(&ports)
    }
}

/// Stages and their port connections, built from configuration
#[derive(Debug)]
pub struct PipelineWiring {
    stages: Vec<StagePorts>,
    connection_count: usize,
}

impl PipelineWiring {
    pub fn from_json(config: Value, types: &DataTypeRegistry) -> Result<Self> {
        let config: WiringConfig =
            serde_json::from_value(config).context("Invalid wiring configuration")?;
        Self::from_config(&config, types)
    }

    pub fn from_file(path: impl AsRef<Path>, types: &DataTypeRegistry) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read wiring file {}", path.display()))?;
        let config: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse wiring file {}", path.display()))?;
        Self::from_json(config, types)
    }

    pub fn from_config(config: &WiringConfig, types: &DataTypeRegistry) -> Result<Self> {
        let mut stages = Vec::with_capacity(config.stages.len());
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for stage in &config.stages {
            if positions.insert(stage.id.as_str(), stages.len()).is_some() {
                bail!("Duplicate stage id: {}", stage.id);
            }
            stages.push(Self::declare_stage(stage, types)?);
        }

        for connection in &config.connections {
            let (from_stage, from_port) = split_endpoint(&connection.from)?;
            let (to_stage, to_port) = split_endpoint(&connection.to)?;

            let source = positions
                .get(from_stage)
                .ok_or_else(|| anyhow!("Connection from unknown stage: {}", from_stage))?;
            let target = positions
                .get(to_stage)
                .ok_or_else(|| anyhow!("Connection to unknown stage: {}", to_stage))?;

            let future = stages[*source]
                .outputs
                .get(from_port)
                .with_context(|| format!("Stage {} has no output {}", from_stage, from_port))?
                .future();
            stages[*target]
                .inputs
                .get_mut(to_port)
                .with_context(|| format!("Stage {} has no input {}", to_stage, to_port))?
                .connect_future(future)
                .with_context(|| format!("Cannot connect {} to {}", connection.from, connection.to))?;
        }

        info!(
            stages = stages.len(),
            connections = config.connections.len(),
            "pipeline wiring built"
        );

        Ok(Self {
            stages,
            connection_count: config.connections.len(),
        })
    }

    fn declare_stage(stage: &StageConfig, types: &DataTypeRegistry) -> Result<StagePorts> {
        let mut outputs = PortIndex::new();
        for port in &stage.outputs {
            let info = port_info(&stage.id, port, types)?;
            outputs
                .insert(port.name.clone(), OutputPort::new(info))
                .with_context(|| format!("Stage {}", stage.id))?;
        }

        let mut inputs = PortIndex::new();
        for port in &stage.inputs {
            let info = port_info(&stage.id, port, types)?;
            inputs
                .insert(port.name.clone(), InputPort::new(info))
                .with_context(|| format!("Stage {}", stage.id))?;
        }

        debug!(
            stage = %stage.id,
            outputs = outputs.len(),
            inputs = inputs.len(),
            "stage declared"
        );

        Ok(StagePorts {
            id: stage.id.clone(),
            outputs,
            inputs,
        })
    }

    pub fn stage(&self, id: &str) -> Option<&StagePorts> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    pub fn stages(&self) -> &[StagePorts] {
        &self.stages
    }

    pub fn connection_count(&self) -> usize {
        self.connection_count
    }
}

fn port_info(stage: &str, port: &PortConfig, types: &DataTypeRegistry) -> Result<PortInfo> {
    let data_info = types
        .resolve(&port.data_type)
        .ok_or_else(|| anyhow!("Unknown data type {} on {}.{}", port.data_type, stage, port.name))?;
    PortInfo::new(port.name.clone(), data_info).with_context(|| format!("Stage {}", stage))
}

fn split_endpoint(endpoint: &str) -> Result<(&str, &str)> {
    match endpoint.split_once('.') {
        Some((stage, port)) if !stage.is_empty() && !port.is_empty() => Ok((stage, port)),
        _ => Err(anyhow!("Invalid endpoint {:?}, expected <stage>.<port>", endpoint)),
    }
}
