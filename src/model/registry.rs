use crate::error::{Result, StemError};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Runs the external model runner script.
    Script,
    /// Implemented in this crate.
    Builtin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub backend: Backend,
    #[serde(default)]
    pub description: String,
    /// `None` when the model accepts any input rate.
    pub sample_rate: Option<u32>,
    pub channels: usize,
    pub stems: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Registry {
    pub default: String,
    pub models: Vec<RegistryEntry>,
}

const REGISTRY_JSON: &str = include_str!("../../models/registry.json");

pub fn registry() -> Result<Registry> {
    Ok(serde_json::from_str(REGISTRY_JSON)?)
}

/// Looks a model up by name; an empty name selects the registry default.
pub fn resolve(model_name: &str) -> Result<RegistryEntry> {
    let reg = registry()?;
    let target = if model_name.is_empty() {
        reg.default
    } else {
        model_name.to_string()
    };

    reg.models
        .into_iter()
        .find(|m| m.name == target)
        .ok_or_else(|| StemError::model(target.clone(), "not found in registry"))
}
