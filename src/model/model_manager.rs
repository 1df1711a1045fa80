use tracing::debug;

use crate::{
    error::{Result, StemError},
    model::{
        center::CenterChannelModel,
        registry::{resolve, Backend},
        script::ScriptModel,
        StemModel,
    },
};

/// Resolves `model_name` in the registry and builds its adapter.
///
/// Unknown names and unavailable backends fail with `ModelLoadFailure`.
pub fn load_model(model_name: &str) -> Result<Box<dyn StemModel>> {
    let entry = resolve(model_name)?;
    debug!(model = %entry.name, backend = ?entry.backend, "loading model");

    match entry.backend {
        Backend::Script => Ok(Box::new(ScriptModel::new(entry)?)),
        Backend::Builtin if entry.name == CenterChannelModel::NAME => {
            Ok(Box::new(CenterChannelModel::new()))
        }
        Backend::Builtin => Err(StemError::model(entry.name, "no built-in implementation")),
    }
}
