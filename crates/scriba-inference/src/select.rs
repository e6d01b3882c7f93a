//! Provider selection: turn configuration into a concrete backend.

use std::sync::Arc;

use scriba_core::{AnalysisBackend, Error, ProviderKind, Result, ScribaConfig};

use crate::ollama::OllamaBackend;
use crate::openai::OpenAiBackend;

/// Build the configured analysis backend.
///
/// The `custom` provider reuses the OpenAI backend against the configured
/// base URL, since the wire protocol is identical.
pub fn build_backend(config: &ScribaConfig) -> Result<Arc<dyn AnalysisBackend>> {
    match config.provider {
        ProviderKind::Ollama => Ok(Arc::new(OllamaBackend::new(
            config.ollama.clone(),
            config.prompt.clone(),
        )?)),
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiBackend::new(
            config.openai.clone(),
            config.prompt.clone(),
        )?)),
        ProviderKind::Custom => {
            let custom = config.custom.clone().ok_or_else(|| {
                Error::Config("custom provider selected but CUSTOM_* settings missing".to_string())
            })?;
            Ok(Arc::new(
                OpenAiBackend::new(custom, config.prompt.clone())?.with_provider_name("custom"),
            ))
        }
    }
}
