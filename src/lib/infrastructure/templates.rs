//! Template renderer backed by an in-memory Handlebars registry

use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use handlebars::Handlebars;
use tracing::debug;

use crate::domain::communication::templates::{TemplateError, TemplateRenderer};

/// Template configuration
#[derive(Debug, Clone, Parser)]
pub struct TemplateConfig {
    /// Directory holding one Handlebars template per file, named after the template id
    #[arg(long, env = "EMAIL_TEMPLATES_DIR")]
    pub templates_dir: Option<String>,
}

/// Renders Handlebars templates from a fixed set registered up front
///
/// Template ids are matched ignoring case. `{{ name }}` output is HTML-escaped, `{{{ name }}}`
/// is not. Variables without a value render empty.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateRenderer {
    registry: Arc<Handlebars<'static>>,
}

impl InMemoryTemplateRenderer {
    /// Create a renderer from `(id, template)` pairs, rejecting templates that do not parse
    pub fn new<I, K, V>(templates: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut registry = Handlebars::new();

        for (id, template) in templates {
            let id = id.as_ref().trim().to_lowercase();

            registry
                .register_template_string(&id, template.as_ref())
                .map_err(|err| TemplateError::InvalidTemplate {
                    template_id: id.clone(),
                    reason: err.to_string(),
                })?;
        }

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Load every file of `dir`, keyed by its file stem
    #[mutants::skip]
    pub async fn from_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("failed to read templates from {}", dir.display()))?;

        let mut templates = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if !entry.file_type().await?.is_file() {
                continue;
            }

            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let template = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read template {}", path.display()))?;

            debug!(template_id = id, "loaded email template");

            templates.push((id.to_string(), template));
        }

        Self::new(templates)
            .with_context(|| format!("failed to register templates from {}", dir.display()))
    }

    /// Build the renderer described by `config`; without a directory it has no templates
    #[mutants::skip]
    pub async fn from_config(config: &TemplateConfig) -> anyhow::Result<Self> {
        match &config.templates_dir {
            Some(dir) => Self::from_dir(dir).await,
            None => Ok(Self::default()),
        }
    }

    /// Number of known templates
    pub fn len(&self) -> usize {
        self.registry.get_templates().len()
    }

    /// Whether no template is known
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TemplateRenderer for InMemoryTemplateRenderer {
    async fn render(
        &self,
        template_id: &str,
        data: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        let template_id = template_id.trim();

        if template_id.is_empty() {
            return Err(TemplateError::EmptyTemplateId);
        }

        let name = template_id.to_lowercase();

        if !self.registry.has_template(&name) {
            return Err(TemplateError::TemplateNotFound(template_id.to_string()));
        }

        let rendered = self
            .registry
            .render(&name, data)
            .map_err(|err| TemplateError::RenderFailed {
                template_id: template_id.to_string(),
                reason: err.to_string(),
            })?;

        debug!(template_id, "rendered email template");

        Ok(rendered)
    }
}
