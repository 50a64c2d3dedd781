//! Email template module

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::mock;

/// Errors that can occur when rendering a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template with the given id exists
    #[error("template \"{0}\" not found")]
    TemplateNotFound(String),

    /// The template id is blank
    #[error("template id is required")]
    EmptyTemplateId,

    /// The template source does not parse
    #[error("template \"{template_id}\" is invalid: {reason}")]
    InvalidTemplate {
        /// The template id
        template_id: String,

        /// The parser's message
        reason: String,
    },

    /// The template parsed but could not be rendered with the given values
    #[error("template \"{template_id}\" could not be rendered: {reason}")]
    RenderFailed {
        /// The template id
        template_id: String,

        /// The renderer's message
        reason: String,
    },

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

/// Renders stored templates into email bodies
#[async_trait]
pub trait TemplateRenderer: Clone + Send + Sync + 'static {
    /// Renders a template.
    ///
    /// # Arguments
    /// * `template_id` - The id of the template to render.
    /// * `data` - Values for the template's variables.
    ///
    /// # Returns
    /// The rendered body, or a [`TemplateError`] if the template is unknown.
    async fn render(
        &self,
        template_id: &str,
        data: &HashMap<String, String>,
    ) -> Result<String, TemplateError>;
}

#[cfg(test)]
mock! {
    pub TemplateRenderer {}

    impl Clone for TemplateRenderer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl TemplateRenderer for TemplateRenderer {
        async fn render(&self, template_id: &str, data: &HashMap<String, String>) -> Result<String, TemplateError>;
    }
}

#[cfg(test)]
pub mod tests {
    pub use super::MockTemplateRenderer;
}
