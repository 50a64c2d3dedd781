//! Email attachment

use url::Url;

use super::errors::AttachmentError;

/// Where an attachment's bytes come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentSource {
    /// Bytes carried with the message
    Content(Vec<u8>),

    /// An absolute link to the file, sent in the body instead of attached
    Link(Url),
}

/// A file attached to an email
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    content_type: String,
    source: AttachmentSource,
}

impl Attachment {
    /// Create an attachment carrying its content inline
    pub fn from_content(
        file_name: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<Self, AttachmentError> {
        if content.is_empty() {
            return Err(AttachmentError::EmptyContent);
        }

        Self::new(file_name, content_type, AttachmentSource::Content(content))
    }

    /// Create an attachment referencing an external, absolute URL
    pub fn from_link(
        file_name: &str,
        content_type: &str,
        url: &str,
    ) -> Result<Self, AttachmentError> {
        let url =
            Url::parse(url.trim()).map_err(|_| AttachmentError::InvalidUrl(url.to_string()))?;

        Self::new(file_name, content_type, AttachmentSource::Link(url))
    }

    fn new(
        file_name: &str,
        content_type: &str,
        source: AttachmentSource,
    ) -> Result<Self, AttachmentError> {
        let file_name = file_name.trim();
        let content_type = content_type.trim();

        if file_name.is_empty() {
            return Err(AttachmentError::EmptyFileName);
        }

        if content_type.is_empty() {
            return Err(AttachmentError::EmptyContentType);
        }

        Ok(Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            source,
        })
    }

    /// The file name shown to recipients
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The MIME content type
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Where the bytes come from
    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }

    /// The inline content, if any
    pub fn content(&self) -> Option<&[u8]> {
        match &self.source {
            AttachmentSource::Content(content) => Some(content),
            AttachmentSource::Link(_) => None,
        }
    }

    /// The external link, if any
    pub fn link(&self) -> Option<&Url> {
        match &self.source {
            AttachmentSource::Content(_) => None,
            AttachmentSource::Link(url) => Some(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_content_attachment() -> TestResult {
        let attachment =
            Attachment::from_content(" report.pdf ", "application/pdf", vec![1, 2, 3])?;

        assert_eq!(attachment.file_name(), "report.pdf");
        assert_eq!(attachment.content(), Some(&[1u8, 2, 3][..]));
        assert!(attachment.link().is_none());

        Ok(())
    }

    #[test]
    fn test_link_attachment() -> TestResult {
        let attachment = Attachment::from_link(
            "report.pdf",
            "application/pdf",
            "https://files.example.com/r.pdf",
        )?;

        assert_eq!(
            attachment.link().map(Url::as_str),
            Some("https://files.example.com/r.pdf")
        );
        assert!(attachment.content().is_none());

        Ok(())
    }

    #[test]
    fn test_relative_link_is_rejected() {
        let result = Attachment::from_link("report.pdf", "application/pdf", "/files/r.pdf");

        assert!(matches!(result, Err(AttachmentError::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let result = Attachment::from_content("report.pdf", "application/pdf", vec![]);

        assert_eq!(result, Err(AttachmentError::EmptyContent));
    }

    #[test]
    fn test_file_name_and_content_type_are_required() {
        assert_eq!(
            Attachment::from_content(" ", "application/pdf", vec![1]),
            Err(AttachmentError::EmptyFileName)
        );
        assert_eq!(
            Attachment::from_content("report.pdf", "", vec![1]),
            Err(AttachmentError::EmptyContentType)
        );
    }
}
