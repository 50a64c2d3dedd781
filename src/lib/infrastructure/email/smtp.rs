//! SMTP mail transport

use askama::Template;
use async_trait::async_trait;
use clap::Parser;
use lettre::{
    address::Address,
    message::{
        header::ContentType, Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error};

use crate::{
    domain::{
        communication::mailer::{Mailer, MailerError},
        emails::{AttachmentSource, EmailMessage, Recipient},
    },
    infrastructure::health::DependencyCheck,
};

/// SMTP configuration
#[derive(Clone, Debug, Parser)]
pub struct SMTPConfig {
    /// The SMTP host
    #[clap(long = "smtp-host", env = "SMTP_HOST")]
    pub host: String,

    /// The SMTP port
    #[clap(long = "smtp-port", env = "SMTP_PORT", default_value = "587")]
    pub port: u16,

    /// The SMTP username; authentication is skipped when empty
    #[clap(long = "smtp-user", env = "SMTP_USER", default_value = "")]
    pub username: String,

    /// The SMTP password
    #[clap(long = "smtp-password", env = "SMTP_PASSWORD", default_value = "")]
    pub password: String,

    /// The display name of the sender
    #[clap(long = "smtp-from-name", env = "SMTP_FROM_NAME", default_value = "Billing")]
    pub from_name: String,

    /// The sender email address
    #[clap(long = "smtp-sender", env = "SMTP_SENDER")]
    pub sender: String,

    /// Verify the TLS certificate
    #[clap(long = "smtp-verify-tls", env = "SMTP_VERIFY_TLS", default_value = "true", action = clap::ArgAction::Set)]
    pub verify_tls: bool,

    /// Enable STARTTLS (TLS upgrade on connection)
    #[clap(long = "smtp-starttls", env = "SMTP_STARTTLS", default_value = "true", action = clap::ArgAction::Set)]
    pub starttls: bool,
}

#[derive(Debug)]
struct SecureLink<'a> {
    file_name: &'a str,
    url: &'a str,
}

/// Link attachments appended to an HTML body
#[derive(Debug, Template)]
#[template(path = "emails/secure_links.html")]
struct SecureLinksHtml<'a> {
    links: &'a [SecureLink<'a>],
}

/// Link attachments appended to a plain text body
#[derive(Debug, Template)]
#[template(path = "emails/secure_links.txt")]
struct SecureLinksText<'a> {
    links: &'a [SecureLink<'a>],
}

/// SMTP mailer
#[derive(Clone)]
pub struct SMTPMailer {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SMTPMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SMTPMailer")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl SMTPMailer {
    /// Create a new SMTP mailer
    pub fn new(config: &SMTPConfig) -> Result<Self, MailerError> {
        let address = config
            .sender
            .parse::<Address>()
            .map_err(|err| MailerError::InvalidEmail(format!("{}: {err}", config.sender)))?;

        Ok(Self {
            sender: Mailbox::new(Some(config.from_name.clone()), address),
            transport: transport(config)?,
        })
    }

    /// Build the MIME message for an email
    pub fn message(&self, email: &EmailMessage) -> Result<Message, MailerError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(email.content().subject());

        for recipient in email.recipients() {
            builder = builder.to(mailbox(recipient)?);
        }

        for recipient in email.cc_recipients() {
            builder = builder.cc(mailbox(recipient)?);
        }

        for recipient in email.bcc_recipients() {
            builder = builder.bcc(mailbox(recipient)?);
        }

        let body = body_part(email)?;

        let mut files = email
            .attachments()
            .iter()
            .filter_map(|attachment| match attachment.source() {
                AttachmentSource::Content(content) => {
                    Some((attachment.file_name(), attachment.content_type(), content))
                }
                AttachmentSource::Link(_) => None,
            })
            .peekable();

        let message = if files.peek().is_none() {
            builder.singlepart(body)
        } else {
            let mut multipart = MultiPart::mixed().singlepart(body);

            for (file_name, content_type, content) in files {
                let content_type = ContentType::parse(content_type).map_err(|err| {
                    MailerError::InvalidMessage(format!("{file_name}: {err}"))
                })?;

                multipart = multipart.singlepart(
                    MimeAttachment::new(file_name.to_string()).body(content.clone(), content_type),
                );
            }

            builder.multipart(multipart)
        };

        message.map_err(|err| MailerError::InvalidMessage(err.to_string()))
    }
}

#[async_trait]
impl DependencyCheck for SMTPMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    #[mutants::skip]
    async fn check(&self) -> anyhow::Result<()> {
        if self.transport.test_connection().await? {
            Ok(())
        } else {
            anyhow::bail!("SMTP server did not accept the connection")
        }
    }
}

#[async_trait]
impl Mailer for SMTPMailer {
    #[mutants::skip]
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailerError> {
        let message = self.message(email)?;

        match self.transport.send(message).await {
            Ok(_) => {
                debug!(email_id = %email.id(), "SMTP server accepted email");

                Ok(())
            }
            Err(err) => {
                error!(email_id = %email.id(), error = %err, "SMTP delivery failed");

                Err(MailerError::SendError(err.to_string()))
            }
        }
    }
}

#[mutants::skip]
fn transport(config: &SMTPConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
    let tls_parameters = TlsParameters::builder(config.host.clone())
        .dangerous_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(|err| MailerError::UnknownError(err.into()))?;

    let builder = if config.starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
    }
    .map_err(|err| MailerError::UnknownError(err.into()))?;

    let tls = if config.starttls {
        Tls::Required(tls_parameters)
    } else {
        Tls::Wrapper(tls_parameters)
    };

    let builder = builder.port(config.port).tls(tls);

    Ok(if config.username.is_empty() {
        builder.build()
    } else {
        builder
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build()
    })
}

fn mailbox(recipient: &Recipient) -> Result<Mailbox, MailerError> {
    let address = recipient
        .address()
        .as_str()
        .parse::<Address>()
        .map_err(|err| MailerError::InvalidEmail(format!("{}: {err}", recipient.address())))?;

    Ok(Mailbox::new(Some(recipient.name().to_string()), address))
}

fn body_part(email: &EmailMessage) -> Result<SinglePart, MailerError> {
    let body = body(email)?;

    Ok(if email.content().is_html() {
        SinglePart::html(body)
    } else {
        SinglePart::plain(body)
    })
}

/// The email body followed by the list of its link attachments
fn body(email: &EmailMessage) -> Result<String, MailerError> {
    let content = email.content();

    let links = email
        .attachments()
        .iter()
        .filter_map(|attachment| {
            attachment.link().map(|url| SecureLink {
                file_name: attachment.file_name(),
                url: url.as_str(),
            })
        })
        .collect::<Vec<_>>();

    let mut body = content.body().to_string();

    if !links.is_empty() {
        let block = if content.is_html() {
            SecureLinksHtml { links: &links }.render()
        } else {
            SecureLinksText { links: &links }.render()
        };

        body.push_str(&block.map_err(|err| MailerError::InvalidMessage(err.to_string()))?);
    }

    Ok(body)
}
