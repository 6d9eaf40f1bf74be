// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP transport built on `lettre`.
//!
//! The service payload is JSON:
//!
//! ```json
//! { "host": "smtp.example.com", "port": 587, "username": "u", "password": "p",
//!   "encryption": "starttls", "content_type": "html" }
//! ```
//!
//! Capitalized keys (`Host`, `Port`, ...) are accepted too, and `port` may be
//! a number or a numeric string.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::Deserialize;
use tracing::debug;

use campaigner_core::{CampaignerError, Envelope, Transport, TransportFactory};

/// Service type key for SMTP services.
pub const SMTP_SERVICE_TYPE: &str = "smtp";

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    /// Upgrade with STARTTLS if the server offers it, plaintext otherwise.
    Opportunistic,
    /// STARTTLS, failing if the server does not offer it.
    StartTls,
    /// TLS from the first byte (SMTPS, usually port 465).
    Implicit,
    /// Plaintext.
    None,
}

impl Encryption {
    fn parse(raw: Option<&str>) -> Result<Self, CampaignerError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::Opportunistic);
        };
        match raw.to_ascii_lowercase().as_str() {
            "tls" | "starttls" => Ok(Self::StartTls),
            "ssl" | "smtps" | "implicit" => Ok(Self::Implicit),
            "none" | "plain" => Ok(Self::None),
            other => Err(CampaignerError::Config(format!(
                "unknown SMTP encryption `{other}` (expected tls, starttls, ssl, or none)"
            ))),
        }
    }
}

/// Body MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Html,
    Plain,
}

impl BodyFormat {
    fn parse(raw: Option<&str>) -> Result<Self, CampaignerError> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("html") | Some("text/html") => Ok(Self::Html),
            Some("plain") | Some("text") | Some("text/plain") => Ok(Self::Plain),
            Some(other) => Err(CampaignerError::Config(format!(
                "unknown content type `{other}` (expected html or plain)"
            ))),
        }
    }

    fn header(self) -> ContentType {
        match self {
            Self::Html => ContentType::TEXT_HTML,
            Self::Plain => ContentType::TEXT_PLAIN,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

/// Raw service payload.
#[derive(Deserialize)]
struct SmtpPayload {
    #[serde(alias = "Host")]
    host: String,
    #[serde(alias = "Port")]
    port: Option<PortValue>,
    #[serde(alias = "Username", default)]
    username: String,
    #[serde(alias = "Password", default)]
    password: String,
    #[serde(alias = "Encryption")]
    encryption: Option<String>,
    #[serde(alias = "ContentType")]
    content_type: Option<String>,
}

/// Parsed SMTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    /// `None` uses the default port for the encryption mode.
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub encryption: Encryption,
    pub body_format: BodyFormat,
}

impl SmtpSettings {
    /// Parse a service payload.
    pub fn from_payload(payload: &str) -> Result<Self, CampaignerError> {
        let raw: SmtpPayload = serde_json::from_str(payload)
            .map_err(|e| CampaignerError::Config(format!("invalid SMTP payload: {e}")))?;

        let host = raw.host.trim().to_string();
        if host.is_empty() {
            return Err(CampaignerError::Config("SMTP host must not be empty".into()));
        }
        let port = match raw.port {
            None => None,
            Some(PortValue::Number(n)) => Some(n),
            Some(PortValue::Text(s)) if s.trim().is_empty() => None,
            Some(PortValue::Text(s)) => Some(s.trim().parse::<u16>().map_err(|_| {
                CampaignerError::Config(format!("SMTP port `{s}` is not a valid port number"))
            })?),
        };

        Ok(Self {
            host,
            port,
            username: raw.username,
            password: raw.password,
            encryption: Encryption::parse(raw.encryption.as_deref())?,
            body_format: BodyFormat::parse(raw.content_type.as_deref())?,
        })
    }
}

fn transport_err<E>(message: impl Into<String>, source: E) -> CampaignerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CampaignerError::Transport {
        message: message.into(),
        source: Some(Box::new(source)),
    }
}

/// Build the MIME message for one envelope.
pub fn build_message(envelope: &Envelope<'_>, format: BodyFormat) -> Result<Message, CampaignerError> {
    let from_address: Address = envelope
        .from_address
        .parse()
        .map_err(|e| transport_err(format!("invalid sender address `{}`", envelope.from_address), e))?;
    let from_name = Some(envelope.from_name.to_string()).filter(|n| !n.trim().is_empty());
    let to: Mailbox = envelope
        .to
        .parse()
        .map_err(|e| transport_err(format!("invalid recipient address `{}`", envelope.to), e))?;

    Message::builder()
        .from(Mailbox::new(from_name, from_address))
        .to(to)
        .subject(envelope.subject)
        .header(format.header())
        .body(envelope.body.to_string())
        .map_err(|e| transport_err("failed to build message", e))
}

/// A configured SMTP relay.
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    body_format: BodyFormat,
}

impl SmtpTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, CampaignerError> {
        let host = settings.host.as_str();
        let tls_params = || {
            TlsParameters::new(host.to_string())
                .map_err(|e| CampaignerError::Config(format!("SMTP TLS setup failed: {e}")))
        };
        let mut builder = match settings.encryption {
            Encryption::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| CampaignerError::Config(format!("SMTP relay setup failed: {e}")))?,
            Encryption::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| CampaignerError::Config(format!("SMTP relay setup failed: {e}")))?,
            Encryption::Opportunistic => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                    .tls(Tls::Opportunistic(tls_params()?))
            }
            Encryption::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }
        Ok(Self {
            mailer: builder.build(),
            body_format: settings.body_format,
        })
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    fn service_type(&self) -> &str {
        SMTP_SERVICE_TYPE
    }

    async fn send(&self, envelope: &Envelope<'_>) -> Result<(), CampaignerError> {
        let message = build_message(envelope, self.body_format)?;
        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| transport_err(format!("SMTP delivery to `{}` failed", envelope.to), e))?;
        debug!(to = envelope.to, code = %response.code(), "SMTP message accepted");
        Ok(())
    }
}

/// Builds [`SmtpTransport`]s from service payloads.
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn service_type(&self) -> &str {
        SMTP_SERVICE_TYPE
    }

    fn configure(&self, payload: &str) -> Result<Box<dyn Transport>, CampaignerError> {
        let settings = SmtpSettings::from_payload(payload)?;
        Ok(Box::new(SmtpTransport::new(&settings)?))
    }
}
