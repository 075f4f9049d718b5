use axum::Json;
use axum::extract::State;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, warn};

use barlink_types::api::EmailPdfRequest;

use crate::error::{ApiError, require};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("email building error: {0}")]
    Build(#[from] lettre::error::Error),
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Outbound mail over async SMTP.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }

    /// Send the QR-code PDF as an attachment.
    pub async fn send_pdf(&self, to: &str, pdf: Vec<u8>) -> Result<(), MailError> {
        let to: Mailbox = to.parse()?;

        let attachment = Attachment::new("QRCode.pdf".to_string()).body(
            pdf,
            ContentType::parse("application/pdf").expect("static content type"),
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("QR Code PDF")
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(String::from(
                                "<strong>Please find the attached PDF with the QR codes.</strong>",
                            )),
                    )
                    .singlepart(attachment),
            )?;

        self.transport.send(message).await?;
        Ok(())
    }
}

pub async fn send_pdf_by_email(
    State(state): State<AppState>,
    Json(req): Json<EmailPdfRequest>,
) -> Result<&'static str, ApiError> {
    let pdf = require(req.pdf, "pdf")?;
    let email = require(req.email, "email")?;

    let Some(mailer) = state.mailer.as_ref() else {
        warn!("email requested but no SMTP transport is configured");
        return Err(ApiError::Upstream);
    };

    let pdf = B64
        .decode(pdf.as_bytes())
        .map_err(|_| ApiError::invalid("pdf is not valid base64"))?;

    match mailer.send_pdf(&email, pdf).await {
        Ok(()) => Ok("email sent"),
        Err(MailError::Address(e)) => Err(ApiError::invalid(format!("invalid email address: {e}"))),
        Err(e) => {
            error!("email send failed: {e}");
            Err(ApiError::Upstream)
        }
    }
}
