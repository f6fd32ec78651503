use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::EmailResult;

/// `SendVerification` / `SendPasswordReset` from §4.8's magic-link flows.
/// Callers build the link (issuer host + token) themselves; this crate only
/// owns delivery. Implementations must never surface a send failure to the
/// caller as anything other than a logged warning — magic-link request
/// endpoints are enumeration-safe and always return 200 regardless of
/// whether the mail actually went out.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, verify_url: &str) -> EmailResult<()>;
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> EmailResult<()>;
}

#[derive(Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

/// Sends through the Resend HTTP API (`RESEND_API_KEY`/`EMAIL_FROM`), the
/// only transport spec §6's environment surface names.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
        }
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> EmailResult<()> {
        let body = ResendEmail {
            from: &self.from,
            to: [to],
            subject,
            html,
        };
        let response = self
            .http
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(crate::error::EmailError::SendFailed(format!(
                "resend returned {status}: {text}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_verification(&self, to: &str, verify_url: &str) -> EmailResult<()> {
        self.send(
            to,
            "Verify your email",
            format!(r#"<p>Confirm your email address by visiting <a href="{verify_url}">{verify_url}</a>.</p>"#),
        )
        .await
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> EmailResult<()> {
        self.send(
            to,
            "Reset your password",
            format!(r#"<p>Reset your password by visiting <a href="{reset_url}">{reset_url}</a>. If you didn't request this, ignore this email.</p>"#),
        )
        .await
    }
}

/// Used when `RESEND_API_KEY` isn't configured (local development, tests):
/// logs the link at info level instead of sending anything.
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_verification(&self, to: &str, verify_url: &str) -> EmailResult<()> {
        info!(to, verify_url, "RESEND_API_KEY not set; logging verification link instead of sending");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> EmailResult<()> {
        info!(to, reset_url, "RESEND_API_KEY not set; logging password-reset link instead of sending");
        Ok(())
    }
}

/// Builds the configured mailer: `ResendMailer` when an API key is present,
/// `LoggingMailer` otherwise. A send failure from either is only ever
/// logged by the caller, never surfaced (enumeration safety, spec §4.8).
pub fn build_mailer(resend_api_key: Option<String>, from: String) -> Box<dyn Mailer> {
    match resend_api_key {
        Some(key) => Box::new(ResendMailer::new(key, from)),
        None => {
            warn!("no RESEND_API_KEY configured; magic-link emails will only be logged");
            Box::new(LoggingMailer)
        }
    }
}
