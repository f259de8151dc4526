use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;
use thiserror::Error;

use crate::config::Settings;
use crate::models::AlertType;
use crate::services::alert_engine::AlertNotifier;

/// Everything one triggered alert needs to become an email.
#[derive(Debug, Clone)]
pub struct PriceAlertEmail {
    pub recipient_email: String,
    pub recipient_name: String,
    pub symbol: String,
    pub company: String,
    pub current_price: f64,
    pub target_price: f64,
    pub alert_type: AlertType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP transport is not configured")]
    Unconfigured,

    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

const UPPER_ALERT_BODY: &str = r#"<div style="font-family:sans-serif;max-width:520px;margin:0 auto">
  <p style="margin:0 0 8px 0">Hi {{name}},</p>
  <h2 style="color:#0a7f3f;margin-bottom:4px">{{symbol}} hit your upper target</h2>
  <p style="margin:0 0 16px 0;color:#555">{{company}}</p>
  <p><strong>Current price:</strong> {{current_price}}<br>
     <strong>Your target:</strong> {{target_price}} or above</p>
  <p style="color:#888;font-size:13px">Checked at {{timestamp}}. This alert stays active and will
  notify you again on the next check unless you disable it.</p>
</div>"#;

const LOWER_ALERT_BODY: &str = r#"<div style="font-family:sans-serif;max-width:520px;margin:0 auto">
  <p style="margin:0 0 8px 0">Hi {{name}},</p>
  <h2 style="color:#b3261e;margin-bottom:4px">{{symbol}} hit your lower target</h2>
  <p style="margin:0 0 16px 0;color:#555">{{company}}</p>
  <p><strong>Current price:</strong> {{current_price}}<br>
     <strong>Your target:</strong> {{target_price}} or below</p>
  <p style="color:#888;font-size:13px">Checked at {{timestamp}}. This alert stays active and will
  notify you again on the next check unless you disable it.</p>
</div>"#;

/// Outbound email sender. When the SMTP env vars are absent the transport is
/// `None` and every send fails softly with `MailError::Unconfigured`; the
/// evaluation engine logs and moves on.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    hbs: Arc<Handlebars<'static>>,
}

impl Mailer {
    pub fn from_settings(settings: &Settings) -> Self {
        let transport = if settings.smtp_host.trim().is_empty() {
            None
        } else {
            match AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host) {
                Ok(builder) => {
                    let mut builder = builder.port(settings.smtp_port);
                    if !settings.smtp_username.is_empty() {
                        builder = builder.credentials(Credentials::new(
                            settings.smtp_username.clone(),
                            settings.smtp_password.clone(),
                        ));
                    }
                    Some(builder.build())
                }
                Err(e) => {
                    tracing::warn!("invalid SMTP relay {:?}: {}", settings.smtp_host, e);
                    None
                }
            }
        };

        let mut hbs = Handlebars::new();
        hbs.register_template_string("alerts/upper", UPPER_ALERT_BODY)
            .expect("template alerts/upper");
        hbs.register_template_string("alerts/lower", LOWER_ALERT_BODY)
            .expect("template alerts/lower");

        Mailer {
            transport,
            from: settings.mail_from.clone(),
            hbs: Arc::new(hbs),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub async fn send_price_alert(&self, alert: &PriceAlertEmail) -> Result<(), MailError> {
        let Some(transport) = &self.transport else {
            return Err(MailError::Unconfigured);
        };

        let template = match alert.alert_type {
            AlertType::Upper => "alerts/upper",
            AlertType::Lower => "alerts/lower",
        };

        let html = self.hbs.render(
            template,
            &json!({
                "name": alert.recipient_name,
                "symbol": alert.symbol,
                "company": alert.company,
                "current_price": fmt_price(alert.current_price),
                "target_price": fmt_price(alert.target_price),
                "timestamp": fmt_timestamp(alert.timestamp),
            }),
        )?;

        let subject = match alert.alert_type {
            AlertType::Upper => format!("Price Alert: {} Hit Upper Target", alert.symbol),
            AlertType::Lower => format!("Price Alert: {} Hit Lower Target", alert.symbol),
        };

        let cmp = match alert.alert_type {
            AlertType::Upper => ">=",
            AlertType::Lower => "<=",
        };
        let text = format!(
            "{} price {} {}. Current: {}",
            alert.symbol,
            cmp,
            fmt_price(alert.target_price),
            fmt_price(alert.current_price),
        );

        let message = Message::builder()
            .from(self.from.parse::<Mailbox>()?)
            .to(alert.recipient_email.parse::<Mailbox>()?)
            .subject(subject)
            .multipart(lettre::message::MultiPart::alternative_plain_html(
                text, html,
            ))?;

        transport.send(message).await?;

        Ok(())
    }
}

#[async_trait]
impl AlertNotifier for Mailer {
    async fn send_price_alert(&self, email: &PriceAlertEmail) -> Result<(), String> {
        Mailer::send_price_alert(self, email)
            .await
            .map_err(|e| e.to_string())
    }
}

fn fmt_price(x: f64) -> String {
    format!("${:.2}", x)
}

fn fmt_timestamp(t: DateTime<Utc>) -> String {
    t.format("%b %d, %Y %H:%M UTC").to_string()
}
