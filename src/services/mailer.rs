// SPDX-License-Identifier: MIT

//! Outbound mail for OTP delivery.
//!
//! SMTP in production, console logging when SMTP is not configured (local
//! development and tests). OTP mail is fire-and-forget: failures are logged
//! and never surfaced to the caller.

use crate::config::Config;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

enum Transport {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: String,
    },
    Console,
}

/// OTP mail sender.
pub struct Mailer {
    transport: Transport,
}

impl Mailer {
    /// Build from config: SMTP when fully configured, console otherwise.
    pub fn new(config: &Config) -> Self {
        let smtp = match (
            &config.smtp_host,
            &config.smtp_username,
            &config.smtp_password,
            &config.smtp_from,
        ) {
            (Some(host), Some(user), Some(pass), Some(from)) => {
                match AsyncSmtpTransport::<Tokio1Executor>::relay(host) {
                    Ok(builder) => {
                        let transport = builder
                            .credentials(Credentials::new(user.clone(), pass.clone()))
                            .build();
                        Some((transport, from.clone()))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "SMTP relay setup failed, using console mailer");
                        None
                    }
                }
            }
            _ => None,
        };

        match smtp {
            Some((transport, from)) => {
                tracing::info!("Mailer configured for SMTP delivery");
                Self {
                    transport: Transport::Smtp { transport, from },
                }
            }
            None => {
                tracing::info!("Mailer running in console mode");
                Self {
                    transport: Transport::Console,
                }
            }
        }
    }

    /// Console-only mailer for tests.
    pub fn new_console() -> Self {
        Self {
            transport: Transport::Console,
        }
    }

    /// Send a verification code. Best effort: errors are logged, not
    /// returned, so OTP issuance never fails on mail problems.
    pub async fn send_otp(&self, email: &str, code: &str) {
        let subject = "Your OTP Code";
        let body = format!(
            "Your verification OTP is {}. It will expire in 5 minutes.",
            code
        );

        match &self.transport {
            Transport::Console => {
                tracing::info!(email, subject, "Console mailer: {}", body);
            }
            Transport::Smtp { transport, from } => {
                let message = Message::builder()
                    .from(match from.parse() {
                        Ok(mailbox) => mailbox,
                        Err(e) => {
                            tracing::error!(error = %e, "Invalid SMTP from address");
                            return;
                        }
                    })
                    .to(match email.parse() {
                        Ok(mailbox) => mailbox,
                        Err(e) => {
                            tracing::error!(error = %e, email, "Invalid recipient address");
                            return;
                        }
                    })
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body);

                let message = match message {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build OTP mail");
                        return;
                    }
                };

                if let Err(e) = transport.send(message).await {
                    tracing::error!(error = %e, email, "Failed to send OTP mail");
                } else {
                    tracing::debug!(email, "OTP mail sent");
                }
            }
        }
    }
}
