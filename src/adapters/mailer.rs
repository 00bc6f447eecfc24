//! Outbound mail via SMTP.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport as _};
use tracing::{error, info, warn};

use crate::config::MailerConfig;
use crate::ports::MailerPort;

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailerConfig) -> anyhow::Result<Self> {
        let mut builder = SmtpTransport::relay(&config.host)?.port(config.port);
        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }
}

impl MailerPort for SmtpMailer {
    fn send(&self, to: &str, subject: &str, text: &str) {
        info!("sending mail to {to}");
        let message = match Message::builder()
            .from(self.from.clone())
            .to(match to.parse() {
                Ok(mailbox) => mailbox,
                Err(err) => {
                    warn!("invalid recipient address {to}: {err}");
                    return;
                }
            })
            .subject(subject)
            .body(text.to_owned())
        {
            Ok(message) => message,
            Err(err) => {
                warn!("unable to build mail to {to}: {err}");
                return;
            }
        };
        // SMTP delivery is blocking; keep it off the async workers.
        let transport = self.transport.clone();
        let to = to.to_owned();
        tokio::task::spawn_blocking(move || match transport.send(&message) {
            Ok(_) => info!("mail sent to {to}"),
            Err(err) => error!("unable to send mail to {to}: {err}"),
        });
    }
}

/// Mailer used when no SMTP host is configured; drops mails with a log line.
pub struct NoopMailer;

impl MailerPort for NoopMailer {
    fn send(&self, to: &str, subject: &str, _text: &str) {
        info!("mailer disabled, dropping mail to {to}: {subject}");
    }
}
