use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::MailConfig;

const DEFAULT_FROM: &str = "Stockroom <no-reply@stockroom.local>";

/// A rendered email, ready to hand to a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;

    /// Short transport name for logs and health output.
    fn kind(&self) -> &'static str;
}

/// SMTP connection settings, from the stored email configuration or the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl SmtpSettings {
    pub fn from_env(cfg: &MailConfig) -> Option<Self> {
        Some(Self {
            server: cfg.server.clone()?,
            port: cfg.port,
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            from: cfg.from.clone(),
        })
    }
}

type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, timeout: Duration) -> anyhow::Result<Self> {
        // 465 is implicit TLS, everything else negotiates STARTTLS
        let mut builder = if settings.port == 465 {
            SmtpTransport::relay(&settings.server)
        } else {
            SmtpTransport::starttls_relay(&settings.server)
        }
        .with_context(|| format!("smtp relay {}", settings.server))?
        .port(settings.port)
        .timeout(Some(timeout));

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = settings
            .from
            .as_deref()
            .or(settings.username.as_deref().filter(|u| u.contains('@')))
            .unwrap_or(DEFAULT_FROM)
            .parse::<Mailbox>()
            .context("invalid sender address")?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        anyhow::ensure!(!email.to.is_empty(), "no recipients");

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML);
        for to in &email.to {
            let mailbox: Mailbox = to
                .parse()
                .with_context(|| format!("invalid recipient {to}"))?;
            builder = builder.to(mailbox);
        }
        let message = builder.body(email.html.clone()).context("build email")?;

        self.transport.send(message).await.context("smtp send")?;
        info!(recipients = email.to.len(), subject = %email.subject, "email sent");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "smtp"
    }
}

/// Used when no SMTP server is configured: alerts are written to the log
/// and treated as delivered.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        warn!(
            to = ?email.to,
            subject = %email.subject,
            "smtp not configured; email logged instead of sent"
        );
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "log"
    }
}

/// Build the mailer for the given settings, falling back to [`LogMailer`].
pub fn build_mailer(settings: Option<&SmtpSettings>, timeout: Duration) -> Arc<dyn Mailer> {
    match settings {
        Some(s) => match SmtpMailer::new(s, timeout) {
            Ok(m) => {
                info!(server = %s.server, port = s.port, "smtp mailer ready");
                Arc::new(m)
            }
            Err(e) => {
                warn!(error = %e, "smtp mailer could not be built; logging emails instead");
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    }
}

/// Live mailer shared by all requests. Swapped when the email configuration
/// changes; every send is bounded by `timeout`.
pub struct MailerHandle {
    inner: RwLock<Arc<dyn Mailer>>,
    timeout: Duration,
}

impl MailerHandle {
    pub fn new(mailer: Arc<dyn Mailer>, timeout: Duration) -> Self {
        Self {
            inner: RwLock::new(mailer),
            timeout,
        }
    }

    pub async fn replace(&self, mailer: Arc<dyn Mailer>) {
        info!(kind = mailer.kind(), "mailer replaced");
        *self.inner.write().await = mailer;
    }

    pub async fn current(&self) -> Arc<dyn Mailer> {
        self.inner.read().await.clone()
    }

    pub async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        let mailer = self.current().await;
        tokio::time::timeout(self.timeout, mailer.send(email))
            .await
            .map_err(|_| anyhow::anyhow!("email send timed out after {:?}", self.timeout))?
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every email; optionally fails each send.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("smtp unavailable");
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }

        fn kind(&self) -> &'static str {
            "recording"
        }
    }

    /// Never completes, for timeout tests.
    pub struct StuckMailer;

    #[async_trait]
    impl Mailer for StuckMailer {
        async fn send(&self, _email: &OutgoingEmail) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        fn kind(&self) -> &'static str {
            "stuck"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingMailer, StuckMailer};
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: vec!["admin@example.com".into()],
            subject: "hello".into(),
            html: "<p>hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn handle_swaps_mailer() {
        let first = Arc::new(RecordingMailer::default());
        let second = Arc::new(RecordingMailer::default());
        let handle = MailerHandle::new(first.clone(), Duration::from_secs(1));

        handle.send(&email()).await.unwrap();
        handle.replace(second.clone()).await;
        handle.send(&email()).await.unwrap();

        assert_eq!(first.sent().len(), 1);
        assert_eq!(second.sent().len(), 1);
    }

    #[tokio::test]
    async fn handle_times_out_slow_mailer() {
        let handle = MailerHandle::new(Arc::new(StuckMailer), Duration::from_millis(20));
        let err = handle.send(&email()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn env_settings_require_a_server() {
        let cfg = MailConfig {
            port: 587,
            ..Default::default()
        };
        assert!(SmtpSettings::from_env(&cfg).is_none());

        let cfg = MailConfig {
            server: Some("smtp.example.com".into()),
            port: 2525,
            ..Default::default()
        };
        let s = SmtpSettings::from_env(&cfg).unwrap();
        assert_eq!(s.port, 2525);
    }

    #[tokio::test]
    async fn smtp_mailer_builds_without_connecting() {
        let settings = SmtpSettings {
            server: "smtp.example.com".into(),
            port: 587,
            username: Some("alerts@example.com".into()),
            password: Some("pw".into()),
            from: None,
        };
        let mailer = build_mailer(Some(&settings), Duration::from_secs(5));
        assert_eq!(mailer.kind(), "smtp");
        assert_eq!(build_mailer(None, Duration::from_secs(5)).kind(), "log");
    }
}
