//! Application Configuration
//!
//! Everything is read once at startup into [`AppConfig`] and handed to the
//! components that need it.

use std::time::Duration;

use anyhow::{Context, bail};
use invoice_core::ServiceConfig;
use invoice_mail::SmtpConfig;

/// Process-wide configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Listen port, bound on all interfaces
    pub port: u16,

    /// Externally reachable origin, used in Stripe redirect URLs
    pub base_url: String,

    /// sqlx SQLite connection string
    pub database_url: String,

    pub stripe_secret_key: String,

    /// Accepted for parity with the Stripe dashboard settings; not used server-side
    pub stripe_public_key: Option<String>,

    pub webhook_secret: String,

    /// `None` disables email delivery
    pub smtp: Option<SmtpConfig>,

    pub gateway_timeout: Duration,

    pub mail_timeout: Duration,
}

impl AppConfig {
    /// Load from the process environment (after `.env` has been applied)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through `lookup`, which maps variable names to values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT is not a port: '{p}'"))?,
            None => 5000,
        };

        let Some(stripe_secret_key) = var("STRIPE_SECRET_KEY").or_else(|| var("STRIPE_SECRET"))
        else {
            bail!("STRIPE_SECRET_KEY not set");
        };
        let Some(webhook_secret) = var("STRIPE_WEBHOOK_SECRET") else {
            bail!("STRIPE_WEBHOOK_SECRET not set");
        };

        let mail_timeout = seconds(var("MAIL_TIMEOUT_SECS"), 10, "MAIL_TIMEOUT_SECS")?;
        let smtp = SmtpConfig::from_lookup(&lookup)
            .context("invalid SMTP settings")?
            .map(|smtp| smtp.with_timeout(mail_timeout));

        Ok(Self {
            port,
            base_url: var("BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}")),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://invoices.db?mode=rwc".into()),
            stripe_secret_key,
            stripe_public_key: var("STRIPE_PUBLIC_KEY").or_else(|| var("STRIPE_PUBLIC")),
            webhook_secret,
            smtp,
            gateway_timeout: seconds(var("GATEWAY_TIMEOUT_SECS"), 15, "GATEWAY_TIMEOUT_SECS")?,
            mail_timeout,
        })
    }

    /// Settings for the invoice coordinator
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            base_url: self.base_url.clone(),
            gateway_timeout: self.gateway_timeout,
            notify_timeout: self.mail_timeout,
            ..Default::default()
        }
    }
}

fn seconds(value: Option<String>, default: u64, name: &str) -> anyhow::Result<Duration> {
    let secs = match value {
        Some(v) => v
            .parse()
            .with_context(|| format!("{name} must be a whole number of seconds"))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("STRIPE_SECRET_KEY", "sk_test_123"),
        ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.database_url, "sqlite://invoices.db?mode=rwc");
        assert!(config.smtp.is_none());
        assert_eq!(config.gateway_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_legacy_stripe_names_accepted() {
        let config = load(&[
            ("STRIPE_SECRET", "sk_test_legacy"),
            ("STRIPE_PUBLIC", "pk_test_legacy"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.stripe_secret_key, "sk_test_legacy");
        assert_eq!(config.stripe_public_key.as_deref(), Some("pk_test_legacy"));
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_missing_secrets_fail() {
        assert!(load(&[("STRIPE_WEBHOOK_SECRET", "whsec_123")]).is_err());
        assert!(load(&[("STRIPE_SECRET_KEY", "sk_test_123")]).is_err());
    }

    #[test]
    fn test_smtp_and_timeouts() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("EMAIL_USER", "billing@example.com"),
            ("EMAIL_PASS", "app-password"),
            ("MAIL_TIMEOUT_SECS", "3"),
            ("BASE_URL", "https://pay.example.com"),
        ]);
        let config = load(&vars).unwrap();

        let smtp = config.smtp.as_ref().unwrap();
        assert_eq!(smtp.timeout, Duration::from_secs(3));
        assert_eq!(config.service_config().base_url, "https://pay.example.com");
        assert_eq!(config.service_config().notify_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "http"));
        assert!(load(&vars).is_err());
    }
}
