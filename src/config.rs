//! Environment-driven configuration.
//!
//! All knobs live in `PHOTO_REVIEW_*` environment variables with development
//! defaults; a `.env` file is honored at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// SMTP delivery parameters. An empty host disables email entirely.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// STARTTLS after plain connect.
    pub use_tls: bool,
    /// Implicit TLS (SMTPS); takes precedence over `use_tls`.
    pub use_ssl: bool,
    pub from: String,
    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn enabled(&self) -> bool {
        !self.host.is_empty() && !self.from.is_empty()
    }

    pub fn disabled() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            use_tls: true,
            use_ssl: false,
            from: String::new(),
            timeout: Duration::from_secs(8),
        }
    }
}

/// Service configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub admin_username: String,
    pub admin_password: String,
    /// Signs the admin session cookie.
    pub secret_key: String,
    pub smtp: SmtpConfig,
    /// Recipient of "new upload" notifications.
    pub admin_notify_email: String,
    /// Prefixed to site-relative links in emails, e.g. "https://photos.example.org".
    pub public_base_url: String,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        let smtp_user = env_or("PHOTO_REVIEW_SMTP_USER", "").trim().to_string();
        let smtp = SmtpConfig {
            host: env_or("PHOTO_REVIEW_SMTP_HOST", "").trim().to_string(),
            port: env_or("PHOTO_REVIEW_SMTP_PORT", "587").parse().unwrap_or(587),
            username: smtp_user.clone(),
            password: env_or("PHOTO_REVIEW_SMTP_PASS", "").trim().to_string(),
            use_tls: env_or("PHOTO_REVIEW_SMTP_USE_TLS", "1").trim() == "1",
            use_ssl: env_or("PHOTO_REVIEW_SMTP_USE_SSL", "0").trim() == "1",
            from: env_or("PHOTO_REVIEW_SMTP_FROM", &smtp_user).trim().to_string(),
            timeout: Duration::from_secs(
                env_or("PHOTO_REVIEW_SMTP_TIMEOUT_SEC", "8").parse().unwrap_or(8),
            ),
        };

        Self {
            bind_addr: env_or("PHOTO_REVIEW_BIND", "127.0.0.1:8080"),
            db_path: PathBuf::from(env_or("PHOTO_REVIEW_DB_PATH", "photoreview.db")),
            uploads_dir: PathBuf::from(env_or("PHOTO_REVIEW_UPLOADS_DIR", "uploads")),
            admin_username: env_or("PHOTO_REVIEW_ADMIN_USER", "admin"),
            admin_password: env_or("PHOTO_REVIEW_ADMIN_PASS", "admin"),
            secret_key: env_or("PHOTO_REVIEW_SECRET_KEY", "change-me-in-production"),
            smtp,
            admin_notify_email: env_or("PHOTO_REVIEW_ADMIN_NOTIFY_EMAIL", "")
                .trim()
                .to_lowercase(),
            public_base_url: env_or("PHOTO_REVIEW_BASE_URL", "")
                .trim()
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn thumbs_dir(&self) -> PathBuf {
        self.uploads_dir.join("thumbs")
    }

    /// Prefix a site-relative path with the public base URL when configured.
    pub fn public_url(&self, path: &str) -> String {
        if self.public_base_url.is_empty() {
            path.to_string()
        } else {
            format!("{}{}", self.public_base_url, path)
        }
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::create_dir_all(&self.uploads_dir)?;
        std::fs::create_dir_all(self.thumbs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_prefixes_only_when_configured() {
        let mut config = Config {
            bind_addr: "127.0.0.1:0".to_string(),
            db_path: PathBuf::from("test.db"),
            uploads_dir: PathBuf::from("uploads"),
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
            secret_key: "secret".to_string(),
            smtp: SmtpConfig::disabled(),
            admin_notify_email: String::new(),
            public_base_url: String::new(),
        };
        assert_eq!(config.public_url("/user/a%40b"), "/user/a%40b");

        config.public_base_url = "https://photos.example.org".to_string();
        assert_eq!(
            config.public_url("/user/a%40b"),
            "https://photos.example.org/user/a%40b"
        );
    }

    #[test]
    fn smtp_disabled_without_host() {
        assert!(!SmtpConfig::disabled().enabled());
    }
}
