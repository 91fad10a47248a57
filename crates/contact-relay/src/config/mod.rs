use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use lettre::address::AddressError;
use lettre::Address;

const DEFAULT_PORT: &str = "5001";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: &str = "587";
const DEFAULT_SENDER_NAME: &str = "Portfolio Contact";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            mail: MailConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound mail account and relay settings.
///
/// `account` and `secret` are required; everything else has a default that
/// matches a Gmail STARTTLS relay. Both addresses are parsed at load time so a
/// malformed mailbox stops startup instead of failing every notification.
#[derive(Clone)]
pub struct MailConfig {
    pub account: Address,
    pub secret: String,
    pub recipient: Address,
    pub sender_name: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl MailConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let account = required_var("EMAIL_USER");
        let secret = required_var("CONTACT_EMAIL_PASS");

        let (account, secret) = match (account, secret) {
            (Some(account), Some(secret)) => (account, secret),
            (account, secret) => {
                let mut missing = Vec::new();
                if account.is_none() {
                    missing.push("EMAIL_USER");
                }
                if secret.is_none() {
                    missing.push("CONTACT_EMAIL_PASS");
                }
                return Err(ConfigError::MissingVariables(missing));
            }
        };

        let account = parse_address("EMAIL_USER", &account)?;
        let recipient = match required_var("CONTACT_RECIPIENT") {
            Some(raw) => parse_address("CONTACT_RECIPIENT", &raw)?,
            None => account.clone(),
        };
        let sender_name = required_var("CONTACT_SENDER_NAME")
            .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());
        let smtp_host =
            required_var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let smtp_port = required_var("SMTP_PORT")
            .unwrap_or_else(|| DEFAULT_SMTP_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        Ok(Self {
            account,
            secret,
            recipient,
            sender_name,
            smtp_host,
            smtp_port,
        })
    }

    /// Length of the credential secret, the only detail about it that is safe to log.
    pub fn secret_len(&self) -> usize {
        self.secret.chars().count()
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("sender_name", &self.sender_name)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

fn required_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_address(variable: &'static str, raw: &str) -> Result<Address, ConfigError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|source| ConfigError::InvalidAddress { variable, source })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidSmtpPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingVariables(Vec<&'static str>),
    InvalidAddress {
        variable: &'static str,
        source: AddressError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingVariables(names) => write!(
                f,
                "missing required environment variables: {}",
                names.join(", ")
            ),
            ConfigError::InvalidAddress { variable, .. } => {
                write!(f, "{variable} must be a valid email address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidAddress { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSmtpPort
            | ConfigError::MissingVariables(_) => None,
        }
    }
}
