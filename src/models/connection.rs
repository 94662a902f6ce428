//! Connection settings and per-call overrides.

use serde::Serialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Parameters used to open a server connection.
///
/// `url` acts as a base; any explicit field wins over the URL component.
/// Without a URL the defaults are `root@localhost:3306` with no password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSettings {
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ConnectionSettings {
    /// Apply overrides on top of these settings.
    pub fn merged(&self, overrides: &ConnectionOverrides) -> Self {
        Self {
            url: self.url.clone(),
            host: overrides.host.clone().or_else(|| self.host.clone()),
            port: overrides.port.or(self.port),
            user: overrides.user.clone().or_else(|| self.user.clone()),
            password: overrides.password.clone().or_else(|| self.password.clone()),
            database: overrides.database.clone().or_else(|| self.database.clone()),
            connect_timeout: self.connect_timeout,
        }
    }

    fn parsed_url(&self) -> Option<Url> {
        self.url.as_deref().and_then(|u| Url::parse(u).ok())
    }

    /// Default schema: the explicit database, else the URL path.
    pub fn database_name(&self) -> Option<String> {
        self.database
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| self.parsed_url().as_ref().and_then(db_name))
    }

    pub fn effective_host(&self) -> String {
        self.host
            .clone()
            .or_else(|| {
                self.parsed_url()
                    .and_then(|u| u.host_str().map(String::from))
            })
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn effective_port(&self) -> u16 {
        self.port
            .or_else(|| self.parsed_url().and_then(|u| u.port()))
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn effective_user(&self) -> String {
        self.user
            .clone()
            .or_else(|| {
                self.parsed_url()
                    .map(|u| u.username().to_string())
                    .filter(|u| !u.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_USER.to_string())
    }

    /// `user@host:port/db` with no secrets, safe for logs.
    pub fn display_target(&self) -> String {
        let mut target = format!(
            "{}@{}:{}",
            self.effective_user(),
            self.effective_host(),
            self.effective_port()
        );
        if let Some(db) = self.database_name() {
            target.push('/');
            target.push_str(&db);
        }
        target
    }
}

/// Server family, as far as catalog quirks are concerned.
///
/// MariaDB 10.2.7+ reports `COLUMN_DEFAULT` as SQL text: string defaults are
/// quoted, expressions are bare and a `NULL` default is the word `NULL`.
/// MySQL reports the raw literal and flags expressions in `EXTRA`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerFlavor {
    #[default]
    MySql,
    MariaDb,
}

impl ServerFlavor {
    /// Classify a `SELECT VERSION()` string, e.g. `10.6.12-MariaDB-log`.
    pub fn from_version(version: &str) -> Self {
        if version.to_ascii_lowercase().contains("mariadb") {
            Self::MariaDb
        } else {
            Self::MySql
        }
    }
}

impl std::fmt::Display for ServerFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySql => write!(f, "MySQL"),
            Self::MariaDb => write!(f, "MariaDB"),
        }
    }
}

/// Per-call replacements for individual connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl ConnectionOverrides {
    /// Override only the default schema.
    pub fn database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_none()
            && self.port.is_none()
            && self.user.is_none()
            && self.password.is_none()
            && self.database.is_none()
    }
}

fn db_name(url: &Url) -> Option<String> {
    url.path()
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(String::from)
}
