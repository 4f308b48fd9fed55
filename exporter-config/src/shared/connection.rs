use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::shared::ValidationError;

/// Name the exporter reports in `pg_stat_activity`.
pub const APPLICATION_NAME: &str = "exporter";

/// Session settings every extraction connection runs with.
///
/// Timestamps come back in UTC and ISO format so typed pages do not depend on
/// the server defaults.
pub const SESSION_SETTINGS: [(&str, &str); 4] = [
    ("datestyle", "ISO"),
    ("timezone", "UTC"),
    ("client_encoding", "UTF8"),
    ("extra_float_digits", "3"),
];

/// Source database holding the identifier table and the exported tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PgConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Database name.
    pub name: String,
    pub username: String,
    /// Redacted in debug output.
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub tls: TlsConfig,
}

impl PgConnectionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("source.host", &self.host),
            ("source.name", &self.name),
            ("source.username", &self.username),
        ] {
            if value.is_empty() {
                return Err(ValidationError::InvalidFieldValue {
                    field: field.to_string(),
                    constraint: "must not be empty".to_string(),
                });
            }
        }

        self.tls.validate()
    }

    /// Builds sqlx connect options for the configured database.
    ///
    /// With TLS enabled the server certificate is verified against
    /// `tls.trusted_root_certs`, otherwise TLS is only preferred.
    pub fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.name)
            .application_name(APPLICATION_NAME)
            .options(SESSION_SETTINGS);

        options = if self.tls.enabled {
            options
                .ssl_mode(PgSslMode::VerifyFull)
                .ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes())
        } else {
            options.ssl_mode(PgSslMode::Prefer)
        };

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TlsConfig {
    /// PEM-encoded root certificates trusted when verifying the server.
    #[serde(default)]
    pub trusted_root_certs: String,
    #[serde(default)]
    pub enabled: bool,
}

impl TlsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}
