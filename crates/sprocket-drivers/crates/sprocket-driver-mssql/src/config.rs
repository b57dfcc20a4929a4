//! Connection configuration for the MS SQL Server transport

use tiberius::{AuthMethod, Config, EncryptionLevel};

/// Connection settings for [`MssqlTransport`](crate::MssqlTransport).
///
/// ```
/// use sprocket_driver_mssql::MssqlConfig;
///
/// let config = MssqlConfig::new("db.internal")
///     .database("inventory")
///     .credentials("svc_sprocket", "s3cret")
///     .trust_cert();
/// ```
#[derive(Debug, Clone)]
pub struct MssqlConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub trust_cert: bool,
}

impl MssqlConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 1433,
            database: None,
            username: None,
            password: None,
            trust_cert: false,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// SQL Server authentication. Without credentials the transport
    /// falls back to integrated authentication, which only exists on
    /// Windows.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Trust the server certificate (dev/testing setups).
    pub fn trust_cert(mut self) -> Self {
        self.trust_cert = true;
        self
    }

    pub(crate) fn to_tiberius(&self) -> Result<Config, crate::MssqlTransportError> {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);

        if let Some(db) = &self.database {
            config.database(db);
        }
        if self.trust_cert {
            config.trust_cert();
        }
        config.encryption(EncryptionLevel::Required);

        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                config.authentication(AuthMethod::sql_server(user, pass));
            }
            (Some(user), None) => {
                config.authentication(AuthMethod::sql_server(user, ""));
            }
            (None, _) => {
                #[cfg(windows)]
                {
                    config.authentication(AuthMethod::Integrated);
                }
                #[cfg(not(windows))]
                {
                    return Err(crate::MssqlTransportError::AuthenticationFailed(
                        "integrated authentication is only supported on Windows".to_string(),
                    ));
                }
            }
        }

        Ok(config)
    }
}

impl Default for MssqlConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}
