use std::{fmt, time::Duration};

use crate::error::RconError;

/// Where to connect and how long any single network operation may block.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConnectionInfo {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub timeout: Duration,
}

impl ServerConnectionInfo {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        ServerConnectionInfo {
            host: host.into(),
            port,
            password: password.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, RconError> {
        self.timeout = timeout;
        self.validate()?;
        Ok(self)
    }

    /// Checked again by `Connection::connect`, since the fields are public.
    pub fn validate(&self) -> Result<(), RconError> {
        if self.timeout.is_zero() {
            return Err(RconError::InvalidConfiguration(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(RconError::InvalidConfiguration(
                "host must not be empty".to_string(),
            ));
        }
        if self.password.contains('\0') {
            return Err(RconError::InvalidConfiguration(
                "password must not contain null bytes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// keep the password out of logs
impl fmt::Debug for ServerConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConnectionInfo")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
