// src/session.rs
use crate::types::FlexError;
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Address family used to reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpFamily {
    #[default]
    Any,
    V4,
    V6,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whole-request timeout in seconds; zero disables it.
    pub timeout: u64,
    pub verify_tls: bool,
    pub ip_family: IpFamily,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: 0,
            verify_tls: true,
            ip_family: IpFamily::Any,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}

#[derive(Clone)]
pub struct Session {
    pub client: Client,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Result<Self, FlexError> {
        let mut client_builder = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90));

        if config.timeout > 0 {
            client_builder = client_builder.timeout(Duration::from_secs(config.timeout));
        }

        if !config.verify_tls {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        // binding the unspecified address pins the socket family
        match config.ip_family {
            IpFamily::Any => {}
            IpFamily::V4 => {
                client_builder = client_builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
            }
            IpFamily::V6 => {
                client_builder = client_builder.local_address(IpAddr::V6(Ipv6Addr::UNSPECIFIED));
            }
        }

        let client = client_builder
            .build()
            .map_err(|e| FlexError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Session { client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_builds() {
        assert!(Session::new(&SessionConfig::default()).is_ok());

        let config = SessionConfig {
            timeout: 5,
            verify_tls: false,
            ip_family: IpFamily::V4,
            ..SessionConfig::default()
        };
        assert!(Session::new(&config).is_ok());
    }
}
