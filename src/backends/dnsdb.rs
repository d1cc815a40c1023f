// src/backends/dnsdb.rs
use crate::backends::Backend;
use crate::fence::Fence;
use crate::types::{FlexError, QueryDescriptor, QueryPath};
use url::Url;

const DEFAULT_SERVER: &str = "https://api.dnsdb.info";
const API_PREFIX: &str = "dnsdb/v2";

const CONFIG_EXPORTS: &[(&str, &str)] = &[
    ("apikey", "${DNSDB_API_KEY:-$APIKEY}"),
    ("server", "$DNSDB_SERVER"),
];

/// DNSDB API version 2, flexible search endpoints.
#[derive(Debug, Clone)]
pub struct DnsdbBackend {
    name: String,
    api_key: Option<String>,
    server: String,
}

impl Default for DnsdbBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsdbBackend {
    pub fn new() -> Self {
        Self {
            name: "dnsdb2".to_string(),
            api_key: None,
            server: DEFAULT_SERVER.to_string(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn build_error(&self, message: String) -> FlexError {
        FlexError::BackendError {
            backend: self.name.clone(),
            message,
        }
    }
}

impl Backend for DnsdbBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn config_exports(&self) -> &'static [(&'static str, &'static str)] {
        CONFIG_EXPORTS
    }

    fn ready(&self) -> Result<(), FlexError> {
        match &self.api_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(FlexError::usage(format!("{}: no API key given", self.name))),
        }
    }

    fn ingest_setting(&mut self, key: &str, value: &str) -> Result<(), FlexError> {
        match key {
            "apikey" => self.api_key = Some(value.to_string()),
            "server" => self.server = value.to_string(),
            _ => {
                return Err(FlexError::usage(format!(
                    "{}: unknown setting '{}'",
                    self.name, key
                )));
            }
        }
        Ok(())
    }

    fn build_url(
        &self,
        path: &QueryPath,
        qd: &QueryDescriptor,
        fence: &Fence,
    ) -> Result<Url, FlexError> {
        let base = format!(
            "{}/{}/{}",
            self.server.trim_end_matches('/'),
            API_PREFIX,
            path.encoded()
        );
        let mut url = Url::parse(&base)
            .map_err(|e| self.build_error(format!("invalid server URL '{}': {}", self.server, e)))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(self.build_error(format!("server '{}' is not an HTTP URL", self.server)));
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("swclient", crate::NAME);
            pairs.append_pair("version", crate::VERSION);
            if let Some(limit) = qd.query_limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if qd.offset > 0 {
                pairs.append_pair("offset", &qd.offset.to_string());
            }
            let bounds = [
                ("time_first_after", fence.first_after),
                ("time_first_before", fence.first_before),
                ("time_last_after", fence.last_after),
                ("time_last_before", fence.last_before),
            ];
            for (param, bound) in bounds {
                if let Some(t) = bound {
                    pairs.append_pair(param, &t.to_string());
                }
            }
            if let Some(exclude) = &qd.exclude {
                pairs.append_pair("exclude", exclude);
            }
        }

        Ok(url)
    }

    fn request_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Accept", "application/x-ndjson".to_string())];
        if let Some(key) = &self.api_key {
            headers.push(("X-API-Key", key.clone()));
        }
        headers
    }

    fn teardown(&mut self) {
        self.api_key = None;
        self.server = DEFAULT_SERVER.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReturnMode, SearchMethod, SearchTarget};

    fn descriptor() -> QueryDescriptor {
        QueryDescriptor {
            search_method: SearchMethod::Glob,
            search_target: SearchTarget::Rrnames,
            return_mode: ReturnMode::Terse,
            value: "*.example.com".to_string(),
            exclude: None,
            rrtype: None,
            after: None,
            before: None,
            complete: false,
            query_limit: None,
            output_limit: None,
            offset: 0,
        }
    }

    fn path(qd: &QueryDescriptor) -> QueryPath {
        QueryPath {
            method: qd.search_method,
            target: qd.search_target,
            value: qd.value.clone(),
            rrtype: qd.rrtype.clone(),
        }
    }

    #[test]
    fn test_ready_requires_key() {
        let backend = DnsdbBackend::new();
        assert!(backend.ready().is_err());
        assert!(backend.clone().with_api_key("").ready().is_err());
        assert!(backend.with_api_key("secret").ready().is_ok());
    }

    #[test]
    fn test_ingest_setting() {
        let mut backend = DnsdbBackend::new();
        backend.ingest_setting("apikey", "secret").unwrap();
        backend.ingest_setting("server", "https://dnsdb.test").unwrap();
        assert_eq!(backend.server(), "https://dnsdb.test");
        assert!(backend.ready().is_ok());

        let err = backend.ingest_setting("color", "blue").unwrap_err();
        assert!(err.to_string().contains("unknown setting 'color'"));
    }

    #[test]
    fn test_build_url_minimal() {
        let backend = DnsdbBackend::new().with_api_key("secret");
        let qd = descriptor();
        let url = backend.build_url(&path(&qd), &qd, &Fence::default()).unwrap();
        assert_eq!(
            url.as_str(),
            format!(
                "https://api.dnsdb.info/dnsdb/v2/glob/rrnames/%2A.example.com?swclient={}&version={}",
                crate::NAME,
                crate::VERSION
            )
        );
    }

    #[test]
    fn test_build_url_parameters() {
        let backend = DnsdbBackend::new().with_server("http://localhost:8080/");
        let mut qd = descriptor();
        qd.rrtype = Some("A".to_string());
        qd.query_limit = Some(100);
        qd.offset = 20;
        qd.exclude = Some("*.cdn.example.com".to_string());
        let fence = Fence {
            first_after: Some(10),
            last_before: Some(20),
            ..Fence::default()
        };

        let url = backend.build_url(&path(&qd), &qd, &fence).unwrap();
        assert!(url.as_str().starts_with("http://localhost:8080/dnsdb/v2/glob/rrnames/%2A.example.com/A?"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("limit".to_string(), "100".to_string())));
        assert!(pairs.contains(&("offset".to_string(), "20".to_string())));
        assert!(pairs.contains(&("time_first_after".to_string(), "10".to_string())));
        assert!(pairs.contains(&("time_last_before".to_string(), "20".to_string())));
        assert!(pairs.contains(&("exclude".to_string(), "*.cdn.example.com".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "time_last_after" || k == "time_first_before"));
    }

    #[test]
    fn test_build_url_bad_server() {
        let backend = DnsdbBackend::new().with_server("not a url");
        let qd = descriptor();
        assert!(matches!(
            backend.build_url(&path(&qd), &qd, &Fence::default()),
            Err(FlexError::BackendError { .. })
        ));
    }

    #[test]
    fn test_headers_and_teardown() {
        let mut backend = DnsdbBackend::new().with_api_key("secret");
        assert!(backend
            .request_headers()
            .contains(&("X-API-Key", "secret".to_string())));

        backend.teardown();
        backend.teardown();
        assert!(backend.ready().is_err());
        assert!(!backend.request_headers().iter().any(|(name, _)| *name == "X-API-Key"));
    }
}
