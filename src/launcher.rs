// src/launcher.rs
use crate::backends::Backend;
use crate::engine::FetchEngine;
use crate::error::Result;
use crate::fence::Fence;
use crate::output::ResultSink;
use crate::types::{QueryDescriptor, QueryPath};
use log::debug;
use std::fmt;
use url::Url;

/// One request, ready for the fetch engine.
pub struct Query {
    pub descriptor: QueryDescriptor,
    pub path: QueryPath,
    pub fence: Fence,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub sink: Box<dyn ResultSink>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // headers carry credentials
        f.debug_struct("Query")
            .field("path", &self.path.to_string())
            .field("fence", &self.fence)
            .field("url", &self.url.as_str())
            .finish()
    }
}

pub fn make_path(qd: &QueryDescriptor) -> QueryPath {
    QueryPath {
        method: qd.search_method,
        target: qd.search_target,
        value: qd.value.clone(),
        rrtype: qd.rrtype.clone(),
    }
}

/// Build the query for `qd` against `backend` and hand it to `engine`.
///
/// Nothing is submitted when the backend cannot build a URL.
pub fn launch(
    qd: &QueryDescriptor,
    backend: &dyn Backend,
    sink: Box<dyn ResultSink>,
    engine: &mut FetchEngine,
) -> Result<()> {
    let path = make_path(qd);
    let fence = Fence::for_query(qd);
    let url = backend.build_url(&path, qd, &fence)?;
    debug!("url [{}]", url);

    engine.submit(Query {
        descriptor: qd.clone(),
        path,
        fence,
        url,
        headers: backend.request_headers(),
        sink,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::DnsdbBackend;
    use crate::output::SinkControl;
    use crate::session::{Session, SessionConfig};
    use crate::types::{FlexError, ReturnMode, SearchMethod, SearchTarget};

    struct NullSink;

    impl ResultSink for NullSink {
        fn accept(&mut self, _line: &str) -> std::result::Result<SinkControl, FlexError> {
            Ok(SinkControl::Continue)
        }

        fn finish(&mut self) -> std::result::Result<(), FlexError> {
            Ok(())
        }
    }

    fn descriptor(value: &str) -> QueryDescriptor {
        QueryDescriptor {
            search_method: SearchMethod::Glob,
            search_target: SearchTarget::Rrnames,
            return_mode: ReturnMode::Terse,
            value: value.to_string(),
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

    fn engine() -> FetchEngine {
        FetchEngine::new(Session::new(&SessionConfig::default()).unwrap())
    }

    #[test]
    fn test_make_path() {
        let mut qd = descriptor("www.example.*");
        assert_eq!(make_path(&qd).to_string(), "glob/rrnames/www.example.*");

        qd.search_method = SearchMethod::Regex;
        qd.search_target = SearchTarget::Rdata;
        qd.rrtype = Some("NS".to_string());
        assert_eq!(make_path(&qd).to_string(), "regex/rdata/www.example.*/NS");
    }

    #[test]
    fn test_launch_submits_one_query() {
        let backend = DnsdbBackend::new().with_api_key("secret");
        let qd = descriptor("www.example.*");
        let mut engine = engine();

        launch(&qd, &backend, Box::new(NullSink), &mut engine).unwrap();
        assert_eq!(engine.pending(), 1);

        let query = &engine.queued()[0];
        assert_eq!(query.path.to_string(), "glob/rrnames/www.example.*");
        assert!(query.fence.is_empty());
        assert_eq!(query.descriptor, qd);
        assert!(query.headers.contains(&("X-API-Key", "secret".to_string())));
    }

    #[test]
    fn test_launch_build_failure_submits_nothing() {
        let backend = DnsdbBackend::new().with_server("::bad::");
        let mut engine = engine();

        let result = launch(&descriptor("a.*"), &backend, Box::new(NullSink), &mut engine);
        assert!(result.is_err());
        assert_eq!(engine.pending(), 0);
    }

    #[test]
    fn test_launch_applies_fence() {
        let backend = DnsdbBackend::new();
        let mut qd = descriptor("a.*");
        qd.after = Some(5);
        let mut engine = engine();

        launch(&qd, &backend, Box::new(NullSink), &mut engine).unwrap();
        let query = &engine.queued()[0];
        assert_eq!(query.fence.last_after, Some(5));
        assert!(query.url.as_str().contains("time_last_after=5"));
    }
}
