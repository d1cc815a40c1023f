// src/engine.rs
use crate::launcher::Query;
use crate::output::SinkControl;
use crate::session::Session;
use crate::types::FlexError;
use futures::stream::{self, StreamExt};
use log::{debug, error, info};
use std::time::Instant;

/// How a drained batch of queries went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl DrainSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Runs submitted queries over HTTP and streams each response into its sink.
pub struct FetchEngine {
    session: Session,
    queue: Vec<Query>,
}

impl FetchEngine {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            queue: Vec::new(),
        }
    }

    /// Enqueue a query. No I/O happens until `drain`.
    pub fn submit(&mut self, query: Query) {
        debug!("submitted {:?}", query);
        self.queue.push(query);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn queued(&self) -> &[Query] {
        &self.queue
    }

    /// Run every queued query with at most `max_concurrency` in flight.
    pub async fn drain(&mut self, max_concurrency: usize) -> DrainSummary {
        let queries = std::mem::take(&mut self.queue);
        let session = &self.session;

        let outcomes: Vec<Result<(), FlexError>> = stream::iter(queries)
            .map(|query| fetch(session, query))
            .buffer_unordered(max_concurrency.max(1))
            .collect()
            .await;

        let mut summary = DrainSummary::default();
        for outcome in outcomes {
            match outcome {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    error!("{}", e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

async fn fetch(session: &Session, mut query: Query) -> Result<(), FlexError> {
    let start = Instant::now();
    let path = query.path.to_string();

    let result = stream_response(session, &mut query).await;
    // the sink is finished even after a failure so it can flush what it has
    let finished = query.sink.finish();

    match &result {
        Ok(()) => info!("{}: completed in {:?}", path, start.elapsed()),
        Err(e) => debug!("{}: failed after {:?}: {}", path, start.elapsed(), e),
    }
    result.and(finished)
}

async fn stream_response(session: &Session, query: &mut Query) -> Result<(), FlexError> {
    let mut request = session.client.get(query.url.clone());
    for (name, value) in &query.headers {
        request = request.header(*name, value);
    }

    let mut response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());
        return Err(FlexError::NetworkError(format!(
            "HTTP status {}: {}",
            status,
            text.trim()
        )));
    }

    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        buffer.extend_from_slice(&chunk);
        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if deliver(query, &line)? == SinkControl::Stop {
                // dropping the response cancels the transfer
                return Ok(());
            }
        }
    }

    if !buffer.is_empty() {
        deliver(query, &buffer)?;
    }
    Ok(())
}

fn deliver(query: &mut Query, line: &[u8]) -> Result<SinkControl, FlexError> {
    let line = String::from_utf8_lossy(line);
    query.sink.accept(&line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::DnsdbBackend;
    use crate::launcher::launch;
    use crate::output::ResultSink;
    use crate::session::SessionConfig;
    use crate::types::{QueryDescriptor, ReturnMode, SearchMethod, SearchTarget};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        lines: Arc<Mutex<Vec<String>>>,
        finished: Arc<Mutex<bool>>,
        stop_after: Option<usize>,
    }

    impl ResultSink for RecordingSink {
        fn accept(&mut self, line: &str) -> Result<SinkControl, FlexError> {
            let mut lines = self.lines.lock().unwrap();
            lines.push(line.trim_end().to_string());
            match self.stop_after {
                Some(n) if lines.len() >= n => Ok(SinkControl::Stop),
                _ => Ok(SinkControl::Continue),
            }
        }

        fn finish(&mut self) -> Result<(), FlexError> {
            *self.finished.lock().unwrap() = true;
            Ok(())
        }
    }

    fn descriptor() -> QueryDescriptor {
        QueryDescriptor {
            search_method: SearchMethod::Glob,
            search_target: SearchTarget::Rrnames,
            return_mode: ReturnMode::Terse,
            value: "www.example.*".to_string(),
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

    const BODY: &str = "{\"cond\":\"begin\"}\n{\"obj\":{\"rrname\":\"www.example.com.\",\"rrtype\":\"A\"}}\n{\"cond\":\"succeeded\"}\n";

    #[tokio::test]
    async fn test_drain_delivers_lines() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/dnsdb/v2/glob/rrnames/www\.example\.(%2A|\*)".to_string()))
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let backend = DnsdbBackend::new()
            .with_api_key("secret")
            .with_server(server.url());
        let sink = RecordingSink::default();
        let mut engine = FetchEngine::new(Session::new(&SessionConfig::default()).unwrap());

        launch(&descriptor(), &backend, Box::new(sink.clone()), &mut engine).unwrap();
        let summary = engine.drain(4).await;

        mock.assert_async().await;
        assert!(summary.all_succeeded());
        assert_eq!(summary.succeeded, 1);
        assert_eq!(engine.pending(), 0);
        assert_eq!(sink.lines.lock().unwrap().len(), 3);
        assert!(*sink.finished.lock().unwrap());
    }

    #[tokio::test]
    async fn test_sink_can_stop_early() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let backend = DnsdbBackend::new().with_api_key("k").with_server(server.url());
        let sink = RecordingSink {
            stop_after: Some(1),
            ..RecordingSink::default()
        };
        let mut engine = FetchEngine::new(Session::new(&SessionConfig::default()).unwrap());

        launch(&descriptor(), &backend, Box::new(sink.clone()), &mut engine).unwrap();
        assert!(engine.drain(1).await.all_succeeded());
        assert_eq!(sink.lines.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_fails_query() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(403)
            .with_body("Error: Bad API key")
            .create_async()
            .await;

        let backend = DnsdbBackend::new().with_api_key("bad").with_server(server.url());
        let sink = RecordingSink::default();
        let mut engine = FetchEngine::new(Session::new(&SessionConfig::default()).unwrap());

        launch(&descriptor(), &backend, Box::new(sink.clone()), &mut engine).unwrap();
        let summary = engine.drain(1).await;
        assert_eq!(summary.failed, 1);
        assert!(sink.lines.lock().unwrap().is_empty());
        assert!(*sink.finished.lock().unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // nothing listens on the discard port
        let backend = DnsdbBackend::new().with_api_key("k").with_server("http://127.0.0.1:9");
        let sink = RecordingSink::default();
        let mut engine = FetchEngine::new(Session::new(&SessionConfig::default()).unwrap());

        launch(&descriptor(), &backend, Box::new(sink.clone()), &mut engine).unwrap();
        let query = engine.queue.pop().unwrap();
        let err = fetch(&engine.session, query).await.unwrap_err();
        assert!(matches!(err, FlexError::HttpError(_)));
        assert!(*sink.finished.lock().unwrap());
    }
}
