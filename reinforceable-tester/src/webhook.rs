//! Result delivery to an HTTP webhook.
use std::cell::RefCell;
use std::time::Duration;

use log::{debug, warn};
use reinforceable_game::{ReportError, ResultPayload, ResultSink};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the payload is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// `application/json`.
    Json,
    /// JSON text sent as `text/plain`, which browsers post without a CORS
    /// preflight.
    PlainText,
}

impl BodyEncoding {
    const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::PlainText => "text/plain;charset=utf-8",
        }
    }
}

/// Outcome of waiting on every spawned delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: usize,
    pub failed: usize,
}

/// Posts each payload once on the tokio runtime without waiting for it.
pub struct WebhookSink {
    client: Client,
    url: String,
    encoding: BodyEncoding,
    runtime: Handle,
    pending: RefCell<Vec<JoinHandle<Result<(), ReportError>>>>,
}

impl WebhookSink {
    /// Build a sink bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails outside a runtime or if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, encoding: BodyEncoding) -> Result<Self, ReportError> {
        let runtime = Handle::try_current()
            .map_err(|e| ReportError::Network(format!("no async runtime: {e}")))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ReportError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            encoding,
            runtime,
            pending: RefCell::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of deliveries spawned and not yet drained.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Wait for every spawned delivery. There is no retry.
    pub async fn drain(&self) -> DeliveryStats {
        let handles = self.pending.take();
        let mut stats = DeliveryStats::default();
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => stats.delivered += 1,
                Ok(Err(err)) => {
                    warn!("webhook delivery to {} failed: {err}", self.url);
                    stats.failed += 1;
                }
                Err(err) => {
                    warn!("webhook delivery task aborted: {err}");
                    stats.failed += 1;
                }
            }
        }
        stats
    }
}

impl ResultSink for WebhookSink {
    fn submit(&self, payload: &ResultPayload) -> Result<(), ReportError> {
        let body = serde_json::to_string(payload)?;
        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, self.encoding.content_type())
            .body(body);
        debug!("posting session {} to {}", payload.session_id, self.url);
        let handle = self.runtime.spawn(async move {
            request
                .send()
                .await
                .map_err(|e| ReportError::Network(e.to_string()))?
                .error_for_status()
                .map_err(|e| ReportError::Rejected(e.to_string()))?;
            Ok::<(), ReportError>(())
        });
        self.pending.borrow_mut().push(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use reinforceable_game::{DecisionRecord, NodeId};
    use std::convert::Infallible;
    use std::net::{SocketAddr, TcpListener};
    use tokio::sync::mpsc;

    type Received = (String, String);

    fn payload() -> ResultPayload {
        ResultPayload {
            code: "ROOM12".to_string(),
            session_id: "1760688000000-abc123".to_string(),
            scenario_id: "independent-work".to_string(),
            points: 10,
            max_possible: 20,
            percent: 50,
            timestamp: "2026-10-17T09:00:00.000Z".to_string(),
            events: vec![DecisionRecord {
                timestamp: "2026-10-17T08:59:00.000Z".to_string(),
                node_id: NodeId(2),
                delta: 10,
                choice: "Walk over and quietly offer the break card.".to_string(),
            }],
            mode: Some("qa".to_string()),
            student: None,
        }
    }

    fn spawn_server(status: StatusCode) -> (SocketAddr, mpsc::UnboundedReceiver<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel::<Received>();
        let make_svc = make_service_fn(move |_conn| {
            let tx = tx.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let tx = tx.clone();
                    async move {
                        let content_type = req
                            .headers()
                            .get(hyper::header::CONTENT_TYPE)
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        let bytes = hyper::body::to_bytes(req.into_body()).await?;
                        let _ = tx.send((content_type, String::from_utf8_lossy(&bytes).into()));
                        let mut response = Response::new(Body::from("ok"));
                        *response.status_mut() = status;
                        Ok::<_, hyper::Error>(response)
                    }
                }))
            }
        });
        let server = Server::from_tcp(listener).unwrap().serve(make_svc);
        tokio::spawn(server);
        (addr, rx)
    }

    #[tokio::test]
    async fn posts_json_once_per_submit() {
        let (addr, mut rx) = spawn_server(StatusCode::OK);
        let sink = WebhookSink::new(format!("http://{addr}/results"), BodyEncoding::Json).unwrap();
        sink.submit(&payload()).unwrap();
        assert_eq!(sink.in_flight(), 1);

        let stats = sink.drain().await;
        assert_eq!(
            stats,
            DeliveryStats {
                delivered: 1,
                failed: 0
            }
        );
        assert_eq!(sink.in_flight(), 0);

        let (content_type, body) = rx.recv().await.unwrap();
        assert_eq!(content_type, "application/json");
        let received: ResultPayload = serde_json::from_str(&body).unwrap();
        assert_eq!(received, payload());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn plain_text_carries_json_body() {
        let (addr, mut rx) = spawn_server(StatusCode::OK);
        let sink = WebhookSink::new(format!("http://{addr}/"), BodyEncoding::PlainText).unwrap();
        sink.submit(&payload()).unwrap();
        assert_eq!(sink.drain().await.delivered, 1);
        let (content_type, body) = rx.recv().await.unwrap();
        assert!(content_type.starts_with("text/plain"));
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["code"], "ROOM12");
        assert_eq!(value["mode"], "qa");
        assert!(value.get("student").is_none());
    }

    #[tokio::test]
    async fn rejected_and_unreachable_posts_count_as_failed() {
        let (addr, _rx) = spawn_server(StatusCode::INTERNAL_SERVER_ERROR);
        let rejecting = WebhookSink::new(format!("http://{addr}/"), BodyEncoding::Json).unwrap();
        rejecting.submit(&payload()).unwrap();
        assert_eq!(rejecting.drain().await.failed, 1);

        let closed = TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_addr = closed.local_addr().unwrap();
        drop(closed);
        let unreachable =
            WebhookSink::new(format!("http://{dead_addr}/"), BodyEncoding::Json).unwrap();
        unreachable.submit(&payload()).unwrap();
        let stats = unreachable.drain().await;
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn requires_a_runtime() {
        assert!(matches!(
            WebhookSink::new("http://127.0.0.1:9/", BodyEncoding::Json),
            Err(ReportError::Network(_))
        ));
    }
}
