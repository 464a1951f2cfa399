//! ---
//! np_section: "05-networking-external-interfaces"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "InfluxDB v2 HTTP write client."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use netpulse_schema::{encode_batch, Batch};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{MetricsStore, StoreError};

const MAX_ERROR_BODY: usize = 512;

/// Connection parameters for an InfluxDB v2 bucket.
#[derive(Clone)]
pub struct InfluxSettings {
    /// Base URL, e.g. `http://localhost:8086`.
    pub url: Url,
    /// Organisation name.
    pub org: String,
    /// Destination bucket.
    pub bucket: String,
    /// API token sent as `Authorization: Token <token>`.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("url", &self.url.as_str())
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// [`MetricsStore`] writing line protocol to `/api/v2/write`.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: Client,
    write_url: Url,
    auth_header: String,
    timeout: Duration,
}

impl InfluxStore {
    /// Build the client; no request is made until the first write.
    pub fn new(settings: InfluxSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            write_url: write_url(&settings.url, &settings.org, &settings.bucket)?,
            auth_header: format!("Token {}", settings.token),
            timeout: settings.timeout,
        })
    }

    /// Fully qualified write endpoint including query parameters.
    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    fn classify(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else if err.is_connect() {
            StoreError::Connect(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

fn write_url(base: &Url, org: &str, bucket: &str) -> Result<Url, StoreError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base
        .join("api/v2/write")
        .map_err(|err| StoreError::Transport(format!("invalid store url: {err}")))?;
    url.query_pairs_mut()
        .append_pair("org", org)
        .append_pair("bucket", bucket)
        .append_pair("precision", "ns");
    Ok(url)
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[async_trait]
impl MetricsStore for InfluxStore {
    async fn write(&self, batch: &Batch) -> Result<(), StoreError> {
        let body = encode_batch(batch)?;
        debug!(
            target: "netpulse::net::influx",
            points = batch.len(),
            bytes = body.len(),
            "writing batch"
        );
        let response = self
            .client
            .post(self.write_url.clone())
            .header(AUTHORIZATION, &self.auth_header)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(StoreError::from_status(status.as_u16(), truncate(text)))
    }

    fn describe(&self) -> String {
        let mut url = self.write_url.clone();
        url.set_query(None);
        format!("influxdb {url}")
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::extract::{RawQuery, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use chrono::{TimeZone, Utc};
    use netpulse_schema::Point;

    use super::*;

    #[derive(Debug, Clone)]
    struct Captured {
        query: String,
        auth: String,
        body: String,
    }

    #[derive(Clone)]
    struct FakeInflux {
        status: StatusCode,
        captured: Arc<Mutex<Vec<Captured>>>,
    }

    async fn handle(
        State(fake): State<FakeInflux>,
        RawQuery(query): RawQuery,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, String) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        fake.captured.lock().unwrap().push(Captured {
            query: query.unwrap_or_default(),
            auth,
            body,
        });
        let reply = if fake.status.is_success() {
            String::new()
        } else {
            "{\"code\":\"invalid\",\"message\":\"bad line\"}".to_owned()
        };
        (fake.status, reply)
    }

    async fn spawn_fake(status: StatusCode) -> (SocketAddr, Arc<Mutex<Vec<Captured>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/api/v2/write", post(handle))
            .with_state(FakeInflux {
                status,
                captured: captured.clone(),
            });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, captured)
    }

    fn settings(addr: SocketAddr) -> InfluxSettings {
        InfluxSettings {
            url: Url::parse(&format!("http://{addr}")).unwrap(),
            org: "my-org".to_owned(),
            bucket: "my-bucket".to_owned(),
            token: "t0k3n".to_owned(),
            timeout: Duration::from_secs(5),
        }
    }

    fn batch() -> Batch {
        let point = Point::builder("environment")
            .tag("location", "server_room")
            .field("temperature", 25.0)
            .field("humidity", 45.5)
            .timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
            .build()
            .unwrap();
        std::iter::once(point).collect()
    }

    #[test]
    fn write_url_keeps_base_path() {
        let base = Url::parse("https://metrics.example/influx").unwrap();
        let url = write_url(&base, "org a", "b").unwrap();
        assert_eq!(
            url.as_str(),
            "https://metrics.example/influx/api/v2/write?org=org+a&bucket=b&precision=ns"
        );
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", settings("127.0.0.1:1".parse().unwrap()));
        assert!(!rendered.contains("t0k3n"));
    }

    #[tokio::test]
    async fn successful_write_sends_line_protocol() {
        let (addr, captured) = spawn_fake(StatusCode::NO_CONTENT).await;
        let store = InfluxStore::new(settings(addr)).unwrap();
        store.write(&batch()).await.unwrap();

        let requests = captured.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].auth, "Token t0k3n");
        assert_eq!(requests[0].query, "org=my-org&bucket=my-bucket&precision=ns");
        assert_eq!(
            requests[0].body,
            "environment,location=server_room temperature=25.0,humidity=45.5 1700000000000000000\n"
        );
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let (addr, _) = spawn_fake(StatusCode::SERVICE_UNAVAILABLE).await;
        let store = InfluxStore::new(settings(addr)).unwrap();
        let err = store.write(&batch()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn bad_requests_are_rejected() {
        let (addr, _) = spawn_fake(StatusCode::BAD_REQUEST).await;
        let store = InfluxStore::new(settings(addr)).unwrap();
        let err = store.write(&batch()).await.unwrap_err();
        match &err {
            StoreError::Rejected { status, body } => {
                assert_eq!(*status, 400);
                assert!(body.contains("bad line"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn unreachable_store_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let store = InfluxStore::new(settings(addr)).unwrap();
        let err = store.write(&batch()).await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}
