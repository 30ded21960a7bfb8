//! In-memory fakes shared by the integration tests.
//!
//! - [`FakeBackend`]: a server-side record table with bulk reorder
//! - [`FakeHttp`]: an HTTP server with expiring tokens and a refresh endpoint
//! - [`FakeTickets`] / [`FakeConnector`]: realtime ticket issuance and sockets

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;

use jobdesk::api::{ApiRequest, ApiResponse, HttpTransport, RecordBackend, TicketSource};
use jobdesk::model::{OrderItem, Record, Section, ViewScope};
use jobdesk::realtime::{FrameStream, RealtimeConnector};
use jobdesk::{DeskError, Result};

pub const DEPARTMENT: u64 = 1;

pub fn job(id: u64, priority: i64) -> Record {
    Record::new(id, priority, Section::InProgress)
        .with_department(DEPARTMENT)
        .with_title(format!("job {}", id))
        .with_version(1)
}

pub fn requested(id: u64, priority: i64) -> Record {
    Record::new(id, priority, Section::Requested)
        .with_department(DEPARTMENT)
        .with_title(format!("ticket {}", id))
        .with_version(1)
}

/// Poll `condition` until it holds or `timeout` passes on the tokio clock.
pub async fn assert_eventually<F, Fut>(condition: F, timeout: Duration, message: &str)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("{}", message);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ---------------------------------------------------------------------------
// Record backend
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeBackend {
    records: Mutex<Vec<Record>>,
    commits: Mutex<Vec<(ViewScope, Vec<OrderItem>)>>,
    pub list_calls: AtomicUsize,
    pub fail_commit: AtomicBool,
    pub fail_list: AtomicBool,
    /// Milliseconds each call waits before answering.
    pub list_delay_ms: AtomicU64,
    pub commit_delay_ms: AtomicU64,
}

impl FakeBackend {
    pub fn with_records(records: Vec<Record>) -> Arc<Self> {
        let backend = Self::default();
        *backend.records.lock().unwrap() = records;
        Arc::new(backend)
    }

    pub fn set_priority(&self, id: u64, priority: i64) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            record.priority = priority;
            record.version += 1;
        }
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }

    pub fn last_commit_ids(&self) -> Option<Vec<u64>> {
        self.commits
            .lock()
            .unwrap()
            .last()
            .map(|(_, items)| items.iter().map(|i| i.id).collect())
    }
}

#[async_trait]
impl RecordBackend for FakeBackend {
    async fn list_records(&self, scope: &ViewScope) -> Result<Vec<Record>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        pause(&self.list_delay_ms).await;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DeskError::Network("connection reset".to_string()));
        }
        let mut records: Vec<Record> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| scope.contains(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.priority);
        Ok(records)
    }

    async fn commit_order(&self, scope: &ViewScope, items: &[OrderItem]) -> Result<()> {
        self.commits
            .lock()
            .unwrap()
            .push((*scope, items.to_vec()));
        pause(&self.commit_delay_ms).await;
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(DeskError::Conflict("stale version".to_string()));
        }
        let mut records = self.records.lock().unwrap();
        for (index, item) in items.iter().enumerate() {
            if let Some(record) = records.iter_mut().find(|r| r.id == item.id) {
                record.priority = index as i64 + 1;
                record.version += 1;
            }
        }
        Ok(())
    }
}

async fn pause(delay_ms: &AtomicU64) {
    let ms = delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// Accepts exactly one access token at a time. `expire_token` invalidates it
/// so the next authenticated call gets a 401.
pub struct FakeHttp {
    valid_token: Mutex<Option<String>>,
    issued: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub refresh_ok: AtomicBool,
    pub refresh_delay: Duration,
    /// Every request seen: (path, bearer).
    pub log: Mutex<Vec<(String, Option<String>)>>,
    routes: Mutex<HashMap<String, String>>,
    denied: Mutex<HashSet<String>>,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(None),
            issued: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            refresh_ok: AtomicBool::new(true),
            refresh_delay: Duration::from_millis(50),
            log: Mutex::new(Vec::new()),
            routes: Mutex::new(HashMap::new()),
            denied: Mutex::new(HashSet::new()),
        })
    }

    pub fn route(&self, path: &str, data: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), format!("{{\"data\":{}}}", data));
    }

    /// `path` answers 401 whatever token is presented.
    pub fn deny(&self, path: &str) {
        self.denied.lock().unwrap().insert(path.to_string());
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn expire_token(&self) {
        *self.valid_token.lock().unwrap() = Some("expired-on-server".to_string());
    }

    pub fn requests_to(&self, path: &str) -> Vec<Option<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, bearer)| bearer.clone())
            .collect()
    }

    fn grant(&self) -> ApiResponse {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{}", n);
        *self.valid_token.lock().unwrap() = Some(token.clone());
        ApiResponse::new(
            200,
            format!(
                r#"{{"data":{{"accessToken":"{}","refreshToken":"refresh-{}","user":{{"id":9,"name":"Dana","departmentId":{},"permissions":["reorder"]}}}}}}"#,
                token, n, DEPARTMENT
            ),
        )
    }
}

#[async_trait]
impl HttpTransport for FakeHttp {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        self.log
            .lock()
            .unwrap()
            .push((request.path.clone(), bearer.map(str::to_string)));

        match request.path.as_str() {
            "/auth/login" => return Ok(self.grant()),
            "/auth/refresh" => {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.refresh_delay).await;
                if self.refresh_ok.load(Ordering::SeqCst) {
                    return Ok(self.grant());
                }
                return Ok(ApiResponse::new(
                    401,
                    r#"{"status":{"message":"refresh token expired"}}"#,
                ));
            }
            "/auth/logout" => return Ok(ApiResponse::new(204, "")),
            _ => {}
        }

        if request.authenticated {
            let valid = self.valid_token.lock().unwrap().clone();
            let denied = self.denied.lock().unwrap().contains(&request.path);
            if denied || valid.is_none() || valid.as_deref() != bearer {
                return Ok(ApiResponse::new(
                    401,
                    r#"{"status":{"message":"token expired"}}"#,
                ));
            }
        }

        let body = self
            .routes
            .lock()
            .unwrap()
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| r#"{"data":[]}"#.to_string());
        Ok(ApiResponse::new(200, body))
    }
}

// ---------------------------------------------------------------------------
// Realtime
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeTickets {
    pub attempts: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl TicketSource for FakeTickets {
    async fn issue_realtime_ticket(&self) -> Result<String> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeskError::Network("ticket endpoint down".to_string()));
        }
        Ok(format!("t-{}", n))
    }
}

/// Each successful connect opens an in-memory socket. The test side keeps
/// the sender to push frames; dropping it closes the connection.
#[derive(Default)]
pub struct FakeConnector {
    pub urls: Mutex<Vec<String>>,
    servers: Mutex<Vec<UnboundedSender<Result<String>>>>,
    pub fail: AtomicBool,
}

impl FakeConnector {
    pub fn connect_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    /// Push a text frame on the most recent connection.
    pub fn push(&self, frame: &str) {
        let servers = self.servers.lock().unwrap();
        let server = servers.last().expect("no open connection");
        server
            .unbounded_send(Ok(frame.to_string()))
            .expect("connection closed");
    }

    /// Server-side close of every open connection.
    pub fn close_all(&self) {
        self.servers.lock().unwrap().clear();
    }
}

#[async_trait]
impl RealtimeConnector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeskError::Network("connection refused".to_string()));
        }
        let (tx, rx) = unbounded();
        self.servers.lock().unwrap().push(tx);
        Ok(rx.boxed())
    }
}
