// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and cluster access.

use crate::error::{CourierError, Result as CourierResult};
use crate::sync::cluster::{ClusterConnector, SecretSource, TargetCluster};
use crate::types::{SyncKey, TargetSync, TargetSyncSpec};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use http::{Request, Response};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    /// All (method, path) pairs received so far, in order
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);
        self.requests.lock().unwrap().push((method, path));

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock namespace list JSON response
pub fn namespace_list_json(names: &[&str]) -> String {
    let items: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": name, "uid": format!("uid-{}", name) }
            })
        })
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "NamespaceList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a mock secret JSON response with plain text values
pub fn secret_json(name: &str, namespace: &str, data: &[(&str, &str)]) -> String {
    let data: serde_json::Map<String, serde_json::Value> = data
        .iter()
        .map(|(k, v)| {
            let secret = k8s_openapi::ByteString(v.as_bytes().to_vec());
            (k.to_string(), serde_json::to_value(secret).unwrap())
        })
        .collect();

    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": name, "namespace": namespace },
        "type": "Opaque",
        "data": data
    })
    .to_string()
}

/// Create a mock TargetSync JSON response
pub fn target_sync_json(name: &str, namespace: &str) -> String {
    serde_json::json!({
        "apiVersion": "courier.dev/v1alpha1",
        "kind": "TargetSync",
        "metadata": { "name": name, "namespace": namespace, "generation": 1 },
        "spec": {
            "namespaceExpression": "^team-.*",
            "secretNameExpression": "^creds$"
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

pub fn make_secret(name: &str, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            "password".to_string(),
            k8s_openapi::ByteString("secret123".as_bytes().to_vec()),
        )])),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

pub fn make_target_sync(name: &str, generation: i64) -> TargetSync {
    TargetSync {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("laas".to_string()),
            generation: Some(generation),
            ..Default::default()
        },
        spec: TargetSyncSpec {
            namespace_expression: "^team-.*".to_string(),
            secret_name_expression: "^creds$".to_string(),
            source_namespace: None,
            source_ref: None,
        },
        status: None,
    }
}

type EventSender = mpsc::UnboundedSender<CourierResult<Secret>>;

/// Secret source fed through a channel. The stream ends when the sender is dropped.
pub struct FakeSource {
    events: Mutex<Option<mpsc::UnboundedReceiver<CourierResult<Secret>>>>,
    secrets: Mutex<HashMap<(String, String), Secret>>,
}

impl FakeSource {
    pub fn new() -> (Arc<Self>, EventSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            events: Mutex::new(Some(rx)),
            secrets: Mutex::new(HashMap::new()),
        });
        (source, tx)
    }

    /// Store a secret so `get` can find it
    pub fn put(&self, secret: Secret) {
        let key = (secret.namespace().unwrap_or_default(), secret.name_any());
        self.secrets.lock().unwrap().insert(key, secret);
    }
}

#[async_trait]
impl SecretSource for FakeSource {
    fn watch(&self) -> BoxStream<'static, CourierResult<Secret>> {
        match self.events.lock().unwrap().take() {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    async fn get(&self, namespace: &str, name: &str) -> CourierResult<Option<Secret>> {
        let key = (namespace.to_string(), name.to_string());
        Ok(self.secrets.lock().unwrap().get(&key).cloned())
    }
}

/// Target cluster recording every sync call as (namespace, secret name)
pub struct FakeTarget {
    namespaces: Vec<String>,
    failures: Mutex<HashMap<String, Option<usize>>>,
    fail_list: AtomicBool,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeTarget {
    pub fn new(namespaces: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
            failures: Mutex::new(HashMap::new()),
            fail_list: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every sync into `namespace` fails
    pub fn failing_on(self: Arc<Self>, namespace: &str) -> Arc<Self> {
        self.failures.lock().unwrap().insert(namespace.to_string(), None);
        self
    }

    /// The first `times` syncs into `namespace` fail
    pub fn failing_times(self: Arc<Self>, namespace: &str, times: usize) -> Arc<Self> {
        self.failures
            .lock()
            .unwrap()
            .insert(namespace.to_string(), Some(times));
        self
    }

    pub fn failing_list(self: Arc<Self>) -> Arc<Self> {
        self.fail_list.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn synced_namespaces(&self) -> Vec<String> {
        self.calls().into_iter().map(|(ns, _)| ns).collect()
    }

    /// Wait until at least `count` sync calls were made, panics after 5 seconds
    pub async fn wait_for_calls(&self, count: usize) {
        let wait = async {
            while self.calls.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        if tokio::time::timeout(Duration::from_secs(5), wait).await.is_err() {
            panic!("expected {} sync calls, got {:?}", count, self.calls());
        }
    }
}

#[async_trait]
impl TargetCluster for FakeTarget {
    async fn list_namespaces(&self) -> CourierResult<Vec<Namespace>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(CourierError::ConnectError("target unavailable".to_string()));
        }

        Ok(self
            .namespaces
            .iter()
            .map(|name| Namespace {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .collect())
    }

    async fn sync(&self, secret: &Secret, namespace: &str) -> CourierResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((namespace.to_string(), secret.name_any()));

        let mut failures = self.failures.lock().unwrap();
        let fail = match failures.get_mut(namespace) {
            None => false,
            Some(None) => true,
            Some(Some(0)) => false,
            Some(Some(remaining)) => {
                *remaining -= 1;
                true
            }
        };

        if fail {
            Err(CourierError::ConnectError(format!("sync into {} failed", namespace)))
        } else {
            Ok(())
        }
    }
}

/// Connector handing out a fresh channel-fed source per connect and a shared target
pub struct FakeConnector {
    target: Arc<FakeTarget>,
    senders: Mutex<Vec<(SyncKey, EventSender)>>,
    fail_connect: AtomicBool,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(target: Arc<FakeTarget>) -> Arc<Self> {
        Arc::new(Self {
            target,
            senders: Mutex::new(Vec::new()),
            fail_connect: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
        })
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Deliver a secret event to the most recently connected source of `key`
    pub fn send(&self, key: &SyncKey, secret: Secret) {
        let senders = self.senders.lock().unwrap();
        if let Some((_, tx)) = senders.iter().rev().find(|(k, _)| k == key) {
            let _ = tx.send(Ok(secret));
        }
    }

    /// End every source stream of `key`
    pub fn close(&self, key: &SyncKey) {
        self.senders.lock().unwrap().retain(|(k, _)| k != key);
    }
}

#[async_trait]
impl ClusterConnector for FakeConnector {
    async fn source(&self, target_sync: &TargetSync) -> CourierResult<Arc<dyn SecretSource>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CourierError::ConnectError("source unreachable".to_string()));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        let (source, tx) = FakeSource::new();
        self.senders.lock().unwrap().push((target_sync.key(), tx));
        Ok(source)
    }

    fn target(&self, _key: &SyncKey) -> Arc<dyn TargetCluster> {
        self.target.clone()
    }
}
