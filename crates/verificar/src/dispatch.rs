//! Operation dispatch and the management client seam.
//!
//! [`Dispatcher`] owns a [`ManagementClient`] session and submits
//! [`Operation`]s through it. A transport fault is an error; an operation
//! the endpoint rejected is data, carried in the [`ManagementResponse`]
//! envelope. The in-memory [`ModelTree`] backend implements the management
//! model semantics for tests, including simulated write latency. With the
//! `remote` feature, [`HttpManagementClient`] talks to a live endpoint.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::operation::{Operation, Verb};
use crate::result::{VerificarError, VerificarResult};

/// Outcome reported by the management endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation was applied
    Success,
    /// The endpoint rejected the operation
    Failed,
}

/// Response envelope returned for every dispatched operation
///
/// A `Failed` outcome is not an error: existence checks rely on reading it.
/// Call [`ManagementResponse::into_result`] where success is required.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagementResponse {
    /// Reported outcome
    pub outcome: Outcome,
    /// Result payload; `None` when the endpoint reported no defined value
    pub result: Option<Value>,
    /// Failure description for `Failed` outcomes
    pub failure: Option<String>,
}

impl ManagementResponse {
    /// A successful response with an optional result payload
    #[must_use]
    pub const fn success(result: Option<Value>) -> Self {
        Self {
            outcome: Outcome::Success,
            result,
            failure: None,
        }
    }

    /// A failed response with a description
    #[must_use]
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            result: None,
            failure: Some(description.into()),
        }
    }

    /// Whether the outcome is `Success`
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    /// Convert into the result payload, treating a failed outcome as an
    /// `OperationFailed` error
    ///
    /// # Errors
    ///
    /// Returns `OperationFailed` carrying the failure description when the
    /// outcome is `Failed`.
    pub fn into_result(self) -> VerificarResult<Option<Value>> {
        match self.outcome {
            Outcome::Success => Ok(self.result),
            Outcome::Failed => Err(VerificarError::OperationFailed {
                description: self
                    .failure
                    .unwrap_or_else(|| "no failure description".to_string()),
            }),
        }
    }

    /// Parse the endpoint's JSON envelope
    ///
    /// A JSON `null` result is normalized to `None`.
    ///
    /// # Errors
    ///
    /// Returns `Dispatch` when the envelope has no recognizable `outcome`.
    pub fn from_json(body: &Value) -> VerificarResult<Self> {
        let outcome = match body.get("outcome").and_then(Value::as_str) {
            Some("success") => Outcome::Success,
            Some("failed") => Outcome::Failed,
            other => {
                return Err(VerificarError::Dispatch {
                    message: format!("malformed response envelope: outcome {other:?}"),
                })
            }
        };
        let result = body.get("result").filter(|v| !v.is_null()).cloned();
        let failure = body.get("failure-description").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        Ok(Self {
            outcome,
            result,
            failure,
        })
    }
}

/// Transport seam for submitting operations to a management endpoint
///
/// Implementations use interior mutability where session state changes on
/// submission; `close` releases the underlying session.
pub trait ManagementClient {
    /// Submit one operation and return its response envelope
    ///
    /// # Errors
    ///
    /// Returns `Dispatch` on transport-level failure. An operation the
    /// endpoint rejected is a `Failed` envelope, not an error.
    fn submit(&self, operation: &Operation) -> VerificarResult<ManagementResponse>;

    /// Release the underlying session
    ///
    /// # Errors
    ///
    /// Returns `Session` when release fails.
    fn close(&mut self) -> VerificarResult<()> {
        Ok(())
    }
}

/// Submits operations and owns the client session
///
/// The session is released exactly once: by an explicit [`Dispatcher::close`]
/// or, best-effort, on drop.
pub struct Dispatcher {
    client: Option<Box<dyn ManagementClient>>,
}

impl Dispatcher {
    /// Take ownership of a client session
    #[must_use]
    pub fn new(client: Box<dyn ManagementClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Submit one operation
    ///
    /// # Errors
    ///
    /// Returns `Session` if the dispatcher was closed and `Dispatch` on
    /// transport failure.
    pub fn execute(&self, operation: &Operation) -> VerificarResult<ManagementResponse> {
        let client = self.client.as_ref().ok_or_else(|| VerificarError::Session {
            message: "dispatcher already closed".to_string(),
        })?;
        debug!("Dispatching {operation}");
        let response = client.submit(operation)?;
        if !response.is_success() {
            warn!(
                "{operation} failed: {}",
                response.failure.as_deref().unwrap_or("unknown reason")
            );
        }
        Ok(response)
    }

    /// Submit one operation and require success
    ///
    /// # Errors
    ///
    /// As [`Dispatcher::execute`], plus `OperationFailed` when the endpoint
    /// rejected the operation.
    pub fn execute_expecting_success(
        &self,
        operation: &Operation,
    ) -> VerificarResult<Option<Value>> {
        self.execute(operation)?.into_result()
    }

    /// Release the session deterministically
    ///
    /// # Errors
    ///
    /// Returns `Session` when release fails.
    pub fn close(mut self) -> VerificarResult<()> {
        match self.client.take() {
            Some(mut client) => client.close(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("open", &self.client.is_some())
            .finish()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(mut client) = self.client.take() {
            if let Err(err) = client.close() {
                warn!("Session release on drop failed: {err}");
            }
        }
    }
}

/// One queued model mutation
#[derive(Debug, Clone)]
enum Mutation {
    Add {
        path: String,
        attributes: BTreeMap<String, Value>,
    },
    Remove {
        path: String,
    },
    Write {
        path: String,
        name: String,
        value: Value,
    },
    Undefine {
        path: String,
        name: String,
    },
}

#[derive(Debug)]
struct PendingMutation {
    visible_at: Instant,
    mutation: Mutation,
}

#[derive(Debug, Default)]
struct TreeState {
    resources: BTreeMap<String, BTreeMap<String, Value>>,
    pending: Vec<PendingMutation>,
    log: Vec<(Verb, String)>,
    latency: Duration,
}

/// In-memory management model with simulated write latency
///
/// Mutations become visible to reads only after the configured latency,
/// modelling the lag between a UI-triggered write and its visibility to
/// management reads. Mutations settle in submission order. Cloning shares
/// the same underlying tree.
#[derive(Debug, Clone, Default)]
pub struct ModelTree {
    inner: Arc<Mutex<TreeState>>,
}

impl ModelTree {
    /// An empty tree with zero latency
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tree whose mutations become visible after `latency`
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        let tree = Self::new();
        tree.set_latency(latency);
        tree
    }

    /// Change the write latency for subsequent mutations
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Insert a resource immediately, bypassing latency and the log
    ///
    /// Test setup helper for parents and pre-existing state.
    pub fn seed(&self, path: &str, attributes: &[(&str, Value)]) {
        let attributes = attributes
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        self.lock().resources.insert(path.to_string(), attributes);
    }

    /// Apply one operation with the management model's semantics
    #[must_use]
    pub fn apply(&self, operation: &Operation) -> ManagementResponse {
        let mut state = self.lock();
        settle(&mut state);
        let path = operation.address().to_string();
        state.log.push((operation.verb(), path.clone()));
        match operation.verb() {
            Verb::Add => {
                if state.resources.contains_key(&path) {
                    return ManagementResponse::failed(format!("duplicate resource at {path}"));
                }
                if let Some(parent) = operation.address().parent() {
                    if !parent.is_root() && !state.resources.contains_key(&parent.to_string()) {
                        return ManagementResponse::failed(format!(
                            "no parent resource for {path}"
                        ));
                    }
                }
                let attributes = operation.params().clone();
                enqueue(&mut state, Mutation::Add { path, attributes });
                ManagementResponse::success(None)
            }
            Verb::Remove => {
                if !state.resources.contains_key(&path) {
                    return ManagementResponse::failed(format!("no resource at {path}"));
                }
                enqueue(&mut state, Mutation::Remove { path });
                ManagementResponse::success(None)
            }
            Verb::ReadResource => state.resources.get(&path).map_or_else(
                || ManagementResponse::failed(format!("no resource at {path}")),
                |attributes| {
                    let object = attributes
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect();
                    ManagementResponse::success(Some(Value::Object(object)))
                },
            ),
            Verb::ReadAttribute => {
                let Some(name) = operation.param("name").and_then(Value::as_str) else {
                    return ManagementResponse::failed("required parameter 'name' missing");
                };
                match state.resources.get(&path) {
                    None => ManagementResponse::failed(format!("no resource at {path}")),
                    Some(attributes) => {
                        ManagementResponse::success(attributes.get(name).cloned())
                    }
                }
            }
            Verb::WriteAttribute => {
                let Some(name) = operation.param("name").and_then(Value::as_str) else {
                    return ManagementResponse::failed("required parameter 'name' missing");
                };
                if !state.resources.contains_key(&path) {
                    return ManagementResponse::failed(format!("no resource at {path}"));
                }
                // Writing null is equivalent to undefining the attribute
                let value = operation.param("value").cloned().unwrap_or(Value::Null);
                let name = name.to_string();
                enqueue(&mut state, Mutation::Write { path, name, value });
                ManagementResponse::success(None)
            }
            Verb::UndefineAttribute => {
                let Some(name) = operation.param("name").and_then(Value::as_str) else {
                    return ManagementResponse::failed("required parameter 'name' missing");
                };
                if !state.resources.contains_key(&path) {
                    return ManagementResponse::failed(format!("no resource at {path}"));
                }
                let name = name.to_string();
                enqueue(&mut state, Mutation::Undefine { path, name });
                ManagementResponse::success(None)
            }
        }
    }

    /// Whether a resource is currently visible at `path`
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        let mut state = self.lock();
        settle(&mut state);
        state.resources.contains_key(path)
    }

    /// Currently visible value of an attribute, `None` when undefined
    #[must_use]
    pub fn attribute(&self, path: &str, name: &str) -> Option<Value> {
        let mut state = self.lock();
        settle(&mut state);
        state
            .resources
            .get(path)
            .and_then(|attributes| attributes.get(name).cloned())
    }

    /// Number of applied operations with the given verb
    #[must_use]
    pub fn operation_count(&self, verb: Verb) -> usize {
        self.lock().log.iter().filter(|(v, _)| *v == verb).count()
    }

    /// The full operation log as `(verb, address)` pairs
    #[must_use]
    pub fn log(&self) -> Vec<(Verb, String)> {
        self.lock().log.clone()
    }

    fn lock(&self) -> MutexGuard<'_, TreeState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn enqueue(state: &mut TreeState, mutation: Mutation) {
    let visible_at = Instant::now() + state.latency;
    state.pending.push(PendingMutation {
        visible_at,
        mutation,
    });
}

fn settle(state: &mut TreeState) {
    let now = Instant::now();
    while state
        .pending
        .first()
        .is_some_and(|pending| pending.visible_at <= now)
    {
        let pending = state.pending.remove(0);
        match pending.mutation {
            Mutation::Add { path, attributes } => {
                state.resources.insert(path, attributes);
            }
            Mutation::Remove { path } => {
                let prefix = format!("{path}/");
                state
                    .resources
                    .retain(|key, _| key != &path && !key.starts_with(&prefix));
            }
            Mutation::Write { path, name, value } => {
                if let Some(attributes) = state.resources.get_mut(&path) {
                    if value.is_null() {
                        attributes.remove(&name);
                    } else {
                        attributes.insert(name, value);
                    }
                }
            }
            Mutation::Undefine { path, name } => {
                if let Some(attributes) = state.resources.get_mut(&path) {
                    attributes.remove(&name);
                }
            }
        }
    }
}

/// Client that applies operations to an in-memory [`ModelTree`]
#[derive(Debug)]
pub struct MockManagementClient {
    tree: ModelTree,
    faults: AtomicUsize,
    closed: Arc<AtomicBool>,
}

impl MockManagementClient {
    /// Create a client over a shared tree
    #[must_use]
    pub fn new(tree: &ModelTree) -> Self {
        Self {
            tree: tree.clone(),
            faults: AtomicUsize::new(0),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make the next `count` submissions fail at the transport level
    #[must_use]
    pub fn with_transport_faults(self, count: usize) -> Self {
        self.faults.store(count, Ordering::SeqCst);
        self
    }

    /// Flag observing whether the session was released
    #[must_use]
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl ManagementClient for MockManagementClient {
    fn submit(&self, operation: &Operation) -> VerificarResult<ManagementResponse> {
        let remaining = self.faults.load(Ordering::SeqCst);
        if remaining > 0 {
            self.faults.store(remaining - 1, Ordering::SeqCst);
            return Err(VerificarError::Dispatch {
                message: "simulated transport fault".to_string(),
            });
        }
        Ok(self.tree.apply(operation))
    }

    fn close(&mut self) -> VerificarResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// HTTP client for live endpoints (when the `remote` feature is enabled)
// ============================================================================

#[cfg(feature = "remote")]
mod http {
    use super::*;

    /// Connection settings for a live management endpoint
    #[derive(Debug, Clone)]
    pub struct EndpointConfig {
        /// Endpoint URL accepting operation envelopes via POST
        pub base_url: String,
        /// Management user
        pub username: String,
        /// Management password
        pub password: String,
        /// Per-request timeout
        pub request_timeout: Duration,
    }

    impl Default for EndpointConfig {
        fn default() -> Self {
            Self {
                base_url: "http://localhost:9990/management".to_string(),
                username: "admin".to_string(),
                password: "admin".to_string(),
                request_timeout: Duration::from_secs(10),
            }
        }
    }

    impl EndpointConfig {
        /// Create config with defaults
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Defaults overridden by `MANAGEMENT_URL`, `MANAGEMENT_USER`, and
        /// `MANAGEMENT_PASSWORD` where set
        #[must_use]
        pub fn from_env() -> Self {
            let mut config = Self::default();
            if let Ok(url) = std::env::var("MANAGEMENT_URL") {
                config.base_url = url;
            }
            if let Ok(user) = std::env::var("MANAGEMENT_USER") {
                config.username = user;
            }
            if let Ok(password) = std::env::var("MANAGEMENT_PASSWORD") {
                config.password = password;
            }
            config
        }

        /// Set the endpoint URL
        #[must_use]
        pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
            self.base_url = url.into();
            self
        }

        /// Set the management credentials
        #[must_use]
        pub fn with_credentials(
            mut self,
            username: impl Into<String>,
            password: impl Into<String>,
        ) -> Self {
            self.username = username.into();
            self.password = password.into();
            self
        }

        /// Set the per-request timeout
        #[must_use]
        pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
            self.request_timeout = timeout;
            self
        }
    }

    /// Blocking HTTP client for a live management endpoint
    #[derive(Debug)]
    pub struct HttpManagementClient {
        config: EndpointConfig,
        client: reqwest::blocking::Client,
    }

    impl HttpManagementClient {
        /// Build the client for the given endpoint
        ///
        /// # Errors
        ///
        /// Returns `Session` when the HTTP client cannot be constructed.
        pub fn connect(config: EndpointConfig) -> VerificarResult<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(config.request_timeout)
                .build()
                .map_err(|err| VerificarError::Session {
                    message: err.to_string(),
                })?;
            Ok(Self { config, client })
        }

        /// The endpoint configuration
        #[must_use]
        pub const fn config(&self) -> &EndpointConfig {
            &self.config
        }
    }

    impl ManagementClient for HttpManagementClient {
        fn submit(&self, operation: &Operation) -> VerificarResult<ManagementResponse> {
            // Failed operations come back with an error status but still
            // carry the envelope, so the body is parsed regardless of status.
            let response = self
                .client
                .post(&self.config.base_url)
                .basic_auth(&self.config.username, Some(&self.config.password))
                .json(&operation.to_json())
                .send()
                .map_err(|err| VerificarError::Dispatch {
                    message: err.to_string(),
                })?;
            let body: Value = response.json().map_err(|err| VerificarError::Dispatch {
                message: err.to_string(),
            })?;
            ManagementResponse::from_json(&body)
        }
    }
}

#[cfg(feature = "remote")]
pub use http::{EndpointConfig, HttpManagementClient};
