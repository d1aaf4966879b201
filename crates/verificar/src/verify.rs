//! Polling verification of management resources and attributes.
//!
//! UI-triggered writes become visible to management reads only after a
//! short lag, so a single read right after a console action races the
//! backend. [`ResourceVerifier`] bridges that gap by re-reading until the
//! expected state appears or the timeout expires.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{trace, warn};

use crate::address::ResourceAddress;
use crate::dispatch::Dispatcher;
use crate::operation::Operation;
use crate::result::{millis, VerificarError, VerificarResult};

/// Default verification timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Default poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Timing configuration for verification polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Total time to keep re-reading before giving up
    pub default_timeout: Duration,
    /// Pause between consecutive reads
    pub poll_interval: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl VerifierConfig {
    /// Create config with defaults (500ms timeout, 50ms interval)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generous timings for slow endpoints (5s timeout, 100ms interval)
    #[must_use]
    pub const fn patient() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Set the default timeout
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Expected attribute value, compared with type awareness
///
/// The string literal `"undefined"` converts to [`ExpectedValue::Undefined`],
/// matching how an empty form field reads back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedValue {
    /// Textual value, also matching rendered numbers and booleans
    Text(String),
    /// Boolean value, also matching `"true"`/`"false"` strings
    Boolean(bool),
    /// Attribute must have no defined value
    Undefined,
}

impl ExpectedValue {
    /// Whether the observed payload satisfies this expectation
    #[must_use]
    pub fn matches(&self, observed: Option<&Value>) -> bool {
        match (self, observed) {
            (Self::Undefined, None) => true,
            (Self::Undefined, Some(value)) => value.is_null(),
            (Self::Boolean(expected), Some(Value::Bool(observed))) => expected == observed,
            (Self::Boolean(expected), Some(Value::String(observed))) => {
                observed == if *expected { "true" } else { "false" }
            }
            (Self::Text(expected), Some(Value::String(observed))) => expected == observed,
            (Self::Text(expected), Some(Value::Bool(observed))) => {
                expected == if *observed { "true" } else { "false" }
            }
            (Self::Text(expected), Some(Value::Number(observed))) => {
                *expected == observed.to_string()
            }
            _ => false,
        }
    }

    /// Human-readable form for error messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => format!("'{text}'"),
            Self::Boolean(value) => value.to_string(),
            Self::Undefined => "undefined".to_string(),
        }
    }
}

impl From<&str> for ExpectedValue {
    fn from(value: &str) -> Self {
        if value == "undefined" {
            Self::Undefined
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl From<String> for ExpectedValue {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<bool> for ExpectedValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Verifies backend state through a [`Dispatcher`] by polling reads
///
/// Transport faults and failed reads during polling are absorbed as
/// "state not there yet"; only the final timeout surfaces them, inside
/// the `Verification` error's observed description.
#[derive(Debug)]
pub struct ResourceVerifier<'a> {
    dispatcher: &'a Dispatcher,
    config: VerifierConfig,
}

impl<'a> ResourceVerifier<'a> {
    /// Create a verifier with default timings
    #[must_use]
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            config: VerifierConfig::default(),
        }
    }

    /// Create a verifier with explicit timings
    #[must_use]
    pub const fn with_config(dispatcher: &'a Dispatcher, config: VerifierConfig) -> Self {
        Self { dispatcher, config }
    }

    /// The active timing configuration
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify an attribute against an expected value within the default
    /// timeout
    ///
    /// # Errors
    ///
    /// Returns `Verification` carrying the last observed value when the
    /// expectation never holds within the timeout. Non-transport dispatch
    /// errors propagate unchanged.
    pub fn verify_attribute(
        &self,
        address: &ResourceAddress,
        name: &str,
        expected: impl Into<ExpectedValue>,
    ) -> VerificarResult<()> {
        self.verify_attribute_within(address, name, expected, self.config.default_timeout)
    }

    /// Verify an attribute against an expected value within an explicit
    /// timeout
    ///
    /// A zero timeout performs exactly one read.
    ///
    /// # Errors
    ///
    /// As [`ResourceVerifier::verify_attribute`].
    pub fn verify_attribute_within(
        &self,
        address: &ResourceAddress,
        name: &str,
        expected: impl Into<ExpectedValue>,
        timeout: Duration,
    ) -> VerificarResult<()> {
        let expected = expected.into();
        let operation = Operation::read_attribute(address.clone(), name);
        let start = Instant::now();
        let mut observed: Option<Value> = None;
        let mut last_fault: Option<String> = None;
        loop {
            match self.dispatcher.execute(&operation) {
                Ok(response) if response.is_success() => {
                    observed = response.result;
                    last_fault = None;
                    if expected.matches(observed.as_ref()) {
                        return Ok(());
                    }
                }
                Ok(response) => {
                    last_fault = response.failure;
                }
                Err(VerificarError::Dispatch { message }) => {
                    warn!("Read of {address} failed in transit: {message}");
                    last_fault = Some(message);
                }
                Err(other) => return Err(other),
            }
            if start.elapsed() >= timeout {
                break;
            }
            trace!("Attribute {name} of {address} not settled, polling again");
            std::thread::sleep(self.config.poll_interval);
        }
        Err(VerificarError::Verification {
            subject: format!("{address} {name}"),
            expected: expected.describe(),
            observed: render_observed(observed.as_ref(), last_fault.as_deref()),
            ms: millis(timeout),
        })
    }

    /// Verify that a resource exists (or not) within the default timeout
    ///
    /// # Errors
    ///
    /// Returns `Verification` when the existence state never matches within
    /// the timeout.
    pub fn verify_resource(
        &self,
        address: &ResourceAddress,
        expected_exists: bool,
    ) -> VerificarResult<()> {
        self.verify_resource_within(address, expected_exists, self.config.default_timeout)
    }

    /// Verify resource existence within an explicit timeout
    ///
    /// A failed read outcome means the resource is absent. A zero timeout
    /// performs exactly one read.
    ///
    /// # Errors
    ///
    /// As [`ResourceVerifier::verify_resource`].
    pub fn verify_resource_within(
        &self,
        address: &ResourceAddress,
        expected_exists: bool,
        timeout: Duration,
    ) -> VerificarResult<()> {
        let operation = Operation::read_resource(address.clone());
        let start = Instant::now();
        let mut observed: Option<bool> = None;
        let mut last_fault: Option<String> = None;
        loop {
            match self.dispatcher.execute(&operation) {
                Ok(response) => {
                    let exists = response.is_success();
                    observed = Some(exists);
                    last_fault = None;
                    if exists == expected_exists {
                        return Ok(());
                    }
                }
                Err(VerificarError::Dispatch { message }) => {
                    warn!("Read of {address} failed in transit: {message}");
                    last_fault = Some(message);
                }
                Err(other) => return Err(other),
            }
            if start.elapsed() >= timeout {
                break;
            }
            trace!("Resource {address} not settled, polling again");
            std::thread::sleep(self.config.poll_interval);
        }
        Err(VerificarError::Verification {
            subject: address.to_string(),
            expected: existence(expected_exists).to_string(),
            observed: render_existence(observed, last_fault.as_deref()),
            ms: millis(timeout),
        })
    }
}

const fn existence(exists: bool) -> &'static str {
    if exists {
        "resource present"
    } else {
        "resource absent"
    }
}

fn render_existence(observed: Option<bool>, fault: Option<&str>) -> String {
    match observed {
        Some(exists) => existence(exists).to_string(),
        None => fault.map_or_else(
            || "unknown".to_string(),
            |fault| format!("unknown ({fault})"),
        ),
    }
}

fn render_observed(observed: Option<&Value>, fault: Option<&str>) -> String {
    match observed {
        Some(Value::String(text)) => format!("'{text}'"),
        Some(value) => value.to_string(),
        None => fault.map_or_else(
            || "undefined".to_string(),
            |fault| format!("undefined ({fault})"),
        ),
    }
}
