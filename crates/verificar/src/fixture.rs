//! Per-test wiring of dispatcher, console, and verifier.
//!
//! Each test builds its own [`TestContext`] in setup and releases it with
//! [`TestContext::close`] (or lets drop do it), so state never leaks
//! between tests through shared fixtures.

use crate::console::{ConsoleConfig, ConsoleDriver};
use crate::dispatch::{Dispatcher, ManagementClient, ManagementResponse};
use crate::operation::Operation;
use crate::result::{VerificarError, VerificarResult};
use crate::verify::{ResourceVerifier, VerifierConfig};

/// Everything one test needs: a dispatcher, a console driver, and the
/// timing configuration both sides poll with
#[derive(Debug)]
pub struct TestContext<C: ConsoleDriver> {
    dispatcher: Dispatcher,
    console: C,
    verifier_config: VerifierConfig,
    console_config: ConsoleConfig,
}

impl<C: ConsoleDriver> TestContext<C> {
    /// Start building a context
    #[must_use]
    pub fn builder() -> TestContextBuilder<C> {
        TestContextBuilder::new()
    }

    /// The operation dispatcher
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The console driver
    pub fn console(&mut self) -> &mut C {
        &mut self.console
    }

    /// The console timing configuration
    #[must_use]
    pub const fn console_config(&self) -> ConsoleConfig {
        self.console_config
    }

    /// A verifier over this context's dispatcher
    #[must_use]
    pub const fn verifier(&self) -> ResourceVerifier<'_> {
        ResourceVerifier::with_config(&self.dispatcher, self.verifier_config)
    }

    /// Submit one operation through the dispatcher
    ///
    /// # Errors
    ///
    /// As [`Dispatcher::execute`].
    pub fn execute(&self, operation: &Operation) -> VerificarResult<ManagementResponse> {
        self.dispatcher.execute(operation)
    }

    /// Release the management session deterministically
    ///
    /// Dropping the context releases it too; closing makes release errors
    /// visible to the test.
    ///
    /// # Errors
    ///
    /// As [`Dispatcher::close`].
    pub fn close(self) -> VerificarResult<()> {
        let Self { dispatcher, .. } = self;
        dispatcher.close()
    }
}

/// Builder for [`TestContext`]
pub struct TestContextBuilder<C: ConsoleDriver> {
    client: Option<Box<dyn ManagementClient>>,
    console: Option<C>,
    verifier_config: VerifierConfig,
    console_config: ConsoleConfig,
}

impl<C: ConsoleDriver> TestContextBuilder<C> {
    /// An empty builder with default timings
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: None,
            console: None,
            verifier_config: VerifierConfig::default(),
            console_config: ConsoleConfig::default(),
        }
    }

    /// Set the management client the dispatcher will own
    #[must_use]
    pub fn client(mut self, client: impl ManagementClient + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    /// Set the console driver
    #[must_use]
    pub fn console(mut self, console: C) -> Self {
        self.console = Some(console);
        self
    }

    /// Set the verifier timings
    #[must_use]
    pub fn verifier_config(mut self, config: VerifierConfig) -> Self {
        self.verifier_config = config;
        self
    }

    /// Set the console timings
    #[must_use]
    pub fn console_config(mut self, config: ConsoleConfig) -> Self {
        self.console_config = config;
        self
    }

    /// Assemble the context
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the client or the console is missing.
    pub fn build(self) -> VerificarResult<TestContext<C>> {
        let client = self.client.ok_or_else(|| VerificarError::InvalidState {
            message: "test context needs a management client".to_string(),
        })?;
        let console = self.console.ok_or_else(|| VerificarError::InvalidState {
            message: "test context needs a console driver".to_string(),
        })?;
        Ok(TestContext {
            dispatcher: Dispatcher::new(client),
            console,
            verifier_config: self.verifier_config,
            console_config: self.console_config,
        })
    }
}

impl<C: ConsoleDriver> Default for TestContextBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ConsoleDriver> std::fmt::Debug for TestContextBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContextBuilder")
            .field("has_client", &self.client.is_some())
            .field("has_console", &self.console.is_some())
            .finish_non_exhaustive()
    }
}

/// A collision-free resource name with the given prefix
///
/// Parallel tests create resources under distinct names so suites never
/// trip over each other's leftovers.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}
