//! # Verificar
//!
//! Page-object and resource-verification framework for end-to-end testing
//! of web-based management consoles.
//!
//! A suite drives the console through page objects ([`FinderNavigation`]
//! for the column tree, [`ConfigFragment`] and [`WizardWindow`] for forms)
//! and independently checks the outcome against the management endpoint
//! with a [`ResourceVerifier`], which polls reads to bridge the lag between
//! a UI-triggered write and its visibility to the backend.
//!
//! ## Architecture
//!
//! ```text
//!                          test
//!              ┌─────────────┴─────────────┐
//!              │                           │
//!        page objects               ResourceVerifier
//!    (finder, fragment, rbac)              │
//!              │                      Dispatcher
//!        ConsoleDriver                     │
//!        ┌─────┴──────┐             ManagementClient
//!   MockConsole   CdpConsole        ┌──────┴──────┐
//!    (staged)     (browser)     ModelTree    HTTP endpoint
//!                               (in-memory)    (remote)
//! ```
//!
//! Operations addressed through [`AddressTemplate`] and [`ResourceAddress`]
//! flow down the right side; element interaction through [`Selector`] flows
//! down the left. The two sides meet only in the test, which is what makes
//! a UI claim verifiable against backend truth.
//!
//! ## Quick start
//!
//! ```
//! use verificar::{
//!     AddressTemplate, DefaultContext, MockConsole, MockManagementClient,
//!     ModelTree, Operation, TestContext, Verb,
//! };
//!
//! # fn main() -> verificar::VerificarResult<()> {
//! let tree = ModelTree::new();
//! tree.seed("/subsystem=logging", &[]);
//!
//! let context = TestContext::builder()
//!     .client(MockManagementClient::new(&tree))
//!     .console(MockConsole::new())
//!     .build()?;
//!
//! let template = AddressTemplate::of("/subsystem=logging/file-handler=*")?;
//! let address = template.resolve(&DefaultContext::new(), &["audit"])?;
//!
//! let add = Operation::builder(Verb::Add, address.clone())
//!     .param("append", true)
//!     .build();
//! context.execute(&add)?;
//! context.verifier().verify_resource(&address, true)?;
//! context.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `browser`: `CdpConsole`, a [`ConsoleDriver`] over headless Chrome
//! - `remote`: `HttpManagementClient` for live management endpoints

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays))]

pub mod address;
#[cfg(feature = "browser")]
pub mod cdp;
pub mod console;
pub mod dispatch;
pub mod finder;
pub mod fixture;
pub mod fragment;
pub mod operation;
pub mod rbac;
pub mod result;
pub mod selector;
pub mod verify;

// ============================================================================
// Public API re-exports
// ============================================================================

pub use address::{AddressTemplate, DefaultContext, ResourceAddress, StatementContext};
#[cfg(feature = "browser")]
pub use cdp::CdpConsole;
pub use console::{ConsoleConfig, ConsoleDriver, ElementHandle, MockConsole};
#[cfg(feature = "remote")]
pub use dispatch::{EndpointConfig, HttpManagementClient};
pub use dispatch::{
    Dispatcher, ManagementClient, ManagementResponse, MockManagementClient, ModelTree, Outcome,
};
pub use finder::{FinderColumn, FinderNavigation, FinderRow};
pub use fixture::{unique_name, TestContext, TestContextBuilder};
pub use fragment::{ConfigFragment, ConfirmationDialog, Editor, ErrorDialog, WizardWindow};
pub use operation::{Operation, OperationBuilder, Verb};
pub use rbac::{Authentication, Credentials, RbacRole, RoleCapabilities};
pub use result::{VerificarError, VerificarResult};
pub use selector::Selector;
pub use verify::{ExpectedValue, ResourceVerifier, VerifierConfig};
