//! Management roles, their capabilities, and the login flow.
//!
//! Role behavior is a tagged capability set rather than per-role logic:
//! access-control suites iterate [`RbacRole::ALL`], read
//! [`RbacRole::capabilities`], and assert the same expectations for every role.

use serde::{Deserialize, Serialize};

use crate::console::{ConsoleConfig, ConsoleDriver};
use crate::result::{VerificarError, VerificarResult};
use crate::selector::Selector;

/// The seven standard management roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RbacRole {
    /// Reads configuration, changes nothing
    Monitor,
    /// Monitor plus runtime state changes
    Operator,
    /// Changes configuration but never sensitive data
    Maintainer,
    /// Maintainer restricted to deployment resources
    Deployer,
    /// Full configuration and sensitive data access
    Administrator,
    /// Reads everything including sensitive data, changes nothing
    Auditor,
    /// Unrestricted
    SuperUser,
}

impl RbacRole {
    /// Every role, in capability order
    pub const ALL: [Self; 7] = [
        Self::Monitor,
        Self::Operator,
        Self::Maintainer,
        Self::Deployer,
        Self::Administrator,
        Self::Auditor,
        Self::SuperUser,
    ];

    /// The role's display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monitor => "Monitor",
            Self::Operator => "Operator",
            Self::Maintainer => "Maintainer",
            Self::Deployer => "Deployer",
            Self::Administrator => "Administrator",
            Self::Auditor => "Auditor",
            Self::SuperUser => "SuperUser",
        }
    }

    /// The login identity conventionally mapped to this role
    #[must_use]
    pub const fn identity(self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Operator => "operator",
            Self::Maintainer => "maintainer",
            Self::Deployer => "deployer",
            Self::Administrator => "administrator",
            Self::Auditor => "auditor",
            Self::SuperUser => "superuser",
        }
    }

    /// What this role may see and do
    #[must_use]
    pub const fn capabilities(self) -> RoleCapabilities {
        match self {
            Self::Monitor | Self::Operator | Self::Deployer => RoleCapabilities {
                read_config: true,
                write_config: false,
                read_sensitive: false,
                write_sensitive: false,
                access_restricted: false,
            },
            Self::Maintainer => RoleCapabilities {
                read_config: true,
                write_config: true,
                read_sensitive: false,
                write_sensitive: false,
                access_restricted: true,
            },
            Self::Auditor => RoleCapabilities {
                read_config: true,
                write_config: false,
                read_sensitive: true,
                write_sensitive: false,
                access_restricted: true,
            },
            Self::Administrator | Self::SuperUser => RoleCapabilities {
                read_config: true,
                write_config: true,
                read_sensitive: true,
                write_sensitive: true,
                access_restricted: true,
            },
        }
    }
}

impl std::fmt::Display for RbacRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set consumed by parametrized access-control suites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCapabilities {
    /// May read ordinary configuration
    pub read_config: bool,
    /// May change ordinary configuration
    pub write_config: bool,
    /// May read sensitive data
    pub read_sensitive: bool,
    /// May change sensitive data
    pub write_sensitive: bool,
    /// May open restricted views such as access control
    pub access_restricted: bool,
}

/// Login credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Explicit credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The conventional credentials for a role, identity used as both
    /// login name and password
    #[must_use]
    pub fn for_role(role: RbacRole) -> Self {
        Self::new(role.identity(), role.identity())
    }
}

/// One-shot login flow against the console
#[derive(Debug)]
pub struct Authentication<'a, C: ConsoleDriver> {
    console: &'a mut C,
    config: ConsoleConfig,
}

impl<'a, C: ConsoleDriver> Authentication<'a, C> {
    /// Prepare a login over the given console
    pub fn with(console: &'a mut C) -> Self {
        Self {
            console,
            config: ConsoleConfig::default(),
        }
    }

    /// Prepare a login with explicit timings
    pub fn with_config(console: &'a mut C, config: ConsoleConfig) -> Self {
        Self { console, config }
    }

    /// Log in with the conventional credentials for `role`
    ///
    /// # Errors
    ///
    /// As [`Authentication::login`].
    pub fn authenticate(self, role: RbacRole) -> VerificarResult<()> {
        self.login(&Credentials::for_role(role))
    }

    /// Log in with explicit credentials and wait for a ready console
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the login form is incomplete and
    /// `Session` when the console never reports ready after submission.
    pub fn login(self, credentials: &Credentials) -> VerificarResult<()> {
        let Self { console, config } = self;
        console.navigate("login")?;
        let form = Selector::login_form();
        console.wait_visible(&form, config.transition_timeout, config.poll_interval)?;
        let username = form.field("username");
        console.locate(&username, config.implicit_wait, config.poll_interval)?;
        console.set_value(&username, &credentials.username)?;
        let password = form.field("password");
        console.locate(&password, config.implicit_wait, config.poll_interval)?;
        console.set_value(&password, &credentials.password)?;
        console.click(&form.submit_action())?;
        console
            .wait_visible(
                &Selector::console_ready(),
                config.transition_timeout,
                config.poll_interval,
            )
            .map_err(|_| VerificarError::Session {
                message: format!(
                    "login as '{}' did not reach a ready console",
                    credentials.username
                ),
            })?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::console::MockConsole;

    mod capabilities {
        use super::*;

        #[test]
        fn test_monitor_is_read_only() {
            let caps = RbacRole::Monitor.capabilities();
            assert!(caps.read_config);
            assert!(!caps.write_config);
            assert!(!caps.read_sensitive);
            assert!(!caps.access_restricted);
        }

        #[test]
        fn test_maintainer_writes_config_but_not_sensitive() {
            let caps = RbacRole::Maintainer.capabilities();
            assert!(caps.write_config);
            assert!(!caps.read_sensitive);
            assert!(!caps.write_sensitive);
        }

        #[test]
        fn test_auditor_reads_sensitive_but_changes_nothing() {
            let caps = RbacRole::Auditor.capabilities();
            assert!(caps.read_sensitive);
            assert!(caps.access_restricted);
            assert!(!caps.write_config);
            assert!(!caps.write_sensitive);
        }

        #[test]
        fn test_superuser_matches_administrator() {
            assert_eq!(
                RbacRole::SuperUser.capabilities(),
                RbacRole::Administrator.capabilities()
            );
        }

        #[test]
        fn test_all_covers_every_role_once() {
            let mut seen = std::collections::BTreeSet::new();
            for role in RbacRole::ALL {
                assert!(seen.insert(role.as_str()));
            }
            assert_eq!(seen.len(), 7);
        }

        #[test]
        fn test_identity_is_lowercase_display() {
            for role in RbacRole::ALL {
                assert_eq!(role.identity(), role.as_str().to_lowercase());
            }
        }
    }

    mod login {
        use super::*;

        fn stage_login(console: &mut MockConsole, succeeds: bool) {
            let form = Selector::login_form();
            console.stage(&form);
            console.stage(&form.field("username"));
            console.stage(&form.field("password"));
            console.stage(&form.submit_action());
            if succeeds {
                console.stage_on_click(&form.submit_action(), &Selector::console_ready());
            }
        }

        #[test]
        fn test_successful_login_fills_credentials() {
            let mut console = MockConsole::new();
            stage_login(&mut console, true);
            Authentication::with_config(&mut console, ConsoleConfig::immediate())
                .authenticate(RbacRole::Maintainer)
                .unwrap();
            let form = Selector::login_form();
            assert_eq!(
                console.form_value(&form, "username"),
                Some("maintainer".to_string())
            );
            assert_eq!(console.location(), "login");
        }

        #[test]
        fn test_failed_login_is_session_error() {
            let mut console = MockConsole::new();
            stage_login(&mut console, false);
            let err = Authentication::with_config(&mut console, ConsoleConfig::immediate())
                .authenticate(RbacRole::Monitor)
                .unwrap_err();
            assert!(matches!(err, VerificarError::Session { .. }));
        }

        #[test]
        fn test_explicit_credentials_override_convention() {
            let mut console = MockConsole::new();
            stage_login(&mut console, true);
            Authentication::with_config(&mut console, ConsoleConfig::immediate())
                .login(&Credentials::new("ops", "secret"))
                .unwrap();
            let form = Selector::login_form();
            assert_eq!(console.form_value(&form, "ops"), None);
            assert_eq!(
                console.form_value(&form, "username"),
                Some("ops".to_string())
            );
            assert_eq!(
                console.form_value(&form, "password"),
                Some("secret".to_string())
            );
        }
    }
}
