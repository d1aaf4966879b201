//! Console driver seam and the scriptable mock console.
//!
//! Page objects talk to the console through [`ConsoleDriver`], which keeps
//! them independent of the transport. [`MockConsole`] implements the seam
//! over a staged element registry so navigation, form editing, and dialog
//! flows can be exercised without a browser. The `browser` feature adds a
//! CDP-backed implementation in the `cdp` module.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::result::{millis, VerificarError, VerificarResult};
use crate::selector::Selector;

/// Default implicit wait for element presence in milliseconds
pub const DEFAULT_IMPLICIT_WAIT_MS: u64 = 2000;

/// Default timeout for view transitions in milliseconds
pub const DEFAULT_TRANSITION_TIMEOUT_MS: u64 = 5000;

/// Default poll interval for console waits in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Snapshot of a located console element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Stable identifier, the selector key for mock elements
    pub id: String,
    /// Visible text content, if any
    pub text: Option<String>,
    /// Whether the element accepts interaction
    pub enabled: bool,
    /// Whether the element is rendered
    pub visible: bool,
}

impl ElementHandle {
    /// A visible, enabled element
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            enabled: true,
            visible: true,
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Mark the element disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Mark the element hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Timing configuration for console interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// How long to wait for an element to be present
    pub implicit_wait: Duration,
    /// How long to wait for a view transition or window to complete
    pub transition_timeout: Duration,
    /// Pause between consecutive element checks
    pub poll_interval: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            implicit_wait: Duration::from_millis(DEFAULT_IMPLICIT_WAIT_MS),
            transition_timeout: Duration::from_millis(DEFAULT_TRANSITION_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ConsoleConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Near-zero waits for staged mock consoles
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            implicit_wait: Duration::from_millis(40),
            transition_timeout: Duration::from_millis(40),
            poll_interval: Duration::from_millis(5),
        }
    }

    /// Set the implicit wait
    #[must_use]
    pub const fn with_implicit_wait(mut self, wait: Duration) -> Self {
        self.implicit_wait = wait;
        self
    }

    /// Set the transition timeout
    #[must_use]
    pub const fn with_transition_timeout(mut self, timeout: Duration) -> Self {
        self.transition_timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Transport seam between page objects and the console
///
/// Queries (`find`, `is_visible`) report current state without waiting.
/// The provided [`ConsoleDriver::locate`] and [`ConsoleDriver::wait_visible`]
/// add the polling layer page objects build on.
pub trait ConsoleDriver {
    /// Navigate to a console view token
    ///
    /// # Errors
    ///
    /// Returns `Session` when navigation fails.
    fn navigate(&mut self, token: &str) -> VerificarResult<()>;

    /// Current state of the selected element, `None` when absent
    fn find(&self, selector: &Selector) -> Option<ElementHandle>;

    /// Click the selected element
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the element is absent, hidden, or
    /// disabled.
    fn click(&mut self, selector: &Selector) -> VerificarResult<()>;

    /// Replace the value of the selected input
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the input is absent, hidden, or
    /// disabled.
    fn set_value(&mut self, selector: &Selector, value: &str) -> VerificarResult<()>;

    /// Text content of the selected element
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the element is absent.
    fn text(&self, selector: &Selector) -> VerificarResult<String>;

    /// Whether the selected element accepts interaction
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the element is absent.
    fn is_enabled(&self, selector: &Selector) -> VerificarResult<bool>;

    /// Whether the selected element is present and rendered
    fn is_visible(&self, selector: &Selector) -> bool;

    /// Wait for the element to be present, polling until `wait` expires
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the element never appears.
    fn locate(
        &self,
        selector: &Selector,
        wait: Duration,
        poll_interval: Duration,
    ) -> VerificarResult<ElementHandle> {
        let start = Instant::now();
        loop {
            if let Some(element) = self.find(selector) {
                return Ok(element);
            }
            if start.elapsed() >= wait {
                break;
            }
            std::thread::sleep(poll_interval);
        }
        Err(VerificarError::ElementNotFound {
            selector: selector.key(),
        })
    }

    /// Wait for the element to be present and rendered
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when the element never becomes visible.
    fn wait_visible(
        &self,
        selector: &Selector,
        timeout: Duration,
        poll_interval: Duration,
    ) -> VerificarResult<ElementHandle> {
        let start = Instant::now();
        loop {
            if let Some(element) = self.find(selector) {
                if element.visible {
                    return Ok(element);
                }
            }
            if start.elapsed() >= timeout {
                break;
            }
            std::thread::sleep(poll_interval);
        }
        Err(VerificarError::Timeout {
            ms: millis(timeout),
            waiting_for: selector.key(),
        })
    }
}

type SaveHook = Box<dyn FnMut(&BTreeMap<String, String>) -> bool>;
type ClickHook = Box<dyn FnMut()>;

/// Scriptable in-memory console
///
/// Tests stage elements and wire click effects up front, then page objects
/// drive the staged console exactly as they would a browser. Interactions
/// are recorded for [`MockConsole::was_called`] assertions.
#[derive(Default)]
pub struct MockConsole {
    elements: BTreeMap<String, ElementHandle>,
    values: BTreeMap<String, String>,
    field_names: BTreeMap<String, (String, String)>,
    form_members: BTreeMap<String, Vec<String>>,
    reveal_on_click: BTreeMap<String, Vec<String>>,
    conceal_on_click: BTreeMap<String, Vec<String>>,
    save_buttons: BTreeMap<String, String>,
    save_hooks: BTreeMap<String, SaveHook>,
    click_hooks: BTreeMap<String, ClickHook>,
    history: Vec<String>,
    location: String,
}

impl std::fmt::Debug for MockConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConsole")
            .field("elements", &self.elements.len())
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl MockConsole {
    /// An empty console with nothing staged
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Stage a visible, enabled element
    pub fn stage(&mut self, selector: &Selector) {
        let key = selector.key();
        self.elements.insert(key.clone(), ElementHandle::new(key));
    }

    /// Stage a visible element with text content
    pub fn stage_text(&mut self, selector: &Selector, text: &str) {
        let key = selector.key();
        self.elements
            .insert(key.clone(), ElementHandle::new(key).with_text(text));
    }

    /// Stage a present but hidden element
    pub fn stage_hidden(&mut self, selector: &Selector) {
        let key = selector.key();
        self.elements
            .insert(key.clone(), ElementHandle::new(key).hidden());
    }

    /// Stage a visible but disabled element
    pub fn stage_disabled(&mut self, selector: &Selector) {
        let key = selector.key();
        self.elements
            .insert(key.clone(), ElementHandle::new(key).disabled());
    }

    /// Reveal `revealed` when `trigger` is clicked, staging it hidden first
    /// when absent
    pub fn stage_on_click(&mut self, trigger: &Selector, revealed: &Selector) {
        let key = revealed.key();
        if !self.elements.contains_key(&key) {
            self.stage_hidden(revealed);
        }
        self.reveal_on_click
            .entry(trigger.key())
            .or_default()
            .push(key);
    }

    /// Hide `concealed` when `trigger` is clicked
    pub fn stage_dismiss_on_click(&mut self, trigger: &Selector, concealed: &Selector) {
        self.conceal_on_click
            .entry(trigger.key())
            .or_default()
            .push(concealed.key());
    }

    /// Run an arbitrary side effect when `trigger` is clicked, staging the
    /// trigger when absent
    pub fn stage_action_hook(&mut self, trigger: &Selector, hook: impl FnMut() + 'static) {
        if !self.elements.contains_key(&trigger.key()) {
            self.stage(trigger);
        }
        self.click_hooks.insert(trigger.key(), Box::new(hook));
    }

    /// Stage one form field with an initial value
    pub fn stage_form_field(&mut self, form: &Selector, name: &str, initial: &str) {
        self.insert_field(form, name, initial, true);
    }

    /// Stage one form field that rejects interaction
    pub fn stage_disabled_field(&mut self, form: &Selector, name: &str, value: &str) {
        self.insert_field(form, name, value, false);
    }

    /// Stage a config region with an edit affordance revealing a form
    ///
    /// The region root and its edit action are staged visible. The form,
    /// its fields, and its save and cancel actions are staged hidden and
    /// revealed by clicking edit. Cancel conceals them again. Returns the
    /// form selector for [`MockConsole::on_save`] wiring.
    pub fn stage_editable_form(
        &mut self,
        root: &Selector,
        fields: &[(&str, &str)],
    ) -> Selector {
        self.stage(root);
        self.stage(&root.edit_action());
        let form = root.form();
        self.stage_hidden(&form);
        self.stage_hidden(&form.save_action());
        self.stage_hidden(&form.cancel_action());
        let mut members = vec![
            form.key(),
            form.save_action().key(),
            form.cancel_action().key(),
        ];
        for (name, initial) in fields {
            let field = form.field(name);
            self.insert_field(&form, name, initial, true);
            if let Some(element) = self.elements.get_mut(&field.key()) {
                element.visible = false;
            }
            members.push(field.key());
        }
        for member in &members {
            self.reveal_on_click
                .entry(root.edit_action().key())
                .or_default()
                .push(member.clone());
            self.conceal_on_click
                .entry(form.cancel_action().key())
                .or_default()
                .push(member.clone());
        }
        self.form_members.insert(form.key(), members);
        form
    }

    /// Stage a wizard window opened by clicking `trigger`
    ///
    /// The window, its form, fields, and save and cancel actions are staged
    /// hidden and revealed together. Returns the window selector.
    pub fn stage_wizard(&mut self, trigger: &Selector, fields: &[(&str, &str)]) -> Selector {
        let window = Selector::wizard();
        let form = window.form();
        self.stage_hidden(&window);
        self.stage_hidden(&form);
        self.stage_hidden(&form.save_action());
        self.stage_hidden(&form.cancel_action());
        let mut members = vec![
            window.key(),
            form.key(),
            form.save_action().key(),
            form.cancel_action().key(),
        ];
        for (name, initial) in fields {
            let field = form.field(name);
            self.insert_field(&form, name, initial, true);
            if let Some(element) = self.elements.get_mut(&field.key()) {
                element.visible = false;
            }
            members.push(field.key());
        }
        for member in &members {
            self.reveal_on_click
                .entry(trigger.key())
                .or_default()
                .push(member.clone());
            self.conceal_on_click
                .entry(form.cancel_action().key())
                .or_default()
                .push(member.clone());
        }
        self.form_members.insert(form.key(), members);
        window
    }

    /// Run `hook` with the form's current values when its save action is
    /// clicked
    ///
    /// A `true` return accepts the save and conceals the form. A `false`
    /// return models a validation rejection and leaves the form open.
    pub fn on_save(
        &mut self,
        form: &Selector,
        hook: impl FnMut(&BTreeMap<String, String>) -> bool + 'static,
    ) {
        let save = form.save_action();
        if !self.elements.contains_key(&save.key()) {
            self.stage(&save);
        }
        self.save_buttons.insert(save.key(), form.key());
        self.save_hooks.insert(form.key(), Box::new(hook));
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// All recorded interactions, oldest first
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Whether any recorded interaction starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history.iter().any(|entry| entry.starts_with(prefix))
    }

    /// Current value of a staged form field
    #[must_use]
    pub fn form_value(&self, form: &Selector, name: &str) -> Option<String> {
        self.values.get(&form.field(name).key()).cloned()
    }

    /// The last navigated view token
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    fn insert_field(&mut self, form: &Selector, name: &str, value: &str, enabled: bool) {
        let field = form.field(name);
        let key = field.key();
        let mut element = ElementHandle::new(key.clone()).with_text(value);
        element.enabled = enabled;
        self.elements.insert(key.clone(), element);
        self.values.insert(key.clone(), value.to_string());
        self.field_names
            .insert(key, (form.key(), name.to_string()));
    }

    fn interactive(&self, key: &str) -> VerificarResult<()> {
        match self.elements.get(key) {
            Some(element) if element.visible && element.enabled => Ok(()),
            _ => Err(VerificarError::ElementNotFound {
                selector: key.to_string(),
            }),
        }
    }

    fn set_visibility(&mut self, keys: &[String], visible: bool) {
        for key in keys {
            if let Some(element) = self.elements.get_mut(key) {
                element.visible = visible;
            }
        }
    }

    fn form_snapshot(&self, form_key: &str) -> BTreeMap<String, String> {
        self.field_names
            .iter()
            .filter(|(_, (form, _))| form.as_str() == form_key)
            .filter_map(|(field_key, (_, name))| {
                self.values
                    .get(field_key)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }
}

impl ConsoleDriver for MockConsole {
    fn navigate(&mut self, token: &str) -> VerificarResult<()> {
        self.history.push(format!("navigate {token}"));
        self.location = token.to_string();
        Ok(())
    }

    fn find(&self, selector: &Selector) -> Option<ElementHandle> {
        self.elements.get(&selector.key()).cloned()
    }

    fn click(&mut self, selector: &Selector) -> VerificarResult<()> {
        let key = selector.key();
        self.history.push(format!("click {key}"));
        self.interactive(&key)?;
        if let Some(revealed) = self.reveal_on_click.get(&key).cloned() {
            self.set_visibility(&revealed, true);
        }
        if let Some(concealed) = self.conceal_on_click.get(&key).cloned() {
            self.set_visibility(&concealed, false);
        }
        if let Some(form_key) = self.save_buttons.get(&key).cloned() {
            let snapshot = self.form_snapshot(&form_key);
            if let Some(mut hook) = self.save_hooks.remove(&form_key) {
                let accepted = hook(&snapshot);
                self.save_hooks.insert(form_key.clone(), hook);
                if accepted {
                    if let Some(members) = self.form_members.get(&form_key).cloned() {
                        self.set_visibility(&members, false);
                    }
                }
            }
        }
        if let Some(mut hook) = self.click_hooks.remove(&key) {
            hook();
            self.click_hooks.insert(key, hook);
        }
        Ok(())
    }

    fn set_value(&mut self, selector: &Selector, value: &str) -> VerificarResult<()> {
        let key = selector.key();
        self.history.push(format!("set {key} = {value}"));
        self.interactive(&key)?;
        self.values.insert(key.clone(), value.to_string());
        if let Some(element) = self.elements.get_mut(&key) {
            element.text = Some(value.to_string());
        }
        Ok(())
    }

    fn text(&self, selector: &Selector) -> VerificarResult<String> {
        self.elements
            .get(&selector.key())
            .map(|element| element.text.clone().unwrap_or_default())
            .ok_or_else(|| VerificarError::ElementNotFound {
                selector: selector.key(),
            })
    }

    fn is_enabled(&self, selector: &Selector) -> VerificarResult<bool> {
        self.elements
            .get(&selector.key())
            .map(|element| element.enabled)
            .ok_or_else(|| VerificarError::ElementNotFound {
                selector: selector.key(),
            })
    }

    fn is_visible(&self, selector: &Selector) -> bool {
        self.elements
            .get(&selector.key())
            .is_some_and(|element| element.visible)
    }
}
