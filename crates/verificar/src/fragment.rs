//! Page fragments for configuration forms, wizards, and dialogs.
//!
//! A [`ConfigFragment`] wraps one configuration region of the console. Its
//! read surface (labelled values, field states) never mutates anything;
//! mutation goes through [`ConfigFragment::edit`], an [`Editor`] over the
//! revealed form, and [`ConfigFragment::save`]. A missing edit affordance
//! is reported as `ElementNotFound`, which restricted-role suites treat as
//! the expected denial signal.

use tracing::debug;

use crate::console::{ConsoleConfig, ConsoleDriver};
use crate::result::{VerificarError, VerificarResult};
use crate::selector::Selector;

/// One configuration region of the console
#[derive(Debug)]
pub struct ConfigFragment<'a, C: ConsoleDriver> {
    console: &'a mut C,
    root: Selector,
    config: ConsoleConfig,
}

impl<'a, C: ConsoleDriver> ConfigFragment<'a, C> {
    /// Bind to the region once it is visible
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when the region never renders, which under a
    /// restricted role is the expected denial signal for the whole view.
    pub fn bind(console: &'a mut C, root: Selector) -> VerificarResult<Self> {
        Self::bind_with_config(console, root, ConsoleConfig::default())
    }

    /// Bind with explicit timings
    ///
    /// # Errors
    ///
    /// As [`ConfigFragment::bind`].
    pub fn bind_with_config(
        console: &'a mut C,
        root: Selector,
        config: ConsoleConfig,
    ) -> VerificarResult<Self> {
        console.wait_visible(&root, config.transition_timeout, config.poll_interval)?;
        Ok(Self {
            console,
            root,
            config,
        })
    }

    /// Open the tab labelled `label` and bind to its pane
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the tab is absent and `Timeout` when
    /// its pane never renders.
    pub fn open_tab(
        console: &'a mut C,
        label: &str,
        config: ConsoleConfig,
    ) -> VerificarResult<Self> {
        let tab = Selector::config_tab(label);
        console.locate(&tab, config.implicit_wait, config.poll_interval)?;
        console.click(&tab)?;
        Self::bind_with_config(console, Selector::tab_pane(label), config)
    }

    /// The region's root selector
    #[must_use]
    pub const fn root(&self) -> &Selector {
        &self.root
    }

    /// Read the value cell labelled `label`
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when no such cell renders within the
    /// implicit wait.
    pub fn labelled_value(&self, label: &str) -> VerificarResult<String> {
        let cell = self.root.labelled(label);
        self.console
            .locate(&cell, self.config.implicit_wait, self.config.poll_interval)?;
        self.console.text(&cell)
    }

    /// Whether the form field named `name` accepts interaction
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the field is absent.
    pub fn is_field_enabled(&self, name: &str) -> VerificarResult<bool> {
        let field = self.root.form().field(name);
        self.console
            .locate(&field, self.config.implicit_wait, self.config.poll_interval)?;
        self.console.is_enabled(&field)
    }

    /// Switch the region into edit mode
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the edit affordance is absent, the
    /// expected denial signal under read-only roles, and `Timeout` when
    /// the form never renders.
    pub fn edit(&mut self) -> VerificarResult<Editor<'_, C>> {
        let action = self.root.edit_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        debug!("Editing {}", self.root);
        self.console.click(&action)?;
        let form = self.root.form();
        self.console.wait_visible(
            &form,
            self.config.transition_timeout,
            self.config.poll_interval,
        )?;
        Ok(Editor {
            console: &mut *self.console,
            form,
            config: self.config,
        })
    }

    /// Submit the open form
    ///
    /// Returns `Ok(true)` when the console accepts the save and closes the
    /// form, `Ok(false)` when the form stays open, as it does on a
    /// validation rejection.
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when no save affordance renders.
    pub fn save(&mut self) -> VerificarResult<bool> {
        let form = self.root.form();
        let action = form.save_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        debug!("Saving {}", self.root);
        self.console.click(&action)?;
        Ok(wait_concealed(
            self.console,
            &form,
            &self.config,
        ))
    }

    /// Discard the open form
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when no cancel affordance renders.
    pub fn cancel(&mut self) -> VerificarResult<()> {
        let action = self.root.form().cancel_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        self.console.click(&action)
    }
}

/// Form editor over a revealed editing form
///
/// Every accessor fails loudly with `ElementNotFound` when the addressed
/// field is absent, hidden, or disabled, so a suite cannot silently skip a
/// field the console refused to render.
#[derive(Debug)]
pub struct Editor<'a, C: ConsoleDriver> {
    console: &'a mut C,
    form: Selector,
    config: ConsoleConfig,
}

impl<C: ConsoleDriver> Editor<'_, C> {
    /// The form selector this editor writes to
    #[must_use]
    pub const fn form(&self) -> &Selector {
        &self.form
    }

    /// Replace the text input named `name`
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the field cannot be interacted with.
    pub fn text(&mut self, name: &str, value: &str) -> VerificarResult<()> {
        let field = self.locate_field(name)?;
        self.console.set_value(&field, value)
    }

    /// Set the checkbox named `name`
    ///
    /// # Errors
    ///
    /// As [`Editor::text`].
    pub fn checkbox(&mut self, name: &str, on: bool) -> VerificarResult<()> {
        self.text(name, if on { "true" } else { "false" })
    }

    /// Choose `option` in the select named `name`
    ///
    /// # Errors
    ///
    /// As [`Editor::text`].
    pub fn select(&mut self, name: &str, option: &str) -> VerificarResult<()> {
        self.text(name, option)
    }

    /// Clear the input named `name`
    ///
    /// An empty value reads back as undefined after a save.
    ///
    /// # Errors
    ///
    /// As [`Editor::text`].
    pub fn clear(&mut self, name: &str) -> VerificarResult<()> {
        self.text(name, "")
    }

    /// Whether the field named `name` accepts interaction
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the field is absent.
    pub fn field_enabled(&self, name: &str) -> VerificarResult<bool> {
        let field = self.locate_field(name)?;
        self.console.is_enabled(&field)
    }

    fn locate_field(&self, name: &str) -> VerificarResult<Selector> {
        let field = self.form.field(name);
        self.console
            .locate(&field, self.config.implicit_wait, self.config.poll_interval)?;
        Ok(field)
    }
}

/// The console's add/configure wizard window
#[derive(Debug)]
pub struct WizardWindow<'a, C: ConsoleDriver> {
    console: &'a mut C,
    root: Selector,
    config: ConsoleConfig,
}

impl<'a, C: ConsoleDriver> WizardWindow<'a, C> {
    /// Wait for the wizard window to open
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when it never renders.
    pub fn wait_open(console: &'a mut C, config: ConsoleConfig) -> VerificarResult<Self> {
        let root = Selector::wizard();
        console.wait_visible(&root, config.transition_timeout, config.poll_interval)?;
        Ok(Self {
            console,
            root,
            config,
        })
    }

    /// Editor over the wizard's form
    pub fn editor(&mut self) -> Editor<'_, C> {
        Editor {
            console: &mut *self.console,
            form: self.root.form(),
            config: self.config,
        }
    }

    /// Submit the wizard
    ///
    /// Returns `Ok(true)` when the window closes and `Ok(false)` when it
    /// stays open.
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when no save affordance renders.
    pub fn save(&mut self) -> VerificarResult<bool> {
        let action = self.root.form().save_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        debug!("Submitting wizard");
        self.console.click(&action)?;
        Ok(wait_concealed(self.console, &self.root, &self.config))
    }

    /// Dismiss the wizard without saving
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when no cancel affordance renders.
    pub fn cancel(&mut self) -> VerificarResult<()> {
        let action = self.root.form().cancel_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        self.console.click(&action)
    }
}

/// Confirmation dialog guarding destructive actions
#[derive(Debug)]
pub struct ConfirmationDialog<'a, C: ConsoleDriver> {
    console: &'a mut C,
    root: Selector,
    config: ConsoleConfig,
}

impl<'a, C: ConsoleDriver> ConfirmationDialog<'a, C> {
    /// Wait for the dialog to open
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when it never renders.
    pub fn wait_open(console: &'a mut C, config: ConsoleConfig) -> VerificarResult<Self> {
        let root = Selector::confirmation_dialog();
        console.wait_visible(&root, config.transition_timeout, config.poll_interval)?;
        Ok(Self {
            console,
            root,
            config,
        })
    }

    /// Confirm the pending action and wait for the dialog to close
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the confirm affordance is absent and
    /// `Timeout` when the dialog never closes.
    pub fn confirm(&mut self) -> VerificarResult<()> {
        let action = self.root.confirm_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        self.console.click(&action)?;
        if wait_concealed(self.console, &self.root, &self.config) {
            Ok(())
        } else {
            Err(VerificarError::Timeout {
                ms: crate::result::millis(self.config.transition_timeout),
                waiting_for: format!("{} to close", self.root),
            })
        }
    }

    /// Dismiss the dialog without confirming
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the cancel affordance is absent.
    pub fn reject(&mut self) -> VerificarResult<()> {
        let action = self.root.cancel_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        self.console.click(&action)
    }
}

/// Error dialog raised by the console
#[derive(Debug)]
pub struct ErrorDialog<'a, C: ConsoleDriver> {
    console: &'a mut C,
    root: Selector,
    config: ConsoleConfig,
}

impl<'a, C: ConsoleDriver> ErrorDialog<'a, C> {
    /// Whether an error dialog is currently shown
    pub fn is_present(console: &C) -> bool {
        console.is_visible(&Selector::error_dialog())
    }

    /// Wait for an error dialog to open
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when none renders.
    pub fn wait_open(console: &'a mut C, config: ConsoleConfig) -> VerificarResult<Self> {
        let root = Selector::error_dialog();
        console.wait_visible(&root, config.transition_timeout, config.poll_interval)?;
        Ok(Self {
            console,
            root,
            config,
        })
    }

    /// The dialog's message text
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the dialog is absent.
    pub fn message(&self) -> VerificarResult<String> {
        self.console.text(&self.root)
    }

    /// Close the dialog
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the close affordance is absent.
    pub fn dismiss(&mut self) -> VerificarResult<()> {
        let action = self.root.close_action();
        self.console
            .locate(&action, self.config.implicit_wait, self.config.poll_interval)?;
        self.console.click(&action)
    }
}

/// Poll until `selector` is no longer visible, `false` when the transition
/// timeout expires first
fn wait_concealed<C: ConsoleDriver>(
    console: &C,
    selector: &Selector,
    config: &ConsoleConfig,
) -> bool {
    let start = std::time::Instant::now();
    loop {
        if !console.is_visible(selector) {
            return true;
        }
        if start.elapsed() >= config.transition_timeout {
            return false;
        }
        std::thread::sleep(config.poll_interval);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::console::MockConsole;

    fn region() -> Selector {
        Selector::css("[data-config=\"file-handler\"]")
    }

    fn immediate() -> ConsoleConfig {
        ConsoleConfig::immediate()
    }

    mod binding {
        use super::*;

        #[test]
        fn test_bind_to_visible_region() {
            let mut console = MockConsole::new();
            console.stage(&region());
            let fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            assert_eq!(fragment.root(), &region());
        }

        #[test]
        fn test_bind_times_out_on_missing_region() {
            let mut console = MockConsole::new();
            let err = ConfigFragment::bind_with_config(&mut console, region(), immediate())
                .unwrap_err();
            assert!(err.is_timeout());
        }

        #[test]
        fn test_open_tab_binds_to_pane() {
            let mut console = MockConsole::new();
            console.stage(&Selector::config_tab("Attributes"));
            console.stage_on_click(
                &Selector::config_tab("Attributes"),
                &Selector::tab_pane("Attributes"),
            );
            let fragment =
                ConfigFragment::open_tab(&mut console, "Attributes", immediate()).unwrap();
            assert_eq!(fragment.root(), &Selector::tab_pane("Attributes"));
        }
    }

    mod reading {
        use super::*;

        #[test]
        fn test_labelled_value_reads_cell() {
            let mut console = MockConsole::new();
            console.stage(&region());
            console.stage_text(&region().labelled("Level"), "ALL");
            let fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            assert_eq!(fragment.labelled_value("Level").unwrap(), "ALL");
        }

        #[test]
        fn test_missing_cell_fails_loudly() {
            let mut console = MockConsole::new();
            console.stage(&region());
            let fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            assert!(fragment
                .labelled_value("Level")
                .unwrap_err()
                .is_element_not_found());
        }

        #[test]
        fn test_disabled_field_reported() {
            let mut console = MockConsole::new();
            console.stage(&region());
            console.stage_disabled_field(&region().form(), "name", "audit");
            let fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            assert!(!fragment.is_field_enabled("name").unwrap());
        }
    }

    mod editing {
        use super::*;

        #[test]
        fn test_edit_reveals_editor() {
            let mut console = MockConsole::new();
            let form = console.stage_editable_form(&region(), &[("level", "ALL")]);
            let mut fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            let mut editor = fragment.edit().unwrap();
            editor.text("level", "CONFIG").unwrap();
            assert_eq!(
                fragment.console.form_value(&form, "level"),
                Some("CONFIG".to_string())
            );
        }

        #[test]
        fn test_missing_edit_affordance_is_denial_signal() {
            let mut console = MockConsole::new();
            console.stage(&region());
            let mut fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            assert!(fragment.edit().unwrap_err().is_element_not_found());
        }

        #[test]
        fn test_writing_missing_field_fails_loudly() {
            let mut console = MockConsole::new();
            console.stage_editable_form(&region(), &[("level", "ALL")]);
            let mut fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            let mut editor = fragment.edit().unwrap();
            assert!(editor
                .text("no-such-field", "x")
                .unwrap_err()
                .is_element_not_found());
        }

        #[test]
        fn test_checkbox_writes_boolean_strings() {
            let mut console = MockConsole::new();
            let form = console.stage_editable_form(&region(), &[("append", "true")]);
            let mut fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            fragment.edit().unwrap().checkbox("append", false).unwrap();
            assert_eq!(
                fragment.console.form_value(&form, "append"),
                Some("false".to_string())
            );
        }
    }

    mod saving {
        use super::*;

        #[test]
        fn test_accepted_save_returns_true() {
            let mut console = MockConsole::new();
            let form = console.stage_editable_form(&region(), &[("level", "ALL")]);
            console.on_save(&form, |_| true);
            let mut fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            let mut editor = fragment.edit().unwrap();
            editor.text("level", "CONFIG").unwrap();
            assert!(fragment.save().unwrap());
        }

        #[test]
        fn test_rejected_save_returns_false_and_keeps_form_open() {
            let mut console = MockConsole::new();
            let form = console.stage_editable_form(&region(), &[("level", "ALL")]);
            console.on_save(&form, |_| false);
            let mut fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            fragment.edit().unwrap();
            assert!(!fragment.save().unwrap());
            assert!(fragment.console.is_visible(&form));
        }

        #[test]
        fn test_cancel_discards_form() {
            let mut console = MockConsole::new();
            let form = console.stage_editable_form(&region(), &[("level", "ALL")]);
            console.on_save(&form, |_| panic!("save must not run on cancel"));
            let mut fragment =
                ConfigFragment::bind_with_config(&mut console, region(), immediate()).unwrap();
            fragment.edit().unwrap();
            fragment.cancel().unwrap();
            assert!(!fragment.console.is_visible(&form));
        }
    }

    mod windows {
        use super::*;

        #[test]
        fn test_wizard_flow() {
            let mut console = MockConsole::new();
            let trigger = Selector::column_action("Handler", "add");
            console.stage(&trigger);
            let window = console.stage_wizard(&trigger, &[("name", ""), ("level", "ALL")]);
            console.on_save(&window.form(), |_| true);
            console.click(&trigger).unwrap();
            let mut wizard = WizardWindow::wait_open(&mut console, immediate()).unwrap();
            wizard.editor().text("name", "audit").unwrap();
            assert!(wizard.save().unwrap());
            assert!(!console.is_visible(&Selector::wizard()));
        }

        #[test]
        fn test_wizard_requires_open_window() {
            let mut console = MockConsole::new();
            let err = WizardWindow::wait_open(&mut console, immediate()).unwrap_err();
            assert!(err.is_timeout());
        }

        #[test]
        fn test_confirmation_dialog_confirms_and_closes() {
            let mut console = MockConsole::new();
            let dialog = Selector::confirmation_dialog();
            console.stage(&dialog);
            console.stage(&dialog.confirm_action());
            console.stage_dismiss_on_click(&dialog.confirm_action(), &dialog);
            let mut confirmation =
                ConfirmationDialog::wait_open(&mut console, immediate()).unwrap();
            confirmation.confirm().unwrap();
        }

        #[test]
        fn test_stuck_confirmation_times_out() {
            let mut console = MockConsole::new();
            let dialog = Selector::confirmation_dialog();
            console.stage(&dialog);
            console.stage(&dialog.confirm_action());
            let mut confirmation =
                ConfirmationDialog::wait_open(&mut console, immediate()).unwrap();
            assert!(confirmation.confirm().unwrap_err().is_timeout());
        }

        #[test]
        fn test_error_dialog_reports_and_dismisses() {
            let mut console = MockConsole::new();
            let dialog = Selector::error_dialog();
            console.stage_text(&dialog, "Access denied");
            console.stage(&dialog.close_action());
            console.stage_dismiss_on_click(&dialog.close_action(), &dialog);
            assert!(ErrorDialog::is_present(&console));
            let mut error = ErrorDialog::wait_open(&mut console, immediate()).unwrap();
            assert_eq!(error.message().unwrap(), "Access denied");
            error.dismiss().unwrap();
            assert!(!ErrorDialog::is_present(&console));
        }
    }
}
