//! Finder navigation through the console's column tree.
//!
//! The console presents its model as cascading finder columns. A
//! [`FinderNavigation`] collects a path of `(column, item)` pairs without
//! touching the console, then walks it lazily on [`FinderNavigation::select_row`]
//! or [`FinderNavigation::select_column`]. A missing item inside the implicit
//! wait is `ElementNotFound`; a view transition that never completes is
//! `Timeout`. Under restricted roles both are expected signals rather than
//! failures.

use tracing::debug;

use crate::console::{ConsoleConfig, ConsoleDriver};
use crate::result::{VerificarError, VerificarResult};
use crate::selector::Selector;

/// Well-known tokens, column titles, and action ids
pub mod names {
    /// Entry token for the configuration perspective
    pub const CONFIGURATION: &str = "configuration";
    /// Entry token for the runtime perspective
    pub const RUNTIME: &str = "runtime";
    /// Entry token for the access control perspective
    pub const ACCESS_CONTROL: &str = "access-control";
    /// Column listing subsystems
    pub const SUBSYSTEM_COLUMN: &str = "Subsystem";
    /// Action opening an item's view
    pub const VIEW: &str = "view";
    /// Action opening an add wizard
    pub const ADD: &str = "add";
    /// Action removing an item
    pub const REMOVE: &str = "remove";
}

/// Lazily evaluated walk through finder columns
///
/// Nothing is resolved until a `select_*` call walks the whole path.
#[derive(Debug)]
pub struct FinderNavigation<'a, C: ConsoleDriver> {
    console: &'a mut C,
    config: ConsoleConfig,
    entry: String,
    path: Vec<(String, String)>,
}

impl<'a, C: ConsoleDriver> FinderNavigation<'a, C> {
    /// Start a navigation at the view token `entry`
    pub fn new(console: &'a mut C, entry: impl Into<String>) -> Self {
        Self::with_config(console, entry, ConsoleConfig::default())
    }

    /// Start a navigation with explicit timings
    pub fn with_config(
        console: &'a mut C,
        entry: impl Into<String>,
        config: ConsoleConfig,
    ) -> Self {
        Self {
            console,
            config,
            entry: entry.into(),
            path: Vec::new(),
        }
    }

    /// Append one `(column, item)` pair to the path
    #[must_use]
    pub fn step(mut self, column: impl Into<String>, item: impl Into<String>) -> Self {
        self.path.push((column.into(), item.into()));
        self
    }

    /// Walk the path and leave the terminal item selected
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for an empty path, `ElementNotFound` when a
    /// column or item never appears within the implicit wait, and `Timeout`
    /// when a transition or the selection marker never completes.
    pub fn select_row(self) -> VerificarResult<FinderRow<'a, C>> {
        let Self {
            console,
            config,
            entry,
            path,
        } = self;
        if path.is_empty() {
            return Err(VerificarError::InvalidState {
                message: "finder path is empty".to_string(),
            });
        }
        walk(console, &config, &entry, &path, None)?;
        // non-empty, checked above
        let (column, item) = path.last().cloned().unwrap_or_default();
        console.wait_visible(
            &Selector::finder_item_selected(&column, &item),
            config.transition_timeout,
            config.poll_interval,
        )?;
        Ok(FinderRow {
            console,
            config,
            column,
            name: item,
        })
    }

    /// Walk the path and wait for the column titled `title` to open
    ///
    /// With an empty path this just navigates to the entry token and waits
    /// for the column.
    ///
    /// # Errors
    ///
    /// As [`FinderNavigation::select_row`], except an empty path is allowed.
    pub fn select_column(self, title: &str) -> VerificarResult<FinderColumn<'a, C>> {
        let Self {
            console,
            config,
            entry,
            path,
        } = self;
        walk(console, &config, &entry, &path, Some(title))?;
        Ok(FinderColumn {
            console,
            config,
            title: title.to_string(),
        })
    }
}

fn walk<C: ConsoleDriver>(
    console: &mut C,
    config: &ConsoleConfig,
    entry: &str,
    path: &[(String, String)],
    trailing_column: Option<&str>,
) -> VerificarResult<()> {
    console.navigate(entry)?;
    for (index, (column, item)) in path.iter().enumerate() {
        console.locate(
            &Selector::finder_column(column),
            config.implicit_wait,
            config.poll_interval,
        )?;
        let item_selector = Selector::finder_item(column, item);
        console.locate(&item_selector, config.implicit_wait, config.poll_interval)?;
        debug!("Selecting {item} in column {column}");
        console.click(&item_selector)?;
        let next = path
            .get(index + 1)
            .map(|(next_column, _)| next_column.as_str())
            .or(if index + 1 == path.len() {
                trailing_column
            } else {
                None
            });
        if let Some(next_column) = next {
            console.wait_visible(
                &Selector::finder_column(next_column),
                config.transition_timeout,
                config.poll_interval,
            )?;
        }
    }
    if path.is_empty() {
        if let Some(title) = trailing_column {
            console.wait_visible(
                &Selector::finder_column(title),
                config.transition_timeout,
                config.poll_interval,
            )?;
        }
    }
    Ok(())
}

/// A selected finder item
#[derive(Debug)]
pub struct FinderRow<'a, C: ConsoleDriver> {
    console: &'a mut C,
    config: ConsoleConfig,
    column: String,
    name: String,
}

impl<'a, C: ConsoleDriver> FinderRow<'a, C> {
    /// The selected item's name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column the item lives in
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Click the item action with the given id
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the action affordance is absent,
    /// which under restricted roles is the expected denial signal.
    pub fn invoke(&mut self, action: &str) -> VerificarResult<()> {
        let selector = Selector::item_action(&self.column, &self.name, action);
        self.console
            .locate(&selector, self.config.implicit_wait, self.config.poll_interval)?;
        debug!("Invoking {action} on {} in {}", self.name, self.column);
        self.console.click(&selector)
    }

    /// Open the item's view
    ///
    /// # Errors
    ///
    /// As [`FinderRow::invoke`].
    pub fn view(&mut self) -> VerificarResult<()> {
        self.invoke(names::VIEW)
    }

    /// Release the console borrow for follow-on page objects
    #[must_use]
    pub fn into_console(self) -> &'a mut C {
        self.console
    }
}

/// An opened finder column
#[derive(Debug)]
pub struct FinderColumn<'a, C: ConsoleDriver> {
    console: &'a mut C,
    config: ConsoleConfig,
    title: String,
}

impl<'a, C: ConsoleDriver> FinderColumn<'a, C> {
    /// The column title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Click the column-level action with the given id
    ///
    /// # Errors
    ///
    /// Returns `ElementNotFound` when the action affordance is absent.
    pub fn invoke(&mut self, action: &str) -> VerificarResult<()> {
        let selector = Selector::column_action(&self.title, action);
        self.console
            .locate(&selector, self.config.implicit_wait, self.config.poll_interval)?;
        debug!("Invoking {action} on column {}", self.title);
        self.console.click(&selector)
    }

    /// Release the console borrow for follow-on page objects
    #[must_use]
    pub fn into_console(self) -> &'a mut C {
        self.console
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::console::MockConsole;

    fn stage_two_level_tree(console: &mut MockConsole) {
        let subsystem_item = Selector::finder_item(names::SUBSYSTEM_COLUMN, "logging");
        console.stage(&Selector::finder_column(names::SUBSYSTEM_COLUMN));
        console.stage(&subsystem_item);
        console.stage_on_click(&subsystem_item, &Selector::finder_column("Handler"));
        console.stage_on_click(&subsystem_item, &Selector::finder_item("Handler", "audit"));
        let handler_item = Selector::finder_item("Handler", "audit");
        console.stage_on_click(
            &handler_item,
            &Selector::finder_item_selected("Handler", "audit"),
        );
    }

    fn immediate() -> ConsoleConfig {
        ConsoleConfig::immediate()
    }

    mod walking {
        use super::*;

        #[test]
        fn test_walk_selects_terminal_row() {
            let mut console = MockConsole::new();
            stage_two_level_tree(&mut console);
            let row = FinderNavigation::with_config(
                &mut console,
                names::CONFIGURATION,
                immediate(),
            )
            .step(names::SUBSYSTEM_COLUMN, "logging")
            .step("Handler", "audit")
            .select_row()
            .unwrap();
            assert_eq!(row.name(), "audit");
            assert_eq!(row.column(), "Handler");
            let console = row.into_console();
            assert_eq!(console.location(), names::CONFIGURATION);
            assert!(console.was_called(
                "click css:[data-column=\"Subsystem\"] [data-item=\"logging\"]"
            ));
        }

        #[test]
        fn test_nothing_resolves_before_select() {
            let mut console = MockConsole::new();
            let navigation =
                FinderNavigation::with_config(&mut console, names::CONFIGURATION, immediate())
                    .step(names::SUBSYSTEM_COLUMN, "logging");
            drop(navigation);
            assert!(console.history().is_empty());
        }

        #[test]
        fn test_empty_path_is_invalid() {
            let mut console = MockConsole::new();
            let err = FinderNavigation::with_config(
                &mut console,
                names::CONFIGURATION,
                immediate(),
            )
            .select_row()
            .unwrap_err();
            assert!(matches!(err, VerificarError::InvalidState { .. }));
        }

        #[test]
        fn test_missing_item_reports_element_not_found() {
            let mut console = MockConsole::new();
            console.stage(&Selector::finder_column(names::SUBSYSTEM_COLUMN));
            let err = FinderNavigation::with_config(
                &mut console,
                names::CONFIGURATION,
                immediate(),
            )
            .step(names::SUBSYSTEM_COLUMN, "logging")
            .select_row()
            .unwrap_err();
            assert!(err.is_element_not_found());
        }

        #[test]
        fn test_stuck_transition_reports_timeout() {
            let mut console = MockConsole::new();
            console.stage(&Selector::finder_column(names::SUBSYSTEM_COLUMN));
            console.stage(&Selector::finder_item(names::SUBSYSTEM_COLUMN, "logging"));
            let err = FinderNavigation::with_config(
                &mut console,
                names::CONFIGURATION,
                immediate(),
            )
            .step(names::SUBSYSTEM_COLUMN, "logging")
            .step("Handler", "audit")
            .select_row()
            .unwrap_err();
            assert!(err.is_timeout());
        }

        #[test]
        fn test_missing_selection_marker_reports_timeout() {
            let mut console = MockConsole::new();
            console.stage(&Selector::finder_column(names::SUBSYSTEM_COLUMN));
            console.stage(&Selector::finder_item(names::SUBSYSTEM_COLUMN, "logging"));
            let err = FinderNavigation::with_config(
                &mut console,
                names::CONFIGURATION,
                immediate(),
            )
            .step(names::SUBSYSTEM_COLUMN, "logging")
            .select_row()
            .unwrap_err();
            assert!(err.is_timeout());
        }
    }

    mod columns {
        use super::*;

        #[test]
        fn test_select_column_after_steps() {
            let mut console = MockConsole::new();
            stage_two_level_tree(&mut console);
            let column = FinderNavigation::with_config(
                &mut console,
                names::CONFIGURATION,
                immediate(),
            )
            .step(names::SUBSYSTEM_COLUMN, "logging")
            .select_column("Handler")
            .unwrap();
            assert_eq!(column.title(), "Handler");
        }

        #[test]
        fn test_select_column_with_empty_path_navigates_only() {
            let mut console = MockConsole::new();
            console.stage(&Selector::finder_column(names::SUBSYSTEM_COLUMN));
            let column = FinderNavigation::with_config(
                &mut console,
                names::CONFIGURATION,
                immediate(),
            )
            .select_column(names::SUBSYSTEM_COLUMN)
            .unwrap();
            assert_eq!(column.title(), names::SUBSYSTEM_COLUMN);
        }

        #[test]
        fn test_column_action_clicks_affordance() {
            let mut console = MockConsole::new();
            console.stage(&Selector::finder_column("Handler"));
            console.stage(&Selector::column_action("Handler", names::ADD));
            let mut column =
                FinderNavigation::with_config(&mut console, names::CONFIGURATION, immediate())
                    .select_column("Handler")
                    .unwrap();
            column.invoke(names::ADD).unwrap();
            let console = column.into_console();
            assert!(console.was_called(
                "click css:[data-column=\"Handler\"] [data-column-action=\"add\"]"
            ));
        }

        #[test]
        fn test_missing_column_action_is_denial_signal() {
            let mut console = MockConsole::new();
            console.stage(&Selector::finder_column("Handler"));
            let mut column =
                FinderNavigation::with_config(&mut console, names::CONFIGURATION, immediate())
                    .select_column("Handler")
                    .unwrap();
            assert!(column.invoke(names::ADD).unwrap_err().is_element_not_found());
        }
    }
}
