//! Element selectors and the console's DOM conventions.
//!
//! A [`Selector`] names a console element by CSS, visible text, form label,
//! or id. The associated constructors encode the console's data-attribute
//! conventions (finder columns, config tabs, dialog windows) in one place
//! so page objects and tests never spell raw selectors twice.

use serde::{Deserialize, Serialize};

/// Strategy for locating a console element
///
/// # Examples
///
/// ```
/// use verificar::Selector;
///
/// let field = Selector::css("[data-form=\"logging\"]").field("level");
/// assert_eq!(field.key(), "css:[data-form=\"logging\"] [name=\"level\"]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "kebab-case")]
pub enum Selector {
    /// CSS selector
    Css(String),
    /// Exact visible text content
    Text(String),
    /// Form control labelled with the given text
    Label(String),
    /// Element id
    Id(String),
}

impl Selector {
    /// Select by CSS
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Select by exact visible text
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Select a form control by its label text
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// Select by element id
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    // ========================================================================
    // Console DOM conventions
    // ========================================================================

    /// A finder column titled `title`
    #[must_use]
    pub fn finder_column(title: &str) -> Self {
        Self::Css(format!("[data-column=\"{title}\"]"))
    }

    /// A finder item named `name` inside the column titled `column`
    #[must_use]
    pub fn finder_item(column: &str, name: &str) -> Self {
        Self::Css(format!(
            "[data-column=\"{column}\"] [data-item=\"{name}\"]"
        ))
    }

    /// A finder item in selected state
    #[must_use]
    pub fn finder_item_selected(column: &str, name: &str) -> Self {
        Self::Css(format!(
            "[data-column=\"{column}\"] [data-item=\"{name}\"][data-selected]"
        ))
    }

    /// An action button on a finder item
    #[must_use]
    pub fn item_action(column: &str, name: &str, action: &str) -> Self {
        Self::Css(format!(
            "[data-column=\"{column}\"] [data-item=\"{name}\"] [data-action=\"{action}\"]"
        ))
    }

    /// An action button in a finder column header
    #[must_use]
    pub fn column_action(column: &str, action: &str) -> Self {
        Self::Css(format!(
            "[data-column=\"{column}\"] [data-column-action=\"{action}\"]"
        ))
    }

    /// A configuration tab labelled `label`
    #[must_use]
    pub fn config_tab(label: &str) -> Self {
        Self::Css(format!("[data-tab=\"{label}\"]"))
    }

    /// The pane revealed by the tab labelled `label`
    #[must_use]
    pub fn tab_pane(label: &str) -> Self {
        Self::Css(format!("[data-tab-pane=\"{label}\"]"))
    }

    /// The add/configure wizard window
    #[must_use]
    pub fn wizard() -> Self {
        Self::Css("[data-window=\"wizard\"]".to_string())
    }

    /// The confirmation dialog window
    #[must_use]
    pub fn confirmation_dialog() -> Self {
        Self::Css("[data-window=\"confirm\"]".to_string())
    }

    /// The error dialog window
    #[must_use]
    pub fn error_dialog() -> Self {
        Self::Css("[data-window=\"error\"]".to_string())
    }

    /// The login form
    #[must_use]
    pub fn login_form() -> Self {
        Self::Css("[data-form=\"login\"]".to_string())
    }

    /// The marker element present once the console has finished loading
    #[must_use]
    pub fn console_ready() -> Self {
        Self::Css("[data-console-ready]".to_string())
    }

    /// Scope a CSS suffix under this selector
    ///
    /// Text and label selectors carry no CSS scope, so the suffix selects
    /// from the whole document.
    #[must_use]
    pub fn descendant(&self, suffix: &str) -> Self {
        match self.css_prefix() {
            Some(prefix) => Self::Css(format!("{prefix} {suffix}")),
            None => Self::Css(suffix.to_string()),
        }
    }

    /// The edit affordance of this region
    #[must_use]
    pub fn edit_action(&self) -> Self {
        self.descendant("[data-action=\"edit\"]")
    }

    /// The editing form region of this region
    #[must_use]
    pub fn form(&self) -> Self {
        self.descendant("[data-form]")
    }

    /// The save affordance of this form
    #[must_use]
    pub fn save_action(&self) -> Self {
        self.descendant("[data-action=\"save\"]")
    }

    /// The cancel affordance of this form
    #[must_use]
    pub fn cancel_action(&self) -> Self {
        self.descendant("[data-action=\"cancel\"]")
    }

    /// The confirm affordance of this dialog
    #[must_use]
    pub fn confirm_action(&self) -> Self {
        self.descendant("[data-action=\"confirm\"]")
    }

    /// The close affordance of this dialog
    #[must_use]
    pub fn close_action(&self) -> Self {
        self.descendant("[data-action=\"close\"]")
    }

    /// The submit affordance of this form
    #[must_use]
    pub fn submit_action(&self) -> Self {
        self.descendant("[data-action=\"submit\"]")
    }

    /// The form input named `name`
    #[must_use]
    pub fn field(&self, name: &str) -> Self {
        self.descendant(&format!("[name=\"{name}\"]"))
    }

    /// The read-only value cell labelled `label`
    #[must_use]
    pub fn labelled(&self, label: &str) -> Self {
        self.descendant(&format!("[data-label=\"{label}\"]"))
    }

    /// Canonical string form, unique per strategy and value
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Css(css) => format!("css:{css}"),
            Self::Text(text) => format!("text:{text}"),
            Self::Label(label) => format!("label:{label}"),
            Self::Id(id) => format!("id:{id}"),
        }
    }

    /// JavaScript expression evaluating to the selected element or
    /// `undefined`
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(css) => {
                format!("document.querySelector('{}')", escape_js(css))
            }
            Self::Text(text) => format!(
                "Array.from(document.querySelectorAll('*')).find(e => e.textContent.trim() === '{}')",
                escape_js(text)
            ),
            Self::Label(label) => format!(
                "Array.from(document.querySelectorAll('label')).filter(l => l.textContent.trim() === '{}').map(l => l.control || document.getElementById(l.htmlFor))[0]",
                escape_js(label)
            ),
            Self::Id(id) => format!("document.getElementById('{}')", escape_js(id)),
        }
    }

    fn css_prefix(&self) -> Option<String> {
        match self {
            Self::Css(css) => Some(css.clone()),
            Self::Id(id) => Some(format!("#{id}")),
            Self::Text(_) | Self::Label(_) => None,
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

pub(crate) fn escape_js(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}
