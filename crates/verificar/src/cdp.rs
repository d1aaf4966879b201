//! CDP-backed console driver, available with the `browser` feature.
//!
//! Drives a real console in headless Chrome through chromiumoxide. The
//! [`ConsoleDriver`] contract stays synchronous, so this module wraps the
//! async CDP session in a blocking facade over an owned tokio runtime.

use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::console::{ConsoleDriver, ElementHandle};
use crate::result::{VerificarError, VerificarResult};
use crate::selector::{escape_js, Selector};

/// Console driver over a headless Chrome session
pub struct CdpConsole {
    runtime: Arc<Runtime>,
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
    base_url: String,
}

impl std::fmt::Debug for CdpConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpConsole")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CdpConsole {
    /// Launch headless Chrome and open the console's base URL
    ///
    /// # Errors
    ///
    /// Returns `Session` when the runtime, the browser, or the initial
    /// page cannot be brought up.
    pub fn launch(base_url: impl Into<String>) -> VerificarResult<Self> {
        let base_url = base_url.into();
        let runtime = Runtime::new().map_err(|err| VerificarError::Session {
            message: format!("tokio runtime: {err}"),
        })?;
        let config = BrowserConfig::builder()
            .build()
            .map_err(|message| VerificarError::Session { message })?;
        let (browser, mut handler) =
            runtime
                .block_on(Browser::launch(config))
                .map_err(|err| VerificarError::Session {
                    message: format!("browser launch: {err}"),
                })?;
        let handler_task = runtime.spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        let page =
            runtime
                .block_on(browser.new_page(base_url.as_str()))
                .map_err(|err| VerificarError::Session {
                    message: format!("open {base_url}: {err}"),
                })?;
        Ok(Self {
            runtime: Arc::new(runtime),
            browser,
            page,
            handler_task,
            base_url,
        })
    }

    /// Shut the browser session down
    ///
    /// # Errors
    ///
    /// Returns `Session` when the browser does not close cleanly.
    pub fn close(mut self) -> VerificarResult<()> {
        let result = self
            .runtime
            .block_on(self.browser.close())
            .map(|_| ())
            .map_err(|err| VerificarError::Session {
                message: format!("browser close: {err}"),
            });
        self.handler_task.abort();
        result
    }

    fn evaluate(&self, expression: &str) -> VerificarResult<Value> {
        let evaluation = self
            .runtime
            .block_on(self.page.evaluate(expression.to_string()))
            .map_err(|err| VerificarError::Session {
                message: format!("evaluate failed: {err}"),
            })?;
        evaluation
            .into_value::<Value>()
            .map_err(|err| VerificarError::Session {
                message: format!("evaluation result: {err}"),
            })
    }
}

impl ConsoleDriver for CdpConsole {
    fn navigate(&mut self, token: &str) -> VerificarResult<()> {
        let url = format!("{}#{token}", self.base_url.trim_end_matches('/'));
        debug!("Navigating to {url}");
        self.runtime
            .block_on(self.page.goto(url.clone()))
            .map(|_| ())
            .map_err(|err| VerificarError::Session {
                message: format!("navigate to {url}: {err}"),
            })
    }

    fn find(&self, selector: &Selector) -> Option<ElementHandle> {
        match self.evaluate(&snapshot_expression(selector)) {
            Ok(Value::Null) => None,
            Ok(value) => serde_json::from_value(value).ok(),
            Err(err) => {
                warn!("Element query for {selector} failed: {err}");
                None
            }
        }
    }

    fn click(&mut self, selector: &Selector) -> VerificarResult<()> {
        let expression = format!(
            "(() => {{ const e = {}; \
             if (!e || e.disabled || e.offsetParent === null) return false; \
             e.click(); return true; }})()",
            selector.to_query()
        );
        match self.evaluate(&expression)? {
            Value::Bool(true) => Ok(()),
            _ => Err(VerificarError::ElementNotFound {
                selector: selector.key(),
            }),
        }
    }

    fn set_value(&mut self, selector: &Selector, value: &str) -> VerificarResult<()> {
        let expression = format!(
            "(() => {{ const e = {}; \
             if (!e || e.disabled || e.offsetParent === null) return false; \
             e.value = '{}'; \
             e.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             e.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            selector.to_query(),
            escape_js(value)
        );
        match self.evaluate(&expression)? {
            Value::Bool(true) => Ok(()),
            _ => Err(VerificarError::ElementNotFound {
                selector: selector.key(),
            }),
        }
    }

    fn text(&self, selector: &Selector) -> VerificarResult<String> {
        self.find(selector)
            .map(|element| element.text.unwrap_or_default())
            .ok_or_else(|| VerificarError::ElementNotFound {
                selector: selector.key(),
            })
    }

    fn is_enabled(&self, selector: &Selector) -> VerificarResult<bool> {
        self.find(selector)
            .map(|element| element.enabled)
            .ok_or_else(|| VerificarError::ElementNotFound {
                selector: selector.key(),
            })
    }

    fn is_visible(&self, selector: &Selector) -> bool {
        self.find(selector).is_some_and(|element| element.visible)
    }
}

/// JS expression producing an [`ElementHandle`] shaped object or `null`
fn snapshot_expression(selector: &Selector) -> String {
    format!(
        "(() => {{ const e = {query}; if (!e) return null; \
         const style = window.getComputedStyle(e); \
         return {{ id: e.id || '{key}', \
         text: e.value ?? (e.textContent || '').trim(), \
         enabled: !e.disabled, \
         visible: style.display !== 'none' && style.visibility !== 'hidden' }}; }})()",
        query = selector.to_query(),
        key = escape_js(&selector.key()),
    )
}
