//! `headless_chrome` implementation of [`PageDriver`] and [`CdpSession`].
//!
//! `headless_chrome` is blocking, so every call runs on the blocking pool.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::browser::tab::element::Element;
use headless_chrome::browser::tab::EventListener;
use headless_chrome::protocol::cdp::types::{Event, Method};
use headless_chrome::protocol::cdp::{Accessibility, Network, Runtime, DOM};
use headless_chrome::Tab;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::browser::network::NetworkMonitor;
use crate::browser::page::{CdpSession, Cookie, PageDriver, Selector};
use crate::error::{BrowserError, Result};

type Listener = dyn EventListener<Event> + Send + Sync;

const FILL_FUNCTION: &str = r#"function(value) {
    this.focus();
    this.value = value;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
}"#;

const SELECT_OPTION_FUNCTION: &str = r#"function(value) {
    const wanted = String(value).trim().toLowerCase();
    const options = Array.from(this.options || []);
    const match = options.find(o => o.value === value)
        || options.find(o => (o.label || o.textContent || '').trim().toLowerCase() === wanted);
    if (!match) {
        throw new Error('No option matching ' + value);
    }
    this.value = match.value;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return match.value;
}"#;

/// A Chrome tab driven through `headless_chrome`
#[derive(Clone)]
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| BrowserError::TabOperationFailed(format!("Blocking task failed: {}", e)))?
    }
}

fn find_element<'a>(tab: &'a Tab, selector: &str) -> Result<Element<'a>> {
    let found = match Selector::parse(selector) {
        Selector::Css(css) => tab.find_element(css),
        Selector::XPath(xpath) => tab.find_element_by_xpath(xpath),
    };
    found.map_err(|e| {
        BrowserError::ElementNotFound(format!("Element '{}' not found: {}", selector, e))
    })
}

fn action_error(action: &str, err: impl std::fmt::Display) -> BrowserError {
    BrowserError::ActionFailed {
        action: action.to_string(),
        reason: err.to_string(),
    }
}

/// Run a typed protocol command built from raw JSON params
fn call<M>(tab: &Tab, method: &str, params: Value) -> Result<Value>
where
    M: Method + DeserializeOwned + Serialize + std::fmt::Debug,
    M::ReturnObject: Serialize,
{
    let command: M = serde_json::from_value(params)
        .map_err(|e| BrowserError::Cdp(format!("Invalid params for {}: {}", method, e)))?;
    let result = tab
        .call_method(command)
        .map_err(|e| BrowserError::Cdp(format!("{} failed: {}", method, e)))?;
    Ok(serde_json::to_value(result)?)
}

fn dispatch(tab: &Tab, method: &str, params: Value) -> Result<Value> {
    match method {
        "DOM.enable" => call::<DOM::Enable>(tab, method, params),
        "DOM.getDocument" => call::<DOM::GetDocument>(tab, method, params),
        "DOM.resolveNode" => call::<DOM::ResolveNode>(tab, method, params),
        "Accessibility.enable" => call::<Accessibility::Enable>(tab, method, params),
        "Accessibility.getFullAXTree" => call::<Accessibility::GetFullAXTree>(tab, method, params),
        "Runtime.enable" => call::<Runtime::Enable>(tab, method, params),
        "Runtime.callFunctionOn" => call::<Runtime::CallFunctionOn>(tab, method, params),
        "Runtime.releaseObject" => call::<Runtime::ReleaseObject>(tab, method, params),
        "Network.enable" => call::<Network::Enable>(tab, method, params),
        "Network.getCookies" => call::<Network::GetCookies>(tab, method, params),
        "Network.setCookies" => call::<Network::SetCookies>(tab, method, params),
        other => Err(BrowserError::Cdp(format!("Unsupported CDP method: {}", other))),
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.run(move |tab| {
            tab.navigate_to(&url).map_err(|e| {
                BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
            })?;
            Ok(())
        })
        .await
    }

    async fn wait_for_load(&self) -> Result<()> {
        self.run(|tab| {
            tab.wait_until_navigated()
                .map_err(|e| BrowserError::NavigationFailed(format!("Navigation timeout: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn url(&self) -> Result<String> {
        self.run(|tab| Ok(tab.get_url())).await
    }

    async fn title(&self) -> Result<String> {
        self.run(|tab| {
            tab.get_title().map_err(|e| {
                BrowserError::TabOperationFailed(format!("Failed to read title: {}", e))
            })
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        self.run(|tab| {
            tab.get_content().map_err(|e| {
                BrowserError::TabOperationFailed(format!("Failed to read content: {}", e))
            })
        })
        .await
    }

    async fn text_content(&self) -> Result<String> {
        self.run(|tab| {
            let result = tab
                .evaluate("document.body ? document.body.innerText : ''", false)
                .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
            Ok(result
                .value
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default())
        })
        .await
    }

    async fn element_text(&self, selector: &str) -> Result<String> {
        let selector = selector.to_string();
        self.run(move |tab| {
            let element = find_element(tab, &selector)?;
            element.get_inner_text().map_err(|e| {
                BrowserError::EvaluationFailed(format!(
                    "Failed to read text of '{}': {}",
                    selector, e
                ))
            })
        })
        .await
    }

    async fn new_cdp_session(&self) -> Result<Box<dyn CdpSession>> {
        let session = ChromeCdpSession::attach(Arc::clone(&self.tab))?;
        Ok(Box::new(session))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        self.run(move |tab| {
            find_element(tab, &selector)?.click().map_err(|e| action_error("click", e))?;
            Ok(())
        })
        .await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let selector = selector.to_string();
        let value = value.to_string();
        self.run(move |tab| {
            find_element(tab, &selector)?
                .call_js_fn(FILL_FUNCTION, vec![json!(value)], false)
                .map_err(|e| action_error("fill", e))?;
            Ok(())
        })
        .await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        self.run(move |tab| {
            find_element(tab, &selector)?
                .type_into(&text)
                .map_err(|e| action_error("type", e))?;
            Ok(())
        })
        .await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let selector = selector.to_string();
        let value = value.to_string();
        self.run(move |tab| {
            find_element(tab, &selector)?
                .call_js_fn(SELECT_OPTION_FUNCTION, vec![json!(value)], false)
                .map_err(|e| action_error("select", e))?;
            Ok(())
        })
        .await
    }

    async fn press(&self, selector: &str, key: &str) -> Result<()> {
        let selector = selector.to_string();
        let key = key.to_string();
        self.run(move |tab| {
            find_element(tab, &selector)?.focus().map_err(|e| action_error("press", e))?;
            tab.press_key(&key).map_err(|e| action_error("press", e))?;
            Ok(())
        })
        .await
    }

    async fn keyboard_press(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.run(move |tab| {
            tab.press_key(&key).map_err(|e| action_error("press", e))?;
            Ok(())
        })
        .await
    }

    async fn keyboard_type(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.run(move |tab| {
            tab.type_str(&text).map_err(|e| action_error("type", e))?;
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.run(move |tab| {
            let found = match Selector::parse(&selector) {
                Selector::Css(css) => tab.wait_for_element_with_custom_timeout(css, timeout),
                Selector::XPath(xpath) => tab.wait_for_xpath_with_custom_timeout(xpath, timeout),
            };
            found.map_err(|e| {
                BrowserError::ElementNotFound(format!(
                    "Timed out waiting for '{}': {}",
                    selector, e
                ))
            })?;
            Ok(())
        })
        .await
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        let result = self
            .run(|tab| call::<Network::GetCookies>(tab, "Network.getCookies", json!({})))
            .await?;
        let cookies = result.get("cookies").cloned().unwrap_or_else(|| json!([]));
        Ok(serde_json::from_value(cookies)?)
    }

    async fn set_cookies(&self, cookies: Vec<Cookie>) -> Result<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        let params = json!({ "cookies": cookies });
        self.run(move |tab| call::<Network::SetCookies>(tab, "Network.setCookies", params))
            .await?;
        Ok(())
    }
}

/// Protocol session over a Chrome tab, feeding a [`NetworkMonitor`] from
/// the tab's network events while attached.
pub struct ChromeCdpSession {
    tab: Arc<Tab>,
    monitor: Arc<NetworkMonitor>,
    listener: Mutex<Option<Weak<Listener>>>,
}

impl ChromeCdpSession {
    pub fn attach(tab: Arc<Tab>) -> Result<Self> {
        let monitor = Arc::new(NetworkMonitor::new());
        let sink = Arc::clone(&monitor);
        let listener: Arc<Listener> = Arc::new(move |event: &Event| match event {
            Event::NetworkRequestWillBeSent(ev) => sink.request_started(&ev.params.request_id),
            Event::NetworkLoadingFinished(ev) => sink.request_finished(&ev.params.request_id),
            Event::NetworkLoadingFailed(ev) => sink.request_finished(&ev.params.request_id),
            _ => {}
        });
        let weak = tab
            .add_event_listener(listener)
            .map_err(|e| BrowserError::Cdp(format!("Failed to subscribe to page events: {}", e)))?;

        Ok(Self {
            tab,
            monitor,
            listener: Mutex::new(Some(weak)),
        })
    }
}

#[async_trait]
impl CdpSession for ChromeCdpSession {
    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let tab = Arc::clone(&self.tab);
        let method = method.to_string();
        tokio::task::spawn_blocking(move || dispatch(&tab, &method, params))
            .await
            .map_err(|e| BrowserError::Cdp(format!("Blocking task failed: {}", e)))?
    }

    fn network(&self) -> Arc<NetworkMonitor> {
        Arc::clone(&self.monitor)
    }

    async fn detach(&self) -> Result<()> {
        let weak = self
            .listener
            .lock()
            .map_err(|e| BrowserError::Cdp(format!("Listener lock poisoned: {}", e)))?
            .take();
        if let Some(weak) = weak {
            self.tab.remove_event_listener(&weak).map_err(|e| {
                BrowserError::Cdp(format!("Failed to unsubscribe from page events: {}", e))
            })?;
        }
        Ok(())
    }
}
