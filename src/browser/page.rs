//! Page-level seams the automation engine drives.
//!
//! [`PageDriver`] is the live page (navigation, input, cookies) and
//! [`CdpSession`] is a raw DevTools protocol channel bound to that page.
//! Both are object safe so the engine can run against Chrome or an
//! in-memory fake.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser::network::NetworkMonitor;
use crate::error::Result;

/// Prefix marking a selector as an XPath expression rather than CSS
pub const XPATH_PREFIX: &str = "xpath=";

/// A selector as understood by [`PageDriver`] methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    Css(&'a str),
    XPath(&'a str),
}

impl<'a> Selector<'a> {
    /// Split a selector string into its kind; `xpath=` prefixed strings are XPath
    pub fn parse(selector: &'a str) -> Self {
        match selector.strip_prefix(XPATH_PREFIX) {
            Some(xpath) => Selector::XPath(xpath),
            None => Selector::Css(selector),
        }
    }
}

/// Format an XPath in the engine's selector syntax
pub fn xpath_selector(xpath: &str) -> String {
    format!("{}{}", XPATH_PREFIX, xpath)
}

/// Browser cookie, in the shape the DevTools protocol reports it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Expiry as seconds since the epoch; session cookies carry `None` or -1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl Cookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_cookie_path(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }
}

/// Raw DevTools protocol channel owned by a single page
#[async_trait]
pub trait CdpSession: Send + Sync {
    /// Send a protocol command and return its JSON result object
    async fn send(&self, method: &str, params: Value) -> Result<Value>;

    /// Network activity observed on this session
    fn network(&self) -> Arc<NetworkMonitor>;

    /// Stop listening for events and release the session
    async fn detach(&self) -> Result<()>;
}

/// A live browser page
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    /// Wait for the current navigation to finish loading
    async fn wait_for_load(&self) -> Result<()>;

    async fn url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Full page HTML
    async fn content(&self) -> Result<String>;

    /// Visible text of the document body
    async fn text_content(&self) -> Result<String>;

    /// Visible text of a single element
    async fn element_text(&self, selector: &str) -> Result<String>;

    /// Open a new protocol session bound to this page
    async fn new_cdp_session(&self) -> Result<Box<dyn CdpSession>>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Replace an input's value in one step (no key events)
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Focus the element and type character by character
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    /// Focus the element and press a key (e.g. `Enter`)
    async fn press(&self, selector: &str, key: &str) -> Result<()>;

    /// Press a key at whatever currently has focus
    async fn keyboard_press(&self, key: &str) -> Result<()>;

    /// Type at whatever currently has focus
    async fn keyboard_type(&self, text: &str) -> Result<()>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn cookies(&self) -> Result<Vec<Cookie>>;

    async fn set_cookies(&self, cookies: Vec<Cookie>) -> Result<()>;
}
