//! Browser launch, page driving, and protocol sessions

pub mod chrome;
pub mod config;
pub mod network;
pub mod page;
pub mod session;

pub use chrome::{ChromeCdpSession, ChromePage};
pub use config::{AutomationConfig, ConnectionOptions, LaunchOptions};
pub use network::NetworkMonitor;
pub use page::{CdpSession, Cookie, PageDriver, Selector, XPATH_PREFIX, xpath_selector};
pub use session::BrowserSession;
