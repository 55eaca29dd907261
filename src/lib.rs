//! # job-scout
//!
//! Job-board search driven by an LLM that reads the page's accessibility
//! tree instead of relying on hand-written CSS selectors.
//!
//! ## How it works
//!
//! 1. [`dom::SnapshotBuilder`] captures the accessibility tree and DOM of a
//!    page over the DevTools protocol and maps every node to an XPath.
//! 2. [`dom::filter_and_format`] prunes the tree and renders it as compact
//!    text with per-snapshot node ids.
//! 3. [`automation::ElementResolver`] asks the model which ids match a
//!    description and maps them back to selectors.
//! 4. [`automation::ActionExecutor`] turns an instruction into click/type/
//!    select/press/clear steps and runs them in order.
//! 5. [`automation::DataExtractor`] asks the model for schema-shaped data.
//! 6. [`auth::AuthDetector`] decides whether a board wants a login and waits
//!    for the user to finish it.
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use job_scout::automation::PageAutomation;
//! use job_scout::browser::{AutomationConfig, BrowserSession, LaunchOptions, PageDriver};
//! use job_scout::jobs::JobListings;
//! use job_scout::llm::{LlmClient, OpenAiClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let browser = BrowserSession::launch(LaunchOptions::default())?;
//! let page: Arc<dyn PageDriver> = Arc::new(browser.new_page()?);
//! let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_env()?);
//! let automation = PageAutomation::new(page, llm, AutomationConfig::default());
//!
//! automation.goto("https://www.indeed.com/").await?;
//! if automation.act("type 'rust developer' into the job search box and press Enter").await {
//!     let jobs: Option<JobListings> = automation.extract("every job listing", None).await;
//!     println!("{:?}", jobs);
//! }
//! automation.cleanup().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: Chrome launch, the page and protocol-session seams, settle detection
//! - [`dom`]: accessibility snapshots, XPath and selector maps, tree filtering
//! - [`llm`]: chat-completion client, prompts, validating JSON parsing
//! - [`automation`]: element resolution, action execution, data extraction
//! - [`auth`]: login detection and session persistence
//! - [`jobs`]: built-in job boards and the search flow
//! - [`error`]: error types and result aliases

pub mod auth;
pub mod automation;
pub mod browser;
pub mod dom;
pub mod error;
pub mod jobs;
pub mod llm;
pub mod utils;

pub use automation::{FoundElement, PageAutomation};
pub use browser::{AutomationConfig, BrowserSession, ConnectionOptions, LaunchOptions, PageDriver};
pub use error::{BrowserError, Result};
pub use llm::{LlmClient, LlmError};
