//! Built-in job boards and the per-board search flow

use std::sync::Arc;

use url::form_urlencoded::byte_serialize;

use crate::auth::{AuthDetector, AuthState, SessionStore};
use crate::automation::PageAutomation;
use crate::error::{BrowserError, Result};
use crate::jobs::listing::JobListings;

const EXTRACT_INSTRUCTION: &str = "Extract every job listing in the search results: job title, \
company, location, salary, job posting URL, when it was posted, and a short description";

/// A job board the search flow knows how to drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBoard {
    /// Registry key, lowercase
    pub name: &'static str,
    pub display_name: &'static str,
    /// Landing page used for the login check
    pub url: &'static str,
    /// Results URL template with `{keywords}` and `{location}` placeholders
    pub search_url: Option<&'static str>,
}

pub const BOARDS: &[JobBoard] = &[
    JobBoard {
        name: "linkedin",
        display_name: "LinkedIn",
        url: "https://www.linkedin.com/jobs/",
        search_url: Some(concat!(
            "https://www.linkedin.com/jobs/search/",
            "?keywords={keywords}&location={location}"
        )),
    },
    JobBoard {
        name: "indeed",
        display_name: "Indeed",
        url: "https://www.indeed.com/",
        search_url: Some("https://www.indeed.com/jobs?q={keywords}&l={location}"),
    },
    JobBoard {
        name: "wellfound",
        display_name: "Wellfound",
        url: "https://wellfound.com/jobs",
        search_url: None,
    },
    JobBoard {
        name: "glassdoor",
        display_name: "Glassdoor",
        url: "https://www.glassdoor.com/Job/index.htm",
        search_url: Some(concat!(
            "https://www.glassdoor.com/Job/jobs.htm",
            "?sc.keyword={keywords}&locKeyword={location}"
        )),
    },
];

impl JobBoard {
    /// Look up a built-in board, ignoring case
    pub fn find(name: &str) -> Option<&'static JobBoard> {
        let name = name.trim();
        BOARDS.iter().find(|board| board.name.eq_ignore_ascii_case(name))
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        BOARDS.iter().map(|board| board.name)
    }

    /// Direct results URL for `query`, when the board has one
    pub fn search_url_for(&self, query: &SearchQuery) -> Option<String> {
        let encode = |value: &str| byte_serialize(value.trim().as_bytes()).collect::<String>();
        self.search_url.map(|template| {
            template
                .replace("{keywords}", &encode(&query.keywords))
                .replace("{location}", &encode(query.location.as_deref().unwrap_or_default()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: Option<String>,
}

impl SearchQuery {
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: None,
        }
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into()).filter(|l: &String| !l.trim().is_empty());
        self
    }
}

/// Runs one search on one board: login check, search form, extraction
pub struct JobSearch {
    automation: Arc<PageAutomation>,
    auth: AuthDetector,
}

impl JobSearch {
    pub fn new(automation: Arc<PageAutomation>) -> Self {
        Self {
            auth: AuthDetector::new(Arc::clone(&automation)),
            automation,
        }
    }

    /// Builder method: restore and save logins through `store`
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.auth = self.auth.with_session_store(store);
        self
    }

    pub fn automation(&self) -> &Arc<PageAutomation> {
        &self.automation
    }

    pub async fn run<F>(
        &self,
        board: &JobBoard,
        query: &SearchQuery,
        on_auth: F,
    ) -> Result<JobListings>
    where
        F: FnMut(&AuthState) + Send,
    {
        if !self
            .auth
            .check_and_handle_auth(board.display_name, board.url, on_auth)
            .await
        {
            return Err(BrowserError::ActionFailed {
                action: "authenticate".to_string(),
                reason: format!("not signed in to {}", board.display_name),
            });
        }

        self.submit_search(board, query).await?;

        let page_url = self.automation.page().url().await.ok();
        let listings = self
            .automation
            .extract::<JobListings>(EXTRACT_INSTRUCTION, None)
            .await
            .unwrap_or_default()
            .normalize(page_url.as_deref());

        log::info!(
            "Found {} listing(s) on {} for '{}'",
            listings.len(),
            board.display_name,
            query.keywords
        );
        Ok(listings)
    }

    async fn submit_search(&self, board: &JobBoard, query: &SearchQuery) -> Result<()> {
        let keywords = query.keywords.trim();
        let automation = &self.automation;

        let typed = automation
            .act(&format!("type '{}' into the job search box and press Enter", keywords))
            .await
            || self.search_step_by_step(keywords).await;

        if typed {
            if let Some(location) = &query.location {
                let instruction = format!(
                    "type '{}' into the location field and press Enter",
                    location.trim()
                );
                let location_set = automation.act(&instruction).await;
                if !location_set {
                    log::warn!("Could not set location '{}' on {}", location, board.display_name);
                }
            }
            return Ok(());
        }

        match board.search_url_for(query) {
            Some(url) => {
                log::info!("Search form not usable on {}; opening {}", board.display_name, url);
                automation.goto(&url).await
            }
            None => Err(BrowserError::ActionFailed {
                action: "search".to_string(),
                reason: format!("could not submit a search on {}", board.display_name),
            }),
        }
    }

    /// Simpler instructions for when the combined one fails
    async fn search_step_by_step(&self, keywords: &str) -> bool {
        log::debug!("Retrying search for '{}' step by step", keywords);
        let automation = &self.automation;
        automation.act("click the job search box").await
            && automation.act(&format!("type '{}'", keywords)).await
            && automation.act("press Enter").await
    }
}
