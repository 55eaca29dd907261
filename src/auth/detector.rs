//! Login-wall detection and waiting for the user to sign in.
//!
//! Detection asks the model for every authentication-looking element on
//! the page and matches their descriptions against a fixed lexicon. The
//! same check answers both "does this site want a login" and "has the
//! login finished".

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::auth::store::SessionStore;
use crate::automation::{FoundElement, PageAutomation};
use crate::error::Result;
use crate::llm::prompts::AUTH_DETECTION_INSTRUCTION;

/// Phrases that mark an element as part of a login flow (lowercase)
pub const AUTH_KEYWORDS: &[&str] = &[
    "login",
    "log in",
    "sign in",
    "sign-in",
    "signin",
    "sign up",
    "sign-up",
    "signup",
    "password field",
    "forgot password",
    "join now",
    "create account",
    "continue with google",
    "continue with apple",
    "continue with linkedin",
    "continue with email",
];

/// Outcome assumed when detection itself fails: login required
pub const AUTH_REQUIRED_ON_DETECTION_FAILURE: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStatus {
    Checking,
    Required,
    InProgress,
    Completed,
    Failed,
}

/// A state change pushed to the subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub status: AuthStatus,
    pub message: String,
    pub board_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Whether `text` contains any lexicon phrase, ignoring case
pub fn matches_auth_lexicon(text: &str) -> bool {
    let text = text.to_lowercase();
    AUTH_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

fn is_auth_element(element: &FoundElement) -> bool {
    matches_auth_lexicon(&element.description)
        || element.text.as_deref().is_some_and(matches_auth_lexicon)
}

pub struct AuthDetector {
    automation: Arc<PageAutomation>,
    store: Option<Arc<dyn SessionStore>>,
}

impl AuthDetector {
    pub fn new(automation: Arc<PageAutomation>) -> Self {
        Self {
            automation,
            store: None,
        }
    }

    /// Builder method: restore and save cookies through `store`
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Whether the current page shows a login flow.
    /// Fails closed: a failed check counts as "login required".
    pub async fn detect_auth_required(&self) -> bool {
        match self
            .automation
            .resolver()
            .try_find_elements(AUTH_DETECTION_INSTRUCTION)
            .await
        {
            Ok(elements) => {
                let matched: Vec<&str> = elements
                    .iter()
                    .filter(|element| is_auth_element(element))
                    .map(|element| element.description.as_str())
                    .collect();
                log::debug!(
                    "Auth check: {} candidate(s), {} matched {:?}",
                    elements.len(),
                    matched.len(),
                    matched
                );
                !matched.is_empty()
            }
            Err(e) => {
                log::warn!(
                    "Auth detection failed, assuming login required={}: {}",
                    AUTH_REQUIRED_ON_DETECTION_FAILURE,
                    e
                );
                AUTH_REQUIRED_ON_DETECTION_FAILURE
            }
        }
    }

    async fn restore_session(&self, board_url: &str) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if let Some(cookies) = store.load_session(board_url).await? {
            log::info!("Restoring {} saved cookies for {}", cookies.len(), board_url);
            self.automation.page().set_cookies(cookies).await?;
        }
        Ok(())
    }

    async fn persist_session(&self, board_url: &str) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let cookies = self.automation.page().cookies().await?;
        store.save_session(board_url, cookies).await
    }

    /// Open `board_url` and make sure the user is signed in, waiting for a
    /// manual login when needed. Returns whether the board is usable.
    pub async fn check_and_handle_auth<F>(
        &self,
        board_name: &str,
        board_url: &str,
        mut on_change: F,
    ) -> bool
    where
        F: FnMut(&AuthState) + Send,
    {
        let mut emit = |status: AuthStatus, message: String, details: Option<String>| {
            let state = AuthState {
                status,
                message,
                board_name: board_name.to_string(),
                details,
            };
            log::info!("[{}] {:?}: {}", state.board_name, state.status, state.message);
            on_change(&state);
        };

        emit(
            AuthStatus::Checking,
            format!("Checking whether {} needs a login", board_name),
            None,
        );

        if let Err(e) = self.restore_session(board_url).await {
            log::warn!("Could not restore session for {}: {}", board_url, e);
        }

        if let Err(e) = self.automation.goto(board_url).await {
            emit(
                AuthStatus::Failed,
                format!("Could not open {}", board_name),
                Some(e.to_string()),
            );
            return false;
        }

        if !self.detect_auth_required().await {
            emit(AuthStatus::Completed, format!("Already signed in to {}", board_name), None);
            return true;
        }

        emit(AuthStatus::Required, format!("{} requires you to sign in", board_name), None);
        emit(
            AuthStatus::InProgress,
            format!("Waiting for you to sign in to {} in the browser window", board_name),
            Some(board_url.to_string()),
        );

        let config = self.automation.config();
        let deadline = Instant::now() + config.auth_timeout;
        loop {
            tokio::time::sleep(config.auth_poll_interval).await;

            if !self.detect_auth_required().await {
                if let Err(e) = self.persist_session(board_url).await {
                    log::warn!("Could not save session for {}: {}", board_url, e);
                }
                emit(AuthStatus::Completed, format!("Signed in to {}", board_name), None);
                return true;
            }

            if Instant::now() >= deadline {
                emit(
                    AuthStatus::Failed,
                    format!("Timed out waiting for sign-in to {}", board_name),
                    Some(format!("waited {:?}", config.auth_timeout)),
                );
                return false;
            }
        }
    }
}
