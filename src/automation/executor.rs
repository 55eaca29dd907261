//! Instruction → action plan → page input

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::automation::resolver::{ElementResolver, FoundElement};
use crate::error::{BrowserError, Result};
use crate::llm::prompts::{act_user_prompt, ACT_SYSTEM_PROMPT};
use crate::llm::{parse_shape, ChatMessage, CompletionRequest};

/// One atomic step of an [`ActionPlan`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SingleAction {
    Click {
        #[serde(default)]
        target: Option<String>,
    },
    /// Clear the field, then type key by key. Without a target, types at
    /// the focused element.
    Type {
        #[serde(default)]
        target: Option<String>,
        value: String,
    },
    Select {
        #[serde(default)]
        target: Option<String>,
        value: String,
    },
    /// Without a target, a global key press. Models name the key in
    /// either `key` or `value`, sometimes both; `key` wins.
    Press {
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        value: Option<String>,
    },
    Clear {
        #[serde(default)]
        target: Option<String>,
    },
}

impl SingleAction {
    pub fn kind(&self) -> &'static str {
        match self {
            SingleAction::Click { .. } => "click",
            SingleAction::Type { .. } => "type",
            SingleAction::Select { .. } => "select",
            SingleAction::Press { .. } => "press",
            SingleAction::Clear { .. } => "clear",
        }
    }

    pub fn target(&self) -> Option<&str> {
        let target = match self {
            SingleAction::Click { target }
            | SingleAction::Type { target, .. }
            | SingleAction::Select { target, .. }
            | SingleAction::Press { target, .. }
            | SingleAction::Clear { target } => target,
        };
        target.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Key to press, for a press step
    pub fn key(&self) -> Option<&str> {
        let SingleAction::Press { key, value, .. } = self else {
            return None;
        };
        [key, value]
            .into_iter()
            .filter_map(|k| k.as_deref().map(str::trim))
            .find(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    #[serde(default)]
    pub actions: Vec<SingleAction>,
}

/// Highest confidence wins; ties keep the model's order
pub fn best_candidate(mut candidates: Vec<FoundElement>) -> Option<FoundElement> {
    candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));
    candidates.into_iter().next()
}

/// Carries out natural-language instructions on the page.
///
/// Steps run strictly in plan order with a fixed pause after each one.
/// Execution is not atomic: a failing step leaves earlier steps applied.
pub struct ActionExecutor {
    resolver: Arc<ElementResolver>,
}

impl ActionExecutor {
    pub fn new(resolver: Arc<ElementResolver>) -> Self {
        Self { resolver }
    }

    /// Run `instruction` and report whether every step succeeded
    pub async fn act(&self, instruction: &str) -> bool {
        match self.try_act(instruction).await {
            Ok(steps) => {
                log::info!("Completed '{}' in {} step(s)", instruction, steps);
                true
            }
            Err(e) => {
                log::warn!("Instruction '{}' failed: {}", instruction, e);
                false
            }
        }
    }

    /// Run `instruction`, returning the number of steps executed
    pub async fn try_act(&self, instruction: &str) -> Result<usize> {
        let plan = self.plan(instruction).await?;
        if plan.actions.is_empty() {
            return Err(BrowserError::ActionFailed {
                action: "plan".to_string(),
                reason: format!("no actions planned for '{}'", instruction),
            });
        }

        let delay = self.resolver.config().action_delay;
        for (index, action) in plan.actions.iter().enumerate() {
            log::debug!("Step {}/{}: {:?}", index + 1, plan.actions.len(), action);
            self.execute(action).await?;
            self.resolver.page().wait_for_timeout(delay).await;
        }
        Ok(plan.actions.len())
    }

    /// Ask the model to break `instruction` into atomic actions
    pub async fn plan(&self, instruction: &str) -> Result<ActionPlan> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(ACT_SYSTEM_PROMPT),
            ChatMessage::user(act_user_prompt(instruction)),
        ])
        .temperature(self.resolver.config().temperature)
        .json();

        let response = self.resolver.llm().create_completion(request).await?;
        Ok(parse_shape(&response.data)?)
    }

    async fn resolve_target(&self, action: &SingleAction, target: &str) -> Result<String> {
        let candidates = self.resolver.find_elements(target).await;
        let best = best_candidate(candidates).ok_or_else(|| BrowserError::ActionFailed {
            action: action.kind().to_string(),
            reason: format!("no element matches '{}'", target),
        })?;
        log::debug!(
            "'{}' resolved to {} (confidence {:.2})",
            target,
            best.selector,
            best.confidence
        );
        Ok(best.selector)
    }

    /// Perform one action against the page
    pub async fn execute(&self, action: &SingleAction) -> Result<()> {
        if matches!(action, SingleAction::Press { .. }) && action.key().is_none() {
            return Err(BrowserError::ActionFailed {
                action: action.kind().to_string(),
                reason: "a key is required".to_string(),
            });
        }
        let selector = match action.target() {
            Some(target) => Some(self.resolve_target(action, target).await?),
            None => None,
        };
        let page = self.resolver.page();

        match (action, selector.as_deref()) {
            (SingleAction::Click { .. }, Some(selector)) => page.click(selector).await,
            (SingleAction::Type { value, .. }, Some(selector)) => {
                page.fill(selector, "").await?;
                page.type_text(selector, value).await
            }
            (SingleAction::Type { value, .. }, None) => page.keyboard_type(value).await,
            (SingleAction::Select { value, .. }, Some(selector)) => {
                page.select_option(selector, value).await
            }
            (SingleAction::Press { .. }, target) => {
                let key = action.key().unwrap_or_default();
                match target {
                    Some(selector) => page.press(selector, key).await,
                    None => page.keyboard_press(key).await,
                }
            }
            (SingleAction::Clear { .. }, Some(selector)) => page.fill(selector, "").await,
            (other, None) => Err(BrowserError::ActionFailed {
                action: other.kind().to_string(),
                reason: "a target element is required".to_string(),
            }),
        }
    }
}
