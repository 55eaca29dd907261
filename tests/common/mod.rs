//! In-memory page, protocol session, and model used by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use job_scout::automation::PageAutomation;
use job_scout::browser::{AutomationConfig, CdpSession, Cookie, NetworkMonitor, PageDriver};
use job_scout::error::{BrowserError, Result};
use job_scout::llm::prompts::{ACT_SYSTEM_PROMPT, EXTRACT_SYSTEM_PROMPT, RESOLVER_SYSTEM_PROMPT};
use job_scout::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Usage};
use serde_json::{json, Value};

/// One element on a fake page: an accessibility node backed by a DOM node
#[derive(Debug, Clone)]
pub struct MockElement {
    pub role: &'static str,
    pub name: &'static str,
    /// DOM tag, or `#text` for a text node
    pub tag: &'static str,
    pub focusable: bool,
}

pub fn element(role: &'static str, name: &'static str, tag: &'static str) -> MockElement {
    MockElement {
        role,
        name,
        tag,
        focusable: matches!(role, "button" | "link" | "textbox" | "combobox" | "searchbox"),
    }
}

pub const FIRST_BACKEND_ID: i64 = 100;

/// What the fake browser reports over the protocol
#[derive(Debug, Clone)]
pub struct Scenario {
    pub document: Value,
    pub ax_tree: Value,
    pub infos: HashMap<i64, Value>,
    pub xpaths: HashMap<i64, String>,
}

impl Scenario {
    /// A page whose body holds `elements` in order
    pub fn new(elements: &[MockElement]) -> Self {
        let mut counters: HashMap<&str, usize> = HashMap::new();
        let mut dom_children = Vec::new();
        let mut ax_nodes = vec![json!({
            "nodeId": "ax-root",
            "ignored": false,
            "role": { "type": "role", "value": "RootWebArea" },
            "name": { "type": "computedString", "value": "Job board" },
            "childIds": (0..elements.len()).map(|i| format!("ax-{}", i)).collect::<Vec<_>>(),
            "backendDOMNodeId": 1
        })];
        let mut infos = HashMap::new();
        let mut xpaths = HashMap::new();

        for (i, el) in elements.iter().enumerate() {
            let backend_id = FIRST_BACKEND_ID + i as i64;
            let counter = counters.entry(el.tag).or_insert(0);
            *counter += 1;

            let (dom_node, xpath) = if el.tag == "#text" {
                (
                    json!({
                        "backendNodeId": backend_id,
                        "nodeType": 3,
                        "nodeName": "#text",
                        "nodeValue": el.name
                    }),
                    format!("/html[1]/body[1]/text()[{}]", counter),
                )
            } else {
                (
                    json!({
                        "backendNodeId": backend_id,
                        "nodeType": 1,
                        "nodeName": el.tag.to_uppercase()
                    }),
                    format!("/html[1]/body[1]/{}[{}]", el.tag, counter),
                )
            };
            dom_children.push(dom_node);
            xpaths.insert(backend_id, xpath.clone());

            let (tag, info_xpath) = if el.tag == "#text" {
                ("body", "/html[1]/body[1]".to_string())
            } else {
                (el.tag, xpath.clone())
            };
            infos.insert(
                backend_id,
                json!({
                    "tagName": tag,
                    "attributes": {},
                    "xpath": info_xpath,
                    "cssSelector": info_xpath,
                    "text": el.name,
                    "visible": true
                }),
            );

            let mut properties = Vec::new();
            if el.focusable {
                properties.push(json!({
                    "name": "focusable",
                    "value": { "type": "booleanOrUndefined", "value": true }
                }));
            }
            ax_nodes.push(json!({
                "nodeId": format!("ax-{}", i),
                "ignored": false,
                "role": { "type": "role", "value": el.role },
                "name": { "type": "computedString", "value": el.name },
                "properties": properties,
                "parentId": "ax-root",
                "childIds": [],
                "backendDOMNodeId": backend_id
            }));
        }

        let document = json!({
            "root": {
                "backendNodeId": 1,
                "nodeType": 9,
                "nodeName": "#document",
                "children": [{
                    "backendNodeId": 2,
                    "nodeType": 1,
                    "nodeName": "HTML",
                    "children": [{
                        "backendNodeId": 3,
                        "nodeType": 1,
                        "nodeName": "BODY",
                        "children": dom_children
                    }]
                }]
            }
        });

        Self {
            document,
            ax_tree: json!({ "nodes": ax_nodes }),
            infos,
            xpaths,
        }
    }

    /// `xpath=` selector of the element at `index`
    pub fn selector(&self, index: usize) -> String {
        format!("xpath={}", self.xpaths[&(FIRST_BACKEND_ID + index as i64)])
    }
}

/// Protocol traffic seen by every session of a [`MockPage`]
#[derive(Debug, Default)]
pub struct CdpLog {
    pub methods: Mutex<Vec<String>>,
    pub released: AtomicUsize,
    pub detached: AtomicUsize,
}

impl CdpLog {
    pub fn count(&self, method: &str) -> usize {
        self.methods.lock().unwrap().iter().filter(|m| *m == method).count()
    }
}

pub struct MockCdpSession {
    scenario: Arc<Mutex<Scenario>>,
    log: Arc<CdpLog>,
    monitor: Arc<NetworkMonitor>,
}

#[async_trait]
impl CdpSession for MockCdpSession {
    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.log.methods.lock().unwrap().push(method.to_string());
        let scenario = self.scenario.lock().unwrap().clone();

        match method {
            m if m.ends_with(".enable") => Ok(json!({})),
            "DOM.getDocument" => Ok(scenario.document),
            "Accessibility.getFullAXTree" => Ok(scenario.ax_tree),
            "DOM.resolveNode" => {
                let backend_id = params["backendNodeId"].as_i64().unwrap_or_default();
                if scenario.infos.contains_key(&backend_id) {
                    let object_id = format!("obj-{}", backend_id);
                    Ok(json!({ "object": { "type": "object", "objectId": object_id } }))
                } else {
                    Err(BrowserError::Cdp(format!("No node with given id found: {}", backend_id)))
                }
            }
            "Runtime.callFunctionOn" => {
                let backend_id: i64 = params["objectId"]
                    .as_str()
                    .and_then(|id| id.strip_prefix("obj-"))
                    .and_then(|id| id.parse().ok())
                    .unwrap_or_default();
                let value = scenario.infos.get(&backend_id).cloned().unwrap_or(Value::Null);
                Ok(json!({ "result": { "type": "object", "value": value } }))
            }
            "Runtime.releaseObject" => {
                self.log.released.fetch_add(1, Ordering::SeqCst);
                Ok(json!({}))
            }
            other => Err(BrowserError::Cdp(format!("Unsupported CDP method: {}", other))),
        }
    }

    fn network(&self) -> Arc<NetworkMonitor> {
        Arc::clone(&self.monitor)
    }

    async fn detach(&self) -> Result<()> {
        self.log.detached.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A page that records every input call in order
pub struct MockPage {
    pub scenario: Arc<Mutex<Scenario>>,
    pub cdp: Arc<CdpLog>,
    pub calls: Mutex<Vec<String>>,
    pub url: Mutex<String>,
    pub html: Mutex<String>,
    pub element_texts: Mutex<HashMap<String, String>>,
    pub cookies: Mutex<Vec<Cookie>>,
    pub sessions_opened: AtomicUsize,
    /// Shared by every session the page opens
    pub network: Arc<NetworkMonitor>,
}

impl MockPage {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario: Arc::new(Mutex::new(scenario)),
            cdp: Arc::new(CdpLog::default()),
            calls: Mutex::new(Vec::new()),
            url: Mutex::new("https://jobs.example.com/".to_string()),
            html: Mutex::new("<html><body><h1>Jobs</h1></body></html>".to_string()),
            element_texts: Mutex::new(HashMap::new()),
            cookies: Mutex::new(Vec::new()),
            sessions_opened: AtomicUsize::new(0),
            network: Arc::new(NetworkMonitor::new()),
        }
    }

    pub fn set_scenario(&self, scenario: Scenario) {
        *self.scenario.lock().unwrap() = scenario;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Input calls only, without the pauses between steps
    pub fn actions(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| !c.starts_with("wait ")).collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto {}", url));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for_load(&self) -> Result<()> {
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn title(&self) -> Result<String> {
        Ok("Job board".to_string())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.lock().unwrap().clone())
    }

    async fn text_content(&self) -> Result<String> {
        Ok("Jobs".to_string())
    }

    async fn element_text(&self, selector: &str) -> Result<String> {
        self.record(format!("element_text {}", selector));
        self.element_texts
            .lock()
            .unwrap()
            .get(selector)
            .cloned()
            .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))
    }

    async fn new_cdp_session(&self) -> Result<Box<dyn CdpSession>> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockCdpSession {
            scenario: Arc::clone(&self.scenario),
            log: Arc::clone(&self.cdp),
            monitor: Arc::clone(&self.network),
        }))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click {}", selector));
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("fill {} '{}'", selector, value));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.record(format!("type {} '{}'", selector, text));
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("select {} '{}'", selector, value));
        Ok(())
    }

    async fn press(&self, selector: &str, key: &str) -> Result<()> {
        self.record(format!("press {} {}", selector, key));
        Ok(())
    }

    async fn keyboard_press(&self, key: &str) -> Result<()> {
        self.record(format!("keyboard_press {}", key));
        Ok(())
    }

    async fn keyboard_type(&self, text: &str) -> Result<()> {
        self.record(format!("keyboard_type '{}'", text));
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn wait_for_timeout(&self, duration: Duration) {
        self.record(format!("wait {}ms", duration.as_millis()));
        tokio::time::sleep(duration).await;
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self.cookies.lock().unwrap().clone())
    }

    async fn set_cookies(&self, cookies: Vec<Cookie>) -> Result<()> {
        self.record(format!("set_cookies {}", cookies.len()));
        self.cookies.lock().unwrap().extend(cookies);
        Ok(())
    }
}

/// Which prompt a request was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Resolve,
    Act,
    Extract,
    Other,
}

pub fn prompt_kind(request: &CompletionRequest) -> PromptKind {
    match request.messages.first().map(|m| m.content.as_str()) {
        Some(RESOLVER_SYSTEM_PROMPT) => PromptKind::Resolve,
        Some(ACT_SYSTEM_PROMPT) => PromptKind::Act,
        Some(EXTRACT_SYSTEM_PROMPT) => PromptKind::Extract,
        _ => PromptKind::Other,
    }
}

pub fn user_prompt(request: &CompletionRequest) -> &str {
    request.messages.last().map(|m| m.content.as_str()).unwrap_or_default()
}

/// The description a resolver request asks about
pub fn resolver_instruction(request: &CompletionRequest) -> String {
    user_prompt(request)
        .strip_prefix("Find the elements matching this description: ")
        .and_then(|rest| rest.split("\n\n").next())
        .unwrap_or_default()
        .to_string()
}

/// The accessibility tree embedded in a resolver request
pub fn resolver_tree(request: &CompletionRequest) -> String {
    user_prompt(request)
        .split_once("Accessibility tree:\n")
        .map(|(_, tree)| tree.to_string())
        .unwrap_or_default()
}

/// Id of the first tree line with `role` whose text contains `text`
pub fn node_id_in_tree(tree: &str, role: &str, text: &str) -> Option<u32> {
    tree.lines().map(str::trim).find_map(|line| {
        let (id, rest) = line.strip_prefix('[')?.split_once("] ")?;
        let matches = rest.starts_with(&format!("{}:", role)) && rest.contains(text);
        matches.then(|| id.parse().ok()).flatten()
    })
}

type Responder = dyn Fn(&CompletionRequest) -> std::result::Result<Value, LlmError> + Send + Sync;

/// A model that answers through a closure or a fixed script
pub struct MockLlm {
    responder: Option<Box<Responder>>,
    script: Mutex<VecDeque<std::result::Result<Value, LlmError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlm {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> std::result::Result<Value, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers in order; an exhausted script returns `EmptyContent`
    pub fn scripted(responses: Vec<std::result::Result<Value, LlmError>>) -> Self {
        Self {
            responder: None,
            script: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let data = match &self.responder {
            Some(responder) => responder(&request)?,
            None => self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))?,
        };
        Ok(CompletionResponse {
            data,
            usage: Usage::default(),
        })
    }
}

/// Page, model, and automation wired together
pub fn automation(page: &Arc<MockPage>, llm: &Arc<MockLlm>) -> PageAutomation {
    let page: Arc<dyn PageDriver> = page.clone();
    let llm: Arc<dyn LlmClient> = llm.clone();
    PageAutomation::new(page, llm, AutomationConfig::default())
}

/// The job board search page used across tests
pub fn search_page() -> Scenario {
    Scenario::new(&[
        element("heading", "Find your next job", "h1"),
        element("combobox", "Search by title, skill, or company", "input"),
        element("StaticText", "Search by title, skill, or company", "#text"),
        element("button", "Search", "button"),
    ])
}
