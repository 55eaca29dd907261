use std::path::PathBuf;
use std::time::Duration;

/// Options for launching a new Chrome/Chromium instance
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,

    /// Browser window width in pixels
    pub window_width: u32,

    /// Browser window height in pixels
    pub window_height: u32,

    /// Path to the Chrome binary (auto-detected when `None`)
    pub chrome_path: Option<PathBuf>,

    /// Profile directory, reused across runs when set
    pub user_data_dir: Option<PathBuf>,

    /// Enable the Chrome sandbox
    pub sandbox: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 900,
            chrome_path: None,
            user_data_dir: None,
            sandbox: true,
        }
    }
}

impl LaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }
}

/// Options for attaching to an already running browser
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// DevTools WebSocket URL, e.g. `ws://127.0.0.1:9222/devtools/browser/<id>`
    pub ws_url: String,

    /// Connection timeout in milliseconds
    pub timeout: u64,
}

impl ConnectionOptions {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            timeout: 30_000,
        }
    }

    pub fn timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = timeout_ms;
        self
    }
}

/// Timing and budget knobs for the automation engine.
///
/// Defaults are the values the engine is tuned for; tests shorten the
/// waits instead of sleeping through them.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationConfig {
    /// Upper bound on the network settle wait before a snapshot
    pub settle_timeout: Duration,

    /// How long the page must have no request in flight
    pub quiet_window: Duration,

    /// Pause after every executed action
    pub action_delay: Duration,

    /// Character budget for extraction context
    pub extract_char_budget: usize,

    /// Sampling temperature for element lookup and planning
    pub temperature: f32,

    /// Confidence assigned when the model omits one
    pub default_confidence: f64,

    /// Interval between auth-completion polls
    pub auth_poll_interval: Duration,

    /// Give up waiting for a manual login after this long
    pub auth_timeout: Duration,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            settle_timeout: Duration::from_millis(3_000),
            quiet_window: Duration::from_millis(500),
            action_delay: Duration::from_millis(500),
            extract_char_budget: 15_000,
            temperature: 0.1,
            default_confidence: 0.7,
            auth_poll_interval: Duration::from_secs(3),
            auth_timeout: Duration::from_secs(5 * 60),
        }
    }
}
