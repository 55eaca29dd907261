//! Login detection and session persistence

pub mod detector;
pub mod store;

pub use detector::{
    matches_auth_lexicon, AuthDetector, AuthState, AuthStatus, AUTH_KEYWORDS,
    AUTH_REQUIRED_ON_DETECTION_FAILURE,
};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};
