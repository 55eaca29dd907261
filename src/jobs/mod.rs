//! Job boards, listings, and the search flow built on the automation layer

pub mod listing;
pub mod strategy;

pub use listing::{JobListing, JobListings};
pub use strategy::{JobBoard, JobSearch, SearchQuery, BOARDS};
