use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

/// One job posting as read off a results page
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    /// Job title exactly as shown
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Hiring company
    #[serde(default)]
    pub company: Option<String>,
    /// Location or remote policy
    #[serde(default)]
    pub location: Option<String>,
    /// Salary or pay range as shown
    #[serde(default)]
    pub salary: Option<String>,
    /// Absolute URL of the posting
    #[serde(default)]
    pub url: Option<String>,
    /// When the job was posted, as shown (e.g. "2 days ago")
    #[serde(default)]
    pub posted_at: Option<String>,
    /// Short description or snippet
    #[serde(default)]
    pub description: Option<String>,
}

impl JobListing {
    fn dedup_key(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "{}|{}|{}",
                self.title.trim().to_lowercase(),
                self.company.as_deref().unwrap_or_default().trim().to_lowercase(),
                self.location.as_deref().unwrap_or_default().trim().to_lowercase()
            ),
        }
    }
}

/// Every listing found on a page
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct JobListings {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub jobs: Vec<JobListing>,
}

impl JobListings {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop untitled entries and duplicates, make URLs absolute against
    /// `page_url`, and clear URLs that still do not parse.
    pub fn normalize(mut self, page_url: Option<&str>) -> Self {
        let base = page_url.and_then(|u| Url::parse(u).ok());
        let mut seen = HashSet::new();

        self.jobs.retain_mut(|job| {
            job.title = job.title.trim().to_string();
            if job.title.is_empty() {
                return false;
            }
            job.url = job.url.take().and_then(|raw| absolute_url(raw.trim(), base.as_ref()));
            seen.insert(job.dedup_key())
        });
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Entries that do not parse as a listing are dropped, not fatal
fn skip_malformed<'de, D>(deserializer: D) -> Result<Vec<JobListing>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(listing) => Some(listing),
            Err(e) => {
                log::debug!("Skipping malformed listing: {}", e);
                None
            }
        })
        .collect())
}

fn absolute_url(raw: &str, base: Option<&Url>) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(raw).ok().map(|u| u.to_string()),
        Err(_) => None,
    }
}
