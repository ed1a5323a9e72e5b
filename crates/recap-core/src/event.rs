//! Activity events as returned by the user event feed.
//!
//! Events keep their payload as raw JSON; [`Event::payload`] decodes it into
//! a typed [`Payload`] according to the event's `type` tag.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const ISSUE_COMMENT_EVENT: &str = "IssueCommentEvent";
pub const ISSUES_EVENT: &str = "IssuesEvent";
pub const PULL_REQUEST_EVENT: &str = "PullRequestEvent";
pub const PULL_REQUEST_REVIEW_COMMENT_EVENT: &str = "PullRequestReviewCommentEvent";

/// Errors decoding an event payload.
#[derive(Debug, Error)]
pub enum EventError {
    /// A recognised payload lacks a required field.
    #[error("{kind} payload is missing `{field}`")]
    MissingField { kind: String, field: &'static str },

    /// The payload JSON does not match the expected shape.
    #[error("failed to decode {kind} payload")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single recorded user activity.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawEvent")]
pub struct Event {
    pub created_at: DateTime<Utc>,
    /// Full repository name, `owner/name`.
    pub repo_name: String,
    /// The feed's `type` tag, e.g. `IssuesEvent`.
    pub kind: String,
    pub payload: Value,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    repo: RawRepo,
    created_at: DateTime<Utc>,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
struct RawRepo {
    name: String,
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        Self {
            created_at: raw.created_at,
            repo_name: raw.repo.name,
            kind: raw.kind,
            payload: raw.payload,
        }
    }
}

/// An issue, or a pull request seen through the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawIssue")]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author_login: String,
    pub is_pull_request: bool,
}

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        Self {
            number: raw.number,
            title: raw.title,
            url: raw.html_url,
            author_login: raw.user.map(|user| user.login).unwrap_or_default(),
            is_pull_request: raw.pull_request.is_some_and(|links| !links.is_null()),
        }
    }
}

/// A pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(rename = "html_url")]
    pub url: String,
    /// `None` while the merge status is unknown, e.g. the PR is still open.
    #[serde(default)]
    pub merged: Option<bool>,
}

/// Decoded event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    IssueComment { action: String, issue: Issue },
    Issues { action: String, issue: Issue },
    PullRequest { action: String, pull_request: PullRequest },
    PullRequestReviewComment { action: String, pull_request: PullRequest },
    /// Any event type the digest does not report on.
    Other,
}

#[derive(Deserialize)]
struct IssuePayload {
    action: Option<String>,
    issue: Option<Issue>,
}

#[derive(Deserialize)]
struct PullRequestPayload {
    action: Option<String>,
    pull_request: Option<PullRequest>,
}

impl Event {
    pub fn new(
        kind: impl Into<String>,
        repo_name: impl Into<String>,
        created_at: DateTime<Utc>,
        payload: Value,
    ) -> Self {
        Self {
            created_at,
            repo_name: repo_name.into(),
            kind: kind.into(),
            payload,
        }
    }

    /// Decodes the payload for the event kinds the digest reports on.
    pub fn payload(&self) -> Result<Payload, EventError> {
        match self.kind.as_str() {
            ISSUE_COMMENT_EVENT => {
                let (action, issue) = self.issue_payload()?;
                Ok(Payload::IssueComment { action, issue })
            }
            ISSUES_EVENT => {
                let (action, issue) = self.issue_payload()?;
                Ok(Payload::Issues { action, issue })
            }
            PULL_REQUEST_EVENT => {
                let (action, pull_request) = self.pull_request_payload()?;
                Ok(Payload::PullRequest {
                    action,
                    pull_request,
                })
            }
            PULL_REQUEST_REVIEW_COMMENT_EVENT => {
                let (action, pull_request) = self.pull_request_payload()?;
                Ok(Payload::PullRequestReviewComment {
                    action,
                    pull_request,
                })
            }
            _ => Ok(Payload::Other),
        }
    }

    fn issue_payload(&self) -> Result<(String, Issue), EventError> {
        let raw: IssuePayload = self.decode()?;
        let issue = raw.issue.ok_or_else(|| self.missing("issue"))?;
        let action = raw.action.ok_or_else(|| self.missing("action"))?;
        Ok((action, issue))
    }

    fn pull_request_payload(&self) -> Result<(String, PullRequest), EventError> {
        let raw: PullRequestPayload = self.decode()?;
        let pull_request = raw
            .pull_request
            .ok_or_else(|| self.missing("pull_request"))?;
        let action = raw.action.ok_or_else(|| self.missing("action"))?;
        Ok((action, pull_request))
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, EventError> {
        T::deserialize(&self.payload).map_err(|source| EventError::Decode {
            kind: self.kind.clone(),
            source,
        })
    }

    fn missing(&self, field: &'static str) -> EventError {
        EventError::MissingField {
            kind: self.kind.clone(),
            field,
        }
    }
}
