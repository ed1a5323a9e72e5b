//! Blocking adapters from the async GitHub client to the core traits.

use recap_core::{EventPage, EventSource, PullRequest, PullRequestLookup};
use recap_github::{Client, GitHubError};
use tokio::runtime::Runtime;

/// A user's event feed, one page per call.
pub struct EventFeed<'a> {
    pub runtime: &'a Runtime,
    pub client: &'a Client,
    pub user: &'a str,
    pub per_page: u32,
}

impl EventSource for EventFeed<'_> {
    type Error = GitHubError;

    fn fetch_page(&self, page: u32) -> Result<EventPage, GitHubError> {
        self.runtime
            .block_on(self.client.user_events(self.user, page, self.per_page))
    }
}

/// Pull request lookups against the REST API.
pub struct PullRequests<'a> {
    pub runtime: &'a Runtime,
    pub client: &'a Client,
}

impl PullRequestLookup for PullRequests<'_> {
    type Error = GitHubError;

    fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest, GitHubError> {
        self.runtime.block_on(self.client.pull_request(repo, number))
    }
}
