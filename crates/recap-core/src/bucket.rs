//! Per-repository accumulation of issues and pull requests.

use std::collections::HashMap;
use std::fmt;

use crate::event::{Issue, PullRequest};

/// The six categories the digest reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    OpenedIssues,
    ClosedIssues,
    CommentedIssues,
    OpenedPullRequests,
    ClosedPullRequests,
    ReviewedPullRequests,
}

impl BucketKind {
    /// All kinds, in report order.
    pub const ALL: [Self; 6] = [
        Self::OpenedIssues,
        Self::ClosedIssues,
        Self::CommentedIssues,
        Self::OpenedPullRequests,
        Self::ClosedPullRequests,
        Self::ReviewedPullRequests,
    ];

    /// Section heading used in the digest.
    pub const fn heading(self) -> &'static str {
        match self {
            Self::OpenedIssues => "Opened issues",
            Self::ClosedIssues => "Closed issues",
            Self::CommentedIssues => "Commented issues",
            Self::OpenedPullRequests => "Pull requests opened",
            Self::ClosedPullRequests => "Pull requests closed",
            Self::ReviewedPullRequests => "Code reviews",
        }
    }

    /// Identifier used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenedIssues => "opened_issues",
            Self::ClosedIssues => "closed_issues",
            Self::CommentedIssues => "commented_issues",
            Self::OpenedPullRequests => "opened_pull_requests",
            Self::ClosedPullRequests => "closed_pull_requests",
            Self::ReviewedPullRequests => "reviewed_pull_requests",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Something stored in a bucket, keyed by its number.
pub trait Item {
    fn number(&self) -> u64;
}

impl Item for Issue {
    fn number(&self) -> u64 {
        self.number
    }
}

impl Item for PullRequest {
    fn number(&self) -> u64 {
        self.number
    }
}

/// Items grouped by repository name, then by number.
///
/// Each `(repo, number)` holds at most one item; inserting again replaces it.
#[derive(Debug, Clone)]
pub struct Bucket<T> {
    repos: HashMap<String, HashMap<u64, T>>,
}

impl<T> Default for Bucket<T> {
    fn default() -> Self {
        Self {
            repos: HashMap::new(),
        }
    }
}

impl<T: Item> Bucket<T> {
    /// Stores `item` under `repo`, returning the item it replaced.
    pub fn insert(&mut self, repo: &str, item: T) -> Option<T> {
        self.repos
            .entry(repo.to_string())
            .or_default()
            .insert(item.number(), item)
    }

    pub fn get(&self, repo: &str, number: u64) -> Option<&T> {
        self.repos.get(repo).and_then(|items| items.get(&number))
    }

    /// Returns true if no repository has any item.
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Total number of items across repositories.
    pub fn len(&self) -> usize {
        self.repos.values().map(HashMap::len).sum()
    }

    /// Repository names, sorted.
    pub fn repos(&self) -> Vec<&str> {
        let mut repos: Vec<&str> = self.repos.keys().map(String::as_str).collect();
        repos.sort_unstable();
        repos
    }

    /// Items for `repo`, sorted by number.
    pub fn items(&self, repo: &str) -> Vec<&T> {
        let mut items: Vec<&T> = self
            .repos
            .get(repo)
            .map(|items| items.values().collect())
            .unwrap_or_default();
        items.sort_unstable_by_key(|item| item.number());
        items
    }
}

/// All six buckets for one run.
#[derive(Debug, Clone, Default)]
pub struct BucketSet {
    pub opened_issues: Bucket<Issue>,
    pub closed_issues: Bucket<Issue>,
    pub commented_issues: Bucket<Issue>,
    pub opened_pull_requests: Bucket<PullRequest>,
    pub closed_pull_requests: Bucket<PullRequest>,
    pub reviewed_pull_requests: Bucket<PullRequest>,
}

impl BucketSet {
    pub fn is_empty(&self) -> bool {
        self.opened_issues.is_empty()
            && self.closed_issues.is_empty()
            && self.commented_issues.is_empty()
            && self.opened_pull_requests.is_empty()
            && self.closed_pull_requests.is_empty()
            && self.reviewed_pull_requests.is_empty()
    }

    /// Number of items in the bucket of the given kind.
    pub fn count(&self, kind: BucketKind) -> usize {
        match kind {
            BucketKind::OpenedIssues => self.opened_issues.len(),
            BucketKind::ClosedIssues => self.closed_issues.len(),
            BucketKind::CommentedIssues => self.commented_issues.len(),
            BucketKind::OpenedPullRequests => self.opened_pull_requests.len(),
            BucketKind::ClosedPullRequests => self.closed_pull_requests.len(),
            BucketKind::ReviewedPullRequests => self.reviewed_pull_requests.len(),
        }
    }
}
