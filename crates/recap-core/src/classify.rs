//! Event classification into report buckets.
//!
//! The classifier consumes events in feed order and records each qualifying
//! issue or pull request in one of six buckets. A later event for the same
//! `(repo, number)` replaces the earlier item in that bucket.

use std::error::Error as StdError;

use thiserror::Error;

use crate::bucket::{Bucket, BucketKind, BucketSet, Item};
use crate::cancel::CancelFlag;
use crate::event::{Event, EventError, Issue, Payload, PullRequest};
use crate::window::TimeWindow;

/// Fetches the full pull request behind an issue comment.
pub trait PullRequestLookup {
    type Error: StdError + Send + Sync + 'static;

    /// Looks up pull request `number` in `repo` (`owner/name`).
    fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest, Self::Error>;
}

/// Classification errors. All of them abort the run.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// An event payload lacked a required reference.
    #[error("malformed event in {repo}")]
    MalformedEvent {
        repo: String,
        #[source]
        source: EventError,
    },

    /// The pull request lookup failed.
    #[error("failed to look up pull request {repo}#{number}")]
    Lookup {
        repo: String,
        number: u64,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Cancellation was requested before a lookup could start.
    #[error("interrupted")]
    Cancelled,
}

/// Sorts events into a [`BucketSet`] for one user and window.
pub struct Classifier<'a, L> {
    window: TimeWindow,
    username: &'a str,
    lookup: &'a L,
    cancel: CancelFlag,
    buckets: BucketSet,
}

impl<'a, L: PullRequestLookup> Classifier<'a, L> {
    pub fn new(window: TimeWindow, username: &'a str, lookup: &'a L, cancel: CancelFlag) -> Self {
        Self {
            window,
            username,
            lookup,
            cancel,
            buckets: BucketSet::default(),
        }
    }

    /// Classifies every event in order, stopping at the first error.
    pub fn classify_all<'e>(
        &mut self,
        events: impl IntoIterator<Item = &'e Event>,
    ) -> Result<(), ClassifyError> {
        for event in events {
            self.classify(event)?;
        }
        Ok(())
    }

    /// Classifies a single event.
    pub fn classify(&mut self, event: &Event) -> Result<(), ClassifyError> {
        if !self.window.contains(event.created_at) {
            tracing::trace!(
                kind = %event.kind,
                created_at = %event.created_at,
                "event outside window"
            );
            return Ok(());
        }

        let repo = event.repo_name.as_str();
        let payload = event
            .payload()
            .map_err(|source| ClassifyError::MalformedEvent {
                repo: repo.to_string(),
                source,
            })?;

        match payload {
            Payload::IssueComment { action, issue } if action == "created" => {
                self.issue_comment(repo, issue)?;
            }
            Payload::Issues { action, issue } => match action.as_str() {
                "opened" => record(
                    &mut self.buckets.opened_issues,
                    BucketKind::OpenedIssues,
                    repo,
                    issue,
                ),
                "closed" => record(
                    &mut self.buckets.closed_issues,
                    BucketKind::ClosedIssues,
                    repo,
                    issue,
                ),
                _ => {}
            },
            Payload::PullRequest {
                action,
                pull_request,
            } => match action.as_str() {
                "created" | "opened" | "reopened" => record(
                    &mut self.buckets.opened_pull_requests,
                    BucketKind::OpenedPullRequests,
                    repo,
                    pull_request,
                ),
                "closed" => record(
                    &mut self.buckets.closed_pull_requests,
                    BucketKind::ClosedPullRequests,
                    repo,
                    pull_request,
                ),
                _ => {}
            },
            Payload::PullRequestReviewComment {
                action,
                pull_request,
            } if action == "created" => record(
                &mut self.buckets.reviewed_pull_requests,
                BucketKind::ReviewedPullRequests,
                repo,
                pull_request,
            ),
            _ => {}
        }
        Ok(())
    }

    /// Consumes the classifier, returning the accumulated buckets.
    pub fn finish(self) -> BucketSet {
        self.buckets
    }

    /// A comment on someone else's pull request counts as a review; a
    /// comment on the user's own pull request is not recorded at all.
    fn issue_comment(&mut self, repo: &str, issue: Issue) -> Result<(), ClassifyError> {
        if !issue.is_pull_request {
            record(
                &mut self.buckets.commented_issues,
                BucketKind::CommentedIssues,
                repo,
                issue,
            );
            return Ok(());
        }
        if issue.author_login == self.username {
            tracing::trace!(repo, number = issue.number, "comment on own pull request");
            return Ok(());
        }

        if self.cancel.is_cancelled() {
            return Err(ClassifyError::Cancelled);
        }
        let pull_request = self
            .lookup
            .pull_request(repo, issue.number)
            .map_err(|err| ClassifyError::Lookup {
                repo: repo.to_string(),
                number: issue.number,
                source: Box::new(err),
            })?;
        record(
            &mut self.buckets.reviewed_pull_requests,
            BucketKind::ReviewedPullRequests,
            repo,
            pull_request,
        );
        Ok(())
    }
}

fn record<T: Item>(bucket: &mut Bucket<T>, kind: BucketKind, repo: &str, item: T) {
    tracing::debug!(%kind, repo, number = item.number(), "recording event");
    bucket.insert(repo, item);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::collections::HashMap;

    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::{Value, json};

    use crate::event::{
        ISSUE_COMMENT_EVENT, ISSUES_EVENT, PULL_REQUEST_EVENT, PULL_REQUEST_REVIEW_COMMENT_EVENT,
    };

    const ME: &str = "octocat";

    #[derive(Debug, Error)]
    #[error("pull request not found")]
    struct NotFound;

    #[derive(Default)]
    struct FakeLookup {
        pulls: HashMap<(String, u64), PullRequest>,
        calls: RefCell<Vec<(String, u64)>>,
    }

    impl FakeLookup {
        fn with(repo: &str, pull_request: PullRequest) -> Self {
            let mut lookup = Self::default();
            lookup
                .pulls
                .insert((repo.to_string(), pull_request.number), pull_request);
            lookup
        }
    }

    impl PullRequestLookup for FakeLookup {
        type Error = NotFound;

        fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest, NotFound> {
            self.calls.borrow_mut().push((repo.to_string(), number));
            self.pulls
                .get(&(repo.to_string(), number))
                .cloned()
                .ok_or(NotFound)
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::new(at(6, 0), at(13, 0)).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
    }

    fn issue_json(number: u64, title: &str, author: &str, is_pull_request: bool) -> Value {
        let mut issue = json!({
            "number": number,
            "title": title,
            "html_url": format!("https://github.com/a/b/issues/{number}"),
            "user": {"login": author},
        });
        if is_pull_request {
            issue["pull_request"] = json!({"url": "https://api.github.com/repos/a/b/pulls/1"});
        }
        issue
    }

    fn pull_json(number: u64, title: &str, merged: Option<bool>) -> Value {
        json!({
            "number": number,
            "title": title,
            "html_url": format!("https://github.com/a/b/pull/{number}"),
            "merged": merged,
        })
    }

    fn issues_event(repo: &str, action: &str, issue: Value, created_at: DateTime<Utc>) -> Event {
        Event::new(
            ISSUES_EVENT,
            repo,
            created_at,
            json!({"action": action, "issue": issue}),
        )
    }

    fn comment_event(repo: &str, issue: Value) -> Event {
        Event::new(
            ISSUE_COMMENT_EVENT,
            repo,
            at(8, 12),
            json!({"action": "created", "issue": issue, "comment": {"body": "lgtm"}}),
        )
    }

    fn pull_event(repo: &str, action: &str, pull: Value) -> Event {
        Event::new(
            PULL_REQUEST_EVENT,
            repo,
            at(9, 12),
            json!({"action": action, "pull_request": pull}),
        )
    }

    fn classify(events: &[Event], lookup: &FakeLookup) -> Result<BucketSet, ClassifyError> {
        let mut classifier = Classifier::new(window(), ME, lookup, CancelFlag::new());
        classifier.classify_all(events)?;
        Ok(classifier.finish())
    }

    #[test]
    fn opened_then_closed_issue_lands_in_both_buckets() {
        let events = [
            issues_event("a/b", "opened", issue_json(5, "Bug", ME, false), at(7, 9)),
            issues_event("a/b", "closed", issue_json(5, "Bug", ME, false), at(8, 9)),
        ];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();

        assert!(buckets.opened_issues.get("a/b", 5).is_some());
        assert!(buckets.closed_issues.get("a/b", 5).is_some());
        assert_eq!(buckets.count(BucketKind::CommentedIssues), 0);
    }

    #[test]
    fn later_event_for_same_item_wins() {
        let events = [
            issues_event("a/b", "opened", issue_json(5, "Old title", ME, false), at(7, 9)),
            issues_event("a/b", "opened", issue_json(5, "New title", ME, false), at(7, 8)),
        ];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();

        assert_eq!(buckets.opened_issues.len(), 1);
        assert_eq!(buckets.opened_issues.get("a/b", 5).unwrap().title, "New title");
    }

    #[test]
    fn events_outside_window_are_ignored() {
        let events = [
            issues_event("a/b", "opened", issue_json(1, "Before", ME, false), at(5, 23)),
            issues_event("a/b", "opened", issue_json(2, "At start", ME, false), at(6, 0)),
            issues_event("a/b", "opened", issue_json(3, "At end", ME, false), at(13, 0)),
            issues_event("a/b", "opened", issue_json(4, "After", ME, false), at(20, 0)),
        ];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();

        let numbers: Vec<u64> = buckets
            .opened_issues
            .items("a/b")
            .iter()
            .map(|issue| issue.number)
            .collect();
        assert_eq!(numbers, vec![2]);
    }

    #[test]
    fn malformed_event_outside_window_is_skipped() {
        let events = [Event::new(ISSUES_EVENT, "a/b", at(1, 0), json!({"action": "opened"}))];
        assert!(classify(&events, &FakeLookup::default()).is_ok());
    }

    #[test]
    fn comment_on_plain_issue_is_recorded() {
        let events = [comment_event("a/b", issue_json(3, "Question", "someone", false))];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();
        assert!(buckets.commented_issues.get("a/b", 3).is_some());
    }

    #[test]
    fn comment_on_own_issue_is_recorded() {
        let events = [comment_event("a/b", issue_json(3, "Mine", ME, false))];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();
        assert!(buckets.commented_issues.get("a/b", 3).is_some());
    }

    #[test]
    fn comment_on_others_pull_request_is_a_review() {
        let pull = PullRequest {
            number: 12,
            title: "Add feature".to_string(),
            url: "https://github.com/a/b/pull/12".to_string(),
            merged: Some(false),
        };
        let lookup = FakeLookup::with("a/b", pull.clone());
        let events = [comment_event("a/b", issue_json(12, "Add feature", "hubot", true))];

        let buckets = classify(&events, &lookup).unwrap();

        assert_eq!(buckets.reviewed_pull_requests.get("a/b", 12), Some(&pull));
        assert!(buckets.commented_issues.is_empty());
        assert_eq!(lookup.calls.borrow().as_slice(), &[("a/b".to_string(), 12)]);
    }

    #[test]
    fn comment_on_own_pull_request_records_nothing() {
        let lookup = FakeLookup::default();
        let events = [comment_event("a/b", issue_json(12, "Mine", ME, true))];

        let buckets = classify(&events, &lookup).unwrap();

        assert!(buckets.is_empty());
        assert!(lookup.calls.borrow().is_empty());
    }

    #[test]
    fn edited_comment_is_ignored() {
        let events = [Event::new(
            ISSUE_COMMENT_EVENT,
            "a/b",
            at(8, 0),
            json!({"action": "edited", "issue": issue_json(3, "Q", ME, false)}),
        )];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn failed_lookup_aborts() {
        let events = [comment_event("a/b", issue_json(12, "Gone", "hubot", true))];
        let err = classify(&events, &FakeLookup::default()).unwrap_err();

        assert!(matches!(err, ClassifyError::Lookup { number: 12, .. }));
        assert_eq!(err.to_string(), "failed to look up pull request a/b#12");
    }

    #[test]
    fn cancellation_prevents_lookup() {
        let lookup = FakeLookup::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut classifier = Classifier::new(window(), ME, &lookup, cancel);

        let err = classifier
            .classify(&comment_event("a/b", issue_json(12, "PR", "hubot", true)))
            .unwrap_err();

        assert!(matches!(err, ClassifyError::Cancelled));
        assert!(lookup.calls.borrow().is_empty());
    }

    #[test]
    fn pull_request_actions_map_to_buckets() {
        let events = [
            pull_event("a/b", "opened", pull_json(1, "One", None)),
            pull_event("a/b", "reopened", pull_json(2, "Two", None)),
            pull_event("a/b", "created", pull_json(3, "Three", None)),
            pull_event("a/b", "closed", pull_json(4, "Four", Some(true))),
            pull_event("a/b", "synchronize", pull_json(5, "Five", None)),
        ];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();

        assert_eq!(buckets.opened_pull_requests.len(), 3);
        assert_eq!(buckets.closed_pull_requests.len(), 1);
        assert_eq!(
            buckets.closed_pull_requests.get("a/b", 4).unwrap().merged,
            Some(true)
        );
        assert!(buckets.opened_pull_requests.get("a/b", 5).is_none());
    }

    #[test]
    fn review_comment_is_a_review() {
        let events = [Event::new(
            PULL_REQUEST_REVIEW_COMMENT_EVENT,
            "c/d",
            at(10, 0),
            json!({"action": "created", "pull_request": pull_json(8, "Refactor", None)}),
        )];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();
        assert!(buckets.reviewed_pull_requests.get("c/d", 8).is_some());
    }

    #[test]
    fn unrelated_event_kinds_are_ignored() {
        let events = [
            Event::new("PushEvent", "a/b", at(7, 0), json!({"size": 1})),
            Event::new("WatchEvent", "a/b", at(7, 0), json!({"action": "started"})),
        ];
        let buckets = classify(&events, &FakeLookup::default()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn missing_pull_request_is_malformed() {
        let events = [Event::new(
            PULL_REQUEST_EVENT,
            "a/b",
            at(7, 0),
            json!({"action": "opened", "pull_request": null}),
        )];
        let err = classify(&events, &FakeLookup::default()).unwrap_err();

        assert!(matches!(
            err,
            ClassifyError::MalformedEvent {
                source: EventError::MissingField {
                    field: "pull_request",
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn at_most_one_entry_per_key_per_bucket() {
        let mut events = Vec::new();
        for hour in 0..5 {
            for number in 1..=3 {
                events.push(issues_event(
                    "a/b",
                    "closed",
                    issue_json(number, &format!("v{hour}"), ME, false),
                    at(7, hour),
                ));
            }
        }
        let buckets = classify(&events, &FakeLookup::default()).unwrap();

        assert_eq!(buckets.closed_issues.len(), 3);
        for number in 1..=3 {
            assert_eq!(buckets.closed_issues.get("a/b", number).unwrap().title, "v4");
        }
    }
}
