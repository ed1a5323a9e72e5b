//! Markdown rendering of the classified buckets.

use std::fmt::Write;

use crate::bucket::{Bucket, BucketKind, BucketSet, Item};
use crate::event::{Issue, PullRequest};

/// A bucket item as a digest bullet.
trait Bullet: Item {
    fn title(&self) -> &str;
    fn url(&self) -> &str;
    /// Bracketed status appended after the link, if any.
    fn status(&self) -> Option<&'static str>;
}

impl Bullet for Issue {
    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> Option<&'static str> {
        None
    }
}

impl Bullet for PullRequest {
    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> Option<&'static str> {
        match self.merged {
            Some(true) => Some("merged"),
            Some(false) => Some("not merged"),
            None => None,
        }
    }
}

/// Renders the digest.
///
/// Sections appear in [`BucketKind::ALL`] order. Empty buckets are omitted,
/// so an empty set renders as an empty string.
pub fn render(buckets: &BucketSet) -> String {
    let mut output = String::new();
    write_section(&mut output, BucketKind::OpenedIssues, &buckets.opened_issues);
    write_section(&mut output, BucketKind::ClosedIssues, &buckets.closed_issues);
    write_section(&mut output, BucketKind::CommentedIssues, &buckets.commented_issues);
    write_section(&mut output, BucketKind::OpenedPullRequests, &buckets.opened_pull_requests);
    write_section(&mut output, BucketKind::ClosedPullRequests, &buckets.closed_pull_requests);
    write_section(&mut output, BucketKind::ReviewedPullRequests, &buckets.reviewed_pull_requests);
    output
}

fn write_section<T: Bullet>(output: &mut String, kind: BucketKind, bucket: &Bucket<T>) {
    if bucket.is_empty() {
        return;
    }

    writeln!(output, "### {}", kind.heading()).unwrap();
    writeln!(output).unwrap();
    for repo in bucket.repos() {
        writeln!(output, "-   **{repo}**").unwrap();
        writeln!(output).unwrap();
        for item in bucket.items(repo) {
            write!(output, "    -   [{}]({})", item.title(), item.url()).unwrap();
            if let Some(status) = item.status() {
                write!(output, " [{status}]").unwrap();
            }
            writeln!(output).unwrap();
        }
        writeln!(output).unwrap();
    }
    writeln!(output).unwrap();
}
