//! Core domain logic for the weekly activity digest.
//!
//! This crate contains the fundamental types and logic for:
//! - Window resolution: turning dates or "N weeks back" into an instant range
//! - Classification: sorting activity events into per-repository buckets
//! - Paging: draining a paginated event feed
//! - Rendering: printing the buckets as a Markdown digest

mod bucket;
mod cancel;
pub mod classify;
pub mod event;
pub mod pager;
pub mod render;
pub mod window;

pub use bucket::{Bucket, BucketKind, BucketSet, Item};
pub use cancel::CancelFlag;
pub use classify::{ClassifyError, Classifier, PullRequestLookup};
pub use event::{Event, EventError, Issue, Payload, PullRequest};
pub use pager::{EventPage, EventSource, FetchError, fetch_all};
pub use render::render;
pub use window::{TimeWindow, WindowError, parse_weekday, resolve};
