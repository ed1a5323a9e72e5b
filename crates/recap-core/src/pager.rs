//! Draining the paginated event feed.

use std::error::Error as StdError;

use thiserror::Error;

use crate::cancel::CancelFlag;
use crate::event::Event;

/// One page of the feed plus the pagination hints that came with it.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub next_page: Option<u32>,
    pub last_page: Option<u32>,
}

/// A paginated source of events, newest first.
pub trait EventSource {
    type Error: StdError + Send + Sync + 'static;

    fn fetch_page(&self, page: u32) -> Result<EventPage, Self::Error>;
}

/// Errors while draining the feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source failed to deliver a page.
    #[error("failed to fetch events page {page}")]
    Source {
        page: u32,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Cancellation was requested between pages.
    #[error("interrupted")]
    Cancelled,
}

/// Fetches every page starting at page 0 and returns the events in feed order.
///
/// Paging stops when the current page is the reported last page, or when the
/// reported next page is missing or does not move forward.
pub fn fetch_all<S: EventSource>(
    source: &S,
    cancel: &CancelFlag,
) -> Result<Vec<Event>, FetchError> {
    let mut events = Vec::new();
    let mut page = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let fetched = source
            .fetch_page(page)
            .map_err(|err| FetchError::Source {
                page,
                source: Box::new(err),
            })?;
        tracing::debug!(
            page,
            count = fetched.events.len(),
            next = ?fetched.next_page,
            last = ?fetched.last_page,
            "fetched events page"
        );
        events.extend(fetched.events);

        match fetched.next_page {
            Some(next) if next > page && fetched.last_page != Some(page) => page = next,
            _ => break,
        }
    }

    Ok(events)
}
