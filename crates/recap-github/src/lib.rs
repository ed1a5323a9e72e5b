//! GitHub REST API access for the weekly digest.
//!
//! Covers the three calls the digest needs: the user's public event feed,
//! single pull request lookups, and resolving the login behind a token.

use std::fmt;
use std::time::Duration;

use recap_core::{EventPage, PullRequest};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Response;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_API_URL: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("recap/", env!("CARGO_PKG_VERSION"));

/// GitHub client errors.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The provided token was invalid.
    #[error("invalid token: {reason}")]
    InvalidToken { reason: &'static str },
    /// The API base URL could not be parsed.
    #[error("invalid API URL {url:?}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// A repository name that is not `owner/name`.
    #[error("invalid repository name {0:?}, expected owner/name")]
    InvalidRepoName(String),
}

/// Next and last page numbers advertised by a `Link` response header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub next: Option<u32>,
    pub last: Option<u32>,
}

/// GitHub REST client.
///
/// Requests are unauthenticated when no token is given, which limits the
/// feed to public events and a low rate limit.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    authenticated: bool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.authenticated.then_some("[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client against `base_url`, e.g. [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, if the URL
    /// does not parse, or if the HTTP client fails to build.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, GitHubError> {
        let base_url = parse_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        if let Some(token) = token {
            if token.trim().is_empty() {
                return Err(GitHubError::InvalidToken {
                    reason: "token cannot be empty",
                });
            }
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(
                |_| GitHubError::InvalidToken {
                    reason: "token contains characters not allowed in a header",
                },
            )?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(GitHubError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            authenticated: token.is_some(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Fetches one page of the events performed by `user`, newest first.
    ///
    /// Page 0 asks for the server's default first page.
    pub async fn user_events(
        &self,
        user: &str,
        page: u32,
        per_page: u32,
    ) -> Result<EventPage, GitHubError> {
        let mut url = self.endpoint(&["users", user, "events"]);
        {
            let mut query = url.query_pairs_mut();
            if page > 0 {
                query.append_pair("page", &page.to_string());
            }
            query.append_pair("per_page", &per_page.to_string());
        }

        let response = self.get(url).await?;
        let links = response
            .headers()
            .get(header::LINK)
            .and_then(|value| value.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();
        let body = response.text().await?;
        let events = serde_json::from_str(&body)
            .map_err(|err| GitHubError::InvalidResponse(err.to_string()))?;

        Ok(EventPage {
            events,
            next_page: links.next,
            last_page: links.last,
        })
    }

    /// Fetches a pull request by repository full name and number.
    pub async fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest, GitHubError> {
        let (owner, name) = split_repo(repo)?;
        let url = self.endpoint(&["repos", owner, name, "pulls", &number.to_string()]);
        let body = self.get(url).await?.text().await?;
        serde_json::from_str(&body).map_err(|err| GitHubError::InvalidResponse(err.to_string()))
    }

    /// Returns the login of the user the token belongs to.
    pub async fn authenticated_user(&self) -> Result<String, GitHubError> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }

        let url = self.endpoint(&["user"]);
        let body = self.get(url).await?.text().await?;
        let user: User = serde_json::from_str(&body)
            .map_err(|err| GitHubError::InvalidResponse(err.to_string()))?;
        Ok(user.login)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `parse_base_url` rejects URLs that cannot be a base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<Response, GitHubError> {
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        Err(GitHubError::Api {
            status: status.as_u16(),
            message: parse_api_error(&body).unwrap_or(body),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, GitHubError> {
    let url = Url::parse(raw).map_err(|source| GitHubError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(GitHubError::InvalidBaseUrl {
            url: raw.to_string(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        });
    }
    Ok(url)
}

fn split_repo(repo: &str) -> Result<(&str, &str), GitHubError> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(GitHubError::InvalidRepoName(repo.to_string())),
    }
}

fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.message)
}

/// Extracts the `next` and `last` page numbers from a `Link` header.
///
/// Entries look like `<https://api.github.com/...?page=2>; rel="next"`.
/// Entries with an unparseable URL or no `page` parameter are skipped.
pub fn parse_link_header(value: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for entry in value.split(',') {
        let mut parts = entry.split(';').map(str::trim);
        let Some(target) = parts
            .next()
            .and_then(|part| part.strip_prefix('<'))
            .and_then(|part| part.strip_suffix('>'))
        else {
            continue;
        };
        let Some(page) = page_param(target) else {
            continue;
        };

        for param in parts {
            let Some(rel) = param.strip_prefix("rel=") else {
                continue;
            };
            for name in rel.trim_matches('"').split_whitespace() {
                match name {
                    "next" => links.next = Some(page),
                    "last" => links.last = Some(page),
                    _ => {}
                }
            }
        }
    }

    links
}

fn page_param(target: &str) -> Option<u32> {
    let url = Url::parse(target).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}
