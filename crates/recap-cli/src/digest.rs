//! The digest pipeline: resolve the window, drain the feed, classify, render.
//!
//! Status notices go to stderr so stdout carries only the report.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use recap_core::{BucketKind, CancelFlag, Classifier, fetch_all, render, resolve};
use recap_github::Client;
use tokio::runtime::Runtime;

use crate::config::non_blank;
use crate::github::{EventFeed, PullRequests};
use crate::{Cli, Config, ConfigError};

const NO_TOKEN_NOTICE: &str = "$GITHUB_TOKEN or --token not set - GitHub may block your queries due \
     to rate-limiting. Also note private repository activity will not be reported.";

pub fn run<W: Write>(writer: &mut W, cli: &Cli, config: &Config) -> Result<()> {
    let window = resolve(
        cli.start_date.as_deref(),
        cli.end_date.as_deref(),
        &cli.start_of_week,
        cli.weeks_back,
        &Local::now(),
    )?;

    let token = config.token.as_deref();
    match token {
        Some(_) if non_blank(cli.token.as_deref()).is_some() => {
            eprintln!("Using GitHub personal access token provided via flag.");
        }
        Some(_) => eprintln!("Using GitHub personal access token found in $GITHUB_TOKEN."),
        None => eprintln!("{NO_TOKEN_NOTICE}"),
    }

    let client = Client::new(&config.api_url, token).context("failed to create GitHub client")?;
    let runtime = Runtime::new().context("failed to initialize tokio runtime")?;
    let cancel = CancelFlag::new();
    watch_for_interrupt(&runtime, cancel.clone());

    let user = username(&runtime, &client, cli, config)?;

    eprintln!(
        "Pulling contributions from {} to {} ({})...",
        local_timestamp(window.start()),
        local_timestamp(window.end()),
        local_zone_name(),
    );

    let feed = EventFeed {
        runtime: &runtime,
        client: &client,
        user: &user,
        per_page: config.per_page,
    };
    let events = fetch_all(&feed, &cancel)?;
    tracing::info!(count = events.len(), "fetched events");

    let lookup = PullRequests {
        runtime: &runtime,
        client: &client,
    };
    let mut classifier = Classifier::new(window, &user, &lookup, cancel);
    classifier.classify_all(&events)?;
    let buckets = classifier.finish();
    for kind in BucketKind::ALL {
        tracing::debug!(%kind, count = buckets.count(kind), "classified");
    }

    writeln!(writer, "{}", render(&buckets))?;
    Ok(())
}

/// Picks the user from the flag, then the environment, then the token owner.
fn username(runtime: &Runtime, client: &Client, cli: &Cli, config: &Config) -> Result<String> {
    if let Some(user) = &config.username {
        let source = if non_blank(cli.user.as_deref()).is_some() {
            "flag"
        } else {
            "environment variable"
        };
        eprintln!("User identified as {user} via {source}");
        return Ok(user.clone());
    }

    if !client.is_authenticated() {
        return Err(ConfigError::MissingUser.into());
    }

    eprintln!(
        "User not specified via flag or environment variable, attempting to detect from access \
         token."
    );
    let user = runtime
        .block_on(client.authenticated_user())
        .context("failed to identify user")?;
    eprintln!("User identified as {user}");
    Ok(user)
}

/// Sets `cancel` on the first Ctrl-C. In-flight requests run to completion.
fn watch_for_interrupt(runtime: &Runtime, cancel: CancelFlag) {
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received");
            cancel.cancel();
        }
    });
}

fn local_timestamp(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn local_zone_name() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|err| {
        tracing::debug!(error = %err, "could not name the local time zone");
        "local time".to_string()
    })
}
