use pixnote_core::models::Payload;
use pixnote_core::remote::{Cursor, RemoteSource};

use crate::app::Collection;
use crate::commands::common::print_records;
use crate::error::CliError;

pub async fn run_refresh<P: Payload, R: RemoteSource<P>>(
    collection: &Collection<P, R>,
    as_json: bool,
) -> Result<usize, CliError> {
    let coordinator = collection.coordinator()?;
    let count = coordinator.refresh().await?;
    tracing::info!(family = P::FAMILY, count, "Refreshed first page");

    let state = coordinator.state();
    print_records(state.records.as_slice(), as_json)?;
    Ok(count)
}

/// Load up to `pages` pages; stops early once the remote reports the end.
pub async fn run_load_more<P: Payload, R: RemoteSource<P>>(
    collection: &Collection<P, R>,
    pages: usize,
    as_json: bool,
) -> Result<usize, CliError> {
    let coordinator = collection.coordinator()?;
    let mut loaded = 0;
    for _ in 0..pages {
        loaded += coordinator.load_next().await?;
        if coordinator.state().status.is_exhausted() {
            break;
        }
    }

    let state = coordinator.state();
    print_records(state.records.as_slice(), as_json)?;
    if !as_json && state.status.is_exhausted() {
        println!("(end of list)");
    }
    Ok(loaded)
}

pub async fn run_fetch<P: Payload, R: RemoteSource<P>>(
    collection: &Collection<P, R>,
    cursor: Option<&str>,
    page_size: Option<usize>,
    as_json: bool,
) -> Result<Option<String>, CliError> {
    let coordinator = collection.coordinator()?;
    let cursor = cursor
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Cursor::from_token);
    let page = coordinator
        .fetch_page(
            cursor.as_ref(),
            page_size.unwrap_or_else(|| coordinator.page_size()),
        )
        .await?;

    print_records(&page.records, as_json)?;
    let next = page.next.map(|cursor| cursor.as_token().to_string());
    match next.as_deref() {
        Some(token) => eprintln!("next cursor: {token}"),
        None => eprintln!("(end of list)"),
    }
    Ok(next)
}

pub async fn run_push<P: Payload, R: RemoteSource<P>>(
    collection: &Collection<P, R>,
) -> Result<usize, CliError> {
    let pushed = collection.coordinator()?.push_pending().await?;
    println!("{}: pushed {pushed} pending record(s)", P::FAMILY);
    Ok(pushed)
}
