use pixnote_core::models::Payload;
use pixnote_core::remote::RemoteSource;
use pixnote_core::search::filter_records;

use crate::app::Collection;
use crate::commands::common::{normalize_search_query, print_records};
use crate::error::CliError;

pub fn run_search<P: Payload, R>(
    collection: &Collection<P, R>,
    query: &str,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let normalized_query = normalize_search_query(query)?;
    let mut records = filter_records(&collection.mirror.list_all(), &normalized_query);
    records.truncate(limit);
    print_records(&records, as_json)
}

pub async fn run_search_remote<P: Payload, R: RemoteSource<P>>(
    collection: &Collection<P, R>,
    field: &str,
    query: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let normalized_query = normalize_search_query(query)?;
    let records = collection
        .coordinator()?
        .search_remote(field.trim(), &normalized_query)
        .await?;
    print_records(&records, as_json)
}
