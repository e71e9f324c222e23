use pixnote_core::models::{Note, Payload, Record};
use pixnote_core::search::{collect_note_tags, filter_notes_by_tag};

use crate::app::Collection;
use crate::commands::common::print_records;
use crate::error::CliError;

pub fn run_list<P: Payload, R>(
    collection: &Collection<P, R>,
    limit: usize,
    favorites: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let records = select_records(collection.mirror.list_all(), limit, favorites);
    print_records(&records, as_json)
}

pub fn run_list_notes<R>(
    collection: &Collection<Note, R>,
    limit: usize,
    tag: Option<&str>,
    favorites: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let mut notes = collection.mirror.list_all();
    if let Some(tag) = tag {
        notes = filter_notes_by_tag(&notes, tag);
    }
    let notes = select_records(notes, limit, favorites);
    print_records(&notes, as_json)
}

pub fn run_tags<R>(collection: &Collection<Note, R>, as_json: bool) -> Result<(), CliError> {
    let tags = collect_note_tags(&collection.mirror.list_all());
    if as_json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
    } else {
        for tag in tags {
            println!("#{tag}");
        }
    }
    Ok(())
}

pub fn select_records<P>(records: Vec<Record<P>>, limit: usize, favorites: bool) -> Vec<Record<P>> {
    records
        .into_iter()
        .filter(|record| !favorites || record.favorite)
        .take(limit)
        .collect()
}
