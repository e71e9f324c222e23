use pixnote_core::models::{Note, RemoteId};
use pixnote_core::remote::RemoteSource;

use crate::app::Collection;
use crate::commands::common::{normalize_content, parse_record_id, resolve_note_content};
use crate::error::CliError;

pub async fn run_note_add<R: RemoteSource<Note>>(
    collection: &Collection<Note, R>,
    content_parts: &[String],
    title: &str,
    photo: Option<&str>,
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;
    create_note(collection, title, content, photo).await
}

pub async fn create_note<R: RemoteSource<Note>>(
    collection: &Collection<Note, R>,
    title: &str,
    content: String,
    photo: Option<&str>,
) -> Result<(), CliError> {
    let mut note = Note::new(title.trim(), content);
    if let Some(photo) = photo {
        note = note.about_photo(photo.parse::<RemoteId>()?);
    }

    let record = collection.create(note).await?;
    if record.is_synced() {
        println!("{}", record.id);
    } else {
        println!("{}  (pending)", record.id);
    }
    Ok(())
}

pub async fn run_note_edit<R: RemoteSource<Note>>(
    collection: &Collection<Note, R>,
    id: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<(), CliError> {
    let id = parse_record_id(id)?;
    let content = content.as_deref().and_then(normalize_content);
    if title.is_none() && content.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let record = collection
        .coordinator()?
        .mutate(id, move |record| {
            if let Some(title) = title {
                record.payload.title = title.trim().to_string();
            }
            if let Some(content) = content {
                record.payload.content = content;
            }
        })
        .await?;
    println!("{}", record.id);
    Ok(())
}
