use pixnote_core::models::Photo;
use pixnote_core::remote::RemoteSource;
use pixnote_core::util::normalize_text_option;

use crate::app::Collection;
use crate::commands::common::parse_label;
use crate::error::CliError;

pub struct PhotoInput {
    pub media_ref: String,
    pub title: String,
    pub text: Option<String>,
    pub labels: Vec<String>,
    pub description: Option<String>,
}

pub fn build_photo(input: PhotoInput) -> Result<Photo, CliError> {
    let labels = input
        .labels
        .iter()
        .map(String::as_str)
        .map(parse_label)
        .collect::<Result<Vec<_>, _>>()?;

    let mut photo = Photo::new(input.media_ref.trim())
        .with_title(input.title.trim())
        .with_labels(labels);
    if let Some(text) = normalize_text_option(input.text) {
        photo = photo.with_recognized_text(text);
    }
    if let Some(description) = normalize_text_option(input.description) {
        photo = photo.with_description(description);
    }
    Ok(photo)
}

pub async fn run_photo_add<R: RemoteSource<Photo>>(
    collection: &Collection<Photo, R>,
    input: PhotoInput,
) -> Result<(), CliError> {
    let photo = build_photo(input)?;
    let record = collection.create(photo).await?;
    if record.is_synced() {
        println!("{}", record.id);
    } else {
        println!("{}  (pending)", record.id);
    }
    Ok(())
}
