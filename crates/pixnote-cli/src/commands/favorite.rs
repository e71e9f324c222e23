use pixnote_core::models::Payload;
use pixnote_core::remote::RemoteSource;

use crate::app::Collection;
use crate::cli::Toggle;
use crate::commands::common::parse_record_id;
use crate::error::CliError;

/// Toggle, or set when `set` is given. Prints the resulting flag.
pub async fn run_favorite<P: Payload, R: RemoteSource<P>>(
    collection: &Collection<P, R>,
    id: &str,
    set: Option<Toggle>,
) -> Result<bool, CliError> {
    let id = parse_record_id(id)?;
    let coordinator = collection.coordinator()?;
    let record = match set {
        Some(toggle) => {
            coordinator
                .set_favorite(id, toggle == Toggle::On)
                .await?
        }
        None => coordinator.toggle_favorite(id).await?,
    };

    let label = if record.favorite { "favorite" } else { "not favorite" };
    println!("{}  {label}", record.id);
    Ok(record.favorite)
}
