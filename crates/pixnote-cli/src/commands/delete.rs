use pixnote_core::models::Payload;
use pixnote_core::remote::RemoteSource;

use crate::app::Collection;
use crate::commands::common::parse_record_id;
use crate::error::CliError;

pub async fn run_delete<P: Payload, R: RemoteSource<P>>(
    collection: &Collection<P, R>,
    id: &str,
) -> Result<(), CliError> {
    let id = parse_record_id(id)?;
    collection.delete(id).await?;
    println!("{id}");
    Ok(())
}
