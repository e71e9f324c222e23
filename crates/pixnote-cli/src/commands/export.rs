use std::path::{Path, PathBuf};

use pixnote_core::export::{render_export, suggested_export_file_name, MarkdownExport};
use pixnote_core::models::Payload;
use pixnote_core::util::unix_millis_now;

use crate::app::Collection;
use crate::cli::ExportFormat;
use crate::error::CliError;

/// Write an export to `output_path` (a file, or a directory to place a
/// generated file name in), or to stdout.
pub fn run_export<P: Payload + MarkdownExport, R>(
    collection: &Collection<P, R>,
    format: ExportFormat,
    output_path: Option<&Path>,
) -> Result<Option<PathBuf>, CliError> {
    let records = collection.mirror.list_all();
    let rendered = render_export(&records, format.into())?;

    let Some(path) = output_path else {
        println!("{rendered}");
        return Ok(None);
    };

    let path = if path.is_dir() {
        path.join(suggested_export_file_name(
            P::FAMILY,
            format.into(),
            unix_millis_now(),
        ))
    } else {
        path.to_path_buf()
    };
    std::fs::write(&path, rendered)?;
    println!("{}", path.display());
    Ok(Some(path))
}
