//! pixnote CLI - browse and capture photos and notes from the terminal
//!
//! Reads from the local mirror, and talks to the remote document API when
//! one is configured.

mod app;
mod cli;
mod commands;
mod error;

use clap::Parser;
use pixnote_core::config::ClientConfig;

use crate::app::App;
use crate::cli::{Cli, Commands, ConfigCommands, Family, NoteCommands, PhotoCommands};
use crate::commands::common::{resolve_config_path, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::{run_config_set, run_config_show};
use crate::commands::delete::run_delete;
use crate::commands::export::run_export;
use crate::commands::favorite::run_favorite;
use crate::commands::list::{run_list, run_list_notes, run_tags};
use crate::commands::note::{run_note_add, run_note_edit};
use crate::commands::photo::{run_photo_add, PhotoInput};
use crate::commands::search::{run_search, run_search_remote};
use crate::commands::sync::{run_fetch, run_load_more, run_push, run_refresh};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "pixnote=info"
        .parse::<tracing_subscriber::filter::Directive>()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config)?;

    match cli.command {
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref()).map(|_| ())
        }
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            let config = ClientConfig::resolve(Some(&config_path))?;
            run_config_show(&config, &config_path)
        }
        Commands::Config {
            command:
                ConfigCommands::Set {
                    api_url,
                    page_size,
                    timeout,
                },
        } => run_config_set(&config_path, api_url, page_size, timeout).map(|_| ()),
        command => {
            let config = ClientConfig::resolve(Some(&config_path))?;
            let db_path = resolve_db_path(cli.db_path)?;
            let app = App::open(&db_path, &config).await?;
            dispatch(&app, command).await
        }
    }
}

async fn dispatch(app: &App, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::List {
            family,
            limit,
            tag,
            favorites,
            json,
        } => match family {
            Family::Notes => run_list_notes(&app.notes, limit, tag.as_deref(), favorites, json),
            Family::Photos if tag.is_some() => Err(CliError::TagRequiresNotes),
            Family::Photos => run_list(&app.photos, limit, favorites, json),
        },
        Commands::Tags { json } => run_tags(&app.notes, json),
        Commands::Refresh { family, json } => match family {
            Family::Notes => run_refresh(&app.notes, json).await.map(|_| ()),
            Family::Photos => run_refresh(&app.photos, json).await.map(|_| ()),
        },
        Commands::More {
            family,
            pages,
            json,
        } => match family {
            Family::Notes => run_load_more(&app.notes, pages, json).await.map(|_| ()),
            Family::Photos => run_load_more(&app.photos, pages, json).await.map(|_| ()),
        },
        Commands::Fetch {
            family,
            cursor,
            page_size,
            json,
        } => match family {
            Family::Notes => run_fetch(&app.notes, cursor.as_deref(), page_size, json)
                .await
                .map(|_| ()),
            Family::Photos => run_fetch(&app.photos, cursor.as_deref(), page_size, json)
                .await
                .map(|_| ()),
        },
        Commands::Search {
            query,
            family,
            limit,
            json,
        } => match family {
            Family::Notes => run_search(&app.notes, &query, limit, json),
            Family::Photos => run_search(&app.photos, &query, limit, json),
        },
        Commands::SearchRemote {
            query,
            family,
            field,
            json,
        } => match family {
            Family::Notes => run_search_remote(&app.notes, &field, &query, json).await,
            Family::Photos => run_search_remote(&app.photos, &field, &query, json).await,
        },
        Commands::Favorite { id, family, set } => match family {
            Family::Notes => run_favorite(&app.notes, &id, set).await.map(|_| ()),
            Family::Photos => run_favorite(&app.photos, &id, set).await.map(|_| ()),
        },
        Commands::Delete { id, family } => match family {
            Family::Notes => run_delete(&app.notes, &id).await,
            Family::Photos => run_delete(&app.photos, &id).await,
        },
        Commands::Note {
            command:
                NoteCommands::Add {
                    content,
                    title,
                    photo,
                },
        } => run_note_add(&app.notes, &content, &title, photo.as_deref()).await,
        Commands::Note {
            command: NoteCommands::Edit { id, title, content },
        } => run_note_edit(&app.notes, &id, title, content).await,
        Commands::Photo {
            command:
                PhotoCommands::Add {
                    media_ref,
                    title,
                    text,
                    labels,
                    description,
                },
        } => {
            let input = PhotoInput {
                media_ref,
                title,
                text,
                labels,
                description,
            };
            run_photo_add(&app.photos, input).await
        }
        Commands::Push { family } => {
            if family != Some(Family::Notes) {
                run_push(&app.photos).await?;
            }
            if family != Some(Family::Photos) {
                run_push(&app.notes).await?;
            }
            Ok(())
        }
        Commands::Export {
            family,
            format,
            output,
        } => match family {
            Family::Notes => run_export(&app.notes, format, output.as_deref()).map(|_| ()),
            Family::Photos => run_export(&app.photos, format, output.as_deref()).map(|_| ()),
        },
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests;
