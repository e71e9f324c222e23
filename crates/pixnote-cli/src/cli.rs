use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pixnote")]
#[command(about = "Capture photos and notes, find them again")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the client config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List cached records
    List {
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Filter notes by tag name
        #[arg(long)]
        tag: Option<String>,
        /// Only show favorites
        #[arg(long)]
        favorites: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tags found across cached notes
    Tags {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reload the first page from the remote source
    #[command(alias = "sync")]
    Refresh {
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load pages from the remote source into the list
    More {
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch one page after a cursor
    Fetch {
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Cursor printed by a previous fetch
        #[arg(long, value_name = "TOKEN")]
        cursor: Option<String>,
        /// Page size (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search cached records
    Search {
        /// Search query
        query: String,
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the remote source to search one field
    SearchRemote {
        /// Search query
        query: String,
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Field to search, e.g. `title` or `recognized_text`
        #[arg(long, default_value = "title")]
        field: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle or set the favorite flag
    Favorite {
        /// Local record id
        id: String,
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Set instead of toggling
        #[arg(long, value_enum)]
        set: Option<Toggle>,
    },
    /// Delete a record locally and remotely
    Delete {
        /// Local record id
        id: String,
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
    },
    /// Write and edit notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Record photos and their detection output
    Photo {
        #[command(subcommand)]
        command: PhotoCommands,
    },
    /// Create pending records remotely
    Push {
        /// Family to push (both when omitted)
        #[arg(long, value_enum)]
        family: Option<Family>,
    },
    /// Export cached records
    Export {
        #[arg(long, value_enum, default_value_t = Family::Notes)]
        family: Family,
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Show or update the client config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Create a note
    #[command(alias = "new")]
    Add {
        /// Note content (read from stdin when omitted)
        content: Vec<String>,
        #[arg(long, default_value = "")]
        title: String,
        /// Remote id of the photo this note is about
        #[arg(long, value_name = "REMOTE_ID")]
        photo: Option<String>,
    },
    /// Change a note's title or content
    Edit {
        /// Local record id
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PhotoCommands {
    /// Record a photo
    Add {
        /// Object-storage key or URL of the image
        media_ref: String,
        #[arg(long, default_value = "")]
        title: String,
        /// Recognized text
        #[arg(long)]
        text: Option<String>,
        /// Image label, optionally with confidence: `dog` or `dog:0.92`
        #[arg(long = "label", value_name = "LABEL")]
        labels: Vec<String>,
        /// Image description
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Update values in the config file
    Set {
        /// Remote document API base URL
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Family {
    Photos,
    Notes,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for pixnote_core::export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
