use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "halodrive: a personal drive kept on this machine", long_about = None)]
pub struct Cli {
    /// Directory holding the file store and the session (overrides settings)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct Identity {
    /// Sign in with a username
    #[arg(long)]
    pub username: Option<String>,

    /// Sign in with an email address
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with any username (or email) and password; nothing is verified
    Signin {
        #[command(flatten)]
        identity: Identity,
        #[arg(long)]
        password: String,
    },

    /// Create an account; only checks that fields are filled and passwords match
    Signup {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },

    /// Forget the current session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Upload one or more files (same name overwrites)
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// recurse into directories
        #[arg(long)]
        recursive: bool,
        /// MIME type for every file in the batch (guessed from the extension otherwise)
        #[arg(long = "type")]
        mime_type: Option<String>,
    },

    /// List stored files
    Ls {
        /// show size, type, date and digest
        #[arg(long)]
        long: bool,
    },

    /// Download a stored file into a directory
    Get {
        name: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Delete stored files by name (absent names are ignored)
    Rm {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Storage usage by category
    Stats,

    /// Reclaim space left by overwritten and deleted files
    Compact,
}
