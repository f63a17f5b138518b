pub mod handlers;

use crate::presentation::cli::{Commands, Identity};
use halo_core::auth::{SignIn, SignUp};
use halo_core::error::{HaloError, Result};
use halo_core::local::LocalStorage;
use halo_core::settings::Settings;
use halo_core::{FileStore, LocalSessionStore, Session, SessionStore, View};

/// What every command works against: settings plus the session holder.
pub struct Ctx {
    pub settings: Settings,
    pub sessions: Box<dyn SessionStore>,
}

impl Ctx {
    pub fn new(settings: Settings) -> Self {
        let sessions = LocalSessionStore::new(LocalStorage::new(&settings.data_dir));
        Self {
            settings,
            sessions: Box::new(sessions),
        }
    }

    /// The drive commands need a session; without one the gate is all there is.
    pub fn require_session(&self) -> Result<Session> {
        match View::resolve(self.sessions.as_ref())? {
            View::Drive(session) => Ok(session),
            View::Gate => Err(HaloError::NotSignedIn),
        }
    }

    pub async fn open_store(&self) -> Result<FileStore> {
        FileStore::open(self.settings.store_dir(), self.settings.store_options()).await
    }
}

pub async fn run(command: Commands, settings: Settings) -> Result<()> {
    let ctx = Ctx::new(settings);
    match command {
        Commands::Signin {
            identity: Identity { username, email },
            password,
        } => {
            let form = match (username, email) {
                (Some(username), _) => SignIn::Username { username, password },
                (None, Some(email)) => SignIn::Email { email, password },
                (None, None) => SignIn::Username {
                    username: String::new(),
                    password,
                },
            };
            handlers::handle_signin(&ctx, form)
        }
        Commands::Signup {
            first_name,
            last_name,
            email,
            password,
            confirm_password,
        } => handlers::handle_signup(
            &ctx,
            SignUp {
                first_name,
                last_name,
                email,
                password,
                confirm_password,
            },
        ),
        Commands::Logout => handlers::handle_logout(&ctx),
        Commands::Whoami => handlers::handle_whoami(&ctx),
        Commands::Upload {
            paths,
            recursive,
            mime_type,
        } => handlers::handle_upload(&ctx, paths, recursive, mime_type).await,
        Commands::Ls { long } => handlers::handle_ls(&ctx, long).await,
        Commands::Get { name, out } => handlers::handle_get(&ctx, name, out).await,
        Commands::Rm { names } => handlers::handle_rm(&ctx, names).await,
        Commands::Stats => handlers::handle_stats(&ctx).await,
        Commands::Compact => handlers::handle_compact(&ctx).await,
    }
}
