//! Login session commands.

use super::open_store;
use chrono::Duration;
use clap::Args;
use coursehub_core::{Config, Session, Username};
use coursehub_store::Store;

/// Sessions command arguments.
#[derive(Args)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(clap::Subcommand)]
pub enum SessionsCommand {
    /// Issue a session token for a user
    Issue {
        /// Username
        username: String,

        /// Lifetime in hours (0 = never expires). Defaults to auth.session_ttl_hours.
        #[arg(long)]
        ttl_hours: Option<u32>,
    },

    /// Revoke a session token
    Revoke {
        /// Session token
        token: String,
    },
}

/// Issue a session for a registered user.
pub fn issue_session(store: &dyn Store, username: &str, ttl_hours: u32) -> anyhow::Result<Session> {
    let username = Username::new(username)?;
    let user = store
        .find_user(&username)?
        .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", username))?;

    let ttl = (ttl_hours > 0).then(|| Duration::hours(i64::from(ttl_hours)));
    Ok(store.create_session(user.id, ttl)?)
}

/// Run the sessions command.
pub fn run(args: SessionsArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;

    match args.command {
        SessionsCommand::Issue {
            username,
            ttl_hours,
        } => {
            let ttl_hours = ttl_hours.unwrap_or(config.auth.session_ttl_hours);
            let session = issue_session(store.as_ref(), &username, ttl_hours)?;

            println!("{}", session.token);
            match session.expires_at {
                Some(at) => eprintln!("Expires {}", at.to_rfc3339()),
                None => eprintln!("Never expires"),
            }
        }

        SessionsCommand::Revoke { token } => {
            if store.revoke_session(&token)? {
                println!("Session revoked");
            } else {
                anyhow::bail!("No such session");
            }
        }
    }

    Ok(())
}
