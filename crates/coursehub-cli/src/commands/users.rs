//! User management commands.

use super::open_store;
use clap::Args;
use coursehub_core::{Config, User, Username};
use coursehub_store::Store;

/// Users command arguments.
#[derive(Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(clap::Subcommand)]
pub enum UsersCommand {
    /// Register a user
    Add {
        /// Username (letters, digits and @.+-_)
        username: String,

        /// Full name shown in chat
        #[arg(short, long, default_value = "")]
        name: String,
    },

    /// List registered users
    List,
}

/// Register a user.
pub fn add_user(store: &dyn Store, username: &str, full_name: &str) -> anyhow::Result<User> {
    let username = Username::new(username)?;
    Ok(store.create_user(&username, full_name.trim())?)
}

/// Run the users command.
pub fn run(args: UsersArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;

    match args.command {
        UsersCommand::Add { username, name } => {
            let user = add_user(store.as_ref(), &username, &name)?;
            println!("Created user {} (id {})", user.username, user.id);
        }

        UsersCommand::List => {
            let users = store.list_users()?;
            if users.is_empty() {
                println!("No users registered");
            }
            for user in users {
                println!(
                    "{:>5}  {:<24} {}",
                    user.id,
                    user.username.as_str(),
                    user.display_name()
                );
            }
        }
    }

    Ok(())
}
