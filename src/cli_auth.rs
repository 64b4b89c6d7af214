//! Offline account administration: bootstrapping owners, resetting passwords and
//! approving accounts without going through the HTTP API.

use anyhow::{bail, Context, Result};
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use minstrelmuse_server::user::policy::Actor;
use minstrelmuse_server::user::{SqliteUserStore, UserChange, UserManager, UserRecord, UserRole};

const USER_DB_FILE_NAME: &str = "user.db";

fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

fn parse_dir(s: &str) -> Result<PathBuf> {
    let path = PathBuf::from(s);
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };
    if !path.is_dir() {
        bail!("Not a directory: {}", s);
    }
    Ok(path)
}

fn parse_role(s: &str) -> Result<UserRole, String> {
    UserRole::from_str(s)
        .ok_or_else(|| format!("Unknown role '{}', expected user, moderator, admin or owner", s))
}

#[derive(Parser, Debug)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Directory containing user.db.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates an approved account, optionally with a password.
    AddUser {
        handle: String,
        #[clap(long, default_value = "user", value_parser = parse_role)]
        role: UserRole,
        #[clap(long)]
        password: Option<String>,
    },

    /// Sets or replaces the password of an account.
    SetPassword { handle: String, password: String },

    /// Changes the role of an account. This is the only way to create the first owner.
    SetRole {
        handle: String,
        #[clap(value_parser = parse_role)]
        role: UserRole,
    },

    /// Approves a pending account.
    Approve { handle: String },

    /// Revokes the approval of an account.
    Revoke { handle: String },

    /// Shows a single account.
    Show { handle: String },

    /// Lists all accounts.
    ListUsers,
}

fn print_user(user: &UserRecord) {
    println!(
        "{:>5}  {:<24} {:<10} {}",
        user.id,
        user.handle,
        user.role.as_str(),
        if user.approved { "approved" } else { "pending" }
    );
}

fn execute(command: Command, user_manager: &UserManager) -> Result<()> {
    match command {
        Command::AddUser {
            handle,
            role,
            password,
        } => {
            let user_id = user_manager.add_user(&handle, role, true)?;
            if let Some(password) = password {
                user_manager.set_password(&handle, &password)?;
            }
            println!("Created user {} with id {}", handle, user_id);
        }
        Command::SetPassword { handle, password } => {
            user_manager.set_password(&handle, &password)?;
            println!("Password updated for {}", handle);
        }
        Command::SetRole { handle, role } => {
            print_user(&user_manager.force_change_user(&handle, UserChange::SetRole(role))?);
        }
        Command::Approve { handle } => {
            print_user(&user_manager.force_change_user(&handle, UserChange::SetApproval(true))?);
        }
        Command::Revoke { handle } => {
            print_user(&user_manager.force_change_user(&handle, UserChange::SetApproval(false))?);
        }
        Command::Show { handle } => match user_manager.get_user_by_handle(&handle)? {
            Some(user) => print_user(&user),
            None => bail!("User {} not found", handle),
        },
        Command::ListUsers => {
            // The CLI runs with owner rights.
            let actor = Actor::new(0, UserRole::Owner, true);
            for user in user_manager.get_all_users(&actor)? {
                print_user(&user);
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let db_path = cli_args.db_dir.join(USER_DB_FILE_NAME);
    let user_store = SqliteUserStore::new(&db_path)
        .with_context(|| format!("Failed to open user database at {:?}", db_path))?;
    let user_manager = UserManager::new(Box::new(user_store), true);
    execute(cli_args.command, &user_manager)
}
