//! services/client/src/bin/todo.rs

use clap::{Parser, Subcommand};
use client_lib::{config::Config, error::ClientError, AppContext};
use todo_core::domain::{NewTodoItem, TodoItem, TodoStatus};
use todo_core::ports::PortError;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "todo")]
#[command(version = "0.1")]
#[command(about = "Manage your todo list from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with an existing account
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your todo items
    List,
    /// Add a todo item
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// not-started, in-progress or completed
        #[arg(short, long, default_value = "not-started")]
        status: TodoStatus,
    },
    /// Change a todo item
    Update {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        status: Option<TodoStatus>,
    },
    /// Delete a todo item
    Remove { id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!(base_url = %config.api_base_url, "Configuration loaded");

    // --- 2. Build the Context & Restore Any Stored Session ---
    let mut ctx = AppContext::new(&config)?;
    let restored = ctx.initialize().await?;
    debug!(restored, "Session hydration finished");

    // --- 3. Run the Command ---
    match cli.command {
        Commands::Register { email, password } => {
            let session = ctx.register(&email, &password).await?;
            println!("Welcome, {}", session.email);
        }
        Commands::Login { email, password } => {
            let session = ctx.login(&email, &password).await?;
            println!("Welcome back, {}", session.email);
        }
        Commands::Logout => {
            ctx.logout()?;
            println!("Signed out");
        }
        Commands::Whoami => {
            let user = ctx.refresh_profile().await?;
            println!("{} ({})", user.email, user.id);
        }
        Commands::List => {
            let items = ctx.refresh_todos().await?;
            if items.is_empty() {
                println!("Nothing to do");
            }
            for item in items {
                print_item(item);
            }
        }
        Commands::Add {
            title,
            description,
            status,
        } => {
            let mut new_item = NewTodoItem::new(title).with_status(status);
            if let Some(description) = description {
                new_item = new_item.with_description(description);
            }
            let created = ctx.create_todo(new_item).await?;
            print_item(&created);
        }
        Commands::Update {
            id,
            title,
            description,
            status,
        } => {
            ctx.refresh_todos().await?;
            let mut item = ctx
                .todo_store()
                .get(id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("todo item {id}")))?;
            if let Some(title) = title {
                item.title = title;
            }
            if description.is_some() {
                item.description = description;
            }
            if let Some(status) = status {
                item.status = status;
            }
            let updated = ctx.update_todo(item).await?;
            print_item(&updated);
        }
        Commands::Remove { id } => {
            match ctx.delete_todo(id).await {
                Err(e) if !e.is_fatal() => info!(id, "Item was already gone"),
                other => other?,
            }
            println!("Removed {id}");
        }
    }

    Ok(())
}

fn print_item(item: &TodoItem) {
    match &item.description {
        Some(description) => println!(
            "#{:<5} [{}] {} - {}",
            item.id, item.status, item.title, description
        ),
        None => println!("#{:<5} [{}] {}", item.id, item.status, item.title),
    }
}
