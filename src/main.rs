// src/main.rs

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mentor::config::CONFIG;
use mentor::controller::ChatController;
use mentor::gateway::{Gateway, HttpGateway};
use mentor::pipeline::Session;
use mentor::repl;
use mentor::server::{self, AppState};
use mentor::store;
use mentor::store::history::HistoryStore;

#[derive(Parser)]
#[command(name = "mentor", version, about = "AI mentor chat pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server exposing the pipeline over SSE
    Serve,
    /// Chat with the mentor from the terminal
    Chat {
        /// Email identifying the learner
        #[arg(long, env = "MENTOR_USER_EMAIL")]
        user: String,
    },
    /// Delete all chat history for a learner
    Reset {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = CONFIG.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pool = store::connect(&CONFIG.database_url, CONFIG.sqlite_max_connections).await?;
    store::init_schema(&pool).await?;

    let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::from_config()?);

    match cli.command {
        Command::Serve => {
            let state = AppState {
                db: pool,
                gateway,
            };
            let app = server::create_router(state);

            let bind_address = CONFIG.bind_address();
            let listener = tokio::net::TcpListener::bind(&bind_address).await?;
            info!("mentor server listening on http://{}", bind_address);
            info!("gateway: {}", CONFIG.gateway_url);
            axum::serve(listener, app).await?;
        }
        Command::Chat { user } => {
            let mut controller = ChatController::new(gateway, pool, Session::new(user));
            repl::run(&mut controller).await?;
        }
        Command::Reset { user } => {
            HistoryStore::new(pool).reset(&user).await?;
            println!("Chat history cleared for {user}");
        }
    }

    Ok(())
}
