//! `fairway` - command-line access to a device's tournament data.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fairway_client::{
    clear_local_session, subscribe_collection, subscribe_draw_notices, ClientConfig, DeviceContext,
    HttpRemote, IdentityClient, RemoteFetch, RemoteStatus, SyncError,
};
use fairway_engine::{CollectionName, TieBreak};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fairway")]
#[command(version)]
#[command(about = "Offline-first golf tournament data", long_about = None)]
struct Cli {
    /// Override FAIRWAY_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Break score ties in favour of the remote copy
    #[arg(long, global = true)]
    prefer_remote: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every collection with the remote store
    Load,

    /// Push every local collection to the remote store
    Sync,

    /// Print a collection as stored locally
    Show { collection: CollectionName },

    /// Replace a collection with the JSON in FILE, locally and remotely
    Save {
        collection: CollectionName,
        file: PathBuf,
    },

    /// Sign in with a login name or registration number
    SignIn {
        identifier: String,
        /// Password; read from FAIRWAY_SECRET when omitted
        #[arg(long, env = "FAIRWAY_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Sign out of this device
    SignOut,

    /// Print a collection every time it changes remotely
    Watch {
        collection: CollectionName,
        /// Also print draw notices for this registration number (your own; requires sign-in)
        #[arg(long)]
        reg: Option<String>,
    },

    /// Look up a player by registration number
    Player { reg: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fairway=info,fairway_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.prefer_remote {
        config.tie_break = TieBreak::PreferRemote;
    }

    let context = DeviceContext::init(&config)?;

    match cli.command {
        Commands::Load => {
            if context.auto_load_if_empty().await {
                println!("New device: copied all collections from the remote store.");
            }
            for outcome in context.load_all().await {
                let fetch = match &outcome.fetch {
                    RemoteFetch::Disabled => "local only".to_string(),
                    RemoteFetch::Merged => "merged".to_string(),
                    RemoteFetch::Failed(e) => format!("remote unavailable ({e})"),
                };
                println!("  {:<16} {}", outcome.collection.to_string(), fetch);
                print_warning(&outcome.push_back);
            }
        }
        Commands::Sync => match context.sync_all().await {
            Ok(pushed) => println!("Synced {} collections.", pushed.len()),
            Err(SyncError::NotConnected) => {
                return Err("cloud sync is disabled; set FAIRWAY_SERVER_URL".into());
            }
            Err(e) => return Err(e.into()),
        },
        Commands::Show { collection } => {
            let value = context.store().read(collection);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Save { collection, file } => {
            let text = std::fs::read_to_string(&file)?;
            let value = serde_json::from_str(&text)?;
            let status = context.save(collection, value).await?;
            println!("Saved {collection}.");
            print_warning(&status);
        }
        Commands::SignIn { identifier, secret } => {
            let identity = identity_client(&context, &config)?;
            let principal = identity.sign_in(&identifier, &secret).await?;
            let role = identity.role_of(&principal).await;
            println!("Signed in as {} ({role}).", principal.login_name);
        }
        Commands::SignOut => {
            if context.sync_enabled() {
                identity_client(&context, &config)?.sign_out().await?;
            } else {
                clear_local_session(context.store())?;
            }
            println!("Signed out.");
        }
        Commands::Watch { collection, reg } => {
            let remote = connected(&context)?;
            let changes = subscribe_collection(&remote, collection, move |value| {
                match serde_json::to_string_pretty(&value) {
                    Ok(text) => println!("{text}"),
                    Err(e) => tracing::warn!("cannot print change: {}", e),
                }
            })
            .await?;
            let notices = match reg {
                Some(reg) => Some(
                    subscribe_draw_notices(&remote, &reg, |notice| {
                        println!("{}: {}", notice.title, notice.body);
                    })
                    .await?,
                ),
                None => None,
            };

            tokio::signal::ctrl_c().await?;
            changes.cancel().await;
            if let Some(notices) = notices {
                notices.cancel().await;
            }
        }
        Commands::Player { reg } => match context.find_player(&reg).await {
            Some(player) => println!("{}", serde_json::to_string_pretty(&player)?),
            None => println!("No player with registration number {}.", reg.to_uppercase()),
        },
    }

    context.teardown();
    Ok(())
}

fn connected(context: &DeviceContext) -> Result<Arc<HttpRemote>, SyncError> {
    context.remote().cloned().ok_or(SyncError::NotConnected)
}

fn identity_client(
    context: &DeviceContext,
    config: &ClientConfig,
) -> Result<IdentityClient<HttpRemote, fairway_client::FileBackend>, SyncError> {
    Ok(IdentityClient::new(
        connected(context)?,
        context.store().clone(),
        config.role_timeout,
    ))
}

fn print_warning(status: &RemoteStatus) {
    if let Some(warning) = status.warning() {
        eprintln!("Warning: {warning}");
    }
}
