use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use imgdrop::{App, HttpStore, Settings, TerminalPresenter};

#[derive(Parser)]
#[command(name = "imgdrop", version, about = "Drop images into a store and pick the one to stream")]
struct Cli {
    /// Config file; defaults to `imgdrop.*` in the working directory when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the store service.
    Serve,
    #[command(flatten)]
    Client(ClientCommand),
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Show the catalog and the active image.
    List,
    /// Drop files and folders; folders are expanded recursively.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Pick individual files; only images are sent.
    Pick {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Make a stored image the active one.
    Select { filename: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    runtime.block_on(dispatch(cli.command, settings))
}

async fn dispatch(command: Command, settings: Settings) -> anyhow::Result<ExitCode> {
    match command {
        Command::Serve => {
            imgdrop::service::serve(&settings.service)
                .await
                .context("running store service")?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Client(command) => run_client(command, settings).await,
    }
}

async fn run_client(command: ClientCommand, settings: Settings) -> anyhow::Result<ExitCode> {
    let store = HttpStore::new(&settings.client).context("configuring store client")?;
    let public_url = store
        .public_url(&settings.client.public_prefix)
        .context("resolving public url")?;
    let presenter = Arc::new(TerminalPresenter::stdout(public_url));
    let app = App::new(settings.client, Arc::new(store), presenter);

    let succeeded = match command {
        ClientCommand::List => app.load().await.is_ok(),
        ClientCommand::Upload { paths } => app
            .submit_dropped(&paths)
            .await
            .is_ok_and(|result| result.failure_count() == 0),
        ClientCommand::Pick { files } => app
            .submit_picked(&files)
            .await
            .is_ok_and(|result| result.failure_count() == 0),
        ClientCommand::Select { filename } => {
            app.select(&filename).await.is_ok() && app.load().await.is_ok()
        }
    };
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
