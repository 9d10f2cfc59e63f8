use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facereg_api::{Config, FaceApi, HttpFaceApi, ListQuery};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;
mod controller;
mod search;
mod shell;
mod state;
#[cfg(test)]
mod testing;
mod view;
mod widget;

#[derive(Parser)]
#[command(name = "facereg", about = "Face registration and recognition client")]
struct Cli {
    /// Service base URL (overrides config and FACEREG_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Config file to load instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the service is up
    Health,
    /// Enroll a face image for a person
    Register {
        image: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        person_id: String,
        #[arg(long)]
        remark: Option<String>,
        /// Send the image as base64 JSON instead of multipart
        #[arg(long)]
        base64: bool,
    },
    /// Find enrolled faces matching an image
    Recognize {
        image: PathBuf,
        /// Minimum similarity, 0.0 to 1.0
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        top_k: Option<u32>,
        #[arg(long)]
        base64: bool,
    },
    /// Delete one face
    Delete { face_id: String },
    /// Delete every face of a person
    DeletePerson { person_id: String },
    /// List enrolled faces
    List {
        #[arg(long)]
        person_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Faces of one person
    Query { person_id: String },
    /// Look a keyword up as person id, then as name
    Search { keyword: String },
    /// Delete all face data
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Run face detection only (diagnostics)
    Detect { image: PathBuf },
    /// Interactive session
    Shell,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = &cli.base_url {
        config.api.base_url = url.clone();
        config.validate().context("invalid --base-url")?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let http = HttpFaceApi::new(config.clone()).context("creating http client")?;
    tracing::debug!(base_url = %config.api.base_url, "facereg starting");

    let api: &dyn FaceApi = &http;
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Health => commands::health(api, &mut out).await?,
        Commands::Register {
            image,
            name,
            person_id,
            remark,
            base64,
        } => {
            let args = commands::RegisterArgs {
                image: &image,
                name,
                person_id,
                remark,
                base64,
            };
            commands::register(api, &config, args, &mut out).await?;
        }
        Commands::Recognize {
            image,
            threshold,
            top_k,
            base64,
        } => {
            let args = commands::RecognizeArgs {
                image: &image,
                threshold,
                top_k,
                base64,
            };
            commands::recognize(api, &config, args, &mut out).await?;
        }
        Commands::Delete { face_id } => commands::delete_face(api, &face_id, &mut out).await?,
        Commands::DeletePerson { person_id } => {
            commands::delete_person(api, &person_id, &mut out).await?
        }
        Commands::List {
            person_id,
            name,
            limit,
        } => {
            let query = ListQuery {
                person_id,
                name,
                limit: limit.unwrap_or(config.defaults.list_limit),
            };
            commands::list(api, query, &mut out).await?;
        }
        Commands::Query { person_id } => commands::query(api, &person_id, &mut out).await?,
        Commands::Search { keyword } => {
            commands::search(api, &keyword, config.defaults.list_limit, &mut out).await?
        }
        Commands::Reset { yes } => {
            commands::reset(api, yes, commands::confirm_on_terminal, &mut out).await?
        }
        Commands::Detect { image } => commands::detect(api, &config, &image, &mut out).await?,
        Commands::Shell => shell::run_shell(Arc::new(http.clone()), config.clone()).await?,
    }

    Ok(())
}
