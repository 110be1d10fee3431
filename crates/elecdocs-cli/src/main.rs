//! elecdocs CLI: browse, download, upload and delete documents through the elecdocs API.
//!
//! Set ELECDOCS_SERVER and ELECDOCS_TOKEN (a bearer token from the identity
//! provider), or pass --server / --token.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use elecdocs_cli::{init_tracing, is_confirmation, output, ApiClient};
use elecdocs_services::UploadEvent;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "elecdocs", about = "Electrical documentation viewer CLI")]
struct Cli {
    /// API base URL
    #[arg(long, env = "ELECDOCS_SERVER", default_value = "http://localhost:4000")]
    server: String,

    /// Bearer token; omit to act anonymously
    #[arg(long, env = "ELECDOCS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the signed-in identity
    Whoami,
    /// List the document categories and their folders
    Categories,
    /// List the files of a category (id such as SWL, or its folder)
    List { category: String },
    /// Download a file through its signed URL
    Download {
        category: String,
        name: String,
        /// Destination path; defaults to the file name in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a file into a category
    Upload {
        category: String,
        file: PathBuf,
    },
    /// Delete a file (administrators only)
    Delete {
        category: String,
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn ask(prompt: &str) -> Result<String> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush().context("Flush stdout")?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Read confirmation")?;
    Ok(answer)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server, cli.token)?;
    tracing::debug!(server = %client.base_url(), "Using API");

    match cli.command {
        Commands::Whoami => {
            let session = client.session().await?;
            println!(
                "{} <{}>{}",
                session.uid,
                session.email.as_deref().unwrap_or("no email"),
                if session.is_admin { " (admin)" } else { "" }
            );
        }
        Commands::Categories => {
            let categories = client.categories().await?;
            println!("{}", output::categories_table(&categories));
        }
        Commands::List { category } => {
            let documents = client.list_documents(&category).await?;
            if cli.json {
                print_json(&documents)?;
            } else {
                println!("{}", output::documents_table(&documents));
            }
        }
        Commands::Download {
            category,
            name,
            output,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            let written = client.download(&category, &name, &output).await?;
            println!("Saved {} ({} bytes).", output.display(), written);
        }
        Commands::Upload { category, file } => {
            let mut last_percent: Option<u8> = None;
            let outcome = client
                .upload(&category, &file, |event| {
                    if let UploadEvent::Progress { percent } = event {
                        if last_percent == Some(*percent) {
                            return;
                        }
                        last_percent = Some(*percent);
                    }
                    println!("{}", output::describe_event(event));
                })
                .await?;
            if let UploadEvent::Failed { message } = outcome {
                bail!(message);
            }
        }
        Commands::Delete {
            category,
            name,
            yes,
        } => {
            let request = client.request_delete(&category, &name).await?;
            if !yes && !is_confirmation(&ask(&request.prompt)?) {
                client.cancel_delete(request.request_id).await?;
                println!("Delete cancelled.");
                return Ok(());
            }
            let confirmation = client.confirm_delete(request.request_id).await?;
            println!("Deleted \"{}\".", request.name);
            match (confirmation.documents, confirmation.refresh_error) {
                (Some(documents), _) if cli.json => print_json(&documents)?,
                (Some(documents), _) => println!("{}", output::documents_table(&documents)),
                (None, message) => println!(
                    "Deleted, but the listing could not be refreshed: {}",
                    message.as_deref().unwrap_or("unknown error")
                ),
            }
        }
    }

    Ok(())
}
