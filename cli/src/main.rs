use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drive_registry::FileTypeDetector;
use tracing::warn;

mod client;
mod pdf;

use client::{RegistryClient, UploadFile};
use pdf::{analyze, PdfTextExtractor};

#[derive(Parser)]
#[command(name = "drive-cli")]
#[command(about = "Upload PDFs to Drive and share them", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a file and grant the uploader access to it
    Upload {
        #[arg(short, long)]
        file: PathBuf,

        /// Uploader display name
        #[arg(short, long)]
        name: String,

        /// Address that is granted read access
        #[arg(short, long)]
        email: String,

        /// Name to store the file under instead of one derived from --name
        #[arg(short = 'd', long = "desired-name")]
        desired_name: Option<String>,
    },

    /// Grant an email read access to an uploaded file
    Grant {
        #[arg(short = 'i', long = "file-id")]
        file_id: String,

        #[arg(short, long)]
        email: String,
    },

    /// List recorded files, optionally only those shared with an email
    List {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Print page and word counts of a PDF
    Count {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload { file, name, email, desired_name } => {
            let upload = UploadFile::read(&file).await?;
            if FileTypeDetector::is_pdf(&upload.content) {
                match analyze(&PdfTextExtractor, &upload.content) {
                    Ok(stats) => println!(
                        "{}: {} pages, {} words",
                        upload.file_name, stats.pages, stats.words
                    ),
                    Err(e) => warn!(error = %e, "Could not count words"),
                }
            }

            let client = RegistryClient::new(&cli.server_url)?;
            let uploaded = client
                .upload_and_grant(&upload, &name, &email, desired_name.as_deref())
                .await?;
            println!("File ID:   {}", uploaded.file_id);
            println!("File name: {}", uploaded.file_name);
            println!("View link: {}", uploaded.web_view_link);
        },
        Commands::Grant { file_id, email } => {
            let client = RegistryClient::new(&cli.server_url)?;
            let message = client.grant(&file_id, &email).await?;
            println!("{}", message);
        },
        Commands::List { email } => {
            let client = RegistryClient::new(&cli.server_url)?;
            for record in client.list(email.as_deref()).await? {
                println!("{}: {} ({})", record.id, record.name, record.view_link());
                if !record.access_emails.is_empty() {
                    println!("    shared with {}", record.access_emails.join(", "));
                }
            }
        },
        Commands::Count { file } => {
            let upload = UploadFile::read(&file).await?;
            let stats = analyze(&PdfTextExtractor, &upload.content)?;
            println!("pages: {}", stats.pages);
            println!("words: {}", stats.words);
        },
    }

    Ok(())
}
