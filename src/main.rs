use clap::{Parser, Subcommand};
use membank::client::{self, ApiClient};
use membank::config::Settings;
use membank::{api, web};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "membank", version, about = "REST, CLI and web front end for a Weaviate memory bank")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the REST gateway (query / add / update / delete)
    Api,
    /// Run the web dashboard
    Web,
    /// Check API and Weaviate health
    Health,
    /// BM25 query against the memory bank
    Query {
        text: String,
        #[arg(long, default_value_t = membank::defaults::QUERY_LIMIT)]
        limit: usize,
        /// "all" or one of: text, image, url, binary
        #[arg(long, default_value = "all")]
        content_type: String,
    },
    /// Add a text document, chunked when large
    AddText {
        content: String,
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        directory: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Add an image file, stored inline as base64
    AddImage {
        path: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Add a URL with scraped title and description
    AddUrl {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Add a binary file fingerprint (MD5 + size + notes)
    AddBinary {
        path: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Update an existing document by UUID
    Update {
        id: String,
        content: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete a document by UUID
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();

    match Cli::parse().cmd {
        Cmd::Api => api::run(&settings).await?,
        Cmd::Web => web::run(&settings).await?,
        Cmd::Health => {
            let client = ApiClient::from_settings(&settings);
            match client.health().await {
                Ok(data) if is_healthy(&data) => client::print_health(&data),
                Ok(data) => {
                    eprintln!("❌ Memory Bank API is running but not healthy: {data}");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Error connecting to Memory Bank API: {e}");
                    eprintln!("   API URL: {}", settings.api_url);
                    std::process::exit(1);
                }
            }
        }
        Cmd::Query {
            text,
            limit,
            content_type,
        } => {
            let client = connect(&settings).await;
            render(client.query(&text, limit, &content_type).await, client::print_query_results);
        }
        Cmd::AddText {
            content,
            filename,
            directory,
            title,
        } => {
            let client = connect(&settings).await;
            render(
                client
                    .add_text(&content, filename.as_deref(), directory.as_deref(), title.as_deref())
                    .await,
                client::print_add_result,
            );
        }
        Cmd::AddImage { path, title } => {
            let client = connect(&settings).await;
            render(client.add_image(&path, title.as_deref()).await, client::print_add_result);
        }
        Cmd::AddUrl { url, title } => {
            let client = connect(&settings).await;
            render(client.add_url(&url, title.as_deref()).await, client::print_add_result);
        }
        Cmd::AddBinary { path, notes, title } => {
            let client = connect(&settings).await;
            render(
                client.add_binary(&path, notes.as_deref(), title.as_deref()).await,
                client::print_add_result,
            );
        }
        Cmd::Update {
            id,
            content,
            title,
            content_type,
        } => {
            let client = connect(&settings).await;
            render(
                client
                    .update(&id, &content, title.as_deref(), content_type.as_deref())
                    .await,
                client::print_update_result,
            );
        }
        Cmd::Delete { id } => {
            let client = connect(&settings).await;
            render(client.delete(&id).await, client::print_delete_result);
        }
    }
    Ok(())
}

fn is_healthy(data: &Value) -> bool {
    data.get("status").and_then(|v| v.as_str()) == Some("healthy")
}

// Client subcommands refuse to run against a dead API.
async fn connect(settings: &Settings) -> ApiClient {
    let client = ApiClient::from_settings(settings);
    match client.health().await {
        Ok(data) if is_healthy(&data) => client,
        Ok(_) | Err(_) => {
            eprintln!("❌ Memory Bank API is not reachable at {}", settings.api_url);
            eprintln!("Exiting due to connection issues.");
            std::process::exit(1);
        }
    }
}

fn render(result: anyhow::Result<Value>, printer: fn(&Value)) {
    match result {
        Ok(data) => printer(&data),
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    }
}
