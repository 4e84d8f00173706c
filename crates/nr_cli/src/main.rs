use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use nr_core::{Error, FakeNewsDetection, Result, Storage};
use nr_inference::InferenceConfig;
use nr_ingest::{ExtractedArticle, UrlImporter};
use nr_web::{AppState, AuthConfig, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "newsroom", author, version, about = "Reformat, check and distribute news articles", long_about = None)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and WebSocket relay
    Serve(ServeArgs),
    /// Score a file (or stdin) with the rule-based authenticity checker
    Detect {
        file: Option<PathBuf>,
        /// Title to use for stdin input
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Fetch a web page and print the extracted article
    Import {
        url: String,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "NEWSROOM_BIND", default_value = "0.0.0.0:5000")]
    bind: SocketAddr,
    #[arg(long, default_value = "memory", value_parser = ["memory", "sqlite"])]
    storage: String,
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://newsroom.db")]
    database_url: String,
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,
    #[arg(long, default_value_t = 168)]
    token_ttl_hours: i64,
    #[arg(long, default_value_t = 10)]
    upload_limit_mb: usize,
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,
    #[arg(long, env = "LLM_BASE_URL", default_value = nr_inference::DEFAULT_BASE_URL)]
    llm_base_url: String,
    #[arg(long, env = "LLM_MODEL", default_value = nr_inference::DEFAULT_MODEL)]
    llm_model: String,
    #[arg(long, default_value_t = nr_inference::DEFAULT_TIMEOUT_SECS)]
    llm_timeout_secs: u64,
    /// Timeout for article imports
    #[arg(long, default_value_t = 30)]
    fetch_timeout_secs: u64,
    /// Allowed CORS origin; repeat for several. Any origin when absent.
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn check_storage(storage: &Arc<dyn Storage>) -> Result<()> {
    match tokio::time::timeout(Duration::from_secs(10), storage.list_users()).await {
        Ok(result) => {
            let users = result?;
            info!("✨ Storage ready (using {}, {} user(s))", storage.backend_name(), users.len());
            Ok(())
        }
        Err(_) => Err(Error::Storage("storage health check timed out".to_string())),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let storage = nr_storage::create_storage(&args.storage, Some(args.database_url.as_str())).await?;
    info!("💾 Checking storage connection...");
    check_storage(&storage).await?;

    let inference = InferenceConfig {
        api_key: args.llm_api_key.filter(|k| !k.trim().is_empty()),
        base_url: args.llm_base_url,
        model: args.llm_model,
        timeout_secs: args.llm_timeout_secs,
    };
    let agent = nr_inference::create_agent(&inference)?;
    info!("🧠 Content agent initialized (using {})", agent.name());

    let auth = AuthConfig::new(args.jwt_secret, args.token_ttl_hours)?;
    let importer = UrlImporter::new(Duration::from_secs(args.fetch_timeout_secs))?;
    let state = AppState::new(storage, agent, auth).with_importer(importer);

    let config = ServerConfig {
        bind: args.bind,
        upload_limit_bytes: args.upload_limit_mb.max(1) * 1024 * 1024,
        cors_origins: args.cors_origins,
    };
    nr_web::serve(state, config).await
}

fn status_name(detection: &FakeNewsDetection) -> String {
    serde_json::to_value(&detection.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn render_detection(detection: &FakeNewsDetection) -> String {
    let mut out = format!(
        "Score: {}/100 ({})\nConfidence: {:.2}\n{}\n",
        detection.score,
        status_name(detection),
        detection.confidence,
        detection.summary
    );
    for flag in &detection.flags {
        out.push_str(&format!("  - [{:?}] {}: {}\n", flag.severity, flag.kind, flag.description));
    }
    out
}

fn read_input(file: Option<&PathBuf>, title: Option<String>) -> Result<ExtractedArticle> {
    match file {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            let name = path.to_string_lossy();
            let mut article = nr_ingest::extract_file(&name, None, &bytes)?;
            if let Some(title) = title {
                article.title = title;
            }
            Ok(article)
        }
        None => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            Ok(ExtractedArticle {
                title: title.unwrap_or_default(),
                content,
                ..Default::default()
            })
        }
    }
}

fn detect(file: Option<PathBuf>, title: Option<String>, json: bool) -> Result<()> {
    let article = read_input(file.as_ref(), title)?;
    if article.content.trim().is_empty() {
        return Err(Error::validation("nothing to analyze"));
    }
    let detection = nr_inference::detection::analyze(&article.title, &article.content);
    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
    } else {
        print!("{}", render_detection(&detection));
    }
    Ok(())
}

async fn import(url: &str, json: bool, timeout_secs: u64) -> Result<()> {
    let importer = UrlImporter::new(Duration::from_secs(timeout_secs))?;
    let article = importer.import(url).await?;
    if json {
        let value = serde_json::json!({
            "title": article.title,
            "content": article.content,
            "summary": article.summary,
            "authors": article.authors,
            "sourceUrl": article.source_url,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}\n", article.title);
        if !article.authors.is_empty() {
            println!("By {}\n", article.authors.join(", "));
        }
        println!("{}", article.content);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Detect { file, title, json } => detect(file, title, json),
        Commands::Import { url, json, timeout_secs } => import(&url, json, timeout_secs).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "newsroom",
            "serve",
            "--jwt-secret",
            "s3cret",
            "--storage",
            "sqlite",
            "--cors-origin",
            "http://localhost:3000",
            "--cors-origin",
            "https://app.example.com",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.storage, "sqlite");
        assert_eq!(args.token_ttl_hours, 168);
        assert_eq!(args.upload_limit_mb, 10);
        assert_eq!(args.cors_origins.len(), 2);
        assert!(Cli::try_parse_from(["newsroom", "serve", "--jwt-secret", "x", "--storage", "mongo"]).is_err());
    }

    #[test]
    fn test_detect_flags() {
        let cli = Cli::try_parse_from(["newsroom", "--log-level", "debug", "detect", "story.txt", "--json"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Detect { file, json, title } => {
                assert_eq!(file, Some(PathBuf::from("story.txt")));
                assert!(json);
                assert!(title.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_render_detection() {
        let detection = nr_inference::detection::analyze("SHOCKING!!!", "You won't believe it.");
        let text = render_detection(&detection);
        assert!(text.starts_with(&format!("Score: {}/100", detection.score)));
        assert!(text.contains("sensational_language"));
    }
}
