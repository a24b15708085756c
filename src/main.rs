use anyhow::Result;
use clap::{Parser, Subcommand};
use guides::build::{build_site, head_tags, load_content, Manifest};
use guides::config::Config;
use guides::routes::{create_routes, MemoryArtifactStore};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "guides")]
#[command(about = "Index markdown guides into listings, tag pages, and feeds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing `guides.yaml` (or any of its subdirectories)
    #[arg(short, long, default_value = ".", global = true)]
    site: PathBuf,

    /// Directory receiving the generated feeds
    #[arg(short, long, default_value = "build", global = true)]
    out: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the guides and write routes, metadata, and feeds
    Build,

    /// Print the indexed guides, newest first
    List,

    /// Print the route manifest without writing anything
    Routes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let config = Config::from_directory(&cli.site, &cli.out)?;

    match cli.command {
        Commands::Build => {
            let summary = build_site(&config)?;
            tracing::info!(
                posts = summary.posts,
                routes = summary.routes,
                feeds = summary.feeds.len(),
                "build complete"
            );
        }
        Commands::List => match load_content(&config)? {
            None => println!("no guides at {}", config.content_path.display()),
            Some(content) => {
                for post in &content.posts {
                    println!(
                        "{}  {}  {}",
                        post.date.format("%Y-%m-%d"),
                        post.permalink,
                        post.title
                    );
                }
            }
        },
        Commands::Routes => {
            if let Some(content) = load_content(&config)? {
                let store = MemoryArtifactStore::new(&config.generated_directory.join("guides"));
                let routes = create_routes(&config, &content, &store)?;
                let manifest = Manifest {
                    routes: &routes,
                    head_tags: &head_tags(&config),
                };
                println!("{}", serde_json::to_string_pretty(&manifest)?);
            }
        }
    }

    Ok(())
}
