use anyhow::Result;
use clap::Parser;
use ukcompanies::CompaniesHouseClient;
use ukcompanies::commands::{self, SearchKind};
use ukcompanies::config::Config;
use ukcompanies::runtime::{RealRuntime, Runtime};

/// ukcompanies - Companies House API client
///
/// Search and look up companies registered in the UK.
///
/// Settings are read from COMPANIES_HOUSE_API_KEY, COMPANIES_HOUSE_BASE_URL,
/// COMPANIES_HOUSE_MAX_RETRIES and COMPANIES_HOUSE_TIMEOUT; the flags below
/// take precedence. Rate-limited and failed requests are retried
/// automatically.
///
/// Examples:
///   ukcompanies search "acme"            # Search companies
///   ukcompanies company 00006400          # Show a company profile
#[derive(Parser, Debug)]
#[command(author, version = env!("UKCOMPANIES_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Companies House API key (overrides COMPANIES_HOUSE_API_KEY)
    #[arg(long = "api-key", value_name = "KEY", global = true)]
    pub api_key: Option<String>,

    /// API base URL (overrides COMPANIES_HOUSE_BASE_URL)
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Retries for rate-limited and failed requests (overrides COMPANIES_HOUSE_MAX_RETRIES)
    #[arg(long = "max-retries", value_name = "N", global = true)]
    pub max_retries: Option<u32>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Search for companies or officers
    Search(SearchArgs),

    /// Walk every page of a combined search
    SearchAll(SearchAllArgs),

    /// Show a company profile
    Company(CompanyArgs),

    /// Show a company's registered office address
    Address(CompanyArgs),
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search terms
    pub query: String,

    /// What to search for
    #[arg(long, value_enum, default_value_t = SearchKind::Companies)]
    pub kind: SearchKind,

    /// Results per page (1-100)
    #[arg(long = "per-page", value_name = "N")]
    pub per_page: Option<u32>,

    /// Index of the first result
    #[arg(long = "start-index", value_name = "N", default_value_t = 0)]
    pub start_index: u32,
}

#[derive(clap::Args, Debug)]
pub struct SearchAllArgs {
    /// Search terms
    pub query: String,

    /// Results per page (1-100)
    #[arg(long = "per-page", value_name = "N")]
    pub per_page: Option<u32>,

    /// Stop after this many pages
    #[arg(long = "max-pages", value_name = "N")]
    pub max_pages: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct CompanyArgs {
    /// Company number, e.g. 00006400 or SC123456
    #[arg(value_name = "NUMBER")]
    pub number: String,
}

fn build_config<R: Runtime>(cli: &Cli, runtime: &R) -> Result<Config> {
    Config::load(
        runtime,
        cli.api_key.clone(),
        cli.base_url.clone(),
        cli.max_retries,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = build_config(&cli, &RealRuntime)?;
    let client = CompaniesHouseClient::new(config)?.with_on_retry(|attempt, error| {
        log::warn!("Retrying (attempt {}) after: {}", attempt, error);
    });
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Search(args) => {
            commands::search(
                &client,
                &mut out,
                &args.query,
                args.kind,
                args.per_page,
                args.start_index,
            )
            .await?
        }
        Commands::SearchAll(args) => {
            commands::search_all(&client, &mut out, &args.query, args.per_page, args.max_pages)
                .await?
        }
        Commands::Company(args) => commands::company(&client, &mut out, &args.number).await?,
        Commands::Address(args) => commands::address(&client, &mut out, &args.number).await?,
    }
    Ok(())
}
