//! # Targeting Finder CLI (`tfind`)
//!
//! ## Usage
//!
//! ```bash
//! tfind --config ./config/tfind.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tfind serve` | Start the taxonomy proxy server |
//! | `tfind search <category> "<query>"` | Run one search and print the results |
//! | `tfind suggest <category> "<query>"` | Show the suggestion dropdown for a query |
//! | `tfind shell` | Interactive search session |
//! | `tfind consult …` | Submit the contact form |
//!
//! ## Examples
//!
//! ```bash
//! # Run the proxy (needs META_ACCESS_TOKEN)
//! tfind serve --config ./config/tfind.toml
//!
//! # Search interests in the US and export every result
//! tfind search interests "coffee" --country US --export csv --output targeting.csv
//!
//! # Use a running proxy instead of calling the Graph API directly
//! tfind shell --server http://127.0.0.1:3000
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use targeting_finder::config;
use targeting_finder::search::{ExportArgs, SearchArgs};
use targeting_finder::{lead, search, server, session};
use targeting_finder_core::export::ExportFormat;
use targeting_finder_core::lead::{LeadForm, PhoneContact};
use targeting_finder_core::models::{Category, EducationKind};

/// Targeting Finder: search Meta Ads targeting taxonomies, collect an
/// audience, and export it.
#[derive(Parser)]
#[command(
    name = "tfind",
    about = "Targeting Finder: search Meta Ads targeting taxonomies and export audiences",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/tfind.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/tfind.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the search commands.
#[derive(clap::Args, Clone, Default)]
struct FilterArgs {
    /// Country filter for interests (two-letter code, or ALL).
    #[arg(long)]
    country: Option<String>,

    /// Education sub-type: major or school.
    #[arg(long)]
    education: Option<EducationKind>,

    /// Use a running proxy server instead of calling the Graph API directly.
    #[arg(long)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the taxonomy proxy server.
    ///
    /// Binds to `[server].bind` unless `--bind` is given.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run one search and print the results table.
    Search {
        /// interests, behaviors, jobtitles, employers, education, or industry.
        category: Category,
        query: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Result limit, clamped into 1-500.
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<i64>,

        /// Add every result to the selection and print it.
        #[arg(long)]
        add_all: bool,

        /// Export all results as csv or json.
        #[arg(long)]
        export: Option<ExportFormat>,

        /// Export destination (defaults to stdout).
        #[arg(long, requires = "export")]
        output: Option<PathBuf>,
    },

    /// Show the suggestion dropdown for a query.
    Suggest {
        category: Category,
        query: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Interactive search session.
    Shell {
        /// Starting category.
        #[arg(long, default_value = "interests")]
        category: Category,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Submit the contact form.
    ///
    /// At least one of --email, --call, or --whatsapp is required.
    Consult {
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, default_value = "")]
        service: String,
        #[arg(long, default_value = "")]
        message: String,

        #[arg(long)]
        email: Option<String>,
        /// Phone number for a call back.
        #[arg(long)]
        call: Option<String>,
        #[arg(long)]
        whatsapp: Option<String>,
        /// Dialing code for --call and --whatsapp.
        #[arg(long, default_value = "+91", allow_hyphen_values = true)]
        dial_code: String,

        /// Submit through a running proxy server's /consult endpoint.
        #[arg(long)]
        server: Option<String>,
    },
}

impl FilterArgs {
    fn into_search_args(self, limit: Option<i64>) -> SearchArgs {
        SearchArgs {
            country: self.country,
            education: self.education,
            limit,
            server: self.server,
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let is_serve = matches!(cli.command, Commands::Serve { .. });
    init_tracing(if is_serve { "info" } else { "warn" });

    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
        Commands::Search {
            category,
            query,
            filters,
            limit,
            add_all,
            export,
            output,
        } => {
            let args = filters.into_search_args(limit);
            let export = export.map(|format| ExportArgs {
                format,
                output: output.as_deref(),
            });
            search::run_search(&cfg, category, &query, &args, add_all, export).await?;
        }
        Commands::Suggest {
            category,
            query,
            filters,
        } => {
            search::run_suggest(&cfg, category, &query, &filters.into_search_args(None)).await?;
        }
        Commands::Shell { category, filters } => {
            session::run_shell(&cfg, category, &filters.into_search_args(None)).await?;
        }
        Commands::Consult {
            first_name,
            last_name,
            company,
            service,
            message,
            email,
            call,
            whatsapp,
            dial_code,
            server,
        } => {
            let form = LeadForm {
                first_name,
                last_name,
                company,
                service,
                message,
                email,
                call: call.map(|n| PhoneContact::new(dial_code.clone(), n)),
                whatsapp: whatsapp.map(|n| PhoneContact::new(dial_code.clone(), n)),
            };
            lead::run_consult(&cfg, &form, server.as_deref()).await?;
        }
    }

    Ok(())
}
