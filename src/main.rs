use anyhow::Context;
use arqia_lib::browse::run_browse;
use arqia_lib::commands::{self, AppContext, Credentials, ListRequest};
use arqia_lib::config::{self, Config};
use arqia_lib::error::{ApiError, DETAIL_LOAD_ERROR, LIST_LOAD_ERROR, UPLOAD_ERROR};
use arqia_lib::models::{DocumentFilters, FilterField, PageSize, SortKey};
use arqia_lib::render;
use arqia_lib::services::detail_poller::PollOutcome;
use arqia_lib::session::Session;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "arqia", version, about = "Client for the ARQIA document analysis service")]
struct Cli {
    #[command(flatten)]
    auth: AuthArgs,

    /// Print JSON instead of the text view.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct AuthArgs {
    #[arg(long, env = "ARQIA_USERNAME", global = true)]
    username: Option<String>,

    #[arg(long, env = "ARQIA_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Access token from a previous `arqia login`.
    #[arg(long, env = "ARQIA_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    #[arg(long, env = "ARQIA_REFRESH_TOKEN", hide_env_values = true, global = true)]
    refresh_token: Option<String>,
}

impl From<AuthArgs> for Credentials {
    fn from(args: AuthArgs) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Credentials {
            access_token: present(args.access_token),
            refresh_token: present(args.refresh_token),
            username: present(args.username),
            password: present(args.password),
        }
    }
}

#[derive(Debug, Args)]
struct FilterArgs {
    #[arg(long)]
    cnpj: Option<String>,
    #[arg(long)]
    supplier: Option<String>,
    /// Issue/submission date lower bound (YYYY-MM-DD).
    #[arg(long)]
    from: Option<String>,
    /// Issue/submission date upper bound, inclusive.
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    min: Option<String>,
    #[arg(long)]
    max: Option<String>,
    #[arg(long)]
    invoice: Option<String>,
}

impl From<FilterArgs> for DocumentFilters {
    fn from(args: FilterArgs) -> Self {
        let mut filters = DocumentFilters::default();
        let pairs = [
            (FilterField::Cnpj, args.cnpj),
            (FilterField::Supplier, args.supplier),
            (FilterField::DateFrom, args.from),
            (FilterField::DateTo, args.to),
            (FilterField::AmountMin, args.min),
            (FilterField::AmountMax, args.max),
            (FilterField::InvoiceNumber, args.invoice),
        ];
        for (field, value) in pairs {
            if let Some(value) = value {
                filters.set(field, value.trim());
            }
        }
        filters
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in and print tokens to reuse through the environment.
    Login,

    /// Send a PDF for analysis.
    Upload {
        file: PathBuf,
        /// Category slug (see `arqia categories`).
        #[arg(long, short)]
        category: String,
        /// Follow the analysis until it finishes.
        #[arg(long)]
        wait: bool,
    },

    /// List the upload categories.
    Categories,

    /// Show one page of submitted documents.
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "date_desc")]
        sort: SortKey,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value = "10")]
        page_size: PageSize,
    },

    /// Show one document.
    Show { id: String },

    /// Show one document and refresh it until its analysis finishes (Ctrl-C stops).
    Watch { id: String },

    /// Browse the document list interactively.
    Browse,
}

/// Log the detail and keep only the message meant for the user.
fn surface(e: ApiError, fallback: &str) -> anyhow::Error {
    tracing::debug!(error = ?e, "request failed");
    anyhow::anyhow!(e.user_message(fallback))
}

async fn session(ctx: &AppContext, creds: &Credentials) -> anyhow::Result<Session> {
    commands::resolve_session(ctx, creds).await.map_err(|e| {
        if e.is_unauthenticated() {
            anyhow::anyhow!(
                "{} Set ARQIA_ACCESS_TOKEN, or ARQIA_USERNAME and ARQIA_PASSWORD.",
                e
            )
        } else {
            surface(e, "Login failed.")
        }
    })
}

async fn watch(ctx: &AppContext, session: &Session, id: &str, json: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut last = String::new();
    let outcome = commands::watch_document(ctx, session, id, &cancel, |state| {
        let text = if json {
            state
                .document
                .as_ref()
                .and_then(|doc| render::to_json(doc).ok())
                .unwrap_or_default()
        } else {
            render::render_detail(state)
        };
        if !text.is_empty() && text != last {
            if !last.is_empty() {
                println!();
            }
            println!("{}", text);
            last = text;
        }
    })
    .await;
    ctrl_c.abort();

    match outcome {
        PollOutcome::Settled(_) => Ok(()),
        PollOutcome::AttemptsExhausted(_) => {
            eprintln!(
                "Still processing after {} checks; run `arqia watch {}` to keep waiting.",
                ctx.config.poll_max_attempts, id
            );
            Ok(())
        }
        PollOutcome::FetchFailed(message) => Err(anyhow::anyhow!(message)),
        PollOutcome::Cancelled => {
            eprintln!("Stopped.");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_env();
    arqia_lib::init_tracing();
    let cli = Cli::parse();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    if let Commands::Categories = cli.command {
        println!("{}", render::render_categories());
        return Ok(());
    }

    let config = Config::from_env().context("configuration")?;
    let ctx = AppContext::new(config).context("HTTP client")?;
    let creds = Credentials::from(cli.auth);
    let json = cli.json;

    match cli.command {
        Commands::Categories => {}
        Commands::Login => {
            let username = creds.username.as_deref().unwrap_or_default();
            let password = creds.password.as_deref().unwrap_or_default();
            let session = commands::login(&ctx, username, password)
                .await
                .map_err(|e| surface(e, "Login failed."))?;
            if json {
                let body = serde_json::json!({
                    "username": session.username,
                    "access": session.access,
                    "refresh": session.refresh,
                });
                println!("{}", render::to_json(&body)?);
            } else {
                println!("ARQIA_ACCESS_TOKEN={}", session.access);
                println!("ARQIA_REFRESH_TOKEN={}", session.refresh);
            }
        }
        Commands::Upload {
            file,
            category,
            wait,
        } => {
            let session = session(&ctx, &creds).await?;
            let receipt = commands::upload(&ctx, &session, &file, &category)
                .await
                .map_err(|e| surface(e, UPLOAD_ERROR))?;
            if json {
                println!("{}", render::to_json(&receipt)?);
            } else {
                println!("Submitted as document {}", receipt.document_id);
            }
            if wait {
                watch(&ctx, &session, &receipt.document_id, json).await?;
            }
        }
        Commands::List {
            filters,
            sort,
            page,
            page_size,
        } => {
            let session = session(&ctx, &creds).await?;
            let request = ListRequest {
                filters: filters.into(),
                sort,
                page_size,
                page,
            };
            let view = commands::list(&ctx, &session, &request)
                .await
                .map_err(|e| surface(e, LIST_LOAD_ERROR))?;
            if json {
                println!("{}", render::to_json(&view)?);
            } else {
                println!("{}", render::render_list(&view, &request.filters));
            }
        }
        Commands::Show { id } => {
            let session = session(&ctx, &creds).await?;
            let doc = commands::show(&ctx, &session, &id)
                .await
                .map_err(|e| surface(e, DETAIL_LOAD_ERROR))?;
            if json {
                println!("{}", render::to_json(&doc)?);
            } else {
                println!("{}", render::render_document(&doc));
            }
        }
        Commands::Watch { id } => {
            let session = session(&ctx, &creds).await?;
            watch(&ctx, &session, &id, json).await?;
        }
        Commands::Browse => {
            let session = session(&ctx, &creds).await?;
            println!("{}", arqia_lib::browse::HELP);
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            run_browse(
                &ctx.api.with_session(&session),
                stdin,
                &mut stdout,
                ctx.config.debounce,
            )
            .await?;
        }
    }
    Ok(())
}
