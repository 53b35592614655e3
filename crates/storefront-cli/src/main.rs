//! Storefront CLI - a command-line client for the storefront backend.
//!
//! Logs in, keeps the session alive across invocations through the
//! configured token store, and browses the product catalogue.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_core::auth::SessionState;
use storefront_core::config::{Config, TokenStoreKind, APP_NAME};
use storefront_core::models::{
    LoginRequest, Product, ProductFilters, ProductSortColumn, RegisterRequest, SortDirection,
};
use storefront_core::utils::{format_remaining, truncate_string};
use storefront_core::{ApiError, AuthError, Storefront};

/// Width of the product name column in listings
const NAME_COLUMN_WIDTH: usize = 32;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Command-line client for the storefront backend")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides config and STOREFRONT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where to keep tokens for this run
    #[arg(long, global = true, value_enum)]
    store: Option<StoreArg>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Also write logs to a daily file under the cache directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email (defaults to the last one used)
        email: Option<String>,
    },
    /// Create an account and log in
    Register { username: String, email: String },
    /// End the session and forget the stored tokens
    Logout,
    /// Show the session state and token lifetime
    Status,
    /// Show the identity claims of the current access token
    Whoami,
    /// Exchange the refresh token for a new pair
    Refresh,
    /// Revoke a refresh token (the stored one by default)
    Revoke { token: Option<String> },
    /// Browse the product catalogue
    #[command(subcommand)]
    Products(ProductsCommand),
}

#[derive(Subcommand)]
enum ProductsCommand {
    /// List products
    List(ListArgs),
    /// List products owned by the logged-in user
    Mine(ListArgs),
    /// Show a single product
    Show { id: i64 },
    /// List product categories
    Categories,
    /// Search products by name or code
    Search {
        query: String,
        #[command(flatten)]
        list: ListArgs,
    },
}

#[derive(clap::Args)]
struct ListArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
    #[arg(long)]
    desc: bool,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    page_size: Option<u32>,
}

impl ListArgs {
    fn filters(&self) -> ProductFilters {
        ProductFilters {
            category: self.category.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            sort_by: self.sort.map(ProductSortColumn::from),
            sort_direction: self
                .sort
                .map(|_| if self.desc { SortDirection::Desc } else { SortDirection::Asc }),
            page: self.page,
            page_size: self.page_size,
            ..ProductFilters::default()
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Price,
    Created,
}

impl From<SortArg> for ProductSortColumn {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => ProductSortColumn::Name,
            SortArg::Price => ProductSortColumn::Price,
            SortArg::Created => ProductSortColumn::CreatedDate,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreArg {
    Keyring,
    File,
    Memory,
}

impl From<StoreArg> for TokenStoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Keyring => TokenStoreKind::Keyring,
            StoreArg::File => TokenStoreKind::File,
            StoreArg::Memory => TokenStoreKind::Memory,
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file and must live until exit.
fn init_tracing(log_file: bool) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = if log_file {
        let dir = log_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(&dir, "storefront.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

fn log_dir() -> Result<PathBuf> {
    let cache_dir =
        dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
    Ok(cache_dir.join(APP_NAME).join("logs"))
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    match (input.is_empty(), default) {
        (true, Some(value)) => Ok(value.to_string()),
        (true, None) => bail!("{} is required", label),
        (false, _) => Ok(input.to_string()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_products(products: &[Product], json: bool) -> Result<()> {
    if json {
        return print_json(&products);
    }
    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }
    for product in products {
        println!(
            "{:>6}  {:<width$}  {:<14}  {:>5}  {}",
            product.id,
            truncate_string(&product.name, NAME_COLUMN_WIDTH),
            product.category,
            product.quantity,
            product.display_price(),
            width = NAME_COLUMN_WIDTH,
        );
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(store) = cli.store {
        config.token_store = store.into();
    }
    debug!(base_url = %config.api_base_url, "Loaded configuration");

    let storefront = Storefront::connect(config)?;
    let session = &storefront.session;

    match cli.command {
        Commands::Login { email } => {
            let email = match email {
                Some(email) => email,
                None => prompt("Email", storefront.config.last_email.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let response = session.login(&LoginRequest::new(email.clone(), password)).await?;

            let remembered =
                Config::config_path().and_then(|path| Config::remember_email(&path, &email));
            if let Err(e) = remembered {
                error!(error = %e, "Failed to save config");
            }
            let name = response
                .user
                .as_ref()
                .map(|u| u.display_name().to_string())
                .unwrap_or(email);
            println!("Logged in as {}.", name);
        }
        Commands::Register { username, email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            session
                .register(&RegisterRequest::new(username.clone(), email, password))
                .await?;
            println!("Registered and logged in as {}.", username);
        }
        Commands::Logout => {
            session.logout().await;
            println!("Logged out.");
        }
        Commands::Status => {
            let state = session.state();
            let claims = session.claims();
            if cli.json {
                return print_json(&serde_json::json!({
                    "state": format!("{:?}", state),
                    "authenticated": session.is_authenticated(),
                    "hasRefreshToken": session.has_refresh_token(),
                    "claims": claims,
                }));
            }
            println!("Backend:  {}", storefront.config.api_base_url);
            println!("State:    {:?}", state);
            match claims {
                Some(claims) => println!(
                    "Access:   valid, expires in {}",
                    format_remaining(claims.time_until_expiry())
                ),
                None if state == SessionState::Authenticated => {
                    println!("Access:   expired, will refresh on next request")
                }
                None => println!("Access:   none"),
            }
            println!(
                "Refresh:  {}",
                if session.has_refresh_token() { "stored" } else { "none" }
            );
        }
        Commands::Whoami => {
            let Some(claims) = session.claims() else {
                bail!("Not logged in (or access token expired); run `storefront login`");
            };
            if cli.json {
                return print_json(&claims);
            }
            println!("Subject:  {}", claims.subject.as_deref().unwrap_or("-"));
            println!("Email:    {}", claims.email.as_deref().unwrap_or("-"));
            let roles: Vec<&str> = claims.roles.iter().map(String::as_str).collect();
            println!("Roles:    {}", if roles.is_empty() { "-".to_string() } else { roles.join(", ") });
            println!("Expires:  {}", claims.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        Commands::Refresh => {
            session.refresh().await?;
            match session.claims() {
                Some(claims) => println!(
                    "Session refreshed, expires in {}.",
                    format_remaining(claims.time_until_expiry())
                ),
                None => println!("Session refreshed."),
            }
        }
        Commands::Revoke { token } => {
            let own = token.is_none();
            session.revoke_refresh_token(token.as_deref()).await?;
            if own {
                println!("Refresh token revoked; logged out.");
            } else {
                println!("Refresh token revoked.");
            }
        }
        Commands::Products(command) => run_products(&storefront, command, cli.json).await?,
    }

    Ok(())
}

async fn run_products(storefront: &Storefront, command: ProductsCommand, json: bool) -> Result<()> {
    let products = &storefront.products;
    match command {
        ProductsCommand::List(args) => print_products(&products.list(&args.filters()).await?, json),
        ProductsCommand::Mine(args) => print_products(&products.mine(&args.filters()).await?, json),
        ProductsCommand::Search { query, list } => {
            print_products(&products.search(&query, &list.filters()).await?, json)
        }
        ProductsCommand::Show { id } => {
            let product = products.get(id).await?;
            if json {
                return print_json(&product);
            }
            println!("{} ({})", product.name, product.product_code);
            println!("Category: {}", product.category);
            println!("Price:    {}", product.display_price());
            println!(
                "Stock:    {}",
                if product.in_stock() { product.quantity.to_string() } else { "out of stock".to_string() }
            );
            if !product.created_by.is_empty() {
                println!("Seller:   {}", product.created_by);
            }
            Ok(())
        }
        ProductsCommand::Categories => {
            let categories = products.categories().await?;
            if json {
                return print_json(&categories);
            }
            for category in categories {
                println!("{}", category);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file)?;
    info!("Storefront CLI starting");

    if let Err(e) = run(cli).await {
        if let Some(redirect) = e.downcast_ref::<ApiError>().and_then(ApiError::login_redirect) {
            error!(location = %redirect.location(), "Login required");
            eprintln!("Session expired. Run `storefront login` and try again.");
        } else {
            eprintln!("Error: {:#}", e);
            if e.downcast_ref::<AuthError>().is_some_and(AuthError::requires_login) {
                eprintln!("Run `storefront login` to start a new session.");
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
