use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use carmarket::{
    compare::{Comparison, Dimension},
    listings::ListingQuery,
    wizard::{BodyType, Budget, Equipment, FuelType, SpecificCarRequest, Wizard},
    ApiClient, ClientError, Credentials, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "carmarket", version, about = "Browse, compare and request cars from the marketplace backend")]
struct Cli {
    /// Backend base URL, overrides configuration
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token for authenticated commands, overrides configuration
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List cars, optionally filtered
    Listings {
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        condition: Option<String>,
        #[arg(long)]
        body_type: Option<String>,
        #[arg(long)]
        fuel_type: Option<String>,
    },
    /// Compare two to four listings side by side
    Compare {
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },
    /// Guided car request
    Request {
        #[arg(long)]
        budget: Budget,
        #[arg(long)]
        body_type: Option<BodyType>,
        #[arg(long)]
        fuel_type: Option<FuelType>,
        #[arg(long, value_delimiter = ',')]
        equipment: Vec<Equipment>,
        #[arg(long)]
        brand: Option<String>,
    },
    /// Request a specific make and model
    RequestSpecific {
        #[arg(long)]
        make: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Admin dashboard summary
    Dashboard,
}

// Keeps the user-facing text on top and the underlying cause below it
fn screen_error(e: ClientError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "carmarket=info".into()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut settings = match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    if let Some(base_url) = cli.base_url {
        settings.api_base_url = base_url;
        settings.validate()?;
    }
    if cli.token.is_some() {
        settings.auth_token = cli.token;
    }

    let client = ApiClient::new(&settings).context("Failed to build HTTP client")?;
    tracing::debug!(base_url = client.base_url(), "HTTP client created");
    let creds = settings.auth_token.as_deref().map(|t| Credentials::new(t, None));

    // Ctrl-C abandons whatever request is in flight
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight request");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Command::Listings { q, condition, body_type, fuel_type } => {
            let query = ListingQuery { q, condition, body_type, fuel_type };
            let listings = client.fetch_listings(&query, &cancel).await.map_err(screen_error)?;
            for listing in &listings {
                println!(
                    "{:>6}  {:<32} {:>28}  {:>9} km  {:?}",
                    listing.id,
                    listing.title(),
                    listing.price,
                    listing.mileage,
                    listing.listing_type
                );
            }
            println!("{} listing(s)", listings.len());
        }
        Command::Compare { ids } => {
            let comparison = Comparison::run(&client, &ids, settings.compare_limit, &cancel)
                .await
                .map_err(screen_error)?;
            if comparison.cars.is_empty() {
                println!("No cars selected for comparison.");
                return Ok(());
            }
            let best = &comparison.best_values;
            let mark = |dimension: Dimension, id: &str| if best.is_best(dimension, id) { "*" } else { " " };
            for car in &comparison.cars {
                println!("{}", car.title());
                println!("  Price        {} {}", mark(Dimension::Price, &car.id), car.price);
                println!("  Year         {} {}", mark(Dimension::Year, &car.id), car.year);
                println!("  Mileage      {} {} km", mark(Dimension::Mileage, &car.id), car.mileage);
                println!("  Listing Type   {:?}", car.listing_type);
            }
            tracing::debug!(source = ?comparison.source, "Best values source");
        }
        Command::Request { budget, body_type, fuel_type, equipment, brand } => {
            let mut wizard = Wizard::new();
            wizard.choose_budget(budget)?;
            match body_type {
                Some(b) => wizard.choose_body_type(b)?,
                None => wizard.skip()?,
            };
            match fuel_type {
                Some(f) => wizard.choose_fuel_type(f)?,
                None => wizard.skip()?,
            };
            for tag in equipment {
                wizard.toggle_equipment(tag)?;
            }
            wizard.finish_equipment()?;
            match brand {
                Some(b) => wizard.set_brand(&b)?,
                None => {
                    wizard.skip()?;
                }
            }
            let receipt = wizard
                .submit(&client, creds.as_ref(), &cancel)
                .await
                .context("Car request was not submitted")?;
            println!(
                "{}",
                receipt.message.unwrap_or_else(|| "Your request has been sent to our dealers.".to_string())
            );
        }
        Command::RequestSpecific { make, model } => {
            let request = SpecificCarRequest::new(&make, model.as_deref()).map_err(screen_error)?;
            let receipt = request
                .submit(&client, creds.as_ref(), &cancel)
                .await
                .map_err(screen_error)?;
            println!(
                "{}",
                receipt.message.unwrap_or_else(|| "Your request has been sent to our dealers.".to_string())
            );
        }
        Command::Dashboard => {
            let dashboard = client
                .admin_dashboard(creds.as_ref(), &cancel)
                .await
                .map_err(screen_error)?;
            let stats = &dashboard.stats;
            println!("Users             {}", stats.user_count);
            println!("Active auctions   {}", stats.active_auction_count);
            println!("For sale          {}", stats.for_sale_count);
            println!("For rent          {}", stats.for_rent_count);
            println!("Pending approval  {}", stats.pending_approval_count);
            for car in &dashboard.pending_approvals {
                println!("  #{} {} {} {} (owner: {})", car.id, car.year, car.make, car.model, car.owner.username);
            }
        }
    }

    Ok(())
}
