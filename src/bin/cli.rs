use anyhow::Context;
use bltnm::{
    client::CsrfTokenClient,
    config::app::DEFAULT_ROOT_DOMAIN,
    db,
    middleware::{HostRouter, RouteDecision},
    repositories::{OrderRepository, SqliteOrderRepository},
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bltnm-cli")]
#[command(about = "Operator tooling for the bltnm gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a request would be routed by host
    Route {
        /// Host header value, e.g. shop.bltnm.store
        #[arg(long)]
        host: String,

        /// Request path
        #[arg(long, default_value = "/")]
        path: String,

        /// Query string without the leading '?'
        #[arg(short, long)]
        query: Option<String>,

        /// Root domain the router is configured for
        #[arg(long, env = "ROOT_DOMAIN", default_value = DEFAULT_ROOT_DOMAIN)]
        root_domain: String,
    },

    /// Fetch a CSRF token from a running gateway
    Token {
        /// Base URL of the gateway, e.g. http://127.0.0.1:8080
        #[arg(long)]
        base_url: String,
    },

    /// Order inspection commands
    Orders {
        #[command(subcommand)]
        command: OrderCommands,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// List the most recently updated orders
    List {
        /// Maximum number of orders to display
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

fn describe(decision: &RouteDecision) -> String {
    match decision {
        RouteDecision::Passthrough => "passthrough (no change)".to_string(),
        RouteDecision::Rewrite(path) => format!("rewrite -> {}", path),
        RouteDecision::Redirect(location) => format!("redirect -> {}", location),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Route {
            host,
            path,
            query,
            root_domain,
        } => {
            let router = HostRouter::for_domain(&root_domain);
            let decision = router.resolve(&host, &path, query.as_deref());
            println!("{}{}: {}", host, path, describe(&decision));
        }

        Commands::Token { base_url } => {
            let client = CsrfTokenClient::new(&base_url)?;
            let token = client
                .try_get_token()
                .await
                .with_context(|| format!("fetching CSRF token from {}", base_url))?;
            println!("{}", token);
        }

        Commands::Orders { command } => match command {
            OrderCommands::List { limit } => {
                let pool = db::create_pool_from_env().await?;
                db::run_migrations(&pool).await?;
                let repository = SqliteOrderRepository::new(pool);

                let orders = repository.list_recent(limit).await?;
                if orders.is_empty() {
                    println!("No orders found.");
                } else {
                    println!(
                        "{:<5} {:<36} {:<10} {:<30} {:<20}",
                        "ID", "Checkout", "Status", "Customer", "Updated"
                    );
                    println!("{}", "-".repeat(105));
                    for order in orders {
                        println!(
                            "{:<5} {:<36} {:<10} {:<30} {:<20}",
                            order.id,
                            order.checkout_id,
                            order.status,
                            order.customer_email.as_deref().unwrap_or("N/A"),
                            order.updated_at
                        );
                    }
                }
            }
        },
    }

    Ok(())
}
