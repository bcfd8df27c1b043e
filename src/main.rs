use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use salond::cli::{self, BookArgs, OutputFormat};
use salond::schedule::{EngineConfig, StaffPolicy, DEFAULT_SLOT_STEP_MINUTES};

#[derive(Parser)]
#[command(name = "salond")]
#[command(about = "Appointment scheduling for salons and barbershops", version)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Shop to act on (defaults to the one set with `config shop`)
    #[arg(long, global = true)]
    shop: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(long, env = "SALOND_PORT", default_value = "8080")]
        port: u16,
        /// Database file path
        #[arg(long, env = "SALOND_DB", default_value = "./salond.db")]
        db: String,
        /// Spacing between candidate start times, in minutes
        #[arg(long, env = "SALOND_SLOT_STEP", default_value_t = DEFAULT_SLOT_STEP_MINUTES)]
        slot_step: u32,
        /// What to do when a booking names no staff member
        #[arg(long, env = "SALOND_STAFF_POLICY", value_enum, default_value_t = StaffPolicy::AutoAssign)]
        staff_policy: StaffPolicy,
    },
    /// Load shops, staff, services and customers from a JSON file
    Seed {
        /// Database file path
        #[arg(long, env = "SALOND_DB", default_value = "./salond.db")]
        db: String,
        /// Fixture file
        #[arg(long)]
        file: PathBuf,
    },
    /// List free start times for a set of services
    Slots {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Comma-separated service IDs
        #[arg(long)]
        services: String,
        /// Only this staff member
        #[arg(long)]
        staff: Option<String>,
    },
    /// Create a booking
    Book {
        /// Customer ID
        #[arg(long)]
        customer: String,
        /// Comma-separated service IDs
        #[arg(long)]
        services: String,
        /// Staff member (omit to let the server assign one)
        #[arg(long)]
        staff: Option<String>,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Start time (HH:mm)
        #[arg(long)]
        start: String,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Book as a self-service online booking (auto-confirmed)
        #[arg(long)]
        online: bool,
    },
    /// List bookings of a day
    Bookings {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },
    /// Show a booking
    Show {
        /// Booking ID, or booking code with --code
        id: String,
        /// Look up by booking code
        #[arg(long)]
        code: bool,
    },
    /// Cancel a booking
    Cancel {
        /// Booking ID
        id: String,
    },
    /// Change a booking's status
    Status {
        /// Booking ID
        id: String,
        /// New status: confirmed, completed, cancelled or no_show
        status: String,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set server URL
    Server {
        /// Server URL
        url: String,
    },
    /// Set the default shop
    Shop {
        /// Shop ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("salond=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let shop = cli.shop.as_deref();

    match cli.command {
        Commands::Serve {
            port,
            db,
            slot_step,
            staff_policy,
        } => {
            let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
            let config = EngineConfig {
                slot_step_minutes: slot_step,
                staff_policy,
            };
            salond::server::run_server(addr, &db, config).await?;
        }
        Commands::Seed { db, file } => {
            cli::run_seed(&db, &file, format)?;
        }
        Commands::Slots {
            date,
            services,
            staff,
        } => {
            cli::run_slots(shop, &date, &services, staff.as_deref(), format).await?;
        }
        Commands::Book {
            customer,
            services,
            staff,
            date,
            start,
            notes,
            online,
        } => {
            let args = BookArgs {
                customer: &customer,
                services: &services,
                staff: staff.as_deref(),
                date: &date,
                start: &start,
                notes: notes.as_deref(),
                online,
            };
            cli::run_book(shop, args, format).await?;
        }
        Commands::Bookings { date } => {
            cli::run_bookings(shop, &date, format).await?;
        }
        Commands::Show { id, code } => {
            cli::run_show(shop, &id, code, format).await?;
        }
        Commands::Cancel { id } => {
            cli::run_cancel(shop, &id, format).await?;
        }
        Commands::Status { id, status } => {
            cli::run_status(shop, &id, &status, format).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                cli::run_config_show(format)?;
            }
            ConfigAction::Server { url } => {
                cli::run_config_server(&url, format)?;
            }
            ConfigAction::Shop { id } => {
                cli::run_config_shop(&id, format)?;
            }
        },
    }

    Ok(())
}
