//! Discover and power-cycle SteamVR lighthouses over Bluetooth LE.

mod logging;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info};

use lighthouse_ble::{
    discover, run_command, BtleplugTransport, Generation, LighthouseDescriptor, PowerCommand,
    DEFAULT_MAX_ATTEMPTS,
};

#[derive(Parser)]
#[command(name = "lighthouse-keeper")]
#[command(about = "Discover and control SteamVR lighthouses")]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Display the version number
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Print out additional information for debugging purposes
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for lighthouses and print their MAC addresses
    Discover {
        /// Only look for lighthouses of this generation (1 or 2)
        generation: Option<Generation>,
    },
    /// Switch lighthouses on
    On {
        /// The generation of the lighthouses (1 or 2)
        generation: Generation,
        /// One or more lighthouse MAC addresses
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Switch lighthouses off
    Off {
        /// The generation of the lighthouses (1 or 2)
        generation: Generation,
        /// One or more lighthouse MAC addresses
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init(cli.debug);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> lighthouse_ble::Result<()> {
    let transport = BtleplugTransport::new();

    match command {
        Commands::Discover { generation } => run_discover(&transport, generation).await,
        Commands::On {
            generation,
            addresses,
        } => switch(&transport, generation, PowerCommand::On, &addresses).await,
        Commands::Off {
            generation,
            addresses,
        } => switch(&transport, generation, PowerCommand::Off, &addresses).await,
    }
}

async fn run_discover(
    transport: &BtleplugTransport,
    generation: Option<Generation>,
) -> lighthouse_ble::Result<()> {
    info!("Searching for lighthouses, this may take several minutes.");

    let lighthouses = discover(transport, generation).await?;

    if lighthouses.is_empty() {
        info!("No lighthouses found.");
        return Ok(());
    }

    info!("Finished.");

    let addresses: Vec<String> = lighthouses
        .iter()
        .map(|lighthouse| lighthouse.address.to_string())
        .collect();

    println!();
    println!("If you are using MixedVR Manager, copy the following line to your config.bat:");
    println!();
    println!("set lighthouseMACAddressList={}", addresses.join(" "));

    Ok(())
}

async fn switch(
    transport: &BtleplugTransport,
    generation: Generation,
    command: PowerCommand,
    addresses: &[String],
) -> lighthouse_ble::Result<()> {
    // Validate every address before touching the radio; a bad one aborts
    // the whole run.
    let lighthouses = addresses
        .iter()
        .map(|address| LighthouseDescriptor::new(address, generation))
        .collect::<lighthouse_ble::Result<Vec<_>>>()?;

    for lighthouse in &lighthouses {
        run_command(transport, lighthouse, command, DEFAULT_MAX_ATTEMPTS).await;
    }

    Ok(())
}
