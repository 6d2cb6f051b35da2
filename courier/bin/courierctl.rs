//! Command-line utility for managing a running Courier engine.
//!
//! Sends control commands over the engine's Unix socket:
//! - admission reservation (`reserve`)
//! - campaign dispatch (`dispatch`, `tick`)
//! - bulk job processing (`job`)
//! - health and status (`ping`, `status`)

use clap::{Parser, Subcommand};
use courier_control::{
    Command, ControlClient, DEFAULT_CONTROL_SOCKET, ResponseData, ResponsePayload,
};

/// Manage the Courier delivery engine.
#[derive(Parser, Debug)]
#[command(name = "courierctl")]
#[command(about = "Manage the Courier delivery engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the control socket.
    #[arg(short = 'c', long, default_value = DEFAULT_CONTROL_SOCKET)]
    control_socket: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reserve send admission against the global quotas.
    Reserve {
        /// Number of sends to request.
        requested: u32,
    },
    /// Dispatch one campaign now, regardless of its schedule.
    Dispatch {
        /// Campaign to dispatch.
        campaign_id: String,
    },
    /// Dispatch every due campaign.
    Tick,
    /// Claim and process at most one due bulk job.
    Job,
    /// Check that the engine is responding.
    Ping,
    /// Engine status and statistics.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Reserve { requested } => Command::Reserve { requested },
        Commands::Dispatch { campaign_id } => Command::Dispatch { campaign_id },
        Commands::Tick => Command::Tick,
        Commands::Job => Command::ProcessJob,
        Commands::Ping => Command::Ping,
        Commands::Status => Command::Status,
    };

    let client = ControlClient::new(cli.control_socket);
    let response = client.send(command).await?;

    match response.payload {
        ResponsePayload::Ok => println!("OK"),
        ResponsePayload::Error(message) => {
            eprintln!("Error: {message}");
            std::process::exit(1);
        }
        ResponsePayload::Data(data) => match *data {
            ResponseData::Admission(admission) => println!("{admission}"),
            ResponseData::Dispatch(summary) => println!("{summary}"),
            ResponseData::Tick(summaries) => {
                if summaries.is_empty() {
                    println!("No campaigns due");
                } else {
                    for summary in summaries {
                        println!("{summary}");
                    }
                }
            }
            ResponseData::Job(Some(summary)) => println!("{summary}"),
            ResponseData::Job(None) => println!("No jobs due"),
            ResponseData::Status(status) => println!("{status}"),
        },
    }

    Ok(())
}
