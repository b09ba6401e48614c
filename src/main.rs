use std::{error::Error, time::Duration};

use clap::{Parser, Subcommand};
use log::info;
use squad_rcon::{Population, ServerConnectionInfo, SquadServer};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server host name or IP address
    #[arg(short = 'H', long, env = "SQUAD_RCON_HOST", default_value = "127.0.0.1")]
    host: String,
    /// Rcon port
    #[arg(short, long, env = "SQUAD_RCON_PORT", default_value = "21114")]
    port: u16,
    /// Rcon password
    #[arg(short = 'P', long, env = "SQUAD_RCON_PASSWORD", hide_env_values = true)]
    password: String,
    /// Seconds any single network operation may take
    #[arg(short, long, env = "SQUAD_RCON_TIMEOUT", default_value = "10")]
    timeout: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every team, squad and player
    Population,
    /// Run a raw command and print the reply
    Exec {
        #[arg(required = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let info = ServerConnectionInfo::new(args.host, args.port, args.password)
        .with_timeout(Duration::from_secs(args.timeout))?;

    let server = SquadServer::connect(&info).await?;
    info!("connected to {}", info.address());

    let result = match args.command {
        Command::Population => server.server_population().await.map(|p| print_population(&p)),
        Command::Exec { command } => server
            .command(&command.join(" "))
            .await
            .map(|reply| println!("{}", reply)),
    };

    server.disconnect().await;
    result?;
    Ok(())
}

fn print_population(population: &Population) {
    for team in population.teams() {
        println!("Team {} ({})", team.id(), team.name());
        for squad in team.squads() {
            println!(
                "  Squad {} {} [{}/{}{}]",
                squad.id(),
                squad.name(),
                squad.players().len(),
                squad.size(),
                if squad.is_locked() { ", locked" } else { "" }
            );
            for player in squad.players() {
                println!("    {} {} {}", player.id(), player.steam_id(), player.name());
            }
        }
        for player in team.players() {
            println!("  - {} {} {}", player.id(), player.steam_id(), player.name());
        }
    }

    if !population.unknown_team_players().is_empty() {
        println!("Unknown team");
        for player in population.unknown_team_players() {
            println!("  {} {} {}", player.id(), player.steam_id(), player.name());
        }
    }

    if !population.disconnected_players().is_empty() {
        println!("Recently disconnected");
        for player in population.disconnected_players() {
            println!(
                "  {} {} {} ({}s ago)",
                player.id, player.steam_id, player.name, player.disconnected_since
            );
        }
    }
}
