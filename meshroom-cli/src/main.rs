use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use meshroom_client::{
    RelayClient, RoomDeps, RoomHandle, RoomOptions, RoomSnapshot, TransportConfig,
    WebrtcTransportFactory,
};
use meshroom_core::IceServerConfig;
use meshroom_relay::RelayConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cargo-meshroom")]
#[command(bin_name = "cargo-meshroom")]
enum Cli {
    Meshroom(MeshroomArgs),
}

#[derive(clap::Args)]
struct MeshroomArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a relay server backed by an in-memory store.
    Relay {
        #[arg(long, default_value = "127.0.0.1:8787")]
        bind: SocketAddr,
    },

    /// Join a room and print roster and stream changes until Ctrl-C.
    Join {
        #[arg(long, default_value = "ws://127.0.0.1:8787/ws")]
        relay: String,

        #[arg(short, long)]
        room: String,

        #[arg(short, long)]
        name: Option<String>,

        /// STUN server URL; repeat for several. Defaults to public servers.
        #[arg(long)]
        stun: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli::Meshroom(args) = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match args.command {
        Commands::Relay { bind } => {
            println!("{}", format!("📡 Relay on ws://{}/ws", bind).green().bold());
            meshroom_relay::run(RelayConfig { bind }).await?;
        }

        Commands::Join {
            relay,
            room,
            name,
            stun,
        } => {
            let name = match name {
                Some(name) => name,
                None => Input::<String>::new()
                    .with_prompt("Display name")
                    .interact_text()
                    .context("Failed to read display name")?,
            };
            join_room(&relay, room, name, stun).await?;
        }
    }

    Ok(())
}

async fn join_room(relay: &str, room: String, name: String, stun: Vec<String>) -> Result<()> {
    let config = if stun.is_empty() {
        TransportConfig::default()
    } else {
        TransportConfig {
            ice_servers: stun.into_iter().map(IceServerConfig::stun).collect(),
        }
    };

    let client = RelayClient::connect(relay)
        .await
        .with_context(|| format!("Failed to reach relay at {}", relay))?;
    let deps = RoomDeps::new(
        Arc::new(client),
        Arc::new(WebrtcTransportFactory::new(config)),
    );

    let handle = RoomHandle::join(RoomOptions::new(room.as_str(), name.as_str()), deps)
        .await
        .context("Failed to join room")?;
    println!(
        "{}",
        format!("🚀 Joined '{}' as {} ({})", room, name, handle.identity())
            .green()
            .bold()
    );

    let mut updates = handle.watch();
    let mut previous = updates.borrow_and_update().clone();
    print_changes(None, &previous);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Leaving...".cyan());
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                print_changes(Some(&previous), &current);
                if current.closed {
                    println!("{}", "Room closed by the relay".red());
                    return Ok(());
                }
                previous = current;
            }
        }
    }

    handle.leave().await?;
    println!("{}", "✨ Left the room".green());
    Ok(())
}

fn print_changes(before: Option<&RoomSnapshot>, after: &RoomSnapshot) {
    for p in after.peers() {
        if before.is_none_or(|b| !b.participants.contains_key(&p.id)) {
            println!("   {} {} ({})", "+".green(), p.display_name, p.id);
        }
    }

    let Some(before) = before else { return };

    for p in before.peers() {
        if !after.participants.contains_key(&p.id) {
            println!("   {} {} ({})", "-".red(), p.display_name, p.id);
        }
    }

    for (id, view) in &after.sessions {
        if before.session(id) != Some(*view) {
            println!("   {} {:?} {}", id.to_string().dimmed(), view.role, view.state);
        }
    }

    for (id, stream) in &after.remote_streams {
        let known = before
            .remote_streams
            .get(id)
            .map_or(0, |s| s.tracks.len());
        for track in stream.tracks.iter().skip(known) {
            println!("   {} {} track from {}", "🎧".cyan(), track.kind(), id);
        }
    }
}
