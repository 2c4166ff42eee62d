use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use clicker_client::{ChatScope, ClientConfig, ClientEvent, GameClient};
use clicker_core::EconomyEvent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::new();
    info!("Starting clicker client against {}", config.api_base);

    let client = GameClient::start(config)
        .await
        .context("failed to start client")?;

    let mut events = client.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => report(&event),
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => run_command(&client, line.trim()).await,
                Ok(None) => {
                    // stdin closed, keep playing until Ctrl+C
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                    }
                    break;
                }
                Err(e) => {
                    warn!("Could not read stdin: {}", e);
                    break;
                }
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down, saving game...");
    let state = client.shutdown().await.context("failed to stop session")?;
    reporter.abort();
    info!(
        "Saved {}: money {}, total {}, destroyed {}",
        state.player_id, state.money, state.total_money, state.breakables_destroyed
    );
    Ok(())
}

async fn run_command(client: &GameClient, line: &str) {
    let (command, argument) = line
        .split_once(' ')
        .map(|(command, rest)| (command, rest.trim()))
        .unwrap_or((line, ""));
    let session = client.session();
    let social = client.social();

    match command {
        "" => {}
        "click" => match session.breakables().await {
            Ok(breakables) => match breakables.first() {
                Some(breakable) => match session.destroy(breakable.id).await {
                    Ok(outcome) => info!("Broke {} for {}", outcome.breakable_type, outcome.value),
                    Err(e) => warn!("{}", e),
                },
                None => info!("Nothing to break"),
            },
            Err(e) => warn!("{}", e),
        },
        "buy" => match session.buy_pet().await {
            Ok(pet_id) => info!("Bought pet {}", pet_id),
            Err(e) => warn!("{}", e),
        },
        "use" => match argument.parse::<uuid::Uuid>() {
            Ok(item_id) => match session.use_item(item_id).await {
                Ok(effect) => info!("Used item: {:?}", effect),
                Err(e) => warn!("{}", e),
            },
            Err(_) => warn!("usage: use <item-uuid>"),
        },
        "stats" => match session.snapshot().await {
            Ok(state) => info!(
                "money {} | total {} | keys {} | gifts {} | pets {} | items {} | play {}s",
                state.money,
                state.total_money,
                state.keys,
                state.gifts,
                state.pets.len(),
                state.inventory.len(),
                state.play_time
            ),
            Err(e) => warn!("{}", e),
        },
        "save" => {
            if let Err(e) = session.save_now() {
                warn!("{}", e);
            }
        }
        "say" => {
            let _ = social.send_chat(argument, ChatScope::Global).await;
        }
        "clan-say" => {
            let _ = social.send_chat(argument, ChatScope::Clan).await;
        }
        "clans" => {
            if let Err(e) = social.refresh_clans().await {
                warn!("{}", e);
            }
        }
        "create-clan" => {
            let _ = social.create_clan(argument).await;
        }
        "join" => {
            let _ = social.join_clan(argument).await;
        }
        "trades" => {
            if let Err(e) = social.refresh_trades().await {
                warn!("{}", e);
            }
        }
        other => warn!(
            "Unknown command {:?}; try click, buy, use, stats, save, say, clan-say, clans, create-clan, join, trades",
            other
        ),
    }
}

fn report(event: &ClientEvent) {
    match event {
        ClientEvent::Notification(text) => info!("{}", text),
        ClientEvent::Chat { scope, message } => {
            info!("[{:?}] {}: {}", scope, message.player_name, message.message)
        }
        ClientEvent::TradesUpdated(trades) => info!("{} active trades", trades.len()),
        ClientEvent::ClansUpdated(clans) => {
            for clan in clans {
                info!(
                    "Clan {} ({}) level {}, {} members",
                    clan.name,
                    clan.id,
                    clan.level,
                    clan.members.len()
                );
            }
        }
        ClientEvent::ConnectionChanged(state) => info!("Connection: {:?}", state),
        ClientEvent::Economy(EconomyEvent::BreakableDestroyed {
            destroyed_by,
            breakable_type,
            value,
            ..
        }) => info!("{:?} broke {} (+{})", destroyed_by, breakable_type, value),
        ClientEvent::Economy(EconomyEvent::ItemDropped { item }) => {
            info!("Dropped {} ({})", item.name, item.id)
        }
        ClientEvent::Economy(_) => {}
    }
}
