//! MatchUp Client
//!
//! With `MATCHUP_RPC_URL` set, prints the live contract state read-only.
//! Otherwise walks one match through its full lifecycle on a simulated chain.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use matchup::{
    chain::{SimulatedChain, WalletSession, WsTransport},
    client::{ClientConfig, MatchClient},
    core::{Address, TokenAmount},
    schema::{
        feed::{Attachment, Feed},
        listing::{filter_matches, views, MatchFilter},
    },
    ContractTransport, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("MatchUp Client v{}", VERSION);

    let config = ClientConfig::from_env().context("invalid configuration")?;
    info!("Contract {} on chain {}", config.contract, config.chain_id);

    match config.rpc_url.clone() {
        Some(url) => live_status(&url, config).await,
        None => demo_lifecycle(config).await,
    }
}

/// Read-only view of a live deployment.
async fn live_status(url: &str, config: ClientConfig) -> anyhow::Result<()> {
    let transport = WsTransport::connect(url, config.request_timeout)
        .await
        .with_context(|| format!("failed to connect to {}", url))?;
    let decimals = config.token_decimals;
    let client = MatchClient::new(Arc::new(transport), config);

    let info = client.contract_info().await?;
    info!("Matches: {}", info.match_count);
    info!("Platform fee: {}%", info.platform_fee);
    info!("Platform wallet: {}", info.platform_wallet);

    let viewer: Option<Address> = match std::env::var("MATCHUP_ACCOUNT") {
        Ok(raw) => Some(raw.parse().context("invalid MATCHUP_ACCOUNT")?),
        Err(_) => None,
    };

    if let Some(account) = viewer {
        match client.get_user_profile(account).await? {
            Some(profile) => info!("Riot ID of {}: {}", account.short(), profile.riot_id),
            None => info!("{} has no profile", account.short()),
        }
    }

    let rows = views(&client.list_matches().await?);
    let filter = if viewer.is_some() { MatchFilter::Mine } else { MatchFilter::Open };
    info!("=== {} ===", filter);
    for row in filter_matches(&rows, filter, viewer.as_ref()) {
        info!(
            "{} {} bet {} seats {}{}",
            row.id,
            row.phase,
            row.display_bet(decimals),
            row.seats(),
            if row.can_join(viewer.as_ref()) { " [joinable]" } else { "" }
        );
    }
    Ok(())
}

/// Full lifecycle on the simulated chain.
async fn demo_lifecycle(config: ClientConfig) -> anyhow::Result<()> {
    info!("=== Simulated Match ===");

    let creator = Address::new([0x11; 20]);
    let challenger = Address::new([0x22; 20]);
    let platform = Address::new([0xfe; 20]);

    let chain = Arc::new(SimulatedChain::new(config.contract, platform));
    let chain_id = config.chain_id;
    let decimals = config.token_decimals;
    let client = MatchClient::new(chain.clone(), config);

    let stake = client.parse_amount("100")?;
    chain.fund(creator, stake);
    chain.fund(challenger, stake);

    let creator_session = WalletSession::connected(creator, chain_id);
    let challenger_session = WalletSession::connected(challenger, chain_id);

    // Log every contract event as the watcher sees it
    let mut events = client.subscribe();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let watcher = tokio::spawn(client.watcher().starting_at(0).run(shutdown_rx));
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!("  event: {}", serde_json::to_string(&event).unwrap_or_default());
        }
    });

    client.create_user_profile(&creator_session, "fac3_m4n#EUW").await?;
    client.create_user_profile(&challenger_session, "rival#NA1").await?;

    let bet = client.parse_amount("10")?;
    let created = client.create_match(&creator_session, bet).await?;
    let match_id = created.match_id;
    info!("Created match {} for {}", match_id, bet.format(decimals));

    client.join_match(&challenger_session, match_id).await?;

    // Joining twice is stopped before it reaches the chain
    if let Err(e) = client.join_match(&challenger_session, match_id).await {
        warn!("{}", e.notification("join match"));
    }

    client.ready_up(&creator_session, match_id, TokenAmount::ZERO).await?;
    let ready = client.ready_up(&challenger_session, match_id, TokenAmount::ZERO).await?;
    info!("Match {} started: {}", match_id, ready.started);

    let resolved = client.declare_winner(&creator_session, match_id, challenger).await?;
    let m = client.match_snapshot(match_id).await?;
    info!("Match {} is {:?}, winner {}", match_id, m.status, resolved.winner.short());

    for (name, account) in [("creator", creator), ("challenger", challenger), ("platform", platform)] {
        info!("Balance of {}: {}", name, chain.balance_of(&account).format(decimals));
    }

    let mut feed = Feed::new();
    let post = feed.create_post(
        &challenger_session,
        "GG, first wager won!",
        vec![Attachment::Match { match_id }],
    )?;
    info!("Posted {} at {}", post.id, post.timestamp);

    // Let the watcher catch the last block before stopping it
    tokio::time::sleep(client.config().poll_interval * 2).await;
    let _ = shutdown_tx.send(());
    watcher.await?;
    printer.abort();

    info!("Chain at block {}", chain.block_number().await?);
    info!("=== Demo Complete ===");
    Ok(())
}
