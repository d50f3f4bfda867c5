use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};

use parley_api::{auth, chats, guilds};
use parley_app::boundary::AuthFailure;
use parley_app::notice::Notice;
use parley_app::view::TranscriptEntry;
use parley_app::{AppContext, Config, ConversationView};
use parley_gateway::connection;

const USAGE: &str = "usage: parley <login <username> <password> | logout | dms | guilds | chat <chatId> [guildId]>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let (ctx, commands) = AppContext::new(&config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["login", username, password] => {
            auth::validate_login(username, password)?;
            auth::login(&ctx.api, username, password).await?;
            println!("Logged in as {}", username);
        }
        ["logout"] => {
            ctx.auth.end_session();
            println!("Logged out");
        }
        ["dms"] => {
            require_session(&ctx)?;
            let dms = checked(&ctx, chats::direct_messages(&ctx.api).await)?;
            for dm in dms {
                println!("{}\t{}", dm.chat_id, dm.other_username);
            }
        }
        ["guilds"] => {
            require_session(&ctx)?;
            let guilds = checked(&ctx, guilds::my_guilds(&ctx.api).await)?;
            for guild in guilds {
                println!("{}\t{}", guild.guild_id, guild.guild_name);
            }
        }
        ["chat", chat_id] => chat(ctx, commands, chat_id, None).await?,
        ["chat", chat_id, guild_id] => chat(ctx, commands, chat_id, Some(*guild_id)).await?,
        _ => bail!(USAGE),
    }

    Ok(())
}

fn require_session(ctx: &AppContext) -> anyhow::Result<()> {
    if !ctx.session().is_authenticated() {
        bail!("login required: run `parley login <username> <password>`");
    }
    Ok(())
}

/// Route a collaborator result through the auth boundary.
fn checked<T, E>(ctx: &AppContext, result: Result<T, E>) -> anyhow::Result<T>
where
    E: AuthFailure + std::error::Error + Send + Sync + 'static,
{
    match ctx.auth.inspect(result) {
        Ok(value) => Ok(value),
        Err(e) if e.is_auth_failure() => bail!("session expired, login required"),
        Err(e) => Err(e.into()),
    }
}

async fn chat(
    ctx: AppContext,
    commands: parley_gateway::CommandReceiver,
    chat_id: &str,
    guild_id: Option<&str>,
) -> anyhow::Result<()> {
    require_session(&ctx)?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let live = tokio::spawn(connection::run(ctx.manager.clone(), commands, async move {
        let _ = stop_rx.await;
    }));

    let mut updates = ctx.manager.updates();
    let view = checked(&ctx, ConversationView::mount(&ctx, chat_id, guild_id).await)?;

    if let Some(title) = view.title() {
        println!("{}", title);
    }
    let mut printed = print_new(&view.transcript(), 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            update = updates.recv() => match update {
                Ok(changed) if changed == view.chat_id() => {
                    printed = print_new(&view.transcript(), printed);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Update feed lagged by {} changes", n);
                    printed = print_new(&view.transcript(), printed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = ctx.auth.inspect(view.send(&line).await) {
                    if e.is_auth_failure() {
                        bail!("session expired, login required");
                    }
                    eprintln!("{}", Notice::from_send_error(&e));
                }
            }
        }
    }

    drop(view);
    let _ = stop_tx.send(());
    live.await.context("live connection task")?;
    info!("Left chat {}", chat_id);
    Ok(())
}

/// Print entries past `printed` and return the new count. A buffer that
/// shrank (history refetch) just resets the cursor.
fn print_new(entries: &[TranscriptEntry], printed: usize) -> usize {
    for entry in entries.iter().skip(printed) {
        let marker = if entry.own { "*" } else { " " };
        println!(
            "{}[{}] {} ({}): {}",
            marker, entry.initial, entry.author, entry.timestamp, entry.content
        );
    }
    entries.len()
}
