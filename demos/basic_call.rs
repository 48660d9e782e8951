//! Basic example: identify the bot, send a message, look up a file.
//!
//! This example shows how to:
//! - Create a client from the environment
//! - Commit payload calls and acknowledgement calls
//! - Tell transport failures apart from API errors
//!
//! Run with: `TELEGRAM_BOT_TOKEN=... CHAT_ID=... cargo run --example basic_call`

use botcall::{BackoffPolicy, Client, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("botcall=debug,basic_call=info")
        .init();

    let client = Client::from_env()?;

    println!("=== getMe ===");
    let me = client.get_me().commit().await?;
    println!("Bot: {} (@{})", me.data.first_name, me.data.username.as_deref().unwrap_or("-"));
    println!("Request latency: {:?}", me.latency);
    println!();

    let chat_id: i64 = std::env::var("CHAT_ID")
        .ok()
        .and_then(|id| id.parse().ok())
        .unwrap_or(me.data.id);

    println!("=== sendMessage ===");
    // A tighter budget for this call only: give up after 10 seconds.
    let policy = BackoffPolicy::new(2, 10);
    match client
        .send_message(chat_id, "hello from botcall")
        .field("disable_notification", true)
        .commit_with(&policy)
        .await
    {
        Ok(sent) => {
            println!("Sent message {} after {} attempt(s)", sent.data.message_id, sent.attempts);
        }
        Err(e) if e.is_transport() => println!("API unreachable: {}", e),
        Err(Error::Api { status, error, .. }) => {
            println!("Refused with HTTP {}: {}", status, error);
            if let Some(wait) = error.retry_after() {
                println!("Flood control: retry in {:?}", wait);
            }
        }
        Err(e) => return Err(e),
    }
    println!();

    println!("=== getWebhookInfo ===");
    let info = client.get_webhook_info().commit().await?;
    if info.data.url.is_empty() {
        println!("No webhook set; {} pending update(s)", info.data.pending_update_count);
    } else {
        println!("Webhook: {}", info.data.url);
    }

    Ok(())
}
