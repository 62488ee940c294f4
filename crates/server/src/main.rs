mod bootstrap;
mod health;
mod reminders;
mod webhooks;
mod workflow;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::run().await
}
