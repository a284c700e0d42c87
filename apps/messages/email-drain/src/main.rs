//! Email Drain Worker - Entry Point

#[tokio::main]
async fn main() -> eyre::Result<()> {
    messages_email_drain::run().await
}
