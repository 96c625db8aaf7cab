//! persona-review - Review queue for self-learned chat bot behavior
//!
//! Learning jobs queue candidate persona/style/jargon changes here;
//! nothing reaches the live bot without a reviewer's decision.

// Use the library crate for all modules
use persona_review::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info for debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    // Run CLI
    cli::run().await
}
