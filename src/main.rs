//! TaskClaw CLI — autonomous LLM task agent
//!
//! All CLI logic lives in the library's `cli` module. This file is just the
//! entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taskclaw::cli::run().await
}
