use std::path::Path;

use common::Config;
use newscast::llm::{self, is_failure_sentinel, AiService};

const TEST_ARTICLE: &str = r#"
Rust is a systems programming language that runs blazingly fast, prevents
segfaults, and guarantees thread safety. It accomplishes these goals through
a unique ownership system that enforces memory safety without requiring a
garbage collector.

Many companies are adopting Rust for critical infrastructure. The language's
performance and safety guarantees make it ideal for operating systems, web
servers, and embedded systems.
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenvy::dotenv().ok();

    let mut config = Config::load_with_defaults(
        Some(Path::new("config.default.toml")),
        Some(Path::new("config.toml")),
    )
    .await?;
    config.apply_env_overrides(|name| std::env::var(name).ok());

    let configured = config.provider_name();
    println!("\n{}", "=".repeat(60));
    println!("Configured provider: {}", configured);
    println!("{}", "=".repeat(60));

    // The configured provider first, then every named backend so a missing key shows up
    for name in [configured.as_str(), "gemini", "openai"] {
        let provider = llm::build_provider(&config.ai, name, |var| std::env::var(var).ok());
        let service = AiService::new(provider);

        println!("\n[{}] Summarizing test article...", name);
        let summary = service.summarize(TEST_ARTICLE).await;
        if is_failure_sentinel(&summary) {
            eprintln!("✗ {}", summary);
        } else {
            println!("✓ {}", summary.trim());
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Checks completed");
    println!("{}", "=".repeat(60));
    Ok(())
}
