use newscast::ingestion::{FeedSource, RssFeedSource};
use newscast::processing::text_to_summarize;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let feeds: Vec<String> = match std::env::args().nth(1) {
        Some(url) => vec![url],
        None => vec![common::DEFAULT_FEED_URL.to_string()],
    };

    for url in feeds {
        println!("\n{}", "=".repeat(60));
        println!("Testing: {}", url);
        println!("{}", "=".repeat(60));

        let source = match RssFeedSource::new(url.as_str(), 10) {
            Ok(source) => source,
            Err(e) => {
                println!("✗ Failed to build client: {}", e);
                continue;
            }
        };

        match source.fetch(common::DEFAULT_FEED_LIMIT).await {
            Ok(entries) => {
                println!("✓ Success! {} entries", entries.len());
                for (i, entry) in entries.iter().take(3).enumerate() {
                    println!("    {}. {}", i + 1, entry.title);
                    println!("       URL: {}", entry.link);
                    println!("       Published: {}", entry.published);
                    println!(
                        "       Summarizer input: {} chars",
                        text_to_summarize(entry).len()
                    );
                }
            }
            Err(e) => {
                println!("✗ Failed: {}", e);
            }
        }
    }
}
