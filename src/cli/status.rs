//! System status: configuration, credentials, index reachability, history.

use anyhow::Result;
use context_retrieval::IndexPort as _;

use crate::config::gemini_api_key;
use crate::context::AppContext;

pub async fn cmd_status(ctx: &AppContext) -> Result<()> {
    println!("\n=== System Status ===\n");

    let settings = ctx.settings();
    println!("Configuration loaded");
    println!("  model: {}", settings.gemini.model);
    println!("  index endpoint: {}", settings.index.endpoint);
    println!("  fill mode: {}", settings.auto_fill.mode);

    if gemini_api_key().is_some() {
        println!("Gemini API key configured");
    } else {
        println!("Gemini API key not set (export GEMINI_API_KEY)");
    }

    match ctx.index().search_documents("ping", 1, 0.0).await {
        Ok(hits) => println!("Index service reachable ({} hit(s) for probe)", hits.len()),
        Err(err) => println!("Index service unreachable: {err}"),
    }

    match ctx.tracker() {
        Ok(tracker) => {
            let stats = tracker.stats();
            println!(
                "Answer history: {} entries ({} edited)",
                stats.total_entries, stats.edited_count
            );
        }
        Err(err) => println!("Answer history unavailable: {err}"),
    }

    println!();
    Ok(())
}
