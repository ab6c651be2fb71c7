//! Search the document index from the command line.

use anyhow::Result;
use clap::Args;
use context_retrieval::IndexPort as _;

use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Number of results
    #[arg(long)]
    pub top_k: Option<usize>,
}

pub async fn cmd_search(ctx: &AppContext, args: SearchArgs) -> Result<()> {
    println!("\n=== Searching: '{}' ===\n", args.query);

    let top_k = args.top_k.unwrap_or(ctx.settings().index.top_k);
    let hits = ctx
        .index()
        .search_documents(&args.query, top_k, 0.0)
        .await?;

    if hits.is_empty() {
        println!("No results found");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "\n--- Result {} (Similarity: {:.1}%) ---",
            rank + 1,
            hit.similarity * 100.0
        );
        if let Some(filename) = hit.metadata.get("filename").and_then(|v| v.as_str()) {
            println!("Source: {filename}");
        }
        if let Some(section) = hit.metadata.get("section").and_then(|v| v.as_str()) {
            println!("Section: {section}");
        }
        let preview: String = hit.text.chars().take(200).collect();
        println!("Text: {preview}...");
    }

    Ok(())
}
