//! Inspect the answer history log.

use anyhow::Result;
use clap::Args;

use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show the N most recent entries
    #[arg(long)]
    pub recent: Option<usize>,

    /// Show aggregate statistics instead of entries
    #[arg(long)]
    pub stats: bool,
}

pub async fn cmd_history(ctx: &AppContext, args: HistoryArgs) -> Result<()> {
    println!("\n=== Answer History ===\n");

    let tracker = ctx.tracker()?;

    if args.stats {
        let stats = tracker.stats();
        println!("Total entries: {}", stats.total_entries);
        println!("Edited answers: {}", stats.edited_count);
        println!("Average confidence: {:.1}%", stats.avg_confidence * 100.0);
        println!("\nField types:");
        let mut counts: Vec<_> = stats.field_types.iter().collect();
        counts.sort();
        for (field_type, count) in counts {
            println!("  {field_type}: {count}");
        }
        return Ok(());
    }

    let entries = tracker.recent_entries(args.recent.unwrap_or(10));
    if entries.is_empty() {
        println!("No history entries found");
        return Ok(());
    }

    for (position, entry) in entries.iter().enumerate() {
        println!("\n--- Entry {} ---", position + 1);
        println!("Question: {}", entry.question);
        println!("Answer: {}", entry.answer);
        println!(
            "Type: {} | Confidence: {:.1}%",
            entry.field_type,
            entry.confidence * 100.0
        );
        if entry.was_edited {
            println!("(Edited by user)");
        }
    }

    Ok(())
}
