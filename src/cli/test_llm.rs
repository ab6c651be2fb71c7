//! One-shot completion round trip against the live LLM.

use anyhow::Result;
use llm_gateway::CompletionPort as _;

use crate::context::AppContext;

pub async fn cmd_test_llm(ctx: &AppContext) -> Result<()> {
    println!("\n=== Testing Gemini Connection ===\n");

    let completion = ctx.completion()?;
    println!("Sending test request...");

    match completion.complete("Say 'OK' if you can read this.").await {
        Ok(text) if !text.is_empty() => {
            println!("Connection successful: {text}");
        }
        Ok(_) => println!("Connection established but the response was empty"),
        Err(err) => println!("Connection failed: {err}"),
    }

    Ok(())
}
