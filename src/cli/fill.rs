//! The fill command: attach a browser, detect fields, drive the session.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use formpilot_core_types::FillMode;
use page_adapter::{CdpConfig, CdpPage, CdpTransport, ChromiumTransport, PagePort};

use crate::context::AppContext;
use crate::session::{ConsolePrompter, FillSession};

#[derive(Args, Debug)]
pub struct FillArgs {
    /// Fill mode: interactive, batch or suggest-only
    #[arg(long)]
    pub mode: Option<FillMode>,

    /// Navigate to this URL before detecting fields
    #[arg(long)]
    pub url: Option<String>,
}

pub async fn cmd_fill(ctx: &AppContext, args: FillArgs) -> Result<()> {
    println!("\n=== Job Application Filler ===\n");

    let settings = ctx.settings();
    let mode = args.mode.unwrap_or(settings.auto_fill.mode);

    // components first, so a missing API key fails before a browser launches
    let generator = ctx.generator()?;
    let tracker = ctx.tracker()?;

    println!("Launching browser...");
    let transport: Arc<dyn CdpTransport> = Arc::new(ChromiumTransport::new(CdpConfig {
        headless: settings.browser.headless,
        default_deadline_ms: settings.browser.timeout_ms,
        websocket_url: settings.browser.websocket_url.clone(),
        ..CdpConfig::default()
    }));
    transport
        .start()
        .await
        .context("failed to start browser session")?;

    let page: Arc<dyn PagePort> = Arc::new(CdpPage::new(
        transport,
        Duration::from_millis(settings.browser.timeout_ms),
    ));

    match &args.url {
        Some(url) => {
            println!("Navigating to {url}");
            page.navigate(url).await?;
        }
        None => {
            println!("Navigate to the job application page in the browser window.");
            print!("\nPress ENTER when you're on the application page...");
            let _ = io::stdout().flush();
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
        }
    }

    println!("\nDetecting form fields...");
    let mut session = FillSession::new(
        page,
        generator,
        tracker,
        ctx.index(),
        mode,
        ctx.tempo(),
    )
    .with_highlight(settings.auto_fill.highlight_fields);

    let report = session.run(&mut ConsolePrompter).await?;

    println!("\n{}", "=".repeat(60));
    println!("\nProcessing complete!");
    println!("Filled {}/{} fields", report.filled, report.detected);
    println!("\nPlease review the form and submit manually.");

    Ok(())
}
