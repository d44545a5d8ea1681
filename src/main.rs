//! CLI entry point for mdbook-jiralink preprocessor.

use std::io;
use std::process;

use anyhow::{Context, Result};
use mdbook_preprocessor::{Preprocessor, parse_input};

use mdbook_jiralink::JiraLinkPreprocessor;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    // Handle "supports <renderer>" check
    if args.len() >= 3 && args[1] == "supports" {
        let renderer = &args[2];
        // Links are emitted as raw HTML
        process::exit(i32::from(renderer != "html"));
    }

    if let Err(e) = run() {
        eprintln!("Error: {e:?}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let (ctx, book) = parse_input(io::stdin()).context("Failed to parse mdBook input")?;
    let preprocessor = JiraLinkPreprocessor::new(&ctx)?;
    let processed = preprocessor.run(&ctx, book)?;
    serde_json::to_writer(io::stdout(), &processed)?;
    Ok(())
}
