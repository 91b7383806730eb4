//! qumulo-crawler - Parallel Qumulo REST crawler
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use qumulo_crawler::api;
use qumulo_crawler::config::{CliArgs, CrawlConfig};
use qumulo_crawler::progress::{print_header, print_summary, ProgressReporter};
use qumulo_crawler::{Crawler, RedisDispatchQueue};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose);

    // Validate and create config
    let config = CrawlConfig::from_args(args).context("Invalid configuration")?;

    // Print header
    if config.show_progress {
        print_header(&config);
    }

    // Create progress reporter
    let mut progress = if config.show_progress {
        Some(ProgressReporter::new())
    } else {
        None
    };

    if let Some(ref p) = progress {
        p.set_status("Connecting to cluster...");
    }

    // Log in and bind the session to a node address
    let (address, session) =
        api::connect(&config).context("Failed to connect to the cluster API")?;
    info!(address = %address, "connected to cluster");

    // Connect the dispatch queue
    let queue = RedisDispatchQueue::connect(&config.redis_url, &config.queue_prefix)
        .context("Failed to connect to redis")?;

    // Create crawler
    let crawler = Crawler::new(config);

    // Setup signal handler for graceful shutdown
    let shutdown_flag = crawler.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    // Run the crawl
    let stats = crawler
        .run(Arc::new(session), queue, |p| {
            if let Some(ref mut reporter) = progress {
                reporter.update(p);
            }
        })
        .context("Crawl failed")?;

    // Finish progress
    if let Some(ref p) = progress {
        if stats.completed {
            p.finish("Crawl completed");
        } else {
            p.finish("Crawl interrupted");
        }
    }

    // Print summary
    print_summary(&stats);

    // Report success/failure
    if !stats.completed {
        info!("Crawl was interrupted before completion");
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("qumulo_crawler=debug,warn")
    } else {
        EnvFilter::new("qumulo_crawler=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
