// src/lib.rs

//! Mirror a directory tree through a per-file transform.
//!
//! A [`Mirror`] walks an input directory, picks the files matching its
//! include/exclude globs and hands each one to a [`Transform`] together with
//! the matching path under the output directory. [`Mirror::crawl`] does this
//! once; [`Mirror::watch`] keeps doing it for files created or modified later.
//!
//! ```no_run
//! use treemirror::{Cancellation, Flow, Mirror, MirrorConfig};
//!
//! # async fn demo() -> treemirror::errors::Result<()> {
//! let mirror = Mirror::new(
//!     MirrorConfig::new("images", "thumbs")
//!         .include(["**/*.jpg", "**/*.png"])
//!         .exclude(["temp/**"])
//!         .concurrency(4)
//!         .transform(|input, output| {
//!             std::fs::copy(input, output)?;
//!             Ok(Flow::Continue)
//!         }),
//! )?;
//! mirror.crawl(&Cancellation::new()).await
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod crawl;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod mirror;
pub mod paths;
pub mod patterns;
pub mod types;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use crate::config::MirrorConfig;
pub use crate::engine::{Cancellation, Task};
pub use crate::errors::MirrorError;
pub use crate::exec::{ErrorHandler, Transform};
pub use crate::mirror::Mirror;
pub use crate::types::{ErrorAction, Flow};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::exec::{CommandTransform, CopyTransform};
use crate::types::TransformKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the built-in transform selected in `[transform]`
/// - crawl and/or watch
/// - Ctrl-C and `--timeout` handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config {:?}", args.config))?;

    let mirror = Mirror::new(mirror_config(&cfg)?)?;

    let token = CancellationToken::new();
    let cancel = match args.timeout {
        Some(secs) => {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(secs);
            Cancellation::from_token(token.clone()).deadline_at(deadline)
        }
        None => Cancellation::from_token(token.clone()),
    };

    if args.dry_run {
        let tasks = mirror.plan(&cancel).await?;
        print_dry_run(&cfg, &mirror, &tasks);
        return Ok(());
    }

    // Ctrl-C → graceful shutdown.
    {
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; stopping");
            token.cancel();
        });
    }

    match run_mode(&mirror, &cancel, &args).await {
        Err(MirrorError::Cancelled) => {
            info!("stopped");
            Ok(())
        }
        // A watch has no end of its own; `--timeout` is how it is bounded.
        Err(MirrorError::DeadlineExceeded) if args.watch => {
            info!("watch timeout reached");
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}

async fn run_mode(mirror: &Mirror, cancel: &Cancellation, args: &CliArgs) -> errors::Result<()> {
    if !args.watch {
        return mirror.crawl(cancel).await;
    }
    if args.crawl_first {
        mirror.crawl(cancel).await?;
    }
    mirror.watch(cancel).await
}

/// Build the library configuration for a validated config file.
pub fn mirror_config(cfg: &ConfigFile) -> Result<MirrorConfig> {
    let transform: Arc<dyn Transform> = match cfg.transform.kind {
        TransformKind::Copy => Arc::new(CopyTransform),
        TransformKind::Command => {
            let cmd = cfg
                .transform
                .cmd
                .clone()
                .context("[transform].cmd is required when kind = \"command\"")?;
            Arc::new(CommandTransform::new(cmd))
        }
    };

    Ok(MirrorConfig::from_file(cfg).transform_with(transform))
}

/// Print the resolved configuration and the files a crawl would process.
fn print_dry_run(cfg: &ConfigFile, mirror: &Mirror, tasks: &[Task]) {
    println!("treemirror dry-run");
    println!("  input   = {}", mirror.input_root().display());
    println!("  output  = {}", mirror.output_root().display());
    println!("  include = {:?}", mirror.classifier().patterns().include_patterns());
    let exclude = mirror.classifier().patterns().exclude_patterns();
    if !exclude.is_empty() {
        println!("  exclude = {:?}", exclude);
    }
    println!("  workers = {}", mirror.workers());
    match cfg.transform.kind {
        TransformKind::Copy => println!("  transform = copy"),
        TransformKind::Command => {
            println!("  transform = command: {}", cfg.transform.cmd.as_deref().unwrap_or(""))
        }
    }
    println!("  on_walk_error = {:?}", cfg.errors.on_walk_error);
    println!();

    println!("files ({}):", tasks.len());
    for task in tasks {
        println!(
            "  {} -> {}",
            task.input_path.display(),
            task.output_path.display()
        );
    }

    debug!("dry-run complete (no transform executed)");
}
