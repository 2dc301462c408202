// USAGE
//   ukcp18-stac collection --input '/data/ukcp18/*/*.nc' --output stac/collection.json
//   ukcp18-stac item FILE.nc... --output stac/item.json
//   ukcp18-stac items --input '/data/ukcp18/**/*.nc' --output-dir stac/items

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ukcp18_stac::{
    alignment_base, build_collection, build_item, filesystem, group_by_item, reconcile,
    DatasetOpener,
    ItemOptions, Publisher, Storage, StorageOptions,
};

// ─────────────────────────────────────────────────────────────────────
// Command line
// ─────────────────────────────────────────────────────────────────────
#[derive(Parser)]
#[command(name = "ukcp18-stac", version, about = "STAC records for UKCP18 global projections")]
struct Cli {
    #[command(flatten)]
    storage: StorageArgs,

    /// Publisher configuration (JSON); defaults to the UKCP18 values
    #[arg(long, global = true)]
    publisher: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StorageArgs {
    /// Storage protocol of the input files
    #[arg(long, global = true, default_value = "file")]
    protocol: String,

    /// Storage option passed to the filesystem, as KEY=VALUE (repeatable)
    #[arg(long = "storage-option", global = true, value_parser = parse_key_value)]
    options: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the archive Collection from a sample of files
    Collection {
        /// Glob of input files; the first non-wind match is the alignment base
        #[arg(long)]
        input: String,
        #[arg(long)]
        output: PathBuf,
    },
    /// Build one Item from files of the same group
    Item {
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Group every matching file by Item and build the Items in parallel
    Items {
        #[arg(long)]
        input: String,
        #[arg(long)]
        output_dir: PathBuf,
        #[command(flatten)]
        item: ItemArgs,
    },
}

#[derive(Args)]
struct ItemArgs {
    /// Asset hrefs become PREFIX/<file name> instead of the input path
    #[arg(long)]
    href_prefix: Option<String>,

    /// Where each Item's `collection` link points
    #[arg(long, default_value = "../collection.json")]
    collection_href: String,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

// ─────────────────────────────────────────────────────────────────────
// Simple timing helper
// ─────────────────────────────────────────────────────────────────────
fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    info!(elapsed = ?t0.elapsed(), "{label}");
    out
}

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────
fn item_options(args: &ItemArgs, publisher: &Publisher) -> ItemOptions {
    let href_rewrite = args.href_prefix.clone().map(|prefix| {
        let prefix = prefix.trim_end_matches('/').to_string();
        Box::new(move |path: &str| {
            let name = Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(path);
            format!("{prefix}/{name}")
        }) as Box<dyn Fn(&str) -> String + Send + Sync>
    });
    ItemOptions {
        href_rewrite,
        collection: Some(publisher.collection_id.clone()),
        collection_href: args.collection_href.clone(),
        reference_system: publisher.reference_system,
        ..ItemOptions::default()
    }
}

fn write_collection(
    storage: &Storage,
    input: &str,
    output: &Path,
    publisher: &Publisher,
) -> Result<()> {
    let files = timeit("list files", || storage.list(input))?;
    if files.is_empty() {
        bail!("no files match {input}");
    }

    let datasets = timeit("open datasets", || {
        files
            .iter()
            .map(|f| storage.open(f).with_context(|| format!("opening {f}")))
            .collect::<Result<Vec<_>>>()
    })?;
    let base = alignment_base(&datasets).context("no datasets to reconcile")?;
    let merged = timeit("reconcile", || reconcile(&datasets, base))?;

    let mut collection = timeit("build collection", || build_collection(&merged, publisher))?;
    collection.set_self_href(&output.display().to_string());
    collection
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(output = %output.display(), files = files.len(), "wrote collection");
    Ok(())
}

fn write_item(
    storage: &Storage,
    files: &[String],
    output: &Path,
    options: &ItemOptions,
) -> Result<String> {
    let mut item = build_item(files, storage, options)?;
    item.set_self_href(&output.display().to_string());
    item.save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(item.id)
}

fn write_items(
    storage: &Storage,
    input: &str,
    output_dir: &Path,
    options: &ItemOptions,
) -> Result<()> {
    let files = timeit("list files", || storage.list(input))?;
    let grouping = group_by_item(&files);
    for (path, err) in &grouping.rejected {
        warn!(%path, %err, "skipping file");
    }

    let groups: Vec<_> = grouping.groups.into_iter().collect();
    let failures: usize = timeit("build items", || {
        groups
            .par_iter()
            .map(|(id, paths)| {
                let output = output_dir.join(format!("{id}.json"));
                match write_item(storage, paths, &output, options) {
                    Ok(_) => 0,
                    Err(e) => {
                        error!(item = %id, files = paths.len(), "{e:#}");
                        1
                    }
                }
            })
            .sum()
    });

    info!(
        items = groups.len() - failures,
        failed = failures,
        rejected = grouping.rejected.len(),
        "wrote items"
    );
    if failures > 0 {
        return Err(anyhow!("{failures} of {} items failed", groups.len()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let publisher = match &cli.publisher {
        Some(path) => Publisher::from_path(path)
            .with_context(|| format!("reading publisher config {}", path.display()))?,
        None => Publisher::default(),
    };
    let options: StorageOptions = cli.storage.options.into_iter().collect();
    let storage = filesystem(&cli.storage.protocol, &options)?;

    match cli.command {
        Command::Collection { input, output } => {
            write_collection(&storage, &input, &output, &publisher)
        }
        Command::Item { files, output, item } => {
            let options = item_options(&item, &publisher);
            let id = write_item(&storage, &files, &output, &options)?;
            info!(%id, output = %output.display(), "wrote item");
            Ok(())
        }
        Command::Items {
            input,
            output_dir,
            item,
        } => write_items(&storage, &input, &output_dir, &item_options(&item, &publisher)),
    }
}
