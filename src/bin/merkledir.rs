//! # merkledir CLI
//!
//! Command-line front end for the merkledir library.
//!
//! ## Usage
//! ```bash
//! # Snapshot a directory (prints the root hash)
//! merkledir store ./project
//!
//! # Compare two snapshots
//! merkledir diff <old-hash> <new-hash>
//!
//! # Compare a snapshot against the live directory
//! merkledir diff <old-hash> --path ./project
//!
//! # Materialize a snapshot
//! merkledir fetch <hash> ./restored
//!
//! # Resolve a path inside a snapshot
//! merkledir find <root-hash> src/main.rs
//! ```
//!
//! The store location defaults to `.merkledir` and can be overridden with
//! `--store`.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use colored::*;
use merkledir::{Hash256, MerkleDir, NodeKind};
use std::path::PathBuf;

/// merkledir - content-addressable snapshots and diffs for directory trees
#[derive(Parser)]
#[command(name = "merkledir")]
#[command(version)]
#[command(about = "Snapshot, diff and restore directory trees by content hash")]
struct Cli {
    /// Store directory (defaults to .merkledir)
    #[arg(short, long, global = true, default_value = ".merkledir")]
    store: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot a directory or file into the store
    Store {
        /// Path to snapshot
        path: PathBuf,
    },

    /// Compare two snapshots, or a snapshot against a live directory
    Diff {
        /// Old snapshot hash
        old: String,

        /// New snapshot hash (omit when using --path)
        new: Option<String>,

        /// Compare against this live directory instead of a second hash
        #[arg(short, long, conflicts_with = "new")]
        path: Option<PathBuf>,

        /// Print unified diffs for changed files
        #[arg(short, long)]
        unified: bool,
    },

    /// Materialize a snapshot onto the filesystem
    Fetch {
        /// Snapshot hash
        hash: String,

        /// Target path (must not exist)
        target: PathBuf,
    },

    /// Resolve a path inside a snapshot to a node hash
    Find {
        /// Root snapshot hash
        root: String,

        /// Slash-separated relative path
        path: String,
    },

    /// List the children of a stored directory
    Ls {
        /// Directory hash
        hash: String,
    },

    /// Show store statistics
    Stats,
}

fn parse_hash(s: &str) -> anyhow::Result<Hash256> {
    s.parse()
        .map_err(|_| anyhow!("'{s}' is not a 64-character hex hash"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "merkledir=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let md = MerkleDir::open(&cli.store)
        .with_context(|| format!("failed to open store at {:?}", cli.store))?;

    match cli.command {
        Commands::Store { path } => {
            let hash = md
                .store(&path)
                .with_context(|| format!("failed to snapshot {path:?}"))?;
            println!("{hash}");
        }

        Commands::Diff {
            old,
            new,
            path,
            unified,
        } => {
            let old = parse_hash(&old)?;
            let map = match (new, path) {
                (Some(new), None) => md.diff(&old, &parse_hash(&new)?)?,
                (None, Some(path)) => md.diff_path(&old, &path)?,
                _ => return Err(anyhow!("provide either a second hash or --path")),
            };

            if map.is_empty() {
                println!("{}", "no differences".dimmed());
            }
            for (file, entry) in &map {
                if entry.is_new() {
                    println!("{} {}", "A".green().bold(), file.green());
                } else if entry.is_removed() {
                    println!("{} {}", "D".red().bold(), file.red());
                } else {
                    println!("{} {}", "M".yellow().bold(), file.yellow());
                    if unified {
                        for line in entry.unified()?.lines() {
                            if line.starts_with('+') {
                                println!("{}", line.green());
                            } else if line.starts_with('-') {
                                println!("{}", line.red());
                            } else {
                                println!("{line}");
                            }
                        }
                    }
                }
            }
        }

        Commands::Fetch { hash, target } => {
            let hash = parse_hash(&hash)?;
            if md.fetch(&hash, &target) {
                println!("fetched {} to {:?}", hash, target);
            } else {
                return Err(anyhow!("fetch failed (target in the way, or hash missing?)"));
            }
        }

        Commands::Find { root, path } => {
            let root = parse_hash(&root)?;
            match md.find(&root, &path)? {
                Some(hash) => println!("{hash}"),
                None => {
                    println!("{}", "not found".dimmed());
                    std::process::exit(1);
                }
            }
        }

        Commands::Ls { hash } => {
            let hash = parse_hash(&hash)?;
            for (name, child) in md.store_ref().children_of(&hash)? {
                let marker = match md.store_ref().kind_of(&child)? {
                    NodeKind::Directory => "/".blue().to_string(),
                    NodeKind::File => String::new(),
                };
                println!("{child}  {name}{marker}");
            }
        }

        Commands::Stats => {
            let stats = md.stats()?;
            println!("nodes:        {}", stats.node_count);
            println!("contents:     {}", stats.content_count);
            println!("edges:        {}", stats.edge_count);
            println!("size on disk: {} bytes", stats.size_on_disk);
        }
    }

    Ok(())
}
