mod cli;
mod command;
mod constants;
mod error;
mod marker;
mod repo;
mod status;
mod ui;

use crate::cli::{Action, Cli};
use crate::constants::{MARK_SENTINEL_TEXT, UNKNOWN_BRANCH};
use crate::repo::GitRepo;
use crate::status::FileEntry;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    ui::set_verbose(cli.verbose);

    match cli.action() {
        Action::Status => {
            let repo = open_repo(&cli)?;
            if !cli.json && !repo.working_tree_modified()? {
                status!("working tree clean");
                return Ok(());
            }
            print_entries(&cli, &repo, "changes", &repo.file_entries()?)?;
        }
        Action::Untracked => {
            let repo = open_repo(&cli)?;
            print_entries(&cli, &repo, "untracked", &repo.untracked_files()?)?;
        }
        Action::Unmerged => {
            let repo = open_repo(&cli)?;
            print_entries(&cli, &repo, "unmerged", &repo.unmerged_files()?)?;
        }
        Action::Marked => {
            let repo = open_repo(&cli)?;
            print_entries(&cli, &repo, "marked", &repo.marked_files()?)?;
        }
        Action::Branch => {
            let branch = open_repo(&cli)?.branch_name()?;
            if cli.json {
                print_json(&serde_json::json!({ "branch": branch }))?;
            } else {
                info!(branch.as_deref().unwrap_or(UNKNOWN_BRANCH));
            }
        }
        Action::Commit { back } => {
            let name = open_repo(&cli)?.past_commit_name(-i32::from(back))?;
            if cli.json {
                print_json(&serde_json::json!({ "commit": name }))?;
            } else {
                info!(name);
            }
        }
        Action::Scan { files } => scan_files(&files, cli.json)?,
        Action::Marker => info!(MARK_SENTINEL_TEXT),
    }

    Ok(())
}

fn open_repo(cli: &Cli) -> Result<GitRepo> {
    let repo = GitRepo::open(&cli.dir, Duration::from_secs(cli.timeout))
        .with_context(|| format!("failed to open repository at {}", cli.dir.display()))?;
    verbose!("repository root: {}", repo.root().display());
    Ok(repo)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialise output")?;
    info!(json);
    Ok(())
}

/// print entries as JSON (root-relative paths) or as a listing relative to --dir
fn print_entries(cli: &Cli, repo: &GitRepo, title: &str, entries: &[FileEntry]) -> Result<()> {
    if cli.json {
        return print_json(entries);
    }

    let relative = |path: &str| -> Result<String> {
        let path = repo.path_relative_to(path, Some(cli.dir.as_path()))?;
        Ok(path.to_string_lossy().into_owned())
    };
    let entries = entries
        .iter()
        .map(|entry| {
            let mut entry = entry.clone();
            entry.path = relative(&entry.path)?;
            if let Some(original_path) = &entry.original_path {
                entry.original_path = Some(relative(original_path)?);
            }
            Ok(entry)
        })
        .collect::<Result<Vec<_>>>()?;

    ui::display_entries(title, &entries);
    Ok(())
}

/// marker offset for a single scanned file
#[derive(Debug, Serialize)]
struct ScanResult {
    path: PathBuf,
    offset: Option<usize>,
}

fn scan_file(path: &Path) -> Result<ScanResult> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(ScanResult {
        path: path.to_path_buf(),
        offset: marker::index_of_marker(&bytes),
    })
}

fn scan_files(files: &[PathBuf], json: bool) -> Result<()> {
    let results = files
        .iter()
        .map(|path| scan_file(path))
        .collect::<Result<Vec<_>>>()?;

    if json {
        return print_json(&results);
    }
    for result in &results {
        match result.offset {
            Some(offset) => info!("{}: marker at offset {}", result.path.display(), offset),
            None => info!("{}: no marker", result.path.display()),
        }
    }
    Ok(())
}
