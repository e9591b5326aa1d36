mod config;
mod project;
mod surface;
mod watcher;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use codeplay_preview::{
    compose_document, decode_url, export_bundle, export_html, share_url, BridgeHub,
    JsonFileStore, PreviewSession, SnapshotStore, SnippetLibrary, SourceBuffers, SurfaceSlot,
    Template, EXPORT_ZIP_NAME, TEMPLATES,
};
use config::HostConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surface::FileSurface;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codeplay", version, about = "Live HTML/CSS/JS playground with a sandboxed preview")]
struct Cli {
    /// Configuration file (defaults to <dir>/codeplay.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a project directory and keep the preview page up to date
    Watch {
        dir: PathBuf,
        /// Preview page to write (overrides the configured output)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the composed preview document once
    Compose {
        dir: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export the project as a single HTML file and/or a three-file bundle
    Export {
        dir: PathBuf,
        #[arg(long)]
        html: Option<PathBuf>,
        /// ZIP archive path; defaults to playground-export.zip in DIR
        #[arg(long, num_args = 0..=1)]
        bundle: Option<Option<PathBuf>>,
        /// Write the bundle files into this directory instead of an archive
        #[arg(long, conflicts_with = "bundle")]
        bundle_dir: Option<PathBuf>,
    },
    /// Create share links or restore a project from one
    Share {
        #[command(subcommand)]
        action: ShareAction,
    },
    /// Create a project directory from a starter template
    New {
        dir: PathBuf,
        #[arg(long, default_value = "Hello World")]
        template: String,
        /// Overwrite existing source files
        #[arg(long)]
        force: bool,
    },
    /// List starter templates
    Templates,
    /// Manage saved snippets of a project
    Snippet {
        #[command(subcommand)]
        action: SnippetAction,
    },
}

#[derive(Subcommand)]
enum ShareAction {
    Encode {
        dir: PathBuf,
        #[arg(long, default_value = "https://codeplay.local/")]
        base: String,
    },
    Decode {
        link: String,
        /// Write the decoded sources into this directory instead of printing them
        #[arg(long)]
        into: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SnippetAction {
    Save {
        dir: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    List {
        dir: PathBuf,
    },
    Load {
        dir: PathBuf,
        index: usize,
    },
    Delete {
        dir: PathBuf,
        index: usize,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let explicit = cli.config.as_deref();

    match cli.command {
        Command::Watch { dir, out } => {
            let config = HostConfig::load(&dir, explicit)?;
            watch(&dir, &config, out).await
        }
        Command::Compose { dir, out } => {
            let config = HostConfig::load(&dir, explicit)?;
            let snapshot = project::read_project(&dir, &config.files)?;
            let doc = compose_document(&snapshot);
            match out {
                Some(path) => std::fs::write(&path, doc)
                    .with_context(|| format!("write {}", path.display())),
                None => {
                    print!("{}", doc);
                    Ok(())
                }
            }
        }
        Command::Export {
            dir,
            html,
            bundle,
            bundle_dir,
        } => {
            let config = HostConfig::load(&dir, explicit)?;
            export(&dir, &config, html, bundle, bundle_dir)
        }
        Command::Share { action } => share(action, explicit),
        Command::New {
            dir,
            template,
            force,
        } => {
            let config = HostConfig::load(&dir, explicit)?;
            let Some((_, t)) = Template::find(&template) else {
                bail!("unknown template '{}' (see `codeplay templates`)", template);
            };
            if !force && !project::is_unset(&dir, &config.files) {
                bail!("{} already has sources; pass --force to overwrite", dir.display());
            }
            project::write_project(&dir, &config.files, &t.to_snapshot())?;
            println!("✓ created {} from '{}'", dir.display(), t.name);
            Ok(())
        }
        Command::Templates => {
            for (i, t) in TEMPLATES.iter().enumerate() {
                println!("{:>2}  {}", i, t.name);
            }
            Ok(())
        }
        Command::Snippet { action } => snippet(action, explicit),
    }
}

async fn watch(dir: &Path, config: &HostConfig, out: Option<PathBuf>) -> anyhow::Result<()> {
    let store = JsonFileStore::new(HostConfig::resolve(dir, &config.state_file));
    if project::is_unset(dir, &config.files) {
        if let Some(saved) = store.load() {
            tracing::info!("restoring last saved state into {}", dir.display());
            project::write_project(dir, &config.files, &saved)?;
        }
    }

    let initial = project::read_project(dir, &config.files)?;
    let buffers = Arc::new(SourceBuffers::new(initial));
    let output = out.unwrap_or_else(|| HostConfig::resolve(dir, &config.output));
    let surface = FileSurface::new(&output, config.live_reload());
    let session = PreviewSession::start(
        &buffers,
        SurfaceSlot::with(surface),
        BridgeHub::new(),
        config.debounce(),
    );
    let watcher = tokio::spawn(watcher::watch_project(
        dir.to_path_buf(),
        config.files.clone(),
        Arc::clone(&buffers),
        config.poll_interval(),
    ));

    tracing::info!(
        dir = %dir.display(),
        output = %output.display(),
        debounce_ms = config.debounce_ms,
        "watching project (Ctrl+C to stop)"
    );

    let mut pending = session.pending();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = pending.changed() => {
                if changed.is_err() {
                    break;
                }
                if *pending.borrow_and_update() {
                    tracing::debug!("edit received, preview pending");
                }
            }
        }
    }

    watcher.abort();
    session.shutdown();
    store.save(&buffers.snapshot());
    tracing::info!("state saved, bye");
    Ok(())
}

fn export(
    dir: &Path,
    config: &HostConfig,
    html: Option<PathBuf>,
    bundle: Option<Option<PathBuf>>,
    bundle_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let snapshot = project::read_project(dir, &config.files)?;
    let html = match (&html, &bundle, &bundle_dir) {
        (None, None, None) => Some(dir.join(codeplay_preview::export::EXPORT_FILE_NAME)),
        _ => html,
    };
    if let Some(path) = html {
        std::fs::write(&path, export_html(&snapshot))
            .with_context(|| format!("write {}", path.display()))?;
        println!("✓ exported {}", path.display());
    }
    if let Some(path) = bundle {
        let path = path.unwrap_or_else(|| dir.join(EXPORT_ZIP_NAME));
        export_bundle(&snapshot).write_zip(&path)?;
        println!("✓ exported {}", path.display());
    }
    if let Some(out_dir) = bundle_dir {
        let written = export_bundle(&snapshot).write_to(&out_dir)?;
        for path in written {
            println!("✓ exported {}", path.display());
        }
    }
    Ok(())
}

fn share(action: ShareAction, explicit: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ShareAction::Encode { dir, base } => {
            let config = HostConfig::load(&dir, explicit)?;
            let snapshot = project::read_project(&dir, &config.files)?;
            println!("{}", share_url(&base, &snapshot));
            Ok(())
        }
        ShareAction::Decode { link, into } => {
            let Some(snapshot) = decode_url(&link) else {
                bail!("not a valid share link");
            };
            match into {
                Some(dir) => {
                    let config = HostConfig::load(&dir, explicit)?;
                    project::write_project(&dir, &config.files, &snapshot)?;
                    println!("✓ restored into {}", dir.display());
                }
                None => {
                    println!(
                        "--- html\n{}\n--- css\n{}\n--- js\n{}",
                        snapshot.markup(),
                        snapshot.style(),
                        snapshot.script()
                    );
                }
            }
            Ok(())
        }
    }
}

fn snippet(action: SnippetAction, explicit: Option<&Path>) -> anyhow::Result<()> {
    let dir = match &action {
        SnippetAction::Save { dir, .. }
        | SnippetAction::List { dir }
        | SnippetAction::Load { dir, .. }
        | SnippetAction::Delete { dir, .. } => dir.clone(),
    };
    let config = HostConfig::load(&dir, explicit)?;
    let mut library = SnippetLibrary::open(HostConfig::resolve(&dir, &config.snippets_file));

    match action {
        SnippetAction::Save { name, .. } => {
            let snapshot = project::read_project(&dir, &config.files)?;
            let saved = library.save(name.as_deref(), snapshot, chrono::Utc::now());
            println!("✓ saved '{}'", saved.name);
        }
        SnippetAction::List { .. } => {
            if library.is_empty() {
                println!("no saved snippets");
            }
            for (i, s) in library.list().iter().enumerate() {
                println!("{:>2}  {}  ({})", i, s.name, s.saved_at.format("%Y-%m-%d %H:%M"));
            }
        }
        SnippetAction::Load { index, .. } => {
            let s = library.get(index)?;
            project::write_project(&dir, &config.files, &s.code)?;
            println!("✓ loaded '{}'", s.name);
        }
        SnippetAction::Delete { index, .. } => {
            let removed = library.delete(index)?;
            println!("✓ deleted '{}'", removed.name);
        }
    }
    Ok(())
}
