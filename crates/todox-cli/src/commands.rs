use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, info_span};

use todox_cli::push::SyncTarget;
use todox_cli::settings::{Settings, save_settings, settings_path};
use todox_cli::summary::{print_inspection, print_queue};
use todox_container::{
    ContainerError, HeaderFlags, bundle_file_name, export_bundle, export_to_dir, import_bundle,
    import_document, import_files, parse_container, read_container, write_container,
};
use todox_model::{BatchImport, TodoDocument};
use todox_queue::{OfflineQueue, SyncOutcome};

use crate::cli::{BundleArgs, ConfigCommand, ExportArgs, ImportArgs, QueueCommand, SyncArgs};

pub fn run_export(args: &ExportArgs, settings: &Settings) -> Result<PathBuf> {
    let document = read_document(&args.document)?;
    let _span = info_span!("export", id = %document.id).entered();

    let mut options = settings.export_options();
    if args.no_transform {
        options = options.with_flags(HeaderFlags::COMPRESSED);
    }
    let dir = output_dir(args.out_dir.as_deref());
    export_to_dir(&document, &dir, &options)
        .with_context(|| format!("export {}", args.document.display()))
}

pub fn run_import(args: &ImportArgs, settings: &Settings) -> Result<BatchImport> {
    let _span = info_span!("import", files = args.files.len()).entered();
    let batch = import_files(&args.files);
    if args.enqueue {
        enqueue(&batch, settings)?;
    }
    Ok(batch)
}

/// Print the header of `path` and try a full import. Returns whether the
/// content verified.
pub fn run_inspect(path: &Path) -> Result<bool> {
    let bytes = read_container(path)?;
    let parsed =
        parse_container(&bytes).with_context(|| format!("inspect {}", path.display()))?;
    let verification: Result<_, ContainerError> = import_document(&bytes);
    print_inspection(path, &parsed.header, &verification);
    Ok(verification.is_ok())
}

pub fn run_bundle(args: &BundleArgs, settings: &Settings) -> Result<PathBuf> {
    let documents = args
        .documents
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>>>()?;
    let _span = info_span!("bundle", documents = documents.len()).entered();

    let options = settings.export_options();
    let created_at = options.resolve_created_at();
    let options = options.with_created_at(created_at);
    let bytes = export_bundle(&documents, &options).context("build bundle")?;

    let dir = output_dir(args.out_dir.as_deref());
    let path = dir.join(bundle_file_name(created_at.timestamp_millis()));
    write_container(&path, &bytes)?;
    info!("Bundled {} document(s) into {}", documents.len(), path.display());
    Ok(path)
}

pub fn run_unbundle(
    path: &Path,
    enqueue_documents: bool,
    settings: &Settings,
) -> Result<BatchImport> {
    let _span = info_span!("unbundle", path = %path.display()).entered();
    let bytes = read_container(path)?;
    let batch =
        import_bundle(&bytes).with_context(|| format!("read bundle {}", path.display()))?;
    if enqueue_documents {
        enqueue(&batch, settings)?;
    }
    Ok(batch)
}

pub fn run_queue(command: &QueueCommand, settings: &Settings) -> Result<()> {
    let queue: OfflineQueue<TodoDocument> = OfflineQueue::new(settings.queue_config());
    match command {
        QueueCommand::Save { documents } => {
            let documents = documents
                .iter()
                .map(|path| read_document(path))
                .collect::<Result<Vec<_>>>()?;
            let snapshot = queue.save_offline_update(&documents)?;
            println!(
                "Queued {} document(s); {} pending.",
                documents.len(),
                snapshot.len()
            );
        }
        QueueCommand::List => {
            let documents = queue.try_get_offline_updates()?;
            print_queue(queue.path(), &documents);
        }
        QueueCommand::Remove { id } => {
            if queue.remove_offline_item(id)? {
                println!("Removed {id}.");
            } else {
                println!("{id} was not queued.");
            }
        }
        QueueCommand::Clear => {
            let cleared = queue.clear_offline_updates()?;
            println!("Cleared {cleared} pending document(s).");
        }
        QueueCommand::Sync(args) => run_sync(&queue, args, settings)?,
    }
    Ok(())
}

fn run_sync(
    queue: &OfflineQueue<TodoDocument>,
    args: &SyncArgs,
    settings: &Settings,
) -> Result<()> {
    let target = sync_target(args, settings)?;
    let _span = info_span!("sync", target = %target.describe()).entered();
    let outcome = match queue.sync_to_server(|documents| target.push(documents)) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}", err.user_message());
            return Err(err.into());
        }
    };
    match outcome {
        SyncOutcome::Empty => println!("Nothing to sync."),
        SyncOutcome::Synced { count } => {
            println!("Synced {count} document(s) to {}.", target.describe());
        }
    }
    Ok(())
}

fn sync_target(args: &SyncArgs, settings: &Settings) -> Result<SyncTarget> {
    if let Some(dir) = &args.outbox {
        return Ok(SyncTarget::Outbox(dir.clone()));
    }
    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| settings.sync.endpoint.clone())
        .context("no sync target: pass --endpoint or --outbox, or set sync.endpoint")?;
    Ok(SyncTarget::Http {
        endpoint,
        timeout: settings.sync.timeout(),
    })
}

pub fn run_config(
    command: &ConfigCommand,
    explicit: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(settings_path)
        .context("could not determine the settings path; pass --config")?;
    match command {
        ConfigCommand::Show => {
            let content = toml::to_string_pretty(settings).context("serialize settings")?;
            print!("{content}");
        }
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists; use --force to overwrite", path.display());
            }
            save_settings(&Settings::default(), &path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn enqueue(batch: &BatchImport, settings: &Settings) -> Result<()> {
    if batch.documents.is_empty() {
        return Ok(());
    }
    let documents: Vec<TodoDocument> = batch
        .documents
        .iter()
        .map(|envelope| envelope.document.clone())
        .collect();
    let queue: OfflineQueue<TodoDocument> = OfflineQueue::new(settings.queue_config());
    queue
        .save_offline_update(&documents)
        .context("queue imported documents")?;
    info!(count = documents.len(), "queued imported documents");
    Ok(())
}

fn read_document(path: &Path) -> Result<TodoDocument> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
}

fn output_dir(dir: Option<&Path>) -> PathBuf {
    dir.map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
