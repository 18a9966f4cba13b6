use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use cas_server::{CasServer, ServerConfig};
use cas_store::{scrub, LocalFsStore, ObjectStore, ScrubReport, StoreError, StoreStats};
use cas_types::{ContentAddress, ObjectMetadata};
use colored::Colorize;
use serde_json::json;
use tokio::io::AsyncWriteExt;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let root = cli.root;
    match cli.command {
        Command::Serve(args) => cmd_serve(root, args).await,
        Command::Put(args) => cmd_put(&open_store(root).await?, args, format).await,
        Command::Get(args) => cmd_get(&open_store(root).await?, args).await,
        Command::Rm(args) => cmd_rm(&open_store(root).await?, args).await,
        Command::Verify(args) => cmd_verify(&open_store(root).await?, args, format).await,
        Command::Fsck(_) => cmd_fsck(&open_store(root).await?, format).await,
        Command::Sweep(args) => cmd_sweep(&open_store(root).await?, args, format).await,
        Command::Stats(_) => cmd_stats(&open_store(root).await?, format).await,
    }
}

async fn open_store(root: Option<PathBuf>) -> anyhow::Result<LocalFsStore> {
    let root = root.unwrap_or_else(|| ServerConfig::default().storage_root);
    LocalFsStore::open(&root)
        .await
        .with_context(|| format!("failed to open store at {}", root.display()))
}

fn parse_address(hex: &str) -> anyhow::Result<ContentAddress> {
    ContentAddress::from_hex(hex).with_context(|| format!("invalid address {hex:?}"))
}

fn print_metadata(meta: &ObjectMetadata, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(meta)?),
        OutputFormat::Text => println!("{}  {} bytes", meta.address.to_string().yellow(), meta.length),
    }
    Ok(())
}

async fn cmd_serve(root: Option<PathBuf>, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(root) = root {
        config.storage_root = root;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    println!(
        "cas server on {} (root: {})",
        config.bind_addr.to_string().bold(),
        config.storage_root.display()
    );
    CasServer::open(config).await?.serve().await?;
    Ok(())
}

/// Store one file. A dedup hit is not an error here; the existing metadata is
/// returned as-is.
pub(crate) async fn put_file(
    store: &dyn ObjectStore,
    path: &Path,
    md5: Option<&str>,
) -> anyhow::Result<(ObjectMetadata, bool)> {
    let expected = md5.map(parse_address).transpose()?;
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    match store.store(&mut file, expected).await {
        Ok(meta) => Ok((meta, true)),
        Err(StoreError::AlreadyExists(meta)) => Ok((meta, false)),
        Err(e) => Err(e.into()),
    }
}

async fn cmd_put(store: &LocalFsStore, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (meta, created) = put_file(store, &args.file, args.md5.as_deref()).await?;
    if !created && format == OutputFormat::Text {
        eprintln!("{} already stored", "note:".cyan());
    }
    print_metadata(&meta, format)
}

async fn cmd_get(store: &LocalFsStore, args: GetArgs) -> anyhow::Result<()> {
    let address = parse_address(&args.hash)?;
    let mut handle = store.open(&address).await?;
    if args.validate {
        handle.verify().await?;
    }
    match &args.output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            tokio::io::copy(&mut handle, &mut file).await?;
            file.sync_all().await?;
            eprintln!("{} wrote {} bytes to {}", "✓".green(), handle.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut handle, &mut stdout).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

async fn cmd_rm(store: &LocalFsStore, args: RmArgs) -> anyhow::Result<()> {
    let address = parse_address(&args.hash)?;
    store.delete(&address).await?;
    println!("{} Deleted {}", "✓".green(), address.to_string().yellow());
    Ok(())
}

async fn cmd_verify(store: &LocalFsStore, args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let address = parse_address(&args.hash)?;
    let meta = store.verify(&address).await?;
    match format {
        OutputFormat::Json => print_metadata(&meta, format)?,
        OutputFormat::Text => println!("{} {} intact ({} bytes)", "✓".green().bold(), address.to_string().yellow(), meta.length),
    }
    Ok(())
}

fn report_json(report: &ScrubReport) -> serde_json::Value {
    json!({
        "checked": report.checked,
        "healthy": report.healthy,
        "bytes_verified": report.bytes_verified,
        "vanished": report.vanished,
        "corrupt": report.corrupt.iter().map(|c| json!({
            "address": c.address,
            "computed": c.computed,
        })).collect::<Vec<_>>(),
    })
}

async fn cmd_fsck(store: &LocalFsStore, format: OutputFormat) -> anyhow::Result<()> {
    let report = scrub(store).await?;
    match format {
        OutputFormat::Json => println!("{}", report_json(&report)),
        OutputFormat::Text => {
            for c in &report.corrupt {
                println!("  {} {} (content hashes to {})", "corrupt:".red(), c.address.to_string().yellow(), c.computed);
            }
            println!(
                "Checked {} objects, {} bytes verified, {} vanished",
                report.checked.to_string().bold(),
                report.bytes_verified,
                report.vanished
            );
            if report.is_clean() {
                println!("{} No issues.", "✓".green().bold());
            }
        }
    }
    if !report.is_clean() {
        bail!("{} corrupt object(s)", report.corrupt.len());
    }
    Ok(())
}

async fn cmd_sweep(store: &LocalFsStore, args: SweepArgs, format: OutputFormat) -> anyhow::Result<()> {
    let removed = store.sweep_staging(Duration::from_secs(args.older_than)).await?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "removed": removed })),
        OutputFormat::Text => println!("{} Swept {} staging file(s).", "✓".green(), removed),
    }
    Ok(())
}

fn stats_json(stats: &StoreStats) -> serde_json::Value {
    json!({
        "objects": stats.objects,
        "bytes": stats.bytes,
        "staging_files": stats.staging_files,
    })
}

async fn cmd_stats(store: &LocalFsStore, format: OutputFormat) -> anyhow::Result<()> {
    let stats = store.stats().await?;
    match format {
        OutputFormat::Json => println!("{}", stats_json(&stats)),
        OutputFormat::Text => {
            println!("Root: {}", store.root().display().to_string().bold());
            println!("  Objects: {}", stats.objects.to_string().cyan());
            println!("  Bytes: {}", stats.bytes.to_string().cyan());
            println!("  Staging files: {}", stats.staging_files);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cas_crypto::ContentHasher;
    use cas_store::{CorruptObject, InMemoryObjectStore};

    #[tokio::test]
    async fn put_file_reports_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();
        let store = InMemoryObjectStore::new();

        let (meta, created) = put_file(&store, &path, None).await.unwrap();
        assert!(created);
        assert_eq!(meta.address.to_hex(), "5d41402abc4b2a76b9719d911017c592");

        let (again, created) = put_file(&store, &path, None).await.unwrap();
        assert!(!created);
        assert_eq!(again, meta);
    }

    #[tokio::test]
    async fn put_file_checks_declared_md5() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();
        let store = InMemoryObjectStore::new();

        let err = put_file(&store, &path, Some("7d793037a0760186574b0282f2f435e7"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::HashMismatch { .. })
        ));
        assert!(put_file(&store, &path, Some("zz")).await.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn scrub_report_json_shape() {
        let report = ScrubReport {
            checked: 2,
            healthy: 1,
            bytes_verified: 5,
            corrupt: vec![CorruptObject {
                address: ContentHasher::digest(b"hello"),
                computed: ContentHasher::digest(b"jello"),
            }],
            vanished: 0,
        };
        let value = report_json(&report);
        assert_eq!(value["checked"], 2);
        assert_eq!(value["corrupt"][0]["address"], "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn parse_address_rejects_garbage() {
        assert!(parse_address("5d41402abc4b2a76b9719d911017c592").is_ok());
        assert!(parse_address("hello").is_err());
    }
}
