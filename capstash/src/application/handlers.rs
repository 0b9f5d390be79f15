use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use capstash_core::container::{self, ContainerSummary};
use capstash_core::domain::Millis;
use capstash_core::error::{CapError, Result};
use capstash_core::naming::{FileNaming, format_timestamp};
use capstash_core::{Ingestor, RegistryError, Stash, StashConfig};

const LIST_TIME: &str = "YYYY-MM-DD hh:mm a";

pub struct StoreArgs {
    pub dir: PathBuf,
    pub config: Option<PathBuf>,
    pub no_sweep: bool,
    pub sync: bool,
}

fn open_store(args: &StoreArgs) -> Result<Stash> {
    let mut cfg = match &args.config {
        Some(path) => StashConfig::from_json_file(path)?,
        None => StashConfig::default(),
    };
    if args.no_sweep {
        cfg.sweep_on_open = false;
    }
    if args.sync {
        cfg.sync_on_commit = true;
    }
    tracing::debug!(dir = %args.dir.display(), sweep = cfg.sweep_on_open, "opening store");
    Stash::open(&args.dir, cfg)
}

fn fmt_time(at: Option<Millis>, naming: &FileNaming) -> String {
    at.map(|ms| format_timestamp(ms, LIST_TIME, naming.offset))
        .unwrap_or_else(|| "-".to_string())
}

fn print_summary(s: &ContainerSummary) {
    println!("metadata   {} bytes", s.metadata_size);
    println!("timescale  {} ns/tick", s.timecode_scale);
    println!("duration   {:.3} s", s.duration_ms / 1000.0);
    println!("clusters   {}", s.clusters);
    println!("blocks     {}", s.blocks);
    println!("cues       {}", s.cue_points);
    println!("seekable   {}", if s.seekable { "yes" } else { "no" });
    for t in &s.tracks {
        println!("track #{:<3} {:?} {}", t.number, t.kind, t.codec);
    }
}

pub fn handle_create(store: &StoreArgs, id: &str) -> Result<()> {
    let stash = open_store(store)?;
    stash.create(id)?;
    Ok(())
}

pub fn handle_append(store: &StoreArgs, id: &str, files: Vec<PathBuf>) -> Result<()> {
    let stash = open_store(store)?;
    let mut size = 0;
    for f in &files {
        let bytes = std::fs::read(f)?;
        size = stash.append(id, &bytes)?.size;
    }
    eprintln!("append: {} fragment(s), recording is now {size} bytes", files.len());
    Ok(())
}

pub fn handle_ingest(store: &StoreArgs, id: &str, chunk_size: usize, create: bool) -> Result<()> {
    if chunk_size == 0 {
        return Err(CapError::Config("--chunk-size must be positive".into()));
    }
    let stash = Arc::new(open_store(store)?);
    if create {
        match stash.create(id) {
            Ok(_) | Err(RegistryError::DuplicateId(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let ingest = Ingestor::spawn(stash, id)?;
    let mut stdin = std::io::stdin().lock();
    loop {
        let mut chunk = Vec::with_capacity(chunk_size);
        let n = (&mut stdin).take(chunk_size as u64).read_to_end(&mut chunk)?;
        if n == 0 {
            break;
        }
        if ingest.push(chunk).is_err() {
            // Worker stopped; finish() reports why.
            break;
        }
    }
    let totals = ingest.finish()?;
    eprintln!(
        "ingest: {} chunk(s), {} bytes, recording is now {} bytes",
        totals.chunks, totals.bytes, totals.size
    );
    Ok(())
}

fn export_target(out: Option<PathBuf>, file_name: &str) -> PathBuf {
    match out {
        Some(p) if p.is_dir() => p.join(file_name),
        Some(p) => p,
        None => PathBuf::from(file_name),
    }
}

pub fn handle_export(store: &StoreArgs, id: &str, out: Option<PathBuf>, strict: bool) -> Result<()> {
    let stash = open_store(store)?;
    let outcome = if strict {
        stash.export_strict(id)?
    } else {
        stash.export(id)?
    };
    let target = export_target(out, &outcome.file_name);
    std::fs::write(&target, &outcome.bytes)?;
    if let Some(e) = &outcome.repair_error {
        eprintln!("export: wrote unrepaired bytes ({e})");
    }
    println!("{}", target.display());
    Ok(())
}

pub fn handle_list(store: &StoreArgs, long: bool) -> Result<()> {
    let stash = open_store(store)?;
    let naming = FileNaming::from_config(stash.config());
    for rec in stash.list()? {
        if long {
            let frags = stash.fragments().fragments(&rec.id)?.len();
            println!(
                "{:<24} size={:<10} frags={:<5} start={} finish={} saved={}",
                rec.id,
                rec.size,
                frags,
                fmt_time(rec.start_at, &naming),
                fmt_time(rec.finish_at, &naming),
                fmt_time(rec.save_at, &naming),
            );
        } else {
            println!("{:<24} {:>10} {}", rec.id, rec.size, fmt_time(rec.finish_at, &naming));
        }
    }
    Ok(())
}

pub fn handle_delete(store: &StoreArgs, id: &str) -> Result<()> {
    let stash = open_store(store)?;
    stash.delete(id)?;
    Ok(())
}

pub fn handle_sweep(store: &StoreArgs, days: Option<u32>) -> Result<()> {
    let stash = open_store(&StoreArgs {
        dir: store.dir.clone(),
        config: store.config.clone(),
        no_sweep: true,
        sync: store.sync,
    })?;
    let days = days.unwrap_or(stash.config().retention_days);
    let report = stash.sweep(days)?;
    eprintln!(
        "sweep: deleted {} recording(s), reclaimed {} orphan(s)",
        report.deleted, report.orphans_reclaimed
    );
    Ok(())
}

pub fn handle_compact(store: &StoreArgs) -> Result<()> {
    let stash = open_store(store)?;
    let stats = stash.compact()?;
    eprintln!(
        "compact: kept {} fragment(s), reclaimed {} bytes",
        stats.fragments, stats.reclaimed_bytes
    );
    Ok(())
}

pub fn handle_stats(store: &StoreArgs) -> Result<()> {
    let stash = open_store(store)?;
    let s = stash.stats()?;
    println!("recordings {}", s.recordings);
    println!("fragments  {}", s.fragments);
    println!("logical    {} bytes", s.logical_bytes);
    println!("stored     {} bytes", s.stored_bytes);
    println!("orphaned   {}", s.orphaned_recordings);
    Ok(())
}

pub fn handle_repair(input: PathBuf, output: PathBuf) -> Result<()> {
    let raw = std::fs::read(&input)?;
    let fixed = container::make_seekable(&raw)?;
    std::fs::write(&output, &fixed.bytes)?;
    eprintln!(
        "repair: metadata {} -> {} bytes, duration {:.3} s, {} cue(s)",
        fixed.original_metadata_len,
        fixed.metadata_len,
        fixed.duration_ms / 1000.0,
        fixed.cues
    );
    Ok(())
}

pub fn handle_inspect(file: PathBuf) -> Result<()> {
    let raw = std::fs::read(&file)?;
    print_summary(&container::inspect(&raw)?);
    Ok(())
}
