//! vestige - archive CLI
//!
//! Thin adapter over the core API. Every subcommand maps onto one public
//! operation; formatting stays here, logic stays in the library.

use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use uuid::Uuid;
use vestige_core::config::ArchiveConfig;
use vestige_core::domain::import::{ImportOptions, ImportRequest};
use vestige_core::domain::location::Location;
use vestige_core::domain::media::MediaKind;
use vestige_core::infrastructure::events::Event;
use vestige_core::matching::BoundingBox;
use vestige_core::ops::locations::{CreateOutcome, LocationFilters};
use vestige_core::shared::types::Actor;
use vestige_core::Archive;

#[derive(Parser)]
#[command(name = "vestige", version, about = "Local-first site documentation archive")]
struct Cli {
    /// Path to a config file (otherwise searched conventionally)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Archive root, overriding config
    #[arg(long, global = true, env = "ARCHIVE_PATH")]
    archive: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import files into a location
    Import {
        /// Target location id
        locid: Uuid,
        /// Files or directories to ingest
        paths: Vec<PathBuf>,
        /// Target sub-location
        #[arg(long)]
        subid: Option<Uuid>,
        /// Delete originals after successful commit
        #[arg(long)]
        delete_originals: bool,
        /// Hardlink instead of copying when possible
        #[arg(long)]
        hardlink: bool,
        /// Skip the post-copy hash verification
        #[arg(long)]
        no_verify: bool,
    },
    /// Resume an interrupted import session
    Resume { import_id: Uuid },
    /// List sessions that can be resumed
    Sessions,
    /// Location management
    #[command(subcommand)]
    Loc(LocCommand),
    /// Media row management
    #[command(subcommand)]
    Media(MediaCommand),
    /// Fixity verification
    #[command(subcommand)]
    Fixity(FixityCommand),
    /// Reference map management
    #[command(subcommand)]
    Refmap(RefmapCommand),
    /// Background job queues
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Derivative maintenance
    #[command(subcommand)]
    Derivatives(DerivativesCommand),
    /// Archive health
    #[command(subcommand)]
    Health(HealthCommand),
    /// Back up the catalog database
    Backup,
}

#[derive(Subcommand)]
enum LocCommand {
    /// Create a location (guarded against duplicates)
    Create {
        name: String,
        #[arg(long)]
        lat: Option<f64>,
        #[arg(long)]
        lng: Option<f64>,
        #[arg(long)]
        state: Option<String>,
        /// Skip the duplicate guard
        #[arg(long)]
        force: bool,
    },
    /// List locations
    List {
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        favorites: bool,
    },
    /// Show one location
    Show { locid: Uuid },
    /// Delete a location (detaches media)
    Delete { locid: Uuid },
    /// Locations near a point
    Nearby {
        lat: f64,
        lng: f64,
        #[arg(long, default_value_t = 10.0)]
        radius_km: f64,
    },
    /// Locations inside a bounding box
    Bounds {
        min_lat: f64,
        min_lng: f64,
        max_lat: f64,
        max_lng: f64,
    },
    /// A random location
    Random,
    /// Toggle favorite
    Favorite { locid: Uuid },
    /// Record a "different place" exclusion pair
    Exclude { name_a: String, name_b: String },
    /// Seal a location into a BagIt bag
    Seal { locid: Uuid },
    /// Verify a sealed location
    VerifyBag { locid: Uuid },
}

#[derive(Subcommand)]
enum MediaCommand {
    /// List media bound to a location
    List { locid: Uuid },
    /// Delete a media row and its blob
    Delete { sha: String, kind: MediaKind },
    /// Move media to a sub-location (omit subid to detach)
    Move {
        sha: String,
        kind: MediaKind,
        #[arg(long)]
        subid: Option<Uuid>,
    },
    /// Hide or unhide a media row
    Hide {
        sha: String,
        kind: MediaKind,
        #[arg(long)]
        unhide: bool,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Subcommand)]
enum FixityCommand {
    /// Verify every stored blob
    All,
    /// Verify one location's media
    Location { locid: Uuid },
    /// Verify a random sample
    Sample {
        #[arg(default_value_t = 100)]
        n: usize,
    },
    /// Show the most recent result
    Last,
}

#[derive(Subcommand)]
enum RefmapCommand {
    /// Parse a file and show what it would import
    Preview { path: PathBuf },
    /// Import a KML/KMZ/GPX/GeoJSON/CSV point file
    Import { path: PathBuf },
    /// List imported maps
    List,
    /// Delete a map and its points
    Delete { map_id: Uuid },
    /// Fuzzy-search points by name
    Find {
        query: String,
        #[arg(long, default_value_t = 0.92)]
        threshold: f64,
        #[arg(long, default_value_t = 3)]
        limit: usize,
        #[arg(long)]
        state: Option<String>,
    },
    /// Merge points sharing a GPS cell
    Dedup,
    /// List points already represented by catalogued locations
    Catalogued,
    /// Delete points already represented by catalogued locations
    Purge,
}

#[derive(Subcommand)]
enum JobsCommand {
    /// Per-queue counts
    Status,
    /// Unacknowledged dead letters
    DeadLetter {
        #[arg(long)]
        queue: Option<String>,
    },
    /// Re-enqueue a dead-lettered job
    Retry { dead_letter_id: Uuid },
    /// Purge completed jobs
    ClearCompleted {
        #[arg(long)]
        older_than_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
enum DerivativesCommand {
    /// Queue thumbnail rebuilds
    Thumbnails {
        #[arg(long)]
        force: bool,
    },
    /// Queue video poster rebuilds
    Posters {
        #[arg(long)]
        force: bool,
    },
    /// Queue DNG preview re-renders
    DngPreviews,
}

#[derive(Subcommand)]
enum HealthCommand {
    /// Entity counts and queue depth
    Dashboard,
    /// Free space on the archive volume
    Disk,
    /// Cross-check media rows against blobs on disk
    Integrity,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ArchiveConfig::load(cli.config.as_deref())?;
    if let Some(archive) = cli.archive {
        config.archive_path = archive;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let archive = Archive::open(config).await?;
    let result = run(&archive, cli.command).await;
    archive.shutdown().await?;
    result
}

async fn run(archive: &Archive, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Import {
            locid,
            paths,
            subid,
            delete_originals,
            hardlink,
            no_verify,
        } => {
            let progress = spawn_progress(archive);
            let report = archive
                .import(ImportRequest {
                    source_paths: paths,
                    locid,
                    subid,
                    options: ImportOptions {
                        delete_originals,
                        use_hardlinks: hardlink,
                        verify_checksums: !no_verify,
                        actor: Actor::current_user().0,
                    },
                    notes: None,
                })
                .await?;
            progress.finish_and_clear();
            println!(
                "session {}: {} imported, {} duplicates, {} sidecars, {} errors{}",
                report.import_id,
                report.imported,
                report.duplicates,
                report.sidecars,
                report.errors,
                if report.cancelled { " (cancelled)" } else { "" }
            );
            for file in report.files.iter().filter(|f| f.error.is_some()) {
                eprintln!(
                    "  error: {} - {}",
                    file.source_path.display(),
                    file.error.as_deref().unwrap_or_default()
                );
            }
        }
        Command::Resume { import_id } => {
            let report = archive.resume_import(import_id).await?;
            println!(
                "session {}: {} imported, {} duplicates, {} errors",
                report.import_id, report.imported, report.duplicates, report.errors
            );
        }
        Command::Sessions => {
            let sessions = archive.resumable_sessions().await?;
            if sessions.is_empty() {
                println!("no resumable sessions");
            } else {
                let mut table = new_table(vec!["import id", "location", "status", "started"]);
                for s in sessions {
                    table.add_row(vec![
                        s.import_id.to_string(),
                        s.locid.to_string(),
                        s.status,
                        s.started_at.to_rfc3339(),
                    ]);
                }
                println!("{table}");
            }
        }
        Command::Loc(cmd) => run_loc(archive, cmd).await?,
        Command::Media(cmd) => run_media(archive, cmd).await?,
        Command::Fixity(cmd) => run_fixity(archive, cmd).await?,
        Command::Refmap(cmd) => run_refmap(archive, cmd).await?,
        Command::Jobs(cmd) => run_jobs(archive, cmd).await?,
        Command::Derivatives(cmd) => run_derivatives(archive, cmd).await?,
        Command::Health(cmd) => run_health(archive, cmd).await?,
        Command::Backup => {
            let path = archive.backup_catalog().await?;
            println!("catalog backed up to {}", path.display());
        }
    }
    Ok(())
}

async fn run_loc(archive: &Archive, cmd: LocCommand) -> anyhow::Result<()> {
    match cmd {
        LocCommand::Create {
            name,
            lat,
            lng,
            state,
            force,
        } => {
            let mut location = Location::new(name, Actor::current_user().0);
            if let (Some(lat), Some(lng)) = (lat, lng) {
                location.gps = Some(vestige_core::domain::location::Gps::new(
                    lat,
                    lng,
                    vestige_core::domain::location::GpsSource::ManualEntry,
                ));
            }
            location.address.state = state;
            match archive.create_location(location, force).await? {
                CreateOutcome::Created(loc) => {
                    println!("created {} ({})", loc.locnam, loc.locid)
                }
                CreateOutcome::DuplicateFound(found) => {
                    println!(
                        "possible duplicate of {:?} ({}); rerun with --force, or record an exclusion",
                        found.matched_name, found.locid
                    );
                    if let Some(d) = found.distance_m {
                        println!("  distance: {d:.0} m");
                    }
                    if let Some(s) = found.similarity {
                        println!("  name similarity: {s:.2}");
                    }
                }
            }
        }
        LocCommand::List { state, favorites } => {
            let locations = archive
                .list_locations(&LocationFilters {
                    state,
                    favorite: favorites.then_some(true),
                    ..Default::default()
                })
                .await?;
            let mut table = new_table(vec!["locid", "name", "state", "gps", "fav"]);
            for loc in locations {
                table.add_row(vec![
                    loc.locid.to_string(),
                    loc.locnam.clone(),
                    loc.address.state.clone().unwrap_or_default(),
                    loc.gps
                        .as_ref()
                        .map(|g| format!("{:.4},{:.4}", g.lat, g.lng))
                        .unwrap_or_default(),
                    if loc.favorite { "*".into() } else { String::new() },
                ]);
            }
            println!("{table}");
        }
        LocCommand::Show { locid } => {
            let loc = archive.get_location(locid).await?;
            println!("{}", serde_json::to_string_pretty(&loc)?);
        }
        LocCommand::Delete { locid } => {
            archive.delete_location(locid).await?;
            println!("deleted {locid} (media detached, blobs kept)");
        }
        LocCommand::Nearby {
            lat,
            lng,
            radius_km,
        } => {
            for (loc, distance) in archive.find_nearby(lat, lng, radius_km).await? {
                println!("{:>8.0} m  {}  {}", distance, loc.locid, loc.locnam);
            }
        }
        LocCommand::Bounds {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        } => {
            let hits = archive
                .find_in_bounds(BoundingBox {
                    min_lat,
                    min_lng,
                    max_lat,
                    max_lng,
                })
                .await?;
            for loc in hits {
                println!("{}  {}", loc.locid, loc.locnam);
            }
        }
        LocCommand::Random => match archive.random_location().await? {
            Some(loc) => println!("{}  {}", loc.locid, loc.locnam),
            None => println!("catalog is empty"),
        },
        LocCommand::Favorite { locid } => {
            let now = archive.toggle_favorite(locid).await?;
            println!("favorite: {now}");
        }
        LocCommand::Exclude { name_a, name_b } => {
            archive
                .add_duplicate_exclusion(&name_a, &name_b, &Actor::current_user().0)
                .await?;
            println!("exclusion recorded");
        }
        LocCommand::Seal { locid } => {
            let report = archive.bags.seal(locid).await?;
            println!("sealed: {} files", report.expected_files);
        }
        LocCommand::VerifyBag { locid } => {
            let report = archive.bags.verify(locid).await?;
            println!(
                "bag status: {} ({}/{} present, {} mismatches)",
                report.status, report.present_files, report.expected_files, report.hash_mismatches
            );
        }
    }
    Ok(())
}

async fn run_media(archive: &Archive, cmd: MediaCommand) -> anyhow::Result<()> {
    match cmd {
        MediaCommand::List { locid } => {
            let mut table = new_table(vec!["hash", "kind", "name", "hidden"]);
            for record in archive.media_by_location(locid).await? {
                table.add_row(vec![
                    record.hash[..12].to_string(),
                    record.kind.to_string(),
                    record.original_name,
                    if record.hidden { "yes".into() } else { String::new() },
                ]);
            }
            println!("{table}");
        }
        MediaCommand::Delete { sha, kind } => {
            archive.delete_media(&sha, kind).await?;
            println!("deleted {sha}");
        }
        MediaCommand::Move { sha, kind, subid } => {
            archive.move_to_sublocation(&sha, kind, subid).await?;
            println!("moved {sha}");
        }
        MediaCommand::Hide {
            sha,
            kind,
            unhide,
            reason,
        } => {
            archive
                .set_media_hidden(&sha, kind, !unhide, reason.as_deref())
                .await?;
            println!("hidden: {}", !unhide);
        }
    }
    Ok(())
}

async fn run_fixity(archive: &Archive, cmd: FixityCommand) -> anyhow::Result<()> {
    let report = match cmd {
        FixityCommand::All => Some(archive.fixity.verify_all().await?),
        FixityCommand::Location { locid } => Some(archive.fixity.verify_location(locid).await?),
        FixityCommand::Sample { n } => Some(
            archive
                .fixity
                .verify(vestige_core::domain::fixity::FixityScope::RandomSample { n })
                .await?,
        ),
        FixityCommand::Last => archive.fixity.last_result().await,
    };
    match report {
        Some(report) => {
            println!(
                "checked {} in {} ms: {} valid, {} corrupted, {} missing, {} errors",
                report.checked,
                report.duration_ms,
                report.valid,
                report.corrupted,
                report.missing,
                report.errors
            );
            for path in &report.corrupted_files {
                eprintln!("  corrupted: {path}");
            }
        }
        None => println!("no fixity run recorded yet"),
    }
    Ok(())
}

async fn run_refmap(archive: &Archive, cmd: RefmapCommand) -> anyhow::Result<()> {
    match cmd {
        RefmapCommand::Preview { path } => {
            let preview = archive.preview_reference_map(&path).await?;
            println!("{} points ({})", preview.point_count, preview.format);
            for name in preview.sample {
                println!("  {name}");
            }
        }
        RefmapCommand::Import { path } => {
            let map = archive
                .import_reference_map(&path, &Actor::current_user().0)
                .await?;
            println!("imported {} ({} points)", map.name, map.point_count);
        }
        RefmapCommand::List => {
            let mut table = new_table(vec!["map id", "name", "format", "points", "imported"]);
            for map in archive.list_reference_maps().await? {
                table.add_row(vec![
                    map.map_id.to_string(),
                    map.name,
                    map.format.to_string(),
                    map.point_count.to_string(),
                    map.imported_at.to_rfc3339(),
                ]);
            }
            println!("{table}");
        }
        RefmapCommand::Delete { map_id } => {
            archive.delete_reference_map(map_id).await?;
            println!("deleted {map_id}");
        }
        RefmapCommand::Find {
            query,
            threshold,
            limit,
            state,
        } => {
            for hit in archive
                .find_reference_matches(&query, threshold, limit, state.as_deref())
                .await?
            {
                println!(
                    "{:.2}  {}  ({:.4},{:.4})",
                    hit.similarity, hit.name, hit.lat, hit.lng
                );
            }
        }
        RefmapCommand::Dedup => {
            let summary = archive.dedup_reference_points().await?;
            println!(
                "merged {} groups, deleted {} points",
                summary.groups_merged, summary.points_deleted
            );
        }
        RefmapCommand::Catalogued => {
            for point in archive.find_catalogued_points().await? {
                println!("{}  {}", point.point_id, point.name);
            }
        }
        RefmapCommand::Purge => {
            let removed = archive.purge_catalogued_points().await?;
            println!("purged {removed} catalogued points");
        }
    }
    Ok(())
}

async fn run_jobs(archive: &Archive, cmd: JobsCommand) -> anyhow::Result<()> {
    match cmd {
        JobsCommand::Status => {
            let mut table = new_table(vec!["queue", "pending", "processing", "completed", "failed"]);
            for status in archive.job_status().await? {
                table.add_row(vec![
                    status.queue,
                    status.pending.to_string(),
                    status.processing.to_string(),
                    status.completed.to_string(),
                    status.failed.to_string(),
                ]);
            }
            println!("{table}");
        }
        JobsCommand::DeadLetter { queue } => {
            for entry in archive.dead_letters(queue.as_deref()).await? {
                println!("{}  {}  {}", entry.id, entry.queue, entry.error);
            }
        }
        JobsCommand::Retry { dead_letter_id } => {
            let job_id = archive.retry_dead_letter(dead_letter_id).await?;
            println!("requeued as {job_id}");
        }
        JobsCommand::ClearCompleted { older_than_ms } => {
            let removed = archive.clear_completed_jobs(older_than_ms).await?;
            println!("purged {removed} completed jobs");
        }
    }
    Ok(())
}

async fn run_derivatives(archive: &Archive, cmd: DerivativesCommand) -> anyhow::Result<()> {
    let queued = match cmd {
        DerivativesCommand::Thumbnails { force } => {
            archive.regenerate_all_thumbnails(force).await?
        }
        DerivativesCommand::Posters { force } => archive.regenerate_video_posters(force).await?,
        DerivativesCommand::DngPreviews => archive.regenerate_dng_previews().await?,
    };
    println!("queued {queued} jobs");
    Ok(())
}

async fn run_health(archive: &Archive, cmd: HealthCommand) -> anyhow::Result<()> {
    match cmd {
        HealthCommand::Dashboard => {
            let dashboard = archive.dashboard().await?;
            println!("{}", serde_json::to_string_pretty(&dashboard)?);
        }
        HealthCommand::Disk => {
            let disk = archive.disk_space().await?;
            println!(
                "{}: {:.1} GiB free of {:.1} GiB",
                disk.archive_path,
                disk.available_bytes as f64 / (1 << 30) as f64,
                disk.total_bytes as f64 / (1 << 30) as f64
            );
        }
        HealthCommand::Integrity => {
            let report = archive.integrity_check().await?;
            println!(
                "{} media rows, {} missing blobs, {} foreign files",
                report.media_rows,
                report.missing_blobs.len(),
                report.foreign_files.len()
            );
            for path in &report.missing_blobs {
                eprintln!("  missing: {path}");
            }
        }
    }
    Ok(())
}

/// Mirror import progress events onto a progress bar.
fn spawn_progress(archive: &Archive) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
            .expect("static template"),
    );
    let mut events = archive.events.subscribe();
    let bar_handle = bar.clone();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Event::ImportProgress {
                state,
                files_done,
                files_total,
                ..
            } = event
            {
                bar_handle.set_length(files_total as u64);
                bar_handle.set_position(files_done as u64);
                bar_handle.set_message(state.to_string());
            }
        }
    });
    bar
}

fn new_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(headers);
    table
}
