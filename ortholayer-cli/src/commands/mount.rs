//! Mount command - serve a backing directory with generated textures.

use crate::error::CliError;
use crate::runner::CliRunner;
use ortholayer::cache::{CacheReclaimer, ProcessMemory, TileCache};
use ortholayer::config::{format_size, num_cpus, ConfigFile};
use ortholayer::fuse::{MountConfig, OrthoFs, OrthoFuse};
use ortholayer::log::TracingLogger;
use ortholayer::provider::{PlaceholderTileFactory, TileProviderFactory};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// How often the main thread checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Arguments for the mount command.
pub struct MountArgs {
    pub root: Option<PathBuf>,
    pub mountpoint: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub maptype_override: Option<String>,
    pub threads: Option<usize>,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// Command-line values merged over the config file.
#[derive(Debug, PartialEq, Eq)]
pub struct MountPlan {
    pub root: PathBuf,
    pub mountpoint: PathBuf,
    pub threads: usize,
}

/// Fold command-line overrides into `config` and pick the paths to serve.
pub fn resolve(args: &MountArgs, config: &mut ConfigFile) -> Result<MountPlan, CliError> {
    if let Some(dir) = &args.cache_dir {
        config.paths.cache_dir = dir.clone();
    }
    if let Some(map_type) = &args.maptype_override {
        if map_type.contains('/') {
            return Err(CliError::Config(format!(
                "map type override '{}' must not contain '/'",
                map_type
            )));
        }
        config.tiles.maptype_override = Some(map_type.clone()).filter(|m| !m.is_empty());
    }
    if let Some(threads) = args.threads {
        config.fuse.threads = threads;
    }

    let root = args
        .root
        .clone()
        .or_else(|| config.paths.root.clone())
        .ok_or_else(|| CliError::Config("no backing directory (ROOT) given".to_string()))?;
    let mountpoint = args
        .mountpoint
        .clone()
        .or_else(|| config.paths.mountpoint.clone())
        .ok_or_else(|| CliError::Config("no mountpoint given".to_string()))?;

    if !root.is_dir() {
        return Err(CliError::MissingRoot(root));
    }

    Ok(MountPlan {
        root,
        mountpoint,
        threads: config.fuse.threads,
    })
}

/// Run the mount command. Blocks until Ctrl-C or an external unmount.
pub fn run(args: MountArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("mount");

    let mut config = runner.config().clone();
    let plan = resolve(&args, &mut config)?;
    let cache_config = config.tile_cache_config();

    let factory: Arc<dyn TileProviderFactory> = Arc::new(PlaceholderTileFactory::new());
    let reclaim_interval = cache_config.reclaim_interval;

    println!("OrthoLayer v{}", ortholayer::VERSION);
    println!("================================");
    println!();
    println!("Root:       {}", plan.root.display());
    println!("Mountpoint: {}", plan.mountpoint.display());
    println!("Cache dir:  {}", cache_config.cache_dir.display());
    println!("Provider:   {}", factory.name());
    let workers = match plan.threads {
        0 => num_cpus(),
        n => n,
    };
    println!("Workers:    {}", workers);
    println!(
        "Reclaim:    above {} tiles and {} resident, every {}s",
        cache_config.watermark,
        format_size(cache_config.memory_limit),
        reclaim_interval.as_secs()
    );
    if let Some(map_type) = &cache_config.maptype_override {
        println!("Map type:   {} (override)", map_type);
    }
    println!();

    let cache = Arc::new(TileCache::new(factory, cache_config, Arc::new(TracingLogger)));
    let reclaimer = CacheReclaimer::start(
        Arc::clone(&cache),
        Arc::new(ProcessMemory::new()),
        reclaim_interval,
    )
    .map_err(|e| CliError::Startup(format!("tile reclaimer: {}", e)))?;

    let fs = OrthoFs::new(&plan.root, Arc::clone(&cache))
        .with_owner(config.fuse.uid, config.fuse.gid);
    let fuse = OrthoFuse::new(Arc::new(fs), plan.threads)
        .map_err(|e| CliError::Startup(format!("FUSE workers: {}", e)))?;
    let mount_config = MountConfig {
        allow_other: config.fuse.allow_other,
        ..MountConfig::default()
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Startup(format!("signal handler: {}", e)))?;

    let session = ortholayer::fuse::spawn(fuse, &plan.mountpoint, &mount_config)?;
    info!("Mounted {} at {}", plan.root.display(), plan.mountpoint.display());
    println!("Mounted. Press Ctrl+C to unmount and exit");

    wait_for_exit(&shutdown, || session.guard.is_finished());

    println!();
    println!("Unmounting...");
    drop(session);
    drop(reclaimer);

    let stats = cache.stats();
    info!(
        "Session ended: {} hits, {} misses, {} evictions",
        stats.hits, stats.misses, stats.evictions
    );
    println!("Filesystem unmounted.");
    Ok(())
}

/// Block until `shutdown` is set or `finished` reports the session ended.
fn wait_for_exit<F: Fn() -> bool>(shutdown: &AtomicBool, finished: F) {
    while !shutdown.load(Ordering::SeqCst) {
        if finished() {
            info!("Filesystem was unmounted externally");
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
    info!("Shutdown requested");
}
