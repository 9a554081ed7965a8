use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mosaic_core::{
    AppConfig, Bounds, LayoutData, LayoutEngine, ObjectStore, PlacementReport, SceneObject,
    SceneRegistry, Strategy, StreamInfo, ThreadMode,
};
use tracing_subscriber::EnvFilter;

fn main() -> mosaic_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            objects,
            frames,
            threaded,
            config,
        } => run_demo(objects, frames, threaded, config.as_deref()),
        Commands::Arrange {
            strategy,
            count,
            width,
            height,
        } => run_arrange(&strategy, count, width, height),
    }
}

/// Headless simulation: synthetic streams arrive and depart while the main
/// loop pumps frames, exactly the shape a windowed front end would drive.
fn run_demo(
    objects: usize,
    frames: u64,
    threaded: bool,
    config: Option<&std::path::Path>,
) -> mosaic_core::Result<()> {
    let mut config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if threaded {
        config.registry.thread_mode = ThreadMode::Dual;
    }
    tracing::info!(
        objects,
        frames,
        thread_mode = ?config.registry.thread_mode,
        "starting demo"
    );

    let registry = Arc::new(SceneRegistry::headless(config.registry));
    let feed = move |registry: &SceneRegistry| -> mosaic_core::Result<()> {
        for i in 0..objects {
            let mut info = StreamInfo::new(format!("stream-{i}"))
                .with_aspect(if i % 3 == 0 { 1.78 } else { 1.33 });
            // Every other arrival carries a site tag so grouping kicks in.
            if i % 2 == 0 {
                info = info.with_site(format!("site-{}", i % 4));
            }
            let id = registry.add_source(info)?;
            if i % 5 == 4 {
                registry.delete_source(id)?;
            }
        }
        Ok(())
    };

    let producer = if config.registry.thread_mode == ThreadMode::Dual {
        let registry = Arc::clone(&registry);
        Some(std::thread::spawn(move || feed(&registry)))
    } else {
        feed(&registry)?;
        None
    };

    let mut last = Default::default();
    for frame in 0..frames {
        last = registry.tick_frame(frame as f32 / 60.0, |_, _| {})?;
    }
    if let Some(handle) = producer {
        handle
            .join()
            .expect("producer thread panicked")?;
        last = registry.tick_frame(frames as f32 / 60.0, |_, _| {})?;
    }

    tracing::info!(
        frame = last.frame,
        drawn = last.drawn,
        animating = last.animating,
        live = registry.object_count()?,
        "demo finished"
    );
    Ok(())
}

/// One-shot layout: builds `count` plain objects, runs the named strategy
/// and prints the resulting placements as JSON.
fn run_arrange(strategy: &str, count: usize, width: f32, height: f32) -> mosaic_core::Result<()> {
    let strategy: Strategy = strategy.parse()?;
    if count == 0 {
        return Err(mosaic_core::MosaicError::EmptyLayout);
    }
    let bound = Bounds::from_center(0.0, 0.0, width, height);

    let mut store = ObjectStore::new();
    let ids: Vec<_> = (0..count)
        .map(|i| {
            let mut object = SceneObject::plain(format!("object-{i}"));
            object.set_animated(false);
            store.insert(object)
        })
        .collect();

    let data = match strategy {
        // Without a live selection, focus the first object.
        Strategy::Focus(_) | Strategy::AspectFocus(_) => LayoutData::default()
            .with_role(mosaic_core::LayoutRole::Inners, ids[..1].to_vec())
            .with_role(mosaic_core::LayoutRole::Outers, ids[1..].to_vec()),
        _ => LayoutData::objects(ids.clone()),
    };
    let inner = bound.shrunk(0.5);
    LayoutEngine::new().arrange(&strategy, bound, Some(inner), &data, &mut store, 0.0)?;

    let report = PlacementReport::capture(&strategy, bound, &ids, &store)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Live video collage core, headless", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a headless simulation of streams arriving and departing.
    Demo {
        /// How many synthetic streams to register.
        #[arg(long, default_value_t = 9)]
        objects: usize,
        /// How many frames to pump before reporting.
        #[arg(long, default_value_t = 300)]
        frames: u64,
        /// Feed the registry from a separate producer thread.
        #[arg(long)]
        threaded: bool,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Arrange a synthetic scene once and print the placements as JSON.
    Arrange {
        /// Layout strategy: grid, perimeter, focus, aspectFocus or tiling.
        #[arg(long, default_value = "grid")]
        strategy: String,
        /// Number of objects to lay out.
        #[arg(long, default_value_t = 9)]
        count: usize,
        /// World bound width.
        #[arg(long, default_value_t = 32.0)]
        width: f32,
        /// World bound height.
        #[arg(long, default_value_t = 18.0)]
        height: f32,
    },
}
