//! Tessera - headless client for a streamed chunk world
//!
//! Runs the simulation at a fixed tick rate for a configured duration, with a
//! scripted walk/run/dance input sequence, and reports what was streamed.

mod demo;
mod settings;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tessera_assets::{AssetSource, FileSource, HttpSource, ModelAsset, ModelCache};
use tessera_core::GameTime;
use tessera_game::{GameSession, SessionConfig};
use tessera_render::HeadlessScene;
use tessera_world::ContentManifest;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::demo::ScriptRunner;
use crate::settings::Settings;

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;
    Ok(())
}

/// HTTP when a base URL is configured, disk when the asset root exists,
/// placeholder content otherwise.
fn asset_source(
    settings: &Settings,
    manifest: &ContentManifest,
) -> Result<Arc<dyn AssetSource<ModelAsset>>> {
    if let Some(url) = &settings.client.asset_url {
        info!("Fetching assets from {}", url);
        let source = HttpSource::new(url.clone()).context("Failed to create HTTP client")?;
        return Ok(Arc::new(source));
    }
    let root = &settings.client.asset_root;
    if root.is_dir() {
        info!("Loading assets from {:?}", root);
        return Ok(Arc::new(FileSource::new(root.clone())));
    }
    warn!("Asset root {:?} not found, using placeholder content", root);
    Ok(Arc::new(demo::placeholder_source(
        &settings.character,
        &settings.chunks,
        manifest,
    )))
}

fn main() -> Result<()> {
    let settings = Settings::load();
    init_logging(&settings.client.log_level)?;

    info!("Starting Tessera client...");
    if !Settings::exists() {
        if let Err(e) = settings.save() {
            warn!("Failed to write default settings: {}", e);
        }
    }

    let manifest = match &settings.client.manifest {
        Some(path) => ContentManifest::load(path)
            .with_context(|| format!("Failed to load content manifest {:?}", path))?,
        None => ContentManifest::default(),
    };
    info!("Content manifest lists {} chunks", manifest.len());

    let cache = ModelCache::new(asset_source(&settings, &manifest)?)
        .context("Failed to start asset cache")?;
    let (scene, shared_scene) = HeadlessScene::shared();

    let config = SessionConfig {
        chunks: settings.chunks.clone(),
        manifest,
        character: settings.character.clone(),
        locomotion: settings.locomotion.clone(),
        movement: settings.movement.clone(),
        preload_chunks: settings.client.preload_chunks,
        ..Default::default()
    };
    let mut session =
        GameSession::new(config, shared_scene, cache).context("Failed to start session")?;

    let mut time = GameTime::new(settings.time.clone());
    let frame = settings.time.frame_duration();
    let mut script = ScriptRunner::new(demo::script());
    let mut last_frame = Instant::now();
    let mut next_report = 1.0;

    info!("Running for {:.1}s", settings.client.run_seconds);
    while time.total_time < settings.client.run_seconds as f64 {
        std::thread::sleep(frame.saturating_sub(last_frame.elapsed()));
        let now = Instant::now();
        let dt = time.advance((now - last_frame).as_secs_f32());
        last_frame = now;

        script.apply(time.total_time as f32, &mut session);
        session.update(dt);

        if time.total_time >= next_report {
            next_report += 1.0;
            let position = session.player_position().unwrap_or_default();
            info!(
                "t={:5.1}s state={} pos=({:.1}, {:.1}) chunks={}/{}",
                time.total_time,
                session
                    .character_state()
                    .map_or("none".to_string(), |s| s.to_string()),
                position.x,
                position.z,
                session.loaded_chunks().len(),
                session.chunk_count(),
            );
        }
    }

    if !script.is_finished() {
        warn!("Session ended before the input script finished");
    }
    let scene = scene.lock();
    info!(
        "Done after {} frames: {} scene objects ({} added, {} removed)",
        time.frame_count,
        scene.labels().len(),
        scene.total_added(),
        scene.total_removed()
    );
    Ok(())
}
