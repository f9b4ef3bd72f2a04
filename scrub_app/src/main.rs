//! Headless scrubbing demo
//!
//! Streams a procedurally generated point cloud through a [`StreamPlayer`] and
//! draws it with a [`PointsRenderer`] against a device that only counts what it
//! is asked to do. Halfway through, the source is invalidated for one frame to
//! exercise the automatic reopen.
//!
//! ```text
//! cargo run --bin scrub_demo -- [config.toml|config.ron]
//! ```

use std::collections::HashMap;

use geo_stream::config::ConfigError;
use geo_stream::prelude::*;
use geo_stream::render::api::{
    BufferDescriptor, BufferHandle, DrawMesh, DrawMeshIndirect, DrawMeshInstanced,
};
use geo_stream::render::RenderResult;
use geo_stream::source::Clip;
use rand::Rng;

const CLIP_PATH: &str = "memory://drift.abc";
const KEYFRAMES: usize = 48;
const FRAME_INTERVAL: f64 = 1.0 / 24.0;
const POINTS_PER_FRAME: usize = 2500;
const FRAMES_TO_RUN: u32 = 120;
const DELTA_TIME: f64 = 1.0 / 60.0;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("stream: {0}")]
    Stream(#[from] StreamError),
}

/// Device that tracks buffer sizes and counts draws
#[derive(Debug, Default)]
struct HeadlessDevice {
    capabilities: RenderCapabilities,
    buffers: HashMap<BufferHandle, usize>,
    keywords: HashMap<(MaterialHandle, String), bool>,
    next_handle: u64,
    draws: usize,
    instances: usize,
}

impl HeadlessDevice {
    fn new(capabilities: RenderCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    fn allocated_bytes(&self) -> usize {
        self.buffers.values().sum()
    }
}

impl RenderDevice for HeadlessDevice {
    fn capabilities(&self) -> RenderCapabilities {
        self.capabilities
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> RenderResult<BufferHandle> {
        self.next_handle += 1;
        let handle = BufferHandle(self.next_handle);
        self.buffers.insert(handle, descriptor.size_in_bytes());
        log::debug!(
            "create {} buffer {:?}: {} x {} bytes",
            descriptor.label,
            handle,
            descriptor.count,
            descriptor.stride
        );
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()> {
        log::trace!("write {} bytes to {:?}", data.len(), buffer);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        log::debug!("release buffer {buffer:?}");
    }

    fn set_material_float(&mut self, _material: MaterialHandle, _name: &str, _value: f32) {}

    fn set_material_buffer(&mut self, _material: MaterialHandle, _name: &str, _buffer: BufferHandle) {}

    fn set_material_keyword(&mut self, material: MaterialHandle, keyword: &str, enabled: bool) {
        self.keywords.insert((material, keyword.to_string()), enabled);
    }

    fn is_material_keyword_enabled(&self, material: MaterialHandle, keyword: &str) -> bool {
        self.keywords
            .get(&(material, keyword.to_string()))
            .copied()
            .unwrap_or(false)
    }

    fn draw_mesh(&mut self, _draw: &DrawMesh<'_>) -> RenderResult<()> {
        self.draws += 1;
        self.instances += 1;
        Ok(())
    }

    fn draw_mesh_instanced(&mut self, draw: &DrawMeshInstanced<'_>) -> RenderResult<()> {
        self.draws += 1;
        self.instances += draw.matrices.len();
        Ok(())
    }

    fn draw_mesh_instanced_indirect(&mut self, _draw: &DrawMeshIndirect<'_>) -> RenderResult<()> {
        self.draws += 1;
        Ok(())
    }
}

/// Keyframes of a cloud drifting upwards
fn drifting_cloud(rng: &mut impl Rng) -> Clip {
    let seeds: Vec<Vec3> = (0..POINTS_PER_FRAME)
        .map(|_| Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(0.0..1.0), rng.gen_range(-5.0..5.0)))
        .collect();

    let frames = (0..KEYFRAMES)
        .map(|frame| {
            let lift = frame as f32 * 0.1;
            let positions = seeds.iter().map(|seed| seed + Vec3::new(0.0, lift, 0.0)).collect();
            PointSet::new(positions).with_ids((0..POINTS_PER_FRAME as u64).collect())
        })
        .collect();

    Clip::new(0.0, FRAME_INTERVAL, frames)
}

fn load_config() -> Result<StreamConfig, AppError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            StreamConfig::load_from_file(path)?
        }
        None => StreamConfig::default().with_renderer(
            PointsRendererConfig::default()
                .with_mode(InstancingMode::Procedural)
                .with_point_ids(true),
        ),
    };
    config.validate()?;
    Ok(config)
}

fn run() -> Result<(), AppError> {
    let config = load_config()?;
    let mut rng = rand::thread_rng();

    let mut source = MemorySource::new();
    source.insert_clip(CLIP_PATH, drifting_cloud(&mut rng));

    let mut scene = SimpleScene::new().with_default_material(MaterialHandle(1));
    scene.add_renderer(vec![MaterialHandle(7)], true);

    let mut player = StreamPlayer::new(source, scene, config.player);
    player.try_load(CLIP_PATH)?;
    log::info!(
        "Media [{:.3}, {:.3}], window [{:.3}, {:.3}]",
        player.media_start_time(),
        player.media_end_time(),
        player.start_time(),
        player.end_time()
    );

    let mut device = HeadlessDevice::new(RenderCapabilities::all());
    let mut renderer = PointsRenderer::new(config.renderer);
    renderer.set_mesh(Some(PointMesh::new(
        MeshHandle(1),
        vec![36],
        Bounds::new(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)),
    )));
    renderer.set_materials(vec![MaterialHandle(1)]);
    let node = Transform::identity();

    for frame in 0..FRAMES_TO_RUN {
        let next = player.current_time() + DELTA_TIME;
        player.set_current_time(if next > player.duration() { 0.0 } else { next });

        if frame == FRAMES_TO_RUN / 2 {
            log::info!("Replacing source behind the stream");
            player.source().invalidate(CLIP_PATH);
        } else if frame == FRAMES_TO_RUN / 2 + 1 {
            player.source().restore(CLIP_PATH);
        }

        let step = player.update();
        player.late_update();
        log::trace!("frame {frame}: {step:?}");

        let cloud = player.source().node().cloned().unwrap_or_default();
        let points = cloud.points();
        match renderer.flush(&mut device, points.as_ref(), &node) {
            FlushOutcome::Drawn(stats) if frame % 30 == 0 => log::info!(
                "frame {frame}: t={:.3} {} points via {:?}, {} draw calls, {} bytes on device",
                player.current_time(),
                stats.instances,
                stats.mode,
                stats.draw_calls,
                device.allocated_bytes()
            ),
            FlushOutcome::Skipped(reason) => log::debug!("frame {frame}: skipped, {reason}"),
            _ => {}
        }
    }

    renderer.release(&mut device);
    player.on_disable();
    log::info!(
        "Done: {} draw calls, {} CPU-side instances, {} bytes left on device",
        device.draws,
        device.instances,
        device.allocated_bytes()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    geo_stream::foundation::logging::init_with_level(log::LevelFilter::Info);

    log::info!("Starting geo_stream scrub demo");

    match run() {
        Ok(()) => {
            log::info!("Scrub demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Scrub demo failed: {e}");
            Err(e.into())
        }
    }
}
