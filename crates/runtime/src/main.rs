#![deny(clippy::all, clippy::pedantic)]
//! Front end for the adaptive volumetric marcher: interactive window, GPU
//! screenshot capture, or a CPU reference render of a single frame.

use anyhow::Result;
use clap::Parser;
use glam::{Vec2, Vec3};
use tracing::info;

use march::{render_frame, CameraFrame, Film, PerformanceController, SceneSampler};
use render::offscreen::{capture, write_film_png, ScreenshotConfig};
use render::RendererConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Render one GPU frame to a PNG and exit
    #[arg(long)]
    screenshot: bool,

    /// Render one frame on the CPU reference path to a PNG and exit
    #[arg(long)]
    cpu_frame: bool,

    /// Camera position
    #[arg(long, default_value_t = 0.0)]
    cam_x: f32,
    #[arg(long, default_value_t = 1.0)]
    cam_y: f32,
    #[arg(long, default_value_t = -2.5)]
    cam_z: f32,

    /// Camera look-at point
    #[arg(long, default_value_t = 0.0)]
    look_x: f32,
    #[arg(long, default_value_t = 1.0)]
    look_y: f32,
    #[arg(long, default_value_t = 1.0)]
    look_z: f32,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Target FPS for the adaptive quality controller
    #[arg(long, default_value_t = 60.0)]
    target_fps: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!("starting adaptive volumetric marcher");

    let eye = Vec3::new(args.cam_x, args.cam_y, args.cam_z);
    let target = Vec3::new(args.look_x, args.look_y, args.look_z);

    if args.cpu_frame {
        return cpu_frame(&args, eye, target);
    }

    if args.screenshot {
        let path = capture(&ScreenshotConfig {
            width: args.width,
            height: args.height,
            eye,
            target,
            base_voxel_size: PerformanceController::new(args.target_fps).base_voxel_size(),
        })?;
        info!("screenshot written to {}", path.display());
        return Ok(());
    }

    render::run(RendererConfig {
        eye,
        target,
        target_fps: args.target_fps,
    })
}

/// One frame through the CPU tile dispatch; exercises the whole core crate
/// without touching a GPU.
fn cpu_frame(args: &Args, eye: Vec3, target: Vec3) -> Result<()> {
    #[allow(clippy::cast_precision_loss)]
    let camera = CameraFrame::look_at(eye, target, Vec2::new(args.width as f32, args.height as f32));
    let perf = PerformanceController::new(args.target_fps).snapshot();

    let mut film = Film::new(args.width, args.height);
    render_frame(&mut film, &camera, &perf, &SceneSampler::Procedural);

    let path = std::path::PathBuf::from(format!("cpu_frame_{}x{}.png", args.width, args.height));
    write_film_png(&film, &path)?;
    info!("cpu frame written to {}", path.display());
    Ok(())
}
