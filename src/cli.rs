// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Grading an image file
//! - Extracting the best frames from a recorded take
//! - Exporting the foot model of a scan record
//! - Recording a take from a live camera
//! - Rehearsing the guided flow on the virtual camera

use chrono::Local;
use footscan::app::frame_processor::quality::analyze_frame;
use footscan::app::{CaptureController, CaptureStep};
use footscan::backends::camera::gst_camera::GstCameraDevice;
use footscan::backends::camera::{CameraDevice, CameraFrame, RecordedTake, TakeContainer};
use footscan::backends::virtual_camera::VirtualCamera;
use footscan::config::Config;
use footscan::constants::extraction::DEFAULT_MJPEG_FPS;
use footscan::constants::file_formats;
use footscan::pipelines::foot_model::{ColorMode, FootModelGenerator, ScanRecord, export_glb};
use footscan::pipelines::photo::{EncodedImage, PhotoEncoder};
use footscan::pipelines::video::{ExtractedFrame, FrameExtractor, RecordingSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Default folder name for extracted frames and takes
const DEFAULT_SAVE_FOLDER: &str = "footscan";

/// Full-resolution quality analysis of an image file
pub fn grade_image(config: &Config, path: &Path, json: bool) -> CliResult {
    let image = image::open(path)?.to_rgba8();
    let frame = CameraFrame::from_image(&image);
    let result = analyze_frame(&frame, &config.quality);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} ({}x{})", path.display(), frame.width, frame.height);
    println!("  Sharpness:  {:.1} ({})", result.sharpness, pass(result.blur_ok));
    println!("  Brightness: {:.1} ({})", result.brightness, pass(result.brightness_ok));
    println!("  Contrast:   {:.1} ({})", result.contrast, pass(result.contrast_ok));
    println!();
    println!("{}", result.headline().unwrap_or("All checks passed."));
    for message in result.messages() {
        println!("  - {}", message);
    }
    Ok(())
}

/// Run the frame extractor over a take on disk
pub fn extract_frames(config: &Config, video: &Path, out: Option<PathBuf>, fps: Option<f64>) -> CliResult {
    let ext = video
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let container = if file_formats::is_mjpeg_extension(ext) {
        TakeContainer::Mjpeg {
            fps: fps.unwrap_or(DEFAULT_MJPEG_FPS),
        }
    } else if file_formats::is_container_extension(ext) {
        TakeContainer::Container
    } else {
        return Err(format!("Unsupported take format: {}", video.display()).into());
    };

    let take = RecordedTake {
        data: std::fs::read(video)?,
        container,
        recorded_for: Duration::ZERO,
        auto_stopped: false,
    };
    let output_dir = out.unwrap_or_else(default_output_dir);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(extract_and_save(config, take, &output_dir))
}

async fn extract_and_save(config: &Config, take: RecordedTake, output_dir: &Path) -> CliResult {
    let extractor = FrameExtractor::new(config.extraction.clone(), config.quality.clone());
    let frames = extractor.extract(take).await?;

    if frames.is_empty() {
        println!("No frame passed the sharpness check. Record the take again.");
        return Ok(());
    }

    tokio::fs::create_dir_all(output_dir).await?;
    for (index, frame) in frames.into_iter().enumerate() {
        let path = save_frame(frame, index, output_dir).await?;
        println!("Frame saved: {}", path.display());
    }
    Ok(())
}

async fn save_frame(frame: ExtractedFrame, index: usize, dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let file_name = format!(
        "frame_{:02}_{:06}ms.jpg",
        index + 1,
        frame.position.as_millis()
    );
    let score = frame.score;
    let encoded = EncodedImage {
        data: frame.jpeg,
        width: frame.width,
        height: frame.height,
    };
    let path = PhotoEncoder::save(&encoded, dir, &file_name).await?;
    tracing::debug!(path = %path.display(), score, "Extracted frame written");
    Ok(path)
}

/// Build both feet from a scan record and write them as GLB
pub fn export_model(config: &Config, record: &Path, out: Option<PathBuf>, solid: bool, smooth: bool) -> CliResult {
    let text = std::fs::read_to_string(record)?;
    let measurements = ScanRecord::from_json(&text)?.to_measurements()?;

    let generator = FootModelGenerator::new(config.geometry.clone(), config.pressure.clone());
    let mode = if solid { ColorMode::Solid } else { ColorMode::Pressure };
    let mut feet = generator.generate_pair(&measurements, mode)?;
    if smooth {
        feet.iter_mut().for_each(|foot| foot.smooth_normals());
    }

    for foot in &feet {
        let guides = generator.guides(&measurements, foot.side)?;
        let labels: Vec<&str> = guides.iter().map(|g| g.label.as_str()).collect();
        println!(
            "{} foot: {} vertices, {} triangles, {}",
            foot.side,
            foot.vertex_count(),
            foot.triangle_count(),
            labels.join(" × ")
        );
    }

    let output = out.unwrap_or_else(|| record.with_file_name("foot-model.glb"));
    let rt = tokio::runtime::Runtime::new()?;
    let written = rt.block_on(export_glb(feet.to_vec(), &output))?;
    println!("Model saved: {}", written.display());
    Ok(())
}

/// Record a take from a live camera, then extract its best frames
pub fn record_take(config: &Config, device: Option<String>, duration: f64, out: Option<PathBuf>) -> CliResult {
    let facing = config.capture.default_facing;
    let mut camera = GstCameraDevice::new(device.as_deref().unwrap_or("Default camera"))
        .with_resolution(config.capture.target_width, config.capture.target_height);
    if let Some(path) = device.as_deref() {
        camera = camera.with_device(facing, path);
    }

    let cap = config.capture.max_recording();
    let target = if duration.is_finite() && duration > 0.0 {
        Duration::from_secs_f64(duration).min(cap)
    } else {
        cap
    };

    let mut source = camera.start(facing)?;
    let (width, height) = source.resolution();
    println!("Using camera: {} ({}x{})", camera.name(), width, height);

    let recording = RecordingSession::start(source.create_recorder()?, cap)?;

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Recording for up to {:.0} s... (press Ctrl+C to stop early)", target.as_secs_f64());
    let start = Instant::now();
    while start.elapsed() < target {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        if recording.is_auto_stopped() {
            break;
        }

        let elapsed = start.elapsed().as_secs();
        print!("\rRecording: {:02}:{:02}", elapsed / 60, elapsed % 60);
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    let take = recording.stop()?;
    source.stop();
    if take.auto_stopped {
        println!("Recording cap reached.");
    }

    let output_dir = out.unwrap_or_else(default_output_dir);
    std::fs::create_dir_all(&output_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let extension = match take.container {
        TakeContainer::Container => "webm",
        TakeContainer::Mjpeg { .. } => "mjpeg",
    };
    let take_path = output_dir.join(format!("take_{}.{}", timestamp, extension));
    std::fs::write(&take_path, &take.data)?;
    println!("Take saved: {}", take_path.display());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(extract_and_save(config, take, &output_dir))
}

/// Walk the whole guided flow on the virtual camera in simulation mode
pub fn simulate(config: &Config) -> CliResult {
    let mut controller =
        CaptureController::new(Box::new(VirtualCamera::new()), config.clone()).with_simulation(true);

    controller.begin()?;
    while let CaptureStep::Capture(slot) = controller.step() {
        let image = controller.capture_photo()?;
        println!(
            "{:<16} {:>6} bytes  {}",
            slot.to_string(),
            image.jpeg.len(),
            image.quality.headline().unwrap_or("ok")
        );
    }

    let submission = controller.complete()?;
    println!();
    println!(
        "Rehearsal complete: {} images ({} left, {} right), not stored.",
        submission.metadata.total_images,
        submission.left.len(),
        submission.right.len()
    );
    Ok(())
}

/// Write the effective configuration so it can be edited
pub fn init_config(config: &Config, path: Option<PathBuf>) -> CliResult {
    let written = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };
    println!("Config written: {}", written.display());
    Ok(())
}

fn pass(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAIL" }
}

/// Get default output directory
fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}
