use super::{apply::resolve_params, open_store};
use crate::{cli::LiveArgs, config::Config};
use anyhow::{Context, Result, bail};
use camera::CameraSource;
use crossbeam::channel::{Receiver, Sender, select, unbounded};
use photo_filter::{
    Capture, FilterParameters, FrameSource, LiveEvent, LiveOptions, LiveSession,
    PhotoFilterResult,
    export::{capture_file_name, write_jpeg},
};
use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

// How long shutdown waits for captures that are still being exported.
const CAPTURE_WAIT: Duration = Duration::from_secs(5);

/// Requests from the terminal to the live loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Capture,
    Stop,
}

#[derive(Debug, Default)]
struct LiveSummary {
    frames: u64,
    captures: Vec<PathBuf>,
}

pub(super) async fn run(args: LiveArgs, config: Config) -> Result<()> {
    let params = match args.filter.as_deref() {
        Some(id) => {
            let store = open_store(&config).await?;
            let params = resolve_params(Some(&store), Some(id), None, &[]).await?;
            store.close().await;
            params
        }
        None => FilterParameters::default(),
    };

    camera::init();
    let camera_name = args.camera.unwrap_or_else(|| config.camera.name.clone());
    let source = CameraSource::new(camera_name, config.camera.to_camera_config());

    let options = LiveOptions::default()
        .with_fps(config.camera.fps)
        .with_noise_reduction(config.pipeline.noise_reduction && !args.no_denoise)
        .with_jpeg_quality(config.pipeline.jpeg_quality);

    let (control_tx, control_rx) = unbounded();
    forward_ctrlc(control_tx.clone())?;
    forward_stdin(control_tx)?;

    println!("Filter `{}`. Press Enter to capture, Ctrl-C to stop.", params.name());

    let save_dir = config.save_dir();
    let frames = args.frames;
    let summary = tokio::task::spawn_blocking(move || {
        run_session(Box::new(source), params, options, &save_dir, frames, control_rx)
    })
    .await??;

    log::info!(
        "live finished: {} frames, {} captures",
        summary.frames,
        summary.captures.len()
    );
    Ok(())
}

fn forward_ctrlc(tx: Sender<Control>) -> Result<()> {
    ctrlc::set_handler(move || {
        _ = tx.send(Control::Stop);
    })
    .context("install Ctrl-C handler")
}

/// Enter captures, `q` stops. The reader thread ends with stdin.
fn forward_stdin(tx: Sender<Control>) -> Result<()> {
    thread::Builder::new()
        .name("live-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };

                let control = if line.trim().eq_ignore_ascii_case("q") {
                    Control::Stop
                } else {
                    Control::Capture
                };

                if tx.send(control).is_err() {
                    break;
                }
            }
        })?;

    Ok(())
}

fn run_session(
    source: Box<dyn FrameSource>,
    params: FilterParameters,
    options: LiveOptions,
    save_dir: &Path,
    frame_limit: Option<u64>,
    controls: Receiver<Control>,
) -> Result<LiveSummary> {
    let handle = LiveSession::spawn(source, params, options)?;
    let mut summary = LiveSummary::default();
    let mut pending: usize = 0;

    loop {
        select! {
            recv(controls) -> control => match control {
                Ok(Control::Capture) => {
                    handle.capture()?;
                    pending += 1;
                }
                Ok(Control::Stop) | Err(_) => break,
            },
            recv(handle.events()) -> event => {
                let Ok(event) = event else {
                    break;
                };

                match event {
                    LiveEvent::Started(name) => log::info!("streaming from {name}"),
                    LiveEvent::SourceFailed(name) => bail!("could not open {name}"),
                    LiveEvent::Frame { index, .. } => {
                        summary.frames = index;
                        if index % 100 == 0 {
                            log::debug!("{index} frames");
                        }
                        if frame_limit.is_some_and(|limit| index >= limit) {
                            break;
                        }
                    }
                    LiveEvent::Captured(result) => {
                        pending = pending.saturating_sub(1);
                        save_capture(result, save_dir, &mut summary)?;
                    }
                    LiveEvent::Stopped => break,
                }
            }
        }
    }

    finish_captures(handle.events(), pending, CAPTURE_WAIT, save_dir, &mut summary)?;
    handle.stop();
    Ok(summary)
}

/// Wait up to `wait` for captures requested before the loop ended.
fn finish_captures(
    events: &Receiver<LiveEvent>,
    mut pending: usize,
    wait: Duration,
    save_dir: &Path,
    summary: &mut LiveSummary,
) -> Result<()> {
    let deadline = Instant::now() + wait;

    while pending > 0 {
        match events.recv_deadline(deadline) {
            Ok(LiveEvent::Captured(result)) => {
                pending -= 1;
                save_capture(result, save_dir, summary)?;
            }
            Ok(LiveEvent::Stopped) | Err(_) => break,
            Ok(_) => {}
        }
    }

    if pending > 0 {
        log::warn!("{pending} capture(s) still exporting at shutdown, dropped");
    }
    Ok(())
}

fn save_capture(
    result: PhotoFilterResult<Capture>,
    save_dir: &Path,
    summary: &mut LiveSummary,
) -> Result<()> {
    let capture = match result {
        Ok(capture) => capture,
        Err(e) => {
            log::warn!("capture failed: {e}");
            return Ok(());
        }
    };

    let path = save_dir.join(capture_file_name(capture.params.name()));
    write_jpeg(&path, &capture.jpeg)
        .with_context(|| format!("save capture {}", path.display()))?;

    println!("captured {} ({}x{})", path.display(), capture.width, capture.height);
    summary.captures.push(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_filter::{
        Param, PhotoFilterError, Rgba, RgbaImage, StillFrameSource, export::encode_jpeg,
    };

    fn gray_source() -> Box<dyn FrameSource> {
        let frame = RgbaImage::from_pixel(8, 8, Rgba([120, 120, 120, 255]));
        Box::new(StillFrameSource::new("still", vec![frame]))
    }

    #[test]
    fn test_stops_at_frame_limit() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (_tx, rx) = unbounded();

        let summary = run_session(
            gray_source(),
            FilterParameters::default(),
            LiveOptions::default().with_fps(200),
            dir.path(),
            Some(3),
            rx,
        )?;

        assert!(summary.frames >= 3);
        assert!(summary.captures.is_empty());
        Ok(())
    }

    #[test]
    fn test_capture_writes_jpeg() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (tx, rx) = unbounded();

        let controls = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            _ = tx.send(Control::Capture);
            thread::sleep(Duration::from_millis(800));
            _ = tx.send(Control::Stop);
        });

        let params = FilterParameters::default()
            .with_name("Golden Bloom")
            .with(Param::Temperature, 20.0);
        let summary = run_session(
            gray_source(),
            params,
            LiveOptions::default(),
            dir.path(),
            None,
            rx,
        )?;
        _ = controls.join();

        assert_eq!(summary.captures.len(), 1);
        let path = &summary.captures[0];
        assert!(path.starts_with(dir.path()));
        assert!(
            path.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("golden-bloom-"))
        );
        assert_eq!(&std::fs::read(path)?[..2], &[0xFF, 0xD8]);
        Ok(())
    }

    #[test]
    fn test_pending_capture_outlives_frame_limit() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (tx, rx) = unbounded();

        let image = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        for index in 41..=43 {
            _ = tx.send(LiveEvent::Frame { index, image: image.clone() });
        }
        _ = tx.send(LiveEvent::Captured(Ok(Capture {
            params: FilterParameters::default().with_name("Late Fern"),
            jpeg: encode_jpeg(&image, 90)?,
            width: 4,
            height: 4,
        })));

        let mut summary = LiveSummary::default();
        finish_captures(&rx, 1, Duration::from_secs(5), dir.path(), &mut summary)?;

        assert_eq!(summary.captures.len(), 1);
        assert!(
            summary.captures[0]
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("late-fern-"))
        );
        assert_eq!(&std::fs::read(&summary.captures[0])?[..2], &[0xFF, 0xD8]);
        Ok(())
    }

    #[test]
    fn test_lost_capture_times_out() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (tx, rx) = unbounded();
        _ = tx.send(LiveEvent::Captured(Err(PhotoFilterError::ExportBusy)));

        let mut summary = LiveSummary::default();
        let started = Instant::now();
        finish_captures(&rx, 2, Duration::from_millis(100), dir.path(), &mut summary)?;

        assert!(summary.captures.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn test_capture_then_frame_limit_is_saved() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (tx, rx) = unbounded();
        tx.send(Control::Capture)?;

        let summary = run_session(
            gray_source(),
            FilterParameters::default().with_name("Quick"),
            LiveOptions::default().with_fps(200),
            dir.path(),
            Some(20),
            rx,
        )?;

        assert!(summary.frames >= 20);
        assert_eq!(summary.captures.len(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_source_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (_tx, rx) = unbounded();

        let result = run_session(
            Box::new(StillFrameSource::new("nothing", vec![])),
            FilterParameters::default(),
            LiveOptions::default(),
            dir.path(),
            None,
            rx,
        );

        assert!(result.is_err());
        Ok(())
    }
}
