//! Live preview session.
//!
//! One loop thread owns the frame source and the [`FilterPipeline`]. Callers
//! talk to it through [`LiveCommand`]s and read [`LiveEvent`]s back; nothing
//! else ever touches the smoother state.

use crate::{
    PhotoFilterError, PhotoFilterResult,
    export::{DEFAULT_JPEG_QUALITY, export_still},
    params::FilterParameters,
    pipeline::{FilterPipeline, PipelineConfig},
};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

// Control events wait this long for a lagging consumer before being dropped.
const EVENT_SEND_TIMEOUT: Duration = Duration::from_millis(500);

/// A pull-based frame producer, e.g. a camera.
pub trait FrameSource: Send {
    fn name(&self) -> String;

    /// Acquire the device. `false` means it is unavailable; callers do not retry.
    fn start(&mut self) -> bool;

    fn stop(&mut self);

    /// The most recent frame, or `None` when nothing new is ready.
    fn current_frame(&mut self) -> Option<RgbaImage>;
}

/// Cycles through a fixed list of frames. Useful for uploads and tests.
pub struct StillFrameSource {
    name: String,
    frames: Vec<RgbaImage>,
    next: usize,
    running: bool,
}

impl StillFrameSource {
    pub fn new(name: impl Into<String>, frames: Vec<RgbaImage>) -> Self {
        Self {
            name: name.into(),
            frames,
            next: 0,
            running: false,
        }
    }
}

impl FrameSource for StillFrameSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn start(&mut self) -> bool {
        self.running = !self.frames.is_empty();
        self.running
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn current_frame(&mut self) -> Option<RgbaImage> {
        if !self.running {
            return None;
        }

        let frame = self.frames.get(self.next % self.frames.len()).cloned();
        self.next = self.next.wrapping_add(1);
        frame
    }
}

#[derive(Debug, Clone, Copy, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct LiveOptions {
    #[derivative(Default(value = "30"))]
    pub fps: u32,

    #[derivative(Default(value = "true"))]
    pub noise_reduction: bool,

    #[derivative(Default(value = "DEFAULT_JPEG_QUALITY"))]
    pub jpeg_quality: u8,

    #[derivative(Default(value = "4"))]
    pub event_capacity: usize,
}

impl LiveOptions {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

pub enum LiveCommand {
    UpdateParams(FilterParameters),
    SetNoiseReduction(bool),
    SwitchSource(Box<dyn FrameSource>),
    Capture,
    Stop,
}

/// A filtered still taken from the live stream.
#[derive(Debug, Clone)]
pub struct Capture {
    pub params: FilterParameters,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub enum LiveEvent {
    Started(String),
    SourceFailed(String),
    Frame { index: u64, image: RgbaImage },
    Captured(PhotoFilterResult<Capture>),
    Stopped,
}

/// Allows a single export at a time. The ticket releases the slot on drop.
#[derive(Debug, Clone, Default)]
pub struct ExportGuard(Arc<AtomicBool>);

#[derive(Debug)]
pub struct ExportTicket(Arc<AtomicBool>);

impl ExportGuard {
    pub fn try_acquire(&self) -> Option<ExportTicket> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportTicket(self.0.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for ExportTicket {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LiveSession {
    source: Box<dyn FrameSource>,
    source_ready: bool,
    params: FilterParameters,
    options: LiveOptions,
    pipeline: FilterPipeline,
    last_raw: Option<RgbaImage>,
    frame_index: u64,
    dropped_frames: u64,
    export_guard: ExportGuard,
    commands: Receiver<LiveCommand>,
    events: Sender<LiveEvent>,
}

impl LiveSession {
    pub fn spawn(
        source: Box<dyn FrameSource>,
        params: FilterParameters,
        options: LiveOptions,
    ) -> PhotoFilterResult<LiveHandle> {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = bounded(options.event_capacity.max(1));

        let session = LiveSession {
            source,
            source_ready: false,
            params,
            options,
            pipeline: FilterPipeline::new(
                PipelineConfig::default().with_noise_reduction(options.noise_reduction),
            ),
            last_raw: None,
            frame_index: 0,
            dropped_frames: 0,
            export_guard: ExportGuard::default(),
            commands: command_rx,
            events: event_tx,
        };

        let thread = thread::Builder::new()
            .name("live-session".to_string())
            .spawn(move || session.run())?;

        Ok(LiveHandle {
            commands: command_tx,
            events: event_rx,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        self.start_source();
        let interval = self.options.frame_interval();

        'session: loop {
            let deadline = Instant::now() + interval;

            if self.source_ready {
                self.next_frame();
            }

            loop {
                match self.commands.recv_deadline(deadline) {
                    Ok(LiveCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break 'session,
                    Ok(command) => self.handle_command(command),
                    Err(RecvTimeoutError::Timeout) => break,
                }
            }
        }

        self.stop_source();
        self.emit(LiveEvent::Stopped);
        log::info!("live session exit after {} frames", self.frame_index);
    }

    fn handle_command(&mut self, command: LiveCommand) {
        match command {
            LiveCommand::UpdateParams(params) => {
                log::debug!("live params updated: {}", params.name());
                self.params = params;
            }
            LiveCommand::SetNoiseReduction(enabled) => self.pipeline.set_noise_reduction(enabled),
            LiveCommand::SwitchSource(source) => {
                self.stop_source();
                self.source = source;
                self.start_source();
            }
            LiveCommand::Capture => self.capture(),
            LiveCommand::Stop => {}
        }
    }

    fn start_source(&mut self) {
        self.pipeline.reset();
        self.last_raw = None;

        let name = self.source.name();
        self.source_ready = self.source.start();

        if self.source_ready {
            log::info!("live source started: {name}");
            self.emit(LiveEvent::Started(name));
        } else {
            log::warn!("live source failed to start: {name}");
            self.emit(LiveEvent::SourceFailed(name));
        }
    }

    fn stop_source(&mut self) {
        if self.source_ready {
            self.source.stop();
            self.source_ready = false;
        }

        self.pipeline.reset();
    }

    fn next_frame(&mut self) {
        let Some(raw) = self.source.current_frame() else {
            return;
        };

        let mut frame = raw.clone();
        self.pipeline.process_frame(&mut frame, &self.params);
        self.last_raw = Some(raw);
        self.frame_index += 1;

        let event = LiveEvent::Frame {
            index: self.frame_index,
            image: frame,
        };

        if self.events.try_send(event).is_err() {
            self.dropped_frames += 1;
            if self.dropped_frames % 100 == 1 {
                log::warn!("live consumer lagging, {} frames dropped", self.dropped_frames);
            }
        }
    }

    fn capture(&mut self) {
        let Some(raw) = self.last_raw.clone() else {
            self.emit(LiveEvent::Captured(Err(PhotoFilterError::NoFrameAvailable)));
            return;
        };

        let Some(ticket) = self.export_guard.try_acquire() else {
            self.emit(LiveEvent::Captured(Err(PhotoFilterError::ExportBusy)));
            return;
        };

        let params = self.params.clone();
        let quality = self.options.jpeg_quality;
        let events = self.events.clone();

        let spawned = thread::Builder::new()
            .name("live-export".to_string())
            .spawn(move || {
                let result = export_still(&raw, &params, quality).map(|jpeg| Capture {
                    width: raw.width(),
                    height: raw.height(),
                    params,
                    jpeg,
                });

                drop(ticket);
                if let Err(e) = events.send_timeout(LiveEvent::Captured(result), EVENT_SEND_TIMEOUT) {
                    log::warn!("capture result dropped: {e}");
                }
            });

        if let Err(e) = spawned {
            self.emit(LiveEvent::Captured(Err(PhotoFilterError::Io(e))));
        }
    }

    fn emit(&self, event: LiveEvent) {
        if let Err(e) = self.events.send_timeout(event, EVENT_SEND_TIMEOUT) {
            log::warn!("live event dropped: {e}");
        }
    }
}

/// Owner side of a running [`LiveSession`]. Dropping it stops the session.
pub struct LiveHandle {
    commands: Sender<LiveCommand>,
    events: Receiver<LiveEvent>,
    thread: Option<JoinHandle<()>>,
}

impl LiveHandle {
    pub fn send(&self, command: LiveCommand) -> PhotoFilterResult<()> {
        self.commands
            .send(command)
            .map_err(|_| PhotoFilterError::SessionClosed)
    }

    pub fn update_params(&self, params: FilterParameters) -> PhotoFilterResult<()> {
        self.send(LiveCommand::UpdateParams(params))
    }

    pub fn set_noise_reduction(&self, enabled: bool) -> PhotoFilterResult<()> {
        self.send(LiveCommand::SetNoiseReduction(enabled))
    }

    pub fn switch_source(&self, source: Box<dyn FrameSource>) -> PhotoFilterResult<()> {
        self.send(LiveCommand::SwitchSource(source))
    }

    pub fn capture(&self) -> PhotoFilterResult<()> {
        self.send(LiveCommand::Capture)
    }

    pub fn events(&self) -> &Receiver<LiveEvent> {
        &self.events
    }

    /// Stop the loop and wait for it to release the source.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        _ = self.commands.send(LiveCommand::Stop);

        // Unblock a loop waiting on a full event queue.
        while !thread.is_finished() {
            _ = self.events.recv_timeout(Duration::from_millis(10));
        }

        if thread.join().is_err() {
            log::warn!("live session thread panicked");
        }
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Param;
    use image::Rgba;

    const WAIT: Duration = Duration::from_secs(5);

    fn gray_source(value: u8) -> Box<dyn FrameSource> {
        Box::new(StillFrameSource::new(
            "gray",
            vec![RgbaImage::from_pixel(8, 6, Rgba([value, value, value, 255]))],
        ))
    }

    fn fast() -> LiveOptions {
        LiveOptions::default().with_fps(200)
    }

    fn wait_for(handle: &LiveHandle, pred: impl Fn(&LiveEvent) -> bool) -> Option<LiveEvent> {
        let deadline = Instant::now() + WAIT;
        while let Ok(event) = handle.events().recv_deadline(deadline) {
            if pred(&event) {
                return Some(event);
            }
        }
        None
    }

    struct TrackedSource {
        inner: StillFrameSource,
        running: Arc<AtomicBool>,
    }

    impl FrameSource for TrackedSource {
        fn name(&self) -> String {
            self.inner.name()
        }

        fn start(&mut self) -> bool {
            self.running.store(true, Ordering::SeqCst);
            self.inner.start()
        }

        fn stop(&mut self) {
            self.running.store(false, Ordering::SeqCst);
            self.inner.stop();
        }

        fn current_frame(&mut self) -> Option<RgbaImage> {
            self.inner.current_frame()
        }
    }

    #[test]
    fn test_frames_are_filtered() -> anyhow::Result<()> {
        let params = FilterParameters::default().with(Param::Brightness, 1.2);
        let handle = LiveSession::spawn(gray_source(100), params, fast())?;

        assert!(matches!(
            wait_for(&handle, |e| matches!(e, LiveEvent::Started(_))),
            Some(LiveEvent::Started(name)) if name == "gray"
        ));

        let Some(LiveEvent::Frame { index, image }) =
            wait_for(&handle, |e| matches!(e, LiveEvent::Frame { .. }))
        else {
            anyhow::bail!("no frame");
        };
        assert!(index >= 1);
        assert!(image.pixels().all(|p| p.0 == [120, 120, 120, 255]));

        handle.stop();
        Ok(())
    }

    #[test]
    fn test_update_params_applies_to_later_frames() -> anyhow::Result<()> {
        let handle = LiveSession::spawn(gray_source(100), FilterParameters::default(), fast())?;
        handle.update_params(FilterParameters::default().with(Param::Brightness, 0.6))?;

        let found = wait_for(&handle, |e| {
            matches!(e, LiveEvent::Frame { image, .. } if image.get_pixel(0, 0).0[0] == 60)
        });
        assert!(found.is_some());
        Ok(())
    }

    #[test]
    fn test_failed_source_then_switch() -> anyhow::Result<()> {
        let empty = Box::new(StillFrameSource::new("empty", vec![]));
        let handle = LiveSession::spawn(empty, FilterParameters::default(), fast())?;

        assert!(matches!(
            wait_for(&handle, |_| true),
            Some(LiveEvent::SourceFailed(name)) if name == "empty"
        ));

        handle.switch_source(gray_source(50))?;
        assert!(wait_for(&handle, |e| matches!(e, LiveEvent::Started(_))).is_some());
        assert!(wait_for(&handle, |e| matches!(e, LiveEvent::Frame { .. })).is_some());
        Ok(())
    }

    #[test]
    fn test_switch_source_clears_previous_frame() -> anyhow::Result<()> {
        let handle = LiveSession::spawn(gray_source(100), FilterParameters::default(), fast())?;
        assert!(wait_for(&handle, |e| matches!(e, LiveEvent::Frame { .. })).is_some());

        let brighter = Box::new(StillFrameSource::new(
            "brighter",
            vec![RgbaImage::from_pixel(8, 6, Rgba([110, 110, 110, 255]))],
        ));
        handle.switch_source(brighter)?;
        assert!(wait_for(&handle, |e| matches!(e, LiveEvent::Started(n) if n == "brighter")).is_some());

        // Blended with the old source this would read 109.
        let Some(LiveEvent::Frame { image, .. }) =
            wait_for(&handle, |e| matches!(e, LiveEvent::Frame { .. }))
        else {
            anyhow::bail!("no frame after switch");
        };
        assert!(image.pixels().all(|p| p.0 == [110, 110, 110, 255]));

        handle.stop();
        Ok(())
    }

    #[test]
    fn test_capture_produces_jpeg() -> anyhow::Result<()> {
        let params = FilterParameters::default().with(Param::Grain, 0.2);
        let handle = LiveSession::spawn(gray_source(128), params.clone(), fast())?;

        wait_for(&handle, |e| matches!(e, LiveEvent::Frame { .. }));
        handle.capture()?;

        match wait_for(&handle, |e| matches!(e, LiveEvent::Captured(_))) {
            Some(LiveEvent::Captured(Ok(capture))) => {
                assert_eq!((capture.width, capture.height), (8, 6));
                assert_eq!(capture.params, params);
                assert_eq!(&capture.jpeg[..2], &[0xFF, 0xD8]);
            }
            other => anyhow::bail!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_capture_without_frame() -> anyhow::Result<()> {
        let empty = Box::new(StillFrameSource::new("empty", vec![]));
        let handle = LiveSession::spawn(empty, FilterParameters::default(), fast())?;
        handle.capture()?;

        assert!(matches!(
            wait_for(&handle, |e| matches!(e, LiveEvent::Captured(_))),
            Some(LiveEvent::Captured(Err(PhotoFilterError::NoFrameAvailable)))
        ));
        Ok(())
    }

    #[test]
    fn test_export_guard_is_exclusive() {
        let guard = ExportGuard::default();
        let ticket = guard.try_acquire();
        assert!(ticket.is_some());
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        drop(ticket);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_drop_stops_source() -> anyhow::Result<()> {
        let running = Arc::new(AtomicBool::new(false));
        let source = TrackedSource {
            inner: StillFrameSource::new("tracked", vec![RgbaImage::new(4, 4)]),
            running: running.clone(),
        };

        let handle = LiveSession::spawn(Box::new(source), FilterParameters::default(), fast())?;
        wait_for(&handle, |e| matches!(e, LiveEvent::Started(_)));
        assert!(running.load(Ordering::SeqCst));

        drop(handle);
        assert!(!running.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(LiveOptions::default().frame_interval(), Duration::from_nanos(33_333_333));
        assert_eq!(
            LiveOptions::default().with_fps(0).frame_interval(),
            Duration::from_secs(1)
        );
    }
}
