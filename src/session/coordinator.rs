//! Capture session coordinator
//!
//! A synchronous state machine: every input arrives as a [`Msg`], and
//! anything that has to happen outside (camera, timers, haptics, analysis)
//! leaves as an [`Effect`]. The runtime performs effects and feeds their
//! results back in as messages tagged with the ticket or generation they
//! were issued with, so late results for an abandoned step are dropped.

use std::time::Duration;

use image::RgbaImage;

use crate::analysis::AnalysisRequest;
use crate::capture::CapturedImage;
use crate::config::PuttlineConfig;
use crate::domain::{
    CoordinateSpace, LevelIndicator, LevelTier, MarkerStore, PermissionState, TaggedPoint,
};
use crate::error::CaptureDeviceError;
use crate::render::BreakPath;
use crate::render::image::draw_review_overlay;
use crate::widget::magnifier::{MagnifierController, render_loupe};

use super::messages::{Effect, Msg};
use super::pointer::{GestureConfig, PointerEvent, PointerInputTracker, PointerOutcome};
use super::state::{AnalysisStatus, CaptureState, SessionView};

pub struct CaptureCoordinator {
    config: PuttlineConfig,
    state: CaptureState,
    /// Logical size of the visible surface
    surface: Option<(f32, f32)>,
    store: MarkerStore,
    tracker: PointerInputTracker,
    magnifier: MagnifierController,
    level: LevelIndicator,
    image: Option<CapturedImage>,
    next_ticket: u64,
}

impl CaptureCoordinator {
    pub fn new(config: PuttlineConfig) -> Self {
        let gestures = GestureConfig {
            long_press: Duration::from_millis(config.long_press_ms),
            slop: config.tap_slop,
        };
        Self {
            tracker: PointerInputTracker::new(gestures),
            magnifier: MagnifierController::from_config(&config),
            level: LevelIndicator::new(config.level),
            config,
            state: CaptureState::default(),
            surface: None,
            store: MarkerStore::new(),
            image: None,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    pub fn level_tier(&self) -> LevelTier {
        self.level.tier()
    }

    /// The surface as a coordinate space: the live view, or the display of
    /// the captured still
    pub fn surface_space(&self) -> Option<CoordinateSpace> {
        let (w, h) = self.surface?;
        Some(if self.state.shows_still() {
            CoordinateSpace::display(w, h)
        } else {
            CoordinateSpace::view(w, h)
        })
    }

    fn ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        let before = self.state.name();
        let effects = match msg {
            Msg::InstructionsDismissed => self.on_instructions_dismissed(),
            Msg::CameraStarted(result) => self.on_camera_started(result),
            Msg::SurfaceResized { width, height } => self.on_surface_resized(width, height),
            Msg::Pointer(event) => self.on_pointer(event),
            Msg::LongPressElapsed(generation) => self.on_long_press(generation),
            Msg::ResetMarkers => self.on_reset(),
            Msg::Capture => self.on_capture(),
            Msg::FrameCaptured { ticket, result } => self.on_frame_captured(ticket, result),
            Msg::Confirm => self.on_confirm(),
            Msg::Retake => self.on_retake(),
            Msg::Cancel => self.on_cancel(),
            Msg::OrientationPermission(permission) => {
                self.level.set_permission(permission);
                Vec::new()
            }
            Msg::Orientation(sample) => {
                if !self.state.is_live() {
                    return Vec::new();
                }
                self.level
                    .observe(sample)
                    .and_then(|reading| reading.pulse)
                    .map(Effect::Pulse)
                    .into_iter()
                    .collect()
            }
            Msg::AnalysisFinished { ticket, result } => {
                match &mut self.state {
                    CaptureState::Confirmed {
                        ticket: current,
                        status: status @ AnalysisStatus::Pending,
                    } if *current == ticket => {
                        *status = match result {
                            Ok(analysis) => AnalysisStatus::Ready(analysis),
                            Err(err) => AnalysisStatus::Failed(err),
                        };
                    }
                    _ => log::debug!("Ignoring stale analysis result {}", ticket),
                }
                Vec::new()
            }
            Msg::RetryAnalysis => self.on_retry_analysis(),
        };
        if self.state.name() != before {
            log::info!("Capture session: {} -> {}", before, self.state.name());
        }
        effects
    }

    fn on_instructions_dismissed(&mut self) -> Vec<Effect> {
        if !matches!(self.state, CaptureState::AwaitingInstructions { .. }) {
            return Vec::new();
        }
        self.state = CaptureState::CameraStarting;
        vec![
            Effect::StartCamera {
                facing: self.config.facing,
                hint: self.config.resolution,
            },
            Effect::StartOrientation,
        ]
    }

    fn on_camera_started(&mut self, result: Result<(), CaptureDeviceError>) -> Vec<Effect> {
        let starting = self.state == CaptureState::CameraStarting;
        match result {
            Ok(()) if starting => {
                self.state = CaptureState::CameraActive;
                self.sync_surface()
            }
            Err(err) if starting => {
                log::error!("Camera failed to start: {}", err);
                self.state = CaptureState::AwaitingInstructions { retry: Some(err) };
                vec![Effect::StopOrientation]
            }
            // Cancelled while the camera was coming up
            Ok(()) if self.state == CaptureState::Cancelled => vec![Effect::StopCamera],
            _ => {
                log::debug!("Ignoring camera start in {}", self.state.name());
                Vec::new()
            }
        }
    }

    fn on_surface_resized(&mut self, width: f32, height: f32) -> Vec<Effect> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            log::warn!("Ignoring degenerate surface {}x{}", width, height);
            return Vec::new();
        }
        self.surface = Some((width, height));
        self.sync_surface()
    }

    /// Hand the current surface to the tracker; a changed surface aborts
    /// any gesture in progress
    fn sync_surface(&mut self) -> Vec<Effect> {
        let Some(space) = self.surface_space() else {
            return Vec::new();
        };
        let outcome = self.tracker.set_surface(space);
        self.apply_pointer(outcome, space)
    }

    fn abort_pointer(&mut self) {
        let outcome = self.tracker.cancel();
        self.finish_pointer(outcome);
    }

    /// The surface is going away for good: drop the gesture and the
    /// tracker's surface with it
    fn release_surface(&mut self) {
        let outcome = self.tracker.clear_surface();
        self.finish_pointer(outcome);
    }

    fn finish_pointer(&mut self, outcome: PointerOutcome) {
        if let Some(space) = self.surface_space() {
            self.apply_pointer(outcome, space);
        }
        self.magnifier.end();
    }

    fn on_pointer(&mut self, event: PointerEvent) -> Vec<Effect> {
        if !self.state.accepts_pointer() {
            return Vec::new();
        }
        let Some(surface) = self.surface_space() else {
            return Vec::new();
        };
        if let PointerEvent::Down(p) | PointerEvent::Move(p) | PointerEvent::Up(p) = event
            && !p.is_finite()
        {
            log::debug!("Dropping non-finite pointer event {:?}", event);
            return Vec::new();
        }
        let hit = match event {
            PointerEvent::Down(p) => self
                .store
                .hit_test(TaggedPoint::new(p, surface), self.config.hit_radius),
            _ => None,
        };
        let outcome = self.tracker.handle(event, hit);
        self.apply_pointer(outcome, surface)
    }

    fn on_long_press(&mut self, generation: u64) -> Vec<Effect> {
        if !self.state.accepts_pointer() {
            return Vec::new();
        }
        let Some(surface) = self.surface_space() else {
            return Vec::new();
        };
        let store = &mut self.store;
        let outcome = self
            .tracker
            .long_press_elapsed(generation, |kind| store.begin_drag(kind));
        self.apply_pointer(outcome, surface)
    }

    fn apply_pointer(&mut self, outcome: PointerOutcome, surface: CoordinateSpace) -> Vec<Effect> {
        let mut effects = Vec::new();
        match outcome {
            PointerOutcome::Ignored => {}
            PointerOutcome::Pressed { at, timer } => {
                self.magnifier.track(at);
                effects.extend(timer.map(Effect::ScheduleLongPress));
            }
            PointerOutcome::Tracking(at) => self.magnifier.track(at),
            PointerOutcome::Tap(at) => {
                self.magnifier.end();
                match self.store.place(TaggedPoint::new(at, surface)) {
                    Ok(Some(_)) => self.refresh_live_state(),
                    Ok(None) => log::debug!("Tap ignored, both markers placed"),
                    Err(err) => log::warn!("Tap not placed: {}", err),
                }
            }
            PointerOutcome::DragStarted(_) => {}
            PointerOutcome::DragMoved { marker, point } => {
                self.magnifier.track(point);
                if let Err(err) = self.store.move_marker(marker, TaggedPoint::new(point, surface)) {
                    log::warn!("Drag move dropped: {}", err);
                }
            }
            PointerOutcome::DragEnded { marker, point } => {
                self.magnifier.end();
                if let Err(err) = self.store.move_marker(marker, TaggedPoint::new(point, surface)) {
                    log::warn!("Drag end dropped: {}", err);
                }
                self.store.end_drag();
            }
            PointerOutcome::DragCancelled(session) => {
                self.magnifier.end();
                self.store.cancel_drag(session.origin);
            }
            PointerOutcome::Cancelled => self.magnifier.end(),
        }
        effects
    }

    /// Derive the live state from the markers
    fn refresh_live_state(&mut self) {
        if !self.state.is_live() {
            return;
        }
        let markers = self.store.markers();
        self.state = match (markers.ball.is_some(), markers.hole.is_some()) {
            (false, false) => CaptureState::CameraActive,
            (true, true) => match &self.state {
                CaptureState::MarkersComplete { .. } => return,
                _ => CaptureState::MarkersComplete { error: None },
            },
            _ => CaptureState::MarkersIncomplete,
        };
    }

    fn on_reset(&mut self) -> Vec<Effect> {
        if self.state.is_live() {
            self.abort_pointer();
            self.store.reset();
            self.state = CaptureState::CameraActive;
        } else if self.state == CaptureState::Reviewing {
            // Stay on the still; confirm waits for two new markers
            self.abort_pointer();
            self.store.reset();
        }
        Vec::new()
    }

    fn on_capture(&mut self) -> Vec<Effect> {
        if !matches!(self.state, CaptureState::MarkersComplete { .. }) {
            log::debug!("Capture ignored in {}", self.state.name());
            return Vec::new();
        }
        self.abort_pointer();
        let ticket = self.ticket();
        self.state = CaptureState::Capturing { ticket };
        vec![Effect::CaptureStill {
            ticket,
            quality: self.config.quality,
        }]
    }

    fn on_frame_captured(
        &mut self,
        ticket: u64,
        result: Result<CapturedImage, CaptureDeviceError>,
    ) -> Vec<Effect> {
        if self.state != (CaptureState::Capturing { ticket }) {
            log::debug!("Ignoring stale frame {}", ticket);
            return Vec::new();
        }

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                log::warn!("Capture failed: {}", err);
                self.state = CaptureState::MarkersComplete { error: Some(err) };
                return Vec::new();
            }
        };

        if let Err(err) = self.store.migrate_to_image_space(image.space()) {
            log::warn!("Could not move markers into the captured image: {}", err);
            self.state = CaptureState::MarkersComplete {
                error: Some(CaptureDeviceError::InvalidFrame(err.to_string())),
            };
            return Vec::new();
        }

        self.image = Some(image);
        self.state = CaptureState::Reviewing;
        self.sync_surface()
    }

    /// The analysis request for the current still and markers
    fn analysis_request(&self) -> Option<AnalysisRequest> {
        let image = self.image.as_ref()?;
        let (ball, hole) = self.store.projected(&image.space()).pair()?;
        Some(AnalysisRequest::new(image, ball, hole))
    }

    fn on_confirm(&mut self) -> Vec<Effect> {
        if self.state != CaptureState::Reviewing || self.store.dragging().is_some() {
            return Vec::new();
        }
        let Some(request) = self.analysis_request() else {
            log::debug!("Confirm ignored, markers incomplete");
            return Vec::new();
        };
        self.release_surface();
        let ticket = self.ticket();
        self.state = CaptureState::Confirmed {
            ticket,
            status: AnalysisStatus::Pending,
        };
        vec![
            Effect::StopCamera,
            Effect::StopOrientation,
            Effect::Analyze { ticket, request },
        ]
    }

    fn on_retry_analysis(&mut self) -> Vec<Effect> {
        if !matches!(
            self.state,
            CaptureState::Confirmed {
                status: AnalysisStatus::Failed(_),
                ..
            }
        ) {
            return Vec::new();
        }
        let Some(request) = self.analysis_request() else {
            return Vec::new();
        };
        let ticket = self.ticket();
        self.state = CaptureState::Confirmed {
            ticket,
            status: AnalysisStatus::Pending,
        };
        vec![Effect::Analyze { ticket, request }]
    }

    fn on_retake(&mut self) -> Vec<Effect> {
        if self.state != CaptureState::Reviewing {
            return Vec::new();
        }
        self.abort_pointer();
        self.store.discard();
        self.image = None;
        self.state = CaptureState::CameraActive;
        self.sync_surface()
    }

    fn on_cancel(&mut self) -> Vec<Effect> {
        if self.state == CaptureState::Cancelled {
            return Vec::new();
        }
        self.release_surface();
        self.store.discard();
        self.image = None;
        self.level.reset();
        self.state = CaptureState::Cancelled;
        vec![Effect::StopCamera, Effect::StopOrientation]
    }

    /// Project the session into UI flags
    pub fn view(&self) -> SessionView {
        let surface = self.surface_space();
        let markers = surface
            .map(|s| self.store.projected(&s))
            .unwrap_or_default();
        let break_path = markers
            .pair()
            .map(|(ball, hole)| BreakPath::new(ball, hole, self.config.break_fraction));
        let loupe = if self.state.accepts_pointer() {
            surface.and_then(|s| {
                self.magnifier.loupe(
                    &s,
                    self.store.is_complete(),
                    self.store.dragging().is_some(),
                )
            })
        } else {
            None
        };

        let mut view = SessionView {
            level: self.level.tier(),
            show_level: self.state.is_live() && self.level.permission() != PermissionState::Denied,
            markers,
            break_path,
            loupe,
            ..Default::default()
        };

        match &self.state {
            CaptureState::AwaitingInstructions { retry } => {
                view.show_instructions = true;
                view.camera_error = retry.as_ref().map(ToString::to_string);
            }
            CaptureState::CameraStarting => view.busy = true,
            CaptureState::CameraActive | CaptureState::MarkersIncomplete => {
                view.preview_live = true;
                view.can_reset = !self.store.markers().is_empty();
            }
            CaptureState::MarkersComplete { error } => {
                view.preview_live = true;
                view.can_reset = true;
                view.can_capture = self.store.dragging().is_none();
                view.capture_error = error.as_ref().map(ToString::to_string);
            }
            CaptureState::Capturing { .. } => {
                view.preview_frozen = true;
                view.busy = true;
            }
            CaptureState::Reviewing => {
                view.preview_frozen = true;
                view.can_reset = !self.store.markers().is_empty();
                view.can_confirm = self.store.is_complete() && self.store.dragging().is_none();
                view.can_retake = true;
            }
            CaptureState::Confirmed { status, .. } => {
                view.preview_frozen = true;
                match status {
                    AnalysisStatus::Pending => {
                        view.analysis_pending = true;
                        view.busy = true;
                    }
                    AnalysisStatus::Ready(analysis) => view.analysis = Some(analysis.clone()),
                    AnalysisStatus::Failed(err) => {
                        view.analysis_error = Some(err.to_string());
                        view.can_retry_analysis = true;
                    }
                }
            }
            CaptureState::Cancelled => {}
        }
        view
    }

    /// The captured still with markers and break path drawn in
    pub fn annotated_image(&self) -> Option<RgbaImage> {
        let image = self.image.as_ref()?;
        let mut rgba = image.rgba.clone()?;
        let markers = self.store.projected(&image.space());
        // Keep strokes readable on large stills
        let scale = (image.width().max(image.height()) as f32 / 1000.0).max(1.0);
        draw_review_overlay(
            &mut rgba,
            &markers,
            self.config.break_fraction,
            &self.config.palette,
            scale,
        );
        Some(rgba)
    }

    /// Zoomed excerpt of the still under the pointer, while reviewing
    pub fn loupe_image(&self) -> Option<RgbaImage> {
        let image = self.image.as_ref()?;
        let rgba = image.rgba.as_ref()?;
        let surface = self.surface_space()?;
        let loupe = self.view().loupe?;
        let focus = TaggedPoint::new(loupe.focus, surface)
            .to(&image.space())
            .ok()?;
        Some(render_loupe(rgba, focus.point, loupe.zoom, loupe.radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analysis, AnalysisResponse};
    use crate::capture::StillFrame;
    use crate::domain::{HapticIntensity, MarkerKind, OrientationSample, Point};
    use crate::error::AnalysisError;
    use crate::render::image::encode_png;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-2
    }

    fn live() -> CaptureCoordinator {
        let mut c = CaptureCoordinator::new(PuttlineConfig::default());
        let effects = c.update(Msg::InstructionsDismissed);
        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], Effect::StartCamera { .. }));
        assert_eq!(effects[1], Effect::StartOrientation);
        c.update(Msg::CameraStarted(Ok(())));
        c.update(Msg::SurfaceResized {
            width: 1000.0,
            height: 800.0,
        });
        assert_eq!(c.state(), &CaptureState::CameraActive);
        c
    }

    fn tap(c: &mut CaptureCoordinator, at: Point) -> Vec<Effect> {
        let mut effects = c.update(Msg::Pointer(PointerEvent::Down(at)));
        effects.extend(c.update(Msg::Pointer(PointerEvent::Up(at))));
        effects
    }

    fn capture_ticket(effects: &[Effect]) -> u64 {
        match effects {
            [Effect::CaptureStill { ticket, .. }] => *ticket,
            other => panic!("expected a capture, got {other:?}"),
        }
    }

    /// Frame that does not decode but reports its size
    fn frame(width: u32, height: u32) -> CapturedImage {
        CapturedImage::from_frame(StillFrame {
            bytes: vec![0xff, 0xd8, 0xff, 0xe0],
            width,
            height,
        })
        .unwrap()
    }

    fn decodable_frame(width: u32, height: u32) -> CapturedImage {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([20, 120, 40, 255]));
        CapturedImage::from_frame(StillFrame {
            bytes: encode_png(&img).unwrap(),
            width,
            height,
        })
        .unwrap()
    }

    fn reviewing(image: CapturedImage) -> CaptureCoordinator {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));
        let ticket = capture_ticket(&c.update(Msg::Capture));
        c.update(Msg::FrameCaptured {
            ticket,
            result: Ok(image),
        });
        assert_eq!(c.state(), &CaptureState::Reviewing);
        c
    }

    fn analyze_ticket(effects: &[Effect]) -> (u64, AnalysisRequest) {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Analyze { ticket, request } => Some((*ticket, request.clone())),
                _ => None,
            })
            .expect("analysis effect")
    }

    #[test]
    fn test_end_to_end_view_to_image_scenario() {
        let mut c = live();

        tap(&mut c, p(100.0, 100.0));
        assert_eq!(c.state(), &CaptureState::MarkersIncomplete);
        tap(&mut c, p(900.0, 700.0));
        assert_eq!(c.state(), &CaptureState::MarkersComplete { error: None });

        let ticket = capture_ticket(&c.update(Msg::Capture));
        assert_eq!(c.state(), &CaptureState::Capturing { ticket });

        c.update(Msg::FrameCaptured {
            ticket,
            result: Ok(frame(3000, 2400)),
        });
        assert_eq!(c.state(), &CaptureState::Reviewing);

        let image_space = CoordinateSpace::image(3000.0, 2400.0);
        let markers = c.store().projected(&image_space);
        assert!(close(markers.ball.unwrap(), p(300.0, 300.0)));
        assert!(close(markers.hole.unwrap(), p(2700.0, 2100.0)));

        let path = BreakPath::new(markers.ball.unwrap(), markers.hole.unwrap(), 0.15);
        let d = (2400.0f32, 1800.0f32);
        let len = (d.0 * d.0 + d.1 * d.1).sqrt();
        let offset = path.offset();
        assert!((offset.x.hypot(offset.y) - 0.15 * len).abs() < 1e-2);
        // Perpendicular to ball -> hole
        assert!((offset.x * d.0 + offset.y * d.1).abs() < 1.0);

        let effects = c.update(Msg::Confirm);
        assert!(effects.contains(&Effect::StopCamera));
        let (ticket, request) = analyze_ticket(&effects);
        assert!(close(request.ball, p(300.0, 300.0)));
        assert!(close(request.hole, p(2700.0, 2100.0)));
        assert_eq!((request.image_width, request.image_height), (3000, 2400));

        let analysis = Analysis {
            response: AnalysisResponse::fallback(),
            fallback: true,
        };
        c.update(Msg::AnalysisFinished {
            ticket,
            result: Ok(analysis.clone()),
        });
        assert_eq!(c.view().analysis, Some(analysis));
    }

    #[test]
    fn test_view_dimensions_are_taken_at_tap_time() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        c.update(Msg::SurfaceResized {
            width: 2000.0,
            height: 800.0,
        });
        tap(&mut c, p(1800.0, 700.0));

        let ticket = capture_ticket(&c.update(Msg::Capture));
        c.update(Msg::FrameCaptured {
            ticket,
            result: Ok(frame(3000, 2400)),
        });

        let markers = c.store().projected(&CoordinateSpace::image(3000.0, 2400.0));
        assert!(close(markers.ball.unwrap(), p(300.0, 300.0)));
        assert!(close(markers.hole.unwrap(), p(2700.0, 2100.0)));
    }

    #[test]
    fn test_third_tap_is_ignored() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));
        let before = *c.store().markers();
        tap(&mut c, p(500.0, 500.0));
        assert_eq!(*c.store().markers(), before);
    }

    #[test]
    fn test_long_press_drag_and_leave_restores() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));

        let effects = c.update(Msg::Pointer(PointerEvent::Down(p(105.0, 100.0))));
        let [Effect::ScheduleLongPress(timer)] = effects.as_slice() else {
            panic!("expected long-press timer, got {effects:?}");
        };
        c.update(Msg::LongPressElapsed(timer.generation));
        assert_eq!(c.store().dragging(), Some(MarkerKind::Ball));

        c.update(Msg::Pointer(PointerEvent::Move(p(200.0, 150.0))));
        assert!(c.view().loupe.is_some());
        c.update(Msg::Pointer(PointerEvent::Up(p(210.0, 150.0))));
        assert_eq!(c.store().dragging(), None);
        let view = CoordinateSpace::view(1000.0, 800.0);
        assert!(close(c.store().projected(&view).ball.unwrap(), p(210.0, 150.0)));

        // Second drag leaves the surface: marker returns
        let effects = c.update(Msg::Pointer(PointerEvent::Down(p(210.0, 150.0))));
        let [Effect::ScheduleLongPress(timer)] = effects.as_slice() else {
            panic!("expected long-press timer");
        };
        c.update(Msg::LongPressElapsed(timer.generation));
        c.update(Msg::Pointer(PointerEvent::Move(p(400.0, 400.0))));
        c.update(Msg::Pointer(PointerEvent::Leave));
        assert_eq!(c.store().dragging(), None);
        assert!(close(c.store().projected(&view).ball.unwrap(), p(210.0, 150.0)));
        assert!(c.view().loupe.is_none());
    }

    #[test]
    fn test_pointer_ignored_while_capturing() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));
        c.update(Msg::Capture);
        c.update(Msg::ResetMarkers);
        assert!(tap(&mut c, p(500.0, 500.0)).is_empty());
        assert!(c.store().is_complete());
        assert!(c.view().busy);
    }

    #[test]
    fn test_capture_failure_is_retryable() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));
        let ticket = capture_ticket(&c.update(Msg::Capture));
        c.update(Msg::FrameCaptured {
            ticket,
            result: Err(CaptureDeviceError::CaptureFailed("shutter".into())),
        });

        let view = c.view();
        assert!(view.can_capture);
        assert!(view.capture_error.unwrap().contains("shutter"));
        assert!(c.store().is_complete());

        let retry = capture_ticket(&c.update(Msg::Capture));
        assert_ne!(retry, ticket);
    }

    #[test]
    fn test_stale_frame_is_ignored() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));
        let ticket = capture_ticket(&c.update(Msg::Capture));
        c.update(Msg::FrameCaptured {
            ticket: ticket + 7,
            result: Ok(frame(3000, 2400)),
        });
        assert_eq!(c.state(), &CaptureState::Capturing { ticket });
        assert!(c.image().is_none());
    }

    #[test]
    fn test_frame_arriving_after_cancel_is_dropped() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));
        let ticket = capture_ticket(&c.update(Msg::Capture));
        c.update(Msg::Cancel);

        let effects = c.update(Msg::FrameCaptured {
            ticket,
            result: Ok(frame(3000, 2400)),
        });
        assert!(effects.is_empty());
        assert_eq!(c.state(), &CaptureState::Cancelled);
        assert!(c.image().is_none());
        assert!(c.store().markers().is_empty());
        assert_eq!(c.tracker.surface(), None);
    }

    #[test]
    fn test_resize_during_drag_restores_marker() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(900.0, 700.0));

        let effects = c.update(Msg::Pointer(PointerEvent::Down(p(100.0, 100.0))));
        let [Effect::ScheduleLongPress(timer)] = effects.as_slice() else {
            panic!("expected long-press timer, got {effects:?}");
        };
        c.update(Msg::LongPressElapsed(timer.generation));
        c.update(Msg::Pointer(PointerEvent::Move(p(300.0, 250.0))));
        assert_eq!(c.store().dragging(), Some(MarkerKind::Ball));

        // Device rotated mid-drag
        c.update(Msg::SurfaceResized {
            width: 800.0,
            height: 1000.0,
        });
        assert_eq!(c.store().dragging(), None);
        assert!(c.view().loupe.is_none());
        let ball = c.store().markers().ball.unwrap();
        assert_eq!(ball.space, CoordinateSpace::view(1000.0, 800.0));
        assert!(close(ball.point, p(100.0, 100.0)));

        // Later moves and the release belong to no gesture
        c.update(Msg::Pointer(PointerEvent::Move(p(50.0, 60.0))));
        c.update(Msg::Pointer(PointerEvent::Up(p(50.0, 60.0))));
        let ball = c.store().markers().ball.unwrap();
        assert!(close(ball.point, p(100.0, 100.0)));
    }

    #[test]
    fn test_confirm_releases_pointer_surface() {
        let mut c = reviewing(frame(3000, 2400));
        assert!(c.tracker.surface().is_some());
        c.update(Msg::Confirm);
        assert_eq!(c.tracker.surface(), None);
    }

    #[test]
    fn test_reset_while_reviewing_keeps_still() {
        let mut c = reviewing(frame(3000, 2400));
        c.update(Msg::ResetMarkers);
        assert_eq!(c.state(), &CaptureState::Reviewing);
        assert!(!c.view().can_confirm);
        assert!(c.update(Msg::Confirm).is_empty());

        // Display taps land in image space
        tap(&mut c, p(100.0, 100.0));
        tap(&mut c, p(500.0, 400.0));
        let markers = c.store().markers();
        let ball = markers.ball.unwrap();
        assert_eq!(ball.space, CoordinateSpace::image(3000.0, 2400.0));
        assert!(close(ball.point, p(300.0, 300.0)));
        assert!(close(markers.hole.unwrap().point, p(1500.0, 1200.0)));
        assert!(c.view().can_confirm);
    }

    #[test]
    fn test_reset_while_live_returns_to_camera_active() {
        let mut c = live();
        tap(&mut c, p(100.0, 100.0));
        c.update(Msg::ResetMarkers);
        assert_eq!(c.state(), &CaptureState::CameraActive);
        assert!(c.store().markers().is_empty());
    }

    #[test]
    fn test_retake_discards_still_and_markers() {
        let mut c = reviewing(frame(3000, 2400));
        c.update(Msg::Retake);
        assert_eq!(c.state(), &CaptureState::CameraActive);
        assert!(c.image().is_none());
        assert!(c.store().markers().is_empty());
        assert_eq!(c.store().image_space(), None);
        assert_eq!(c.surface_space(), Some(CoordinateSpace::view(1000.0, 800.0)));
    }

    #[test]
    fn test_cancel_from_anywhere_stops_collaborators() {
        let mut c = reviewing(frame(3000, 2400));
        let effects = c.update(Msg::Cancel);
        assert_eq!(effects, vec![Effect::StopCamera, Effect::StopOrientation]);
        assert_eq!(c.state(), &CaptureState::Cancelled);
        assert!(c.image().is_none());
        assert!(c.update(Msg::Cancel).is_empty());
    }

    #[test]
    fn test_camera_started_after_cancel_is_stopped() {
        let mut c = CaptureCoordinator::new(PuttlineConfig::default());
        c.update(Msg::InstructionsDismissed);
        c.update(Msg::Cancel);
        assert_eq!(c.update(Msg::CameraStarted(Ok(()))), vec![Effect::StopCamera]);
    }

    #[test]
    fn test_camera_start_failure_offers_retry() {
        let mut c = CaptureCoordinator::new(PuttlineConfig::default());
        c.update(Msg::InstructionsDismissed);
        let effects = c.update(Msg::CameraStarted(Err(CaptureDeviceError::StartFailed(
            "busy".into(),
        ))));
        assert_eq!(effects, vec![Effect::StopOrientation]);
        let view = c.view();
        assert!(view.show_instructions);
        assert!(view.camera_error.is_some());

        assert_eq!(c.update(Msg::InstructionsDismissed).len(), 2);
        assert_eq!(c.state(), &CaptureState::CameraStarting);
    }

    #[test]
    fn test_level_pulses_only_on_tier_change() {
        let mut c = live();
        let good = OrientationSample::new(90.0, 1.0);
        let bad = OrientationSample::new(10.0, 40.0);

        assert_eq!(
            c.update(Msg::Orientation(good)),
            vec![Effect::Pulse(HapticIntensity::Light)]
        );
        assert!(c.update(Msg::Orientation(good)).is_empty());
        assert_eq!(
            c.update(Msg::Orientation(bad)),
            vec![Effect::Pulse(HapticIntensity::Heavy)]
        );
        assert_eq!(c.level_tier(), LevelTier::Bad);
    }

    #[test]
    fn test_denied_orientation_never_pulses() {
        let mut c = live();
        c.update(Msg::OrientationPermission(PermissionState::Denied));
        assert!(c.update(Msg::Orientation(OrientationSample::new(90.0, 0.0))).is_empty());
        let view = c.view();
        assert_eq!(view.level, LevelTier::Bad);
        assert!(!view.show_level);

        // Placement is unaffected
        tap(&mut c, p(10.0, 10.0));
        assert_eq!(c.state(), &CaptureState::MarkersIncomplete);
    }

    #[test]
    fn test_failed_analysis_retries_only_on_request() {
        let mut c = reviewing(frame(3000, 2400));
        let (ticket, _) = analyze_ticket(&c.update(Msg::Confirm));

        // Retry while pending does nothing
        assert!(c.update(Msg::RetryAnalysis).is_empty());

        c.update(Msg::AnalysisFinished {
            ticket,
            result: Err(AnalysisError::RateLimited("slow down".into())),
        });
        let view = c.view();
        assert!(view.can_retry_analysis);
        assert!(view.analysis_error.is_some());

        let (retry, _) = analyze_ticket(&c.update(Msg::RetryAnalysis));
        assert_ne!(retry, ticket);

        // Late answer for the first request is dropped
        c.update(Msg::AnalysisFinished {
            ticket,
            result: Err(AnalysisError::Transport("late".into())),
        });
        assert!(c.view().analysis_pending);
    }

    #[test]
    fn test_annotated_image_and_loupe_from_decoded_still() {
        let mut c = reviewing(decodable_frame(300, 240));
        let annotated = c.annotated_image().unwrap();
        assert_eq!(annotated.dimensions(), (300, 240));
        // Ball at (30, 30) is drawn
        assert_ne!(annotated.get_pixel(30, 30), &image::Rgba([20, 120, 40, 255]));

        assert!(c.loupe_image().is_none());
        c.update(Msg::ResetMarkers);
        c.update(Msg::Pointer(PointerEvent::Down(p(500.0, 400.0))));
        let loupe = c.loupe_image().unwrap();
        assert_eq!(loupe.dimensions(), (120, 120));
    }
}
