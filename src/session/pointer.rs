//! Pointer gesture tracking: tap versus long-press-drag
//!
//! A tap is committed on release, never on press, so the long-press timer can
//! still turn the press into a drag. The timer is only armed when the press
//! lands on an existing marker. Timer expiry is delivered back by the
//! runtime with the generation it was armed with; anything older than the
//! current generation is ignored.

use std::time::Duration;

use crate::domain::{CoordinateSpace, MarkerKind, Point, TaggedPoint};

/// Raw pointer events in surface coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    /// Pointer left the surface or the platform cancelled the touch
    Leave,
}

/// An active marker drag
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragSession {
    pub marker: MarkerKind,
    /// Marker position when the drag started, to restore on cancel
    pub origin: TaggedPoint,
}

/// Request to deliver `long_press_elapsed(generation)` after `delay`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LongPressTimer {
    pub generation: u64,
    pub delay: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    PossibleTap {
        origin: Point,
        last: Point,
        target: Option<MarkerKind>,
        /// Generation of the armed long-press timer
        armed: Option<u64>,
    },
    Dragging(DragSession),
}

/// What a pointer event resolved to
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerOutcome {
    /// Nothing to do
    Ignored,
    /// Press registered; the runtime should schedule the timer if one is given
    Pressed {
        at: Point,
        timer: Option<LongPressTimer>,
    },
    /// Pointer moved while a tap is still possible
    Tracking(Point),
    /// Released before the long-press fired
    Tap(Point),
    DragStarted(DragSession),
    DragMoved { marker: MarkerKind, point: Point },
    DragEnded { marker: MarkerKind, point: Point },
    /// Drag aborted; the marker goes back to `origin`
    DragCancelled(DragSession),
    /// Tap-in-progress aborted without a result
    Cancelled,
}

/// Tunables for gesture classification
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureConfig {
    pub long_press: Duration,
    /// Movement that abandons a pending long-press
    pub slop: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(400),
            slop: 8.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PointerInputTracker {
    config: GestureConfig,
    state: GestureState,
    surface: Option<CoordinateSpace>,
    generation: u64,
}

impl PointerInputTracker {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn surface(&self) -> Option<CoordinateSpace> {
        self.surface
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    /// Swap in a new surface. Any gesture against the old surface is dropped.
    pub fn set_surface(&mut self, surface: CoordinateSpace) -> PointerOutcome {
        let outcome = if self.surface != Some(surface) {
            self.cancel()
        } else {
            PointerOutcome::Ignored
        };
        self.surface = Some(surface);
        outcome
    }

    /// Drop the surface entirely (session confirmed or cancelled)
    pub fn clear_surface(&mut self) -> PointerOutcome {
        let outcome = self.cancel();
        self.surface = None;
        outcome
    }

    /// Abort whatever gesture is in progress
    pub fn cancel(&mut self) -> PointerOutcome {
        let previous = std::mem::take(&mut self.state);
        // Invalidate any timer already handed to the runtime
        self.generation += 1;
        match previous {
            GestureState::Idle => PointerOutcome::Ignored,
            GestureState::PossibleTap { .. } => PointerOutcome::Cancelled,
            GestureState::Dragging(session) => PointerOutcome::DragCancelled(session),
        }
    }

    pub fn handle(&mut self, event: PointerEvent, hit: Option<MarkerKind>) -> PointerOutcome {
        match event {
            PointerEvent::Down(p) => self.pointer_down(p, hit),
            PointerEvent::Move(p) => self.pointer_move(p),
            PointerEvent::Up(p) => self.pointer_up(p),
            PointerEvent::Leave => self.cancel(),
        }
    }

    /// `hit` is the marker under the press, if any
    pub fn pointer_down(&mut self, at: Point, hit: Option<MarkerKind>) -> PointerOutcome {
        let Some(surface) = self.surface else {
            log::debug!("Pointer down without a surface");
            return PointerOutcome::Ignored;
        };
        if !surface.contains(at) {
            return PointerOutcome::Ignored;
        }
        if self.is_active() {
            // A second pointer while one is down; keep the first gesture
            return PointerOutcome::Ignored;
        }

        let timer = hit.map(|_| {
            self.generation += 1;
            LongPressTimer {
                generation: self.generation,
                delay: self.config.long_press,
            }
        });
        self.state = GestureState::PossibleTap {
            origin: at,
            last: at,
            target: hit,
            armed: timer.map(|t| t.generation),
        };
        PointerOutcome::Pressed { at, timer }
    }

    pub fn pointer_move(&mut self, to: Point) -> PointerOutcome {
        if let Some(surface) = self.surface
            && !surface.contains(to)
        {
            return self.cancel();
        }

        match &mut self.state {
            GestureState::Idle => PointerOutcome::Ignored,
            GestureState::PossibleTap {
                origin,
                last,
                armed,
                ..
            } => {
                *last = to;
                if armed.is_some() && origin.distance(to) > self.config.slop {
                    log::debug!("Pointer moved beyond slop, long-press disarmed");
                    *armed = None;
                }
                PointerOutcome::Tracking(to)
            }
            GestureState::Dragging(session) => PointerOutcome::DragMoved {
                marker: session.marker,
                point: to,
            },
        }
    }

    pub fn pointer_up(&mut self, at: Point) -> PointerOutcome {
        let previous = std::mem::take(&mut self.state);
        self.generation += 1;
        match previous {
            GestureState::Idle => PointerOutcome::Ignored,
            GestureState::PossibleTap { .. } => {
                if self.surface.is_some_and(|s| s.contains(at)) {
                    PointerOutcome::Tap(at)
                } else {
                    PointerOutcome::Cancelled
                }
            }
            GestureState::Dragging(session) => {
                if self.surface.is_some_and(|s| s.contains(at)) {
                    PointerOutcome::DragEnded {
                        marker: session.marker,
                        point: at,
                    }
                } else {
                    PointerOutcome::DragCancelled(session)
                }
            }
        }
    }

    /// Timer expiry. `begin_drag` is asked for the marker's current position
    /// and returns `None` if the marker no longer exists.
    pub fn long_press_elapsed(
        &mut self,
        generation: u64,
        begin_drag: impl FnOnce(MarkerKind) -> Option<TaggedPoint>,
    ) -> PointerOutcome {
        let GestureState::PossibleTap {
            origin,
            last,
            target: Some(marker),
            armed: Some(armed),
        } = self.state
        else {
            return PointerOutcome::Ignored;
        };
        if armed != generation {
            log::debug!("Ignoring stale long-press timer {}", generation);
            return PointerOutcome::Ignored;
        }
        if origin.distance(last) > self.config.slop {
            return PointerOutcome::Ignored;
        }

        let Some(marker_origin) = begin_drag(marker) else {
            self.state = GestureState::Idle;
            return PointerOutcome::Cancelled;
        };
        let session = DragSession {
            marker,
            origin: marker_origin,
        };
        log::debug!("Long-press on {}, dragging", marker.label());
        self.state = GestureState::Dragging(session);
        PointerOutcome::DragStarted(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PointerInputTracker {
        let mut t = PointerInputTracker::new(GestureConfig::default());
        t.set_surface(CoordinateSpace::view(1000.0, 800.0));
        t
    }

    fn marker_origin(p: Point) -> impl FnOnce(MarkerKind) -> Option<TaggedPoint> {
        move |_| Some(TaggedPoint::new(p, CoordinateSpace::view(1000.0, 800.0)))
    }

    fn timer_of(outcome: PointerOutcome) -> LongPressTimer {
        match outcome {
            PointerOutcome::Pressed {
                timer: Some(timer), ..
            } => timer,
            other => panic!("expected armed press, got {other:?}"),
        }
    }

    #[test]
    fn test_tap_commits_on_release_only() {
        let mut t = tracker();
        let down = t.pointer_down(Point::new(100.0, 100.0), None);
        assert_eq!(
            down,
            PointerOutcome::Pressed {
                at: Point::new(100.0, 100.0),
                timer: None
            }
        );
        assert_eq!(
            t.pointer_up(Point::new(101.0, 100.0)),
            PointerOutcome::Tap(Point::new(101.0, 100.0))
        );
        assert_eq!(t.state(), GestureState::Idle);
    }

    #[test]
    fn test_timer_only_armed_on_marker() {
        let mut t = tracker();
        let outcome = t.pointer_down(Point::new(10.0, 10.0), Some(MarkerKind::Ball));
        assert_eq!(timer_of(outcome).delay, Duration::from_millis(400));
    }

    #[test]
    fn test_long_press_turns_into_drag() {
        let mut t = tracker();
        let origin = Point::new(50.0, 50.0);
        let timer = timer_of(t.pointer_down(origin, Some(MarkerKind::Hole)));

        let started = t.long_press_elapsed(timer.generation, marker_origin(origin));
        assert!(matches!(
            started,
            PointerOutcome::DragStarted(DragSession {
                marker: MarkerKind::Hole,
                ..
            })
        ));

        assert_eq!(
            t.pointer_move(Point::new(80.0, 90.0)),
            PointerOutcome::DragMoved {
                marker: MarkerKind::Hole,
                point: Point::new(80.0, 90.0)
            }
        );
        assert_eq!(
            t.pointer_up(Point::new(82.0, 91.0)),
            PointerOutcome::DragEnded {
                marker: MarkerKind::Hole,
                point: Point::new(82.0, 91.0)
            }
        );
        assert!(!t.is_active());
    }

    #[test]
    fn test_release_before_timer_is_a_tap_and_timer_goes_stale() {
        let mut t = tracker();
        let timer = timer_of(t.pointer_down(Point::new(50.0, 50.0), Some(MarkerKind::Ball)));
        assert!(matches!(t.pointer_up(Point::new(50.0, 50.0)), PointerOutcome::Tap(_)));

        let late = t.long_press_elapsed(timer.generation, marker_origin(Point::ORIGIN));
        assert_eq!(late, PointerOutcome::Ignored);
        assert_eq!(t.state(), GestureState::Idle);
    }

    #[test]
    fn test_stale_generation_from_earlier_press_is_ignored() {
        let mut t = tracker();
        let first = timer_of(t.pointer_down(Point::new(50.0, 50.0), Some(MarkerKind::Ball)));
        t.pointer_up(Point::new(50.0, 50.0));
        let second = timer_of(t.pointer_down(Point::new(50.0, 50.0), Some(MarkerKind::Ball)));
        assert_ne!(first.generation, second.generation);

        assert_eq!(
            t.long_press_elapsed(first.generation, marker_origin(Point::ORIGIN)),
            PointerOutcome::Ignored
        );
        assert!(matches!(
            t.long_press_elapsed(second.generation, marker_origin(Point::ORIGIN)),
            PointerOutcome::DragStarted(_)
        ));
    }

    #[test]
    fn test_moving_beyond_slop_disarms_long_press() {
        let mut t = tracker();
        let timer = timer_of(t.pointer_down(Point::new(50.0, 50.0), Some(MarkerKind::Ball)));
        assert_eq!(
            t.pointer_move(Point::new(70.0, 50.0)),
            PointerOutcome::Tracking(Point::new(70.0, 50.0))
        );
        assert_eq!(
            t.long_press_elapsed(timer.generation, marker_origin(Point::ORIGIN)),
            PointerOutcome::Ignored
        );
        // Still a tap at the release position
        assert_eq!(
            t.pointer_up(Point::new(72.0, 50.0)),
            PointerOutcome::Tap(Point::new(72.0, 50.0))
        );
    }

    #[test]
    fn test_leaving_surface_cancels_without_result() {
        let mut t = tracker();
        t.pointer_down(Point::new(990.0, 10.0), None);
        assert_eq!(t.pointer_move(Point::new(1010.0, 10.0)), PointerOutcome::Cancelled);
        assert_eq!(t.pointer_up(Point::new(1010.0, 10.0)), PointerOutcome::Ignored);
    }

    #[test]
    fn test_leaving_surface_during_drag_reports_origin() {
        let mut t = tracker();
        let origin = Point::new(50.0, 50.0);
        let timer = timer_of(t.pointer_down(origin, Some(MarkerKind::Ball)));
        t.long_press_elapsed(timer.generation, marker_origin(origin));

        match t.handle(PointerEvent::Leave, None) {
            PointerOutcome::DragCancelled(session) => {
                assert_eq!(session.marker, MarkerKind::Ball);
                assert_eq!(session.origin.point, origin);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_surface_swap_invalidates_pending_timer() {
        let mut t = tracker();
        let timer = timer_of(t.pointer_down(Point::new(50.0, 50.0), Some(MarkerKind::Ball)));
        assert_eq!(
            t.set_surface(CoordinateSpace::display(500.0, 400.0)),
            PointerOutcome::Cancelled
        );
        assert_eq!(
            t.long_press_elapsed(timer.generation, marker_origin(Point::ORIGIN)),
            PointerOutcome::Ignored
        );
    }

    #[test]
    fn test_clearing_surface_ends_drag_and_input() {
        let mut t = tracker();
        let origin = Point::new(50.0, 50.0);
        let timer = timer_of(t.pointer_down(origin, Some(MarkerKind::Hole)));
        t.long_press_elapsed(timer.generation, marker_origin(origin));

        assert!(matches!(
            t.clear_surface(),
            PointerOutcome::DragCancelled(DragSession {
                marker: MarkerKind::Hole,
                ..
            })
        ));
        assert_eq!(t.surface(), None);
        assert!(!t.is_active());
        assert_eq!(
            t.handle(PointerEvent::Move(Point::new(60.0, 60.0)), None),
            PointerOutcome::Ignored
        );
    }

    #[test]
    fn test_events_without_surface_are_ignored() {
        let mut t = PointerInputTracker::new(GestureConfig::default());
        assert_eq!(
            t.pointer_down(Point::new(1.0, 1.0), None),
            PointerOutcome::Ignored
        );
    }
}
