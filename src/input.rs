//! Input source types: viewport sizes, screen points and gestures.
//!
//! The window layer feeds raw pointer events into a [`GestureRecognizer`],
//! which turns them into taps and pans the application understands.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

impl ViewportSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// Screen-space location, origin at the top-left corner, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Tap(ScreenPoint),
    PanBegan(ScreenPoint),
    PanChanged(ScreenPoint),
    PanEnded(ScreenPoint),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Multiplier applied to normalized pan deltas
    pub pan_sensitivity: f32,
    /// Distance in pixels a press may travel and still count as a tap
    pub tap_slop: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pan_sensitivity: 5.0,
            tap_slop: 4.0,
        }
    }
}

/// Classifies a press/move/release sequence as either a tap or a pan.
#[derive(Debug)]
pub struct GestureRecognizer {
    tap_slop: f32,
    pressed_at: Option<ScreenPoint>,
    panning: bool,
    cursor: ScreenPoint,
}

impl GestureRecognizer {
    pub fn new(tap_slop: f32) -> Self {
        Self {
            tap_slop,
            pressed_at: None,
            panning: false,
            cursor: ScreenPoint::default(),
        }
    }

    pub fn cursor(&self) -> ScreenPoint {
        self.cursor
    }

    pub fn press(&mut self) {
        self.pressed_at = Some(self.cursor);
        self.panning = false;
    }

    pub fn moved(&mut self, point: ScreenPoint) -> Option<Gesture> {
        self.cursor = point;
        let origin = self.pressed_at?;

        if self.panning {
            return Some(Gesture::PanChanged(point));
        }

        let dx = point.x - origin.x;
        let dy = point.y - origin.y;
        if (dx * dx + dy * dy).sqrt() > self.tap_slop {
            self.panning = true;
            // The pan starts where the press happened so the first delta is not lost
            return Some(Gesture::PanBegan(origin));
        }
        None
    }

    pub fn release(&mut self) -> Option<Gesture> {
        self.pressed_at.take()?;
        if std::mem::take(&mut self.panning) {
            Some(Gesture::PanEnded(self.cursor))
        } else {
            Some(Gesture::Tap(self.cursor))
        }
    }
}

/// Tracks pan gestures and turns them into rotation deltas in radians.
#[derive(Debug)]
pub struct PanController {
    sensitivity: f32,
    // The previous position, used to compute the per-event delta
    last_location: Option<ScreenPoint>,
}

impl PanController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            last_location: None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.last_location.is_some()
    }

    /// Feeds a pan gesture and returns the `(x, y)` delta it produced, if any.
    pub fn process(&mut self, gesture: Gesture, viewport: ViewportSize) -> Option<(f32, f32)> {
        match gesture {
            Gesture::PanBegan(location) => {
                self.last_location = Some(location);
                None
            }
            Gesture::PanChanged(location) => {
                let last = self.last_location.replace(location)?;
                if viewport.is_empty() {
                    return None;
                }
                let dx = (last.x - location.x) / viewport.width * self.sensitivity;
                let dy = (last.y - location.y) / viewport.height * self.sensitivity;
                Some((dx, dy))
            }
            Gesture::PanEnded(_) => {
                self.last_location = None;
                None
            }
            Gesture::Tap(_) => None,
        }
    }
}
