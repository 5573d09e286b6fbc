// ============================================================================
// STROKE RECORDING — freehand brush drags tagged with an effect
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};

/// The active tool. `Select` pans/inspects and never draws; `Crop` is handled
/// by the crop tool, not the stroke recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Select,
    Pixelate,
    Blur,
    Erase,
    Crop,
}

impl Tool {
    /// The effect a drag with this tool records, if any.
    pub fn effect(self) -> Option<Effect> {
        match self {
            Tool::Pixelate => Some(Effect::Pixelate),
            Tool::Blur => Some(Effect::Blur),
            Tool::Erase => Some(Effect::Erase),
            Tool::Select | Tool::Crop => None,
        }
    }
}

/// Effect tag carried by a finalized stroke.
///
/// `Erase` is a subtract mask, not an additive layer: it restores the
/// original source pixels within its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Pixelate,
    Blur,
    Erase,
}

/// A single continuous brush drag: an ordered polyline in display space, a
/// brush radius (display px), and the effect to render through its path.
///
/// The display size at recording time travels with the stroke so the polyline
/// can be mapped into any image space later (crop undo re-renders old strokes
/// against the restored source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub effect: Effect,
    pub radius: f32,
    pub display: Size,
    pub points: Vec<Point>,
}

/// Captures pointer drags as [`Stroke`]s.
///
/// `begin` arms the recorder with the tool settings; each pointer position
/// (including the initial press) arrives via `extend`; `end` finalizes on
/// pointer-up. A drag that recorded no points yields `None` and must not
/// reach the history stack.
#[derive(Debug, Default)]
pub struct StrokeRecorder {
    active: Option<Stroke>,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording a stroke. Returns `false` (and stays idle) for tools
    /// that do not draw. The brush radius is fixed for the stroke's duration.
    pub fn begin(&mut self, tool: Tool, radius: f32, display: Size) -> bool {
        let Some(effect) = tool.effect() else {
            self.active = None;
            return false;
        };
        self.active = Some(Stroke {
            effect,
            radius,
            display,
            points: Vec::new(),
        });
        true
    }

    /// Append a display-space point to the stroke in progress. Ignored when
    /// no stroke is active.
    pub fn extend(&mut self, point: Point) {
        if let Some(stroke) = &mut self.active {
            stroke.points.push(point);
        }
    }

    /// Finalize the stroke in progress. Empty strokes are discarded.
    pub fn end(&mut self) -> Option<Stroke> {
        let stroke = self.active.take()?;
        if stroke.points.is_empty() {
            return None;
        }
        Some(stroke)
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pt;

    fn display() -> Size {
        Size::new(800.0, 600.0)
    }

    #[test]
    fn drag_produces_a_stroke() {
        let mut rec = StrokeRecorder::new();
        assert!(rec.begin(Tool::Blur, 12.0, display()));
        rec.extend(pt(10.0, 10.0));
        rec.extend(pt(20.0, 15.0));
        rec.extend(pt(30.0, 25.0));
        let stroke = rec.end().unwrap();
        assert_eq!(stroke.effect, Effect::Blur);
        assert_eq!(stroke.radius, 12.0);
        assert_eq!(stroke.points.len(), 3);
        assert!(!rec.is_recording());
    }

    #[test]
    fn zero_point_stroke_is_discarded() {
        let mut rec = StrokeRecorder::new();
        rec.begin(Tool::Pixelate, 8.0, display());
        assert!(rec.end().is_none());
    }

    #[test]
    fn select_tool_records_nothing() {
        let mut rec = StrokeRecorder::new();
        assert!(!rec.begin(Tool::Select, 8.0, display()));
        rec.extend(pt(1.0, 1.0));
        assert!(rec.end().is_none());
    }

    #[test]
    fn crop_tool_is_not_the_recorders_job() {
        let mut rec = StrokeRecorder::new();
        assert!(!rec.begin(Tool::Crop, 8.0, display()));
        assert!(!rec.is_recording());
    }

    #[test]
    fn end_without_begin_is_a_noop() {
        let mut rec = StrokeRecorder::new();
        assert!(rec.end().is_none());
    }
}
