// ============================================================================
// OPS SCRIPT — recorded edit operations for headless replay
// ============================================================================
//
// The CLI drives the editor with a JSON operation script instead of live
// pointer input: a list of strokes, crops and undos, replayed in order
// against each input image. Coordinates are display-space, interpreted in
// the session's current display box (which the `--viewport` flag controls),
// exactly as live pointer events would be.
//
// Example:
//   {
//     "ops": [
//       { "op": "stroke", "effect": "pixelate", "radius": 14.0,
//         "points": [[120.0, 80.0], [180.0, 95.0]] },
//       { "op": "crop", "x": 0.0, "y": 0.0, "width": 400.0, "height": 300.0 },
//       { "op": "undo" }
//     ]
//   }

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::geometry::{Rect, pt};
use crate::pointer::PointerEvent;
use crate::session::EditorSession;
use crate::stroke::{Effect, Tool};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// A brush drag: display-space polyline, brush radius, effect tag.
    Stroke {
        effect: Effect,
        radius: f32,
        points: Vec<[f32; 2]>,
    },
    /// Select and commit a crop region (display space).
    Crop {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Undo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditScript {
    #[serde(default)]
    pub ops: Vec<ScriptOp>,
}

/// Parse a script from JSON source.
pub fn parse(source: &str) -> Result<EditScript, EditorError> {
    serde_json::from_str(source).map_err(|e| EditorError::Script(e.to_string()))
}

/// Read and parse a script file.
pub fn load(path: &Path) -> Result<EditScript, EditorError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        EditorError::Script(format!("could not read '{}': {}", path.display(), e))
    })?;
    parse(&source)
}

fn tool_for(effect: Effect) -> Tool {
    match effect {
        Effect::Pixelate => Tool::Pixelate,
        Effect::Blur => Tool::Blur,
        Effect::Erase => Tool::Erase,
    }
}

/// Replay every operation against `session`, in order. Individual no-ops
/// (empty strokes, degenerate crops, undo on empty history) are silent,
/// matching interactive behavior.
pub fn apply(script: &EditScript, session: &mut EditorSession) {
    for op in &script.ops {
        match op {
            ScriptOp::Stroke { effect, radius, points } => {
                let Some((first, rest)) = points.split_first() else {
                    continue;
                };
                session.set_tool(tool_for(*effect));
                session.set_brush_radius(*radius);
                session.handle_pointer(PointerEvent::Down(pt(first[0], first[1])));
                for p in rest {
                    session.handle_pointer(PointerEvent::Move(pt(p[0], p[1])));
                }
                let last = points.last().unwrap_or(first);
                session.handle_pointer(PointerEvent::Up(pt(last[0], last[1])));
            }
            ScriptOp::Crop { x, y, width, height } => {
                session.set_tool(Tool::Crop);
                session.select_crop_region(Rect::new(*x, *y, *width, *height));
                session.commit_crop();
            }
            ScriptOp::Undo => {
                session.undo();
            }
        }
    }
}
