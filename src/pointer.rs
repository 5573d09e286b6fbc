// ============================================================================
// POINTER ADAPTER — raw device events, display space
// ============================================================================
//
// The editor core never talks to a UI toolkit. Whatever widget hosts the
// canvas translates its native mouse/touch events into these and feeds them
// to `EditorSession::handle_pointer`; the session routes them to the stroke
// recorder (effect tools), the pending crop rectangle (crop tool), or
// ignores them (select tool).

use crate::geometry::Point;

/// A pointer event in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down(p) | PointerEvent::Move(p) | PointerEvent::Up(p) => p,
        }
    }
}
