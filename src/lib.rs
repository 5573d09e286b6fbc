//! Region-retouch image editor core.
//!
//! Everything needed to edit one raster image with mask-based region effects:
//! whole-image pixelate/blur derivatives ([`effects`]), display↔image
//! coordinate mapping ([`geometry`]), freehand stroke capture ([`stroke`])
//! and rasterization ([`mask`]), ordered compositing ([`compositor`]), a
//! linear undo stack ([`history`]), crop, and export encoding ([`io`]).
//!
//! The core is UI-toolkit-agnostic: an [`EditorSession`] owns all state for
//! one open edit, raw pointer events arrive through [`pointer::PointerEvent`],
//! and only encoded exports ever leave the session. [`batch::BatchQueue`]
//! sequences sessions over an ordered image list; the `retouch` binary
//! ([`cli`]) replays recorded ops scripts headlessly.

pub mod batch;
pub mod cli;
pub mod compositor;
pub mod effects;
pub mod error;
pub mod geometry;
pub mod history;
pub mod io;
pub mod logger;
pub mod mask;
pub mod pointer;
pub mod script;
pub mod session;
pub mod stroke;

pub use batch::BatchQueue;
pub use effects::EffectBuffers;
pub use error::EditorError;
pub use geometry::{Point, Rect, Size, ViewMapping};
pub use io::{ExportFormat, ExportResult};
pub use pointer::PointerEvent;
pub use session::EditorSession;
pub use stroke::{Effect, Stroke, Tool};
