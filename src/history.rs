// ============================================================================
// HISTORY — linear undo stack of stroke and crop operations
// ============================================================================
//
// The stack is append-only while editing and truncated from the tail by
// undo; there is no redo. The visible composite is always reconstructed by
// replaying the live entries against the working source, never by patching
// a cached bitmap, so undo correctness follows from compositor determinism.
//
// A crop commit seals everything before it: the flattened, cropped composite
// becomes the new working source, and the pre-crop source is retained inside
// the entry so that undoing the crop can restore it (and the strokes
// recorded before the crop become live again, unchanged).

use image::RgbaImage;

use crate::geometry::CropRect;
use crate::stroke::Stroke;

/// One undoable editing operation.
#[derive(Debug, Clone)]
pub enum HistoryEntry {
    Stroke(Stroke),
    CropCommit {
        /// Image-space region of the pre-crop source that was kept.
        region: CropRect,
        /// Snapshot of the working source as it was before the crop.
        prior_source: RgbaImage,
    },
}

/// Linear undo stack. Unbounded: only crop entries retain pixel snapshots,
/// and crops are rare compared to strokes.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Pop the most recent entry. `None` when the stack is empty (undo below
    /// the start of history is a no-op).
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The strokes that render against the current working source: every
    /// stroke recorded after the most recent crop commit. Strokes before a
    /// crop are flattened into the working source itself.
    pub fn live_strokes(&self) -> impl Iterator<Item = &Stroke> {
        let start = self
            .entries
            .iter()
            .rposition(|e| matches!(e, HistoryEntry::CropCommit { .. }))
            .map(|i| i + 1)
            .unwrap_or(0);
        self.entries[start..].iter().filter_map(|e| match e {
            HistoryEntry::Stroke(s) => Some(s),
            HistoryEntry::CropCommit { .. } => None,
        })
    }
}
