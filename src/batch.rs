// ============================================================================
// BATCH QUEUE — sequential editing of an ordered image list
// ============================================================================
//
// Batch edits are strictly sequential: one session is open at a time, and
// navigating to a neighbour drops the current session (and all its in-memory
// buffers) before the next one loads. Finished exports are kept per item,
// outside any session, so a failed or skipped image never discards work
// already saved for the others.

use std::path::PathBuf;

use image::RgbaImage;

use crate::error::EditorError;
use crate::geometry::Size;
use crate::io::{ExportFormat, ExportResult};
use crate::log_info;
use crate::session::EditorSession;

/// Supplies the pixels for the image at a batch index. This is the
/// navigation seam with the host application: it is invoked exactly when
/// the queue moves onto an index, letting the host decide where images come
/// from (disk, an HTTP fetch it performed, a cache).
pub type SourceLoader = Box<dyn FnMut(usize) -> Result<RgbaImage, EditorError>>;

pub struct BatchQueue {
    loader: SourceLoader,
    len: usize,
    index: usize,
    viewport: Size,
    session: Option<EditorSession>,
    results: Vec<Option<ExportResult>>,
}

impl BatchQueue {
    /// A queue over `len` images starting at index 0. No session is opened
    /// until [`open_current`] is called.
    ///
    /// [`open_current`]: BatchQueue::open_current
    pub fn new(len: usize, viewport: Size, loader: SourceLoader) -> Self {
        Self {
            loader,
            len,
            index: 0,
            viewport,
            session: None,
            results: (0..len).map(|_| None).collect(),
        }
    }

    /// Convenience constructor over files on disk.
    pub fn from_paths(paths: Vec<PathBuf>, viewport: Size) -> Self {
        let len = paths.len();
        Self::new(
            len,
            viewport,
            Box::new(move |i| crate::io::load_path(&paths[i])),
        )
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession> {
        self.session.as_mut()
    }

    /// Load and open the image at the current index. A load failure leaves
    /// no session open; the caller may still navigate onwards (per-item
    /// failure, not batch failure).
    pub fn open_current(&mut self) -> Result<&mut EditorSession, EditorError> {
        self.session = None;
        let source = (self.loader)(self.index)?;
        let session = EditorSession::open(source, self.viewport)?;
        log_info!("batch: opened image {}/{}", self.index + 1, self.len);
        Ok(self.session.insert(session))
    }

    /// Move to the next image, discarding the current session's in-memory
    /// state. Returns `Ok(false)` at the end of the queue.
    pub fn next(&mut self) -> Result<bool, EditorError> {
        if self.index + 1 >= self.len {
            return Ok(false);
        }
        self.session = None;
        self.index += 1;
        self.open_current()?;
        Ok(true)
    }

    /// Move to the previous image, discarding the current session's
    /// in-memory state. Returns `Ok(false)` at the start of the queue.
    pub fn prev(&mut self) -> Result<bool, EditorError> {
        if self.index == 0 {
            return Ok(false);
        }
        self.session = None;
        self.index -= 1;
        self.open_current()?;
        Ok(true)
    }

    /// Export the open session's composite and retain it for this index.
    /// Overwrites any earlier save of the same image.
    pub fn save_current(
        &mut self,
        format: ExportFormat,
        quality: u8,
    ) -> Result<&ExportResult, EditorError> {
        let index = self.index;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| EditorError::Encode("no image is open".into()))?;
        let result = session.export(format, quality, index)?;
        Ok(self.results[index].insert(result))
    }

    /// Finished exports in batch order (`None` for images never saved),
    /// consuming the queue's stash.
    pub fn take_results(&mut self) -> Vec<Option<ExportResult>> {
        std::mem::replace(&mut self.results, (0..self.len).map(|_| None).collect())
    }
}
