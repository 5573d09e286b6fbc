// ============================================================================
// EDITOR SESSION — one open edit of one image
// ============================================================================
//
// The session owns everything a single edit needs: the working source, its
// effect buffers, the history stack, the display mapping, and the active
// tool/brush settings. Construction and teardown are explicit — a session
// is created from decoded pixels and simply dropped when the edit closes;
// nothing is persisted, only exported rasters leave it.

use image::{RgbaImage, imageops};

use crate::compositor;
use crate::effects::EffectBuffers;
use crate::error::EditorError;
use crate::geometry::{Point, Rect, Size, ViewMapping, fit_display_size};
use crate::history::{History, HistoryEntry};
use crate::io::{self, ExportFormat, ExportResult};
use crate::pointer::PointerEvent;
use crate::stroke::{Stroke, StrokeRecorder, Tool};
use crate::{log_info, log_warn};

pub const DEFAULT_BRUSH_RADIUS: f32 = 16.0;

pub struct EditorSession {
    /// Current working source. Replaced wholesale by a crop commit.
    source: RgbaImage,
    buffers: EffectBuffers,
    history: History,
    viewport: Size,
    display: Size,
    tool: Tool,
    brush_radius: f32,
    recorder: StrokeRecorder,
    /// Press position of an in-progress crop drag.
    crop_anchor: Option<Point>,
    /// Selected crop rectangle (display space) awaiting commit.
    pending_crop: Option<Rect>,
}

impl EditorSession {
    /// Open an editor session over decoded pixels. The display box is fitted
    /// to `viewport` and both effect buffers are generated up front, so every
    /// stroke renders against ready buffers.
    pub fn open(source: RgbaImage, viewport: Size) -> Result<Self, EditorError> {
        let (w, h) = source.dimensions();
        if w == 0 || h == 0 {
            return Err(EditorError::Load {
                path: None,
                reason: format!("image has degenerate dimensions {}x{}", w, h),
            });
        }

        let display = fit_display_size(w, h, viewport);
        let buffers = EffectBuffers::generate(&source);
        log_info!(
            "session opened: {}x{} image, {:.0}x{:.0} display",
            w, h, display.width, display.height
        );

        Ok(Self {
            source,
            buffers,
            history: History::new(),
            viewport,
            display,
            tool: Tool::Select,
            brush_radius: DEFAULT_BRUSH_RADIUS,
            recorder: StrokeRecorder::new(),
            crop_anchor: None,
            pending_crop: None,
        })
    }

    /// Open from an image file on disk. Fails fast without creating a session.
    pub fn open_path(path: &std::path::Path, viewport: Size) -> Result<Self, EditorError> {
        Self::open(io::load_path(path)?, viewport)
    }

    /// Open from an in-memory encoded blob.
    pub fn open_bytes(bytes: &[u8], viewport: Size) -> Result<Self, EditorError> {
        Self::open(io::load_bytes(bytes)?, viewport)
    }

    // -- Accessors -------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.source.width()
    }

    pub fn height(&self) -> u32 {
        self.source.height()
    }

    pub fn display_size(&self) -> Size {
        self.display
    }

    pub fn mapping(&self) -> ViewMapping {
        ViewMapping::new(self.display, self.source.width(), self.source.height())
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. Abandons any stroke or crop drag in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            self.recorder.end();
            self.crop_anchor = None;
            if tool != Tool::Crop {
                self.pending_crop = None;
            }
            self.tool = tool;
        }
    }

    pub fn brush_radius(&self) -> f32 {
        self.brush_radius
    }

    /// Adjust the brush for subsequent strokes; a stroke in progress keeps
    /// the radius it started with.
    pub fn set_brush_radius(&mut self, radius: f32) {
        self.brush_radius = radius.max(0.5);
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn pending_crop(&self) -> Option<Rect> {
        self.pending_crop
    }

    pub fn effect_buffers(&self) -> &EffectBuffers {
        &self.buffers
    }

    // -- Pointer routing -------------------------------------------------

    /// Feed a raw pointer event (display space). Routes to the stroke
    /// recorder for effect tools, to the crop selection for the crop tool,
    /// and is ignored for the select tool.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match self.tool {
            Tool::Select => {}
            Tool::Crop => match event {
                PointerEvent::Down(p) => {
                    self.crop_anchor = Some(p);
                    self.pending_crop = None;
                }
                PointerEvent::Move(p) => {
                    if let Some(anchor) = self.crop_anchor {
                        self.pending_crop = Some(Rect::from_corners(anchor, p));
                    }
                }
                PointerEvent::Up(p) => {
                    if let Some(anchor) = self.crop_anchor.take() {
                        self.pending_crop = Some(Rect::from_corners(anchor, p));
                    }
                }
            },
            Tool::Pixelate | Tool::Blur | Tool::Erase => match event {
                PointerEvent::Down(p) => {
                    self.begin_stroke(p);
                }
                PointerEvent::Move(p) => self.extend_stroke(p),
                PointerEvent::Up(p) => {
                    self.extend_stroke(p);
                    self.end_stroke();
                }
            },
        }
    }

    // -- Stroke recording ------------------------------------------------

    /// Start a stroke at `point` with the active tool and brush. Returns
    /// `false` (nothing recorded) for non-drawing tools and for effects
    /// whose buffer failed to generate.
    pub fn begin_stroke(&mut self, point: Point) -> bool {
        let Some(effect) = self.tool.effect() else {
            return false;
        };
        if !self.buffers.available(effect) {
            log_warn!("{:?} buffer unavailable, stroke rejected", effect);
            return false;
        }
        self.recorder.begin(self.tool, self.brush_radius, self.display);
        self.recorder.extend(point);
        true
    }

    pub fn extend_stroke(&mut self, point: Point) {
        self.recorder.extend(point);
    }

    /// Finalize the stroke in progress and commit it to history. Empty
    /// strokes are discarded without touching the stack.
    pub fn end_stroke(&mut self) -> bool {
        match self.recorder.end() {
            Some(stroke) => {
                self.history.push(HistoryEntry::Stroke(stroke));
                true
            }
            None => false,
        }
    }

    // -- Crop ------------------------------------------------------------

    /// Stage a crop rectangle (display space) for commit.
    pub fn select_crop_region(&mut self, rect: Rect) {
        self.pending_crop = Some(rect);
    }

    /// Commit the pending crop: the current composite — not the pristine
    /// source — is cropped to the region and becomes the new working source.
    /// Effect buffers are regenerated and the display box refitted.
    /// Degenerate regions are silently ignored (no history entry).
    pub fn commit_crop(&mut self) -> bool {
        let Some(rect) = self.pending_crop.take() else {
            return false;
        };
        let region = self.mapping().crop_rect(rect);
        if region.is_degenerate() {
            log_info!("degenerate crop region ignored");
            return false;
        }

        let flat = self.composite();
        let cropped =
            imageops::crop_imm(&flat, region.x, region.y, region.width, region.height).to_image();

        let prior_source = std::mem::replace(&mut self.source, cropped);
        self.history.push(HistoryEntry::CropCommit {
            region,
            prior_source,
        });
        self.refresh_derived_state();
        log_info!(
            "crop committed: {}x{} at ({}, {})",
            region.width, region.height, region.x, region.y
        );
        true
    }

    // -- History ---------------------------------------------------------

    /// Undo the most recent operation. Undoing a crop restores the pre-crop
    /// source (and regenerates its effect buffers); the strokes sealed by
    /// that crop become live again. No-op on empty history.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            None => false,
            Some(HistoryEntry::Stroke(_)) => true,
            Some(HistoryEntry::CropCommit { prior_source, .. }) => {
                self.source = prior_source;
                self.refresh_derived_state();
                true
            }
        }
    }

    /// The working source changed: regenerate effect buffers and refit the
    /// display box. Stale buffers are never reused.
    fn refresh_derived_state(&mut self) {
        self.buffers = EffectBuffers::generate(&self.source);
        self.display = fit_display_size(self.source.width(), self.source.height(), self.viewport);
    }

    // -- Rendering / export ----------------------------------------------

    /// Flatten the current visible state: working source plus every live
    /// stroke, replayed in order.
    pub fn composite(&self) -> RgbaImage {
        compositor::composite(&self.source, &self.buffers, self.history.live_strokes())
    }

    /// Flatten and encode the current composite. `original_index` is the
    /// image's position in the batch it belongs to (0 for single edits).
    pub fn export(
        &self,
        format: ExportFormat,
        quality: u8,
        original_index: usize,
    ) -> Result<ExportResult, EditorError> {
        io::export(&self.composite(), format, quality, original_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pt;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    /// Viewport whose 80%/65% fit box is at least the image size, so the
    /// display maps 1:1 onto image pixels.
    fn viewport_for(w: u32, h: u32) -> Size {
        Size::new(w as f32 / 0.8 + 1.0, h as f32 / 0.65 + 1.0)
    }

    fn session(w: u32, h: u32) -> EditorSession {
        EditorSession::open(gradient(w, h), viewport_for(w, h)).unwrap()
    }

    fn drag(session: &mut EditorSession, from: Point, to: Point) {
        session.handle_pointer(PointerEvent::Down(from));
        session.handle_pointer(PointerEvent::Move(pt(
            (from.x + to.x) / 2.0,
            (from.y + to.y) / 2.0,
        )));
        session.handle_pointer(PointerEvent::Up(to));
    }

    #[test]
    fn zero_size_image_does_not_open() {
        let err = EditorSession::open(RgbaImage::new(0, 0), Size::new(1000.0, 1000.0));
        assert!(matches!(err, Err(EditorError::Load { .. })));
    }

    #[test]
    fn display_maps_one_to_one_under_test_viewport() {
        let s = session(200, 100);
        assert_eq!(s.display_size(), Size::new(200.0, 100.0));
    }

    #[test]
    fn effect_drag_pushes_one_history_entry() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Blur);
        drag(&mut s, pt(20.0, 20.0), pt(60.0, 60.0));
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn select_tool_never_draws() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Select);
        drag(&mut s, pt(20.0, 20.0), pt(60.0, 60.0));
        assert_eq!(s.history_len(), 0);
        assert_eq!(s.composite(), gradient(100, 100));
    }

    #[test]
    fn undo_restores_previous_composites() {
        let mut s = session(100, 100);
        let clean = s.composite();

        s.set_tool(Tool::Pixelate);
        drag(&mut s, pt(10.0, 10.0), pt(40.0, 40.0));
        let after_one = s.composite();

        s.set_tool(Tool::Blur);
        drag(&mut s, pt(50.0, 50.0), pt(80.0, 80.0));
        assert_eq!(s.history_len(), 2);

        assert!(s.undo());
        assert_eq!(s.composite().as_raw(), after_one.as_raw());
        assert!(s.undo());
        assert_eq!(s.composite().as_raw(), clean.as_raw());
        assert!(!s.undo(), "undo below empty history must be a no-op");
    }

    #[test]
    fn brush_radius_is_fixed_per_stroke() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Blur);
        s.set_brush_radius(4.0);
        s.handle_pointer(PointerEvent::Down(pt(50.0, 50.0)));
        s.set_brush_radius(30.0); // applies to the next stroke only
        s.handle_pointer(PointerEvent::Up(pt(50.0, 50.0)));

        let reference = {
            let mut r = session(100, 100);
            r.set_tool(Tool::Blur);
            r.set_brush_radius(4.0);
            drag(&mut r, pt(50.0, 50.0), pt(50.0, 50.0));
            r.composite()
        };
        assert_eq!(s.composite().as_raw(), reference.as_raw());
    }

    #[test]
    fn crop_drag_stages_a_pending_region() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Crop);
        drag(&mut s, pt(10.0, 20.0), pt(60.0, 80.0));
        assert_eq!(s.pending_crop(), Some(Rect::new(10.0, 20.0, 50.0, 60.0)));
        assert_eq!(s.history_len(), 0, "crop commits only via commit_crop");
    }

    #[test]
    fn commit_crop_resizes_and_undo_restores() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Pixelate);
        drag(&mut s, pt(10.0, 10.0), pt(30.0, 30.0));
        let pre_crop = s.composite();

        s.set_tool(Tool::Crop);
        s.select_crop_region(Rect::new(0.0, 0.0, 40.0, 30.0));
        assert!(s.commit_crop());
        assert_eq!((s.width(), s.height()), (40, 30));
        // The crop keeps the flattened composite, effects included.
        assert_eq!(
            s.composite().as_raw(),
            imageops::crop_imm(&pre_crop, 0, 0, 40, 30).to_image().as_raw()
        );

        assert!(s.undo());
        assert_eq!((s.width(), s.height()), (100, 100));
        assert_eq!(s.composite().as_raw(), pre_crop.as_raw());
    }

    #[test]
    fn degenerate_crop_is_silently_ignored() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Crop);
        s.select_crop_region(Rect::new(10.0, 10.0, 0.0, 50.0));
        assert!(!s.commit_crop());
        assert_eq!((s.width(), s.height()), (100, 100));
        assert_eq!(s.history_len(), 0);
    }

    #[test]
    fn export_round_trips_the_composite() {
        let mut s = session(64, 48);
        s.set_tool(Tool::Pixelate);
        drag(&mut s, pt(10.0, 10.0), pt(40.0, 30.0));

        let result = s.export(ExportFormat::Png, 90, 0).unwrap();
        let decoded = crate::io::load_bytes(&result.bytes).unwrap();
        assert_eq!(decoded.as_raw(), s.composite().as_raw());
    }

    #[test]
    fn switching_tools_abandons_a_stroke_in_progress() {
        let mut s = session(100, 100);
        s.set_tool(Tool::Blur);
        s.handle_pointer(PointerEvent::Down(pt(50.0, 50.0)));
        s.set_tool(Tool::Select);
        s.handle_pointer(PointerEvent::Up(pt(60.0, 60.0)));
        assert_eq!(s.history_len(), 0);
    }
}
