//! The workflow state for one image: drawing annotations, then reviewing the
//! points derived from them.

use crate::derive::derive_points;
use crate::error::Result;
use crate::export::{crop_entries, CropEntry};
use crate::geometry::{ImageInfo, Point};
use crate::review::ReviewWalker;
use crate::store::{AnnotationId, AnnotationKind, AnnotationStore};

/// Operator commands, independent of how they are bound to keys or buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ArmDrawLine,
    ArmDrawRect,
    CancelActive,
    DeleteLastAnnotation,
    Proceed,
    BackToDraw,
    DecideKeep,
    DecideDiscard,
    ReviewPrev,
    ReviewNext,
    AdjustSize(i32),
}

#[derive(Clone, Debug)]
pub enum Phase {
    Draw,
    Review(ReviewWalker),
    /// Proceeding produced no points; the only way on is back to drawing.
    EmptyReview,
}

#[derive(Debug)]
pub struct Session {
    image: ImageInfo,
    store: AnnotationStore,
    phase: Phase,
    armed: Option<AnnotationKind>,
    drawing: Option<(AnnotationKind, AnnotationId)>,
    selected: Option<(AnnotationKind, AnnotationId)>,
    next_id: u64,
    default_size: i32,
    dirty: bool,
}

/// `NotFound` means the target went away (e.g. cancelled mid-draw); treat
/// the operation as a no-op. Everything else is a real failure.
fn recover(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            log::debug!("{e}, ignoring");
            Ok(())
        }
        other => other,
    }
}

impl Session {
    /// Start drawing over `store`, which may hold previously saved annotations.
    pub fn with_store(image: ImageInfo, store: AnnotationStore, default_size: i32) -> Self {
        if !store.is_empty() {
            log::debug!("resuming with {} annotation(s)", store.len());
        }
        let next_id = store.by_creation().iter().map(|a| a.id.0 + 1).max().unwrap_or(1);
        Self {
            image,
            store,
            phase: Phase::Draw,
            armed: None,
            drawing: None,
            selected: None,
            next_id,
            default_size,
            dirty: false,
        }
    }

    pub fn image(&self) -> ImageInfo {
        self.image
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn walker(&self) -> Option<&ReviewWalker> {
        match &self.phase {
            Phase::Review(walker) => Some(walker),
            _ => None,
        }
    }

    pub fn walker_mut(&mut self) -> Option<&mut ReviewWalker> {
        match &mut self.phase {
            Phase::Review(walker) => Some(walker),
            _ => None,
        }
    }

    pub fn is_drawing_phase(&self) -> bool {
        matches!(self.phase, Phase::Draw)
    }

    pub fn armed(&self) -> Option<AnnotationKind> {
        self.armed
    }

    pub fn drawing(&self) -> Option<(AnnotationKind, AnnotationId)> {
        self.drawing
    }

    pub fn selected(&self) -> Option<(AnnotationKind, AnnotationId)> {
        self.selected
    }

    /// True once per batch of annotation changes; used to trigger saving.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn allocate_id(&mut self) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        id
    }

    fn move_corner(&mut self, kind: AnnotationKind, id: AnnotationId, p: Point) -> Result<()> {
        match kind {
            AnnotationKind::Line => self.store.set_line_second_point(id, p),
            AnnotationKind::Rect => self.store.set_rect_second_point(id, p),
        }
    }

    pub fn arm(&mut self, kind: AnnotationKind) {
        if !self.is_drawing_phase() || self.drawing.is_some() {
            return;
        }
        self.armed = Some(kind);
        self.selected = None;
    }

    /// Pointer moved to `p` (image space). Updates the shape being drawn.
    /// Points outside the image are clamped to its border.
    pub fn pointer_moved(&mut self, p: Point) -> Result<()> {
        let Some((kind, id)) = self.drawing else {
            return Ok(());
        };
        let p = self.image.clamp(p);
        recover(self.move_corner(kind, id, p))
    }

    /// Primary click at `p` (image space): starts a shape when armed,
    /// finishes the shape being drawn otherwise.
    pub fn pointer_clicked(&mut self, p: Point) -> Result<()> {
        if !self.is_drawing_phase() {
            return Ok(());
        }
        let p = self.image.clamp(p);
        if self.drawing.is_some() {
            return self.finish_active(p);
        }
        let Some(kind) = self.armed.take() else {
            return Ok(());
        };
        let id = self.allocate_id();
        match kind {
            AnnotationKind::Line => self.store.create_line(id, p)?,
            AnnotationKind::Rect => self.store.create_rect(id, p)?,
        }
        self.drawing = Some((kind, id));
        self.dirty = true;
        Ok(())
    }

    fn finish_active(&mut self, p: Point) -> Result<()> {
        let Some((kind, id)) = self.drawing.take() else {
            return Ok(());
        };
        recover(self.move_corner(kind, id, p))?;
        if !self.store.contains(kind, id) {
            return Ok(());
        }
        self.dirty = true;
        match kind {
            AnnotationKind::Line => {
                let degenerate = self
                    .store
                    .get(kind, id)
                    .and_then(|l| l.endpoints())
                    .is_some_and(|(a, b)| self.image.clamp(a) == self.image.clamp(b));
                if degenerate {
                    log::warn!("discarding zero-length line {id}");
                    self.store.remove(kind, id);
                    return Ok(());
                }
                let name = self.store.finish_line(id, self.image)?;
                log::info!("new line {name}");
            }
            AnnotationKind::Rect => self.store.finish_rect(id)?,
        }
        self.selected = Some((kind, id));
        Ok(())
    }

    /// Drop the shape being drawn (if any), disarm, and close the editor.
    pub fn cancel_active(&mut self) {
        if let Some((kind, id)) = self.drawing.take() {
            self.store.remove(kind, id);
            self.dirty = true;
        }
        self.armed = None;
        self.selected = None;
    }

    pub fn delete_last_annotation(&mut self) {
        let Some(last) = self.store.most_recent() else {
            return;
        };
        let target = (last.kind, last.id);
        self.remove(target.0, target.1);
    }

    pub fn remove(&mut self, kind: AnnotationKind, id: AnnotationId) {
        if self.store.remove(kind, id).is_none() {
            return;
        }
        self.dirty = true;
        if self.drawing == Some((kind, id)) {
            self.drawing = None;
        }
        if self.selected == Some((kind, id)) {
            self.selected = None;
        }
    }

    pub fn rename(&mut self, kind: AnnotationKind, id: AnnotationId, name: &str) -> Result<()> {
        let result = self.store.rename(kind, id, name);
        if result.is_ok() {
            self.dirty = true;
        }
        recover(result)
    }

    pub fn select(&mut self, kind: AnnotationKind, id: AnnotationId) {
        if self.store.contains(kind, id) {
            self.selected = Some((kind, id));
        }
    }

    pub fn close_selection(&mut self) {
        self.selected = None;
    }

    /// Derive points from the current annotations and start reviewing them.
    pub fn proceed(&mut self) {
        if !self.is_drawing_phase() {
            return;
        }
        self.cancel_active();
        let points = derive_points(&self.store, self.image);
        self.phase = match ReviewWalker::new(points, self.default_size) {
            Some(walker) => Phase::Review(walker),
            None => {
                log::info!("nothing to review");
                Phase::EmptyReview
            }
        };
    }

    /// Return to drawing. Review decisions are discarded.
    pub fn back_to_draw(&mut self) {
        self.phase = Phase::Draw;
    }

    pub fn apply(&mut self, command: Command) {
        log::trace!("command {command:?}");
        match command {
            Command::ArmDrawLine => self.arm(AnnotationKind::Line),
            Command::ArmDrawRect => self.arm(AnnotationKind::Rect),
            Command::CancelActive => self.cancel_active(),
            Command::DeleteLastAnnotation => {
                if self.is_drawing_phase() {
                    self.delete_last_annotation();
                }
            }
            Command::Proceed => self.proceed(),
            Command::BackToDraw => self.back_to_draw(),
            Command::DecideKeep | Command::DecideDiscard => {
                if let Some(walker) = self.walker_mut() {
                    walker.decide(walker.cursor(), command == Command::DecideKeep);
                }
            }
            Command::ReviewPrev => {
                if let Some(walker) = self.walker_mut() {
                    walker.previous();
                }
            }
            Command::ReviewNext => {
                if let Some(walker) = self.walker_mut() {
                    walker.next();
                }
            }
            Command::AdjustSize(delta) => {
                if let Some(walker) = self.walker_mut() {
                    walker.adjust_size(delta);
                }
            }
        }
    }

    /// Crops for every kept point, in review order. Empty outside review.
    pub fn export_entries(&self) -> Vec<CropEntry> {
        self.walker()
            .map(|walker| crop_entries(walker.points(), self.default_size))
            .unwrap_or_default()
    }
}
