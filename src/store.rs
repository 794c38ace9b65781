//! The set of lines and rectangles drawn over the image.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::derive::extend_to_edges;
use crate::error::{CropperError, Invariant, Result};
use crate::geometry::{ImageInfo, Point};
use crate::naming;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Line,
    Rect,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnnotationKind::Line => "line",
            AnnotationKind::Rect => "rect",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    /// Image-space points: one while the second is unset, two once drawn.
    pub points: Vec<Point>,
    #[serde(default)]
    pub name: String,
    /// Creation sequence number; larger is more recent.
    pub created: u64,
    #[serde(default)]
    pub finished: bool,
}

impl Annotation {
    fn new(id: AnnotationId, kind: AnnotationKind, start: Point, created: u64) -> Self {
        Self {
            id,
            kind,
            points: vec![start],
            name: String::new(),
            created,
            finished: false,
        }
    }

    /// Label shown to the operator: the name, or the id for unnamed annotations.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            self.name.clone()
        }
    }

    pub fn endpoints(&self) -> Option<(Point, Point)> {
        match self.points.as_slice() {
            [a, b] => Some((*a, *b)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnnotationStore {
    lines: HashMap<AnnotationId, Annotation>,
    rects: HashMap<AnnotationId, Annotation>,
    next_created: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously saved annotations.
    pub fn from_annotations(annotations: impl IntoIterator<Item = Annotation>) -> Self {
        let mut store = Self::new();
        for ann in annotations {
            store.next_created = store.next_created.max(ann.created + 1);
            store.map_mut(ann.kind).insert(ann.id, ann);
        }
        store
    }

    fn map(&self, kind: AnnotationKind) -> &HashMap<AnnotationId, Annotation> {
        match kind {
            AnnotationKind::Line => &self.lines,
            AnnotationKind::Rect => &self.rects,
        }
    }

    fn map_mut(&mut self, kind: AnnotationKind) -> &mut HashMap<AnnotationId, Annotation> {
        match kind {
            AnnotationKind::Line => &mut self.lines,
            AnnotationKind::Rect => &mut self.rects,
        }
    }

    fn create(&mut self, kind: AnnotationKind, id: AnnotationId, start: Point) -> Result<()> {
        if self.map(kind).contains_key(&id) {
            return Err(Invariant::DuplicateId { kind, id }.into());
        }
        let created = self.next_created;
        self.next_created += 1;
        self.map_mut(kind)
            .insert(id, Annotation::new(id, kind, start, created));
        log::debug!("created {kind} {id} at ({}, {})", start.x, start.y);
        Ok(())
    }

    pub fn create_line(&mut self, id: AnnotationId, start: Point) -> Result<()> {
        self.create(AnnotationKind::Line, id, start)
    }

    pub fn create_rect(&mut self, id: AnnotationId, start: Point) -> Result<()> {
        self.create(AnnotationKind::Rect, id, start)
    }

    fn drawing_mut(&mut self, kind: AnnotationKind, id: AnnotationId) -> Result<&mut Annotation> {
        match self.map_mut(kind).get_mut(&id) {
            Some(ann) if !ann.finished => Ok(ann),
            _ => Err(CropperError::NotFound { kind, id }),
        }
    }

    /// Replace the moving corner of an annotation that is still being drawn.
    fn set_second_point(&mut self, kind: AnnotationKind, id: AnnotationId, p: Point) -> Result<()> {
        let ann = self.drawing_mut(kind, id)?;
        ann.points.truncate(1);
        ann.points.push(p);
        Ok(())
    }

    pub fn set_line_second_point(&mut self, id: AnnotationId, p: Point) -> Result<()> {
        self.set_second_point(AnnotationKind::Line, id, p)
    }

    pub fn set_rect_second_point(&mut self, id: AnnotationId, p: Point) -> Result<()> {
        self.set_second_point(AnnotationKind::Rect, id, p)
    }

    /// Extend the line to the image edges, auto-name it and mark it finished.
    /// Returns the assigned name.
    pub fn finish_line(&mut self, id: AnnotationId, image: ImageInfo) -> Result<String> {
        let kind = AnnotationKind::Line;
        let ann = self.drawing_mut(kind, id)?;
        let (start, end) = ann.endpoints().ok_or(Invariant::MissingPoint {
            kind,
            id,
            count: ann.points.len(),
        })?;
        let (start, end) =
            extend_to_edges(start, end, image).ok_or(Invariant::ZeroLengthLine(id))?;

        let name = naming::auto_line_name(
            start,
            end,
            self.lines
                .values()
                .filter(|l| l.id != id)
                .map(|l| l.name.as_str()),
        );

        let ann = self.drawing_mut(kind, id)?;
        ann.points = vec![start, end];
        ann.name = name.clone();
        ann.finished = true;
        log::debug!(
            "finished line {id} as {name:?}: ({}, {}) -> ({}, {})",
            start.x,
            start.y,
            end.x,
            end.y
        );
        Ok(name)
    }

    pub fn finish_rect(&mut self, id: AnnotationId) -> Result<()> {
        let kind = AnnotationKind::Rect;
        let ann = self.drawing_mut(kind, id)?;
        if ann.points.len() != 2 {
            return Err(Invariant::MissingPoint {
                kind,
                id,
                count: ann.points.len(),
            }
            .into());
        }
        ann.finished = true;
        log::debug!("finished rect {id}");
        Ok(())
    }

    /// Duplicate names are allowed.
    pub fn rename(&mut self, kind: AnnotationKind, id: AnnotationId, name: impl Into<String>) -> Result<()> {
        let ann = self
            .map_mut(kind)
            .get_mut(&id)
            .ok_or(CropperError::NotFound { kind, id })?;
        ann.name = name.into();
        Ok(())
    }

    /// Idempotent: removing a missing id is a no-op.
    pub fn remove(&mut self, kind: AnnotationKind, id: AnnotationId) -> Option<Annotation> {
        let removed = self.map_mut(kind).remove(&id);
        if removed.is_some() {
            log::debug!("removed {kind} {id}");
        }
        removed
    }

    pub fn get(&self, kind: AnnotationKind, id: AnnotationId) -> Option<&Annotation> {
        self.map(kind).get(&id)
    }

    pub fn contains(&self, kind: AnnotationKind, id: AnnotationId) -> bool {
        self.map(kind).contains_key(&id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &Annotation> {
        self.lines.values()
    }

    pub fn rects(&self) -> impl Iterator<Item = &Annotation> {
        self.rects.values()
    }

    /// Every annotation of both kinds, oldest first.
    pub fn by_creation(&self) -> Vec<&Annotation> {
        let mut all: Vec<&Annotation> = self.lines.values().chain(self.rects.values()).collect();
        all.sort_by_key(|a| a.created);
        all
    }

    pub fn most_recent(&self) -> Option<&Annotation> {
        self.lines
            .values()
            .chain(self.rects.values())
            .max_by_key(|a| a.created)
    }

    pub fn len(&self) -> usize {
        self.lines.len() + self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
