//! Turning annotations into the ordered list of points to review.

use std::collections::VecDeque;

use crate::geometry::{self, ImageInfo, Point};
use crate::naming;
use crate::store::{Annotation, AnnotationId, AnnotationKind, AnnotationStore};

/// The annotations a point of interest was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Lines(AnnotationId, AnnotationId),
    Rect(AnnotationId),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Review {
    #[default]
    Undecided,
    Keep,
    Discard,
}

impl Review {
    pub fn from_keep(keep: bool) -> Self {
        if keep {
            Review::Keep
        } else {
            Review::Discard
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointOfInterest {
    pub location: Point,
    pub origin: Origin,
    /// Frozen at derivation; renaming an annotation afterwards does not change it.
    pub name: String,
    pub review: Review,
    /// Crop side length chosen during review.
    pub size: Option<i32>,
    /// Long-axis length of the source rect, for rect-derived points.
    pub extent: Option<u32>,
}

impl PointOfInterest {
    fn new(location: Point, origin: Origin, name: String) -> Self {
        Self {
            location,
            origin,
            name,
            review: Review::Undecided,
            size: None,
            extent: None,
        }
    }
}

/// Current name for a point derived from `origin`, read from the live store.
/// `None` if any of the source annotations has since been removed.
pub fn point_name(store: &AnnotationStore, origin: Origin) -> Option<String> {
    match origin {
        Origin::Lines(a, b) => {
            let a = store.get(AnnotationKind::Line, a)?;
            let b = store.get(AnnotationKind::Line, b)?;
            Some(naming::intersection_name(&[a.name.as_str(), b.name.as_str()]))
        }
        Origin::Rect(id) => {
            let rect = store.get(AnnotationKind::Rect, id)?;
            Some(naming::rect_point_name(&rect.display_name()))
        }
    }
}

/// Extend the segment `start -> finish` one unit step at a time in both
/// directions and return the last in-bounds point on each side.
///
/// Raw points are clamped into the image first. Returns `None` for a
/// zero-length segment, which has no direction to extend along.
pub fn extend_to_edges(start: Point, finish: Point, image: ImageInfo) -> Option<(Point, Point)> {
    let start = image.clamp(start);
    let finish = image.clamp(finish);
    let dx = (finish.x - start.x) as f64;
    let dy = (finish.y - start.y) as f64;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return None;
    }
    let (ux, uy) = (dx / len, dy / len);

    let walk = |sign: f64| {
        let mut last = finish;
        let mut step = 1.0;
        loop {
            let p = Point::round(
                finish.x as f64 + ux * step * sign,
                finish.y as f64 + uy * step * sign,
            );
            if !image.contains(p) {
                return last;
            }
            last = p;
            step += 1.0;
        }
    };

    Some((walk(-1.0), walk(1.0)))
}

/// Finished lines in natural name order, oldest first among equal names.
fn sorted_lines(store: &AnnotationStore) -> Vec<&Annotation> {
    let mut lines: Vec<&Annotation> = store.lines().filter(|l| l.finished).collect();
    lines.sort_by(|a, b| {
        naming::natural_cmp(&a.name, &b.name)
            .then(a.created.cmp(&b.created))
            .then(a.id.cmp(&b.id))
    });
    lines
}

fn sorted_rects(store: &AnnotationStore) -> Vec<&Annotation> {
    let mut rects: Vec<&Annotation> = store.rects().filter(|r| r.finished).collect();
    rects.sort_by_key(|r| (r.created, r.id));
    rects
}

/// Derive every point of interest from the current annotations.
///
/// Line intersections come first: the name-sorted lines are popped from the
/// front one at a time and tested against every line still queued, keeping
/// crossings strictly inside the image. Rect centroids follow in creation
/// order. Every point starts undecided with no size.
pub fn derive_points(store: &AnnotationStore, image: ImageInfo) -> Vec<PointOfInterest> {
    let mut points = Vec::new();

    let mut queue: VecDeque<&Annotation> = sorted_lines(store).into();
    while let Some(line) = queue.pop_front() {
        let Some((a1, a2)) = line.endpoints() else {
            continue;
        };
        for other in &queue {
            let Some((b1, b2)) = other.endpoints() else {
                continue;
            };
            let Some((x, y)) = geometry::line_intersection(a1, a2, b1, b2) else {
                continue;
            };
            if !image.contains_strictly(x, y) {
                log::trace!("lines {} and {} cross outside the image", line.id, other.id);
                continue;
            }
            let name = naming::intersection_name(&[line.name.as_str(), other.name.as_str()]);
            points.push(PointOfInterest::new(
                Point::round(x, y),
                Origin::Lines(line.id, other.id),
                name,
            ));
        }
    }
    let intersections = points.len();

    for rect in sorted_rects(store) {
        let Some((p1, p2)) = rect.endpoints() else {
            continue;
        };
        let (centroid, size) = geometry::rect_centroid_and_size(image.clamp(p1), image.clamp(p2));
        let mut point = PointOfInterest::new(
            centroid,
            Origin::Rect(rect.id),
            naming::rect_point_name(&rect.display_name()),
        );
        point.extent = Some(size);
        points.push(point);
    }

    log::trace!(
        "derived {} points of interest ({} intersections, {} rects)",
        points.len(),
        intersections,
        points.len() - intersections
    );
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: u32, h: u32) -> ImageInfo {
        ImageInfo::new(w, h)
    }

    /// Draw a line spanning `a`-`b` and give it `name`.
    fn add_line(store: &mut AnnotationStore, img: ImageInfo, id: u64, a: Point, b: Point, name: &str) {
        let id = AnnotationId(id);
        store.create_line(id, a).unwrap();
        store.set_line_second_point(id, b).unwrap();
        store.finish_line(id, img).unwrap();
        store.rename(AnnotationKind::Line, id, name).unwrap();
    }

    fn add_rect(store: &mut AnnotationStore, id: u64, a: Point, b: Point) {
        let id = AnnotationId(id);
        store.create_rect(id, a).unwrap();
        store.set_rect_second_point(id, b).unwrap();
        store.finish_rect(id).unwrap();
    }

    fn grid() -> AnnotationStore {
        let img = image(100, 100);
        let mut store = AnnotationStore::new();
        add_line(&mut store, img, 1, Point::new(0, 30), Point::new(100, 30), "2");
        add_line(&mut store, img, 2, Point::new(30, 0), Point::new(30, 100), "A");
        add_line(&mut store, img, 3, Point::new(0, 60), Point::new(100, 60), "10");
        add_line(&mut store, img, 4, Point::new(70, 0), Point::new(70, 100), "B");
        store
    }

    #[test]
    fn intersections_follow_natural_name_order() {
        let points = derive_points(&grid(), image(100, 100));
        let names: Vec<&str> = points.iter().map(|p| p.name.as_str()).collect();
        // Queue order: 2, 10, A, B. Parallel pairs are skipped.
        assert_eq!(names, ["A2", "B2", "A10", "B10"]);
        assert_eq!(points[0].location, Point::new(30, 30));
        assert_eq!(points[0].origin, Origin::Lines(AnnotationId(1), AnnotationId(2)));
        assert_eq!(points[3].location, Point::new(70, 60));
        assert!(points.iter().all(|p| p.review == Review::Undecided && p.size.is_none()));
    }

    #[test]
    fn derivation_is_deterministic() {
        let store = grid();
        let first = derive_points(&store, image(100, 100));
        for _ in 0..5 {
            assert_eq!(derive_points(&store, image(100, 100)), first);
        }
    }

    #[test]
    fn crossings_on_the_border_are_rejected() {
        let img = image(10, 10);
        for (a, b, c, d) in [
            // x = 0
            (Point::new(0, 0), Point::new(0, 10), Point::new(0, 5), Point::new(10, 5)),
            // x = width
            (Point::new(10, 0), Point::new(10, 10), Point::new(0, 5), Point::new(10, 5)),
            // y = 0
            (Point::new(0, 0), Point::new(10, 0), Point::new(5, 0), Point::new(5, 10)),
            // y = height
            (Point::new(0, 10), Point::new(10, 10), Point::new(5, 0), Point::new(5, 10)),
        ] {
            let mut store = AnnotationStore::new();
            add_line(&mut store, img, 1, a, b, "A");
            add_line(&mut store, img, 2, c, d, "1");
            assert!(derive_points(&store, img).is_empty());
        }

        let mut store = AnnotationStore::new();
        add_line(&mut store, img, 1, Point::new(1, 0), Point::new(1, 10), "A");
        add_line(&mut store, img, 2, Point::new(0, 1), Point::new(10, 1), "1");
        let points = derive_points(&store, img);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].location, Point::new(1, 1));
    }

    #[test]
    fn rects_follow_intersections_in_creation_order() {
        let mut store = grid();
        add_rect(&mut store, 20, Point::new(50, 50), Point::new(10, 10));
        add_rect(&mut store, 10, Point::new(10, 10), Point::new(50, 30));
        store.rename(AnnotationKind::Rect, AnnotationId(10), "door").unwrap();

        let points = derive_points(&store, image(100, 100));
        assert_eq!(points.len(), 6);
        assert_eq!(points[4].origin, Origin::Rect(AnnotationId(20)));
        assert_eq!(points[4].name, "rect-20");
        assert_eq!(points[4].location, Point::new(30, 30));
        assert_eq!(points[4].extent, Some(40));
        assert_eq!(points[5].name, "rect-door");
        assert_eq!(points[5].location, Point::new(30, 20));
    }

    #[test]
    fn rect_corners_outside_the_image_are_clamped() {
        let mut store = AnnotationStore::new();
        add_rect(&mut store, 1, Point::new(-60, -60), Point::new(10, 10));
        add_rect(&mut store, 2, Point::new(90, 80), Point::new(150, 120));

        let img = image(100, 100);
        let points = derive_points(&store, img);
        assert_eq!(points[0].location, Point::new(5, 5));
        assert_eq!(points[0].extent, Some(10));
        assert_eq!(points[1].location, Point::new(95, 90));
        assert!(points.iter().all(|p| img.contains(p.location)));
    }

    #[test]
    fn unfinished_annotations_are_ignored() {
        let mut store = grid();
        store.create_line(AnnotationId(50), Point::new(5, 5)).unwrap();
        store.create_rect(AnnotationId(51), Point::new(5, 5)).unwrap();
        assert_eq!(derive_points(&store, image(100, 100)).len(), 4);
    }

    #[test]
    fn names_are_frozen_but_live_names_can_be_reread() {
        let mut store = grid();
        let points = derive_points(&store, image(100, 100));
        store.rename(AnnotationKind::Line, AnnotationId(2), "C").unwrap();
        assert_eq!(points[0].name, "A2");
        assert_eq!(point_name(&store, points[0].origin).as_deref(), Some("C2"));
        store.remove(AnnotationKind::Line, AnnotationId(2));
        assert_eq!(point_name(&store, points[0].origin), None);
    }

    #[test]
    fn short_drag_is_extended_to_the_image_edge() {
        let img = image(100, 100);
        let (start, end) = extend_to_edges(Point::new(40, 50), Point::new(60, 52), img).unwrap();
        assert_eq!(end.x, 100);
        assert_eq!(start.x, 0);
        for p in [start, end] {
            assert!(img.contains(p));
            let near_edge = p.x <= 1 || p.y <= 1 || p.x >= 99 || p.y >= 99;
            assert!(near_edge, "{p:?} is not at the edge");
        }
    }

    #[test]
    fn steep_drag_reaches_top_and_bottom() {
        let (start, end) =
            extend_to_edges(Point::new(20, 45), Point::new(22, 55), image(100, 100)).unwrap();
        assert_eq!(start.y, 0);
        assert_eq!(end.y, 100);
    }

    #[test]
    fn zero_length_drag_is_not_extended() {
        assert!(extend_to_edges(Point::new(5, 5), Point::new(5, 5), image(10, 10)).is_none());
    }
}
