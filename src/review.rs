//! Stepping through derived points and recording keep/discard decisions.

use crate::derive::{PointOfInterest, Review};

/// Cursor over a non-empty, fixed list of points.
///
/// There is no terminal state: the operator can move back and forth and
/// revise decisions until they export.
#[derive(Clone, Debug)]
pub struct ReviewWalker {
    points: Vec<PointOfInterest>,
    cursor: usize,
    default_size: i32,
}

impl ReviewWalker {
    /// `None` when there is nothing to review.
    pub fn new(points: Vec<PointOfInterest>, default_size: i32) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(Self {
            points,
            cursor: 0,
            default_size,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[PointOfInterest] {
        &self.points
    }

    pub fn current(&self) -> &PointOfInterest {
        &self.points[self.cursor]
    }

    fn last_index(&self) -> usize {
        self.points.len() - 1
    }

    /// Size shown for the point at `index`: its own size, else the previous
    /// point's size, else the default. Does not store anything.
    pub fn displayed_size(&self, index: usize) -> i32 {
        self.points
            .get(index)
            .and_then(|p| p.size)
            .or_else(|| {
                index
                    .checked_sub(1)
                    .and_then(|prev| self.points.get(prev))
                    .and_then(|p| p.size)
            })
            .unwrap_or(self.default_size)
    }

    pub fn current_size(&self) -> i32 {
        self.displayed_size(self.cursor)
    }

    /// Record a decision for `index` together with the size currently shown
    /// for it, then move the cursor forward (staying put on the last point).
    pub fn decide(&mut self, index: usize, keep: bool) {
        if index >= self.points.len() {
            log::warn!("ignoring decision for point {index} of {}", self.points.len());
            return;
        }
        let size = self.displayed_size(index);
        let point = &mut self.points[index];
        point.review = Review::from_keep(keep);
        point.size = Some(size);
        log::debug!(
            "{} {:?} at size {size}",
            if keep { "keeping" } else { "discarding" },
            point.name
        );
        self.next();
    }

    /// Set the crop size for `index`. Any integer is accepted; clamping is
    /// the caller's business.
    pub fn change_size(&mut self, index: usize, size: i32) {
        match self.points.get_mut(index) {
            Some(point) => point.size = Some(size),
            None => log::warn!("ignoring size for point {index} of {}", self.points.len()),
        }
    }

    /// Shift the displayed size of the current point by `delta`.
    pub fn adjust_size(&mut self, delta: i32) {
        let size = self.current_size().saturating_add(delta);
        self.change_size(self.cursor, size);
    }

    pub fn previous(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn next(&mut self) {
        self.cursor = (self.cursor + 1).min(self.last_index());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::Origin;
    use crate::geometry::Point;
    use crate::store::AnnotationId;

    fn points(n: u64) -> Vec<PointOfInterest> {
        (0..n)
            .map(|i| PointOfInterest {
                location: Point::new(i as i32 * 10, 5),
                origin: Origin::Rect(AnnotationId(i)),
                name: format!("rect-{i}"),
                review: Review::Undecided,
                size: None,
                extent: None,
            })
            .collect()
    }

    #[test]
    fn empty_list_has_no_walker() {
        assert!(ReviewWalker::new(Vec::new(), 200).is_none());
    }

    #[test]
    fn navigation_is_clamped() {
        let mut walker = ReviewWalker::new(points(3), 200).unwrap();
        walker.previous();
        assert_eq!(walker.cursor(), 0);
        walker.next();
        walker.next();
        assert_eq!(walker.cursor(), 2);
        walker.next();
        assert_eq!(walker.cursor(), 2);
        walker.previous();
        assert_eq!(walker.cursor(), 1);
    }

    #[test]
    fn deciding_records_and_advances() {
        let mut walker = ReviewWalker::new(points(2), 200).unwrap();
        walker.decide(0, true);
        assert_eq!(walker.points()[0].review, Review::Keep);
        assert_eq!(walker.points()[0].size, Some(200));
        assert_eq!(walker.cursor(), 1);

        walker.decide(1, false);
        assert_eq!(walker.points()[1].review, Review::Discard);
        assert_eq!(walker.cursor(), 1);
    }

    #[test]
    fn displayed_size_falls_back_to_previous_then_default() {
        let mut walker = ReviewWalker::new(points(3), 200).unwrap();
        assert_eq!(walker.displayed_size(1), 200);
        walker.change_size(0, 320);
        assert_eq!(walker.cursor(), 0);
        assert_eq!(walker.displayed_size(1), 320);
        // Only the immediately preceding point counts.
        assert_eq!(walker.displayed_size(2), 200);
        // Reading does not store.
        assert_eq!(walker.points()[1].size, None);

        walker.decide(0, true);
        walker.decide(1, true);
        assert_eq!(walker.points()[1].size, Some(320));
        assert_eq!(walker.displayed_size(2), 320);
    }

    #[test]
    fn own_size_wins_and_any_integer_is_accepted() {
        let mut walker = ReviewWalker::new(points(2), 200).unwrap();
        walker.change_size(0, 50);
        walker.change_size(1, -7);
        assert_eq!(walker.displayed_size(1), -7);
    }

    #[test]
    fn adjust_size_starts_from_the_displayed_value() {
        let mut walker = ReviewWalker::new(points(2), 200).unwrap();
        walker.adjust_size(5);
        assert_eq!(walker.points()[0].size, Some(205));
        walker.next();
        walker.adjust_size(-5);
        assert_eq!(walker.points()[1].size, Some(200));
    }

    #[test]
    fn decisions_can_be_revised() {
        let mut walker = ReviewWalker::new(points(2), 200).unwrap();
        walker.decide(0, true);
        walker.previous();
        walker.decide(walker.cursor(), false);
        assert_eq!(walker.points()[0].review, Review::Discard);
    }
}
