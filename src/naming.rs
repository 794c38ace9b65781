//! Deterministic labels for annotations and the points derived from them.
//!
//! Steep lines (|slope| > 1) get letters, shallow lines get numbers, so a
//! grid drawn as columns and rows yields point names like `C7`.

use std::cmp::Ordering;

use crate::geometry::Point;

/// Prefix for points derived from a rectangle.
pub const RECT_PREFIX: &str = "rect-";

pub fn is_letter_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())
}

pub fn is_number_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

/// Position of a letter name in the sequence A, B, .., Z, AA, AB, ..
/// (1-based, case-insensitive).
fn letter_ordinal(name: &str) -> Option<u64> {
    if !is_letter_name(name) {
        return None;
    }
    name.chars().try_fold(0u64, |acc, c| {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u64 + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

fn letter_name(mut ordinal: u64) -> String {
    let mut out = Vec::new();
    while ordinal > 0 {
        ordinal -= 1;
        out.push(b'A' + (ordinal % 26) as u8);
        ordinal /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// One past the highest letter name in `existing`; gaps are not filled.
pub fn next_letter_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing.into_iter().filter_map(letter_ordinal).max().unwrap_or(0);
    letter_name(highest.saturating_add(1))
}

/// One past the highest number name in `existing`; gaps are not filled.
pub fn next_number_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter(|n| is_number_name(n))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    highest.saturating_add(1).to_string()
}

/// Name for a freshly finished line running from `start` to `end`.
pub fn auto_line_name<'a>(
    start: Point,
    end: Point,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let dx = (end.x as i64 - start.x as i64).abs();
    let dy = (end.y as i64 - start.y as i64).abs();
    // |dy / dx| > 1 without dividing; vertical lines count as steep.
    if dy > dx {
        next_letter_name(existing)
    } else {
        next_number_name(existing)
    }
}

/// Name of the point where the named lines cross.
///
/// Letter names followed by number names when both kinds are present
/// (`A` and `1` give `A1`); otherwise every name joined by a comma.
pub fn intersection_name<S: AsRef<str>>(names: &[S]) -> String {
    let letters: Vec<&str> = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|n| is_letter_name(n))
        .collect();
    let numbers: Vec<&str> = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|n| is_number_name(n))
        .collect();

    if !letters.is_empty() && !numbers.is_empty() {
        let mut name = letters.concat();
        name.push_str(&numbers.concat());
        name
    } else {
        names.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
    }
}

pub fn rect_point_name(rect_name: &str) -> String {
    format!("{RECT_PREFIX}{rect_name}")
}

/// Alphabetical order that compares digit runs by value, so `2` < `10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = Chunks::new(a);
    let mut cb = Chunks::new(b);
    loop {
        match (ca.next(), cb.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x, y) {
                    (Chunk::Digits(x), Chunk::Digits(y)) => {
                        let (xt, yt) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
                        xt.len().cmp(&yt.len()).then_with(|| xt.cmp(yt))
                    }
                    (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
                    (Chunk::Text(x), Chunk::Text(y)) => x
                        .to_lowercase()
                        .cmp(&y.to_lowercase()),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_and_number_concatenate() {
        assert_eq!(intersection_name(&["A", "1"]), "A1");
        assert_eq!(intersection_name(&["12", "C"]), "C12");
        assert_eq!(intersection_name(&["top", "7"]), "top7");
    }

    #[test]
    fn same_kind_names_are_comma_joined() {
        assert_eq!(intersection_name(&["A", "B"]), "A,B");
        assert_eq!(intersection_name(&["1", "2"]), "1,2");
        assert_eq!(intersection_name(&["top", "A1"]), "top,A1");
    }

    #[test]
    fn classification_is_exact_not_substring() {
        assert!(!is_letter_name("A1"));
        assert!(!is_number_name("A1"));
        assert!(!is_letter_name(""));
        assert_eq!(intersection_name(&["A1", "B"]), "A1,B");
    }

    #[test]
    fn auto_names_alternate_by_slope() {
        let mut names: Vec<String> = Vec::new();
        // slopes 2.0, 0.5, 3.0
        let drags = [
            (Point::new(0, 0), Point::new(10, 20)),
            (Point::new(0, 0), Point::new(20, 10)),
            (Point::new(0, 0), Point::new(10, 30)),
        ];
        for (start, end) in drags {
            let name = auto_line_name(start, end, names.iter().map(String::as_str));
            names.push(name);
        }
        assert_eq!(names, ["A", "1", "B"]);
    }

    #[test]
    fn vertical_is_steep_and_diagonal_is_shallow() {
        let none: [&str; 0] = [];
        assert_eq!(auto_line_name(Point::new(5, 0), Point::new(5, 9), none), "A");
        assert_eq!(auto_line_name(Point::new(0, 0), Point::new(9, 9), none), "1");
    }

    #[test]
    fn sequences_resume_past_the_maximum() {
        assert_eq!(next_letter_name(["A", "D", "1"]), "E");
        assert_eq!(next_number_name(["1", "7", "B"]), "8");
        assert_eq!(next_letter_name(["Z"]), "AA");
        assert_eq!(next_letter_name(["az"]), "BA");
        assert_eq!(next_number_name(Vec::<&str>::new()), "1");
    }

    #[test]
    fn rect_points_are_prefixed() {
        assert_eq!(rect_point_name("door"), "rect-door");
    }

    #[test]
    fn natural_order_compares_numbers_by_value() {
        let mut names = vec!["10", "B", "2", "a", "1", "A10", "A2"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, ["1", "2", "10", "a", "A2", "A10", "B"]);
    }
}
