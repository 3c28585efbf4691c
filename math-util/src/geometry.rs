use std::cmp::Ordering;

use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::unit::Unit;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: Unit,
    pub y: Unit,
}

impl Point {
    pub fn new<T: Into<Unit>>(x: T, y: T) -> Self {
        Self { x: x.into(), y: y.into() }
    }

    pub fn distance_squared(&self, other: &Point) -> Unit {
        (self.x - other.x).squared().saturating_add((self.y - other.y).squared())
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_squared(other).to_f64().sqrt()
    }
}

/// Centroid of a set of points. None for an empty set.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let count = Unit::from(points.len() as i32);
    let sum_x: Unit = points.iter().map(|p| p.x).sum();
    let sum_y: Unit = points.iter().map(|p| p.y).sum();
    Some(Point {
        x: sum_x / count,
        y: sum_y / count,
    })
}

/// Axis-aligned rectangle. `min` is the lower-left corner and `max` the upper-right, always normalized.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Rect {
    min: Point,
    max: Point,
}

impl Rect {
    pub fn new(first: Point, second: Point) -> Self {
        Self {
            min: Point {
                x: first.x.min(second.x),
                y: first.y.min(second.y),
            },
            max: Point {
                x: first.x.max(second.x),
                y: first.y.max(second.y),
            },
        }
    }

    pub fn from_origin_size(x: Unit, y: Unit, width: Unit, height: Unit) -> Self {
        Self::new(Point { x, y }, Point { x: x + width, y: y + height })
    }

    pub fn min_corner(&self) -> Point {
        self.min
    }

    pub fn max_corner(&self) -> Point {
        self.max
    }

    pub fn width(&self) -> Unit {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> Unit {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> Unit {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.min.x + self.width().half(),
            y: self.min.y + self.height().half(),
        }
    }

    /// Closed containment, boundary included.
    pub fn contains_point(&self, p: &Point) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    fn overlap_extents(&self, other: &Rect) -> (Unit, Unit) {
        (
            self.max.x.min(other.max.x) - self.min.x.max(other.min.x),
            self.max.y.min(other.max.y) - self.min.y.max(other.min.y),
        )
    }

    /// True iff the open interiors intersect. Rectangles sharing only an edge or a corner do not, and a degenerate
    /// (zero width or height) rectangle has no interior.
    pub fn interiors_intersect(&self, other: &Rect) -> bool {
        let (w, h) = self.overlap_extents(other);
        w > Unit::zero() && h > Unit::zero()
    }

    pub fn overlap_area(&self, other: &Rect) -> Unit {
        if !self.interiors_intersect(other) {
            return Unit::zero();
        }
        let (w, h) = self.overlap_extents(other);
        w * h
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Point {
                x: self.min.x.min(other.min.x),
                y: self.min.y.min(other.min.y),
            },
            max: Point {
                x: self.max.x.max(other.max.x),
                y: self.max.y.max(other.max.y),
            },
        }
    }

    /// Corners in counter-clockwise order starting at `min`.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point { x: self.max.x, y: self.min.y },
            self.max,
            Point { x: self.min.x, y: self.max.y },
        ]
    }

    pub fn sides(&self) -> [Segment; 4] {
        let [a, b, c, d] = self.corners();
        [Segment::new(a, b), Segment::new(b, c), Segment::new(c, d), Segment::new(d, a)]
    }
}

/// Smallest rectangle covering all of `rects`. None for an empty slice.
pub fn bounding_box(rects: &[Rect]) -> Option<Rect> {
    let (first, rest) = rects.split_first()?;
    Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

fn orientation(a: &Point, b: &Point, c: &Point) -> Ordering {
    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    cross.cmp(&Unit::zero())
}

/// `p` is known to be collinear with `s`; is it within the segment's bounding box.
fn on_segment(s: &Segment, p: &Point) -> bool {
    s.start.x.min(s.end.x) <= p.x
        && p.x <= s.start.x.max(s.end.x)
        && s.start.y.min(s.end.y) <= p.y
        && p.y <= s.start.y.max(s.end.y)
}

/// Closed segment intersection: shared endpoints, touching and collinear overlap all count.
pub fn segments_intersect(s1: &Segment, s2: &Segment) -> bool {
    let o1 = orientation(&s1.start, &s1.end, &s2.start);
    let o2 = orientation(&s1.start, &s1.end, &s2.end);
    let o3 = orientation(&s2.start, &s2.end, &s1.start);
    let o4 = orientation(&s2.start, &s2.end, &s1.end);

    if o1 != o2 && o3 != o4 {
        return true;
    }
    (o1 == Ordering::Equal && on_segment(s1, &s2.start))
        || (o2 == Ordering::Equal && on_segment(s1, &s2.end))
        || (o3 == Ordering::Equal && on_segment(s2, &s1.start))
        || (o4 == Ordering::Equal && on_segment(s2, &s1.end))
}

/// Does the segment share at least one point with the closed rectangle.
pub fn segment_intersects_rect(segment: &Segment, rect: &Rect) -> bool {
    if rect.contains_point(&segment.start) || rect.contains_point(&segment.end) {
        return true;
    }
    rect.sides().iter().any(|side| segments_intersect(segment, side))
}

#[cfg(test)]
mod geometry_tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::from_origin_size(x.into(), y.into(), w.into(), h.into())
    }

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
        Segment::new(
            Point {
                x: Unit::from_f64(x1).unwrap(),
                y: Unit::from_f64(y1).unwrap(),
            },
            Point {
                x: Unit::from_f64(x2).unwrap(),
                y: Unit::from_f64(y2).unwrap(),
            },
        )
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = rect(0, 0, 5, 5);
        let b = rect(5, 0, 5, 5);
        let c = rect(5, 5, 5, 5);
        assert!(!a.interiors_intersect(&b));
        assert!(!a.interiors_intersect(&c));
        assert_eq!(a.overlap_area(&b), Unit::zero());
    }

    #[test]
    fn overlapping_rects_intersect() {
        let a = rect(0, 0, 5, 5);
        let b = rect(4, 4, 5, 5);
        assert!(a.interiors_intersect(&b));
        assert_eq!(a.overlap_area(&b), Unit::from(1));
        assert!(a.interiors_intersect(&a));
    }

    #[test]
    fn center_of_odd_sized_rect() {
        let r = rect(0, 10, 5, 15);
        assert_eq!(r.center(), Point {
            x: Unit::from_f64(2.5).unwrap(),
            y: Unit::from_f64(17.5).unwrap(),
        });
    }

    #[test]
    fn bounding_box_of_several() {
        let bb = bounding_box(&[rect(0, 0, 5, 5), rect(45, 10, 5, 15)]).unwrap();
        assert_eq!(bb, rect(0, 0, 50, 25));
        assert_eq!(bounding_box(&[]), None);
    }

    #[test]
    fn centroid_of_points() {
        let c = centroid(&[Point::new(0, 0), Point::new(10, 0), Point::new(5, 15)]).unwrap();
        assert_eq!(c, Point::new(5, 5));
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn distance_between_points() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_eq!(a.distance_squared(&b), Unit::from(25));
        assert_abs_diff_eq!(a.distance(&b), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn segment_crossing_rect() {
        let r = rect(10, 10, 5, 5);
        assert!(segment_intersects_rect(&seg(0.0, 12.0, 20.0, 12.0), &r));
        assert!(segment_intersects_rect(&seg(0.0, 0.0, 20.0, 20.0), &r));
        assert!(!segment_intersects_rect(&seg(0.0, 0.0, 20.0, 5.0), &r));
        assert!(!segment_intersects_rect(&seg(0.0, 16.0, 9.0, 30.0), &r));
    }

    #[test]
    fn segment_inside_rect_intersects() {
        let r = rect(0, 0, 20, 20);
        assert!(segment_intersects_rect(&seg(5.0, 5.0, 6.0, 6.0), &r));
    }

    #[test]
    fn segment_touching_corner_or_edge_intersects() {
        let r = rect(10, 10, 5, 5);
        assert!(segment_intersects_rect(&seg(0.0, 20.0, 10.0, 10.0), &r));
        assert!(segment_intersects_rect(&seg(0.0, 10.0, 30.0, 10.0), &r));
        assert!(segment_intersects_rect(&seg(5.0, 5.0, 15.0, 5.0 + 1e-3), &rect(0, 0, 20, 5)));
    }

    #[test]
    fn collinear_disjoint_segments() {
        assert!(!segments_intersect(&seg(0.0, 0.0, 1.0, 0.0), &seg(2.0, 0.0, 3.0, 0.0)));
        assert!(segments_intersect(&seg(0.0, 0.0, 2.0, 0.0), &seg(1.0, 0.0, 3.0, 0.0)));
    }

    proptest! {
        #[test]
        fn interiors_intersect_is_symmetric(x1 in 0i32..50, y1 in 0i32..50, w1 in 0i32..20, h1 in 0i32..20,
                                            x2 in 0i32..50, y2 in 0i32..50, w2 in 0i32..20, h2 in 0i32..20) {
            let a = rect(x1, y1, w1, h1);
            let b = rect(x2, y2, w2, h2);
            prop_assert_eq!(a.interiors_intersect(&b), b.interiors_intersect(&a));
            prop_assert_eq!(a.overlap_area(&b) > Unit::zero(), a.interiors_intersect(&b));
        }

        #[test]
        fn segment_intersection_is_symmetric(x1 in 0i32..20, y1 in 0i32..20, x2 in 0i32..20, y2 in 0i32..20,
                                             x3 in 0i32..20, y3 in 0i32..20, x4 in 0i32..20, y4 in 0i32..20) {
            let s1 = Segment::new(Point::new(x1, y1), Point::new(x2, y2));
            let s2 = Segment::new(Point::new(x3, y3), Point::new(x4, y4));
            prop_assert_eq!(segments_intersect(&s1, &s2), segments_intersect(&s2, &s1));
        }
    }
}
