use crate::geom::point::Point;

/// Axis-aligned bounding box of `pts` as `(min, max)` corners.
///
/// Returns `None` for an empty slice.
pub fn bounding_box(pts: &[Point]) -> Option<(Point, Point)> {
    let first = pts.first()?;
    let mut pmin = *first;
    let mut pmax = *first;
    for p in pts.iter().skip(1) {
        pmin = Point::new(pmin.x.min(p.x), pmin.y.min(p.y), pmin.z.min(p.z));
        pmax = Point::new(pmax.x.max(p.x), pmax.y.max(p.y), pmax.z.max(p.z));
    }
    Some((pmin, pmax))
}

/// Smallest box holding both boxes.
pub fn union_bboxes(a: (Point, Point), b: (Point, Point)) -> (Point, Point) {
    (
        Point::new(a.0.x.min(b.0.x), a.0.y.min(b.0.y), a.0.z.min(b.0.z)),
        Point::new(a.1.x.max(b.1.x), a.1.y.max(b.1.y), a.1.z.max(b.1.z)),
    )
}

/// Grows the box by `margin` on every side.
pub fn expand_bbox(pmin: Point, pmax: Point, margin: f64) -> (Point, Point) {
    (
        Point::new(pmin.x - margin, pmin.y - margin, pmin.z - margin),
        Point::new(pmax.x + margin, pmax.y + margin, pmax.z + margin),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let pts = [
            Point::new(1., -2., 3.),
            Point::new(-1., 5., 0.),
            Point::new(0., 0., 7.),
        ];
        let (pmin, pmax) = bounding_box(&pts).unwrap();
        assert!(pmin.is_close(&Point::new(-1., -2., 0.)));
        assert!(pmax.is_close(&Point::new(1., 5., 7.)));
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn test_union_and_margin() {
        let a = (Point::new(0., 0., 0.), Point::new(1., 1., 1.));
        let c = (Point::new(3., 3., 3.), Point::new(4., 4., 4.));
        let (umin, umax) = union_bboxes(a, c);
        assert!(umin.is_close(&a.0));
        assert!(umax.is_close(&c.1));
        let (emin, emax) = expand_bbox(a.0, a.1, 0.5);
        assert!(emin.is_close(&Point::new(-0.5, -0.5, -0.5)));
        assert!(emax.is_close(&Point::new(1.5, 1.5, 1.5)));
    }
}
