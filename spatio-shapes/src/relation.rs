use serde::{Deserialize, Serialize};

/// How one shape relates to another.
///
/// Relations are directional: `a.relate(b) == Within` means `a` lies inside `b`,
/// and `b.relate(a)` then reports `Contains`.
///
/// # Examples
///
/// ```
/// use spatio_shapes::SpatialRelation;
///
/// assert_eq!(SpatialRelation::Within.transpose(), SpatialRelation::Contains);
/// assert_eq!(SpatialRelation::Intersects.transpose(), SpatialRelation::Intersects);
/// assert!(!SpatialRelation::Disjoint.intersects());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialRelation {
    /// The shapes share no point.
    Disjoint,
    /// The shapes overlap (or touch) without either covering the other.
    Intersects,
    /// The first shape lies entirely inside the second.
    Within,
    /// The first shape entirely covers the second.
    Contains,
}

impl SpatialRelation {
    /// The same relation seen from the other shape's side.
    pub fn transpose(self) -> Self {
        match self {
            SpatialRelation::Within => SpatialRelation::Contains,
            SpatialRelation::Contains => SpatialRelation::Within,
            other => other,
        }
    }

    /// True for every relation except `Disjoint`.
    pub fn intersects(self) -> bool {
        self != SpatialRelation::Disjoint
    }

    /// Relation of the closed interval `[min, max]` to `[ext_min, ext_max]`.
    pub(crate) fn of_ranges(min: f64, max: f64, ext_min: f64, ext_max: f64) -> Self {
        if ext_min > max || ext_max < min {
            SpatialRelation::Disjoint
        } else if ext_min >= min && ext_max <= max {
            SpatialRelation::Contains
        } else if ext_min <= min && ext_max >= max {
            SpatialRelation::Within
        } else {
            SpatialRelation::Intersects
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_is_an_involution() {
        for rel in [
            SpatialRelation::Disjoint,
            SpatialRelation::Intersects,
            SpatialRelation::Within,
            SpatialRelation::Contains,
        ] {
            assert_eq!(rel.transpose().transpose(), rel);
        }
        assert_eq!(
            SpatialRelation::Contains.transpose(),
            SpatialRelation::Within
        );
        assert_eq!(
            SpatialRelation::Disjoint.transpose(),
            SpatialRelation::Disjoint
        );
    }

    #[test]
    fn test_range_relations() {
        assert_eq!(
            SpatialRelation::of_ranges(0.0, 10.0, 11.0, 12.0),
            SpatialRelation::Disjoint
        );
        assert_eq!(
            SpatialRelation::of_ranges(0.0, 10.0, 2.0, 8.0),
            SpatialRelation::Contains
        );
        assert_eq!(
            SpatialRelation::of_ranges(2.0, 8.0, 0.0, 10.0),
            SpatialRelation::Within
        );
        assert_eq!(
            SpatialRelation::of_ranges(0.0, 10.0, 5.0, 15.0),
            SpatialRelation::Intersects
        );
        // Touching endpoints still intersect
        assert_eq!(
            SpatialRelation::of_ranges(0.0, 10.0, 10.0, 20.0),
            SpatialRelation::Intersects
        );
        // Equal ranges report Contains
        assert_eq!(
            SpatialRelation::of_ranges(0.0, 10.0, 0.0, 10.0),
            SpatialRelation::Contains
        );
    }
}
