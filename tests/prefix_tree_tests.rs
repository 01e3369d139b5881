use bytes::Bytes;
use geo::{Point, polygon};
use spatio_prefix_tree::{
    Cell, GeohashPrefixTree, PrefixTreeError, QuadPrefixTree, Shape, SpatialContext,
    SpatialPrefixTree, SpatialRelation, cells_to_token_strings,
};
use std::sync::Arc;
use std::thread;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn quad(levels: usize) -> QuadPrefixTree {
    QuadPrefixTree::new(SpatialContext::geo(), levels).expect("Failed to create quad tree")
}

fn geohash(levels: usize) -> GeohashPrefixTree {
    GeohashPrefixTree::new(SpatialContext::geo(), levels).expect("Failed to create geohash tree")
}

fn assert_sorted_unique(cells: &[Cell]) {
    for pair in cells.windows(2) {
        assert!(
            pair[0] < pair[1],
            "{} should sort before {}",
            pair[0],
            pair[1]
        );
    }
}

/// Test 1: Quad world cell and first-level geometry
#[test]
fn test_quad_world_and_first_quadrant() {
    init_logging();
    let tree = quad(2);

    assert_eq!(tree.world_cell().token(), "");
    assert_eq!(tree.world_cell().level(), 0);

    let a = tree.cell("A").unwrap().shape().unwrap();
    assert_eq!(a.min().x, -180.0);
    assert_eq!(a.min().y, 0.0);
    assert_eq!(a.max().x, 0.0);
    assert_eq!(a.max().y, 90.0);
}

/// Test 2: Geohash empty token is the non-leaf world cell
#[test]
fn test_geohash_empty_token() {
    init_logging();
    let tree = geohash(GeohashPrefixTree::MAX_LEVELS_POSSIBLE);
    let world = tree.cell("").unwrap();

    assert_eq!(world.token(), "");
    assert!(!world.is_leaf());
    assert_eq!(&world, tree.world_cell());
}

/// Test 3: Point decomposition with parents yields one cell per level
#[test]
fn test_point_cells_with_parents() {
    init_logging();
    let point = Shape::point(10.0, 10.0);

    let quad_tree = quad(6);
    let geohash_tree = geohash(6);
    let trees: [&dyn SpatialPrefixTree; 2] = [&quad_tree, &geohash_tree];

    for tree in trees {
        let cells = tree.cells(&point, 3, true, false).unwrap();
        assert_eq!(cells.len(), 3, "{}", tree.kind());
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(cell.level(), i + 1);
        }
        assert!(cells[0].is_prefix_of(&cells[1]));
        assert!(cells[1].is_prefix_of(&cells[2]));
        assert_sorted_unique(&cells);
    }
}

/// Test 4: A point filter picks exactly one child, related as Contains
#[test]
fn test_point_filter_single_child() {
    init_logging();
    let point = Shape::point(-0.1278, 51.5074);

    let tree = quad(8);
    let parent = tree.cell("A").unwrap();
    let children = parent.sub_cells_filtered(Some(&point)).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].shape_rel(), Some(SpatialRelation::Contains));
    assert!(parent.is_prefix_of(&children[0]));

    let tree = geohash(8);
    let children = tree.world_cell().sub_cells_filtered(Some(&point)).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].token(), "g");
    assert_eq!(children[0].shape_rel(), Some(SpatialRelation::Contains));
}

/// Test 5: Simplification collapses a fully covered cell into one leaf
#[test]
fn test_simplify_emits_single_parent_leaf() {
    init_logging();
    let tree = geohash(6);
    let dr5 = tree.cell("dr5").unwrap().shape().unwrap();

    // Slightly inside dr5, so every child touches it but no neighbour does
    let eps = 1e-6;
    let shape = Shape::rect(
        dr5.min().x + eps,
        dr5.min().y + eps,
        dr5.max().x - eps,
        dr5.max().y - eps,
    );

    let plain = tree.cells(&shape, 4, false, false).unwrap();
    assert_eq!(plain.len(), 32);
    assert!(plain.iter().all(|c| c.level() == 4 && c.is_leaf()));

    let simplified = tree.cells(&shape, 4, false, true).unwrap();
    assert_eq!(cells_to_token_strings(&simplified), vec!["dr5+"]);
}

/// Test 6: Every decomposed cell touches the shape, in sorted order
#[test]
fn test_polygon_decomposition_invariants() {
    init_logging();
    let triangle = Shape::Polygon(polygon![
        (x: -10.0, y: -10.0),
        (x: 30.0, y: -5.0),
        (x: 5.0, y: 25.0),
        (x: -10.0, y: -10.0),
    ]);

    let quad_tree = quad(8);
    let geohash_tree = geohash(4);
    let trees: [&dyn SpatialPrefixTree; 2] = [&quad_tree, &geohash_tree];

    for tree in trees {
        let detail = tree.max_levels();
        let cells = tree.cells(&triangle, detail, false, true).unwrap();
        assert!(!cells.is_empty());
        assert_sorted_unique(&cells);

        for cell in &cells {
            assert!(cell.is_leaf());
            assert!(cell.level() >= 1 && cell.level() <= detail);
            let rel = Shape::Rect(cell.shape().unwrap()).relate(&triangle);
            assert_ne!(rel, SpatialRelation::Disjoint, "{} {}", tree.kind(), cell);
        }

        // No cell is an ancestor of another
        for pair in cells.windows(2) {
            assert!(!pair[0].is_prefix_of(&pair[1]));
        }
    }
}

/// Test 7: With parents, every leaf's ancestors precede it
#[test]
fn test_parents_precede_descendants() {
    init_logging();
    let tree = quad(6);
    let shape = Shape::rect(20.0, 20.0, 40.0, 30.0);
    let cells = tree.cells(&shape, 5, true, false).unwrap();
    assert_sorted_unique(&cells);

    for (i, cell) in cells.iter().enumerate() {
        for len in 1..cell.level() {
            let ancestor = &cell.token()[..len];
            assert!(
                cells[..i].iter().any(|c| c.token() == ancestor),
                "missing ancestor {} of {}",
                ancestor,
                cell
            );
        }
        if !cell.is_leaf() {
            assert!(cell.level() < 5);
        }
    }
}

/// Test 8: Arity and child ordering on both grids
#[test]
fn test_arity() {
    init_logging();
    let quad_tree = quad(4);
    let geohash_tree = geohash(4);

    for (tree, token, arity) in [
        (&quad_tree as &dyn SpatialPrefixTree, "CB", 4),
        (&geohash_tree as &dyn SpatialPrefixTree, "9q", 32),
    ] {
        let cell = tree.cell(token).unwrap();
        let children = cell.sub_cells();
        assert_eq!(children.len(), arity);
        assert_eq!(children.len(), cell.sub_cells_size());
        assert_sorted_unique(&children);
        for child in &children {
            assert_eq!(child.level(), cell.level() + 1);
            assert!(cell.is_prefix_of(child));
        }
    }
}

/// Test 9: Quad cell area shrinks by four per level
#[test]
fn test_quad_area_per_level() {
    let tree = quad(10);
    let mut cell = tree.world_cell().clone();
    let world_area = 360.0 * 180.0;

    for level in 1..=10 {
        cell = cell.sub_cells().remove(level % 4);
        let rect = cell.shape().unwrap();
        let expected = world_area / 4f64.powi(level as i32);
        assert!((rect.width() * rect.height() - expected).abs() < 1e-9);
    }
}

/// Test 10: Byte-range decoding matches string decoding
#[test]
fn test_bytes_and_string_decoding_agree() {
    let tree = geohash(8);
    let buf = Bytes::from_static(b"|dr5reg+|9q8yy|");

    let leaf = tree.cell_from_bytes(&buf, 1, 7).unwrap();
    assert_eq!(leaf, tree.cell("dr5reg").unwrap());
    assert!(leaf.is_leaf());
    assert_eq!(leaf.shape().unwrap(), tree.cell("dr5reg").unwrap().shape().unwrap());

    let plain = tree.cell_reusing(&buf, 9, 5, Some(leaf)).unwrap();
    assert_eq!(plain.token(), "9q8yy");
    assert!(!plain.is_leaf());

    let world = tree.cell_from_bytes(&buf, 3, 0).unwrap();
    assert_eq!(world.level(), 0);
}

/// Test 11: Level/distance conversions are consistent
#[test]
fn test_distance_levels_monotonic() {
    let quad_tree = quad(12);
    let geohash_tree = geohash(12);
    let trees: [&dyn SpatialPrefixTree; 2] = [&quad_tree, &geohash_tree];

    for tree in trees {
        let mut previous = f64::INFINITY;
        for level in 1..=tree.max_levels() {
            let dist = tree.distance_for_level(level).unwrap();
            assert!(dist < previous, "{} level {}", tree.kind(), level);
            previous = dist;
            assert!(tree.level_for_distance(dist) <= level);
        }
        assert_eq!(tree.level_for_distance(0.0), tree.max_levels());
    }
}

/// Test 12: Invalid input is reported, not panicked on
#[test]
fn test_error_paths() {
    let tree = quad(4);
    let shape = Shape::rect(0.0, 0.0, 1.0, 1.0);

    assert_eq!(
        tree.cells(&shape, 5, false, false).unwrap_err(),
        PrefixTreeError::LevelOutOfRange {
            level: 5,
            min: 1,
            max: 4
        }
    );
    assert!(matches!(
        tree.cell("ABCDA"),
        Err(PrefixTreeError::InvalidToken { .. })
    ));
    assert!(matches!(
        tree.cell_for_point(&Point::new(181.0, 0.0), 2),
        Err(PrefixTreeError::PointOutOfBounds { .. })
    ));

    let mut world = tree.world_cell().clone();
    assert!(world.set_leaf().is_err());
}

/// Test 13: Trees are shared read-only across threads
#[test]
fn test_concurrent_queries() {
    init_logging();
    let tree: Arc<dyn SpatialPrefixTree> = Arc::new(geohash(7));
    let shape = Shape::rect(-74.05, 40.68, -73.90, 40.88);
    let expected = tree.cells(&shape, 6, false, true).unwrap();

    thread::scope(|s| {
        for _ in 0..4 {
            let tree = Arc::clone(&tree);
            let shape = shape.clone();
            let expected = &expected;
            s.spawn(move || {
                let cells = tree.cells(&shape, 6, false, true).unwrap();
                assert_eq!(&cells, expected);
            });
        }
    });
}

/// Test 14: Planar quad grids decompose arbitrary bounds
#[test]
fn test_planar_quad_decomposition() {
    let ctx = SpatialContext::planar(geo::Rect::new(
        geo::coord! { x: 0.0, y: 0.0 },
        geo::coord! { x: 4096.0, y: 4096.0 },
    ));
    let tree = QuadPrefixTree::new(ctx, 10).unwrap();

    // Exactly the lower-left quadrant
    let shape = Shape::rect(0.0, 0.0, 2048.0, 2048.0);

    // C equals the shape, so it contains it; its children lie within it
    let cells = tree.cells(&shape, 6, false, false).unwrap();
    let inside: Vec<&str> = cells
        .iter()
        .map(Cell::token)
        .filter(|t| t.starts_with('C'))
        .collect();
    assert_eq!(inside, vec!["CA", "CB", "CC", "CD"]);
    // Neighbours touching the edge are refined to the detail level
    assert!(cells.iter().all(|c| c.token().starts_with('C') || c.level() == 6));

    let simplified = tree.cells(&shape, 6, false, true).unwrap();
    let c = simplified.iter().find(|c| c.token() == "C").unwrap();
    assert!(c.is_leaf());
    assert!(!simplified.iter().any(|c| c.token().starts_with("CA")));
}

/// Test 15: World corners and max edges fall inside their own cells
#[test]
fn test_world_edges_contained() {
    init_logging();
    let quad_tree = quad(20);
    let geohash_tree = geohash(GeohashPrefixTree::MAX_LEVELS_POSSIBLE);
    let trees: [&dyn SpatialPrefixTree; 2] = [&quad_tree, &geohash_tree];
    let edges = [
        (180.0, -90.0),
        (180.0, 90.0),
        (-180.0, 90.0),
        (-180.0, -90.0),
        (180.0, 10.0),
        (-45.0, 90.0),
    ];

    for tree in trees {
        for (x, y) in edges {
            let point = Point::new(x, y);
            for level in 1..=tree.max_levels() {
                let cell = tree.cell_for_point(&point, level).unwrap();
                let rel = Shape::Rect(cell.shape().unwrap()).relate(&Shape::Point(point));
                assert_ne!(
                    rel,
                    SpatialRelation::Disjoint,
                    "{} ({}, {}) level {} -> {}",
                    tree.kind(),
                    x,
                    y,
                    level,
                    cell
                );
            }
        }
    }

    // The east edge stays east rather than wrapping to the antimeridian's far side
    let east = geohash_tree.cell_for_point(&Point::new(180.0, 10.0), 2).unwrap();
    assert_eq!(east.token(), "xc");
}

/// Test 16: NaN coordinates are out of bounds on both grids
#[test]
fn test_nan_points_rejected() {
    let quad_tree = quad(6);
    let geohash_tree = geohash(6);
    let trees: [&dyn SpatialPrefixTree; 2] = [&quad_tree, &geohash_tree];

    for tree in trees {
        for point in [Point::new(f64::NAN, 0.0), Point::new(10.0, f64::NAN)] {
            assert!(
                matches!(
                    tree.cell_for_point(&point, 4),
                    Err(PrefixTreeError::PointOutOfBounds { .. })
                ),
                "{}",
                tree.kind()
            );
        }
    }
}

/// Test 17: Encoded cells contain their points on non-dyadic planar bounds
#[test]
fn test_non_dyadic_planar_containment() {
    let ctx = SpatialContext::planar(geo::Rect::new(
        geo::coord! { x: 0.1, y: 0.3 },
        geo::coord! { x: 0.7, y: 1.3 },
    ));
    let tree = QuadPrefixTree::new(ctx, 40).unwrap();

    let mut state = 42u64;
    let mut unit = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };

    let mut points = vec![
        Point::new(0.6826332304401149, 0.987939754663788),
        Point::new(0.7, 1.3),
        Point::new(0.1, 1.3),
        Point::new(0.7, 0.3),
    ];
    for _ in 0..50_000 {
        let (u, v) = (unit(), unit());
        points.push(Point::new(0.1 + u * 0.6, 0.3 + v * 1.0));
    }

    for point in &points {
        let cell = tree.cell_for_point(point, 40).unwrap();
        assert_ne!(
            Shape::Rect(cell.shape().unwrap()).relate(&Shape::Point(*point)),
            SpatialRelation::Disjoint,
            "{:?} outside {}",
            point,
            cell
        );
    }
}
