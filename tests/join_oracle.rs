use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};
use std::collections::HashSet;
use std::sync::Arc;
use zjoin::{
    BBox, Duplicates, IndexOptions, Record, Space, SpatialIndex, SpatialJoin, StableRecord,
    TreeIndex,
};

const EXTENT: f64 = 10_000.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic pseudo-random boxes.
fn random_boxes(seed: u64, n: usize, max_size: f64) -> Vec<BBox> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..n)
        .map(|i| {
            let w = 1.0 + next() * max_size;
            let h = 1.0 + next() * max_size;
            let x = next() * (EXTENT - w);
            let y = next() * (EXTENT - h);
            BBox::new(x, y, x + w, y + h).with_max_z(1 + i % 12)
        })
        .collect()
}

fn build(space: &Arc<Space>, boxes: &[BBox], options: IndexOptions) -> SpatialIndex<StableRecord<BBox>> {
    let mut index = SpatialIndex::with_options(space.clone(), TreeIndex::new(), options);
    let mut factory = StableRecord::<BBox>::factory();
    for b in boxes {
        index.add(&mut b.clone(), &mut factory).unwrap();
    }
    index
}

/// Overlapping pairs according to an R-tree.
fn oracle(left: &[BBox], right: &[BBox]) -> Vec<(u64, u64)> {
    let tree = RTree::bulk_load(
        right
            .iter()
            .enumerate()
            .map(|(j, b)| {
                GeomWithData::new(
                    Rectangle::from_corners([b.x_lo(), b.y_lo()], [b.x_hi(), b.y_hi()]),
                    j as u64,
                )
            })
            .collect(),
    );
    let mut pairs = Vec::new();
    for (i, b) in left.iter().enumerate() {
        let envelope = AABB::from_corners([b.x_lo(), b.y_lo()], [b.x_hi(), b.y_hi()]);
        for hit in tree.locate_in_envelope_intersecting(&envelope) {
            pairs.push((i as u64, hit.data));
        }
    }
    pairs.sort_unstable();
    pairs
}

fn overlap(a: &StableRecord<BBox>, b: &StableRecord<BBox>) -> bool {
    a.spatial_object().overlaps(b.spatial_object())
}

fn join_pairs(
    left: &SpatialIndex<StableRecord<BBox>>,
    right: &SpatialIndex<StableRecord<BBox>>,
    duplicates: Duplicates,
) -> Vec<(u64, u64)> {
    let join = SpatialJoin::new(duplicates, overlap);
    join.iterator(left, right)
        .unwrap()
        .map(|p| {
            let p = p.unwrap();
            (p.left.soid(), p.right.soid())
        })
        .collect()
}

#[test]
fn test_exclude_join_matches_rtree() {
    init_logging();
    let space = Arc::new(Space::new(&[0.0, 0.0], &[EXTENT, EXTENT], &[20, 20]).unwrap());
    let left_boxes = random_boxes(7, 300, 400.0);
    let right_boxes = random_boxes(11, 250, 900.0);
    let expected = oracle(&left_boxes, &right_boxes);
    assert!(!expected.is_empty());

    for options in [IndexOptions::Default, IndexOptions::SingleCell] {
        let left = build(&space, &left_boxes, options);
        let right = build(&space, &right_boxes, options);
        let mut found = join_pairs(&left, &right, Duplicates::Exclude);
        let emitted = found.len();
        found.sort_unstable();
        found.dedup();
        assert_eq!(found.len(), emitted, "pair emitted twice");
        assert_eq!(found, expected);
    }
}

#[test]
fn test_include_join_covers_rtree() {
    init_logging();
    let space = Arc::new(Space::new(&[0.0, 0.0], &[EXTENT, EXTENT], &[20, 20]).unwrap());
    let left_boxes = random_boxes(3, 200, 1500.0);
    let right_boxes = random_boxes(5, 200, 1500.0);
    let left = build(&space, &left_boxes, IndexOptions::Default);
    let right = build(&space, &right_boxes, IndexOptions::Default);

    let all = join_pairs(&left, &right, Duplicates::Include);
    let distinct: HashSet<_> = all.iter().copied().collect();
    assert!(all.len() >= distinct.len());

    let mut distinct: Vec<_> = distinct.into_iter().collect();
    distinct.sort_unstable();
    assert_eq!(distinct, oracle(&left_boxes, &right_boxes));
}

#[test]
fn test_self_join_matches_rtree() {
    init_logging();
    let space = Arc::new(Space::new(&[0.0, 0.0], &[EXTENT, EXTENT], &[20, 20]).unwrap());
    let boxes = random_boxes(13, 250, 600.0);
    let index = build(&space, &boxes, IndexOptions::Default);

    let mut found = join_pairs(&index, &index, Duplicates::Exclude);
    found.sort_unstable();
    assert!(found.iter().all(|&(l, r)| l < r));

    let expected: Vec<_> = oracle(&boxes, &boxes)
        .into_iter()
        .filter(|&(l, r)| l < r)
        .collect();
    assert_eq!(found, expected);
}

#[test]
fn test_mixed_budgets_on_small_space() {
    init_logging();
    let space = Arc::new(Space::new(&[0.0, 0.0], &[EXTENT, EXTENT], &[6, 6]).unwrap());
    let left_boxes = random_boxes(17, 120, 2500.0);
    let right_boxes = random_boxes(19, 120, 50.0);
    let left = build(&space, &left_boxes, IndexOptions::Default);
    let right = build(&space, &right_boxes, IndexOptions::SingleCell);

    let mut found = join_pairs(&left, &right, Duplicates::Exclude);
    found.sort_unstable();
    assert_eq!(found, oracle(&left_boxes, &right_boxes));
}
