//! End-to-end tests of the candidate generation pipeline.

use grasp_candidates::{
    CandidatesGenerator, CandidatesGeneratorParams, ConfigMap, GraspError, Hand, HandSearch,
    HandSearchParams, HandSet, PointCloud,
};
use nalgebra::{Point3, Vector3};

/// A horizontal slab with its top face at z = 0 and two vertical side walls
/// at x = +/-0.025, with hand-authored normals. The walls are 0.05 apart.
fn slab_with_walls() -> PointCloud {
    let mut cloud = PointCloud::new();
    let mut x = -0.025;
    while x <= 0.025 + 1e-9 {
        let mut y = -0.05;
        while y <= 0.05 + 1e-9 {
            cloud.add_point_with_normal(Point3::new(x, y, 0.0), Vector3::z());
            y += 0.0025;
        }
        x += 0.0025;
    }
    for side in [-1.0, 1.0] {
        let mut y = -0.05;
        while y <= 0.05 + 1e-9 {
            let mut z = -0.03;
            while z <= 1e-9 {
                cloud.add_point_with_normal(
                    Point3::new(side * 0.025, y, z),
                    Vector3::new(side, 0.0, 0.0),
                );
                z += 0.005;
            }
            y += 0.005;
        }
    }
    cloud.view_point = Point3::new(0.0, 0.0, 1.0);
    cloud.set_samples(vec![Point3::origin()]);
    cloud
}

/// A large flat plane with authored upward normals; nothing to wrap the
/// fingers around.
fn flat_plane() -> PointCloud {
    let mut cloud = PointCloud::new();
    let mut x = -0.08;
    while x <= 0.08 + 1e-9 {
        let mut y = -0.08;
        while y <= 0.08 + 1e-9 {
            cloud.add_point_with_normal(Point3::new(x, y, 0.0), Vector3::z());
            y += 0.0025;
        }
        x += 0.0025;
    }
    cloud.view_point = Point3::new(0.0, 0.0, 1.0);
    cloud.set_samples(vec![Point3::origin()]);
    cloud
}

fn slab_search() -> HandSearch {
    HandSearch::new(
        HandSearchParams::default()
            .with_nn_radius(0.04)
            .with_num_threads(1),
    )
    .unwrap()
}

#[test]
fn empty_cloud_produces_no_candidate_sets() {
    let generator = CandidatesGenerator::new(
        CandidatesGeneratorParams::default(),
        HandSearchParams::default(),
    )
    .unwrap();
    let sets = generator
        .generate_grasp_candidate_sets(&PointCloud::new())
        .unwrap();
    assert!(sets.is_empty());
}

#[test]
fn preprocess_rejects_empty_cloud() {
    let generator = CandidatesGenerator::new(
        CandidatesGeneratorParams::default(),
        HandSearchParams::default(),
    )
    .unwrap();
    let mut cloud = PointCloud::new();
    assert!(matches!(
        generator.preprocess_point_cloud(&mut cloud),
        Err(GraspError::EmptyPointCloud)
    ));
}

#[test]
fn flat_plane_offers_no_grasp() {
    let cloud = flat_plane();
    let search = HandSearch::new(
        HandSearchParams::default()
            .with_nn_radius(0.08)
            .with_num_threads(1),
    )
    .unwrap();
    let sets = search.search_hands(&cloud).unwrap();

    assert_eq!(sets.len(), 1);
    assert!(!sets[0].hands().is_empty());
    assert_eq!(sets[0].num_valid(), 0);
    assert!(sets[0].is_valid().iter().all(|&v| !v));
}

#[test]
fn slab_with_walls_is_graspable() {
    let cloud = slab_with_walls();
    let search = slab_search();
    let sets = search.search_hands(&cloud).unwrap();

    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    assert!(set.num_valid() >= 1);

    // Some valid hand closes across the 0.05 m gap between the walls.
    let widths: Vec<f64> = set
        .hands()
        .iter()
        .filter(|h| h.is_valid)
        .map(|h| h.grasp_width)
        .collect();
    assert!(
        widths.iter().any(|w| (w - 0.05).abs() < 1e-3),
        "no valid hand near the wall separation: {widths:?}"
    );
}

#[test]
fn hypothesis_sets_keep_parallel_validity() {
    let cloud = slab_with_walls();
    let search = slab_search();
    let sets = search.search_hands(&cloud).unwrap();

    for set in &sets {
        assert_eq!(set.hands().len(), set.is_valid().len());
        assert_eq!(
            set.hands().len(),
            search.params().hand_axes.len() * search.params().num_orientations
        );
        for (hand, &valid) in set.hands().iter().zip(set.is_valid()) {
            assert_eq!(hand.is_valid, valid);
        }
    }
}

#[test]
fn valid_hands_respect_width_and_depth_ranges() {
    let cloud = slab_with_walls();
    let search = slab_search();
    let geometry = search.params().hand_geometry;
    let sets = search.search_hands(&cloud).unwrap();

    for hand in sets.iter().flat_map(HandSet::hands).filter(|h| h.is_valid) {
        assert!(hand.grasp_width > geometry.finger_width);
        assert!(hand.grasp_width <= geometry.outer_diameter);
        assert!(hand.depth >= geometry.init_bite - 1e-9);
        assert!(hand.depth <= geometry.max_depth + 1e-9);

        // Depths advance from init_bite in whole deepening steps.
        let steps = (hand.depth - geometry.init_bite) / geometry.deepen_step;
        assert!(
            (steps - steps.round()).abs() < 1e-6,
            "depth {} is not on the deepening grid",
            hand.depth
        );
    }
}

#[test]
fn generation_is_deterministic() {
    let run = || {
        let cloud = slab_with_walls();
        let generator = CandidatesGenerator::new(
            CandidatesGeneratorParams::default(),
            HandSearchParams::default()
                .with_nn_radius(0.04)
                .with_num_threads(2),
        )
        .unwrap();
        generator.generate_grasp_candidates(&cloud).unwrap()
    };

    let a = run();
    let b = run();
    assert_eq!(a.len(), b.len());
    for (ha, hb) in a.iter().zip(&b) {
        assert_eq!(ha.position, hb.position);
        assert_eq!(ha.orientation, hb.orientation);
        assert!((ha.grasp_width - hb.grasp_width).abs() < 1e-15);
        assert!((ha.depth - hb.depth).abs() < 1e-15);
    }
}

#[test]
fn candidate_order_follows_sample_order() {
    let mut cloud = slab_with_walls();
    cloud.set_samples(vec![
        Point3::new(0.0, -0.02, 0.0),
        Point3::new(0.0, 0.02, 0.0),
    ]);
    let sets = slab_search().search_hands(&cloud).unwrap();

    assert_eq!(sets.len(), 2);
    assert!((sets[0].sample.y - -0.02).abs() < 1e-12);
    assert!((sets[1].sample.y - 0.02).abs() < 1e-12);
}

#[test]
fn reevaluation_keeps_candidates_on_the_same_cloud() {
    let cloud = slab_with_walls();
    let search = slab_search();
    let mut sets = search.search_hands(&cloud).unwrap();
    let hands: Vec<Hand> = sets
        .iter_mut()
        .flat_map(HandSet::take_valid_hands)
        .collect();
    assert!(!hands.is_empty());

    let kept = search.reevaluate_hypotheses(&cloud, &hands).unwrap();
    assert_eq!(kept, (0..hands.len()).collect::<Vec<usize>>());
}

#[test]
fn full_pipeline_grasps_a_box() {
    // A 0.05 m wide box standing on the z = 0 plane, observed from above.
    let mut cloud = PointCloud::new();
    let mut x = -0.025;
    while x <= 0.025 + 1e-9 {
        let mut y = -0.05;
        while y <= 0.05 + 1e-9 {
            cloud.add_point(Point3::new(x, y, 0.1));
            y += 0.002;
        }
        x += 0.002;
    }
    for side in [-1.0, 1.0] {
        let mut y = -0.05;
        while y <= 0.05 + 1e-9 {
            let mut z = 0.04;
            while z <= 0.1 + 1e-9 {
                cloud.add_point(Point3::new(side * 0.025, y, z));
                z += 0.002;
            }
            y += 0.002;
        }
    }
    cloud.view_point = Point3::new(0.0, 0.0, 1.0);

    let config = ConfigMap::parse_str(
        "nn_radius = 0.04\n\
         init_bite = 0.02\n\
         max_depth = 0.05\n\
         num_threads = 1\n",
    );
    let generator = CandidatesGenerator::new(
        CandidatesGeneratorParams::from_config(&config),
        HandSearchParams::from_config(&config),
    )
    .unwrap();

    generator.preprocess_point_cloud(&mut cloud).unwrap();
    assert!(cloud.has_normals());

    // Search around the center of the top face.
    cloud.set_samples(vec![Point3::new(0.0, 0.0, 0.1)]);
    let candidates = generator.generate_grasp_candidates(&cloud).unwrap();

    assert!(!candidates.is_empty(), "no candidates on a graspable box");
    for hand in &candidates {
        assert!(hand.is_valid);
        assert!(hand.grasp_width > 0.04 && hand.grasp_width < 0.06);
    }
}
