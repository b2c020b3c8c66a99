use cairn_geom::{Aabb, Vec3};
use proptest::prelude::*;

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn small_f32() -> impl Strategy<Value = f32> {
    -1_000.0f32..1_000.0
}

fn small_vec3() -> impl Strategy<Value = Vec3> {
    (small_f32(), small_f32(), small_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn add_sub_inverse(a in small_vec3(), b in small_vec3()) {
        let c = (a + b) - b;
        prop_assert!(approx(c.x, a.x, 1e-2) && approx(c.y, a.y, 1e-2) && approx(c.z, a.z, 1e-2));
    }

    #[test]
    fn normalized_has_unit_length(a in small_vec3()) {
        prop_assume!(a.length() > 1e-3);
        prop_assert!(approx(a.normalized().length(), 1.0, 1e-4));
    }

    // corners of an ordered box are all contained by it
    #[test]
    fn corners_are_contained(a in small_vec3(), e in small_vec3()) {
        let max = Vec3::new(a.x + e.x.abs(), a.y + e.y.abs(), a.z + e.z.abs());
        let bb = Aabb::new(a, max);
        for c in bb.corners() {
            prop_assert!(bb.contains(c));
        }
    }
}

#[test]
fn neg_and_round() {
    assert_eq!(-Vec3::new(1.0, -2.0, 0.5), Vec3::new(-1.0, 2.0, -0.5));
    assert_eq!(Vec3::new(1.4, -1.6, 2.5).round(), Vec3::new(1.0, -2.0, 3.0));
}
