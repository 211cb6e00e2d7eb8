//! View-frustum culling
//!
//! Planes are extracted from `projection * view` once per camera change;
//! the camera position moves freely with [`Frustum::prepare`]. Box tests run
//! in camera-relative `f32` space so far-from-origin worlds keep precision.

use glam::{DVec3, Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aabb::{Aabb, BlockBox};

/// Distance the camera is pulled back per offset step.
pub const OFFSET_STEP: f32 = 4.0;

/// Upper bound on offset steps before the walk is abandoned.
pub const MAX_OFFSET_STEPS: u32 = 512;

/// `|det| / product of column lengths` below this is treated as a singular
/// matrix. The ratio lies in `0..=1` whatever the projection's scale.
const DEGENERATE_CONDITION: f32 = 1e-6;

/// Squared view-vector length below which the offset walk cannot move.
const MIN_VIEW_VECTOR_SQ: f64 = 1e-12;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrustumError {
    #[error("combined view-projection matrix is singular or not finite")]
    Degenerate,
    #[error("camera cube not fully inside the frustum after {steps} offset steps")]
    OffsetDidNotConverge { steps: u32 },
    #[error("view vector has zero length, camera cannot be offset")]
    ZeroViewVector,
}

/// Frustum plane names, in test order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plane {
    Left,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

impl Plane {
    pub const ALL: [Plane; 6] = [
        Plane::Left,
        Plane::Right,
        Plane::Bottom,
        Plane::Top,
        Plane::Near,
        Plane::Far,
    ];
}

/// Result of a box classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Entirely inside all six planes.
    Inside,
    /// Crosses at least one plane.
    Intersect,
    /// Culled, the named plane rejects the whole box.
    Outside(Plane),
}

impl Containment {
    pub fn is_visible(self) -> bool {
        !matches!(self, Containment::Outside(_))
    }
}

/// Immutable frustum snapshot plus a movable camera origin.
///
/// `Frustum` is `Copy`: passes that need a displaced camera (see
/// [`Frustum::offset_to_fully_include_camera_cube`]) work on their own copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vec4; 6],
    matrix: Mat4,
    view_vector: Vec4,
    camera: DVec3,
    degenerate: bool,
}

impl Frustum {
    /// Build a frustum from a camera-relative view matrix and a projection.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        let matrix = projection * view;
        let degenerate = is_degenerate_matrix(&matrix);

        let planes = if degenerate {
            [Vec4::ZERO; 6]
        } else {
            extract_planes(&matrix)
        };

        if degenerate {
            log::warn!("Frustum built from a degenerate matrix, every box will test as intersecting");
        }

        Self {
            planes,
            matrix,
            // transpose(matrix) * +Z
            view_vector: matrix.row(2),
            camera: DVec3::ZERO,
            degenerate,
        }
    }

    /// Move the camera origin. Planes are untouched.
    pub fn prepare(&mut self, camera: DVec3) {
        self.camera = camera;
    }

    pub fn camera(&self) -> DVec3 {
        self.camera
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    pub fn view_vector(&self) -> Vec4 {
        self.view_vector
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn plane(&self, plane: Plane) -> Vec4 {
        self.planes[plane as usize]
    }

    /// True unless the box lies completely outside the frustum.
    pub fn is_visible(&self, aabb: &Aabb) -> bool {
        if aabb.is_infinite() {
            return true;
        }
        self.cube_in_frustum(aabb.min, aabb.max).is_visible()
    }

    /// Classify a world-space box against the six planes.
    pub fn cube_in_frustum(&self, min: DVec3, max: DVec3) -> Containment {
        let rel_min = (min - self.camera).as_vec3();
        let rel_max = (max - self.camera).as_vec3();
        self.intersect_relative(rel_min, rel_max)
    }

    /// Classify an inclusive block range (max corner is widened by one block).
    pub fn bounding_box_in_frustum(&self, bounds: &BlockBox) -> Containment {
        let aabb = bounds.to_aabb();
        self.cube_in_frustum(aabb.min, aabb.max)
    }

    /// Whether a world-space point is on the inner side of every plane.
    pub fn contains_point(&self, point: DVec3) -> bool {
        if self.degenerate {
            return true;
        }
        let rel = (point - self.camera).as_vec3();
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(rel) + plane.w >= 0.0)
    }

    /// Classify a sphere using normalized plane distances.
    pub fn sphere_in_frustum(&self, center: DVec3, radius: f32) -> Containment {
        if self.degenerate {
            return Containment::Intersect;
        }
        let rel = (center - self.camera).as_vec3();
        let mut inside = true;
        for (plane, coeffs) in Plane::ALL.iter().zip(self.planes.iter()) {
            let distance = coeffs.truncate().dot(rel) + coeffs.w;
            if distance < -radius {
                return Containment::Outside(*plane);
            }
            if distance < radius {
                inside = false;
            }
        }
        if inside {
            Containment::Inside
        } else {
            Containment::Intersect
        }
    }

    /// Pull the camera back along the view vector until the grid cell of size
    /// `cube_size` that contains it is fully inside the frustum.
    ///
    /// On failure the camera keeps its pre-walk position and a warning is
    /// logged. Degenerate frustums, already reported by [`Frustum::new`],
    /// are returned unchanged.
    pub fn offset_to_fully_include_camera_cube(mut self, cube_size: u32) -> Self {
        if self.degenerate {
            return self;
        }
        if let Err(err) = self.try_offset_to_fully_include_camera_cube(cube_size) {
            log::warn!("Frustum offset aborted: {}", err);
        }
        self
    }

    /// Fallible offset walk. Returns the number of steps taken.
    pub fn try_offset_to_fully_include_camera_cube(
        &mut self,
        cube_size: u32,
    ) -> Result<u32, FrustumError> {
        if self.degenerate {
            return Err(FrustumError::Degenerate);
        }

        let size = f64::from(cube_size.max(1));
        let scaled = self.camera / size;
        let cell_min = scaled.floor() * size;
        let cell_max = scaled.ceil() * size;

        if self.cube_in_frustum(cell_min, cell_max) == Containment::Inside {
            return Ok(0);
        }

        let step = self.view_vector.truncate().as_dvec3() * f64::from(OFFSET_STEP);
        if step.length_squared() < MIN_VIEW_VECTOR_SQ {
            return Err(FrustumError::ZeroViewVector);
        }

        let start = self.camera;
        for steps in 1..=MAX_OFFSET_STEPS {
            self.camera -= step;
            if self.cube_in_frustum(cell_min, cell_max) == Containment::Inside {
                log::trace!("Frustum offset converged after {} steps", steps);
                return Ok(steps);
            }
        }

        self.camera = start;
        Err(FrustumError::OffsetDidNotConverge {
            steps: MAX_OFFSET_STEPS,
        })
    }

    /// The eight frustum corners in camera-relative space.
    ///
    /// Order: near plane (-x-y, +x-y, +x+y, -x+y), then the far plane likewise.
    pub fn frustum_points(&self) -> Result<[Vec3; 8], FrustumError> {
        if self.degenerate {
            return Err(FrustumError::Degenerate);
        }
        let inverse = self.matrix.inverse();
        let mut points = [Vec3::ZERO; 8];
        for (i, point) in points.iter_mut().enumerate() {
            let z = if i < 4 { -1.0 } else { 1.0 };
            let (x, y) = match i % 4 {
                0 => (-1.0, -1.0),
                1 => (1.0, -1.0),
                2 => (1.0, 1.0),
                _ => (-1.0, 1.0),
            };
            let corner = inverse * Vec4::new(x, y, z, 1.0);
            if corner.w.abs() < f32::EPSILON || !corner.is_finite() {
                return Err(FrustumError::Degenerate);
            }
            *point = corner.truncate() / corner.w;
        }
        Ok(points)
    }

    fn intersect_relative(&self, min: Vec3, max: Vec3) -> Containment {
        if self.degenerate {
            return Containment::Intersect;
        }

        let mut inside = true;
        for (plane, coeffs) in Plane::ALL.iter().zip(self.planes.iter()) {
            let normal = coeffs.truncate();
            let positive_side = normal.cmpge(Vec3::ZERO);

            // Farthest corner along the normal
            let p_vertex = Vec3::select(positive_side, max, min);
            if normal.dot(p_vertex) + coeffs.w < 0.0 {
                return Containment::Outside(*plane);
            }

            let n_vertex = Vec3::select(positive_side, min, max);
            if normal.dot(n_vertex) + coeffs.w < 0.0 {
                inside = false;
            }
        }

        if inside {
            Containment::Inside
        } else {
            Containment::Intersect
        }
    }
}

/// GL clip convention: planes are row3 ± row0/row1/row2, normalized by xyz length.
fn extract_planes(matrix: &Mat4) -> [Vec4; 6] {
    let (r0, r1, r2, r3) = (matrix.row(0), matrix.row(1), matrix.row(2), matrix.row(3));
    [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2].map(|plane| {
        let length = plane.truncate().length();
        if length > f32::EPSILON {
            plane / length
        } else {
            plane
        }
    })
}

/// Singular, non-finite or too ill-conditioned to extract planes from.
fn is_degenerate_matrix(matrix: &Mat4) -> bool {
    if !matrix.is_finite() {
        return true;
    }
    // Hadamard: |det| never exceeds the product of the column lengths
    let column_product = (0..4)
        .map(|i| f64::from(matrix.col(i).length()))
        .product::<f64>();
    let determinant = f64::from(matrix.determinant());
    if !determinant.is_finite() || !(column_product > 0.0) {
        return true;
    }
    determinant.abs() / column_product < f64::from(DEGENERATE_CONDITION) || !matrix.inverse().is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_frustum() -> Frustum {
        // Camera-relative view looking down -Z
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(70f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::new(view, projection)
    }

    fn cube(min: [f64; 3], max: [f64; 3]) -> Aabb {
        Aabb::new(DVec3::from_array(min), DVec3::from_array(max))
    }

    #[test]
    fn test_box_in_front_is_inside() {
        let frustum = forward_frustum();
        let aabb = cube([-1.0, -1.0, -11.0], [1.0, 1.0, -9.0]);
        assert_eq!(frustum.cube_in_frustum(aabb.min, aabb.max), Containment::Inside);
        assert!(frustum.is_visible(&aabb));
    }

    #[test]
    fn test_box_behind_is_outside() {
        let frustum = forward_frustum();
        let aabb = cube([-1.0, -1.0, 9.0], [1.0, 1.0, 11.0]);
        assert!(matches!(
            frustum.cube_in_frustum(aabb.min, aabb.max),
            Containment::Outside(_)
        ));
        assert!(!frustum.is_visible(&aabb));
    }

    #[test]
    fn test_box_past_far_plane_names_far() {
        let frustum = forward_frustum();
        let aabb = cube([-1.0, -1.0, -210.0], [1.0, 1.0, -200.0]);
        assert_eq!(
            frustum.cube_in_frustum(aabb.min, aabb.max),
            Containment::Outside(Plane::Far)
        );
    }

    #[test]
    fn test_box_straddling_left_plane_is_visible() {
        let frustum = forward_frustum();
        let aabb = cube([-20.0, -1.0, -11.0], [0.0, 1.0, -9.0]);
        assert_eq!(frustum.cube_in_frustum(aabb.min, aabb.max), Containment::Intersect);
        assert!(frustum.is_visible(&aabb));
    }

    #[test]
    fn test_infinite_box_always_visible() {
        let mut frustum = forward_frustum();
        assert!(frustum.is_visible(&Aabb::INFINITE));
        frustum.prepare(DVec3::new(1.0e6, -40.0, 3.0e5));
        assert!(frustum.is_visible(&Aabb::INFINITE));

        let degenerate = Frustum::new(Mat4::ZERO, Mat4::IDENTITY);
        assert!(degenerate.is_visible(&Aabb::INFINITE));
    }

    #[test]
    fn test_prepare_moves_camera_only() {
        let mut frustum = forward_frustum();
        let planes_before = frustum.planes;
        let aabb = cube([99.0, -1.0, -11.0], [101.0, 1.0, -9.0]);
        assert!(!frustum.is_visible(&aabb));

        frustum.prepare(DVec3::new(100.0, 0.0, 0.0));
        assert!(frustum.is_visible(&aabb));
        assert_eq!(frustum.planes, planes_before);
    }

    #[test]
    fn test_repeated_queries_are_idempotent() {
        let mut frustum = forward_frustum();
        frustum.prepare(DVec3::new(5.0, 2.0, -3.0));
        let boxes = [
            cube([4.0, 1.0, -15.0], [6.0, 3.0, -13.0]),
            cube([-50.0, 1.0, -15.0], [-48.0, 3.0, -13.0]),
            cube([4.0, 1.0, 10.0], [6.0, 3.0, 12.0]),
        ];
        let first: Vec<bool> = boxes.iter().map(|b| frustum.is_visible(b)).collect();
        for _ in 0..10 {
            let again: Vec<bool> = boxes.iter().map(|b| frustum.is_visible(b)).collect();
            assert_eq!(first, again);
        }
        assert_eq!(first, vec![true, false, false]);
    }

    #[test]
    fn test_far_from_origin_keeps_precision() {
        let mut frustum = forward_frustum();
        let camera = DVec3::new(29_999_000.25, 64.0, -29_999_000.75);
        frustum.prepare(camera);
        let near_box = Aabb::new(camera + DVec3::new(-0.5, -0.5, -3.0), camera + DVec3::new(0.5, 0.5, -2.0));
        let behind_box = Aabb::new(camera + DVec3::new(-0.5, -0.5, 2.0), camera + DVec3::new(0.5, 0.5, 3.0));
        assert_eq!(frustum.cube_in_frustum(near_box.min, near_box.max), Containment::Inside);
        assert!(!frustum.is_visible(&behind_box));
    }

    #[test]
    fn test_block_box_uses_inclusive_max() {
        let frustum = forward_frustum();
        let block = BlockBox::block(glam::IVec3::new(0, 0, -10));
        assert_eq!(
            frustum.bounding_box_in_frustum(&block),
            frustum.cube_in_frustum(DVec3::new(0.0, 0.0, -10.0), DVec3::new(1.0, 1.0, -9.0))
        );
    }

    #[test]
    fn test_degenerate_matrix_answers_intersect() {
        let frustum = Frustum::new(Mat4::ZERO, Mat4::IDENTITY);
        assert!(frustum.is_degenerate());
        assert_eq!(
            frustum.cube_in_frustum(DVec3::ZERO, DVec3::ONE),
            Containment::Intersect
        );
        assert_eq!(frustum.frustum_points(), Err(FrustumError::Degenerate));

        let nan = Frustum::new(Mat4::from_diagonal(Vec4::splat(f32::NAN)), Mat4::IDENTITY);
        assert!(nan.is_degenerate());
    }

    #[test]
    fn test_wide_orthographic_is_not_degenerate() {
        // Column scale around 1e-5 puts the raw determinant near 1e-15
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let projection = Mat4::orthographic_rh_gl(-1e5, 1e5, -1e5, 1e5, 0.1, 1e5);
        let mut frustum = Frustum::new(view, projection);
        assert!(!frustum.is_degenerate());

        frustum.prepare(DVec3::ZERO);
        assert!(frustum.contains_point(DVec3::new(5e4, 0.0, -10.0)));
        assert!(matches!(
            frustum.cube_in_frustum(DVec3::new(0.0, 0.0, 10.0), DVec3::new(1.0, 1.0, 11.0)),
            Containment::Outside(_)
        ));

        let scaled = Frustum::new(Mat4::from_scale(Vec3::splat(1e-6)), Mat4::IDENTITY);
        assert!(!scaled.is_degenerate());
        // Nearly parallel columns stay degenerate at any scale
        let sheared = Mat4::from_cols(Vec4::X, Vec4::new(1.0, 1e-8, 0.0, 0.0), Vec4::Z, Vec4::W);
        assert!(Frustum::new(sheared, Mat4::IDENTITY).is_degenerate());
    }

    #[test]
    fn test_degenerate_offset_keeps_camera() {
        let mut frustum = Frustum::new(Mat4::ZERO, Mat4::IDENTITY);
        frustum.prepare(DVec3::new(3.0, 4.0, 5.0));
        let offset = frustum.offset_to_fully_include_camera_cube(16);
        assert_eq!(offset.camera(), DVec3::new(3.0, 4.0, 5.0));
        assert_eq!(
            frustum.try_offset_to_fully_include_camera_cube(16),
            Err(FrustumError::Degenerate)
        );
    }

    #[test]
    fn test_frustum_points_span_near_and_far() {
        let frustum = forward_frustum();
        let points = frustum.frustum_points().expect("invertible");
        for near in &points[..4] {
            assert!((near.z + 0.1).abs() < 1e-3, "near z {}", near.z);
        }
        for far in &points[4..] {
            assert!((far.z + 100.0).abs() < 0.5, "far z {}", far.z);
        }
        // Far corners are spread wider than near corners
        assert!(points[6].x > points[2].x);
    }

    #[test]
    fn test_contains_point_and_sphere() {
        let frustum = forward_frustum();
        assert!(frustum.contains_point(DVec3::new(0.0, 0.0, -5.0)));
        assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, 5.0)));

        assert_eq!(
            frustum.sphere_in_frustum(DVec3::new(0.0, 0.0, -20.0), 1.0),
            Containment::Inside
        );
        assert!(matches!(
            frustum.sphere_in_frustum(DVec3::new(0.0, 0.0, 20.0), 1.0),
            Containment::Outside(_)
        ));
    }

    #[test]
    fn test_offset_includes_camera_cube() {
        let mut frustum = forward_frustum();
        let camera = DVec3::new(8.5, 64.3, 8.7);
        frustum.prepare(camera);

        let steps = frustum
            .try_offset_to_fully_include_camera_cube(16)
            .expect("perspective walk converges");
        assert!(steps > 0 && steps <= MAX_OFFSET_STEPS);

        // Walked back along +Z, the camera's original cell is now inside
        assert!(frustum.camera().z > camera.z);
        assert_eq!(frustum.camera().x, camera.x);
        assert_eq!(
            frustum.cube_in_frustum(DVec3::new(0.0, 64.0, 0.0), DVec3::new(16.0, 80.0, 16.0)),
            Containment::Inside
        );
    }

    #[test]
    fn test_offset_by_value_leaves_original() {
        let mut frustum = forward_frustum();
        frustum.prepare(DVec3::new(8.5, 64.3, 8.7));
        let offset = frustum.offset_to_fully_include_camera_cube(8);
        assert_eq!(frustum.camera(), DVec3::new(8.5, 64.3, 8.7));
        assert_ne!(offset.camera(), frustum.camera());
    }

    #[test]
    fn test_offset_gives_up_on_orthographic() {
        // An orthographic window narrower than the cube never contains it
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let projection = Mat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, 0.1, 1000.0);
        let mut frustum = Frustum::new(view, projection);
        let camera = DVec3::new(3.0, 3.0, 3.0);
        frustum.prepare(camera);

        let result = frustum.try_offset_to_fully_include_camera_cube(16);
        assert_eq!(
            result,
            Err(FrustumError::OffsetDidNotConverge {
                steps: MAX_OFFSET_STEPS
            })
        );
        assert_eq!(frustum.camera(), camera);

        let fallback = frustum.offset_to_fully_include_camera_cube(16);
        assert_eq!(fallback.camera(), camera);
    }

    #[test]
    fn test_offset_rejects_zero_view_vector() {
        // Row 2 is (0, 0, 0, 1): invertible, but no forward direction
        let matrix = Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::W, Vec4::Z);
        let mut frustum = Frustum::new(Mat4::IDENTITY, matrix);
        assert!(!frustum.is_degenerate());
        frustum.prepare(DVec3::splat(0.5));

        assert_eq!(
            frustum.try_offset_to_fully_include_camera_cube(1),
            Err(FrustumError::ZeroViewVector)
        );
        assert_eq!(frustum.camera(), DVec3::splat(0.5));
    }
}
