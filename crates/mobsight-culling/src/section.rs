//! Render-section culling on top of [`Frustum`]

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

use crate::aabb::BlockBox;
use crate::frustum::Frustum;

/// Edge length of a render section in blocks.
pub const SECTION_SIZE: i32 = 16;

/// Section culling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    /// Horizontal radius in sections.
    pub render_distance: i32,
    /// Lowest section layer (inclusive).
    pub min_section_y: i32,
    /// Highest section layer (inclusive).
    pub max_section_y: i32,
    /// Cube size the camera cell is snapped to before the offset walk.
    pub camera_cube_size: u32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            render_distance: 8,
            min_section_y: -4,
            max_section_y: 19,
            camera_cube_size: 8,
        }
    }
}

/// Enumerates the sections around a camera that survive frustum culling.
#[derive(Debug, Clone)]
pub struct SectionGrid {
    config: CullingConfig,
}

impl SectionGrid {
    pub fn new(config: CullingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CullingConfig {
        &self.config
    }

    /// Section coordinate containing a world position.
    pub fn section_of(position: DVec3) -> IVec3 {
        (position / f64::from(SECTION_SIZE)).floor().as_ivec3()
    }

    /// Block range covered by a section.
    pub fn section_bounds(section: IVec3) -> BlockBox {
        let min = section * SECTION_SIZE;
        BlockBox::new(min, min + IVec3::splat(SECTION_SIZE - 1))
    }

    /// Visible sections, nearest to the camera section first.
    ///
    /// Testing happens against a copy of `frustum` pulled back so the camera's
    /// own cell is fully included; the caller's frustum is not modified.
    pub fn visible_sections(&self, frustum: &Frustum) -> Vec<IVec3> {
        let center = Self::section_of(frustum.camera());
        let culling = frustum.offset_to_fully_include_camera_cube(self.config.camera_cube_size);

        let radius = self.config.render_distance.max(0);
        let min_y = self.config.min_section_y;
        let max_y = self.config.max_section_y.max(min_y);

        let mut visible = Vec::new();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                if dx * dx + dz * dz > radius * radius {
                    continue;
                }
                for y in min_y..=max_y {
                    let section = IVec3::new(center.x + dx, y, center.z + dz);
                    let containment = culling.bounding_box_in_frustum(&Self::section_bounds(section));
                    if containment.is_visible() {
                        visible.push(section);
                    }
                }
            }
        }

        visible.sort_by_key(|section| (*section - center).length_squared());
        log::trace!(
            "Section culling kept {} sections around {:?}",
            visible.len(),
            center
        );
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    fn narrow_frustum(camera: DVec3) -> Frustum {
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let projection = Mat4::perspective_rh_gl(40f32.to_radians(), 1.0, 0.05, 512.0);
        let mut frustum = Frustum::new(view, projection);
        frustum.prepare(camera);
        frustum
    }

    fn grid() -> SectionGrid {
        SectionGrid::new(CullingConfig {
            render_distance: 4,
            min_section_y: 0,
            max_section_y: 8,
            camera_cube_size: 8,
        })
    }

    #[test]
    fn test_section_of_handles_negative_coordinates() {
        assert_eq!(SectionGrid::section_of(DVec3::new(-0.5, 15.9, 16.0)), IVec3::new(-1, 0, 1));
    }

    #[test]
    fn test_camera_section_is_visible_and_first() {
        let camera = DVec3::new(40.0, 70.0, 40.0);
        let sections = grid().visible_sections(&narrow_frustum(camera));
        let center = SectionGrid::section_of(camera);
        assert_eq!(sections.first(), Some(&center));
    }

    #[test]
    fn test_sections_behind_camera_are_culled() {
        let camera = DVec3::new(40.0, 70.0, 40.0);
        let sections = grid().visible_sections(&narrow_frustum(camera));
        let center = SectionGrid::section_of(camera);

        // Looking down -Z: nothing three sections behind the camera survives
        assert!(sections.iter().all(|s| s.z < center.z + 3));
        assert!(sections.iter().any(|s| s.z < center.z - 1));
    }

    #[test]
    fn test_degenerate_frustum_keeps_every_section() {
        let mut frustum = Frustum::new(Mat4::ZERO, Mat4::IDENTITY);
        let camera = DVec3::new(40.0, 70.0, 40.0);
        frustum.prepare(camera);

        let sections = grid().visible_sections(&frustum);
        // 49 columns inside radius 4, nine sections tall
        assert_eq!(sections.len(), 49 * 9);
        assert_eq!(sections.first(), Some(&SectionGrid::section_of(camera)));
    }

    #[test]
    fn test_sections_sorted_nearest_first() {
        let camera = DVec3::new(40.0, 70.0, 40.0);
        let sections = grid().visible_sections(&narrow_frustum(camera));
        let center = SectionGrid::section_of(camera);
        let distances: Vec<i32> = sections
            .iter()
            .map(|s| (*s - center).length_squared())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }
}
