use glam::{Mat4, Vec3};

/// Orbit camera around a target point.
///
/// Right-handed, +Y up, depth in `[0, 1]` as wgpu expects.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

const PITCH_LIMIT: f32 = 1.4;
const DISTANCE_RANGE: (f32, f32) = (0.5, 100.0);

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: 0.25,
            distance: 12.0,
            target: Vec3::ZERO,
            fov_y: 35f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn position(&self) -> Vec3 {
        self.target
            + Vec3::new(
                self.distance * self.yaw.cos() * self.pitch.cos(),
                self.distance * self.pitch.sin(),
                self.distance * self.yaw.sin() * self.pitch.cos(),
            )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn proj_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.proj_matrix(aspect) * self.view_matrix()
    }

    /// Rotates around the target; pitch stays short of the poles.
    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Moves toward (`delta > 0`) or away from the target.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).clamp(DISTANCE_RANGE.0, DISTANCE_RANGE.1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn target_projects_to_screen_centre() {
        let cam = Camera::default();
        let clip = cam.view_projection(16.0 / 9.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1.0e-5 && ndc.y.abs() < 1.0e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn position_keeps_distance() {
        let mut cam = Camera::default();
        cam.orbit(0.7, 0.3);
        assert!((cam.position().distance(cam.target) - cam.distance).abs() < 1.0e-4);
    }

    #[test]
    fn pitch_and_zoom_are_clamped() {
        let mut cam = Camera::default();
        cam.orbit(0.0, 10.0);
        cam.zoom(1000.0);
        assert_eq!(cam.pitch, PITCH_LIMIT);
        assert_eq!(cam.distance, DISTANCE_RANGE.0);
    }

    #[test]
    fn degenerate_aspect_falls_back() {
        let cam = Camera::default();
        assert_eq!(cam.proj_matrix(0.0), cam.proj_matrix(1.0));
    }
}
