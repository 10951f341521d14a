//! Spatial transforms.
//!
//! A node's local transform is translation / rotation / scale. Rotation is
//! always stored as a quaternion; Euler angles are only a derived view for
//! property panels (YXZ order, degrees).
//!
//! Primitives may carry a pivot offset. Rotation and scale then happen
//! about `translation + pivot` instead of the node origin:
//!
//! ```text
//! M = T(translation + pivot) · R · S · T(-pivot)
//! ```

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// Local (parent-relative) transform of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Matrix without pivot offset.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Matrix with rotation and scale applied about `pivot`.
    pub fn matrix_about(&self, pivot: Vec3) -> Mat4 {
        if pivot == Vec3::ZERO {
            return self.matrix();
        }
        Mat4::from_translation(self.translation + pivot)
            * Mat4::from_quat(self.rotation)
            * Mat4::from_scale(self.scale)
            * Mat4::from_translation(-pivot)
    }

    /// Decompose an affine matrix. Shear is discarded.
    pub fn from_matrix(m: Mat4) -> Self {
        Self::from_matrix_hinted(m, Quat::IDENTITY)
    }

    /// Decompose an affine matrix whose axes may have collapsed to zero
    /// length. Collapsed axes get scale 0 and their orientation is rebuilt
    /// from the surviving axes, or taken from `hint` when too few survive.
    pub fn from_matrix_hinted(m: Mat4, hint: Quat) -> Self {
        let translation = m.w_axis.truncate();
        let axes = [m.x_axis.truncate(), m.y_axis.truncate(), m.z_axis.truncate()];
        let lengths = Vec3::new(axes[0].length(), axes[1].length(), axes[2].length());

        if lengths.cmpgt(Vec3::splat(DEGENERATE)).all() {
            let (scale, rotation, _) = m.to_scale_rotation_translation();
            if rotation.is_finite() && scale.is_finite() {
                return Self {
                    translation,
                    rotation: rotation.normalize(),
                    scale,
                };
            }
        }

        let scale = Vec3::select(lengths.cmpgt(Vec3::splat(DEGENERATE)), lengths, Vec3::ZERO);
        Self {
            translation,
            rotation: collapsed_rotation(axes, lengths, hint),
            scale,
        }
    }

    /// Inverse of [`Transform::matrix_about`].
    pub fn from_matrix_about(m: Mat4, pivot: Vec3) -> Self {
        Self::from_matrix_about_hinted(m, pivot, Quat::IDENTITY)
    }

    /// [`Transform::from_matrix_about`] with a fallback orientation for
    /// collapsed axes.
    pub fn from_matrix_about_hinted(m: Mat4, pivot: Vec3, hint: Quat) -> Self {
        let mut t = Self::from_matrix_hinted(m, hint);
        if pivot != Vec3::ZERO {
            // m.translation = translation + pivot - R·S·pivot
            t.translation = t.translation - pivot + t.rotation * (t.scale * pivot);
        }
        t
    }

    /// Every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    /// Rotation as Euler angles in degrees (x = pitch, y = yaw, z = roll).
    pub fn euler_degrees(&self) -> Vec3 {
        let (y, x, z) = self.rotation.to_euler(EulerRot::YXZ);
        Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }

    /// Overwrite the rotation from Euler angles in degrees.
    pub fn set_euler_degrees(&mut self, degrees: Vec3) {
        self.rotation = Quat::from_euler(
            EulerRot::YXZ,
            degrees.y.to_radians(),
            degrees.x.to_radians(),
            degrees.z.to_radians(),
        );
    }

    /// Component-wise comparison with `tol` on every scalar. Rotations that
    /// are the same orientation (`q` and `-q`) compare equal.
    pub fn approx_eq(&self, other: &Transform, tol: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tol)
            && self.scale.abs_diff_eq(other.scale, tol)
            && (1.0 - self.rotation.dot(other.rotation).abs()) <= tol
    }
}

/// Axis length below which a matrix column counts as collapsed.
const DEGENERATE: f32 = 1e-6;

fn collapsed_rotation(axes: [Vec3; 3], lengths: Vec3, hint: Quat) -> Quat {
    let unit = |i: usize| (lengths[i] > DEGENERATE).then(|| axes[i] / lengths[i]);
    let rotation = match (unit(0), unit(1), unit(2)) {
        (Some(x), Some(y), _) => {
            let z = x.cross(y).normalize_or_zero();
            Quat::from_mat3(&Mat3::from_cols(x, z.cross(x), z))
        }
        (Some(x), None, Some(z)) => {
            let y = z.cross(x).normalize_or_zero();
            Quat::from_mat3(&Mat3::from_cols(x, y, x.cross(y)))
        }
        (None, Some(y), Some(z)) => {
            let x = y.cross(z).normalize_or_zero();
            Quat::from_mat3(&Mat3::from_cols(x, y, x.cross(y)))
        }
        (Some(x), None, None) => Quat::from_rotation_arc(hint * Vec3::X, x) * hint,
        (None, Some(y), None) => Quat::from_rotation_arc(hint * Vec3::Y, y) * hint,
        (None, None, Some(z)) => Quat::from_rotation_arc(hint * Vec3::Z, z) * hint,
        (None, None, None) => hint,
    };
    let rotation = rotation.normalize();
    if rotation.is_finite() {
        rotation
    } else {
        hint
    }
}

// ─── Drag delta ──────────────────────────────────────────────────────────

/// Incremental change produced by one step of a manipulation gesture.
///
/// Expressed in world space: translation is added, rotation is
/// pre-multiplied, scale is multiplied component-wise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformDelta {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for TransformDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformDelta {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn translate(v: Vec3) -> Self {
        Self {
            translation: v,
            ..Self::IDENTITY
        }
    }

    pub fn rotate(q: Quat) -> Self {
        Self {
            rotation: q,
            ..Self::IDENTITY
        }
    }

    pub fn scaled(s: Vec3) -> Self {
        Self {
            scale: s,
            ..Self::IDENTITY
        }
    }

    /// Accumulate `next` on top of `self`.
    pub fn then(self, next: TransformDelta) -> Self {
        Self {
            translation: self.translation + next.translation,
            rotation: (next.rotation * self.rotation).normalize(),
            scale: self.scale * next.scale,
        }
    }

    /// Apply to a transform whose origin acts as the pivot.
    pub fn apply(&self, t: &Transform) -> Transform {
        Transform {
            translation: t.translation + self.translation,
            rotation: (self.rotation * t.rotation).normalize(),
            scale: t.scale * self.scale,
        }
    }

    /// World-space matrix of this delta when pivoting about `center`.
    pub fn matrix_about(&self, center: Vec3) -> Mat4 {
        Mat4::from_translation(center + self.translation)
            * Mat4::from_quat(self.rotation)
            * Mat4::from_scale(self.scale)
            * Mat4::from_translation(-center)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn matrix_roundtrip() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let back = Transform::from_matrix(t.matrix());
        assert!(back.approx_eq(&t, 1e-5));
    }

    #[test]
    fn pivot_roundtrip() {
        let t = Transform {
            translation: Vec3::new(1.0, 0.0, -2.0),
            rotation: Quat::from_rotation_z(FRAC_PI_2),
            scale: Vec3::new(1.0, 3.0, 1.0),
        };
        let pivot = Vec3::new(0.5, 0.5, 0.0);
        let back = Transform::from_matrix_about(t.matrix_about(pivot), pivot);
        assert!(back.approx_eq(&t, 1e-5), "{back:?} != {t:?}");
    }

    #[test]
    fn pivot_point_stays_fixed_under_rotation() {
        let pivot = Vec3::new(1.0, 0.0, 0.0);
        let t = Transform {
            rotation: Quat::from_rotation_z(FRAC_PI_2),
            ..Transform::IDENTITY
        };
        let p = t.matrix_about(pivot).transform_point3(pivot);
        assert!(p.abs_diff_eq(pivot, 1e-5));
    }

    #[test]
    fn euler_view_roundtrip() {
        let mut t = Transform::IDENTITY;
        t.set_euler_degrees(Vec3::new(30.0, 45.0, -10.0));
        let e = t.euler_degrees();
        assert!(e.abs_diff_eq(Vec3::new(30.0, 45.0, -10.0), 1e-2), "{e:?}");
    }

    #[test]
    fn negated_quaternion_is_equal() {
        let a = Transform {
            rotation: Quat::from_rotation_x(0.3),
            ..Transform::IDENTITY
        };
        let b = Transform {
            rotation: -a.rotation,
            ..a
        };
        assert!(a.approx_eq(&b, 1e-6));
    }

    #[test]
    fn delta_about_center_matches_apply_on_origin() {
        let d = TransformDelta {
            translation: Vec3::new(2.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(0.5),
            scale: Vec3::splat(1.5),
        };
        let start = Transform::from_translation(Vec3::new(4.0, 1.0, 0.0));
        let via_matrix = Transform::from_matrix(d.matrix_about(start.translation) * start.matrix());
        assert!(via_matrix.approx_eq(&d.apply(&start), 1e-5));
    }

    #[test]
    fn delta_then_accumulates() {
        let d = TransformDelta::translate(Vec3::X).then(TransformDelta::translate(Vec3::Y));
        assert_eq!(d.translation, Vec3::new(1.0, 1.0, 0.0));
        assert!(TransformDelta::IDENTITY.is_identity());
    }

    #[test]
    fn collapsed_axis_keeps_a_finite_rotation() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 0.0),
            rotation: Quat::from_rotation_y(0.4),
            scale: Vec3::new(1.0, 0.0, 1.0),
        };
        let back = Transform::from_matrix(t.matrix());
        assert!(back.is_finite(), "{back:?}");
        assert!(back.approx_eq(&t, 1e-5), "{back:?} != {t:?}");
    }

    #[test]
    fn fully_collapsed_matrix_uses_hint() {
        let hint = Quat::from_rotation_z(0.9);
        let t = Transform {
            translation: Vec3::new(0.0, 0.0, 3.0),
            rotation: hint,
            scale: Vec3::ZERO,
        };
        let pivot = Vec3::new(0.5, 0.0, 0.0);
        let back = Transform::from_matrix_about_hinted(t.matrix_about(pivot), pivot, hint);
        assert!(back.is_finite(), "{back:?}");
        assert_eq!(back.scale, Vec3::ZERO);
        assert!(back.approx_eq(&t, 1e-5), "{back:?} != {t:?}");

        let two_gone = Transform {
            scale: Vec3::new(0.0, 0.0, 2.0),
            ..t
        };
        let back = Transform::from_matrix_hinted(two_gone.matrix(), hint);
        assert!(back.approx_eq(&two_gone, 1e-5), "{back:?} != {two_gone:?}");
    }
}
