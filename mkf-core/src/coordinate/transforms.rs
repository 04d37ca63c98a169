
use nalgebra::{Matrix3, Matrix4, Vector3, Vector6};
use crate::error::{MkfError, Result};

/// Rotation `Rx(rx) * Ry(ry) * Rz(rz)` for intrinsic x-y-z Euler angles (radians)
pub fn euler_xyz_to_rotation(angles: &Vector3<f64>) -> Matrix3<f64> {
    let [rx, ry, rz] = elementary_rotations(angles);
    rx * ry * rz
}

/// Partial derivatives of [`euler_xyz_to_rotation`] with respect to each angle
pub fn euler_xyz_partials(angles: &Vector3<f64>) -> [Matrix3<f64>; 3] {
    let [rx, ry, rz] = elementary_rotations(angles);
    let (sa, ca) = angles.x.sin_cos();
    let (sb, cb) = angles.y.sin_cos();
    let (sc, cc) = angles.z.sin_cos();

    #[rustfmt::skip]
    let drx = Matrix3::new(
        0.0, 0.0, 0.0,
        0.0, -sa, -ca,
        0.0,  ca, -sa,
    );
    #[rustfmt::skip]
    let dry = Matrix3::new(
        -sb, 0.0,  cb,
        0.0, 0.0, 0.0,
        -cb, 0.0, -sb,
    );
    #[rustfmt::skip]
    let drz = Matrix3::new(
        -sc, -cc, 0.0,
         cc, -sc, 0.0,
        0.0, 0.0, 0.0,
    );

    [drx * ry * rz, rx * dry * rz, rx * ry * drz]
}

/// Recover intrinsic x-y-z Euler angles from a rotation matrix.
///
/// At gimbal lock (`|ry| = pi/2`) the split between `rx` and `rz` is not
/// unique; `rz` is set to zero.
pub fn rotation_to_euler_xyz(r: &Matrix3<f64>) -> Vector3<f64> {
    let sb = r[(0, 2)].clamp(-1.0, 1.0);
    let ry = sb.asin();
    if sb.abs() < 1.0 - 1e-12 {
        let rx = (-r[(1, 2)]).atan2(r[(2, 2)]);
        let rz = (-r[(0, 1)]).atan2(r[(0, 0)]);
        Vector3::new(rx, ry, rz)
    } else {
        let rx = r[(2, 1)].atan2(r[(1, 1)]);
        Vector3::new(rx, ry, 0.0)
    }
}

fn elementary_rotations(angles: &Vector3<f64>) -> [Matrix3<f64>; 3] {
    let (sa, ca) = angles.x.sin_cos();
    let (sb, cb) = angles.y.sin_cos();
    let (sc, cc) = angles.z.sin_cos();

    #[rustfmt::skip]
    let rx = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0,  ca, -sa,
        0.0,  sa,  ca,
    );
    #[rustfmt::skip]
    let ry = Matrix3::new(
         cb, 0.0,  sb,
        0.0, 1.0, 0.0,
        -sb, 0.0,  cb,
    );
    #[rustfmt::skip]
    let rz = Matrix3::new(
         cc, -sc, 0.0,
         sc,  cc, 0.0,
        0.0, 0.0, 1.0,
    );
    [rx, ry, rz]
}

/// Homogeneous 4x4 rigid transform (rotation followed by translation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    matrix: Matrix4<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Build from a rotation block and translation.
    ///
    /// The caller guarantees `rotation` is orthonormal; see
    /// [`RigidTransform::from_matrix`] for a checked constructor.
    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self { matrix }
    }

    /// Build from `(tx, ty, tz, rx, ry, rz)`: translation, then Euler angles
    pub fn from_params(params: &Vector6<f64>) -> Self {
        let translation = Vector3::new(params[0], params[1], params[2]);
        let angles = Vector3::new(params[3], params[4], params[5]);
        Self::from_parts(&euler_xyz_to_rotation(&angles), &translation)
    }

    /// Checked [`RigidTransform::from_params`]
    pub fn try_from_params(params: &Vector6<f64>) -> Result<Self> {
        if params.iter().any(|v| !v.is_finite()) {
            return Err(MkfError::Numerical(format!(
                "non-finite pose parameters {:?}",
                params.as_slice()
            )));
        }
        Self::from_matrix(*Self::from_params(params).matrix())
    }

    /// Checked construction from a full homogeneous matrix
    pub fn from_matrix(matrix: Matrix4<f64>) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(MkfError::Numerical("matrix has non-finite entries".to_string()));
        }
        let candidate = Self { matrix };
        if !candidate.is_rigid(1e-6) {
            return Err(MkfError::Numerical(
                "matrix is not a rigid transform".to_string(),
            ));
        }
        Ok(candidate)
    }

    /// Flatten to `(tx, ty, tz, rx, ry, rz)`
    pub fn to_params(&self) -> Vector6<f64> {
        let t = self.translation();
        let angles = rotation_to_euler_xyz(&self.rotation());
        Vector6::new(t.x, t.y, t.z, angles.x, angles.y, angles.z)
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Map a point from the source frame into the target frame
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation() * point + self.translation()
    }

    /// `self * other`: apply `other` first, then `self`
    pub fn compose(&self, other: &RigidTransform) -> RigidTransform {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    pub fn inverse(&self) -> RigidTransform {
        let rt = self.rotation().transpose();
        let t = -(rt * self.translation());
        Self::from_parts(&rt, &t)
    }

    /// Orthonormal rotation block with determinant +1 and a `[0 0 0 1]` last row
    pub fn is_rigid(&self, tol: f64) -> bool {
        let r = self.rotation();
        let orthonormal = (r.transpose() * r - Matrix3::identity()).abs().max() <= tol;
        let proper = (r.determinant() - 1.0).abs() <= tol;
        let row = self.matrix.row(3);
        let bottom = row[0].abs() <= tol
            && row[1].abs() <= tol
            && row[2].abs() <= tol
            && (row[3] - 1.0).abs() <= tol;
        orthonormal && proper && bottom
    }

    /// Rotation angle (radians) and translation distance between two transforms
    pub fn distance_to(&self, other: &RigidTransform) -> (f64, f64) {
        let delta = self.rotation().transpose() * other.rotation();
        let cos = ((delta.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
        let angle = cos.acos();
        let offset = (self.translation() - other.translation()).norm();
        (angle, offset)
    }

    /// Row-major copy of the homogeneous matrix
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }
}
