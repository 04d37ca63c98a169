//! Rigid coordinate transformations between camera frames

mod transforms;

pub use transforms::{
    euler_xyz_partials, euler_xyz_to_rotation, rotation_to_euler_xyz,
    RigidTransform,
};
