//! Per-frame pose processing.
//!
//! - [`schema`]: static backend keypoint tables
//! - [`adapter`]: backend detection to partial canonical skeleton
//! - [`ball`]: image-level ball locator
//! - [`fusion`]: multi-backend fusion into one skeleton
//! - [`angles`]: biomechanical angles of a fused skeleton

pub mod adapter;
pub mod angles;
pub mod ball;
pub mod fusion;
pub mod schema;

pub use adapter::{adapt_detection, BackendProfile, BackendRegistry, WeightedSkeleton};
pub use angles::{
    direction_angle, joint_angle, shooting_side, vertical_displacement, AngleComputer,
    DisplacementReference,
};
pub use ball::{BallLocator, BALL_SOURCE};
pub use fusion::{PoseFusionEngine, DERIVED_SOURCE};
pub use schema::{BackendSchema, BuiltinSchema, CoordinateSpace, SchemaEntry, SchemaSource};
