//! Solar access analysis and insolation-constrained volumetric growth.
//!
//! The crate samples the sun over an analysis window ([`SunPath`]), casts rays
//! from facade and ground points against obstacle geometry
//! ([`ObstacleScene`]), classifies the resulting free/blocked sequences with a
//! regulatory insolation rule ([`evaluate`]) and grows the largest voxel
//! volume over a site that keeps every protected point's verdict
//! ([`PotentialGrowth`]).

pub mod config;
pub mod error;
pub mod geom;
pub mod io;
pub mod sim;
mod uid;

// Prelude
pub use config::AnalysisConfig;
pub use error::InputError;
pub use geom::footprint::Footprint;
pub use geom::mesh::Mesh;
pub use geom::point::Point;
pub use geom::transform::Transform;
pub use geom::vector::Vector;
pub use sim::growth::{GrowthConfig, GrowthOutcome, GrowthResult, PotentialGrowth};
pub use sim::insolation::{
    InsolationNorm, InsolationVerdict, ParentStatus, QueryPoint, Status, evaluate,
};
pub use sim::occlusion::{
    ObstacleScene, ObstacleSurface, OcclusionConfig, OcclusionTester, SelfIntersectionGuard,
};
pub use sim::progress::{CancelFlag, Progress};
pub use sim::sampling::{SampleFace, SamplingConfig, SunHoursRecord};
pub use sim::solar::{GeoLocation, SolarPosition, SunPath, SunPathConfig};
pub use uid::UID;
