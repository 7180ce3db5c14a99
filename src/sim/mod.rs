pub mod growth;
pub mod insolation;
pub mod occlusion;
pub mod progress;
pub mod sampling;
pub mod solar;
