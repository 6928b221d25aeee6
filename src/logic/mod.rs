pub mod assembly;
pub mod cylinders;
pub mod jobs;
pub mod reports;
pub mod specs;
pub mod validate;

pub use assembly::*;
pub use cylinders::*;
pub use jobs::*;
pub use reports::*;
pub use specs::*;
