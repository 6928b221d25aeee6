pub mod assembly;
pub mod common;
pub mod cylinder;
pub mod job;
pub mod report;
pub mod spec;
pub mod user_context;

pub use assembly::*;
pub use common::*;
pub use cylinder::*;
pub use job::*;
pub use report::*;
pub use spec::*;
pub use user_context::*;
