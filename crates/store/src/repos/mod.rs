//! Repository traits for cache operations.

pub mod arrays;
pub mod maintenance;
pub mod scalars;

pub use arrays::ArrayRepo;
pub use maintenance::MaintenanceRepo;
pub use scalars::ScalarRepo;
