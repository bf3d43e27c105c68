pub mod core;
pub mod courses;
pub mod nav;
pub mod results;
pub mod session;
pub mod students;
