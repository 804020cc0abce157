pub mod model;
pub mod ranking;
