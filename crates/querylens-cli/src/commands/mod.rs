pub mod compare;
pub mod config;
pub mod explain;
pub mod extract;
pub mod normalize;
pub mod stats;
