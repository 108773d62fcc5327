pub mod forest;
pub mod tree;

pub use forest::{ForestParams, RandomForest};
