pub mod columns;
pub mod record;

pub use columns::*;
pub use record::*;
