pub mod aggregate;
pub mod core;
pub mod rubric;
pub mod whatif;
