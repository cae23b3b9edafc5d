pub mod regions;
pub mod sampling;
pub mod search;
