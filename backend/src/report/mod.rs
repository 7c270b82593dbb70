pub mod narrative;
pub mod pdf;
