pub mod basis;
pub mod error;
pub mod knots;
pub mod splines;
