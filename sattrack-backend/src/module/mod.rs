pub mod predict;
pub mod scheduled;
pub mod tle;
