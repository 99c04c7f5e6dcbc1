pub mod applications;
pub mod browse;
pub mod catalog;
pub mod pricing;
