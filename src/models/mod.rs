//! Core data models for the point catalog.

pub mod point;

pub use point::{Location, PointOfInterest};
