//! Texture analysis and site planning.
//!
//! The gradient map scores how textured each pixel is; the planner turns
//! those scores into an ordered list of writable sites.

mod gradient;
mod planner;

pub use gradient::{GradientMap, MAX_SCORE};
pub use planner::{AdaptiveParams, CapacityPlanner, PlanError, Site, SitePlan};
