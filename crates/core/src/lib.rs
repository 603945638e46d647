//! `designdiff-core`: domain model for design-vs-website comparisons.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! comparisons, the discrepancies found in them, comments on discrepancies and
//! the project audit trail.

pub mod activity;
pub mod comment;
pub mod comparison;
pub mod discrepancy;
pub mod entity;
pub mod error;
pub mod id;

pub use activity::{Activity, ActivityType};
pub use comment::Comment;
pub use comparison::{Comparison, ComparisonStatus};
pub use discrepancy::{
    Coordinates, Discrepancy, DiscrepancyPriority, DiscrepancyStatus, DiscrepancyType,
    DiscrepancyUpdate, Shape,
};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ActivityId, CommentId, ComparisonId, DiscrepancyId, ProjectId, UserId};
