//! Research orchestration for LeadScout.
//!
//! This crate turns an organization name into a scored contact list:
//! search rounds and domain discovery come from `leadscout-discovery`, site
//! crawling from `leadscout-crawler`, and everything after that lives here.
//!
//! - [`job`] runs one organization through every stage
//! - [`queue`] serializes jobs behind a single worker
//! - [`extraction`] is the boundary to the contact extraction service
//! - [`patterns`] infers the organization's email naming convention
//! - [`scoring`] deduplicates and ranks the final contacts

pub mod extraction;
pub mod job;
pub mod patterns;
pub mod queue;
pub mod scoring;

#[cfg(test)]
mod testing;

pub use extraction::{ContactCandidate, ContactExtractor, NoopExtractor, OpenRouterExtractor};
pub use job::{ResearchJob, ResearchReporter, ResearchServices, Stage};
pub use patterns::{EmailPatternDetector, EmailTemplate, FirstMatchDetector};
pub use queue::ResearchQueue;
