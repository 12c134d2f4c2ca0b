//! Pipeline orchestration for asset onboarding.
//!
//! This crate ties payload validation, token exchange, repository lookup,
//! transformation, id-map derivation, and storage into one call:
//! [`Onboarder::onboard`].

pub mod pipeline;
pub mod validation;

pub use pipeline::{Backends, OnboardingRequest, Onboarder, PipelineOutcome, Stage};
pub use validation::{SUPPORTED_CONTENT_TYPES, Violation, media_type, validate};
