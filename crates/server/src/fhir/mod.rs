//! External FHIR server integration

pub mod client;
pub mod mapper;

pub use client::{FhirApiError, FhirClient};
