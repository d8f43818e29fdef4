//! journal-core: Shared FHIR R4 wire types and utilities
//!
//! This crate provides the lenient resource model used across the journal
//! server: Bundle, FhirResource and its components, and typed resource
//! references. All read-path types tolerate absent fields, since the
//! external FHIR server is the source of truth and routinely returns
//! partial resources.

pub mod bundle;
pub mod error;
pub mod reference;
pub mod resource;

pub use bundle::{Bundle, BundleEntry, BundleType};
pub use error::ReferenceError;
pub use reference::{ClinicalReference, ResourceType, local_id};
pub use resource::{
    CodeableConcept, Coding, FhirResource, HumanName, Identifier, Participant, Period, Quantity,
    Reference,
};
