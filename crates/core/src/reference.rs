//! Typed resource references
//!
//! A FHIR reference is a string of the form `<ResourceType>/<id>`, e.g.
//! `Patient/123`. IDs are opaque strings assigned by the external server,
//! never generated locally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReferenceError;

/// The resource kinds this system knows about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Patient,
    Practitioner,
    Encounter,
    Condition,
    CareTeam,
    Observation,
}

impl ResourceType {
    /// The type name as it appears in URLs and reference strings
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Encounter => "Encounter",
            ResourceType::Condition => "Condition",
            ResourceType::CareTeam => "CareTeam",
            ResourceType::Observation => "Observation",
        }
    }

    const ALL: [ResourceType; 6] = [
        ResourceType::Patient,
        ResourceType::Practitioner,
        ResourceType::Encounter,
        ResourceType::Condition,
        ResourceType::CareTeam,
        ResourceType::Observation,
    ];
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ReferenceError::UnknownResourceType(s.to_string()))
    }
}

/// A typed pointer to a resource on the external server
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClinicalReference {
    pub resource_type: ResourceType,
    pub id: String,
}

impl ClinicalReference {
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }
}

impl fmt::Display for ClinicalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

impl FromStr for ClinicalReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_part, id_part) = s
            .split_once('/')
            .ok_or_else(|| ReferenceError::Malformed(s.to_string()))?;
        if id_part.is_empty() {
            return Err(ReferenceError::Malformed(s.to_string()));
        }
        Ok(ClinicalReference::new(type_part.parse()?, id_part))
    }
}

/// Recover the bare ID from a raw reference string.
///
/// Strips a leading known `<ResourceType>/` prefix if one is present;
/// otherwise the whole string is treated as the ID. References that arrive
/// without a prefix (personnummer-keyed ones in particular) stay usable.
pub fn local_id(raw: &str) -> &str {
    for t in ResourceType::ALL {
        if let Some(rest) = raw.strip_prefix(t.as_str())
            && let Some(id) = rest.strip_prefix('/')
        {
            return id;
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_round_trip() {
        let r: ClinicalReference = "Patient/123".parse().unwrap();
        assert_eq!(r.resource_type, ResourceType::Patient);
        assert_eq!(r.id, "123");
        assert_eq!(r.to_string(), "Patient/123");
    }

    #[test]
    fn reference_rejects_unknown_type() {
        let err = "Medication/5".parse::<ClinicalReference>().unwrap_err();
        assert_eq!(err, ReferenceError::UnknownResourceType("Medication".into()));
    }

    #[test]
    fn reference_rejects_missing_id() {
        assert!("Patient/".parse::<ClinicalReference>().is_err());
        assert!("Patient".parse::<ClinicalReference>().is_err());
    }

    #[test]
    fn local_id_strips_known_prefix() {
        assert_eq!(local_id("Patient/123"), "123");
        assert_eq!(local_id("Practitioner/abc-def"), "abc-def");
        assert_eq!(local_id("CareTeam/ct1"), "ct1");
    }

    #[test]
    fn local_id_passes_through_unprefixed_strings() {
        assert_eq!(local_id("197001011234"), "197001011234");
        assert_eq!(local_id("Unknown/9"), "Unknown/9");
    }

    #[test]
    fn local_id_keeps_uuid_ids_intact() {
        let id = "30681750-1667-311a-a3e3-878ae10a35bb";
        assert_eq!(local_id(id), id);
    }
}
