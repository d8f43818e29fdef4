use serde::{Deserialize, Serialize};

use crate::resource::FhirResource;

/// FHIR Bundle types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Searchset,
    History,
    Collection,
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
}

/// FHIR Bundle resource (simplified for search responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

/// A single entry in a bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<FhirResource>,
}

impl BundleEntry {
    pub fn new(full_url: Option<String>, resource: FhirResource) -> Self {
        Self {
            full_url,
            resource: Some(resource),
        }
    }
}

impl Bundle {
    /// Create a searchset bundle
    pub fn searchset(total: u32, entries: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            bundle_type: BundleType::Searchset,
            total: Some(total),
            entry: entries,
        }
    }

    /// An empty searchset, the degraded result of a failed upstream fetch
    pub fn empty() -> Self {
        Self::searchset(0, Vec::new())
    }

    /// Iterate over the entry resources
    pub fn resources(&self) -> impl Iterator<Item = &FhirResource> {
        self.entry.iter().filter_map(|e| e.resource.as_ref())
    }

    /// The first entry's resource, if any
    pub fn first_resource(&self) -> Option<&FhirResource> {
        self.resources().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_searchset_with_entries() {
        let bundle: Bundle = serde_json::from_str(
            r#"{
                "resourceType": "Bundle",
                "type": "searchset",
                "total": 1,
                "entry": [
                    {"fullUrl": "http://fhir/Patient/123",
                     "resource": {"resourceType": "Patient", "id": "123"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(bundle.bundle_type, BundleType::Searchset);
        assert_eq!(bundle.total, Some(1));
        assert_eq!(
            bundle.first_resource().and_then(|r| r.id.as_deref()),
            Some("123")
        );
    }

    #[test]
    fn missing_entry_list_yields_no_resources() {
        let bundle: Bundle =
            serde_json::from_str(r#"{"resourceType": "Bundle", "type": "searchset"}"#).unwrap();
        assert_eq!(bundle.resources().count(), 0);
        assert!(bundle.first_resource().is_none());
    }
}
