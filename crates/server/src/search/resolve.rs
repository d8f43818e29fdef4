//! Practitioner identifier resolution
//!
//! Callers may supply either the server-assigned resource ID (UUID-shaped,
//! contains a hyphen) or a human identifier (a numeric personnummer). The
//! resolver maps both to the server ID. Resolution is authoritative and
//! uncached: the non-UUID path is a fresh network resolve on every call.

use crate::fhir::FhirClient;

/// True when the input is already a server-assigned resource ID
fn is_server_id(input: &str) -> bool {
    input.contains('-')
}

/// Resolve a practitioner identifier to the server-assigned resource ID.
///
/// Returns `None` on zero matches or any fetch failure; never errors past
/// this boundary.
pub async fn resolve_practitioner(fhir: &FhirClient, input: &str) -> Option<String> {
    if is_server_id(input) {
        // Already resolved. Strip a route-style prefix and return as-is,
        // without a network call.
        let id = input.strip_prefix("Practitioner/").unwrap_or(input);
        return Some(id.to_string());
    }

    match fhir.search_practitioners_by_identifier(input).await {
        Ok(bundle) => {
            // First matching entry wins.
            let resolved = bundle
                .first_resource()
                .and_then(|r| r.id.clone());
            if resolved.is_none() {
                tracing::warn!(identifier = %input, "No practitioner found for identifier");
            }
            resolved
        }
        Err(err) => {
            tracing::warn!(identifier = %input, error = %err, "Practitioner identifier lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // The hyphen path must not touch the network: a client pointing at an
    // unroutable address still resolves instantly.
    #[tokio::test]
    async fn server_id_passes_through_without_network() {
        let fhir = FhirClient::new("http://127.0.0.1:1/fhir", Duration::from_millis(100));
        let id = "30681750-1667-311a-a3e3-878ae10a35bb";
        assert_eq!(resolve_practitioner(&fhir, id).await.as_deref(), Some(id));
    }

    #[tokio::test]
    async fn server_id_prefix_is_stripped() {
        let fhir = FhirClient::new("http://127.0.0.1:1/fhir", Duration::from_millis(100));
        let resolved =
            resolve_practitioner(&fhir, "Practitioner/30681750-1667-311a-a3e3-878ae10a35bb").await;
        assert_eq!(
            resolved.as_deref(),
            Some("30681750-1667-311a-a3e3-878ae10a35bb")
        );
    }

    #[tokio::test]
    async fn identifier_lookup_failure_degrades_to_none() {
        // Unroutable upstream: the identifier path must swallow the error.
        let fhir = FhirClient::new("http://127.0.0.1:1/fhir", Duration::from_millis(100));
        assert_eq!(resolve_practitioner(&fhir, "9999994392").await, None);
    }
}
