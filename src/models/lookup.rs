//! Lookup data models and API request/response types.
//!
//! This module defines:
//! - `NormalizedNumber`: canonical digit-string identity of a phone number
//! - `ClassificationType`: the verdict for a number
//! - `ContactMetadata` / `BusinessProfile`: what the messaging connection reports
//! - `LookupResult`: one verdict or one error per number
//! - Request and response bodies for the check endpoints

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::api_key::UsageInfo;

/// Suffix of the protocol identity of a user account.
const USER_JID_SUFFIX: &str = "@s.whatsapp.net";

/// A phone number reduced to digits with the country code applied.
///
/// Only constructed by the normalizer, so it is always non-empty and all digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedNumber(String);

impl NormalizedNumber {
    pub(crate) fn from_digits(digits: String) -> Self {
        debug_assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Protocol address of this number, e.g. `6281234@s.whatsapp.net`.
    pub fn jid(&self) -> String {
        format!("{}{}", self.0, USER_JID_SUFFIX)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NormalizedNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verdict for one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationType {
    NotOnWhatsapp,
    OfficialEnterprise,
    Business,
    BusinessVerified,
    BusinessProfileExists,
    BusinessHeuristic,
    Personal,
}

/// Cached contact information, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMetadata {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub notify: Option<String>,

    #[serde(default)]
    pub is_business: bool,

    #[serde(default)]
    pub is_enterprise: bool,
}

impl ContactMetadata {
    /// Saved name, falling back to the push name. Empty names are skipped.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.notify.as_deref().filter(|n| !n.is_empty()))
    }
}

/// Business profile attached to a number.
///
/// Field names follow the wire format of the messaging protocol. Only the two
/// fields the classifier reads are typed; the rest (website, email, category,
/// hours, ...) are kept in `extra` and passed through to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BusinessProfile {
    pub fn has_verified_name(&self) -> bool {
        self.verified_name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Outcome of looking up one number.
///
/// Either a classification (`exists` + `type`) or an `error` is populated,
/// never both. Use the constructors to keep it that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ClassificationType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_business_flag: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enterprise_flag: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_profile: Option<BusinessProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LookupResult {
    /// Terminal result for a number with no account.
    pub fn not_on_whatsapp(number: &NormalizedNumber) -> Self {
        Self {
            number: number.as_str().to_string(),
            exists: Some(false),
            kind: Some(ClassificationType::NotOnWhatsapp),
            is_business_flag: None,
            is_enterprise_flag: None,
            business_profile: None,
            error: None,
        }
    }

    /// Result for an existing account.
    pub fn classified(
        number: &NormalizedNumber,
        kind: ClassificationType,
        contact: &ContactMetadata,
        business_profile: Option<BusinessProfile>,
    ) -> Self {
        Self {
            number: number.as_str().to_string(),
            exists: Some(true),
            kind: Some(kind),
            is_business_flag: Some(contact.is_business),
            is_enterprise_flag: Some(contact.is_enterprise),
            business_profile,
            error: None,
        }
    }

    /// Result for a number whose lookup failed.
    pub fn failed(number: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            exists: None,
            kind: None,
            is_business_flag: None,
            is_enterprise_flag: None,
            business_profile: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Request body for `POST /bulk-check`.
///
/// Both fields are loosely typed on purpose: numbers may arrive as JSON
/// strings or numbers, and `concurrency` is coerced rather than validated.
#[derive(Debug, Default, Deserialize)]
pub struct BulkCheckRequest {
    #[serde(default)]
    pub numbers: Option<Value>,

    #[serde(default)]
    pub concurrency: Option<Value>,
}

/// Query parameters for `GET /bulk-check`.
///
/// Parsed by hand rather than through `Query` so that repeated or unexpected
/// parameters can never produce a non-JSON rejection.
#[derive(Debug, Default, PartialEq)]
pub struct BulkCheckQuery {
    /// Trimmed, non-empty entries from every `numbers` parameter, in order.
    pub numbers: Vec<String>,

    /// Last `concurrency` parameter, uncoerced.
    pub concurrency: Option<String>,
}

impl BulkCheckQuery {
    pub fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self::default();
        let Some(query) = query else {
            return parsed;
        };

        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "numbers" => parsed.numbers.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string),
                ),
                "concurrency" => parsed.concurrency = Some(value.into_owned()),
                _ => {}
            }
        }

        parsed
    }
}

/// Response body for both bulk-check routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkCheckResponse {
    pub took_ms: u64,
    pub results: Vec<LookupResult>,
    pub usage: UsageInfo,
}

/// Request body for `POST /check`.
#[derive(Debug, Default, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub number: Option<Value>,
}

/// Response body for `POST /check`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub result: LookupResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_on_whatsapp_serializes_to_three_fields() {
        let number = NormalizedNumber::from_digits("6281234567890".to_string());
        let value = serde_json::to_value(LookupResult::not_on_whatsapp(&number)).unwrap();
        assert_eq!(
            value,
            json!({"number": "6281234567890", "exists": false, "type": "not_on_whatsapp"})
        );
    }

    #[test]
    fn failed_result_carries_only_number_and_error() {
        let value = serde_json::to_value(LookupResult::failed("628", "timeout")).unwrap();
        assert_eq!(value, json!({"number": "628", "error": "timeout"}));
    }

    #[test]
    fn profile_keeps_unknown_fields() {
        let profile: BusinessProfile = serde_json::from_value(json!({
            "verified_name": "Toko Maju",
            "business_hours": {"timezone": "Asia/Jakarta"}
        }))
        .unwrap();
        assert!(profile.has_verified_name());
        assert!(profile.extra.contains_key("business_hours"));
    }

    #[test]
    fn display_name_skips_empty_saved_name() {
        let contact = ContactMetadata {
            name: Some(String::new()),
            notify: Some("Shop Owner".to_string()),
            ..Default::default()
        };
        assert_eq!(contact.display_name(), Some("Shop Owner"));
    }

    #[test]
    fn query_collects_repeated_numbers() {
        let query = BulkCheckQuery::parse(Some(
            "numbers=0812,%200813%20&numbers=0814&numbers=&concurrency=2&concurrency=4&apikey=k",
        ));
        assert_eq!(query.numbers, vec!["0812", "0813", "0814"]);
        assert_eq!(query.concurrency.as_deref(), Some("4"));

        assert_eq!(BulkCheckQuery::parse(None), BulkCheckQuery::default());
    }

    #[test]
    fn jid_appends_user_suffix() {
        let number = NormalizedNumber::from_digits("62812".to_string());
        assert_eq!(number.jid(), "62812@s.whatsapp.net");
    }
}
