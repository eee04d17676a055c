//! Business account classification.
//!
//! # Decision Procedure
//!
//! 1. No account for the number → `not_on_whatsapp`, stop.
//! 2. Contact flags seed the type: enterprise → `official_enterprise`,
//!    business → `business`.
//! 3. A business profile with a verified name → `business_verified`, replacing
//!    the seed. A profile without one → `business_profile_exists` if unset.
//! 4. Still unset: keyword heuristic over the contact name and profile
//!    description → `business_heuristic`, otherwise `personal`.
//!
//! The existence query is mandatory: its failure turns the whole lookup into
//! an error result. The profile query is enrichment: its failure counts as
//! "no profile".

use crate::connection::WhatsAppConnection;
use crate::models::lookup::{
    BusinessProfile, ClassificationType, ContactMetadata, LookupResult, NormalizedNumber,
};
use crate::services::normalizer;

/// Lower-case substrings that suggest a business account.
pub const BUSINESS_KEYWORDS: [&str; 7] = [
    "official",
    "business",
    "store",
    "shop",
    "toko",
    "co.",
    "enterprise",
];

/// Error reported for input that has no digits.
pub const INVALID_NUMBER: &str = "invalid_number";

/// Classify one normalized number.
pub async fn classify(
    connection: &dyn WhatsAppConnection,
    number: &NormalizedNumber,
) -> LookupResult {
    let jid = number.jid();

    let exists = match connection.number_exists(&jid).await {
        Ok(exists) => exists,
        Err(e) => {
            tracing::warn!(number = %number, error = %e, "existence check failed");
            return LookupResult::failed(number.as_str(), e.to_string());
        }
    };

    if !exists {
        return LookupResult::not_on_whatsapp(number);
    }

    let contact = connection.contact_metadata(&jid).await;

    let profile = match connection.business_profile(&jid).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::debug!(number = %number, error = %e, "business profile unavailable");
            None
        }
    };

    let kind = decide(&contact, profile.as_ref());
    LookupResult::classified(number, kind, &contact, profile)
}

/// Normalize `raw` and classify it; unparseable input yields an error result.
pub async fn check_single(
    connection: &dyn WhatsAppConnection,
    raw: &str,
    country_code: &str,
) -> LookupResult {
    match normalizer::normalize(raw, country_code) {
        Some(number) => classify(connection, &number).await,
        None => LookupResult::failed(raw, INVALID_NUMBER),
    }
}

/// Steps 2–4 of the decision procedure for an existing account.
pub fn decide(contact: &ContactMetadata, profile: Option<&BusinessProfile>) -> ClassificationType {
    let mut kind = if contact.is_enterprise {
        Some(ClassificationType::OfficialEnterprise)
    } else if contact.is_business {
        Some(ClassificationType::Business)
    } else {
        None
    };

    if let Some(profile) = profile {
        if profile.has_verified_name() {
            kind = Some(ClassificationType::BusinessVerified);
        } else if kind.is_none() {
            kind = Some(ClassificationType::BusinessProfileExists);
        }
    }

    kind.unwrap_or_else(|| {
        let name = contact.display_name().unwrap_or_default();
        let description = profile
            .and_then(|p| p.description.as_deref())
            .unwrap_or_default();
        heuristic(name, description)
    })
}

/// Keyword fallback over the display name and profile description.
pub fn heuristic(name: &str, description: &str) -> ClassificationType {
    if mentions_business(name) || mentions_business(description) {
        ClassificationType::BusinessHeuristic
    } else {
        ClassificationType::Personal
    }
}

fn mentions_business(text: &str) -> bool {
    let text = text.to_lowercase();
    BUSINESS_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}
