//! Parsing and validation of classification service output.
//!
//! The service is untrusted: its payload is parsed into typed line items,
//! then checked against the buyer's partner and the category catalog.
//! Any deviation fails the whole job; nothing is partially accepted.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::apportion::{ApportionMode, Apportionment};
use crate::submission::{max_amount, round_money};
use crate::types::{DbId, Money};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One categorized amount extracted from a job's prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLineItem {
    pub amount: Money,
    pub description: String,
    /// Category name as reported by the service, trimmed.
    pub category: String,
    pub mode: ApportionMode,
}

/// A parsed classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_ambiguous: bool,
    /// Only kept when `is_ambiguous` is set and the reason is not blank.
    pub ambiguity_reason: Option<String>,
    pub items: Vec<ClassifiedLineItem>,
}

/// A line item whose category and apportionment have been resolved to
/// persistence values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLineItem {
    pub amount: Money,
    pub description: String,
    pub category_id: DbId,
    pub apportionment: Apportionment,
}

/// Why a classification result was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassificationError {
    #[error("Classification response is malformed: {0}")]
    Malformed(String),

    #[error("Line item {index} is invalid: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    #[error(
        "Line item {index} uses apportionment '{mode}' but the buyer has no settlement partner"
    )]
    PartnerRequired { index: usize, mode: ApportionMode },

    #[error("Unknown categories: {}", .0.join(", "))]
    UnresolvedCategories(Vec<String>),
}

// ---------------------------------------------------------------------------
// Raw payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    is_ambiguous: bool,
    #[serde(default)]
    ambiguity_reason: Option<String>,
    items: Vec<RawLineItem>,
}

#[derive(Debug, Deserialize)]
struct RawLineItem {
    apportion_mode: String,
    category: String,
    amount: Value,
    description: String,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a structured payload into a [`Classification`].
///
/// Every line item must carry a known apportionment mode, a non-blank
/// category and description, and an amount that is strictly positive
/// once rounded to cents and fits a stored amount.
pub fn parse_classification(payload: &Value) -> Result<Classification, ClassificationError> {
    let raw: RawClassification = serde_json::from_value(payload.clone())
        .map_err(|e| ClassificationError::Malformed(e.to_string()))?;

    let items = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_line_item(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    let ambiguity_reason = if raw.is_ambiguous {
        raw.ambiguity_reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
    } else {
        None
    };

    Ok(Classification {
        is_ambiguous: raw.is_ambiguous,
        ambiguity_reason,
        items,
    })
}

fn parse_line_item(index: usize, raw: RawLineItem) -> Result<ClassifiedLineItem, ClassificationError> {
    let invalid = |reason: String| ClassificationError::InvalidLineItem { index, reason };

    let mode = ApportionMode::parse(&raw.apportion_mode).ok_or_else(|| {
        invalid(format!("unknown apportion_mode '{}'", raw.apportion_mode))
    })?;

    let category = raw.category.trim();
    if category.is_empty() {
        return Err(invalid("category is empty".into()));
    }

    let description = raw.description.trim();
    if description.is_empty() {
        return Err(invalid("description is empty".into()));
    }

    let amount = parse_amount(&raw.amount)
        .map(round_money)
        .ok_or_else(|| invalid(format!("amount {} is not a number", raw.amount)))?;
    if amount <= Money::ZERO {
        return Err(invalid(format!("amount {amount} is not positive")));
    }
    if amount > max_amount() {
        return Err(invalid(format!("amount {amount} exceeds {}", max_amount())));
    }

    Ok(ClassifiedLineItem {
        amount,
        description: description.to_string(),
        category: category.to_string(),
        mode,
    })
}

/// Accept JSON numbers and numeric strings. Numbers are parsed from their
/// textual form so `12.3` stays exactly `12.3`.
fn parse_amount(value: &Value) -> Option<Money> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Money::from_str(&text)
                .or_else(|_| Money::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Money::from_str(s.trim()).ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Normalized lookup key for a category name: trimmed and lowercased.
pub fn category_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Classification {
    /// Sum of all line item amounts.
    pub fn total(&self) -> Money {
        self.items.iter().map(|i| i.amount).sum()
    }

    /// Distinct category lookup keys, in first-seen order.
    pub fn category_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let key = category_key(&item.category);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Check every line item's mode against the presence of a partner.
    pub fn validate_apportionment(&self, partner: Option<DbId>) -> Result<(), ClassificationError> {
        if partner.is_some() {
            return Ok(());
        }
        match self.items.iter().position(|i| i.mode.requires_partner()) {
            Some(index) => Err(ClassificationError::PartnerRequired {
                index,
                mode: self.items[index].mode,
            }),
            None => Ok(()),
        }
    }

    /// Resolve every line item against `partner` and a category catalog
    /// keyed by [`category_key`].
    ///
    /// All unresolved names are reported together.
    pub fn resolve(
        self,
        partner: Option<DbId>,
        catalog: &HashMap<String, DbId>,
    ) -> Result<Vec<ResolvedLineItem>, ClassificationError> {
        self.validate_apportionment(partner)?;

        let mut unresolved: Vec<String> = Vec::new();
        for item in &self.items {
            if !catalog.contains_key(&category_key(&item.category))
                && !unresolved.contains(&item.category)
            {
                unresolved.push(item.category.clone());
            }
        }
        if !unresolved.is_empty() {
            return Err(ClassificationError::UnresolvedCategories(unresolved));
        }

        self.items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let category_id = catalog[&category_key(&item.category)];
                let apportionment = item
                    .mode
                    .apportion(partner)
                    .ok_or(ClassificationError::PartnerRequired {
                        index,
                        mode: item.mode,
                    })?;
                Ok(ResolvedLineItem {
                    amount: item.amount,
                    description: item.description,
                    category_id,
                    apportionment,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    const PARTNER: DbId = 2;

    fn catalog() -> HashMap<String, DbId> {
        HashMap::from([("groceries".to_string(), 10), ("transport".to_string(), 11)])
    }

    fn two_items() -> Value {
        json!({
            "is_ambiguous": false,
            "ambiguity_reason": null,
            "items": [
                {"apportion_mode": "shared", "category": "Groceries", "amount": 50.0, "description": "weekly groceries"},
                {"apportion_mode": "alone", "category": "Transport", "amount": 25.0, "description": "bus ticket"}
            ]
        })
    }

    #[test]
    fn parses_well_formed_payload() {
        let c = parse_classification(&two_items()).unwrap();
        assert!(!c.is_ambiguous);
        assert_eq!(c.items.len(), 2);
        assert_eq!(c.items[0].mode, ApportionMode::Shared);
        assert_eq!(c.items[0].amount, Money::new(5000, 2));
        assert_eq!(c.items[1].category, "Transport");
        assert_eq!(c.total(), Money::new(7500, 2));
    }

    #[test]
    fn empty_item_list_is_valid() {
        let c = parse_classification(&json!({"items": []})).unwrap();
        assert!(c.items.is_empty());
        assert_eq!(c.resolve(None, &catalog()).unwrap(), vec![]);
    }

    #[test]
    fn missing_items_is_malformed() {
        assert_matches!(
            parse_classification(&json!({"is_ambiguous": true})),
            Err(ClassificationError::Malformed(_))
        );
        assert_matches!(
            parse_classification(&json!("not an object")),
            Err(ClassificationError::Malformed(_))
        );
    }

    #[test]
    fn unknown_mode_is_rejected_with_index() {
        let payload = json!({"items": [
            {"apportion_mode": "alone", "category": "Groceries", "amount": 1, "description": "a"},
            {"apportion_mode": "half", "category": "Groceries", "amount": 1, "description": "b"}
        ]});
        assert_matches!(
            parse_classification(&payload),
            Err(ClassificationError::InvalidLineItem { index: 1, .. })
        );
    }

    #[test]
    fn non_positive_or_non_numeric_amounts_are_rejected() {
        for amount in [json!(0), json!(-3.5), json!("lots"), json!(null)] {
            let payload = json!({"items": [
                {"apportion_mode": "alone", "category": "Groceries", "amount": amount, "description": "x"}
            ]});
            assert_matches!(
                parse_classification(&payload),
                Err(ClassificationError::InvalidLineItem { index: 0, .. })
            );
        }
    }

    #[test]
    fn amount_too_large_to_store_is_rejected() {
        let payload = json!({"items": [
            {"apportion_mode": "alone", "category": "Groceries", "amount": 10, "description": "milk"},
            {"apportion_mode": "alone", "category": "Transport", "amount": 99_999_999_999_999i64, "description": "jet"}
        ]});
        assert_matches!(
            parse_classification(&payload),
            Err(ClassificationError::InvalidLineItem { index: 1, reason }) if reason.contains("exceeds")
        );

        let payload = json!({"items": [
            {"apportion_mode": "alone", "category": "Groceries", "amount": "9999999999.99", "description": "house"}
        ]});
        assert!(parse_classification(&payload).is_ok());
    }

    #[test]
    fn numeric_string_amount_is_accepted() {
        let payload = json!({"items": [
            {"apportion_mode": "alone", "category": "Groceries", "amount": "12.30", "description": "x"}
        ]});
        let c = parse_classification(&payload).unwrap();
        assert_eq!(c.items[0].amount, Money::new(1230, 2));
    }

    #[test]
    fn blank_description_is_rejected() {
        let payload = json!({"items": [
            {"apportion_mode": "alone", "category": "Groceries", "amount": 3, "description": "  "}
        ]});
        assert_matches!(
            parse_classification(&payload),
            Err(ClassificationError::InvalidLineItem { index: 0, .. })
        );
    }

    #[test]
    fn ambiguity_reason_only_kept_when_ambiguous() {
        let c = parse_classification(&json!({
            "is_ambiguous": false, "ambiguity_reason": "ignored", "items": []
        }))
        .unwrap();
        assert_eq!(c.ambiguity_reason, None);

        let c = parse_classification(&json!({
            "is_ambiguous": true, "ambiguity_reason": " which card? ", "items": []
        }))
        .unwrap();
        assert!(c.is_ambiguous);
        assert_eq!(c.ambiguity_reason.as_deref(), Some("which card?"));
    }

    #[test]
    fn resolve_maps_categories_and_apportionment() {
        let c = parse_classification(&two_items()).unwrap();
        let resolved = c.resolve(Some(PARTNER), &catalog()).unwrap();

        assert_eq!(resolved[0].category_id, 10);
        assert_eq!(resolved[0].apportionment.shared_with, Some(PARTNER));
        assert!(!resolved[0].apportionment.takes_all);

        assert_eq!(resolved[1].category_id, 11);
        assert_eq!(resolved[1].apportionment.shared_with, None);
    }

    #[test]
    fn partner_mode_without_partner_fails() {
        let c = parse_classification(&two_items()).unwrap();
        assert_matches!(
            c.validate_apportionment(None),
            Err(ClassificationError::PartnerRequired { index: 0, mode: ApportionMode::Shared })
        );
        assert_matches!(
            c.resolve(None, &catalog()),
            Err(ClassificationError::PartnerRequired { .. })
        );
    }

    #[test]
    fn unresolved_categories_are_all_reported() {
        let payload = json!({"items": [
            {"apportion_mode": "alone", "category": "Yachts", "amount": 1, "description": "a"},
            {"apportion_mode": "alone", "category": "groceries", "amount": 1, "description": "b"},
            {"apportion_mode": "alone", "category": "Caviar", "amount": 1, "description": "c"},
            {"apportion_mode": "alone", "category": "Yachts", "amount": 1, "description": "d"}
        ]});
        let c = parse_classification(&payload).unwrap();
        let err = c.resolve(None, &catalog()).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::UnresolvedCategories(vec!["Yachts".into(), "Caviar".into()])
        );
        assert_eq!(err.to_string(), "Unknown categories: Yachts, Caviar");
    }

    #[test]
    fn category_keys_are_normalized_and_distinct() {
        let payload = json!({"items": [
            {"apportion_mode": "alone", "category": "Groceries", "amount": 1, "description": "a"},
            {"apportion_mode": "alone", "category": " groceries ", "amount": 1, "description": "b"},
            {"apportion_mode": "alone", "category": "Transport", "amount": 1, "description": "c"}
        ]});
        let c = parse_classification(&payload).unwrap();
        assert_eq!(c.category_keys(), vec!["groceries", "transport"]);
    }
}
