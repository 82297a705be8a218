/// Postal address value type
///
/// Stored as JSONB wherever it is embedded. Every field is optional so
/// partial updates and partially known client addresses round-trip.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub number: Option<i32>,
    pub postal: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

impl Address {
    /// Names of the fields that are missing or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if is_blank(&self.street) {
            missing.push("street");
        }
        if self.number.is_none() {
            missing.push("number");
        }
        if is_blank(&self.postal) {
            missing.push("postal");
        }
        if is_blank(&self.city) {
            missing.push("city");
        }
        if is_blank(&self.province) {
            missing.push("province");
        }

        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Single-line rendering used in documents
    pub fn one_line(&self) -> String {
        let street = match (&self.street, self.number) {
            (Some(street), Some(number)) => format!("{} {}", street, number),
            (Some(street), None) => street.clone(),
            (None, Some(number)) => number.to_string(),
            (None, None) => String::new(),
        };

        [Some(street), self.postal.clone(), self.city.clone(), self.province.clone()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Address {
        Address {
            street: Some("Calle Mayor".into()),
            number: Some(12),
            postal: Some("28013".into()),
            city: Some("Madrid".into()),
            province: Some("Madrid".into()),
        }
    }

    #[test]
    fn test_complete_address() {
        assert!(full().is_complete());
        assert_eq!(full().one_line(), "Calle Mayor 12, 28013, Madrid, Madrid");
    }

    #[test]
    fn test_missing_fields_are_listed_in_order() {
        let address = Address {
            street: Some("  ".into()),
            city: Some("Madrid".into()),
            ..Default::default()
        };

        assert_eq!(
            address.missing_fields(),
            vec!["street", "number", "postal", "province"]
        );
    }

    #[test]
    fn test_empty_address_renders_empty() {
        assert_eq!(Address::default().one_line(), "");
    }
}
