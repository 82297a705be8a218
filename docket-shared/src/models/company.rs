/// Company model
///
/// Each user owns at most one company row (`owner_id` is unique). Guests point
/// at their inviter's company through `users.company_id`.
///
/// Freelancers do not enter company data: [`CompanyData::for_freelancer`]
/// derives it from their personal name, tax id and address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;
use super::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,

    /// CIF of the company (or the owner's NIF for freelancers)
    pub cif: String,

    pub address: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written when a company is created or replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyData {
    pub name: String,
    pub cif: String,
    pub address: Address,
}

/// Why a freelancer's company could not be derived
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FreelancerCompanyError {
    /// Personal address is incomplete
    #[error("Missing address fields: {}", .0.join(", "))]
    MissingAddressFields(Vec<&'static str>),

    /// Name or tax id is missing
    #[error("Missing personal fields: {}", .0.join(", "))]
    MissingPersonalFields(Vec<&'static str>),
}

impl CompanyData {
    /// Derives the company of a freelancer from their personal data
    ///
    /// The address is checked first so that an incomplete address is always
    /// reported with the full list of missing fields.
    pub fn for_freelancer(user: &User) -> Result<Self, FreelancerCompanyError> {
        let missing = user.address.missing_fields();
        if !missing.is_empty() {
            return Err(FreelancerCompanyError::MissingAddressFields(missing));
        }

        let name = user.full_name();
        let nif = user
            .nif
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        match (name, nif) {
            (Some(name), Some(nif)) => Ok(Self {
                name,
                cif: nif.to_string(),
                address: user.address.clone(),
            }),
            (name, nif) => {
                let mut missing = Vec::new();
                if name.is_none() {
                    missing.push("name");
                }
                if nif.is_none() {
                    missing.push("nif");
                }
                Err(FreelancerCompanyError::MissingPersonalFields(missing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::verification::VerificationState;

    fn freelancer(address: Address) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "free@example.com".into(),
            password_hash: None,
            name: Some("Ana".into()),
            surnames: Some("García".into()),
            nif: Some("12345678Z".into()),
            logo: None,
            address,
            is_freelancer: true,
            company_id: None,
            role: Role::User,
            verified: true,
            active: true,
            verification: VerificationState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_freelancer_company_is_derived() {
        let address = Address {
            street: Some("Gran Vía".into()),
            number: Some(1),
            postal: Some("28013".into()),
            city: Some("Madrid".into()),
            province: Some("Madrid".into()),
        };

        let data = CompanyData::for_freelancer(&freelancer(address.clone())).unwrap();

        assert_eq!(data.name, "Ana García");
        assert_eq!(data.cif, "12345678Z");
        assert_eq!(data.address, address);
    }

    #[test]
    fn test_incomplete_address_lists_missing_fields() {
        let address = Address {
            street: Some("Gran Vía".into()),
            city: Some("Madrid".into()),
            ..Default::default()
        };

        let err = CompanyData::for_freelancer(&freelancer(address)).unwrap_err();
        assert_eq!(
            err,
            FreelancerCompanyError::MissingAddressFields(vec!["number", "postal", "province"])
        );
        assert_eq!(err.to_string(), "Missing address fields: number, postal, province");
    }

    #[test]
    fn test_missing_nif_is_reported() {
        let mut user = freelancer(Address {
            street: Some("Gran Vía".into()),
            number: Some(1),
            postal: Some("28013".into()),
            city: Some("Madrid".into()),
            province: Some("Madrid".into()),
        });
        user.nif = None;

        assert_eq!(
            CompanyData::for_freelancer(&user).unwrap_err(),
            FreelancerCompanyError::MissingPersonalFields(vec!["nif"])
        );
    }
}
