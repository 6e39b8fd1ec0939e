//! User profiles for farmers and extension workers
//!
//! Accounts and tokens are issued elsewhere; this module owns the profile
//! data attached to an authenticated user name. A user without a stored
//! profile reads as a fresh farmer profile until the first update.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::info;

use crate::error::{Error, Result};
use crate::store::ProfileStore;

const PHONE_PATTERN: &str = r"^\+?1?\d{9,15}$";
const MAX_NAME_LEN: usize = 150;
const MAX_FARM_NAME_LEN: usize = 200;
const MAX_LOCATION_LEN: usize = 255;
const MAX_REGION_LEN: usize = 100;

static PHONE_REGEX: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Farmer,
    ExtensionWorker,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarmingMethod {
    Organic,
    #[default]
    Conventional,
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmerProfile {
    pub farm_name: String,
    /// Acres
    pub farm_size: Option<f64>,
    pub location: String,
    pub region: String,
    /// Comma-separated crop names
    pub crops_grown: String,
    pub farming_method: FarmingMethod,
    pub years_of_experience: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub farmer_profile: Option<FarmerProfile>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            username: username.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            user_type: UserType::Farmer,
            is_verified: false,
            created_at: now,
            updated_at: now,
            farmer_profile: None,
        }
    }
}

/// Partial update of the writable farm fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FarmerProfileUpdate {
    pub farm_name: Option<String>,
    pub farm_size: Option<f64>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub crops_grown: Option<String>,
    pub farming_method: Option<FarmingMethod>,
    pub years_of_experience: Option<u32>,
}

/// Partial update of a profile; read-only fields are not representable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub farmer_profile: Option<FarmerProfileUpdate>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            if !is_valid_email(email) {
                return Err(invalid("Enter a valid email address."));
            }
        }
        if let Some(phone) = &self.phone_number {
            if !phone_regex()?.is_match(phone) {
                return Err(invalid(
                    "Phone number must be entered in format: '+233123456789'",
                ));
            }
        }
        check_len("first_name", self.first_name.as_deref(), MAX_NAME_LEN)?;
        check_len("last_name", self.last_name.as_deref(), MAX_NAME_LEN)?;

        if let Some(farm) = &self.farmer_profile {
            check_len("farm_name", farm.farm_name.as_deref(), MAX_FARM_NAME_LEN)?;
            check_len("location", farm.location.as_deref(), MAX_LOCATION_LEN)?;
            check_len("region", farm.region.as_deref(), MAX_REGION_LEN)?;
            if let Some(size) = farm.farm_size {
                if !size.is_finite() || size < 0.0 {
                    return Err(invalid("farm_size must be a non-negative number"));
                }
            }
        }
        Ok(())
    }

    fn apply(self, profile: &mut UserProfile) {
        if let Some(email) = self.email {
            profile.email = email;
        }
        if let Some(first_name) = self.first_name {
            profile.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            profile.last_name = last_name;
        }
        if let Some(phone) = self.phone_number {
            profile.phone_number = Some(phone);
        }

        // extension workers have no farm to describe
        if let (Some(update), UserType::Farmer) = (self.farmer_profile, profile.user_type) {
            let farm = profile.farmer_profile.get_or_insert_with(FarmerProfile::default);
            if let Some(v) = update.farm_name {
                farm.farm_name = v;
            }
            if let Some(v) = update.farm_size {
                farm.farm_size = Some(v);
            }
            if let Some(v) = update.location {
                farm.location = v;
            }
            if let Some(v) = update.region {
                farm.region = v;
            }
            if let Some(v) = update.crops_grown {
                farm.crops_grown = v;
            }
            if let Some(v) = update.farming_method {
                farm.farming_method = v;
            }
            if let Some(v) = update.years_of_experience {
                farm.years_of_experience = Some(v);
            }
        }
    }
}

fn invalid(msg: &str) -> Error {
    Error::InvalidRequest(msg.to_string())
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(Error::InvalidRequest(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn phone_regex() -> Result<&'static Regex> {
    PHONE_REGEX
        .get_or_init(|| Regex::new(PHONE_PATTERN))
        .as_ref()
        .map_err(|e| Error::ConfigError(format!("phone pattern: {}", e)))
}

pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, user: &str) -> Result<UserProfile> {
        Ok(self
            .store
            .profile(user)
            .await?
            .unwrap_or_else(|| UserProfile::new(user)))
    }

    pub async fn update_profile(&self, user: &str, update: ProfileUpdate) -> Result<UserProfile> {
        update.validate()?;

        let mut profile = self.profile(user).await?;
        update.apply(&mut profile);
        profile.updated_at = Utc::now();

        self.store.save_profile(profile.clone()).await?;
        info!("Updated profile for {}", user);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> (ProfileService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ProfileService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_unknown_user_reads_as_fresh_farmer() {
        let (service, _) = service();
        let profile = service.profile("ama").await.unwrap();
        assert_eq!(profile.username, "ama");
        assert_eq!(profile.user_type, UserType::Farmer);
        assert!(profile.farmer_profile.is_none());
        assert!(!profile.is_verified);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (service, _) = service();

        service
            .update_profile(
                "ama",
                ProfileUpdate {
                    first_name: Some("Ama".into()),
                    phone_number: Some("+233123456789".into()),
                    farmer_profile: Some(FarmerProfileUpdate {
                        farm_name: Some("Green Acres".into()),
                        farm_size: Some(2.5),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let profile = service
            .update_profile(
                "ama",
                ProfileUpdate {
                    last_name: Some("Mensah".into()),
                    farmer_profile: Some(FarmerProfileUpdate {
                        farming_method: Some(FarmingMethod::Organic),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.first_name, "Ama");
        assert_eq!(profile.last_name, "Mensah");
        assert_eq!(profile.phone_number.as_deref(), Some("+233123456789"));
        let farm = profile.farmer_profile.unwrap();
        assert_eq!(farm.farm_name, "Green Acres");
        assert_eq!(farm.farm_size, Some(2.5));
        assert_eq!(farm.farming_method, FarmingMethod::Organic);

        assert_eq!(service.profile("ama").await.unwrap().last_name, "Mensah");
    }

    #[tokio::test]
    async fn test_extension_worker_farm_data_is_ignored() {
        let (service, store) = service();
        let mut worker = UserProfile::new("kofi");
        worker.user_type = UserType::ExtensionWorker;
        store.save_profile(worker).await.unwrap();

        let profile = service
            .update_profile(
                "kofi",
                ProfileUpdate {
                    email: Some("kofi@moa.gov.gh".into()),
                    farmer_profile: Some(FarmerProfileUpdate {
                        farm_name: Some("n/a".into()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.email, "kofi@moa.gov.gh");
        assert!(profile.farmer_profile.is_none());
    }

    #[tokio::test]
    async fn test_validation() {
        let (service, _) = service();
        let rejected = [
            ProfileUpdate {
                phone_number: Some("0244".into()),
                ..Default::default()
            },
            ProfileUpdate {
                email: Some("not-an-email".into()),
                ..Default::default()
            },
            ProfileUpdate {
                first_name: Some("a".repeat(151)),
                ..Default::default()
            },
            ProfileUpdate {
                farmer_profile: Some(FarmerProfileUpdate {
                    farm_size: Some(-1.0),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];

        for update in rejected {
            assert!(matches!(
                service.update_profile("ama", update).await,
                Err(Error::InvalidRequest(_))
            ));
        }
        assert!(service.profile("ama").await.unwrap().phone_number.is_none());
    }

    #[tokio::test]
    async fn test_phone_number_is_unique() {
        let (service, _) = service();
        let update = || ProfileUpdate {
            phone_number: Some("233201234567".into()),
            ..Default::default()
        };

        service.update_profile("ama", update()).await.unwrap();
        assert!(matches!(
            service.update_profile("kwame", update()).await,
            Err(Error::PhoneNumberTaken(_))
        ));
        // re-saving one's own number is fine
        assert!(service.update_profile("ama", update()).await.is_ok());
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("ama@farm.gh"));
        assert!(!is_valid_email("ama@farm"));
        assert!(!is_valid_email("@farm.gh"));
        assert!(!is_valid_email("ama@@farm.gh"));
        assert!(!is_valid_email("a ma@farm.gh"));
    }
}
