use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::models::{Entry, NewEntry};
use crate::db::{Datastore, DatastoreError};
use crate::error::{Error, Result};
use crate::giveaway::utils::normalize_optional;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Network address of the caller, as far as the proxy headers tell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientAddress {
    Known(String),
    Unknown,
}

impl ClientAddress {
    // First value of `X-Forwarded-For`, else `X-Real-IP`, else unknown.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim())
            .filter(|value| !value.is_empty());
        let real_ip = || {
            headers
                .get(REAL_IP_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        match forwarded.or_else(real_ip) {
            Some(address) => ClientAddress::Known(address.to_string()),
            None => ClientAddress::Unknown,
        }
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            ClientAddress::Known(address) => Some(address.as_str()),
            ClientAddress::Unknown => None,
        }
    }
}

impl fmt::Display for ClientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientAddress::Known(address) => f.write_str(address),
            ClientAddress::Unknown => f.write_str("unknown"),
        }
    }
}

/// A participation request that passed the required-field checks.
#[readonly::make]
#[derive(Clone, Debug)]
pub struct EntryRequest {
    pub giveaway_id: Uuid,
    pub participant_name: String,
    pub reddit_name: Option<String>,
    pub reddit_profile_link: Option<String>,
}

impl EntryRequest {
    pub fn parse(
        giveaway_id: Option<String>,
        participant_name: Option<String>,
        reddit_name: Option<String>,
        reddit_profile_link: Option<String>,
    ) -> Result<Self> {
        let missing = || Error::Validation("Missing required fields".to_string());
        let giveaway_id = normalize_optional(giveaway_id).ok_or_else(missing)?;
        let participant_name = normalize_optional(participant_name).ok_or_else(missing)?;
        // The id column is a uuid, so anything else is rejected by the store.
        let giveaway_id = Uuid::parse_str(&giveaway_id).map_err(|_| {
            Error::Upstream(format!("invalid input syntax for type uuid: \"{}\"", giveaway_id))
        })?;

        Ok(EntryRequest {
            giveaway_id,
            participant_name,
            reddit_name: normalize_optional(reddit_name),
            reddit_profile_link: normalize_optional(reddit_profile_link),
        })
    }
}

/// Admits participants into giveaways.
///
/// The address check and the insert are two separate round trips, so two
/// concurrent submissions from one address may both be admitted. Only the
/// `(giveaway_id, participant_name)` uniqueness is enforced atomically, by
/// the datastore.
pub struct EntryAdmission {
    store: Arc<dyn Datastore>,
}

impl EntryAdmission {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        EntryAdmission { store }
    }

    #[instrument(skip(self, request), fields(giveaway_id = %request.giveaway_id))]
    pub async fn admit(&self, request: EntryRequest, address: ClientAddress) -> Result<Entry> {
        self.check_extended_identity(&request).await?;
        self.check_address_is_unused(&request, &address).await?;

        let new_entry = NewEntry {
            giveaway_id: request.giveaway_id,
            participant_name: request.participant_name.clone(),
            reddit_name: request.reddit_name.clone(),
            reddit_profile_link: request.reddit_profile_link.clone(),
            ip_address: address.as_known().map(|value| value.to_string()),
        };

        match self.store.insert_entry(new_entry).await {
            Ok(entry) => {
                info!(
                    "Admitted '{}' into giveaway {} from {}",
                    entry.participant_name, entry.giveaway_id, address
                );
                Ok(entry)
            }
            Err(DatastoreError::UniqueViolation(_)) => {
                info!("Rejected duplicate name '{}'", request.participant_name);
                Err(Error::DuplicateName)
            }
            Err(err) => Err(Error::Upstream(err.to_string())),
        }
    }

    // Giveaways with the strict flag want to know who the participant is.
    // An unknown giveaway is left to the insert, which fails on the foreign key.
    async fn check_extended_identity(&self, request: &EntryRequest) -> Result<()> {
        let giveaway = match self
            .store
            .find_giveaway(request.giveaway_id)
            .await
            .map_err(|err| Error::Upstream(err.to_string()))?
        {
            Some(giveaway) => giveaway,
            None => return Ok(()),
        };

        if giveaway.allow_strict
            && (request.reddit_name.is_none() || request.reddit_profile_link.is_none())
        {
            let message = "This giveaway requires a Reddit username and profile link.".to_string();
            return Err(Error::Validation(message));
        }

        Ok(())
    }

    async fn check_address_is_unused(&self, request: &EntryRequest, address: &ClientAddress) -> Result<()> {
        let ip_address = match address.as_known() {
            Some(ip_address) => ip_address,
            None => return Ok(()),
        };

        match self
            .store
            .find_entries_by_address(request.giveaway_id, ip_address, 1)
            .await
        {
            Ok(entries) if !entries.is_empty() => {
                info!("Rejected second entry from {}", ip_address);
                Err(Error::DuplicateAddress)
            }
            Ok(_) => Ok(()),
            // A failed lookup doesn't block the participant.
            Err(err) => {
                warn!("Can't check previous entries from {}: {}", ip_address, err);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::HeaderMap;
    use tokio::sync::Barrier;
    use uuid::Uuid;

    use crate::db::models::{Entry, Giveaway, GiveawayUpdate, NewEntry, NewGiveaway};
    use crate::db::{Datastore, DatastoreError, DatastoreResult, EntryFeed, MemoryDatastore};
    use crate::error::Error;
    use crate::giveaway::admission::{ClientAddress, EntryAdmission, EntryRequest};
    use crate::giveaway::currency::CurrencyPool;

    async fn setup(allow_strict: bool) -> (Arc<MemoryDatastore>, EntryAdmission, Uuid) {
        let store = Arc::new(MemoryDatastore::new());
        let mut currencies = CurrencyPool::default();
        currencies.chaos_orb = 100;
        let giveaway = store
            .insert_giveaway(NewGiveaway {
                slug: "test".to_string(),
                title: "Test".to_string(),
                description: None,
                creator_name: "Owner".to_string(),
                creator_password: "secret".to_string(),
                currencies,
                allow_strict,
                ends_at: None,
            })
            .await
            .unwrap();
        let admission = EntryAdmission::new(store.clone());
        (store, admission, giveaway.id)
    }

    fn request(giveaway_id: Uuid, name: &str) -> EntryRequest {
        EntryRequest::parse(Some(giveaway_id.to_string()), Some(name.to_string()), None, None)
            .unwrap()
    }

    fn known(address: &str) -> ClientAddress {
        ClientAddress::Known(address.to_string())
    }

    #[test]
    fn test_address_from_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());

        assert_eq!(ClientAddress::from_headers(&headers), known("203.0.113.7"));
    }

    #[test]
    fn test_address_from_real_ip_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());

        assert_eq!(ClientAddress::from_headers(&headers), known("10.0.0.2"));
    }

    #[test]
    fn test_address_without_headers_is_unknown() {
        let address = ClientAddress::from_headers(&HeaderMap::new());

        assert_eq!(address, ClientAddress::Unknown);
        assert_eq!(address.to_string(), "unknown");
    }

    #[test]
    fn test_get_error_for_missing_fields() {
        let missing = Error::Validation("Missing required fields".to_string());
        let giveaway_id = Some(Uuid::new_v4().to_string());

        let result = EntryRequest::parse(giveaway_id.clone(), Some("".to_string()), None, None);
        assert_eq!(result.unwrap_err(), missing);
        let result = EntryRequest::parse(giveaway_id, None, None, None);
        assert_eq!(result.unwrap_err(), missing);
        let result = EntryRequest::parse(None, Some("Player".to_string()), None, None);
        assert_eq!(result.unwrap_err(), missing);
    }

    #[test]
    fn test_get_error_for_malformed_giveaway_id() {
        let result = EntryRequest::parse(Some("abc".to_string()), Some("Player".to_string()), None, None);
        assert_eq!(
            result.unwrap_err(),
            Error::Upstream("invalid input syntax for type uuid: \"abc\"".to_string())
        );
    }

    #[test]
    fn test_parse_trims_participant_name() {
        let request = EntryRequest::parse(
            Some(Uuid::new_v4().to_string()),
            Some("  Alice ".to_string()),
            None,
            None,
        )
        .unwrap();

        assert_eq!(request.participant_name, "Alice");
    }

    #[test]
    fn test_parse_drops_empty_optional_fields() {
        let request = EntryRequest::parse(
            Some(Uuid::new_v4().to_string()),
            Some("Player".to_string()),
            Some("".to_string()),
            Some(" https://reddit.com/u/player ".to_string()),
        )
        .unwrap();

        assert_eq!(request.reddit_name, None);
        assert_eq!(
            request.reddit_profile_link,
            Some("https://reddit.com/u/player".to_string())
        );
    }

    #[tokio::test]
    async fn test_admit_new_participant() {
        let (store, admission, giveaway_id) = setup(false).await;

        let entry = admission
            .admit(request(giveaway_id, "Player"), known("10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(entry.giveaway_id, giveaway_id);
        assert_eq!(entry.participant_name, "Player");
        assert_eq!(entry.ip_address, Some("10.0.0.1".to_string()));
        assert_eq!(store.list_entries(giveaway_id).await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn test_get_error_for_duplicate_name_from_another_address() {
        let (_, admission, giveaway_id) = setup(false).await;
        admission
            .admit(request(giveaway_id, "Player"), known("10.0.0.1"))
            .await
            .unwrap();

        let result = admission
            .admit(request(giveaway_id, "Player"), known("10.0.0.2"))
            .await;
        assert_eq!(result.unwrap_err(), Error::DuplicateName);
    }

    #[tokio::test]
    async fn test_get_error_for_duplicate_address_with_another_name() {
        let (store, admission, giveaway_id) = setup(false).await;
        admission
            .admit(request(giveaway_id, "First"), known("10.0.0.1"))
            .await
            .unwrap();

        let result = admission
            .admit(request(giveaway_id, "Second"), known("10.0.0.1"))
            .await;
        assert_eq!(result.unwrap_err(), Error::DuplicateAddress);
        assert_eq!(store.list_entries(giveaway_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_address_skips_address_check() {
        let (store, admission, giveaway_id) = setup(false).await;
        admission
            .admit(request(giveaway_id, "First"), ClientAddress::Unknown)
            .await
            .unwrap();
        let second = admission
            .admit(request(giveaway_id, "Second"), ClientAddress::Unknown)
            .await
            .unwrap();

        assert_eq!(second.ip_address, None);
        assert_eq!(store.list_entries(giveaway_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_error_for_unknown_giveaway() {
        let (_, admission, _) = setup(false).await;

        let result = admission
            .admit(request(Uuid::new_v4(), "Player"), known("10.0.0.1"))
            .await;
        assert_eq!(
            result.unwrap_err(),
            Error::Upstream(
                "insert or update on table \"entries\" violates foreign key constraint \"entries_giveaway_id_fkey\""
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_get_error_for_padded_duplicate_name() {
        let (_, admission, giveaway_id) = setup(false).await;
        admission
            .admit(request(giveaway_id, "Alice"), known("10.0.0.1"))
            .await
            .unwrap();

        let result = admission
            .admit(request(giveaway_id, " Alice "), known("10.0.0.2"))
            .await;
        assert_eq!(result.unwrap_err(), Error::DuplicateName);
    }

    #[tokio::test]
    async fn test_strict_giveaway_requires_reddit_identity() {
        let (_, admission, giveaway_id) = setup(true).await;

        let result = admission
            .admit(request(giveaway_id, "Player"), known("10.0.0.1"))
            .await;
        assert_eq!(
            result.unwrap_err(),
            Error::Validation("This giveaway requires a Reddit username and profile link.".to_string())
        );

        let complete = EntryRequest::parse(
            Some(giveaway_id.to_string()),
            Some("Player".to_string()),
            Some("u/player".to_string()),
            Some("https://reddit.com/u/player".to_string()),
        )
        .unwrap();
        let entry = admission.admit(complete, known("10.0.0.1")).await.unwrap();
        assert_eq!(entry.reddit_name, Some("u/player".to_string()));
    }

    // Store that fails everything except giveaway lookups.
    struct FailingStore {
        inner: MemoryDatastore,
    }

    #[async_trait]
    impl Datastore for FailingStore {
        async fn insert_giveaway(&self, giveaway: NewGiveaway) -> DatastoreResult<Giveaway> {
            self.inner.insert_giveaway(giveaway).await
        }

        async fn find_giveaway(&self, id: Uuid) -> DatastoreResult<Option<Giveaway>> {
            self.inner.find_giveaway(id).await
        }

        async fn find_giveaway_by_slug(&self, slug: &str) -> DatastoreResult<Option<Giveaway>> {
            self.inner.find_giveaway_by_slug(slug).await
        }

        async fn update_giveaway(&self, id: Uuid, update: GiveawayUpdate) -> DatastoreResult<Giveaway> {
            self.inner.update_giveaway(id, update).await
        }

        async fn insert_entry(&self, _entry: NewEntry) -> DatastoreResult<Entry> {
            Err(DatastoreError::Backend("connection refused".to_string()))
        }

        async fn find_entries_by_address(
            &self,
            _giveaway_id: Uuid,
            _ip_address: &str,
            _limit: usize,
        ) -> DatastoreResult<Vec<Entry>> {
            Err(DatastoreError::Backend("timeout".to_string()))
        }

        async fn list_entries(&self, giveaway_id: Uuid) -> DatastoreResult<Vec<Entry>> {
            self.inner.list_entries(giveaway_id).await
        }

        async fn delete_entry(&self, id: Uuid) -> DatastoreResult<Entry> {
            self.inner.delete_entry(id).await
        }

        fn subscribe(&self, giveaway_id: Uuid) -> EntryFeed {
            self.inner.subscribe(giveaway_id)
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_is_passed_through() {
        let store = Arc::new(FailingStore {
            inner: MemoryDatastore::new(),
        });
        let giveaway = store
            .insert_giveaway(NewGiveaway {
                slug: "test".to_string(),
                title: "Test".to_string(),
                description: None,
                creator_name: "Owner".to_string(),
                creator_password: "secret".to_string(),
                currencies: CurrencyPool::default(),
                allow_strict: false,
                ends_at: None,
            })
            .await
            .unwrap();
        let admission = EntryAdmission::new(store);

        // The failed address lookup is ignored, the insert failure is not.
        let result = admission
            .admit(request(giveaway.id, "Player"), known("10.0.0.1"))
            .await;
        assert_eq!(
            result.unwrap_err(),
            Error::Upstream("connection refused".to_string())
        );
    }

    // Store whose address lookups wait for each other, so both callers see
    // no previous entry before either of them inserts.
    struct RacingStore {
        inner: MemoryDatastore,
        lookups: Barrier,
    }

    #[async_trait]
    impl Datastore for RacingStore {
        async fn insert_giveaway(&self, giveaway: NewGiveaway) -> DatastoreResult<Giveaway> {
            self.inner.insert_giveaway(giveaway).await
        }

        async fn find_giveaway(&self, id: Uuid) -> DatastoreResult<Option<Giveaway>> {
            self.inner.find_giveaway(id).await
        }

        async fn find_giveaway_by_slug(&self, slug: &str) -> DatastoreResult<Option<Giveaway>> {
            self.inner.find_giveaway_by_slug(slug).await
        }

        async fn update_giveaway(&self, id: Uuid, update: GiveawayUpdate) -> DatastoreResult<Giveaway> {
            self.inner.update_giveaway(id, update).await
        }

        async fn insert_entry(&self, entry: NewEntry) -> DatastoreResult<Entry> {
            self.inner.insert_entry(entry).await
        }

        async fn find_entries_by_address(
            &self,
            giveaway_id: Uuid,
            ip_address: &str,
            limit: usize,
        ) -> DatastoreResult<Vec<Entry>> {
            let found = self
                .inner
                .find_entries_by_address(giveaway_id, ip_address, limit)
                .await;
            self.lookups.wait().await;
            found
        }

        async fn list_entries(&self, giveaway_id: Uuid) -> DatastoreResult<Vec<Entry>> {
            self.inner.list_entries(giveaway_id).await
        }

        async fn delete_entry(&self, id: Uuid) -> DatastoreResult<Entry> {
            self.inner.delete_entry(id).await
        }

        fn subscribe(&self, giveaway_id: Uuid) -> EntryFeed {
            self.inner.subscribe(giveaway_id)
        }
    }

    #[tokio::test]
    async fn test_concurrent_entries_from_one_address_both_pass() {
        let store = Arc::new(RacingStore {
            inner: MemoryDatastore::new(),
            lookups: Barrier::new(2),
        });
        let mut currencies = CurrencyPool::default();
        currencies.divine_orb = 1;
        let giveaway = store
            .insert_giveaway(NewGiveaway {
                slug: "race".to_string(),
                title: "Race".to_string(),
                description: None,
                creator_name: "Owner".to_string(),
                creator_password: "secret".to_string(),
                currencies,
                allow_strict: false,
                ends_at: None,
            })
            .await
            .unwrap();
        let admission = EntryAdmission::new(store.clone());

        // The address check and the insert aren't atomic: both submissions
        // pass the check before either one is stored.
        let (first, second) = tokio::join!(
            admission.admit(request(giveaway.id, "First"), known("10.0.0.1")),
            admission.admit(request(giveaway.id, "Second"), known("10.0.0.1")),
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(store.list_entries(giveaway.id).await.unwrap().len(), 2);
    }
}
