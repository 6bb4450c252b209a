use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    consts::consts::LeadId,
    model::{
        lead::{Lead, UpdateOutcome},
        payload::LeadPayload,
    },
    store::{LeadStore, StoreError},
};

use super::normalize::{normalize_email, normalize_phone, phone_match_key, MatchPolicy};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Matched lead was deleted between the lookup and the merge write
    #[error("Matched lead {0} no longer exists")]
    LeadVanished(LeadId),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionKind {
    Insert,
    Merge,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Resolution {
    pub id: LeadId,
    pub kind: ResolutionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    /// Position of the entry in the submitted batch
    pub index: usize,
    pub input: LeadPayload,
    pub error: ResolveError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<ImportFailure>,
}

/// Decides whether an incoming lead is someone we already know.
///
/// Phone first (trailing digits, so country code noise does not matter), then exact
/// email. A hit overwrites the stored lead, a miss inserts a new one. Lookup and write
/// are separate store calls, two concurrent submissions of the same person can both
/// insert.
pub struct LeadResolver {
    store: Arc<dyn LeadStore>,
    policy: MatchPolicy,
}

impl LeadResolver {
    pub fn new(store: Arc<dyn LeadStore>, policy: MatchPolicy) -> Self {
        Self { store, policy }
    }

    #[tracing::instrument(skip(self, payload))]
    pub fn resolve(&self, payload: &LeadPayload) -> ResolveResult<Resolution> {
        self.resolve_at(payload, Utc::now())
    }

    /// `now` stands in for missing or unparsable creation times
    pub fn resolve_at(&self, payload: &LeadPayload, now: DateTime<Utc>) -> ResolveResult<Resolution> {
        let fields = payload.to_fields(now);

        match self.find_existing(payload)? {
            Some(existing) => {
                log::debug!("Merging payload into lead {}", existing.id);

                match self.store.update(&existing.id, fields)? {
                    UpdateOutcome::Updated => Ok(Resolution {
                        id: existing.id,
                        kind: ResolutionKind::Merge,
                    }),
                    UpdateOutcome::NotFound => Err(ResolveError::LeadVanished(existing.id)),
                }
            }
            None => {
                let id = self
                    .store
                    .insert(Lead::new(LeadId::from_supplied(payload.id.as_deref()), fields))?;

                log::debug!("Inserted new lead {}", id);

                Ok(Resolution {
                    id,
                    kind: ResolutionKind::Insert,
                })
            }
        }
    }

    /// Resolves every entry in order. A failing entry is recorded and the batch goes on.
    #[tracing::instrument(skip(self, payloads), fields(batch = payloads.len()))]
    pub fn import(&self, payloads: Vec<LeadPayload>) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for (index, payload) in payloads.into_iter().enumerate() {
            match self.resolve(&payload) {
                Ok(Resolution {
                    kind: ResolutionKind::Insert,
                    ..
                }) => summary.inserted += 1,
                Ok(Resolution {
                    kind: ResolutionKind::Merge,
                    ..
                }) => summary.updated += 1,
                Err(error) => {
                    log::warn!("Import entry {} failed: {}", index, error);

                    summary.failures.push(ImportFailure {
                        index,
                        input: payload,
                        error,
                    });
                }
            }
        }

        log::info!(
            "Import finished: {} inserted, {} updated, {} failed",
            summary.inserted,
            summary.updated,
            summary.failures.len()
        );

        summary
    }

    fn find_existing(&self, payload: &LeadPayload) -> ResolveResult<Option<Lead>> {
        let phone = payload
            .phone_or_number()
            .and_then(|phone| normalize_phone(phone, &self.policy));

        if let Some(phone) = phone.filter(|phone| phone.len() >= self.policy.min_match_digits) {
            let key = phone_match_key(&phone, &self.policy);

            if let Some(lead) = self.store.find_by_phone_suffix(&key)? {
                return Ok(Some(lead));
            }
        }

        match payload.email.as_deref().and_then(normalize_email) {
            Some(email) => Ok(self.store.find_by_email(&email)?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::{
        consts::consts::DEFAULT_STAGE,
        model::statement::{Statement, StatementResult},
        store::{memory::MemoryStore, table::filter::LeadQuery, StoreResult},
    };

    fn resolver() -> (LeadResolver, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let resolver = LeadResolver::new(store.clone(), MatchPolicy::default());

        (resolver, store)
    }

    fn payload(value: serde_json::Value) -> LeadPayload {
        serde_json::from_value(value).expect("valid payload json")
    }

    /// Memory store that fails inserts of leads with a given name
    struct FailingInsertStore {
        inner: MemoryStore,
        failing_name: &'static str,
    }

    impl LeadStore for FailingInsertStore {
        fn execute(&self, statement: Statement) -> StoreResult<StatementResult> {
            if let Statement::Insert(lead) = &statement {
                if lead.fields.name.as_deref() == Some(self.failing_name) {
                    return Err(StoreError::Unavailable("connection reset".to_string()));
                }
            }

            self.inner.execute(statement)
        }
    }

    /// Finds a lead by phone that was never stored, as if it was deleted right after
    struct VanishingStore {
        inner: MemoryStore,
    }

    impl LeadStore for VanishingStore {
        fn execute(&self, statement: Statement) -> StoreResult<StatementResult> {
            match statement {
                Statement::FindByPhoneSuffix(_) => Ok(StatementResult::Single(Some(
                    Lead::new_test("ghost", Some("5551234567"), None),
                ))),
                other => self.inner.execute(other),
            }
        }
    }

    mod matching {
        use super::*;

        #[test_log::test]
        fn formatted_phone_merges_into_stored_digits() {
            // Given a stored lead with a bare ten digit phone
            let (resolver, store) = resolver();
            let existing = Lead::new_test("existing", Some("5551234567"), None);
            store.insert(existing.clone()).unwrap();

            // When a payload arrives with country code and punctuation
            let resolution = resolver
                .resolve(&payload(json!({"name": "Jane", "phone": "+1 (555) 123-4567"})))
                .unwrap();

            // Then it merges into the stored lead
            assert_eq!(resolution.kind, ResolutionKind::Merge);
            assert_eq!(resolution.id, existing.id);

            let stored = store.get(&existing.id).unwrap().unwrap();
            assert_eq!(stored.fields.name.as_deref(), Some("Jane"));
            assert_eq!(stored.fields.phone.as_deref(), Some("+1 (555) 123-4567"));
            assert_eq!(store.list(LeadQuery::all()).unwrap().len(), 1);
        }

        #[test]
        fn long_international_phone_still_matches_by_suffix() {
            let (resolver, store) = resolver();
            let existing = Lead::new_test("existing", Some("555 123 4567"), None);
            store.insert(existing.clone()).unwrap();

            let resolution = resolver
                .resolve(&payload(json!({"phone": "+44 1 555 123 4567"})))
                .unwrap();

            assert_eq!(resolution.id, existing.id);
        }

        #[test]
        fn no_match_inserts_with_a_fresh_id() {
            // Given some unrelated leads
            let (resolver, store) = resolver();
            let first = Lead::new_test("first", Some("5550000001"), Some("a@x.com"));
            let second = Lead::new_test("second", None, Some("b@x.com"));
            store.insert(first.clone()).unwrap();
            store.insert(second.clone()).unwrap();

            // When a payload matches neither by phone nor by email
            let resolution = resolver
                .resolve(&payload(json!({"name": "New", "phone": "5559999999", "email": "c@x.com"})))
                .unwrap();

            // Then a new lead with an unused id is inserted
            assert_eq!(resolution.kind, ResolutionKind::Insert);
            assert_ne!(resolution.id, first.id);
            assert_ne!(resolution.id, second.id);
            assert!(store.get(&resolution.id).unwrap().is_some());
        }

        #[test]
        fn email_is_used_when_the_phone_misses() {
            let (resolver, store) = resolver();
            let existing = Lead::new_test("existing", Some("5550000001"), Some("jane@acme.io"));
            store.insert(existing.clone()).unwrap();

            let resolution = resolver
                .resolve(&payload(json!({"phone": "5559999999", "email": "  JANE@acme.io "})))
                .unwrap();

            assert_eq!(resolution.kind, ResolutionKind::Merge);
            assert_eq!(resolution.id, existing.id);
        }

        #[test]
        fn email_alone_is_enough() {
            let (resolver, store) = resolver();
            let existing = Lead::new_test("existing", None, Some("jane@acme.io"));
            store.insert(existing.clone()).unwrap();

            let resolution = resolver
                .resolve(&payload(json!({"email": "jane@acme.io"})))
                .unwrap();

            assert_eq!(resolution.id, existing.id);
        }

        #[test]
        fn payload_without_identity_is_inserted() {
            let (resolver, store) = resolver();
            store.insert(Lead::new_test("existing", None, None)).unwrap();

            let resolution = resolver.resolve(&payload(json!({"name": "Anon"}))).unwrap();

            assert_eq!(resolution.kind, ResolutionKind::Insert);
            assert_eq!(store.list(LeadQuery::all()).unwrap().len(), 2);
        }

        #[test]
        fn supplied_id_is_kept_on_insert() {
            let (resolver, _) = resolver();

            let resolution = resolver
                .resolve(&payload(json!({"id": "lead-42", "name": "A"})))
                .unwrap();

            assert_eq!(resolution.id, LeadId("lead-42".to_string()));
        }

        #[test]
        fn duplicate_supplied_id_is_a_store_error() {
            let (resolver, store) = resolver();
            store.insert(Lead::new_test("lead-42", None, None)).unwrap();

            let error = resolver
                .resolve(&payload(json!({"id": "lead-42", "name": "A"})))
                .unwrap_err();

            assert!(matches!(error, ResolveError::Store(StoreError::Duplicate(_))));
        }

        #[test]
        fn short_phone_matches_any_lead_ending_in_it_by_default() {
            let (resolver, store) = resolver();
            let existing = Lead::new_test("existing", Some("5551234567"), None);
            store.insert(existing.clone()).unwrap();

            let resolution = resolver
                .resolve(&payload(json!({"name": "Bob", "phone": "ext 7"})))
                .unwrap();

            assert_eq!(resolution.kind, ResolutionKind::Merge);
            assert_eq!(resolution.id, existing.id);
        }

        #[test]
        fn phone_below_the_minimum_skips_to_email() {
            // Given a policy that ignores phones shorter than seven digits
            let store = Arc::new(MemoryStore::default());
            let policy = MatchPolicy::default().set_min_match_digits(7);
            let resolver = LeadResolver::new(store.clone(), policy);

            let by_phone = Lead::new_test("by-phone", Some("5551234567"), None);
            let by_email = Lead::new_test("by-email", None, Some("bob@acme.io"));
            store.insert(by_phone.clone()).unwrap();
            store.insert(by_email.clone()).unwrap();

            // When a payload carries a short phone
            let short_only = resolver
                .resolve(&payload(json!({"name": "Bob", "phone": "ext 7"})))
                .unwrap();
            let with_email = resolver
                .resolve(&payload(json!({"phone": "4567", "email": "bob@acme.io"})))
                .unwrap();

            // Then the phone is not used for matching
            assert_eq!(short_only.kind, ResolutionKind::Insert);
            assert_eq!(with_email.id, by_email.id);

            let untouched = store.get(&by_phone.id).unwrap().unwrap();
            assert_eq!(untouched.fields.name, by_phone.fields.name);
        }
    }

    mod merging {
        use super::*;

        #[test]
        fn merge_resets_omitted_fields_to_defaults() {
            // Given a stored lead that moved along the pipeline
            let (resolver, store) = resolver();
            let mut existing = Lead::new_test("existing", Some("5551234567"), None);
            existing.fields.stage = "Qualified".to_string();
            existing.fields.city = Some("Lisbon".to_string());
            existing.fields.value = 900.0;
            store.insert(existing.clone()).unwrap();

            // When a payload with only a phone and a name matches it
            let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
            resolver
                .resolve_at(&payload(json!({"name": "Jane", "phone": "5551234567"})), now)
                .unwrap();

            // Then the omitted fields are back to their defaults
            let stored = store.get(&existing.id).unwrap().unwrap();
            assert_eq!(stored.fields.stage, DEFAULT_STAGE);
            assert_eq!(stored.fields.city, None);
            assert_eq!(stored.fields.value, 0.0);
            assert_eq!(stored.fields.created_at, now);
        }

        #[test]
        fn merge_into_a_vanished_lead_fails() {
            let store = Arc::new(VanishingStore {
                inner: MemoryStore::default(),
            });
            let resolver = LeadResolver::new(store, MatchPolicy::default());

            let error = resolver
                .resolve(&payload(json!({"phone": "5551234567"})))
                .unwrap_err();

            assert_eq!(error, ResolveError::LeadVanished(LeadId("ghost".to_string())));
        }
    }

    mod import {
        use super::*;

        #[test_log::test]
        fn second_entry_with_same_phone_merges_into_the_first() {
            let (resolver, store) = resolver();

            let summary = resolver.import(vec![
                payload(json!({"phone": "555-000-1111", "name": "A"})),
                payload(json!({"phone": "5550001111", "name": "B"})),
            ]);

            assert_eq!(summary.inserted, 1);
            assert_eq!(summary.updated, 1);
            assert!(summary.failures.is_empty());

            let leads = store.list(LeadQuery::all()).unwrap();
            assert_eq!(leads.len(), 1);
            assert_eq!(leads[0].fields.name.as_deref(), Some("B"));
        }

        #[test]
        fn number_column_deduplicates_like_phone() {
            let (resolver, store) = resolver();

            let summary = resolver.import(vec![
                payload(json!({"number": "555-000-1111", "name": "A"})),
                payload(json!({"number": "5550001111", "name": "B"})),
            ]);

            assert_eq!((summary.inserted, summary.updated), (1, 1));

            let leads = store.list(LeadQuery::all()).unwrap();
            assert_eq!(leads.len(), 1);
            assert_eq!(leads[0].fields.phone.as_deref(), Some("5550001111"));
        }

        #[test]
        fn failing_entry_does_not_abort_the_batch() {
            // Given a store that fails to insert the second entry
            let store = Arc::new(FailingInsertStore {
                inner: MemoryStore::default(),
                failing_name: "B",
            });
            let resolver = LeadResolver::new(store.clone(), MatchPolicy::default());

            let entries = vec![
                payload(json!({"phone": "5550000001", "name": "A"})),
                payload(json!({"phone": "5550000002", "name": "B"})),
                payload(json!({"phone": "5550000003", "name": "C"})),
            ];

            // When the batch is imported
            let summary = resolver.import(entries.clone());

            // Then entries 1 and 3 are counted and entry 2 is the only failure
            assert_eq!(summary.inserted, 2);
            assert_eq!(summary.updated, 0);
            assert_eq!(summary.failures.len(), 1);

            let failure = &summary.failures[0];
            assert_eq!(failure.index, 1);
            assert_eq!(failure.input, entries[1]);
            assert!(matches!(
                failure.error,
                ResolveError::Store(StoreError::Unavailable(_))
            ));

            assert_eq!(store.list(LeadQuery::all()).unwrap().len(), 2);
        }

        #[test]
        fn empty_batch_is_a_no_op() {
            let (resolver, _) = resolver();

            assert_eq!(resolver.import(vec![]), ImportSummary::default());
        }
    }
}
