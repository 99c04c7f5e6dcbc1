//! Pricing saves against a database whose schema and stored procedures drift.
//!
//! Each save walks a fixed chain of strategies, each one narrower than the last, and stops at
//! the first that succeeds. When the chain runs dry the record is kept in the local store and
//! the resource is flagged as mock mode until an operator exits it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::PricingError;
use crate::backend::{
    decode_row, BackendError, DatabaseBackend, Filter, Query, Row, RpcArgs,
};
use crate::local_store::LocalStore;
use crate::workflows::catalog::domain::{default_package_name, default_true};
use crate::workflows::catalog::{
    CatalogService, Mutation, PricingTier, PricingTierDraft, QueryKey, Resource, ResourceKind,
    Validate, VisaPackage, VisaPackageDraft,
};

pub(crate) const SAVE_PACKAGE_RPC: &str = "save_visa_package";

/// Columns a bare-bones schema may lack, dropped by the simplified write.
const PACKAGE_OPTIONAL_COLUMNS: &[&str] =
    &["name", "total_price", "is_active", "created_at", "updated_at"];
const TIER_OPTIONAL_COLUMNS: &[&str] = &["description", "is_active", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStrategy {
    NamedRpc,
    PositionalRpc,
    DirectUpsert,
    SimplifiedWrite,
    MockStore,
}

impl SaveStrategy {
    pub fn label(self) -> &'static str {
        match self {
            SaveStrategy::NamedRpc => "named_rpc",
            SaveStrategy::PositionalRpc => "positional_rpc",
            SaveStrategy::DirectUpsert => "direct_upsert",
            SaveStrategy::SimplifiedWrite => "simplified_write",
            SaveStrategy::MockStore => "mock_store",
        }
    }
}

const PACKAGE_CHAIN: [SaveStrategy; 4] = [
    SaveStrategy::NamedRpc,
    SaveStrategy::PositionalRpc,
    SaveStrategy::DirectUpsert,
    SaveStrategy::SimplifiedWrite,
];

const TIER_CHAIN: [SaveStrategy; 2] = [SaveStrategy::DirectUpsert, SaveStrategy::SimplifiedWrite];

/// One failed step of a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveAttempt {
    pub strategy: SaveStrategy,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome<T> {
    pub record: T,
    pub strategy: SaveStrategy,
    pub attempts: Vec<SaveAttempt>,
}

/// Pricing form payload for a country's package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagePricing {
    #[serde(default = "default_package_name")]
    pub name: String,
    pub government_fee: f64,
    pub service_fee: f64,
    pub processing_days: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PackagePricing {
    pub fn into_draft(self, country_id: Uuid) -> VisaPackageDraft {
        VisaPackageDraft {
            country_id,
            name: self.name,
            government_fee: self.government_fee,
            service_fee: self.service_fee,
            processing_days: self.processing_days,
            is_active: self.is_active,
        }
    }
}

/// Row key used by the direct upsert.
#[derive(Debug, Clone, Copy)]
enum UpsertKey {
    Country(Uuid),
    Id(Uuid),
}

pub struct PricingReconciler<B: ?Sized> {
    catalog: Arc<CatalogService<B>>,
    mock_fallback: bool,
}

impl<B> PricingReconciler<B>
where
    B: DatabaseBackend + ?Sized + 'static,
{
    pub fn new(catalog: Arc<CatalogService<B>>, mock_fallback: bool) -> Self {
        Self {
            catalog,
            mock_fallback,
        }
    }

    pub fn catalog(&self) -> &Arc<CatalogService<B>> {
        &self.catalog
    }

    fn backend(&self) -> &B {
        self.catalog.backend()
    }

    fn store(&self) -> &LocalStore {
        self.catalog.store()
    }

    /// Save a country's package pricing, keyed on `country_id`.
    pub async fn save_package(
        &self,
        country_id: Uuid,
        pricing: PackagePricing,
    ) -> Result<SaveOutcome<VisaPackage>, PricingError> {
        let draft = pricing.into_draft(country_id);
        draft.validate()?;

        let mut attempts = Vec::new();
        if !self.store().is_mock(ResourceKind::VisaPackages) {
            for strategy in PACKAGE_CHAIN {
                match self.attempt_package(strategy, &draft).await {
                    Ok(package) => {
                        info!(%country_id, strategy = strategy.label(), "package pricing saved");
                        self.catalog.invalidate(Mutation::new(
                            ResourceKind::VisaPackages,
                            Some(country_id),
                        ));
                        return Ok(SaveOutcome {
                            record: package,
                            strategy,
                            attempts,
                        });
                    }
                    Err(error) => {
                        self.note_failure(ResourceKind::VisaPackages, strategy, error, &mut attempts)?
                    }
                }
            }
            self.ensure_fallback_allowed(attempts.as_slice())?;
        }

        let country_key = country_id.to_string();
        let existing = self
            .store()
            .records(ResourceKind::VisaPackages)
            .into_iter()
            .find(|row| row.get("country_id").and_then(Value::as_str) == Some(country_key.as_str()));
        let mut row = VisaPackage::draft_row(&draft)?;
        if let Some(id) = existing.and_then(|row| row.get("id").cloned()) {
            row.insert("id".to_string(), id);
        }
        let package: VisaPackage = self.store_locally(ResourceKind::VisaPackages, row)?;
        self.catalog.invalidate(Mutation::new(
            ResourceKind::VisaPackages,
            Some(country_id),
        ));
        Ok(SaveOutcome {
            record: package,
            strategy: SaveStrategy::MockStore,
            attempts,
        })
    }

    /// The package shown for a country: its active one, else the first found.
    pub async fn package_for_country(
        &self,
        country_id: Uuid,
    ) -> Result<Option<VisaPackage>, PricingError> {
        if self.store().is_mock(ResourceKind::VisaPackages) {
            let packages = self
                .catalog
                .select::<VisaPackage>(Query::all().eq("country_id", country_id.to_string()))
                .await?;
            return Ok(pick_package(packages));
        }

        let packages: Vec<VisaPackage> = self
            .catalog
            .cache()
            .get_or_load(QueryKey::CountryPricing(country_id), || async {
                self.catalog
                    .select::<VisaPackage>(Query::all().eq("country_id", country_id.to_string()))
                    .await
            })
            .await?;
        Ok(pick_package(packages))
    }

    /// Save a pricing tier: direct upsert by id, then a simplified write, then the local store.
    pub async fn save_tier(
        &self,
        id: Option<Uuid>,
        draft: PricingTierDraft,
    ) -> Result<SaveOutcome<PricingTier>, PricingError> {
        draft.validate()?;
        let id = id.unwrap_or_else(Uuid::new_v4);
        let mut row = PricingTier::draft_row(&draft)?;
        row.insert("id".to_string(), Value::String(id.to_string()));

        let mut attempts = Vec::new();
        if !self.store().is_mock(ResourceKind::PricingTiers) {
            for strategy in TIER_CHAIN {
                let strip: &[&str] = match strategy {
                    SaveStrategy::SimplifiedWrite => TIER_OPTIONAL_COLUMNS,
                    _ => &[],
                };
                let payload = self.payload(ResourceKind::PricingTiers, row.clone(), strip);
                let result = self
                    .upsert(ResourceKind::PricingTiers, UpsertKey::Id(id), payload)
                    .await
                    .and_then(decode_row::<PricingTier>);
                match result {
                    Ok(tier) => {
                        info!(%id, strategy = strategy.label(), "pricing tier saved");
                        self.catalog
                            .invalidate(Mutation::new(ResourceKind::PricingTiers, None));
                        return Ok(SaveOutcome {
                            record: tier,
                            strategy,
                            attempts,
                        });
                    }
                    Err(error) => {
                        self.note_failure(ResourceKind::PricingTiers, strategy, error, &mut attempts)?
                    }
                }
            }
            self.ensure_fallback_allowed(attempts.as_slice())?;
        }

        let tier: PricingTier = self.store_locally(ResourceKind::PricingTiers, row)?;
        self.catalog
            .invalidate(Mutation::new(ResourceKind::PricingTiers, None));
        Ok(SaveOutcome {
            record: tier,
            strategy: SaveStrategy::MockStore,
            attempts,
        })
    }

    async fn attempt_package(
        &self,
        strategy: SaveStrategy,
        draft: &VisaPackageDraft,
    ) -> Result<VisaPackage, BackendError> {
        let row = match strategy {
            SaveStrategy::NamedRpc => {
                let value = self
                    .backend()
                    .rpc(SAVE_PACKAGE_RPC, RpcArgs::Named(named_args(draft)))
                    .await?;
                self.rpc_result_row(value, draft.country_id).await?
            }
            SaveStrategy::PositionalRpc => {
                let value = self
                    .backend()
                    .rpc(SAVE_PACKAGE_RPC, RpcArgs::Positional(positional_args(draft)))
                    .await?;
                self.rpc_result_row(value, draft.country_id).await?
            }
            _ => {
                let strip: &[&str] = if strategy == SaveStrategy::SimplifiedWrite {
                    PACKAGE_OPTIONAL_COLUMNS
                } else {
                    &[]
                };
                let payload =
                    self.payload(ResourceKind::VisaPackages, VisaPackage::draft_row(draft)?, strip);
                self.upsert(
                    ResourceKind::VisaPackages,
                    UpsertKey::Country(draft.country_id),
                    payload,
                )
                .await?
            }
        };
        decode_row(row)
    }

    /// Procedures may answer with the row, a one-row array, or just an id.
    async fn rpc_result_row(&self, value: Value, country_id: Uuid) -> Result<Row, BackendError> {
        match value {
            Value::Object(row) => Ok(row),
            Value::Array(rows) => match rows.into_iter().next() {
                Some(Value::Object(row)) => Ok(row),
                _ => self.package_row(country_id).await,
            },
            _ => self.package_row(country_id).await,
        }
    }

    async fn package_row(&self, country_id: Uuid) -> Result<Row, BackendError> {
        let rows = self
            .backend()
            .select(
                ResourceKind::VisaPackages.table(),
                &Query::all().eq("country_id", country_id.to_string()),
            )
            .await?;
        pick_row(rows).ok_or_else(|| BackendError::not_found(ResourceKind::VisaPackages.table()))
    }

    /// Select by key, then update the match or insert a new row.
    async fn upsert(
        &self,
        kind: ResourceKind,
        key: UpsertKey,
        payload: Row,
    ) -> Result<Row, BackendError> {
        let table = kind.table();
        let query = match key {
            UpsertKey::Country(country_id) => Query::all().eq("country_id", country_id.to_string()),
            UpsertKey::Id(id) => Query::all().eq("id", id.to_string()),
        };
        let existing = pick_row(self.backend().select(table, &query).await?);

        match existing.and_then(|row| row.get("id").cloned()) {
            Some(id) => self
                .backend()
                .update(table, &Filter::eq("id", id), payload)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| BackendError::not_found(table)),
            None => self.backend().insert(table, payload).await,
        }
    }

    /// Drop the given columns plus every column the schema cache rejected before.
    fn payload(&self, kind: ResourceKind, mut row: Row, strip: &[&str]) -> Row {
        for column in strip {
            row.remove(*column);
        }
        for column in self.store().missing_columns(kind.table()) {
            row.remove(&column);
        }
        row
    }

    fn note_failure(
        &self,
        kind: ResourceKind,
        strategy: SaveStrategy,
        error: BackendError,
        attempts: &mut Vec<SaveAttempt>,
    ) -> Result<(), PricingError> {
        warn!(resource = %kind, strategy = strategy.label(), %error, "save attempt failed");
        if let Some(missing) = error.missing_column() {
            if self
                .store()
                .remember_missing_column(&missing.table, &missing.column)?
            {
                info!(table = %missing.table, column = %missing.column, "remembered missing column");
            }
        }
        attempts.push(SaveAttempt {
            strategy,
            error: error.to_string(),
        });
        Ok(())
    }

    fn ensure_fallback_allowed(&self, attempts: &[SaveAttempt]) -> Result<(), PricingError> {
        if self.mock_fallback {
            Ok(())
        } else {
            Err(PricingError::Exhausted {
                attempts: attempts.to_vec(),
            })
        }
    }

    fn store_locally<R: Resource>(&self, kind: ResourceKind, row: Row) -> Result<R, PricingError> {
        let stored = self.store().upsert_record(kind, row)?;
        self.store().enter_mock_mode(kind)?;
        Ok(decode_row(stored)?)
    }
}

fn named_args(draft: &VisaPackageDraft) -> Row {
    let mut args = Row::new();
    args.insert(
        "p_country_id".to_string(),
        Value::String(draft.country_id.to_string()),
    );
    args.insert("p_name".to_string(), Value::String(draft.name.clone()));
    args.insert("p_government_fee".to_string(), Value::from(draft.government_fee));
    args.insert("p_service_fee".to_string(), Value::from(draft.service_fee));
    args.insert(
        "p_processing_days".to_string(),
        Value::from(draft.processing_days),
    );
    args.insert("p_is_active".to_string(), Value::Bool(draft.is_active));
    args
}

fn positional_args(draft: &VisaPackageDraft) -> Vec<Value> {
    vec![
        Value::String(draft.country_id.to_string()),
        Value::String(draft.name.clone()),
        Value::from(draft.government_fee),
        Value::from(draft.service_fee),
        Value::from(draft.processing_days),
        Value::Bool(draft.is_active),
    ]
}

fn pick_row(rows: Vec<Row>) -> Option<Row> {
    let active = rows
        .iter()
        .position(|row| row.get("is_active") == Some(&Value::Bool(true)));
    rows.into_iter().nth(active.unwrap_or(0))
}

fn pick_package(packages: Vec<VisaPackage>) -> Option<VisaPackage> {
    let active = packages.iter().position(|package| package.is_active);
    packages.into_iter().nth(active.unwrap_or(0))
}
