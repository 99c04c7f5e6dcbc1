//! Bulk catalog import from CSV: one country per row, with optional package pricing.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::domain::{Country, CountryDraft, DEFAULT_PACKAGE_NAME};
use crate::backend::DatabaseBackend;
use crate::workflows::pricing::{PackagePricing, PricingReconciler, SaveStrategy};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read catalog file: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV: {}", err),
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    name: String,
    #[serde(default)]
    flag: String,
    #[serde(default)]
    banner: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "flag_or_false")]
    is_popular: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    government_fee: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    service_fee: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    processing_days: Option<i32>,
}

impl CatalogRow {
    fn country_draft(&self) -> CountryDraft {
        CountryDraft {
            name: self.name.clone(),
            flag: self.flag.clone(),
            banner: self.banner.clone(),
            description: self.description.clone(),
            entry_requirements: None,
            is_popular: self.is_popular,
        }
    }

    /// `Ok(None)` when the row carries no pricing at all.
    fn pricing(&self) -> Result<Option<PackagePricing>, String> {
        match (self.government_fee, self.service_fee, self.processing_days) {
            (None, None, None) => Ok(None),
            (Some(government_fee), Some(service_fee), Some(processing_days)) => {
                Ok(Some(PackagePricing {
                    name: DEFAULT_PACKAGE_NAME.to_string(),
                    government_fee,
                    service_fee,
                    processing_days,
                    is_active: true,
                }))
            }
            _ => Err(
                "government_fee, service_fee and processing_days must be given together"
                    .to_string(),
            ),
        }
    }
}

fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn flag_or_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        opt.as_deref().map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "yes" | "1" | "y")
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRowFailure {
    /// 1-based data row, not counting the header.
    pub row: usize,
    pub name: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub countries_created: usize,
    pub countries_reused: usize,
    pub packages_saved: usize,
    pub packages_in_mock_store: usize,
    pub failures: Vec<ImportRowFailure>,
}

fn parse_rows<R: Read>(
    reader: R,
) -> Result<(Vec<(usize, CatalogRow)>, Vec<ImportRowFailure>), csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.headers()?;

    let mut rows = Vec::new();
    let mut failures = Vec::new();
    for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
        match record {
            Ok(row) => rows.push((index + 1, row)),
            Err(error) => failures.push(ImportRowFailure {
                row: index + 1,
                name: None,
                error: error.to_string(),
            }),
        }
    }
    Ok((rows, failures))
}

pub struct CatalogImporter<B: ?Sized> {
    reconciler: Arc<PricingReconciler<B>>,
}

impl<B> CatalogImporter<B>
where
    B: DatabaseBackend + ?Sized + 'static,
{
    pub fn new(reconciler: Arc<PricingReconciler<B>>) -> Self {
        Self { reconciler }
    }

    pub async fn import_path(&self, path: &Path) -> Result<ImportReport, CatalogImportError> {
        let file = File::open(path)?;
        self.import_reader(file).await
    }

    /// Import every row, collecting per-row failures instead of stopping at the first one.
    pub async fn import_reader<R: Read>(
        &self,
        reader: R,
    ) -> Result<ImportReport, CatalogImportError> {
        let (rows, failures) = parse_rows(reader)?;
        let mut report = ImportReport {
            failures,
            ..ImportReport::default()
        };

        let catalog = self.reconciler.catalog();
        let mut known = match catalog.list::<Country>().await {
            Ok(countries) => countries,
            Err(error) => {
                warn!(%error, "could not list existing countries; every row creates a country");
                Vec::new()
            }
        };

        for (line, row) in rows {
            let fail = |error: String| ImportRowFailure {
                row: line,
                name: Some(row.name.clone()),
                error,
            };

            let pricing = match row.pricing() {
                Ok(pricing) => pricing,
                Err(error) => {
                    report.failures.push(fail(error));
                    continue;
                }
            };

            let existing = known
                .iter()
                .find(|country| country.name.eq_ignore_ascii_case(row.name.trim()))
                .map(|country| country.id);
            let country_id = match existing {
                Some(id) => {
                    report.countries_reused += 1;
                    id
                }
                None => match catalog.create::<Country>(row.country_draft()).await {
                    Ok(country) => {
                        report.countries_created += 1;
                        let id = country.id;
                        known.push(country);
                        id
                    }
                    Err(error) => {
                        report.failures.push(fail(error.to_string()));
                        continue;
                    }
                },
            };

            let Some(pricing) = pricing else {
                continue;
            };
            match self.reconciler.save_package(country_id, pricing).await {
                Ok(outcome) => {
                    report.packages_saved += 1;
                    if outcome.strategy == SaveStrategy::MockStore {
                        report.packages_in_mock_store += 1;
                    }
                }
                Err(error) => report.failures.push(fail(error.to_string())),
            }
        }

        info!(
            created = report.countries_created,
            reused = report.countries_reused,
            packages = report.packages_saved,
            failures = report.failures.len(),
            "catalog import finished"
        );
        Ok(report)
    }
}
