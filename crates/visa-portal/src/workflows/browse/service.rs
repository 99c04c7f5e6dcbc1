use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::filter::{summarize, CountryQuery, CountrySummary, FinderMatch, FinderQuery};
use super::samples;
use crate::backend::{DatabaseBackend, Query};
use crate::workflows::catalog::service::active_package_for;
use crate::workflows::catalog::{
    CatalogError, CatalogService, Country, DocumentChecklistItem, QueryKey, VisaPackage, VisaType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Database,
    Sample,
}

/// Response envelope telling the client whether it is looking at live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub source: DataSource,
    pub data: T,
}

impl<T> Sourced<T> {
    fn database(data: T) -> Self {
        Self {
            source: DataSource::Database,
            data,
        }
    }

    fn sample(data: T) -> Self {
        Self {
            source: DataSource::Sample,
            data,
        }
    }
}

/// Everything the country details page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryDetails {
    pub country: Country,
    pub package: Option<VisaPackage>,
    pub visa_types: Vec<VisaType>,
    pub documents: Vec<DocumentChecklistItem>,
}

/// Public read models. Database failures degrade to the built-in sample catalog.
pub struct BrowseService<B: ?Sized> {
    catalog: Arc<CatalogService<B>>,
}

impl<B> BrowseService<B>
where
    B: DatabaseBackend + ?Sized + 'static,
{
    pub fn new(catalog: Arc<CatalogService<B>>) -> Self {
        Self { catalog }
    }

    pub async fn countries(&self, query: &CountryQuery) -> Sourced<Vec<CountrySummary>> {
        let sourced = self.summaries().await;
        Sourced {
            source: sourced.source,
            data: query.apply(sourced.data),
        }
    }

    pub async fn popular(&self) -> Sourced<Vec<CountrySummary>> {
        let loaded = self
            .catalog
            .cache()
            .get_or_load(QueryKey::PopularDestinations, || async {
                let summaries = self.load_summaries().await?;
                Ok::<_, CatalogError>(popular_only(summaries))
            })
            .await;
        match loaded {
            Ok(popular) if !popular.is_empty() => Sourced::database(popular),
            Ok(_) => Sourced::sample(popular_only(sample_summaries())),
            Err(error) => {
                warn!(%error, "popular destinations unavailable; serving sample data");
                Sourced::sample(popular_only(sample_summaries()))
            }
        }
    }

    pub async fn country(&self, id: Uuid) -> Result<Sourced<CountryDetails>, BrowseError> {
        let loaded = self
            .catalog
            .cache()
            .get_or_load(QueryKey::CountryDetails(id), || self.load_details(id))
            .await;
        match loaded {
            Ok(details) => Ok(Sourced::database(details)),
            Err(error) => {
                if !matches!(error, CatalogError::NotFound { .. }) {
                    warn!(%error, %id, "country details unavailable; trying sample data");
                }
                sample_details(id)
                    .map(Sourced::sample)
                    .ok_or(BrowseError::NotFound(id))
            }
        }
    }

    pub async fn finder(&self, query: &FinderQuery) -> Sourced<Vec<FinderMatch>> {
        let summaries = self.summaries().await;
        let visa_types = match summaries.source {
            DataSource::Database => match self.catalog.list::<VisaType>().await {
                Ok(visa_types) => visa_types,
                Err(error) => {
                    warn!(%error, "visa types unavailable; finder ignores purpose matches");
                    Vec::new()
                }
            },
            DataSource::Sample => samples::visa_types(),
        };
        Sourced {
            source: summaries.source,
            data: query.apply(summaries.data, &visa_types),
        }
    }

    async fn summaries(&self) -> Sourced<Vec<CountrySummary>> {
        let loaded = self
            .catalog
            .cache()
            .get_or_load(QueryKey::PublicCountries, || self.load_summaries())
            .await;
        match loaded {
            Ok(summaries) if !summaries.is_empty() => Sourced::database(summaries),
            Ok(_) => Sourced::sample(sample_summaries()),
            Err(error) => {
                warn!(%error, "countries unavailable; serving sample data");
                Sourced::sample(sample_summaries())
            }
        }
    }

    async fn load_summaries(&self) -> Result<Vec<CountrySummary>, CatalogError> {
        let countries = self.catalog.list::<Country>().await?;
        let packages = self.catalog.list::<VisaPackage>().await?;
        Ok(summarize(countries, &packages))
    }

    async fn load_details(&self, id: Uuid) -> Result<CountryDetails, CatalogError> {
        let country: Country = self.catalog.get(id).await?;
        let scoped = || Query::all().eq("country_id", id.to_string());
        let packages = self.catalog.select::<VisaPackage>(scoped()).await?;
        let visa_types = self
            .catalog
            .select::<VisaType>(scoped().eq("is_active", true).order_by("name", true))
            .await?;
        let mut documents = self
            .catalog
            .select::<DocumentChecklistItem>(scoped().order_by("sort_order", true))
            .await?;
        documents.sort_by_key(|item| item.sort_order);

        Ok(CountryDetails {
            package: active_package_for(&packages, id)
                .filter(|package| package.is_active)
                .cloned(),
            country,
            visa_types,
            documents,
        })
    }
}

fn popular_only(summaries: Vec<CountrySummary>) -> Vec<CountrySummary> {
    let mut popular: Vec<CountrySummary> = summaries
        .into_iter()
        .filter(|summary| summary.is_popular)
        .collect();
    popular.sort_by(|a, b| a.name.cmp(&b.name));
    popular
}

fn sample_summaries() -> Vec<CountrySummary> {
    summarize(samples::countries(), &samples::packages())
}

fn sample_details(id: Uuid) -> Option<CountryDetails> {
    let country = samples::countries().into_iter().find(|country| country.id == id)?;
    let package = samples::packages()
        .into_iter()
        .find(|package| package.country_id == id);
    let visa_types = samples::visa_types()
        .into_iter()
        .filter(|visa_type| visa_type.country_id == id)
        .collect();
    Some(CountryDetails {
        country,
        package,
        visa_types,
        documents: samples::documents(id),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("country {0} not found")]
    NotFound(Uuid),
}

impl BrowseError {
    pub fn status(&self) -> StatusCode {
        match self {
            BrowseError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for BrowseError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
