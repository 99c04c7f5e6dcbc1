use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::catalog::service::active_package_for;
use crate::workflows::catalog::{missing_last, Country, SortDirection, VisaPackage, VisaType};

/// One card on the public countries page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub id: Uuid,
    pub name: String,
    pub flag: String,
    pub banner: String,
    pub description: String,
    pub is_popular: bool,
    #[serde(default)]
    pub package_id: Option<Uuid>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub processing_days: Option<i32>,
}

impl CountrySummary {
    /// Join a country with its active package. Inactive packages are never advertised.
    pub fn from_parts(country: Country, packages: &[VisaPackage]) -> Self {
        let package = active_package_for(packages, country.id).filter(|package| package.is_active);
        Self {
            id: country.id,
            name: country.name,
            flag: country.flag,
            banner: country.banner,
            description: country.description,
            is_popular: country.is_popular,
            package_id: package.map(|package| package.id),
            price: package.map(VisaPackage::total),
            processing_days: package.map(|package| package.processing_days),
        }
    }
}

pub fn summarize(countries: Vec<Country>, packages: &[VisaPackage]) -> Vec<CountrySummary> {
    countries
        .into_iter()
        .map(|country| CountrySummary::from_parts(country, packages))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountrySort {
    #[default]
    Name,
    Price,
    ProcessingTime,
    Popularity,
}

/// Query string of `GET /api/v1/countries`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CountryQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: CountrySort,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub popular_only: bool,
}

impl CountryQuery {
    pub fn apply(&self, summaries: Vec<CountrySummary>) -> Vec<CountrySummary> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .map(str::to_lowercase);

        let mut matching: Vec<CountrySummary> = summaries
            .into_iter()
            .filter(|summary| !self.popular_only || summary.is_popular)
            .filter(|summary| within(summary.price, self.max_price))
            .filter(|summary| {
                needle.as_deref().map_or(true, |needle| {
                    summary.name.to_lowercase().contains(needle)
                        || summary.description.to_lowercase().contains(needle)
                })
            })
            .collect();

        let direction = self.direction;
        matching.sort_by(|a, b| match self.sort {
            CountrySort::Name => direction.apply(by_name(a, b)),
            CountrySort::Price => {
                missing_last(a.price, b.price, direction).then_with(|| by_name(a, b))
            }
            CountrySort::ProcessingTime => {
                missing_last(a.processing_days, b.processing_days, direction)
                    .then_with(|| by_name(a, b))
            }
            CountrySort::Popularity => direction
                .apply(b.is_popular.cmp(&a.is_popular))
                .then_with(|| by_name(a, b)),
        });
        matching
    }
}

/// Query string of `GET /api/v1/visa-finder`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FinderQuery {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub max_budget: Option<f64>,
    #[serde(default)]
    pub max_processing_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinderMatch {
    pub country: CountrySummary,
    pub visa_types: Vec<VisaType>,
}

impl FinderQuery {
    /// Countries that fit the budget and timeline, cheapest first.
    ///
    /// With a purpose, only active visa types whose name or description mention it are
    /// kept, and countries without one drop out.
    pub fn apply(&self, summaries: Vec<CountrySummary>, visa_types: &[VisaType]) -> Vec<FinderMatch> {
        let destination = lowered(self.destination.as_deref());
        let purpose = lowered(self.purpose.as_deref());

        let mut matches: Vec<FinderMatch> = summaries
            .into_iter()
            .filter(|summary| {
                destination
                    .as_deref()
                    .map_or(true, |needle| summary.name.to_lowercase().contains(needle))
            })
            .filter(|summary| within(summary.price, self.max_budget))
            .filter(|summary| match (summary.processing_days, self.max_processing_days) {
                (_, None) => true,
                (Some(days), Some(limit)) => days <= limit,
                (None, Some(_)) => false,
            })
            .filter_map(|country| {
                let types: Vec<VisaType> = visa_types
                    .iter()
                    .filter(|visa_type| visa_type.country_id == country.id && visa_type.is_active)
                    .filter(|visa_type| {
                        purpose.as_deref().map_or(true, |purpose| mentions(visa_type, purpose))
                    })
                    .cloned()
                    .collect();
                if purpose.is_some() && types.is_empty() {
                    return None;
                }
                Some(FinderMatch {
                    country,
                    visa_types: types,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            missing_last(a.country.price, b.country.price, SortDirection::Asc)
                .then_with(|| by_name(&a.country, &b.country))
        });
        matches
    }
}

fn lowered(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

fn mentions(visa_type: &VisaType, purpose: &str) -> bool {
    visa_type.name.to_lowercase().contains(purpose)
        || visa_type
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(purpose))
}

/// Unpriced countries never pass a price ceiling.
fn within(price: Option<f64>, ceiling: Option<f64>) -> bool {
    match (price, ceiling) {
        (_, None) => true,
        (Some(price), Some(ceiling)) => price <= ceiling,
        (None, Some(_)) => false,
    }
}

fn by_name(a: &CountrySummary, b: &CountrySummary) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::catalog::EntryType;

    fn summary(name: &str, price: Option<f64>, days: Option<i32>, popular: bool) -> CountrySummary {
        CountrySummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            flag: String::new(),
            banner: String::new(),
            description: format!("Visit {name}"),
            is_popular: popular,
            package_id: None,
            price,
            processing_days: days,
        }
    }

    fn names(summaries: &[CountrySummary]) -> Vec<&str> {
        summaries.iter().map(|summary| summary.name.as_str()).collect()
    }

    fn fixtures() -> Vec<CountrySummary> {
        vec![
            summary("Japan", Some(100.0), Some(7), true),
            summary("canada", Some(85.0), Some(14), false),
            summary("Brazil", None, None, false),
            summary("France", Some(115.0), Some(10), true),
        ]
    }

    #[test]
    fn default_query_sorts_by_name_case_insensitively() {
        let sorted = CountryQuery::default().apply(fixtures());
        assert_eq!(names(&sorted), vec!["Brazil", "canada", "France", "Japan"]);
    }

    #[test]
    fn price_sort_puts_unpriced_countries_last() {
        let query = CountryQuery {
            sort: CountrySort::Price,
            ..CountryQuery::default()
        };
        assert_eq!(
            names(&query.apply(fixtures())),
            vec!["canada", "Japan", "France", "Brazil"]
        );
    }

    #[test]
    fn descending_price_sort_keeps_unpriced_countries_last() {
        let mut countries = fixtures();
        countries.push(summary("Albania", None, None, false));
        let query = CountryQuery {
            sort: CountrySort::Price,
            direction: SortDirection::Desc,
            ..CountryQuery::default()
        };
        assert_eq!(
            names(&query.apply(countries)),
            vec!["France", "Japan", "canada", "Albania", "Brazil"]
        );
    }

    #[test]
    fn filters_combine() {
        let query = CountryQuery {
            search: Some("  AN ".to_string()),
            max_price: Some(110.0),
            popular_only: true,
            ..CountryQuery::default()
        };
        assert_eq!(names(&query.apply(fixtures())), vec!["Japan"]);
    }

    #[test]
    fn popularity_descending_lists_regular_countries_first() {
        let query = CountryQuery {
            sort: CountrySort::Popularity,
            direction: SortDirection::Desc,
            ..CountryQuery::default()
        };
        let sorted = query.apply(fixtures());
        assert!(!sorted[0].is_popular);
        assert!(sorted[3].is_popular);
    }

    #[test]
    fn finder_matches_purpose_against_visa_types() {
        let countries = fixtures();
        let japan = countries[0].id;
        let france = countries[3].id;
        let visa_type = |country_id: Uuid, name: &str| VisaType {
            id: Uuid::new_v4(),
            country_id,
            name: name.to_string(),
            description: None,
            validity_days: 90,
            max_stay_days: 30,
            entry_type: EntryType::Single,
            is_active: true,
        };
        let types = vec![visa_type(japan, "Tourist"), visa_type(france, "Business")];

        let query = FinderQuery {
            purpose: Some("tour".to_string()),
            max_processing_days: Some(10),
            ..FinderQuery::default()
        };
        let matches = query.apply(countries, &types);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].country.name, "Japan");
        assert_eq!(matches[0].visa_types[0].name, "Tourist");
    }
}
