use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::{Country, VisaPackage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryColumn {
    #[default]
    Name,
    Popular,
    GovernmentFee,
    ServiceFee,
    TotalPrice,
    ProcessingDays,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Orders present values by `direction`; missing values sort last either way.
pub fn missing_last<T: PartialOrd>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Header-click state of the admin countries table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub column: CountryColumn,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: CountryColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Clicking the active column flips the direction; any other column starts ascending.
    pub fn toggle(self, column: CountryColumn) -> Self {
        if self.column == column {
            Self::new(column, self.direction.flipped())
        } else {
            Self::new(column, SortDirection::Asc)
        }
    }
}

/// One line of the admin countries table: the country plus its active package, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminCountryRow {
    pub country: Country,
    pub package: Option<VisaPackage>,
}

impl AdminCountryRow {
    fn compare(&self, other: &Self, column: CountryColumn, direction: SortDirection) -> Ordering {
        let fee = |row: &Self, pick: fn(&VisaPackage) -> f64| row.package.as_ref().map(pick);

        match column {
            CountryColumn::Name => direction.apply(
                self.country
                    .name
                    .to_lowercase()
                    .cmp(&other.country.name.to_lowercase()),
            ),
            CountryColumn::Popular => {
                direction.apply(self.country.is_popular.cmp(&other.country.is_popular))
            }
            CountryColumn::GovernmentFee => missing_last(
                fee(self, |p| p.government_fee),
                fee(other, |p| p.government_fee),
                direction,
            ),
            CountryColumn::ServiceFee => missing_last(
                fee(self, |p| p.service_fee),
                fee(other, |p| p.service_fee),
                direction,
            ),
            CountryColumn::TotalPrice => missing_last(
                fee(self, VisaPackage::total),
                fee(other, VisaPackage::total),
                direction,
            ),
            CountryColumn::ProcessingDays => missing_last(
                fee(self, |p| f64::from(p.processing_days)),
                fee(other, |p| f64::from(p.processing_days)),
                direction,
            ),
            CountryColumn::UpdatedAt => {
                missing_last(self.country.updated_at, other.country.updated_at, direction)
            }
        }
    }
}

/// Stable sort by the chosen column, ties broken by name.
pub fn sort_rows(rows: &mut [AdminCountryRow], state: SortState) {
    rows.sort_by(|a, b| {
        a.compare(b, state.column, state.direction)
            .then_with(|| a.compare(b, CountryColumn::Name, SortDirection::Asc))
    });
}
