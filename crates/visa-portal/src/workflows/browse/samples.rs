//! Built-in catalog shown when the database cannot be reached.

use uuid::Uuid;

use crate::workflows::catalog::{
    Country, DocumentChecklistItem, EntryType, VisaPackage, VisaType,
};

struct SampleCountry {
    key: u128,
    name: &'static str,
    flag: &'static str,
    description: &'static str,
    popular: bool,
    government_fee: f64,
    service_fee: f64,
    processing_days: i32,
    visa_types: &'static [(&'static str, &'static str, i32, i32, EntryType)],
}

const SAMPLES: &[SampleCountry] = &[
    SampleCountry {
        key: 1,
        name: "Japan",
        flag: "🇯🇵",
        description: "Ancient temples, neon cities and seasonal festivals.",
        popular: true,
        government_fee: 30.0,
        service_fee: 49.0,
        processing_days: 7,
        visa_types: &[
            ("Tourist", "Sightseeing and visiting friends", 90, 90, EntryType::Single),
            ("Business", "Meetings and conferences", 90, 90, EntryType::Multiple),
        ],
    },
    SampleCountry {
        key: 2,
        name: "France",
        flag: "🇫🇷",
        description: "Schengen short-stay visa for Paris, Provence and beyond.",
        popular: true,
        government_fee: 90.0,
        service_fee: 45.0,
        processing_days: 15,
        visa_types: &[("Tourist", "Schengen short stay for tourism", 180, 90, EntryType::Multiple)],
    },
    SampleCountry {
        key: 3,
        name: "United Arab Emirates",
        flag: "🇦🇪",
        description: "Desert adventures and Dubai's skyline.",
        popular: true,
        government_fee: 90.0,
        service_fee: 35.0,
        processing_days: 4,
        visa_types: &[
            ("Tourist", "30-day tourist entry", 60, 30, EntryType::Single),
            ("Transit", "Short transit stopover", 14, 4, EntryType::Single),
        ],
    },
    SampleCountry {
        key: 4,
        name: "Australia",
        flag: "🇦🇺",
        description: "Electronic visitor visa for beaches, reefs and the outback.",
        popular: false,
        government_fee: 145.0,
        service_fee: 40.0,
        processing_days: 20,
        visa_types: &[("Visitor", "Tourism or visiting family", 365, 90, EntryType::Multiple)],
    },
    SampleCountry {
        key: 5,
        name: "India",
        flag: "🇮🇳",
        description: "e-Visa covering tourism, business and medical travel.",
        popular: false,
        government_fee: 25.0,
        service_fee: 30.0,
        processing_days: 5,
        visa_types: &[
            ("Tourist", "e-Tourist visa", 30, 30, EntryType::Multiple),
            ("Medical", "Treatment at recognised hospitals", 60, 60, EntryType::Multiple),
        ],
    },
];

const SAMPLE_DOCUMENTS: &[(&str, &str)] = &[
    ("Passport scan", "Photo page, valid for six months after arrival"),
    ("Photo", "Recent passport-style photo on a white background"),
    ("Return ticket", "Booked onward or return travel"),
];

fn country_id(key: u128) -> Uuid {
    Uuid::from_u128(0x5a3b_1e00_0000_0000_0000_0000_0000_0000 | key)
}

fn package_id(key: u128) -> Uuid {
    Uuid::from_u128(0x5a3b_1e00_0000_0000_0000_0001_0000_0000 | key)
}

fn visa_type_id(key: u128, index: usize) -> Uuid {
    Uuid::from_u128(0x5a3b_1e00_0000_0000_0000_0002_0000_0000 | (key << 8) | index as u128)
}

fn document_id(key: u128, index: usize) -> Uuid {
    Uuid::from_u128(0x5a3b_1e00_0000_0000_0000_0003_0000_0000 | (key << 8) | index as u128)
}

pub fn countries() -> Vec<Country> {
    SAMPLES
        .iter()
        .map(|sample| Country {
            id: country_id(sample.key),
            name: sample.name.to_string(),
            flag: sample.flag.to_string(),
            banner: format!(
                "https://images.visa-portal.invalid/{}.jpg",
                sample.name.to_lowercase().replace(' ', "-")
            ),
            description: sample.description.to_string(),
            entry_requirements: None,
            is_popular: sample.popular,
            created_at: None,
            updated_at: None,
        })
        .collect()
}

pub fn packages() -> Vec<VisaPackage> {
    SAMPLES
        .iter()
        .map(|sample| VisaPackage {
            id: package_id(sample.key),
            country_id: country_id(sample.key),
            name: "Standard Visa".to_string(),
            government_fee: sample.government_fee,
            service_fee: sample.service_fee,
            processing_days: sample.processing_days,
            total_price: Some(sample.government_fee + sample.service_fee),
            is_active: true,
            created_at: None,
            updated_at: None,
        })
        .collect()
}

pub fn visa_types() -> Vec<VisaType> {
    SAMPLES
        .iter()
        .flat_map(|sample| {
            sample.visa_types.iter().enumerate().map(
                move |(index, (name, description, validity, stay, entry_type))| VisaType {
                    id: visa_type_id(sample.key, index),
                    country_id: country_id(sample.key),
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    validity_days: *validity,
                    max_stay_days: *stay,
                    entry_type: *entry_type,
                    is_active: true,
                },
            )
        })
        .collect()
}

pub fn documents(country: Uuid) -> Vec<DocumentChecklistItem> {
    let Some(sample) = SAMPLES.iter().find(|sample| country_id(sample.key) == country) else {
        return Vec::new();
    };
    SAMPLE_DOCUMENTS
        .iter()
        .enumerate()
        .map(|(index, (name, description))| DocumentChecklistItem {
            id: document_id(sample.key, index),
            country_id: country,
            document_name: name.to_string(),
            document_description: Some(description.to_string()),
            is_required: index < 2,
            sort_order: index as i32 + 1,
        })
        .collect()
}
