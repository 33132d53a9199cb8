use crate::error::LoadError;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Header of the entity (country) column
pub const ENTITY_COLUMN: &str = "Entity";

/// Numeric columns of the sustainable-energy dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Year,
    GdpPerCapita,
    RenewableShare,
    ElectricityAccess,
    Co2Emissions,
    FinancialFlows,
    FossilElectricity,
    NuclearElectricity,
    RenewableElectricity,
    EnergyIntensity,
    GdpGrowth,
    RenewablesPrimary,
}

impl Field {
    /// CSV header carrying this field
    pub fn column(self) -> &'static str {
        match self {
            Field::Year => "Year",
            Field::GdpPerCapita => "gdp_per_capita",
            Field::RenewableShare => {
                "Renewable energy share in the total final energy consumption (%)"
            }
            Field::ElectricityAccess => "Access to electricity (% of population)",
            Field::Co2Emissions => "Value_co2_emissions_kt_by_country",
            Field::FinancialFlows => "Financial flows to developing countries (US $)",
            Field::FossilElectricity => "Electricity from fossil fuels (TWh)",
            Field::NuclearElectricity => "Electricity from nuclear (TWh)",
            Field::RenewableElectricity => "Electricity from renewables (TWh)",
            Field::EnergyIntensity => "Energy intensity level of primary energy (MJ/$2017 PPP GDP)",
            Field::GdpGrowth => "gdp_growth",
            Field::RenewablesPrimary => "Renewables (% equivalent primary energy)",
        }
    }
}

/// Coerce a text cell to a number.
///
/// Empty and unparsable cells become `NAN`, the missing-value sentinel that
/// every consumer filters out before dividing, taking logs or scaling.
pub fn coerce(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// One observation: a country in a year
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub entity: String,
    values: HashMap<Field, f64>,
}

impl Row {
    pub fn new(entity: impl Into<String>, values: impl IntoIterator<Item = (Field, f64)>) -> Self {
        Self {
            entity: entity.into().trim().to_string(),
            values: values.into_iter().collect(),
        }
    }

    /// Numeric value of a field; `NAN` when missing or never declared
    pub fn get(&self, field: Field) -> f64 {
        self.values.get(&field).copied().unwrap_or(f64::NAN)
    }

    pub fn year(&self) -> Option<i32> {
        let year = self.get(Field::Year);
        if year.is_finite() {
            Some(year.round() as i32)
        } else {
            None
        }
    }
}

/// The rows of one CSV load. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Load a CSV file, coercing the declared numeric fields
    pub fn load(path: impl AsRef<Path>, fields: &[Field]) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file, fields)?;
        debug!(path = %path.display(), rows = dataset.len(), "loaded dataset");
        Ok(dataset)
    }

    /// Parse CSV text from any reader. The header row must contain the entity
    /// column and every declared field.
    pub fn from_reader<R: Read>(reader: R, fields: &[Field]) -> Result<Self, LoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let find = |name: &str| -> Result<usize, LoadError> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };

        let entity_idx = find(ENTITY_COLUMN)?;
        let mut field_idx = Vec::with_capacity(fields.len());
        for &field in fields {
            field_idx.push((field, find(field.column())?));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let entity = record.get(entity_idx).unwrap_or_default();
            let values = field_idx
                .iter()
                .map(|&(field, idx)| (field, coerce(record.get(idx).unwrap_or_default())));
            rows.push(Row::new(entity, values));
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct years in ascending order
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.rows.iter().filter_map(Row::year).collect();
        years.into_iter().collect()
    }

    /// Distinct entity names, sorted
    pub fn entities(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .rows
            .iter()
            .map(|r| r.entity.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }
}
