use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Raw catalog row as exported by the trial registry spreadsheet.
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogRow {
    #[serde(rename = "Trial ID")]
    pub(crate) trial_id: String,
    #[serde(rename = "Title", default)]
    pub(crate) title: String,
    #[serde(rename = "Status")]
    pub(crate) status: String,
    #[serde(
        rename = "Target Conditions",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) target_conditions: Option<String>,
    #[serde(
        rename = "Exclusion Criteria",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) exclusion_criteria: Option<String>,
    #[serde(rename = "Min Age", default, deserialize_with = "empty_number_as_none")]
    pub(crate) min_age: Option<u32>,
    #[serde(rename = "Max Age", default, deserialize_with = "empty_number_as_none")]
    pub(crate) max_age: Option<u32>,
    #[serde(rename = "Gender", default, deserialize_with = "empty_string_as_none")]
    pub(crate) gender: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<CatalogRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize::<CatalogRow>().collect()
}

/// Split a `;` separated cell, dropping blank entries.
pub(crate) fn split_list(cell: Option<&str>) -> Vec<String> {
    cell.map(|value| {
        value
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn empty_number_as_none<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match empty_string_as_none(deserializer)? {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|err| serde::de::Error::custom(format!("invalid age '{raw}': {err}"))),
        None => Ok(None),
    }
}
