use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A dataset the user can query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
}

impl DatasetInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Case-insensitive name comparison used for dataset listings.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Sort datasets by name, ignoring case. Equal names keep server order.
pub fn sort_datasets(datasets: &mut [DatasetInfo]) {
    datasets.sort_by(|a, b| compare_names(&a.name, &b.name));
}

/// Client-side substring filter over name and id. An empty needle keeps all.
pub fn filter_datasets<'a>(datasets: &'a [DatasetInfo], needle: &str) -> Vec<&'a DatasetInfo> {
    let needle = needle.trim().to_lowercase();
    datasets
        .iter()
        .filter(|d| {
            needle.is_empty() || d.name.to_lowercase().contains(&needle) || d.id.contains(&needle)
        })
        .collect()
}
