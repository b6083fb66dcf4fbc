use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::dataset::{Dataset, CUSTOMER_NAME};

/// Which customers' orders stay in the filtered view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CustomerSelection {
    /// No filtering. The default, equivalent to selecting every customer.
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl CustomerSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }

    /// True for `All`, or for an explicit set naming every customer of a
    /// dataset that has at least one. Such a selection also keeps rows whose
    /// customer name is missing.
    fn covers_every_customer(&self, dataset: &Dataset) -> bool {
        let Self::Only(names) = self else {
            return true;
        };
        customer_options(dataset).is_some_and(|options| {
            !options.is_empty() && options.iter().all(|o| names.contains(o))
        })
    }
}

/// Distinct customer names in order of first appearance, or `None` when the
/// dataset has no customer column and no selector should be offered.
pub fn customer_options(dataset: &Dataset) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    Some(
        dataset
            .column(CUSTOMER_NAME)?
            .filter_map(|c| c.label())
            .filter(|name| seen.insert(name.clone()))
            .collect(),
    )
}

/// Rows whose customer is part of `selection`. A no-op without a customer column.
pub fn filter_customers(dataset: &Dataset, selection: &CustomerSelection) -> Dataset {
    let Some(index) = dataset.column_index(CUSTOMER_NAME) else {
        debug!("no customer column, skipping filter");
        return dataset.clone();
    };
    if selection.covers_every_customer(dataset) {
        return dataset.clone();
    }
    let filtered = dataset.retain_rows(|row| {
        row[index]
            .label()
            .is_some_and(|name| selection.contains(&name))
    });
    debug!(
        before = dataset.len(),
        after = filtered.len(),
        "filtered dataset by customer"
    );
    filtered
}
