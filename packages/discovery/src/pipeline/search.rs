//! Targeted search: run variants in priority order, stop at the first hit.

use tracing::{debug, warn};

use crate::traits::catalog::Catalog;
use crate::types::dataset::CatalogDataset;
use crate::types::variant::QueryVariant;

/// What the targeted search produced.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Datasets of the winning variant, in catalog order. Empty when none won.
    pub datasets: Vec<CatalogDataset>,

    /// The variant that produced them.
    pub winner: Option<QueryVariant>,

    /// Catalog requests issued.
    pub attempts: usize,
}

impl SearchOutcome {
    pub fn found(&self) -> bool {
        self.winner.is_some()
    }
}

/// Execute variants strictly one at a time.
///
/// An error on one variant is logged and the next one is tried. Nothing after
/// the first non-empty page is requested.
pub async fn execute_variants<C: Catalog + ?Sized>(
    catalog: &C,
    variants: &[QueryVariant],
    rows: u32,
) -> SearchOutcome {
    let mut ordered: Vec<&QueryVariant> = variants.iter().collect();
    ordered.sort_by_key(|v| v.priority);

    let mut attempts = 0;
    for variant in ordered {
        attempts += 1;
        match catalog.search(&variant.request, rows).await {
            Ok(page) if page.has_data() => {
                debug!(
                    catalog = catalog.name(),
                    variant = %variant.label,
                    count = page.count,
                    returned = page.datasets.len(),
                    "Variant returned data"
                );
                return SearchOutcome {
                    datasets: page.datasets,
                    winner: Some(variant.clone()),
                    attempts,
                };
            }
            Ok(_) => {
                debug!(variant = %variant.label, "Variant returned nothing");
            }
            Err(e) => {
                warn!(variant = %variant.label, error = %e, "Variant search failed, trying next");
            }
        }
    }

    SearchOutcome {
        attempts,
        ..Default::default()
    }
}
