use std::collections::BTreeSet;

use crate::error::{ChartError, ChartResult};

/// Stable identifier of one person slot, unique within one dataset snapshot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PersonId(pub u64);

/// One entry of the hierarchical dataset fetched per chart root.
///
/// An empty `xref` marks a placeholder slot (unknown ancestor): it is never
/// clickable and never a candidate for "new"/"update" emphasis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonNode {
    pub id: PersonId,
    pub xref: String,
    /// Generation distance from the chart root (0 = root).
    pub depth: u32,
    /// Individual page of this person (full navigation target).
    #[serde(default)]
    pub url: String,
    /// Endpoint returning the dataset rooted at this person.
    #[serde(default)]
    pub update_url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timespan: String,
}

impl PersonNode {
    pub fn is_placeholder(&self) -> bool {
        self.xref.is_empty()
    }
}

/// Validate one dataset snapshot before it replaces the scene.
///
/// Rules: ids are unique, at most one root (depth 0) which must be present when
/// the dataset is non-empty, and no node exceeds the supported generation range.
pub fn validate_dataset(nodes: &[PersonNode], max_generations: u32) -> ChartResult<()> {
    let mut seen = BTreeSet::new();
    let mut roots = 0usize;

    for node in nodes {
        if !seen.insert(node.id) {
            return Err(ChartError::validation(format!(
                "duplicate person id {} in dataset",
                node.id.0
            )));
        }
        if node.depth == 0 {
            roots += 1;
        }
        if node.depth >= max_generations {
            return Err(ChartError::validation(format!(
                "person id {} at depth {} exceeds {} generations",
                node.id.0, node.depth, max_generations
            )));
        }
    }

    if !nodes.is_empty() && roots != 1 {
        return Err(ChartError::validation(format!(
            "dataset must contain exactly one root, found {roots}"
        )));
    }

    Ok(())
}
