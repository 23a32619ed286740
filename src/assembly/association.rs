use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::foundation::error::{KomaError, KomaResult};

/// How an association came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationType {
    /// Produced by geometric detection after a drop.
    Automatic,
    /// Produced by an explicit user action.
    Manual,
}

/// The set of images assigned to one panel.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelContentAssociation {
    /// Panel id (also the store key).
    pub panel_id: String,
    /// Assigned image ids, insertion-ordered and unique. Never empty while stored.
    pub image_ids: Vec<String>,
    /// Provenance.
    pub association_type: AssociationType,
    /// Whether images are clipped to the panel mask.
    pub mask_enabled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Time source for association timestamps.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Panel id → [`PanelContentAssociation`] table owned by one editor session.
pub struct AssociationStore {
    clock: Arc<dyn Clock>,
    associations: BTreeMap<String, PanelContentAssociation>,
}

impl Default for AssociationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AssociationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationStore")
            .field("associations", &self.associations)
            .finish()
    }
}

impl AssociationStore {
    /// Empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store using a caller-provided clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            associations: BTreeMap::new(),
        }
    }

    /// Replace any association for `panel_id` with a fresh automatic one (mask enabled).
    pub fn create_automatic(&mut self, panel_id: &str, image_ids: &[String]) {
        let ids = dedup(image_ids);
        if ids.is_empty() {
            self.associations.remove(panel_id);
            return;
        }
        let now = self.clock.now();
        self.associations.insert(
            panel_id.to_owned(),
            PanelContentAssociation {
                panel_id: panel_id.to_owned(),
                image_ids: ids,
                association_type: AssociationType::Automatic,
                mask_enabled: true,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Create or replace a manual association, keeping a prior `mask_enabled` and `created_at`.
    pub fn create_manual(&mut self, panel_id: &str, image_ids: &[String]) {
        let ids = dedup(image_ids);
        if ids.is_empty() {
            self.associations.remove(panel_id);
            return;
        }
        let now = self.clock.now();
        let (mask_enabled, created_at) = self
            .associations
            .get(panel_id)
            .map(|a| (a.mask_enabled, a.created_at))
            .unwrap_or((true, now));
        self.associations.insert(
            panel_id.to_owned(),
            PanelContentAssociation {
                panel_id: panel_id.to_owned(),
                image_ids: ids,
                association_type: AssociationType::Manual,
                mask_enabled,
                created_at,
                updated_at: now,
            },
        );
    }

    /// Append `image_id` to the panel's set, creating a manual association when absent.
    pub fn add_image(&mut self, panel_id: &str, image_id: &str) {
        let now = self.clock.now();
        match self.associations.get_mut(panel_id) {
            Some(a) => {
                if !a.image_ids.iter().any(|id| id == image_id) {
                    a.image_ids.push(image_id.to_owned());
                    a.updated_at = now;
                }
            }
            None => self.create_manual(panel_id, &[image_id.to_owned()]),
        }
    }

    /// Remove `image_id` from the panel's set; an emptied association is deleted.
    pub fn remove_image(&mut self, panel_id: &str, image_id: &str) {
        let now = self.clock.now();
        let Some(a) = self.associations.get_mut(panel_id) else {
            return;
        };
        let before = a.image_ids.len();
        a.image_ids.retain(|id| id != image_id);
        if a.image_ids.is_empty() {
            self.associations.remove(panel_id);
        } else if a.image_ids.len() != before {
            a.updated_at = now;
        }
    }

    /// Delete the association for `panel_id` unconditionally.
    pub fn remove(&mut self, panel_id: &str) -> Option<PanelContentAssociation> {
        self.associations.remove(panel_id)
    }

    /// Association for `panel_id`, if any.
    pub fn get(&self, panel_id: &str) -> Option<&PanelContentAssociation> {
        self.associations.get(panel_id)
    }

    /// Images assigned to `panel_id`; empty when there is no association.
    pub fn images_for(&self, panel_id: &str) -> Vec<String> {
        self.associations
            .get(panel_id)
            .map(|a| a.image_ids.clone())
            .unwrap_or_default()
    }

    /// Panels whose association contains `image_id`, in panel-id order.
    pub fn panels_for(&self, image_id: &str) -> Vec<String> {
        self.associations
            .values()
            .filter(|a| a.image_ids.iter().any(|id| id == image_id))
            .map(|a| a.panel_id.clone())
            .collect()
    }

    /// Set the mask flag; no-op when the panel has no association.
    pub fn toggle_masking(&mut self, panel_id: &str, enabled: bool) {
        let now = self.clock.now();
        if let Some(a) = self.associations.get_mut(panel_id) {
            a.mask_enabled = enabled;
            a.updated_at = now;
        }
    }

    /// Drop references to elements that no longer exist.
    ///
    /// Associations whose panel is gone are removed; surviving associations keep only live image
    /// ids and are removed when that empties them. Calling this repeatedly with the same set is a
    /// no-op after the first call.
    pub fn cleanup<'a>(&mut self, live_element_ids: impl IntoIterator<Item = &'a str>) {
        let live: HashSet<&str> = live_element_ids.into_iter().collect();
        let now = self.clock.now();
        self.associations.retain(|panel_id, a| {
            if !live.contains(panel_id.as_str()) {
                tracing::debug!(panel_id, "dropping association for deleted panel");
                return false;
            }
            let before = a.image_ids.len();
            a.image_ids.retain(|id| live.contains(id.as_str()));
            if a.image_ids.len() != before {
                a.updated_at = now;
            }
            !a.image_ids.is_empty()
        });
    }

    /// Every association, ordered by panel id.
    pub fn all_associations(&self) -> Vec<&PanelContentAssociation> {
        self.associations.values().collect()
    }

    /// Number of stored associations.
    pub fn len(&self) -> usize {
        self.associations.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.associations.clear();
    }

    /// Serialize the table as a JSON array of associations.
    pub fn to_json(&self) -> KomaResult<String> {
        serde_json::to_string_pretty(&self.all_associations())
            .map_err(|e| KomaError::serde(format!("serialize associations: {e}")))
    }

    /// Build a store (system clock) from [`AssociationStore::to_json`] output.
    pub fn from_json(json: &str) -> KomaResult<Self> {
        let mut store = Self::new();
        store.load_json(json)?;
        Ok(store)
    }

    /// Replace the table with associations parsed from [`AssociationStore::to_json`] output.
    ///
    /// Entries with an empty image set are skipped.
    pub fn load_json(&mut self, json: &str) -> KomaResult<()> {
        let list: Vec<PanelContentAssociation> = serde_json::from_str(json)
            .map_err(|e| KomaError::serde(format!("parse associations: {e}")))?;
        self.associations = list
            .into_iter()
            .filter(|a| !a.image_ids.is_empty())
            .map(|mut a| {
                a.image_ids = dedup(&a.image_ids);
                (a.panel_id.clone(), a)
            })
            .collect();
        Ok(())
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/assembly/association.rs"]
mod tests;
