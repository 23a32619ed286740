use std::collections::HashSet;

use crate::assembly::association::AssociationStore;
use crate::assembly::drag_drop::DragDropCoordinator;
use crate::assembly::geometry::significant_image_ids;
use crate::assembly::masking::{MaskOptions, MaskedContainer, MaskingOpts, MaskingService};
use crate::foundation::error::{KomaError, KomaResult};
use crate::scene::model::{Element, Page};

/// Per-document editing state: the page plus its association, drag and masking services.
#[derive(Debug)]
pub struct EditorSession {
    page: Page,
    associations: AssociationStore,
    drag: DragDropCoordinator,
    masking: MaskingService,
}

impl EditorSession {
    /// Open `page` with fresh services and one drop zone per panel.
    pub fn new(page: Page) -> Self {
        Self::with_parts(page, AssociationStore::new(), MaskingOpts::default())
    }

    /// Open `page` with a caller-provided association store and masking options.
    pub fn with_parts(page: Page, associations: AssociationStore, masking: MaskingOpts) -> Self {
        let mut session = Self {
            page,
            associations,
            drag: DragDropCoordinator::new(),
            masking: MaskingService::new(masking),
        };
        session.refresh_drop_zones();
        session
    }

    /// Current page.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Association table.
    pub fn associations(&self) -> &AssociationStore {
        &self.associations
    }

    /// Mutable association table for manual edits.
    pub fn associations_mut(&mut self) -> &mut AssociationStore {
        &mut self.associations
    }

    /// Drag coordinator.
    pub fn drag(&self) -> &DragDropCoordinator {
        &self.drag
    }

    /// Mutable drag coordinator (start/end drags, custom zones).
    pub fn drag_mut(&mut self) -> &mut DragDropCoordinator {
        &mut self.drag
    }

    /// Masking service.
    pub fn masking_mut(&mut self) -> &mut MaskingService {
        &mut self.masking
    }

    /// Re-register one drop zone per panel. Call after panels are added, removed or resized.
    pub fn refresh_drop_zones(&mut self) {
        self.drag.register_panel_zones(&self.page.elements);
    }

    /// Append an element; panel additions refresh the drop zones.
    pub fn add_element(&mut self, element: Element) -> KomaResult<()> {
        element.validate()?;
        if self.page.element(&element.id).is_some() {
            return Err(KomaError::validation(format!(
                "element id '{}' already exists",
                element.id
            )));
        }
        let is_panel = element.is_panel();
        self.page.elements.push(element);
        if is_panel {
            self.refresh_drop_zones();
        }
        Ok(())
    }

    /// Finish the active drag at `(x, y)`.
    ///
    /// The new image element is appended to the page, then every panel above it that it
    /// significantly overlaps gains it as an automatic association. Returns the new element id,
    /// or `None` when no drag was active.
    pub fn drop_at(&mut self, x: f64, y: f64) -> Option<String> {
        let element = self.drag.handle_drop(x, y)?;
        self.drag.end_drag();
        let image_id = element.id.clone();
        let image_z = element.z_index();
        self.page.elements.push(element);

        let panel_ids: Vec<String> = self
            .page
            .elements
            .iter()
            .filter(|e| e.is_panel() && e.z_index() > image_z)
            .map(|e| e.id.clone())
            .collect();
        for panel_id in panel_ids {
            let hits = significant_image_ids(&panel_id, &self.page.elements);
            if !hits.iter().any(|id| *id == image_id) {
                continue;
            }
            let mut merged = self.associations.images_for(&panel_id);
            if !merged.contains(&image_id) {
                merged.push(image_id.clone());
            }
            tracing::debug!(panel_id, image_id, "auto-associating dropped image");
            self.associations.create_automatic(&panel_id, &merged);
        }
        Some(image_id)
    }

    /// Delete an element and drop associations that referenced it.
    pub fn remove_element(&mut self, id: &str) -> Option<Element> {
        let idx = self.page.elements.iter().position(|e| e.id == id)?;
        let removed = self.page.elements.remove(idx);
        let live: HashSet<&str> = self.page.elements.iter().map(|e| e.id.as_str()).collect();
        self.associations.cleanup(live);
        if removed.is_panel() {
            self.refresh_drop_zones();
        }
        Some(removed)
    }

    /// Masked container for a panel whose association has masking enabled.
    ///
    /// Returns `None` when the panel has no association or masking is off. The container is
    /// attached to the page.
    pub fn masked_container_for(
        &mut self,
        panel_id: &str,
        options: &MaskOptions,
    ) -> KomaResult<Option<MaskedContainer>> {
        let Some(assoc) = self.associations.get(panel_id).filter(|a| a.mask_enabled) else {
            return Ok(None);
        };
        let panel = self
            .page
            .element(panel_id)
            .ok_or_else(|| KomaError::validation(format!("unknown panel '{panel_id}'")))?;
        let images: Vec<Element> = assoc
            .image_ids
            .iter()
            .filter_map(|id| self.page.element(id).cloned())
            .collect();
        let mut container = self.masking.build_masked_container(panel, &images, options)?;
        container.attach(self.page.id.clone());
        Ok(Some(container))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assembly/session.rs"]
mod tests;
