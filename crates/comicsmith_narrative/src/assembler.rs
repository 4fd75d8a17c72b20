//! Page packing.

use comicsmith_core::{
    GenerationOutcome, GenerationResult, Page, PageId, PanelId, PanelSlot, Scene,
};
use comicsmith_rate_limit::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Layout problems that do not stop assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyWarning {
    /// No page can hold even one panel
    #[display("max_panels_per_page is {}, emitting one oversized page per scene", max_panels_per_page)]
    UnsatisfiableLayout {
        /// Configured page capacity
        max_panels_per_page: usize,
    },
    /// A panel had no generation result at all
    #[display("{} has no generation result", panel_id)]
    MissingResult {
        /// Panel without a result
        panel_id: PanelId,
    },
}

/// Assembled pages and the warnings raised while packing them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    /// Pages in reading order
    pub pages: Vec<Page>,
    /// Layout warnings
    pub warnings: Vec<AssemblyWarning>,
}

/// Packs panels onto pages in story order.
///
/// Panels are never reordered. A panel without an image keeps its slot as a
/// placeholder carrying the reason it was omitted.
#[derive(Debug, Clone, Default)]
pub struct PageAssembler {
    config: LayoutConfig,
}

impl PageAssembler {
    /// Create an assembler with a layout policy.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Pack every panel of every scene onto pages.
    #[instrument(skip_all, fields(scenes = scenes.len(), max_panels_per_page = self.config.max_panels_per_page))]
    pub fn assemble(
        &self,
        scenes: &[Scene],
        results: &BTreeMap<PanelId, GenerationResult>,
    ) -> Assembly {
        let mut assembly = Assembly::default();
        let max = self.config.max_panels_per_page;

        if max == 0 {
            let warning = AssemblyWarning::UnsatisfiableLayout {
                max_panels_per_page: max,
            };
            warn!(%warning, "Page layout cannot be satisfied");
            assembly.warnings.push(warning);
            for scene in scenes {
                let slots = scene
                    .panels
                    .iter()
                    .map(|panel| slot_for(panel.id, results, &mut assembly.warnings))
                    .collect();
                push_page(&mut assembly.pages, slots, true);
            }
            return assembly;
        }

        let mut current: Vec<PanelSlot> = Vec::new();
        for scene in scenes {
            let needed = scene.panels.len();
            let remaining = max - current.len();
            if self.config.keep_scenes_together
                && !current.is_empty()
                && needed <= max
                && needed > remaining
            {
                debug!(scene = %scene.id, needed, remaining, "Starting scene on a fresh page");
                push_page(&mut assembly.pages, std::mem::take(&mut current), false);
            }

            for panel in &scene.panels {
                if current.len() == max {
                    push_page(&mut assembly.pages, std::mem::take(&mut current), false);
                }
                current.push(slot_for(panel.id, results, &mut assembly.warnings));
            }
        }
        if !current.is_empty() {
            push_page(&mut assembly.pages, current, false);
        }

        debug!(pages = assembly.pages.len(), "Assembled pages");
        assembly
    }
}

fn slot_for(
    panel_id: PanelId,
    results: &BTreeMap<PanelId, GenerationResult>,
    warnings: &mut Vec<AssemblyWarning>,
) -> PanelSlot {
    match results.get(&panel_id).map(|result| &result.outcome) {
        Some(GenerationOutcome::Succeeded(image)) => PanelSlot::Filled {
            panel_id,
            image: image.clone(),
        },
        Some(GenerationOutcome::Failed(reason)) => PanelSlot::Placeholder {
            panel_id,
            reason: reason.to_string(),
        },
        None => {
            let warning = AssemblyWarning::MissingResult { panel_id };
            warn!(%warning, "Placing placeholder");
            warnings.push(warning);
            PanelSlot::Placeholder {
                panel_id,
                reason: "no generation result".to_string(),
            }
        }
    }
}

fn push_page(pages: &mut Vec<Page>, slots: Vec<PanelSlot>, oversized: bool) {
    let ordinal = pages.len() as u32 + 1;
    pages.push(Page {
        id: PageId(ordinal),
        ordinal,
        slots,
        oversized,
    });
}
