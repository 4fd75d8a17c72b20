//! Assembled comic pages.

use crate::{ImageRef, PageId, PanelId};
use serde::{Deserialize, Serialize};

/// A panel position on a page.
///
/// Failed panels keep their slot so the layout never compresses around them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "slot")]
pub enum PanelSlot {
    /// The panel's generated image
    Filled {
        /// Panel shown in this slot
        panel_id: PanelId,
        /// Generated image
        image: ImageRef,
    },
    /// Stand-in for a panel that has no image
    Placeholder {
        /// Panel that was omitted
        panel_id: PanelId,
        /// Why it was omitted
        reason: String,
    },
}

impl PanelSlot {
    /// Panel occupying the slot.
    pub fn panel_id(&self) -> PanelId {
        match self {
            PanelSlot::Filled { panel_id, .. } | PanelSlot::Placeholder { panel_id, .. } => {
                *panel_id
            }
        }
    }

    /// Whether this slot is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, PanelSlot::Placeholder { .. })
    }
}

/// One comic page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page id
    pub id: PageId,
    /// 1-based position in the comic
    pub ordinal: u32,
    /// Ordered panel slots
    pub slots: Vec<PanelSlot>,
    /// Whether the page exceeds the configured panel limit
    pub oversized: bool,
}

impl Page {
    /// Panel ids in slot order.
    pub fn panel_ids(&self) -> Vec<PanelId> {
        self.slots.iter().map(PanelSlot::panel_id).collect()
    }
}
