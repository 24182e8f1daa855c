//! Page layout - the grid cards the dashboard renders and where each view mounts

use serde::Serialize;

use crate::api::types::GridId;

/// One grid card and the mount points it offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCard {
    pub id: GridId,
    /// Only active cards are charted and polled
    pub active: bool,
    pub chart_mount: bool,
    pub stats_container: bool,
    pub info_panel: bool,
    pub trades_table: bool,
    /// State a toggle asked the service for, until the service confirms it
    pub requested: Option<bool>,
}

impl GridCard {
    /// Card with every standard mount point except the trades table
    pub fn new(id: GridId, active: bool) -> Self {
        Self {
            id,
            active,
            chart_mount: true,
            stats_container: true,
            info_panel: true,
            trades_table: false,
            requested: None,
        }
    }

    /// State the card ends up in once every sent toggle goes through
    pub fn expected_active(&self) -> bool {
        self.requested.unwrap_or(self.active)
    }
}

/// The grid cards of the page, in display order
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageLayout {
    cards: Vec<GridCard>,
}

impl PageLayout {
    /// Later cards with a duplicate id are dropped
    pub fn new(cards: Vec<GridCard>) -> Self {
        let mut unique: Vec<GridCard> = Vec::with_capacity(cards.len());
        for card in cards {
            if !unique.iter().any(|c| c.id == card.id) {
                unique.push(card);
            }
        }
        Self { cards: unique }
    }

    pub fn cards(&self) -> &[GridCard] {
        &self.cards
    }

    pub fn card(&self, id: GridId) -> Option<&GridCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn active_grid_ids(&self) -> Vec<GridId> {
        self.cards.iter().filter(|c| c.active).map(|c| c.id).collect()
    }

    /// Active cards plus cards waiting on a start request
    pub fn polled_grid_ids(&self) -> Vec<GridId> {
        self.cards
            .iter()
            .filter(|c| c.active || c.requested == Some(true))
            .map(|c| c.id)
            .collect()
    }

    pub fn has_chart_mount(&self, id: GridId) -> bool {
        self.card(id).map(|c| c.chart_mount).unwrap_or(false)
    }

    /// Record the state the service reports for a card, settling any request
    pub fn set_active(&mut self, id: GridId, active: bool) -> bool {
        match self.cards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.active = active;
                card.requested = None;
                true
            }
            None => false,
        }
    }

    /// Record a toggle the service accepted without confirming it
    ///
    /// A request back to the reported state cancels the pending one.
    pub fn record_request(&mut self, id: GridId, target: bool) -> bool {
        match self.cards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.requested = (target != card.active).then_some(target);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: GridId) -> Option<GridCard> {
        let pos = self.cards.iter().position(|c| c.id == id)?;
        Some(self.cards.remove(pos))
    }
}
