//! Plot tile configuration store
//!
//! Every operation takes the current configuration and returns a complete
//! new one; nothing is updated in place. Operations whose preconditions are
//! not met return an unchanged copy, since they are reachable through
//! ordinary UI races such as double clicks.
//!
//! Older configurations stored a single signal name per tile. Such entries
//! are kept as [`TileAssignment::Single`] until the tile is first touched,
//! at which point they become a one-element list.

use crate::types::TILE_COUNT;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Tile identifiers
// ============================================================================

/// One of the four fixed plot tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TileId {
    #[serde(rename = "plot-tile-1")]
    Tile1,
    #[serde(rename = "plot-tile-2")]
    Tile2,
    #[serde(rename = "plot-tile-3")]
    Tile3,
    #[serde(rename = "plot-tile-4")]
    Tile4,
}

impl TileId {
    pub const ALL: [TileId; TILE_COUNT] = [TileId::Tile1, TileId::Tile2, TileId::Tile3, TileId::Tile4];

    /// 1-based tile number
    pub fn number(self) -> usize {
        match self {
            TileId::Tile1 => 1,
            TileId::Tile2 => 2,
            TileId::Tile3 => 3,
            TileId::Tile4 => 4,
        }
    }

    pub fn from_number(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TileId::Tile1 => "plot-tile-1",
            TileId::Tile2 => "plot-tile-2",
            TileId::Tile3 => "plot-tile-3",
            TileId::Tile4 => "plot-tile-4",
        }
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown tile id: {0}")]
pub struct UnknownTile(pub String);

impl FromStr for TileId {
    type Err = UnknownTile;

    /// Accepts `plot-tile-N`, `tile-N` and a bare `N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("plot-tile-")
            .or_else(|| s.strip_prefix("tile-"))
            .unwrap_or(s);
        digits
            .parse()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| UnknownTile(s.to_string()))
    }
}

// ============================================================================
// Assignments
// ============================================================================

/// Signals assigned to one tile, in either the legacy or the current form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileAssignment {
    Single(String),
    List(Vec<String>),
}

impl TileAssignment {
    /// Read view; a single name reads as a one-element list
    pub fn as_slice(&self) -> &[String] {
        match self {
            TileAssignment::Single(name) => std::slice::from_ref(name),
            TileAssignment::List(names) => names,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, TileAssignment::Single(_))
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Convert a single name into a one-element list
    fn migrate(&mut self) {
        if let TileAssignment::Single(name) = self {
            *self = TileAssignment::List(vec![std::mem::take(name)]);
        }
    }

    /// Drop repeated names from a list, keeping the first occurrence
    fn deduplicated(self) -> Self {
        match self {
            TileAssignment::List(names) => {
                let mut seen = HashSet::with_capacity(names.len());
                TileAssignment::List(
                    names
                        .into_iter()
                        .filter(|name| seen.insert(name.clone()))
                        .collect(),
                )
            }
            single => single,
        }
    }

    /// Append `name` unless present. Returns whether the list changed.
    fn push_unique(&mut self, name: &str) -> bool {
        self.migrate();
        match self {
            TileAssignment::List(names) if !names.iter().any(|n| n == name) => {
                names.push(name.to_string());
                true
            }
            _ => false,
        }
    }
}

impl From<Vec<String>> for TileAssignment {
    fn from(names: Vec<String>) -> Self {
        TileAssignment::List(names)
    }
}

impl From<&str> for TileAssignment {
    fn from(name: &str) -> Self {
        TileAssignment::Single(name.to_string())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Tile assignments, active tile and selected signal of one session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ConfigurationTransport")]
pub struct TileConfiguration {
    assignments: BTreeMap<TileId, TileAssignment>,
    active_tile: Option<TileId>,
    selected_signal: Option<String>,
}

impl TileConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with the given assignments, e.g. loaded from an older
    /// session. Empty entries are dropped and repeated names within a list
    /// keep only their first occurrence.
    pub fn from_assignments<I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = (TileId, TileAssignment)>,
    {
        Self {
            assignments: assignments
                .into_iter()
                .filter(|(_, a)| !a.is_empty())
                .map(|(tile, a)| (tile, a.deduplicated()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn active_tile(&self) -> Option<TileId> {
        self.active_tile
    }

    pub fn selected_signal(&self) -> Option<&str> {
        self.selected_signal.as_deref()
    }

    /// Stored entry for `tile`, exactly as held
    pub fn assignment(&self, tile: TileId) -> Option<&TileAssignment> {
        self.assignments.get(&tile)
    }

    /// Signals of `tile`; a legacy single name reads as one element
    pub fn signals(&self, tile: TileId) -> &[String] {
        self.assignments
            .get(&tile)
            .map(TileAssignment::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_assigned(&self, tile: TileId) -> bool {
        !self.signals(tile).is_empty()
    }

    /// Tiles with at least one signal, in tile order
    pub fn assigned_tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.assignments.keys().copied()
    }

    pub fn select_tile(&self, tile: TileId) -> Self {
        Self {
            active_tile: Some(tile),
            ..self.clone()
        }
    }

    pub fn select_signal(&self, name: &str) -> Self {
        Self {
            selected_signal: Some(name.to_string()),
            ..self.clone()
        }
    }

    /// Drop the selected signal, keeping tiles and assignments
    pub fn deselect_signal(&self) -> Self {
        Self {
            selected_signal: None,
            ..self.clone()
        }
    }

    /// Append the selected signal to the active tile, once.
    pub fn add_signal_to_active_tile(&self) -> Self {
        let (Some(tile), Some(signal)) = (self.active_tile, self.selected_signal.as_deref()) else {
            debug!(
                active_tile = ?self.active_tile,
                selected = ?self.selected_signal,
                "add ignored: needs active tile and selected signal"
            );
            return self.clone();
        };

        let mut next = self.clone();
        let added = next
            .assignments
            .entry(tile)
            .or_insert_with(|| TileAssignment::List(Vec::new()))
            .push_unique(signal);
        debug!(tile = %tile, signal, added, "add signal to tile");
        next
    }

    /// Remove the active tile's assignment entirely
    pub fn clear_active_tile(&self) -> Self {
        let Some(tile) = self.active_tile else {
            debug!("clear ignored: no active tile");
            return self.clone();
        };

        let mut next = self.clone();
        next.assignments.remove(&tile);
        debug!(tile = %tile, "tile cleared");
        next
    }

    /// Convert a legacy single-name entry for `tile` into a list
    pub fn migrate(&self, tile: TileId) -> Self {
        match self.assignments.get(&tile) {
            Some(assignment) if assignment.is_legacy() => {
                let mut next = self.clone();
                if let Some(assignment) = next.assignments.get_mut(&tile) {
                    assignment.migrate();
                }
                debug!(tile = %tile, "legacy tile assignment migrated");
                next
            }
            _ => self.clone(),
        }
    }

    /// Read `tile`, migrating a legacy entry on the way.
    pub fn read_tile(&self, tile: TileId) -> (Self, Vec<String>) {
        let next = self.migrate(tile);
        let signals = next.signals(tile).to_vec();
        (next, signals)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationTransport {
    #[serde(default)]
    assignments: BTreeMap<TileId, TileAssignment>,
    #[serde(default)]
    active_tile: Option<TileId>,
    #[serde(default)]
    selected_signal: Option<String>,
}

impl From<ConfigurationTransport> for TileConfiguration {
    fn from(t: ConfigurationTransport) -> Self {
        Self {
            active_tile: t.active_tile,
            selected_signal: t.selected_signal,
            ..Self::from_assignments(t.assignments)
        }
    }
}
