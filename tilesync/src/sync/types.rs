//! Core types shared by the synchronization components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::coord::TileCoordinate;

/// Opaque, order-comparable watermark of the last locally applied update.
///
/// Tokens are ISO timestamps in practice and compare as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a raw token. Empty strings mean "no local data" and yield `None`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two entity kinds synchronized per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Markers,
    Reviews,
}

impl EntityKind {
    /// Both kinds in dispatch order.
    pub const ALL: [EntityKind; 2] = [EntityKind::Markers, EntityKind::Reviews];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Markers => "markers",
            EntityKind::Reviews => "reviews",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tile watermarks as known by the Tile Store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastUpdateInfo {
    pub marker: Option<VersionToken>,
    pub review: Option<VersionToken>,
}

impl LastUpdateInfo {
    pub fn new(marker: Option<VersionToken>, review: Option<VersionToken>) -> Self {
        Self { marker, review }
    }

    /// Watermark for one entity kind.
    pub fn token(&self, kind: EntityKind) -> Option<&VersionToken> {
        match kind {
            EntityKind::Markers => self.marker.as_ref(),
            EntityKind::Reviews => self.review.as_ref(),
        }
    }

    pub(crate) fn token_mut(&mut self, kind: EntityKind) -> &mut Option<VersionToken> {
        match kind {
            EntityKind::Markers => &mut self.marker,
            EntityKind::Reviews => &mut self.review,
        }
    }

    /// True when neither kind has local data.
    pub fn is_empty(&self) -> bool {
        self.marker.is_none() && self.review.is_none()
    }
}

/// What to do with one entity kind of one tile this cycle.
///
/// Serialized as `"None"`, `"Sync"`, `"Export"` or `"Delete"`; parsing is
/// case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncDecision {
    #[default]
    None,
    Sync,
    Export,
    Delete,
}

impl SyncDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDecision::None => "None",
            SyncDecision::Sync => "Sync",
            SyncDecision::Export => "Export",
            SyncDecision::Delete => "Delete",
        }
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(SyncDecision::None),
            "sync" => Ok(SyncDecision::Sync),
            "export" => Ok(SyncDecision::Export),
            "delete" => Ok(SyncDecision::Delete),
            other => Err(format!("unknown sync decision '{}'", other)),
        }
    }
}

impl Serialize for SyncDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SyncDecision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolved decisions for one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDecision {
    pub tile: TileCoordinate,
    pub markers: SyncDecision,
    pub reviews: SyncDecision,
}

impl TileDecision {
    pub fn decision(&self, kind: EntityKind) -> SyncDecision {
        match kind {
            EntityKind::Markers => self.markers,
            EntityKind::Reviews => self.reviews,
        }
    }

    /// True when either kind needs a bulk export.
    pub fn needs_export(&self) -> bool {
        self.markers == SyncDecision::Export || self.reviews == SyncDecision::Export
    }
}

/// Result of an incremental sync of one tile and entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Backlog drained (or loop guard tripped after a successful page).
    Success,
    /// A call failed; retried next cycle.
    Fail,
    /// The server reported the client too far behind; fall back to export.
    ExportRequired,
}
