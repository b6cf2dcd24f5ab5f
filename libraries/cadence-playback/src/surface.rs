//! Video surface arbitration
//!
//! Presentation components mount rendering surfaces; the controller decides
//! which one (if any) receives video playback so two surfaces never race for
//! the same backend. Surfaces are referenced by id only; their lifecycle
//! belongs to whoever mounted them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a mounted video surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Where a surface is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceRole {
    /// Full-screen player
    Expanded,

    /// Embedded in a list, card or mini player
    Inline,
}

#[derive(Debug, Clone, Copy)]
struct Mounted {
    id: SurfaceId,
    role: SurfaceRole,
}

/// Tracks mounted surfaces and picks the active one
///
/// - expanded: the most recently mounted `Expanded` surface
/// - otherwise: the most recent inline surface claiming to be active
#[derive(Debug, Default)]
pub(crate) struct SurfaceArbiter {
    next_id: u64,
    mounted: Vec<Mounted>,
    inline_claims: Vec<SurfaceId>,
    expanded: bool,
    active: Option<SurfaceId>,
}

impl SurfaceArbiter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mount(&mut self, role: SurfaceRole) -> SurfaceId {
        self.next_id += 1;
        let id = SurfaceId(self.next_id);
        self.mounted.push(Mounted { id, role });
        id
    }

    /// Returns false if the id was not mounted
    pub(crate) fn unmount(&mut self, id: SurfaceId) -> bool {
        let before = self.mounted.len();
        self.mounted.retain(|m| m.id != id);
        self.inline_claims.retain(|c| *c != id);
        before != self.mounted.len()
    }

    /// Returns false if the id is not a mounted inline surface
    pub(crate) fn set_inline_active(&mut self, id: SurfaceId, active: bool) -> bool {
        let is_inline = self
            .mounted
            .iter()
            .any(|m| m.id == id && m.role == SurfaceRole::Inline);
        if !is_inline {
            return false;
        }

        self.inline_claims.retain(|c| *c != id);
        if active {
            self.inline_claims.push(id);
        }
        true
    }

    pub(crate) fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    pub(crate) fn active(&self) -> Option<SurfaceId> {
        self.active
    }

    fn resolve(&self) -> Option<SurfaceId> {
        if self.expanded {
            self.mounted
                .iter()
                .rev()
                .find(|m| m.role == SurfaceRole::Expanded)
                .map(|m| m.id)
        } else {
            self.inline_claims.last().copied()
        }
    }

    /// Recompute the active surface
    ///
    /// Returns `Some(new)` only when it changed.
    pub(crate) fn refresh(&mut self) -> Option<Option<SurfaceId>> {
        let resolved = self.resolve();
        if resolved == self.active {
            None
        } else {
            self.active = resolved;
            Some(resolved)
        }
    }
}
