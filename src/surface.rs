//! Surface adapters
//!
//! A surface is one channel through which control values are shown and
//! changed (touchscreen, wireless peer, operator console). Adapters implement
//! [`Surface`] so the sync engine can push values back to them; they change
//! values by calling the engine handle with their own [`SurfaceId`] as origin.

use std::fmt;

use crate::state::{ControlId, ControlSnapshot};

/// Identity of a surface, used as the origin of every mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    Touchscreen,
    PeerLink,
    Console,
}

impl SurfaceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceId::Touchscreen => "touchscreen",
            SurfaceId::PeerLink => "peer-link",
            SurfaceId::Console => "console",
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which part of a surface a resync repaints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncScope {
    /// Everything the surface shows
    All,
    /// One touchscreen page
    Page(Page),
}

/// Touchscreen pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Primary buttons and the speed slider
    Main,
    /// Secondary buttons
    Secondary,
}

impl Page {
    /// Page hosting a control
    pub fn of(id: ControlId) -> Page {
        match id {
            ControlId::Button(_) | ControlId::Slider => Page::Main,
            ControlId::PageButton(_) => Page::Secondary,
        }
    }

    /// Whether `scope` covers this page
    pub fn in_scope(self, scope: ResyncScope) -> bool {
        match scope {
            ResyncScope::All => true,
            ResyncScope::Page(page) => page == self,
        }
    }
}

/// Engine-facing side of an adapter
///
/// All methods are called from inside the engine's critical section and must
/// return promptly: queue the physical write, never wait for it. They must
/// not call back into the engine and await the answer.
pub trait Surface: Send + Sync {
    /// Identity used for origin exclusion
    fn id(&self) -> SurfaceId;

    /// A control changed somewhere else; show the new value
    fn refresh(&self, control: ControlId, value: i32);

    /// This surface's own change was applied
    ///
    /// Called on the origin in place of [`Surface::refresh`], so caches of
    /// what the surface displays stay ordered with every other mutation.
    fn applied_locally(&self, _control: ControlId, _value: i32) {}

    /// Full state after a mutation
    ///
    /// Default: ignore. The peer link forwards it as its status notification.
    fn publish(&self, _snapshot: &ControlSnapshot) {}

    /// Repaint from a snapshot without any state change
    fn resync(&self, scope: ResyncScope, snapshot: &ControlSnapshot);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_membership() {
        assert_eq!(Page::of(ControlId::Button(3)), Page::Main);
        assert_eq!(Page::of(ControlId::Slider), Page::Main);
        assert_eq!(Page::of(ControlId::PageButton(1)), Page::Secondary);
    }

    #[test]
    fn test_scope() {
        assert!(Page::Main.in_scope(ResyncScope::All));
        assert!(Page::Main.in_scope(ResyncScope::Page(Page::Main)));
        assert!(!Page::Secondary.in_scope(ResyncScope::Page(Page::Main)));
    }
}
