use serde::{Deserialize, Serialize};

use super::RoadLink;

/// travel modes used to filter links. each mode maps to a fixed set of
/// network link variables; a link serves a mode when any of the mode's
/// variables is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Drive,
    Bus,
    Rail,
    Transit,
    Walk,
    Bike,
    Any,
}

impl Mode {
    /// true if the link is accessible by this mode.
    pub fn link_allows(&self, link: &RoadLink) -> bool {
        match self {
            Mode::Drive => link.drive_access,
            Mode::Bus => link.bus_only || link.drive_access,
            Mode::Rail => link.rail_only,
            Mode::Transit => link.bus_only || link.rail_only || link.drive_access,
            Mode::Walk => link.walk_access,
            Mode::Bike => link.bike_access,
            Mode::Any => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::RoadLink;

    #[test]
    fn test_mode_link_variables() {
        let mut link = RoadLink::test_link(1, 1, 2);
        link.drive_access = false;
        link.bus_only = true;
        link.walk_access = false;
        assert!(Mode::Bus.link_allows(&link));
        assert!(Mode::Transit.link_allows(&link));
        assert!(!Mode::Drive.link_allows(&link));
        assert!(!Mode::Walk.link_allows(&link));
        assert!(Mode::Any.link_allows(&link));
    }
}
