//! a transit network: a feed plus an optional non-owning handle to the
//! roadway network it runs on.

use std::rc::Rc;

use crate::error::TransitError;
use crate::feed::Feed;
use crate::validate::validate_consistency;
use switchyard_roadway::RoadwayNetwork;

/// a transit network. publishing a feed re-checks roadway consistency when a
/// road network handle is set.
///
/// the roadway handle is shared, not owned: a deep copy of the transit
/// network clones the handle rather than the roadway network behind it, and
/// callers must re-link after replacing the roadway network.
#[derive(Debug, Clone)]
pub struct TransitNetwork {
    feed: Feed,
    road_net: Option<Rc<RoadwayNetwork>>,
}

impl TransitNetwork {
    pub fn new(feed: Feed) -> TransitNetwork {
        TransitNetwork {
            feed,
            road_net: None,
        }
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn road_net(&self) -> Option<&RoadwayNetwork> {
        self.road_net.as_deref()
    }

    /// a shared handle to the roadway network, when one is set.
    pub fn road_net_handle(&self) -> Option<Rc<RoadwayNetwork>> {
        self.road_net.clone()
    }

    /// replace the feed, validating roadway consistency against the handle
    /// when one is set. on failure the previous feed remains.
    pub fn set_feed(&mut self, feed: Feed) -> Result<(), TransitError> {
        if let Some(road_net) = &self.road_net {
            validate_consistency(&feed, road_net)?;
        }
        self.feed = feed;
        Ok(())
    }

    /// attach a roadway network handle, validating consistency first.
    pub fn set_road_net(&mut self, road_net: Rc<RoadwayNetwork>) -> Result<(), TransitError> {
        validate_consistency(&self.feed, &road_net)?;
        self.road_net = Some(road_net);
        Ok(())
    }

    pub fn clear_road_net(&mut self) {
        self.road_net = None;
    }

    /// deep copy. the feed is duplicated by value; the roadway handle is
    /// shared with the original and may need re-linking.
    pub fn deepcopy(&self) -> TransitNetwork {
        if self.road_net.is_some() {
            log::warn!("deep copy of transit network shares the roadway network handle; re-link if the roadway network is replaced");
        }
        self.clone()
    }
}

impl PartialEq for TransitNetwork {
    fn eq(&self, other: &Self) -> bool {
        self.feed == other.feed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::testfeed::feed_with_trips;
    use switchyard_roadway::{RoadLink, RoadNode};

    fn road() -> Rc<RoadwayNetwork> {
        let nodes = vec![RoadNode::new(1, 0.0, 0.0), RoadNode::new(2, 0.01, 0.0)];
        Rc::new(RoadwayNetwork::new(vec![RoadLink::test_link(1, 1, 2)], nodes, vec![]).unwrap())
    }

    #[test]
    fn test_set_road_net_checks_consistency() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2])]));
        net.set_road_net(road()).unwrap();

        let mut bad = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2, 3])]));
        assert!(bad.set_road_net(road()).is_err());
    }

    #[test]
    fn test_set_feed_revalidates() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2])]));
        net.set_road_net(road()).unwrap();
        let inconsistent = feed_with_trips(&[("t1", "s1", vec![1, 2, 3])]);
        assert!(net.set_feed(inconsistent).is_err());
        assert_eq!(net.feed().stops().len(), 2, "previous feed retained");
    }

    #[test]
    fn test_deepcopy_shares_road_handle() {
        let mut net = TransitNetwork::new(feed_with_trips(&[("t1", "s1", vec![1, 2])]));
        net.set_road_net(road()).unwrap();
        let copy = net.deepcopy();
        assert!(std::ptr::eq(
            net.road_net().unwrap(),
            copy.road_net().unwrap()
        ));
    }
}
