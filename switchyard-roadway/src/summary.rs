//! aggregate summaries of the links table.

use indexmap::IndexMap;

use crate::model::RoadLink;

/// lane-miles per roadway class: the sum of lanes x distance, grouped by the
/// `roadway` column in first-seen order.
pub fn lane_miles_by_roadway(links: &[RoadLink]) -> IndexMap<String, f64> {
    let mut summary: IndexMap<String, f64> = IndexMap::new();
    for link in links {
        let lane_miles = link.lanes as f64 * link.distance;
        *summary.entry(link.roadway.clone()).or_insert(0.0) += lane_miles;
    }
    summary
}

/// link counts per roadway class.
pub fn link_counts_by_roadway(links: &[RoadLink]) -> IndexMap<String, usize> {
    let mut summary: IndexMap<String, usize> = IndexMap::new();
    for link in links {
        *summary.entry(link.roadway.clone()).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::RoadLink;

    #[test]
    fn test_lane_miles_grouped_by_class() {
        let mut motorway = RoadLink::test_link(1, 1, 2);
        motorway.roadway = "motorway".to_string();
        motorway.lanes = 3;
        motorway.distance = 2.0;
        let mut residential = RoadLink::test_link(2, 2, 3);
        residential.roadway = "residential".to_string();
        residential.lanes = 1;
        residential.distance = 0.5;
        let mut motorway2 = RoadLink::test_link(3, 3, 4);
        motorway2.roadway = "motorway".to_string();
        motorway2.lanes = 2;
        motorway2.distance = 1.0;

        let summary = lane_miles_by_roadway(&[motorway, residential, motorway2]);
        assert_eq!(summary["motorway"], 8.0);
        assert_eq!(summary["residential"], 0.5);
        assert_eq!(summary.len(), 2);
    }
}
