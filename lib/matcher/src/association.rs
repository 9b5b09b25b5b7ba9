//! Geographic association between a soil polygon and occurrence records
//!
//! Records inside the polygon's bounding box are preferred. When none fall
//! inside, the records nearest to the polygon centroid are used instead,
//! treating latitude/longitude as flat coordinates. Distances are computed
//! into a buffer owned by the call; the shared occurrence table is never
//! written to.

use ordered_float::OrderedFloat;
use smallvec::SmallVec;
use soilmatch_core::{Coord, Geometry, OccurrenceRecord};
use std::collections::BinaryHeap;

/// How the records of an [`Association`] were found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationSource {
    BoundingBox,
    NearestFallback,
}

/// Occurrence records associated with one polygon, in discovery order
#[derive(Debug, Clone)]
pub struct Association<'a> {
    pub source: AssociationSource,
    pub records: Vec<&'a OccurrenceRecord>,
}

impl<'a> Association<'a> {
    /// Up to `cap` distinct taxon names, first-discovered first
    pub fn distinct_taxa(&self, cap: usize) -> SmallVec<[&'a str; 4]> {
        let mut taxa: SmallVec<[&'a str; 4]> = SmallVec::new();
        for record in &self.records {
            if taxa.len() >= cap {
                break;
            }
            let name = record.taxon.as_str();
            if !taxa.contains(&name) {
                taxa.push(name);
            }
        }
        taxa
    }
}

/// Associate occurrences with a polygon geometry.
///
/// Returns `None` when the geometry is unusable or no record could be
/// associated, which makes the polygon skip its contribution.
pub fn associate<'a>(
    occurrences: &'a [OccurrenceRecord],
    geometry: &Geometry,
    fallback_nearest: usize,
) -> Option<Association<'a>> {
    let bbox = geometry.bounding_box()?;

    let inside: Vec<&OccurrenceRecord> = occurrences
        .iter()
        .filter(|o| bbox.contains(o.longitude, o.latitude))
        .collect();
    if !inside.is_empty() {
        return Some(Association {
            source: AssociationSource::BoundingBox,
            records: inside,
        });
    }

    let centroid = geometry.centroid()?;
    let nearest: Vec<&OccurrenceRecord> = nearest_occurrences(occurrences, centroid, fallback_nearest)
        .into_iter()
        .map(|row| &occurrences[row])
        .collect();
    if nearest.is_empty() {
        return None;
    }
    Some(Association {
        source: AssociationSource::NearestFallback,
        records: nearest,
    })
}

/// Rows of the `n` records closest to `center`, ascending by distance,
/// ties broken by table order
pub fn nearest_occurrences(occurrences: &[OccurrenceRecord], center: Coord, n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }

    // Max-heap on (distance, row): the top is the current worst kept record
    let mut heap: BinaryHeap<(OrderedFloat<f64>, usize)> = BinaryHeap::with_capacity(n + 1);
    for (row, o) in occurrences.iter().enumerate() {
        let dy = o.latitude - center.y;
        let dx = o.longitude - center.x;
        let candidate = (OrderedFloat((dy * dy + dx * dx).sqrt()), row);
        if heap.len() < n {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec().into_iter().map(|(_, row)| row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use soilmatch_core::Polygon;

    fn square() -> Geometry {
        Geometry::Polygon(Polygon::rectangle(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_inside_bbox_wins() {
        let occurrences = vec![
            OccurrenceRecord::new("Far", 50.0, 50.0),
            OccurrenceRecord::new("Bacillus X", 5.0, 5.0),
        ];
        let assoc = associate(&occurrences, &square(), 3).unwrap();
        assert_eq!(assoc.source, AssociationSource::BoundingBox);
        assert_eq!(assoc.records.len(), 1);
        assert_eq!(assoc.records[0].taxon, "Bacillus X");
    }

    #[test]
    fn test_edge_records_are_inside() {
        let occurrences = vec![
            OccurrenceRecord::new("Corner", 10.0, 10.0),
            OccurrenceRecord::new("Edge", 0.0, 7.5),
            OccurrenceRecord::new("Outside", 10.5, 5.0),
        ];
        let assoc = associate(&occurrences, &square(), 3).unwrap();
        let names: Vec<&str> = assoc.records.iter().map(|r| r.taxon.as_str()).collect();
        assert_eq!(names, vec!["Corner", "Edge"]);
    }

    #[test]
    fn test_fallback_to_nearest() {
        let occurrences = vec![
            OccurrenceRecord::new("A", 50.0, 50.0),
            OccurrenceRecord::new("B", 20.0, 5.0),
            OccurrenceRecord::new("C", 5.0, 30.0),
            OccurrenceRecord::new("D", 15.0, 15.0),
        ];
        let assoc = associate(&occurrences, &square(), 3).unwrap();
        assert_eq!(assoc.source, AssociationSource::NearestFallback);
        let names: Vec<&str> = assoc.records.iter().map(|r| r.taxon.as_str()).collect();
        // Distances from (5, 5): D 14.1, B 15.0, C 25.0, A 63.6
        assert_eq!(names, vec!["D", "B", "C"]);
    }

    #[test]
    fn test_nearest_ties_by_table_order() {
        let occurrences = vec![
            OccurrenceRecord::new("N", 1.0, 0.0),
            OccurrenceRecord::new("E", 0.0, 1.0),
            OccurrenceRecord::new("S", -1.0, 0.0),
            OccurrenceRecord::new("W", 0.0, -1.0),
        ];
        let rows = nearest_occurrences(&occurrences, Coord::new(0.0, 0.0), 3);
        assert_eq!(rows, vec![0, 1, 2]);
        assert!(nearest_occurrences(&occurrences, Coord::new(0.0, 0.0), 0).is_empty());
    }

    #[test]
    fn test_no_records_and_bad_geometry() {
        assert!(associate(&[], &square(), 3).is_none());

        let empty = Geometry::Polygon(Polygon::new(Vec::new(), Vec::new()));
        let occurrences = vec![OccurrenceRecord::new("A", 1.0, 1.0)];
        assert!(associate(&occurrences, &empty, 3).is_none());
    }

    #[test]
    fn test_distinct_taxa_cap_and_order() {
        let occurrences = vec![
            OccurrenceRecord::new("A", 1.0, 1.0),
            OccurrenceRecord::new("A", 2.0, 2.0),
            OccurrenceRecord::new("B", 3.0, 3.0),
            OccurrenceRecord::new("C", 4.0, 4.0),
            OccurrenceRecord::new("D", 5.0, 5.0),
        ];
        let assoc = associate(&occurrences, &square(), 3).unwrap();
        assert_eq!(assoc.distinct_taxa(3).as_slice(), &["A", "B", "C"]);
        assert_eq!(assoc.distinct_taxa(1).as_slice(), &["A"]);
    }
}
