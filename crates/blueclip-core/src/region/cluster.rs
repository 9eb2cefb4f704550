//! Density-based spatial clustering (DBSCAN) of page points.
//!
//! Two points are neighbors when their Euclidean distance is at most `eps`.
//! A point with at least `min_samples` neighbors (itself included) is a core
//! point; core points chained through neighborhoods form a region, non-core
//! neighbors of a region join it as border points, everything else is noise.
//!
//! A border point reachable from several regions joins the region of its
//! nearest core point, and regions are numbered by their lexicographically
//! smallest point, so both membership and labels are independent of input
//! order.

use std::cmp::Ordering;
use std::collections::VecDeque;

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use tracing::debug;

use crate::error::ClusterError;
use crate::geometry::{BoundingBox, Point};

/// Label assigned to each point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterLabel {
    /// Not density-reachable from any core point.
    Noise,
    /// Member of the region with this label.
    Region(usize),
}

impl ClusterLabel {
    pub fn is_noise(&self) -> bool {
        matches!(self, ClusterLabel::Noise)
    }
}

/// A density-connected group of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub label: usize,
    pub points: Vec<Point>,
}

impl Region {
    pub fn bounding_box(&self) -> Result<BoundingBox, crate::error::GeometryError> {
        BoundingBox::from_points(&self.points)
    }
}

/// Per-point labels produced by [`DensityClusterer::cluster`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clustering {
    labels: Vec<ClusterLabel>,
    region_count: usize,
}

impl Clustering {
    /// Label of every input point, in input order.
    pub fn labels(&self) -> &[ClusterLabel] {
        &self.labels
    }

    pub fn region_count(&self) -> usize {
        self.region_count
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_noise()).count()
    }

    /// Group `points` (the clustered input) into regions, noise excluded.
    pub fn regions(&self, points: &[Point]) -> Vec<Region> {
        let mut regions: Vec<Region> = (0..self.region_count)
            .map(|label| Region {
                label,
                points: Vec::new(),
            })
            .collect();

        for (point, label) in points.iter().zip(&self.labels) {
            if let ClusterLabel::Region(label) = label {
                regions[*label].points.push(*point);
            }
        }

        regions
    }
}

/// DBSCAN over an R-tree neighbor index.
#[derive(Debug, Clone, Copy)]
pub struct DensityClusterer {
    eps: f64,
    min_samples: usize,
}

impl DensityClusterer {
    pub fn new(eps: f64, min_samples: usize) -> Result<Self, ClusterError> {
        if !(eps > 0.0) {
            return Err(ClusterError::InvalidEps(eps));
        }
        if min_samples == 0 {
            return Err(ClusterError::InvalidMinSamples);
        }
        Ok(Self { eps, min_samples })
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Label every point. Empty input yields an empty clustering.
    pub fn cluster(&self, points: &[Point]) -> Clustering {
        if points.is_empty() {
            return Clustering::default();
        }

        let index = NeighborIndex::new(points, self.eps);
        let mut neighbors = Vec::new();

        let core: Vec<bool> = (0..points.len())
            .map(|i| index.count_within(i, self.min_samples) >= self.min_samples)
            .collect();

        // Connected components of core points.
        let mut component: Vec<Option<usize>> = vec![None; points.len()];
        let mut component_count = 0;
        let mut queue = VecDeque::new();

        for seed in 0..points.len() {
            if !core[seed] || component[seed].is_some() {
                continue;
            }
            component[seed] = Some(component_count);
            queue.push_back(seed);

            while let Some(i) = queue.pop_front() {
                index.neighbors(i, &mut neighbors);
                for &j in &neighbors {
                    if core[j] && component[j].is_none() {
                        component[j] = Some(component_count);
                        queue.push_back(j);
                    }
                }
            }
            component_count += 1;
        }

        // Border points join the component of their nearest core neighbor.
        for i in 0..points.len() {
            if core[i] {
                continue;
            }
            index.neighbors(i, &mut neighbors);
            component[i] = neighbors
                .iter()
                .filter(|&&j| core[j])
                .min_by(|&&a, &&b| {
                    let da = points[i].distance(&points[a]);
                    let db = points[i].distance(&points[b]);
                    da.total_cmp(&db)
                        .then_with(|| lexicographic(&points[a], &points[b]))
                })
                .and_then(|&j| component[j]);
        }

        // Number regions by their smallest point.
        let mut smallest: Vec<Option<usize>> = vec![None; component_count];
        for (i, c) in component.iter().enumerate() {
            if let Some(c) = c {
                let replace = match smallest[*c] {
                    Some(current) => lexicographic(&points[i], &points[current]) == Ordering::Less,
                    None => true,
                };
                if replace {
                    smallest[*c] = Some(i);
                }
            }
        }
        let mut order: Vec<usize> = (0..component_count).collect();
        order.sort_by(|&a, &b| match (smallest[a], smallest[b]) {
            (Some(pa), Some(pb)) => lexicographic(&points[pa], &points[pb]),
            _ => a.cmp(&b),
        });
        let mut relabel = vec![0; component_count];
        for (label, c) in order.into_iter().enumerate() {
            relabel[c] = label;
        }

        let labels: Vec<ClusterLabel> = component
            .iter()
            .map(|c| match c {
                Some(c) => ClusterLabel::Region(relabel[*c]),
                None => ClusterLabel::Noise,
            })
            .collect();

        let clustering = Clustering {
            labels,
            region_count: component_count,
        };
        debug!(
            "Clustered {} points (eps={}, min_samples={}): {} regions, {} noise",
            points.len(),
            self.eps,
            self.min_samples,
            clustering.region_count(),
            clustering.noise_count()
        );
        clustering
    }
}

/// Cluster `points` with the given parameters.
pub fn cluster(points: &[Point], eps: f64, min_samples: usize) -> Result<Clustering, ClusterError> {
    Ok(DensityClusterer::new(eps, min_samples)?.cluster(points))
}

fn lexicographic(a: &Point, b: &Point) -> Ordering {
    a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y))
}

/// Point of the input, tagged with its position, as stored in the R-tree.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    coords: [f64; 2],
    index: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coords)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coords[0] - point[0];
        let dy = self.coords[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Radius neighbor queries over the input points.
///
/// The tree returns candidates within a slightly widened radius; membership is
/// then decided by `distance <= eps`, the same test used everywhere else.
struct NeighborIndex<'p> {
    points: &'p [Point],
    eps: f64,
    search_radius_2: f64,
    tree: RTree<IndexedPoint>,
}

impl<'p> NeighborIndex<'p> {
    fn new(points: &'p [Point], eps: f64) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(index, p)| IndexedPoint {
                coords: [p.x, p.y],
                index,
            })
            .collect();
        let widened = eps * (1.0 + 1e-9);
        Self {
            points,
            eps,
            search_radius_2: widened * widened,
            tree: RTree::bulk_load(entries),
        }
    }

    fn within(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        let p = self.points[i];
        self.tree
            .locate_within_distance([p.x, p.y], self.search_radius_2)
            .map(|entry| entry.index)
            .filter(move |&j| p.distance(&self.points[j]) <= self.eps)
    }

    /// Indices of all points within `eps` of point `i`, itself included.
    fn neighbors(&self, i: usize, out: &mut Vec<usize>) {
        out.clear();
        out.extend(self.within(i));
    }

    /// Number of neighbors of point `i`, counting stops at `limit`.
    fn count_within(&self, i: usize, limit: usize) -> usize {
        self.within(i).take(limit).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn points(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(
            DensityClusterer::new(0.0, 3).unwrap_err(),
            ClusterError::InvalidEps(0.0)
        );
        assert!(DensityClusterer::new(f64::NAN, 3).is_err());
        assert_eq!(
            DensityClusterer::new(1.0, 0).unwrap_err(),
            ClusterError::InvalidMinSamples
        );
    }

    #[test]
    fn test_empty_input() {
        let clustering = cluster(&[], 5.0, 2).unwrap();
        assert_eq!(clustering.region_count(), 0);
        assert!(clustering.labels().is_empty());
    }

    #[test]
    fn test_two_lines_and_isolated_pair() {
        // Endpoints of Line((0,0),(10,10)), Line((9,9),(20,20)) and
        // Line((1000,1000),(1010,1010)).
        let pts = points(&[
            (0.0, 0.0),
            (10.0, 10.0),
            (9.0, 9.0),
            (20.0, 20.0),
            (1000.0, 1000.0),
            (1010.0, 1010.0),
        ]);
        let clustering = cluster(&pts, 5.0, 2).unwrap();

        // (10,10)-(9,9) are within eps; the other endpoints are not.
        assert_eq!(clustering.region_count(), 1);
        let regions = clustering.regions(&pts);
        assert_eq!(regions[0].points, points(&[(10.0, 10.0), (9.0, 9.0)]));
        assert_eq!(clustering.noise_count(), 4);
    }

    #[test]
    fn test_pair_within_eps_forms_region() {
        let pts = points(&[(1000.0, 1000.0), (1003.0, 1004.0)]);
        let clustering = cluster(&pts, 5.0, 2).unwrap();
        assert_eq!(clustering.region_count(), 1);
        assert_eq!(clustering.noise_count(), 0);
    }

    #[test]
    fn test_chain_connects_through_core_points() {
        let pts = points(&[(0.0, 0.0), (4.0, 0.0), (8.0, 0.0), (12.0, 0.0), (100.0, 0.0)]);
        let clustering = cluster(&pts, 5.0, 2).unwrap();
        assert_eq!(clustering.region_count(), 1);
        assert_eq!(
            clustering.labels(),
            &[
                ClusterLabel::Region(0),
                ClusterLabel::Region(0),
                ClusterLabel::Region(0),
                ClusterLabel::Region(0),
                ClusterLabel::Noise,
            ]
        );
    }

    #[test]
    fn test_border_point_joins_without_extending() {
        // 5.8 is within eps of the core point at 1.0 but has too few
        // neighbors to be core, so 11.0 stays noise.
        let pts = points(&[(0.0, 0.0), (1.0, 0.0), (0.5, 0.0), (5.8, 0.0), (11.0, 0.0)]);
        let clustering = cluster(&pts, 5.0, 3).unwrap();
        assert_eq!(clustering.region_count(), 1);
        assert_eq!(clustering.labels()[3], ClusterLabel::Region(0));
        assert_eq!(clustering.labels()[4], ClusterLabel::Noise);
    }

    #[test]
    fn test_border_point_prefers_nearest_core() {
        let mut coords: Vec<(f64, f64)> = (0..5).map(|i| (-(i as f64), 0.0)).collect();
        coords.extend((9..14).map(|i| (i as f64, 0.0)));
        // Reaches (0,0) at distance 5 and (9,0) at distance 4.
        coords.push((5.0, 0.0));
        let pts = points(&coords);

        let clustering = cluster(&pts, 5.5, 5).unwrap();
        assert_eq!(clustering.region_count(), 2);
        let middle = clustering.labels()[10];
        assert_eq!(middle, clustering.labels()[5]);
        assert_ne!(middle, clustering.labels()[0]);
    }

    #[test]
    fn test_infinite_eps_single_region() {
        let pts = points(&[(0.0, 0.0), (1e6, -1e6), (-3.0, 42.0)]);
        let clustering = cluster(&pts, f64::INFINITY, 1).unwrap();
        assert_eq!(clustering.region_count(), 1);
        assert_eq!(clustering.noise_count(), 0);
    }

    #[test]
    fn test_pair_exactly_eps_apart_forms_region() {
        let pts = points(&[(-5e-324, 0.0), (0.1, 0.0)]);
        assert!(pts[0].distance(&pts[1]) <= 0.1);

        let clustering = cluster(&pts, 0.1, 2).unwrap();
        assert_eq!(clustering.region_count(), 1);
        assert_eq!(clustering.noise_count(), 0);
    }

    #[test]
    fn test_labels_ordered_by_smallest_point() {
        let pts = points(&[(100.0, 0.0), (101.0, 0.0), (0.0, 0.0), (1.0, 0.0)]);
        let clustering = cluster(&pts, 2.0, 2).unwrap();
        assert_eq!(clustering.labels()[2], ClusterLabel::Region(0));
        assert_eq!(clustering.labels()[0], ClusterLabel::Region(1));
    }
}
