use distmat_providers::{matrix_service::MatrixRequest, travel_mode::TravelMode};
use fxhash::{FxHashMap, FxHashSet};

use crate::municipality::Municipality;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PairSelection {
    /// Every origin against every destination
    All,
    /// Every combination except a municipality against itself
    #[default]
    ExcludeSelf,
    /// Each unordered pair once, in the direction it is first met
    OneWay,
}

pub type Pair<'a> = (&'a Municipality, &'a Municipality);

/// Origin-major: all destinations of the first origin come first.
pub fn select_pairs<'a>(
    origins: &'a [Municipality],
    destinations: &'a [Municipality],
    selection: PairSelection,
) -> Vec<Pair<'a>> {
    let mut seen: FxHashSet<(&str, &str)> = FxHashSet::default();
    let mut pairs = Vec::new();

    for origin in origins {
        for destination in destinations {
            let is_self = origin.id == destination.id;
            let keep = match selection {
                PairSelection::All => true,
                PairSelection::ExcludeSelf => !is_self,
                PairSelection::OneWay => {
                    let key = if origin.id <= destination.id {
                        (origin.id.as_str(), destination.id.as_str())
                    } else {
                        (destination.id.as_str(), origin.id.as_str())
                    };
                    !is_self && seen.insert(key)
                }
            };

            if keep {
                pairs.push((origin, destination));
            }
        }
    }

    pairs
}

/// A group of pairs sent in a single request.
#[derive(Debug, Clone)]
pub struct Batch<'a> {
    pub index: usize,
    /// Request rows, in first-appearance order
    pub origins: Vec<&'a Municipality>,
    /// Request columns, in first-appearance order
    pub destinations: Vec<&'a Municipality>,
    /// (row, column) of every requested pair, in pair order
    pub cells: Vec<(usize, usize)>,
}

impl<'a> Batch<'a> {
    fn from_pairs(index: usize, pairs: &[Pair<'a>]) -> Self {
        let mut origins = Vec::new();
        let mut destinations = Vec::new();
        let mut origin_rows: FxHashMap<&str, usize> = FxHashMap::default();
        let mut destination_columns: FxHashMap<&str, usize> = FxHashMap::default();

        let cells = pairs
            .iter()
            .map(|&(origin, destination)| {
                let row = *origin_rows.entry(origin.id.as_str()).or_insert_with(|| {
                    origins.push(origin);
                    origins.len() - 1
                });
                let column = *destination_columns
                    .entry(destination.id.as_str())
                    .or_insert_with(|| {
                        destinations.push(destination);
                        destinations.len() - 1
                    });
                (row, column)
            })
            .collect();

        Self {
            index,
            origins,
            destinations,
            cells,
        }
    }

    pub fn pair_count(&self) -> usize {
        self.cells.len()
    }

    pub fn origin_ids(&self) -> Vec<String> {
        self.origins.iter().map(|m| m.id.clone()).collect()
    }

    pub fn destination_ids(&self) -> Vec<String> {
        self.destinations.iter().map(|m| m.id.clone()).collect()
    }

    pub fn request(&self, mode: TravelMode) -> MatrixRequest {
        MatrixRequest {
            origins: self.origins.iter().map(|&m| m.into()).collect(),
            destinations: self.destinations.iter().map(|&m| m.into()).collect(),
            mode,
        }
    }
}

/// Splits `pairs` into consecutive batches of at most `batch_size` pairs.
pub fn plan_batches<'a>(pairs: &[Pair<'a>], batch_size: usize) -> Vec<Batch<'a>> {
    pairs
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| Batch::from_pairs(index, chunk))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn municipalities(ids: &[&str]) -> Vec<Municipality> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Municipality::new(*id, 70.0 + i as f64 * 0.1, 25.0 + i as f64 * 0.1))
            .collect()
    }

    fn ids(pairs: &[Pair]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(o, d)| (o.id.clone(), d.id.clone()))
            .collect()
    }

    #[test]
    fn should_select_all_pairs() {
        let m = municipalities(&["A", "B"]);
        let pairs = select_pairs(&m, &m, PairSelection::All);
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn should_exclude_self_pairs() {
        let m = municipalities(&["A", "B", "C"]);
        let pairs = select_pairs(&m, &m, PairSelection::ExcludeSelf);
        assert_eq!(
            ids(&pairs),
            vec![
                ("A".into(), "B".into()),
                ("A".into(), "C".into()),
                ("B".into(), "A".into()),
                ("B".into(), "C".into()),
                ("C".into(), "A".into()),
                ("C".into(), "B".into()),
            ]
        );
    }

    #[test]
    fn should_select_upper_triangle_for_one_way() {
        let m = municipalities(&["A", "B", "C", "D"]);
        let pairs = select_pairs(&m, &m, PairSelection::OneWay);
        assert_eq!(
            ids(&pairs),
            vec![
                ("A".into(), "B".into()),
                ("A".into(), "C".into()),
                ("A".into(), "D".into()),
                ("B".into(), "C".into()),
                ("B".into(), "D".into()),
                ("C".into(), "D".into()),
            ]
        );
    }

    #[test]
    fn should_plan_single_batch_below_limit() {
        let m = municipalities(&["A", "B", "C"]);
        let pairs = select_pairs(&m, &m, PairSelection::ExcludeSelf);
        let batches = plan_batches(&pairs, 10);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].pair_count(), 6);
        assert_eq!(batches[0].origin_ids(), vec!["A", "B", "C"]);
        assert_eq!(batches[0].destination_ids(), vec!["B", "C", "A"]);
        assert_eq!(batches[0].cells[0], (0, 0));
        assert_eq!(batches[0].cells[2], (1, 2));
    }

    #[test]
    fn should_cover_every_pair_exactly_once() {
        let m = municipalities(&["A", "B", "C", "D", "E", "F", "G"]);
        let pairs = select_pairs(&m, &m, PairSelection::ExcludeSelf);
        assert_eq!(pairs.len(), 42);

        for batch_size in [1, 3, 7, 10] {
            let batches = plan_batches(&pairs, batch_size);
            assert_eq!(batches.len(), pairs.len().div_ceil(batch_size));

            let covered: Vec<(String, String)> = batches
                .iter()
                .flat_map(|batch| {
                    batch.cells.iter().map(|&(row, column)| {
                        (
                            batch.origins[row].id.clone(),
                            batch.destinations[column].id.clone(),
                        )
                    })
                })
                .collect();

            assert_eq!(covered, ids(&pairs));
            assert!(batches.iter().all(|batch| batch.pair_count() <= batch_size));
        }
    }

    #[test]
    fn should_plan_no_batches_without_pairs() {
        let m = municipalities(&["A"]);
        let pairs = select_pairs(&m, &m, PairSelection::ExcludeSelf);
        assert!(plan_batches(&pairs, 10).is_empty());
    }

    #[test]
    fn should_build_lat_lng_request() {
        let m = municipalities(&["A", "B"]);
        let pairs = select_pairs(&m[..1], &m[1..], PairSelection::All);
        let request = plan_batches(&pairs, 10)[0].request(TravelMode::Walking);

        assert_eq!(request.origins, vec![geo_types::Point::new(25.0, 70.0)]);
        assert_eq!(
            request,
            MatrixRequest::new(&m[..1], &m[1..], TravelMode::Walking)
        );
    }
}
