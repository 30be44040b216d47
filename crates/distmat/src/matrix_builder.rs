use distmat_providers::{
    matrix_service::{DistanceMatrixService, ProviderError},
    travel_mode::TravelMode,
};
use tracing::{debug, error, info};

use crate::{
    distance_result::DistanceResult,
    error::DistmatError,
    municipality::Municipality,
    pairs::{Batch, PairSelection, plan_batches, select_pairs},
};

/// Largest batch whose worst-case grid (`n` origins by `n` destinations) stays within
/// the Distance Matrix cap of 100 elements per request.
///
/// Batches count pairs, not grid elements. A batch that shares one origin only fills
/// `n` of the 100 elements, so a full all-pairs run issues more requests than packing
/// up to 25 destinations per origin would. In exchange every request stays under the
/// caps whatever the pair layout.
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failed batch and move on to the next one
    #[default]
    Continue,
    /// Stop at the first failed batch
    Abort,
}

#[derive(Debug, Clone)]
pub struct MatrixBuilderParams {
    pub batch_size: usize,
    pub mode: TravelMode,
    pub selection: PairSelection,
    pub failure_policy: FailurePolicy,
}

impl Default for MatrixBuilderParams {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            mode: TravelMode::default(),
            selection: PairSelection::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub requests: usize,
    /// Always [`DistmatError::Api`]
    pub failures: Vec<DistmatError>,
}

#[derive(Debug, Default)]
pub struct MatrixOutcome {
    pub results: Vec<DistanceResult>,
    /// Always [`DistmatError::Api`]
    pub failures: Vec<DistmatError>,
    pub requests: usize,
}

pub struct MatrixBuilder<'s, S> {
    service: &'s S,
    params: MatrixBuilderParams,
}

impl<'s, S> MatrixBuilder<'s, S>
where
    S: DistanceMatrixService,
{
    pub fn new(service: &'s S, params: MatrixBuilderParams) -> Result<Self, DistmatError> {
        if params.batch_size == 0 || params.batch_size > MAX_BATCH_SIZE {
            return Err(DistmatError::InvalidBatchSize {
                size: params.batch_size,
                max: MAX_BATCH_SIZE,
            });
        }

        Ok(Self { service, params })
    }

    pub fn params(&self) -> &MatrixBuilderParams {
        &self.params
    }

    pub fn plan<'a>(
        &self,
        origins: &'a [Municipality],
        destinations: &'a [Municipality],
    ) -> Vec<Batch<'a>> {
        let pairs = select_pairs(origins, destinations, self.params.selection);
        let batches = plan_batches(&pairs, self.params.batch_size);

        info!(
            "Planned {} pairs in {} batches of at most {}",
            pairs.len(),
            batches.len(),
            self.params.batch_size
        );

        batches
    }

    /// Issues one request for `batch`. On failure nothing from the batch is returned.
    pub async fn run_batch(&self, batch: &Batch<'_>) -> Result<Vec<DistanceResult>, DistmatError> {
        let batch_error = |source: ProviderError| DistmatError::Api {
            batch: batch.index,
            origin_ids: batch.origin_ids(),
            destination_ids: batch.destination_ids(),
            source,
        };

        debug!(
            "Batch {}: {} pairs, {}x{} grid",
            batch.index,
            batch.pair_count(),
            batch.origins.len(),
            batch.destinations.len()
        );

        let request = batch.request(self.params.mode);
        let grid = self
            .service
            .fetch_grid(&request)
            .await
            .map_err(batch_error)?;

        if grid.origins() != batch.origins.len()
            || grid.destinations() != batch.destinations.len()
        {
            return Err(batch_error(ProviderError::MalformedResponse(format!(
                "expected {}x{} grid, got {}x{}",
                batch.origins.len(),
                batch.destinations.len(),
                grid.origins(),
                grid.destinations()
            ))));
        }

        batch
            .cells
            .iter()
            .map(|&(row, column)| {
                let cell = grid.cell(row, column).ok_or_else(|| {
                    batch_error(ProviderError::MalformedResponse(format!(
                        "missing cell ({}, {})",
                        row, column
                    )))
                })?;

                Ok(DistanceResult::new(
                    batch.origins[row].id.as_str(),
                    batch.destinations[column].id.as_str(),
                    cell,
                ))
            })
            .collect()
    }

    /// Runs `batches` one after the other, handing each batch's results to `on_batch`
    /// (an empty slice when the batch failed). Errors from `on_batch` always stop the run.
    pub async fn run_batches<F>(
        &self,
        batches: &[Batch<'_>],
        mut on_batch: F,
    ) -> Result<BatchReport, DistmatError>
    where
        F: FnMut(&Batch<'_>, &[DistanceResult]) -> Result<(), DistmatError>,
    {
        let mut report = BatchReport::default();

        for batch in batches {
            report.requests += 1;

            match self.run_batch(batch).await {
                Ok(results) => on_batch(batch, &results)?,
                Err(err) => match self.params.failure_policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Continue => {
                        error!("{}", err);
                        report.failures.push(err);
                        on_batch(batch, &[])?;
                    }
                },
            }
        }

        Ok(report)
    }

    /// Plans and runs every batch, collecting all results in memory.
    pub async fn build(
        &self,
        origins: &[Municipality],
        destinations: &[Municipality],
    ) -> Result<MatrixOutcome, DistmatError> {
        let batches = self.plan(origins, destinations);
        let mut results = Vec::new();

        let report = self
            .run_batches(&batches, |_, batch_results| {
                results.extend_from_slice(batch_results);
                Ok(())
            })
            .await?;

        Ok(MatrixOutcome {
            results,
            failures: report.failures,
            requests: report.requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use distmat_providers::{
        google_maps_api::{GOOGLE_MAPS_MAX_ELEMENTS, GOOGLE_MAPS_MAX_LOCATIONS},
        matrix_grid::{ElementStatus, GridCell, MatrixGrid},
        matrix_service::MatrixRequest,
    };
    use parking_lot::Mutex;

    use super::*;

    /// Replies with scripted grids in order, or fills one from the request when the script is empty.
    #[derive(Default)]
    struct MockService {
        requests: Mutex<Vec<MatrixRequest>>,
        script: Mutex<Vec<Result<MatrixGrid, ProviderError>>>,
    }

    impl MockService {
        fn scripted(script: Vec<Result<MatrixGrid, ProviderError>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                script: Mutex::new(script.into_iter().rev().collect()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl DistanceMatrixService for MockService {
        async fn fetch_grid(&self, request: &MatrixRequest) -> Result<MatrixGrid, ProviderError> {
            self.requests.lock().push(request.clone());

            if let Some(reply) = self.script.lock().pop() {
                return reply;
            }

            let cells = (0..request.elements())
                .map(|i| GridCell::ok(1000 * (i + 1) as u64, 60 * (i + 1) as u64))
                .collect();
            Ok(MatrixGrid::new(request.origins.len(), request.destinations.len(), cells).unwrap())
        }
    }

    fn api_error() -> ProviderError {
        ProviderError::Api {
            status: "OVER_QUERY_LIMIT".to_string(),
            message: "You have exceeded your rate-limit for this API.".to_string(),
        }
    }

    fn municipalities(ids: &[&str]) -> Vec<Municipality> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Municipality::new(*id, 70.0 + i as f64 * 0.1, 25.0 + i as f64 * 0.1))
            .collect()
    }

    fn params(batch_size: usize, failure_policy: FailurePolicy) -> MatrixBuilderParams {
        MatrixBuilderParams {
            batch_size,
            failure_policy,
            ..MatrixBuilderParams::default()
        }
    }

    #[test]
    fn should_respect_api_limits() {
        assert!(MAX_BATCH_SIZE * MAX_BATCH_SIZE <= GOOGLE_MAPS_MAX_ELEMENTS);
        assert!(MAX_BATCH_SIZE <= GOOGLE_MAPS_MAX_LOCATIONS);
    }

    #[test]
    fn should_reject_invalid_batch_size() {
        let service = MockService::default();
        for size in [0, MAX_BATCH_SIZE + 1] {
            assert!(matches!(
                MatrixBuilder::new(&service, params(size, FailurePolicy::Continue)),
                Err(DistmatError::InvalidBatchSize { .. })
            ));
        }
    }

    #[tokio::test]
    async fn should_map_grid_in_row_column_order() {
        let grid = MatrixGrid::new(
            2,
            2,
            vec![
                GridCell::ok(1, 10),
                GridCell::ok(2, 20),
                GridCell::ok(3, 30),
                GridCell::ok(4, 40),
            ],
        )
        .unwrap();
        let service = MockService::scripted(vec![Ok(grid)]);
        let builder = MatrixBuilder::new(&service, MatrixBuilderParams::default()).unwrap();

        let origins = municipalities(&["A", "B"]);
        let destinations = municipalities(&["C", "D"]);
        let outcome = builder.build(&origins, &destinations).await.unwrap();

        assert_eq!(service.request_count(), 1);
        assert_eq!(
            outcome.results,
            vec![
                DistanceResult::new("A", "C", &GridCell::ok(1, 10)),
                DistanceResult::new("A", "D", &GridCell::ok(2, 20)),
                DistanceResult::new("B", "C", &GridCell::ok(3, 30)),
                DistanceResult::new("B", "D", &GridCell::ok(4, 40)),
            ]
        );
    }

    #[tokio::test]
    async fn should_issue_one_request_below_limit() {
        let service = MockService::default();
        let builder = MatrixBuilder::new(&service, MatrixBuilderParams::default()).unwrap();
        let m = municipalities(&["A", "B", "C"]);

        let outcome = builder.build(&m, &m).await.unwrap();

        assert_eq!(service.request_count(), 1);
        assert_eq!(outcome.requests, 1);
        assert_eq!(outcome.results.len(), 6);
    }

    #[tokio::test]
    async fn should_split_requests_above_limit() {
        let service = MockService::default();
        let builder =
            MatrixBuilder::new(&service, params(4, FailurePolicy::Continue)).unwrap();
        let m = municipalities(&["A", "B", "C", "D", "E"]);

        let outcome = builder.build(&m, &m).await.unwrap();

        // 20 pairs in batches of 4
        assert_eq!(service.request_count(), 5);
        assert_eq!(outcome.results.len(), 20);

        let expected: Vec<(String, String)> = select_pairs(&m, &m, PairSelection::ExcludeSelf)
            .into_iter()
            .map(|(o, d)| (o.id.clone(), d.id.clone()))
            .collect();
        let produced: Vec<(String, String)> = outcome
            .results
            .iter()
            .map(|r| (r.origin_id.clone(), r.destination_id.clone()))
            .collect();
        assert_eq!(produced, expected);

        for request in service.requests.lock().iter() {
            assert!(request.elements() <= GOOGLE_MAPS_MAX_ELEMENTS);
        }
    }

    #[tokio::test]
    async fn should_only_emit_requested_cells() {
        let service = MockService::default();
        let builder = MatrixBuilder::new(&service, MatrixBuilderParams::default()).unwrap();
        let m = municipalities(&["A", "B"]);

        // Requested as a 2x2 grid, but the diagonal is excluded
        let outcome = builder.build(&m, &m).await.unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].origin_id, "A");
        assert_eq!(outcome.results[0].destination_id, "B");
        assert_eq!(outcome.results[1].origin_id, "B");
        assert_eq!(outcome.results[1].destination_id, "A");
    }

    #[tokio::test]
    async fn should_report_api_error_without_partial_results() {
        let service = MockService::scripted(vec![Err(api_error())]);
        let builder = MatrixBuilder::new(&service, MatrixBuilderParams::default()).unwrap();

        let origins = municipalities(&["A", "B"]);
        let destinations = municipalities(&["C", "D"]);
        let batches = builder.plan(&origins, &destinations);

        match builder.run_batch(&batches[0]).await {
            Err(DistmatError::Api {
                batch,
                origin_ids,
                destination_ids,
                source: ProviderError::Api { status, .. },
            }) => {
                assert_eq!(batch, 0);
                assert_eq!(origin_ids, vec!["A", "B"]);
                assert_eq!(destination_ids, vec!["C", "D"]);
                assert_eq!(status, "OVER_QUERY_LIMIT");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn should_continue_after_failed_batch() {
        let service = MockService::scripted(vec![Err(api_error())]);
        let builder =
            MatrixBuilder::new(&service, params(2, FailurePolicy::Continue)).unwrap();
        let m = municipalities(&["A", "B", "C"]);

        let outcome = builder.build(&m, &m).await.unwrap();

        assert_eq!(service.request_count(), 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.results.len(), 4);
        assert!(outcome.results.iter().all(|r| r.origin_id != "A"));
    }

    #[tokio::test]
    async fn should_abort_on_failed_batch() {
        let service = MockService::scripted(vec![Err(api_error())]);
        let builder = MatrixBuilder::new(&service, params(2, FailurePolicy::Abort)).unwrap();
        let m = municipalities(&["A", "B", "C"]);

        let result = builder.build(&m, &m).await;

        assert!(matches!(result, Err(DistmatError::Api { batch: 0, .. })));
        assert_eq!(service.request_count(), 1);
    }

    #[tokio::test]
    async fn should_hand_every_batch_to_callback() {
        let first = MatrixGrid::new(1, 2, vec![GridCell::ok(1, 1), GridCell::ok(2, 2)])
            .unwrap();
        let service = MockService::scripted(vec![Ok(first), Err(api_error())]);
        let builder =
            MatrixBuilder::new(&service, params(2, FailurePolicy::Continue)).unwrap();
        let m = municipalities(&["A", "B", "C"]);
        let batches = builder.plan(&m, &m);

        let mut sizes = Vec::new();
        let report = builder
            .run_batches(&batches, |batch, results| {
                sizes.push((batch.index, results.len()));
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(sizes, vec![(0, 2), (1, 0), (2, 2)]);
        assert_eq!(report.requests, 3);
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn should_stop_when_callback_fails() {
        let service = MockService::default();
        let builder =
            MatrixBuilder::new(&service, params(2, FailurePolicy::Continue)).unwrap();
        let m = municipalities(&["A", "B", "C"]);
        let batches = builder.plan(&m, &m);

        let result = builder
            .run_batches(&batches, |batch, _| {
                if batch.index == 1 {
                    Err(DistmatError::UnknownMunicipality("X".to_string()))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(DistmatError::UnknownMunicipality(_))));
        assert_eq!(service.request_count(), 2);
    }

    #[tokio::test]
    async fn should_reject_grid_with_wrong_shape() {
        let grid = MatrixGrid::new(1, 1, vec![GridCell::ok(1, 1)]).unwrap();
        let service = MockService::scripted(vec![Ok(grid)]);
        let builder = MatrixBuilder::new(&service, MatrixBuilderParams::default()).unwrap();

        let origins = municipalities(&["A", "B"]);
        let destinations = municipalities(&["C"]);
        let outcome = builder.build(&origins, &destinations).await.unwrap();

        assert!(outcome.results.is_empty());
        assert!(matches!(
            outcome.failures[0],
            DistmatError::Api {
                source: ProviderError::MalformedResponse(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn should_keep_failed_elements_as_rows() {
        let grid = MatrixGrid::new(
            1,
            2,
            vec![GridCell::ok(5, 6), GridCell::failed(ElementStatus::NotFound)],
        )
        .unwrap();
        let service = MockService::scripted(vec![Ok(grid)]);
        let builder = MatrixBuilder::new(&service, MatrixBuilderParams::default()).unwrap();

        let origins = municipalities(&["A"]);
        let destinations = municipalities(&["B", "C"]);
        let outcome = builder.build(&origins, &destinations).await.unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].status, ElementStatus::NotFound);
        assert_eq!(outcome.results[1].distance_m, None);
        assert_eq!(outcome.results[1].duration_s, None);
    }

    #[tokio::test]
    async fn should_not_call_service_without_pairs() {
        let service = MockService::default();
        let builder = MatrixBuilder::new(&service, MatrixBuilderParams::default()).unwrap();
        let m = municipalities(&["A"]);

        let outcome = builder.build(&m, &m).await.unwrap();

        assert_eq!(service.request_count(), 0);
        assert!(outcome.results.is_empty());
    }
}
