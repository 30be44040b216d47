use std::{
    hash::{Hash, Hasher},
    io::{BufWriter, Write},
    path::PathBuf,
};

use fxhash::FxHasher64;
use tracing::{debug, warn};

use crate::{
    matrix_grid::MatrixGrid,
    matrix_service::{DistanceMatrixService, MatrixRequest, ProviderError},
};

pub const CACHE_FOLDER_ENV_VAR: &str = "DISTMAT_CACHE_FOLDER";

fn hash_points<H>(points: &[geo_types::Point], hasher: &mut H)
where
    H: Hasher,
{
    points.len().hash(hasher);
    for point in points {
        hasher.write_u64(point.x().to_bits());
        hasher.write_u64(point.y().to_bits());
    }
}

fn get_filename(request: &MatrixRequest) -> String {
    let mut hasher = FxHasher64::default();

    hash_points(&request.origins, &mut hasher);
    hash_points(&request.destinations, &mut hasher);
    request.mode.hash(&mut hasher);

    let hash = hasher.finish();
    format!("{:016x}.json", hash)
}

pub trait MatrixCache {
    fn get(&self, request: &MatrixRequest) -> Result<Option<MatrixGrid>, anyhow::Error>;

    fn put(&self, request: &MatrixRequest, grid: &MatrixGrid) -> Result<(), anyhow::Error>;
}

pub struct NoCache;

impl MatrixCache for NoCache {
    fn get(&self, _request: &MatrixRequest) -> Result<Option<MatrixGrid>, anyhow::Error> {
        Ok(None)
    }

    fn put(&self, _request: &MatrixRequest, _grid: &MatrixGrid) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// One JSON file per request, named after the request hash. Never evicted.
pub struct FileCache {
    folder: PathBuf,
}

impl FileCache {
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self, anyhow::Error> {
        let folder = folder.into();
        std::fs::create_dir_all(&folder)?;

        if !folder.is_dir() {
            return Err(anyhow::anyhow!(format!(
                "Path {} is not a directory",
                folder.display()
            )));
        }

        Ok(Self { folder })
    }
}

impl MatrixCache for FileCache {
    fn get(&self, request: &MatrixRequest) -> Result<Option<MatrixGrid>, anyhow::Error> {
        let file_path = self.folder.join(get_filename(request));

        if !file_path.is_file() {
            return Ok(None);
        }

        let file = std::fs::File::open(file_path)?;
        let grid: MatrixGrid = serde_json::from_reader(file)?;

        Ok(Some(grid))
    }

    fn put(&self, request: &MatrixRequest, grid: &MatrixGrid) -> Result<(), anyhow::Error> {
        let file = std::fs::File::create(self.folder.join(get_filename(request)))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, grid)?;
        writer.flush()?;

        Ok(())
    }
}

impl<C: MatrixCache> MatrixCache for Option<C> {
    fn get(&self, request: &MatrixRequest) -> Result<Option<MatrixGrid>, anyhow::Error> {
        match self {
            Some(cache) => cache.get(request),
            None => Ok(None),
        }
    }

    fn put(&self, request: &MatrixRequest, grid: &MatrixGrid) -> Result<(), anyhow::Error> {
        match self {
            Some(cache) => cache.put(request, grid),
            None => Ok(()),
        }
    }
}

/// Serves grids from `cache` when present; only successful responses are stored.
pub struct CachedMatrixService<S, C = NoCache> {
    inner: S,
    cache: C,
}

impl<S, C> CachedMatrixService<S, C>
where
    S: DistanceMatrixService,
    C: MatrixCache,
{
    pub fn new(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, C> DistanceMatrixService for CachedMatrixService<S, C>
where
    S: DistanceMatrixService,
    C: MatrixCache,
{
    async fn fetch_grid(&self, request: &MatrixRequest) -> Result<MatrixGrid, ProviderError> {
        match self.cache.get(request) {
            Ok(Some(grid))
                if grid.origins() == request.origins.len()
                    && grid.destinations() == request.destinations.len() =>
            {
                debug!("Cache hit for {}x{} matrix", grid.origins(), grid.destinations());
                return Ok(grid);
            }
            Ok(Some(_)) => warn!("Ignoring cached matrix with unexpected shape"),
            Ok(None) => {}
            Err(err) => warn!("Failed to read cached matrix: {}", err),
        }

        let grid = self.inner.fetch_grid(request).await?;

        if let Err(err) = self.cache.put(request, &grid) {
            warn!("Failed to cache matrix: {}", err);
        }

        Ok(grid)
    }
}
