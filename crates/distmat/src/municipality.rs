use fxhash::FxHashMap;
use serde::Serialize;

use crate::error::DistmatError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Municipality {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl Municipality {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
        }
    }
}

impl From<&Municipality> for geo_types::Point {
    fn from(municipality: &Municipality) -> Self {
        geo_types::Point::new(municipality.lon, municipality.lat)
    }
}

/// Municipalities in input order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct MunicipalityTable {
    municipalities: Vec<Municipality>,
    index: FxHashMap<String, usize>,
}

impl MunicipalityTable {
    /// Fails with the duplicated id when it is already present.
    pub fn push(&mut self, municipality: Municipality) -> Result<(), String> {
        if self.index.contains_key(&municipality.id) {
            return Err(municipality.id);
        }

        self.index
            .insert(municipality.id.clone(), self.municipalities.len());
        self.municipalities.push(municipality);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Municipality> {
        self.index.get(id).map(|&i| &self.municipalities[i])
    }

    pub fn len(&self) -> usize {
        self.municipalities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.municipalities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Municipality> {
        self.municipalities.iter()
    }

    pub fn as_slice(&self) -> &[Municipality] {
        &self.municipalities
    }

    /// Picks the given ids in the order they are listed.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Municipality>, DistmatError> {
        ids.iter()
            .map(|id| {
                self.get(id.as_ref())
                    .cloned()
                    .ok_or_else(|| DistmatError::UnknownMunicipality(id.as_ref().to_string()))
            })
            .collect()
    }
}
