use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use distmat_providers::{
    cache::CACHE_FOLDER_ENV_VAR,
    google_maps_api::{GOOGLE_MAPS_API_URL, GoogleMapsClientParams},
};

pub const API_KEY_ENV_VAR: &str = "GOOGLE_MAPS_API_KEY";
pub const BASE_URL_ENV_VAR: &str = "GOOGLE_MAPS_BASE_URL";

/// Read once at startup, after `.env` has been loaded.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub cache_folder: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = non_empty(API_KEY_ENV_VAR)
            .with_context(|| format!("{} not found in environment or .env", API_KEY_ENV_VAR))?;

        Ok(Self {
            api_key,
            base_url: non_empty(BASE_URL_ENV_VAR).unwrap_or_else(|| GOOGLE_MAPS_API_URL.to_string()),
            cache_folder: non_empty(CACHE_FOLDER_ENV_VAR).map(PathBuf::from),
        })
    }

    pub fn client_params(&self, timeout: Option<Duration>) -> GoogleMapsClientParams {
        GoogleMapsClientParams {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout,
        }
    }
}
