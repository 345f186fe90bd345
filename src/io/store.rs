//! Per-dataset profile store.
//!
//! One YAML file per dataset exposes:
//!
//! - `Center_of_lon_bins`, `Center_of_lat_bins`: band centers (degrees)
//! - `Energy_bins`: energy-grid centers (GeV)
//! - `Differential_flux_profiles`, `Standard_deviation_profiles`:
//!   `[lat][lon][energy]` cubes
//!
//! The upstream pipeline prefixes keys with ordinals (`"5) Energy_bins"`);
//! lookup accepts either the bare name or any prefixed variant, so both
//! conventions load without conversion.
//!
//! Design goals:
//! - **Strict shapes**: every profile row must match the energy-grid length
//!   (clear errors naming the dataset + exit code 3)
//! - **Deterministic behavior**: no hidden normalization beyond the
//!   documented sigma floor, which is applied later by the pipeline
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::path::Path;

use serde_yaml::Value;

use crate::data::FluxProfile;
use crate::domain::LOG_BIN_SPACING;
use crate::error::AppError;

pub const KEY_LON_CENTERS: &str = "Center_of_lon_bins";
pub const KEY_LAT_CENTERS: &str = "Center_of_lat_bins";
pub const KEY_ENERGY_BINS: &str = "Energy_bins";
pub const KEY_FLUX_PROFILES: &str = "Differential_flux_profiles";
pub const KEY_STD_PROFILES: &str = "Standard_deviation_profiles";

/// All arrays of one dataset's store, shape-checked at load time and
/// read-only thereafter.
#[derive(Debug, Clone)]
pub struct SkyMapStore {
    pub dataset: String,
    pub lon_centers: Vec<f64>,
    pub lat_centers: Vec<f64>,
    pub energy_bins: Vec<f64>,
    flux: Vec<Vec<Vec<f64>>>,
    sigma: Vec<Vec<Vec<f64>>>,
}

impl SkyMapStore {
    pub fn load(path: &Path, dataset: &str) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::data(format!(
                "Failed to open store '{}' for dataset '{dataset}': {e}",
                path.display()
            ))
        })?;
        let value: Value = serde_yaml::from_reader(file).map_err(|e| {
            AppError::data(format!(
                "Invalid store YAML '{}' for dataset '{dataset}': {e}",
                path.display()
            ))
        })?;
        Self::from_value(&value, dataset)
    }

    /// Build a store from an already-parsed YAML document.
    pub fn from_value(value: &Value, dataset: &str) -> Result<Self, AppError> {
        let lon_centers = f64_seq(lookup(value, dataset, KEY_LON_CENTERS)?, dataset, KEY_LON_CENTERS)?;
        let lat_centers = f64_seq(lookup(value, dataset, KEY_LAT_CENTERS)?, dataset, KEY_LAT_CENTERS)?;
        let energy_bins = f64_seq(lookup(value, dataset, KEY_ENERGY_BINS)?, dataset, KEY_ENERGY_BINS)?;
        let flux = profile_cube(lookup(value, dataset, KEY_FLUX_PROFILES)?, dataset, KEY_FLUX_PROFILES)?;
        let sigma = profile_cube(lookup(value, dataset, KEY_STD_PROFILES)?, dataset, KEY_STD_PROFILES)?;

        Self::from_parts(dataset, lon_centers, lat_centers, energy_bins, flux, sigma)
    }

    /// Assemble and shape-check a store from raw arrays.
    pub fn from_parts(
        dataset: &str,
        lon_centers: Vec<f64>,
        lat_centers: Vec<f64>,
        energy_bins: Vec<f64>,
        flux: Vec<Vec<Vec<f64>>>,
        sigma: Vec<Vec<Vec<f64>>>,
    ) -> Result<Self, AppError> {
        let store = Self {
            dataset: dataset.to_string(),
            lon_centers,
            lat_centers,
            energy_bins,
            flux,
            sigma,
        };
        store.validate()?;
        Ok(store)
    }

    pub fn n_lat(&self) -> usize {
        self.lat_centers.len()
    }

    pub fn n_lon(&self) -> usize {
        self.lon_centers.len()
    }

    pub fn n_energy(&self) -> usize {
        self.energy_bins.len()
    }

    /// The flux profile of one sky region (raw sigmas; the caller applies the
    /// data-quality floor before fitting or plotting).
    ///
    /// # Panics
    /// Panics if the band indices are out of range; iterate `0..n_lat()` /
    /// `0..n_lon()`.
    pub fn profile(&self, lat_band: usize, lon_band: usize) -> FluxProfile {
        FluxProfile {
            values: self.flux[lat_band][lon_band].clone(),
            sigmas: self.sigma[lat_band][lon_band].clone(),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        let n_e = self.n_energy();
        if n_e == 0 {
            return Err(AppError::data(format!(
                "Dataset '{}': empty energy grid.",
                self.dataset
            )));
        }
        if self.energy_bins.iter().any(|&e| !e.is_finite() || e <= 0.0) {
            return Err(AppError::data(format!(
                "Dataset '{}': energy grid must contain positive, finite values.",
                self.dataset
            )));
        }
        if self.energy_bins.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::data(format!(
                "Dataset '{}': energy grid must be strictly ascending.",
                self.dataset
            )));
        }

        // The nominal grid is log-spaced with a fixed ratio; a deviating grid
        // is usable but worth flagging.
        let off_nominal = self.energy_bins.windows(2).any(|w| {
            let step = (w[1] / w[0]).ln();
            (step - LOG_BIN_SPACING).abs() > 0.05 * LOG_BIN_SPACING
        });
        if off_nominal {
            log::warn!(
                "dataset '{}': energy grid deviates from the nominal log spacing ({LOG_BIN_SPACING:.6})",
                self.dataset
            );
        }

        for (name, cube) in [(KEY_FLUX_PROFILES, &self.flux), (KEY_STD_PROFILES, &self.sigma)] {
            if cube.len() != self.n_lat() {
                return Err(self.shape_error(name, "latitude bands", cube.len(), self.n_lat()));
            }
            for (b, row) in cube.iter().enumerate() {
                if row.len() != self.n_lon() {
                    return Err(self.shape_error(
                        &format!("{name}[{b}]"),
                        "longitude bands",
                        row.len(),
                        self.n_lon(),
                    ));
                }
                for (l, bins) in row.iter().enumerate() {
                    if bins.len() != n_e {
                        return Err(self.shape_error(
                            &format!("{name}[{b}][{l}]"),
                            "energy bins",
                            bins.len(),
                            n_e,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn shape_error(&self, what: &str, unit: &str, got: usize, want: usize) -> AppError {
        AppError::data(format!(
            "Dataset '{}': {what} has {got} {unit}, expected {want}.",
            self.dataset
        ))
    }
}

/// Find a top-level entry by bare name, tolerating `"N) "` ordinal prefixes.
fn lookup<'a>(doc: &'a Value, dataset: &str, key: &str) -> Result<&'a Value, AppError> {
    let mapping = doc.as_mapping().ok_or_else(|| {
        AppError::data(format!(
            "Dataset '{dataset}': store root is not a mapping."
        ))
    })?;

    for (k, v) in mapping {
        if let Some(name) = k.as_str() {
            let name = name.trim();
            let bare = name.split_once(") ").map_or(name, |(_, rest)| rest);
            if bare == key {
                return Ok(v);
            }
        }
    }

    Err(AppError::data(format!(
        "Dataset '{dataset}': missing store key '{key}'."
    )))
}

fn f64_seq(value: &Value, dataset: &str, key: &str) -> Result<Vec<f64>, AppError> {
    let seq = value.as_sequence().ok_or_else(|| {
        AppError::data(format!("Dataset '{dataset}': '{key}' is not a sequence."))
    })?;
    seq.iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                AppError::data(format!("Dataset '{dataset}': non-numeric entry in '{key}'."))
            })
        })
        .collect()
}

fn profile_cube(value: &Value, dataset: &str, key: &str) -> Result<Vec<Vec<Vec<f64>>>, AppError> {
    let lats = value.as_sequence().ok_or_else(|| {
        AppError::data(format!("Dataset '{dataset}': '{key}' is not a sequence."))
    })?;

    let mut cube = Vec::with_capacity(lats.len());
    for lat in lats {
        let lons = lat.as_sequence().ok_or_else(|| {
            AppError::data(format!("Dataset '{dataset}': '{key}' is not nested 3 levels deep."))
        })?;
        let mut row = Vec::with_capacity(lons.len());
        for lon in lons {
            row.push(f64_seq(lon, dataset, key)?);
        }
        cube.push(row);
    }
    Ok(cube)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE_YAML: &str = r#"
"3) Center_of_lon_bins": [-5.0, 5.0]
"4) Center_of_lat_bins": [0.0]
"5) Energy_bins": [1.0, 2.0]
"6) Differential_flux_profiles": [[[1.0, 2.0], [3.0, 4.0]]]
"7) Standard_deviation_profiles": [[[0.1, 0.1], [0.2, 0.2]]]
"#;

    #[test]
    fn loads_prefixed_keys() {
        let value: Value = serde_yaml::from_str(STORE_YAML).unwrap();
        let store = SkyMapStore::from_value(&value, "data").unwrap();
        assert_eq!(store.n_lat(), 1);
        assert_eq!(store.n_lon(), 2);
        assert_eq!(store.n_energy(), 2);

        let p = store.profile(0, 1);
        assert_eq!(p.values, vec![3.0, 4.0]);
        assert_eq!(p.sigmas, vec![0.2, 0.2]);
    }

    #[test]
    fn loads_bare_keys() {
        let yaml = STORE_YAML.replace("3) ", "").replace("4) ", "").replace("5) ", "")
            .replace("6) ", "").replace("7) ", "");
        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        let store = SkyMapStore::from_value(&value, "data").unwrap();
        assert_eq!(store.n_energy(), 2);
    }

    #[test]
    fn missing_key_names_the_dataset() {
        let value: Value = serde_yaml::from_str("\"5) Energy_bins\": [1.0]").unwrap();
        let err = SkyMapStore::from_value(&value, "lowE").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("lowE"));
    }

    #[test]
    fn profile_row_shorter_than_energy_grid_is_rejected() {
        let yaml = STORE_YAML.replace("[3.0, 4.0]", "[3.0]");
        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        let err = SkyMapStore::from_value(&value, "data").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("energy bins"));
    }

    #[test]
    fn non_ascending_energy_grid_is_rejected() {
        let yaml = STORE_YAML.replace("[1.0, 2.0]\n", "[2.0, 1.0]\n");
        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(SkyMapStore::from_value(&value, "data").is_err());
    }
}
