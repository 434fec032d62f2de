/**
 * File: /src/config.rs
 * Created Date: Friday, January 26th 2024
 * Author: Zihan
 * -----
 * Last Modified: Wednesday, 11th March 2026 10:12:40 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-03-11		Zihan	Ensemble configuration, JSON loading
 */
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EnsembleError;

/// When the data preparation step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrepMode {
    /// Cluster the data as given
    None,
    /// Prepare once on the full data before subsampling
    Full,
    /// Prepare every subsample separately
    Sampled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleType {
    /// (x - mean) / sd
    Conventional,
    /// (x - median) / (1.4826 * MAD)
    Robust,
}

/// Options of the default preparation step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareOptions {
    pub scale: bool,
    pub scale_type: ScaleType,
    /// Columns with a variance below this are dropped
    pub min_var: f64,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            scale: true,
            scale_type: ScaleType::Conventional,
            min_var: 1.0,
        }
    }
}

/// Self-organising map parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SomParams {
    pub xdim: usize,
    pub ydim: usize,
    /// Number of passes over the data
    pub rlen: usize,
    /// Learning rate at the first and last step
    pub alpha: (f64, f64),
}

impl Default for SomParams {
    fn default() -> Self {
        Self {
            xdim: 5,
            ydim: 5,
            rlen: 200,
            alpha: (0.05, 0.01),
        }
    }
}

/// Density clustering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbscanParams {
    /// Neighbourhood radius
    pub eps: f64,
    pub min_points: usize,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_points: 5,
        }
    }
}

/// Ensemble configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Requested cluster counts, each >= 2
    pub n_k: Vec<usize>,
    /// Number of subsamples per (k, variant)
    pub reps: usize,
    /// Proportion of rows drawn per subsample, in (0, 1]
    pub p_item: f64,
    pub algorithms: Vec<String>,
    pub nmf_methods: Vec<String>,
    pub distances: Vec<String>,
    /// Exponent of the minkowski distance
    pub minkowski_p: f64,
    pub som: SomParams,
    pub dbscan: DbscanParams,
    pub prep_data: PrepMode,
    pub prepare: PrepareOptions,
    /// Seed of the subsample draws
    pub seed: u64,
    /// Seed handed to stochastic algorithms (NMF initialisation, k-means, ...)
    pub seed_alg: u64,
    pub progress: bool,
    /// Dispatch the cells of a family on the rayon pool
    pub parallel: bool,
    pub save: bool,
    pub file_name: String,
    /// Append a timestamp to the saved file name
    pub time_saved: bool,
}

pub const DEFAULT_ALGORITHMS: [&str; 12] = [
    "nmf", "hc", "diana", "km", "pam", "ap", "sc", "gmm", "block", "som", "cmeans", "dbscan",
];

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_k: vec![4],
            reps: 10,
            p_item: 0.8,
            algorithms: DEFAULT_ALGORITHMS.iter().map(|s| s.to_string()).collect(),
            nmf_methods: vec!["brunet".to_string(), "lee".to_string()],
            distances: vec!["euclidean".to_string()],
            minkowski_p: 2.0,
            som: SomParams::default(),
            dbscan: DbscanParams::default(),
            prep_data: PrepMode::None,
            prepare: PrepareOptions::default(),
            seed: 1,
            seed_alg: 1,
            progress: false,
            parallel: false,
            save: false,
            file_name: "CCOutput".to_string(),
            time_saved: false,
        }
    }
}

impl EnsembleConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<EnsembleConfig, EnsembleError> {
        let reader = BufReader::new(File::open(path)?);
        let config: EnsembleConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Number of rows drawn per repetition for a dataset of `n` rows
    pub fn sample_size(&self, n: usize) -> usize {
        (n as f64 * self.p_item).floor() as usize
    }

    /// Checks that do not depend on names or data. Name resolution happens in
    /// the registry, data-dependent checks in the driver.
    pub fn validate(&self) -> Result<(), EnsembleError> {
        let invalid = |msg: String| Err(EnsembleError::InvalidConfiguration(msg));

        if self.n_k.is_empty() {
            return invalid("at least one cluster count is required".to_string());
        }
        if let Some(k) = self.n_k.iter().find(|&&k| k < 2) {
            return invalid(format!("cluster counts must be >= 2, got {}", k));
        }
        if has_duplicates(&self.n_k) {
            return invalid(format!("duplicate cluster counts in {:?}", self.n_k));
        }
        if self.reps == 0 {
            return invalid("reps must be positive".to_string());
        }
        if !(self.p_item > 0.0 && self.p_item <= 1.0) {
            return invalid(format!("p_item must lie in (0, 1], got {}", self.p_item));
        }
        if self.algorithms.is_empty() {
            return invalid("no algorithms requested".to_string());
        }
        if has_duplicates(&self.algorithms) {
            return invalid(format!("duplicate algorithms in {:?}", self.algorithms));
        }
        if has_duplicates(&self.distances) {
            return invalid(format!("duplicate distances in {:?}", self.distances));
        }
        if has_duplicates(&self.nmf_methods) {
            return invalid(format!("duplicate NMF methods in {:?}", self.nmf_methods));
        }
        if !(self.minkowski_p.is_finite() && self.minkowski_p > 0.0) {
            return invalid(format!("minkowski_p must be positive, got {}", self.minkowski_p));
        }
        if self.som.xdim == 0 || self.som.ydim == 0 || self.som.rlen == 0 {
            return invalid(format!(
                "SOM grid {}x{} with rlen {} is degenerate",
                self.som.xdim, self.som.ydim, self.som.rlen
            ));
        }
        let (a0, a1) = self.som.alpha;
        if !(a0.is_finite() && a1.is_finite() && a0 > 0.0 && a1 >= 0.0) {
            return invalid(format!("SOM learning rates ({}, {}) are invalid", a0, a1));
        }
        if !(self.dbscan.eps.is_finite() && self.dbscan.eps > 0.0) || self.dbscan.min_points == 0 {
            return invalid(format!(
                "DBSCAN needs eps > 0 and min_points >= 1, got eps={} min_points={}",
                self.dbscan.eps, self.dbscan.min_points
            ));
        }
        Ok(())
    }
}

fn has_duplicates<T: std::hash::Hash + Eq>(items: &[T]) -> bool {
    let mut seen = HashSet::new();
    !items.iter().all(|item| seen.insert(item))
}

/// Command line arguments of the binary
#[derive(Debug)]
pub struct CliArgs {
    pub data_path: PathBuf,
    pub config_path: Option<PathBuf>,
}

impl CliArgs {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- data/matrix.npy config.json
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> Result<CliArgs, EnsembleError> {
        // 0: program name
        // 1: matrix path (.npy, f64)
        // 2: optional config path (.json)
        args.next();
        let data_path = args.next().map(PathBuf::from).ok_or_else(|| {
            EnsembleError::InvalidConfiguration(
                "usage: consensus_ensemble <data.npy> [config.json]".to_string(),
            )
        })?;
        let config_path = args.next().map(PathBuf::from);
        Ok(CliArgs {
            data_path,
            config_path,
        })
    }

    pub fn load_config(&self) -> Result<EnsembleConfig, EnsembleError> {
        match &self.config_path {
            Some(path) => EnsembleConfig::from_json_file(path),
            None => Ok(EnsembleConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EnsembleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_size(100), 80);
        assert_eq!(config.algorithms.len(), 12);
    }

    #[test]
    fn test_invalid_cluster_counts() {
        let mut config = EnsembleConfig::default();
        config.n_k = vec![1, 3];
        assert!(matches!(
            config.validate(),
            Err(EnsembleError::InvalidConfiguration(_))
        ));
        config.n_k = vec![3, 3];
        assert!(config.validate().is_err());
        config.n_k = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_proportion_and_reps() {
        let mut config = EnsembleConfig::default();
        config.p_item = 0.0;
        assert!(config.validate().is_err());
        config.p_item = 1.5;
        assert!(config.validate().is_err());
        config.p_item = f64::NAN;
        assert!(config.validate().is_err());
        config.p_item = 1.0;
        config.reps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_som_and_dbscan() {
        let mut config = EnsembleConfig::default();
        config.som.xdim = 0;
        assert!(config.validate().is_err());

        let mut config = EnsembleConfig::default();
        config.dbscan.eps = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "n_k": [2, 3], "algorithms": ["pam"], "prep_data": "sampled",
                        "som": { "xdim": 3 } }"#;
        let config: EnsembleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.n_k, vec![2, 3]);
        assert_eq!(config.algorithms, vec!["pam".to_string()]);
        assert_eq!(config.prep_data, PrepMode::Sampled);
        assert_eq!(config.som.xdim, 3);
        assert_eq!(config.som.ydim, 5);
        assert_eq!(config.reps, 10);
    }

    #[test]
    fn test_cli_args() {
        let args = vec![
            "target/debug/consensus_ensemble".to_string(),
            "data/matrix.npy".to_string(),
            "config.json".to_string(),
        ];
        let cli = CliArgs::new(args.into_iter()).unwrap();
        assert_eq!(cli.data_path, PathBuf::from("data/matrix.npy"));
        assert_eq!(cli.config_path, Some(PathBuf::from("config.json")));

        let args = vec!["target/debug/consensus_ensemble".to_string()];
        assert!(CliArgs::new(args.into_iter()).is_err());
    }
}
