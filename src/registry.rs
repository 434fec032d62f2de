//! Name-keyed dispatch tables for the clusterer families.
//!
//! Built-ins and user extensions are registered the same way; a registration
//! under an existing name replaces it. Names are matched case-insensitively.
//! `nmf` is reserved for the factorization family, whose variants are the
//! configured NMF methods.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::cluster::affinity::AffinityPropagation;
use crate::cluster::block::LatentBlockModel;
use crate::cluster::cmeans::FuzzyCMeans;
use crate::cluster::dbscan::DbscanClusterer;
use crate::cluster::divisive::DivisiveClusterer;
use crate::cluster::gmm::GmmClusterer;
use crate::cluster::hierarchical::HierarchicalClusterer;
use crate::cluster::partitioning::{KMeansClusterer, PamClusterer};
use crate::cluster::som::SomPipeline;
use crate::cluster::spectral::SpectralClusterer;
use crate::cluster::{DissimilarityClusterer, MatrixClusterer};
use crate::config::EnsembleConfig;
use crate::error::EnsembleError;

pub const NMF: &str = "nmf";

/// Family an algorithm name dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Factorization,
    Dissimilarity,
    Matrix,
}

#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    dissimilarity: HashMap<String, Arc<dyn DissimilarityClusterer>>,
    matrix: HashMap<String, Arc<dyn MatrixClusterer>>,
}

impl AlgorithmRegistry {
    /// Registry holding every built-in, parameterized from `config`
    pub fn with_builtins(config: &EnsembleConfig) -> Self {
        let mut registry = Self::default();
        registry.insert_dissimilarity("hc", Arc::new(HierarchicalClusterer::default()));
        registry.insert_dissimilarity("diana", Arc::new(DivisiveClusterer));
        registry.insert_dissimilarity("km", Arc::new(KMeansClusterer));
        registry.insert_dissimilarity("pam", Arc::new(PamClusterer::default()));

        registry.insert_matrix("ap", Arc::new(AffinityPropagation::default()));
        registry.insert_matrix("sc", Arc::new(SpectralClusterer::default()));
        registry.insert_matrix("gmm", Arc::new(GmmClusterer::default()));
        registry.insert_matrix("block", Arc::new(LatentBlockModel::default()));
        registry.insert_matrix("som", Arc::new(SomPipeline::from(&config.som)));
        registry.insert_matrix("cmeans", Arc::new(FuzzyCMeans::default()));
        registry.insert_matrix("dbscan", Arc::new(DbscanClusterer::from(&config.dbscan)));
        registry
    }

    fn insert_dissimilarity(&mut self, name: &str, clusterer: Arc<dyn DissimilarityClusterer>) {
        self.dissimilarity.insert(name.to_string(), clusterer);
    }

    fn insert_matrix(&mut self, name: &str, clusterer: Arc<dyn MatrixClusterer>) {
        self.matrix.insert(name.to_string(), clusterer);
    }

    fn check_name(name: &str) -> Result<String, EnsembleError> {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(EnsembleError::InvalidConfiguration(
                "algorithm name must not be empty".to_string(),
            ));
        }
        if key == NMF {
            return Err(EnsembleError::InvalidConfiguration(
                "'nmf' is reserved for the factorization family".to_string(),
            ));
        }
        Ok(key)
    }

    /// Register a clusterer that works on a dissimilarity matrix
    pub fn register_dissimilarity(
        &mut self,
        name: &str,
        clusterer: Arc<dyn DissimilarityClusterer>,
    ) -> Result<(), EnsembleError> {
        let key = Self::check_name(name)?;
        if self.matrix.remove(&key).is_some() || self.dissimilarity.contains_key(&key) {
            warn!("algorithm '{}' re-registered as dissimilarity-based", key);
        }
        self.dissimilarity.insert(key, clusterer);
        Ok(())
    }

    /// Register a clusterer that works on the data matrix
    pub fn register_matrix(
        &mut self,
        name: &str,
        clusterer: Arc<dyn MatrixClusterer>,
    ) -> Result<(), EnsembleError> {
        let key = Self::check_name(name)?;
        if self.dissimilarity.remove(&key).is_some() || self.matrix.contains_key(&key) {
            warn!("algorithm '{}' re-registered as matrix-based", key);
        }
        self.matrix.insert(key, clusterer);
        Ok(())
    }

    pub fn family_of(&self, name: &str) -> Result<Family, EnsembleError> {
        let key = name.trim().to_lowercase();
        if key == NMF {
            Ok(Family::Factorization)
        } else if self.dissimilarity.contains_key(&key) {
            Ok(Family::Dissimilarity)
        } else if self.matrix.contains_key(&key) {
            Ok(Family::Matrix)
        } else {
            Err(EnsembleError::UnknownAlgorithm(name.to_string()))
        }
    }

    pub fn dissimilarity(&self, name: &str) -> Option<Arc<dyn DissimilarityClusterer>> {
        self.dissimilarity.get(&name.trim().to_lowercase()).cloned()
    }

    pub fn matrix(&self, name: &str) -> Option<Arc<dyn MatrixClusterer>> {
        self.matrix.get(&name.trim().to_lowercase()).cloned()
    }

    /// Registered names of both families, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dissimilarity
            .keys()
            .chain(self.matrix.keys())
            .cloned()
            .collect();
        names.push(NMF.to_string());
        names.sort();
        names
    }
}

/// Variant label of a non-factorization algorithm, e.g. `PAM`
pub fn algorithm_label(name: &str) -> String {
    name.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterContext, Partition};
    use crate::config::DEFAULT_ALGORITHMS;
    use crate::distance::Dissimilarity;
    use crate::error::ClusteringFailure;

    #[test]
    fn test_builtins_cover_default_algorithms() {
        let registry = AlgorithmRegistry::with_builtins(&EnsembleConfig::default());
        for name in DEFAULT_ALGORITHMS {
            assert!(registry.family_of(name).is_ok(), "{} missing", name);
        }
        assert_eq!(registry.family_of("PAM").unwrap(), Family::Dissimilarity);
        assert_eq!(registry.family_of("som").unwrap(), Family::Matrix);
        assert_eq!(registry.family_of("nmf").unwrap(), Family::Factorization);
    }

    #[test]
    fn test_unknown_algorithm_is_named() {
        let registry = AlgorithmRegistry::with_builtins(&EnsembleConfig::default());
        match registry.family_of("kmedoids") {
            Err(EnsembleError::UnknownAlgorithm(name)) => assert_eq!(name, "kmedoids"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_register_moves_between_families() {
        let mut registry = AlgorithmRegistry::with_builtins(&EnsembleConfig::default());
        let custom = |d: &Dissimilarity, _: &ClusterContext| -> Result<Partition, ClusteringFailure> {
            Ok(vec![Some(1); d.len()])
        };
        registry.register_dissimilarity("SC", Arc::new(custom)).unwrap();
        assert_eq!(registry.family_of("sc").unwrap(), Family::Dissimilarity);
        assert!(registry.matrix("sc").is_none());
    }

    #[test]
    fn test_nmf_is_reserved() {
        let mut registry = AlgorithmRegistry::default();
        let custom = |x: &ndarray::Array2<f64>, _: &ClusterContext| -> Result<Partition, ClusteringFailure> {
            Ok(vec![Some(1); x.nrows()])
        };
        assert!(registry.register_matrix("NMF", Arc::new(custom)).is_err());
    }

    #[test]
    fn test_algorithm_label() {
        assert_eq!(algorithm_label("hc"), "HC");
        assert_eq!(algorithm_label("myAlg"), "MYALG");
    }
}
