//! # Subsampling ensemble driver
//!
//! [`ConsensusEnsemble::run`] resolves every requested algorithm and
//! distance, then for each family (factorization, dissimilarity-based,
//! matrix-based) draws the subsample table, clusters every
//! (k, variant, repetition) cell and writes the partition at the drawn rows.
//! Family arrays are finally joined along the variant axis.
//!
//! A failing cell never aborts the run: errors, panics and partitions of the
//! wrong length leave the cell missing and produce a [`ClusteringWarning`].

use std::any::Any;
use std::collections::HashSet;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assembly::EnsembleArray;
use crate::cluster::{ClusterContext, DissimilarityClusterer, MatrixClusterer, Partition};
use crate::config::{EnsembleConfig, PrepMode};
use crate::distance::{Dissimilarity, DistanceRegistry, ResolvedDistance};
use crate::error::{ClusteringFailure, EnsembleError};
use crate::matrix::{select_rows, DataMatrix};
use crate::nmf::{NmfClusterer, NmfMethod};
use crate::prepare::{default_preparer, Preparer};
use crate::progress::Progress;
use crate::registry::{algorithm_label, AlgorithmRegistry, Family};
use crate::sampling::SubsampleTable;

/// A cell that produced no partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringWarning {
    /// 1-based, matching the `R1..RR` labels
    pub repetition: usize,
    pub variant: String,
    pub k: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct EnsembleOutput {
    pub ensemble: EnsembleArray,
    pub warnings: Vec<ClusteringWarning>,
}

struct MatrixVariant {
    label: String,
    clusterer: Arc<dyn MatrixClusterer>,
}

struct DissimilarityAlgorithm {
    label: String,
    clusterer: Arc<dyn DissimilarityClusterer>,
}

/// Resolved work of one family
enum FamilyJob {
    Matrix(Vec<MatrixVariant>),
    /// Variants are algorithm-major: `alg * distances.len() + distance`
    Dissimilarity {
        algorithms: Vec<DissimilarityAlgorithm>,
        distances: Vec<ResolvedDistance>,
    },
}

impl FamilyJob {
    fn labels(&self) -> Vec<String> {
        match self {
            FamilyJob::Matrix(variants) => variants.iter().map(|v| v.label.clone()).collect(),
            FamilyJob::Dissimilarity {
                algorithms,
                distances,
            } => algorithms
                .iter()
                .flat_map(|a| distances.iter().map(move |d| format!("{}_{}", a.label, d.label())))
                .collect(),
        }
    }

    fn n_variants(&self) -> usize {
        match self {
            FamilyJob::Matrix(variants) => variants.len(),
            FamilyJob::Dissimilarity {
                algorithms,
                distances,
            } => algorithms.len() * distances.len(),
        }
    }
}

/// Outcome of one (repetition, variant, k) cell
struct CellOutcome {
    rep: usize,
    variant: usize,
    k_idx: usize,
    result: Result<Partition, String>,
}

pub struct ConsensusEnsemble {
    config: EnsembleConfig,
    algorithms: AlgorithmRegistry,
    distances: DistanceRegistry,
    preparer: Preparer,
}

impl ConsensusEnsemble {
    pub fn builder() -> EnsembleBuilder {
        EnsembleBuilder::new()
    }

    /// Ensemble with built-in algorithms and distances only
    pub fn new(config: EnsembleConfig) -> Result<Self, EnsembleError> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn algorithms(&self) -> &AlgorithmRegistry {
        &self.algorithms
    }

    pub fn distances(&self) -> &DistanceRegistry {
        &self.distances
    }

    /// Resolve the configured names into family jobs, in run order. Fails
    /// before any clustering on unknown names.
    fn plan(&self) -> Result<Vec<(Family, FamilyJob)>, EnsembleError> {
        let mut factorization = Vec::new();
        let mut dissimilarity = Vec::new();
        let mut matrix = Vec::new();

        for name in &self.config.algorithms {
            let family = self.algorithms.family_of(name).inspect_err(|_| {
                warn!(
                    "unknown algorithm '{}'; registered: {}",
                    name,
                    self.algorithms.names().join(", ")
                )
            })?;
            match family {
                Family::Factorization => {
                    if self.config.nmf_methods.is_empty() {
                        return Err(EnsembleError::InvalidConfiguration(
                            "'nmf' requested without NMF methods".to_string(),
                        ));
                    }
                    for method in &self.config.nmf_methods {
                        let method = NmfMethod::parse(method)?;
                        factorization.push(MatrixVariant {
                            label: method.label(),
                            clusterer: Arc::new(NmfClusterer::new(method)),
                        });
                    }
                }
                Family::Dissimilarity => {
                    let clusterer = self
                        .algorithms
                        .dissimilarity(name)
                        .ok_or_else(|| EnsembleError::UnknownAlgorithm(name.clone()))?;
                    dissimilarity.push(DissimilarityAlgorithm {
                        label: algorithm_label(name),
                        clusterer,
                    });
                }
                Family::Matrix => {
                    let clusterer = self
                        .algorithms
                        .matrix(name)
                        .ok_or_else(|| EnsembleError::UnknownAlgorithm(name.clone()))?;
                    matrix.push(MatrixVariant {
                        label: algorithm_label(name),
                        clusterer,
                    });
                }
            }
        }

        let mut jobs = Vec::new();
        if !factorization.is_empty() {
            jobs.push((Family::Factorization, FamilyJob::Matrix(factorization)));
        }
        if !dissimilarity.is_empty() {
            if self.config.distances.is_empty() {
                return Err(EnsembleError::InvalidConfiguration(
                    "dissimilarity-based algorithms requested without distances".to_string(),
                ));
            }
            let distances = self
                .config
                .distances
                .iter()
                .map(|spec| self.distances.resolve(spec))
                .collect::<Result<Vec<_>, _>>()?;
            jobs.push((
                Family::Dissimilarity,
                FamilyJob::Dissimilarity {
                    algorithms: dissimilarity,
                    distances,
                },
            ));
        }
        if !matrix.is_empty() {
            jobs.push((Family::Matrix, FamilyJob::Matrix(matrix)));
        }

        // names that differ only by case or distance prefix land on one label
        let mut seen = HashSet::new();
        for label in jobs.iter().flat_map(|(_, job)| job.labels()) {
            if !seen.insert(label.clone()) {
                return Err(EnsembleError::InvalidConfiguration(format!(
                    "algorithm variant '{}' is requested more than once",
                    label
                )));
            }
        }
        Ok(jobs)
    }

    pub fn run(&self, data: &DataMatrix) -> Result<EnsembleOutput, EnsembleError> {
        let start_time = Instant::now();
        self.config.validate()?;
        let jobs = self.plan()?;

        let n = data.nrows();
        let size = self.config.sample_size(n);
        if size == 0 {
            return Err(EnsembleError::InvalidConfiguration(format!(
                "p_item {} draws no rows out of {}",
                self.config.p_item, n
            )));
        }

        let prepared = match self.config.prep_data {
            PrepMode::Full => {
                let x = (self.preparer)(data.data());
                if x.nrows() != n || x.ncols() == 0 {
                    return Err(EnsembleError::InvalidConfiguration(format!(
                        "data preparation turned {}x{} into {}x{}",
                        n,
                        data.ncols(),
                        x.nrows(),
                        x.ncols()
                    )));
                }
                x
            }
            _ => data.data().clone(),
        };

        let n_variants: usize = jobs.iter().map(|(_, job)| job.n_variants()).sum();
        let progress = Progress::new(
            self.config.n_k.len() * n_variants * self.config.reps,
            self.config.progress,
        );
        info!(
            "Starting consensus ensemble: {} samples, {} repetitions of {} rows, {} variants, k in {:?}",
            n, self.config.reps, size, n_variants, self.config.n_k
        );

        let mut parts = Vec::with_capacity(jobs.len());
        let mut warnings = Vec::new();
        for (family, job) in &jobs {
            let family_start = Instant::now();
            let part = self.run_family(job, &prepared, data.row_names(), size, &progress, &mut warnings);
            info!(
                "{:?} family: {} variants done in {:?}",
                family,
                job.n_variants(),
                family_start.elapsed()
            );
            parts.push(part);
        }

        if !progress.is_complete() {
            warn!(
                "only {} of {} cells were reported back",
                progress.done(),
                progress.total()
            );
        }
        let ensemble = EnsembleArray::concatenate(parts)?;
        info!(
            "Ensemble completed in {:?}: shape {:?}, {} of {} cells failed",
            start_time.elapsed(),
            ensemble.shape(),
            warnings.len(),
            progress.total()
        );

        if self.config.save {
            let path = ensemble.save(&self.config.file_name, self.config.time_saved)?;
            info!("Ensemble written to {}", path.display());
        }

        Ok(EnsembleOutput { ensemble, warnings })
    }

    fn run_family(
        &self,
        job: &FamilyJob,
        data: &Array2<f64>,
        sample_names: &[String],
        size: usize,
        progress: &Progress,
        warnings: &mut Vec<ClusteringWarning>,
    ) -> EnsembleArray {
        // every family starts from the same stream, so all tables agree
        let table = SubsampleTable::draw(data.nrows(), size, self.config.reps, self.config.seed);

        let mut outcomes: Vec<CellOutcome> = if self.config.parallel {
            (0..table.reps())
                .into_par_iter()
                .map(|rep| self.run_repetition(job, data, table.get(rep), rep, progress))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        } else {
            table
                .iter()
                .enumerate()
                .flat_map(|(rep, rows)| self.run_repetition(job, data, rows, rep, progress))
                .collect()
        };
        outcomes.sort_by_key(|o| (o.k_idx, o.variant, o.rep));

        let labels = job.labels();
        let mut array = EnsembleArray::missing(
            sample_names.to_vec(),
            table.reps(),
            labels.clone(),
            self.config.n_k.clone(),
        );
        for outcome in outcomes {
            let k = self.config.n_k[outcome.k_idx];
            match outcome.result {
                Ok(partition) => {
                    array.write(outcome.rep, outcome.variant, outcome.k_idx, table.get(outcome.rep), &partition)
                }
                Err(reason) => {
                    warn!(
                        "{} k={} repetition {} failed: {}",
                        labels[outcome.variant],
                        k,
                        outcome.rep + 1,
                        reason
                    );
                    warnings.push(ClusteringWarning {
                        repetition: outcome.rep + 1,
                        variant: labels[outcome.variant].clone(),
                        k,
                        reason,
                    });
                }
            }
        }
        array
    }

    /// Every cell of one family for one repetition
    fn run_repetition(
        &self,
        job: &FamilyJob,
        data: &Array2<f64>,
        rows: &[usize],
        rep: usize,
        progress: &Progress,
    ) -> Vec<CellOutcome> {
        let expected = rows.len();
        let subsample = self.subsample(data, rows);
        let n_k = self.config.n_k.len();
        let mut outcomes = Vec::with_capacity(job.n_variants() * n_k);

        let mut record = |variant: usize, k_idx: usize, result: Result<Partition, String>| {
            debug!(
                "repetition {} variant {} k={}: {}",
                rep + 1,
                variant,
                self.config.n_k[k_idx],
                if result.is_ok() { "ok" } else { "failed" }
            );
            progress.tick();
            outcomes.push(CellOutcome {
                rep,
                variant,
                k_idx,
                result,
            });
        };

        match job {
            FamilyJob::Matrix(variants) => {
                for (v, variant) in variants.iter().enumerate() {
                    for (k_idx, &k) in self.config.n_k.iter().enumerate() {
                        let result = subsample.as_ref().map_err(Clone::clone).and_then(|x| {
                            let ctx = ClusterContext::new(k, self.config.seed_alg);
                            checked_partition(expected, || variant.clusterer.cluster(x, &ctx))
                        });
                        record(v, k_idx, result);
                    }
                }
            }
            FamilyJob::Dissimilarity {
                algorithms,
                distances,
            } => {
                // one dissimilarity per (repetition, distance), shared by every
                // algorithm and k
                let dissimilarities: Vec<Result<Dissimilarity, String>> = distances
                    .iter()
                    .map(|d| {
                        subsample
                            .as_ref()
                            .map_err(Clone::clone)
                            .and_then(|x| guarded(|| self.distances.compute(d, x)))
                            .map_err(|reason| format!("distance '{}': {}", d.name, reason))
                    })
                    .collect();

                for (a, algorithm) in algorithms.iter().enumerate() {
                    for (d, diss) in dissimilarities.iter().enumerate() {
                        let v = a * distances.len() + d;
                        for (k_idx, &k) in self.config.n_k.iter().enumerate() {
                            let result = diss.as_ref().map_err(Clone::clone).and_then(|diss| {
                                let ctx = ClusterContext::new(k, self.config.seed_alg);
                                checked_partition(expected, || algorithm.clusterer.cluster(diss, &ctx))
                            });
                            record(v, k_idx, result);
                        }
                    }
                }
            }
        }
        outcomes
    }

    /// Rows of one repetition, prepared when preparation is per subsample
    fn subsample(&self, data: &Array2<f64>, rows: &[usize]) -> Result<Array2<f64>, String> {
        let x = select_rows(data, rows);
        if self.config.prep_data != PrepMode::Sampled {
            return Ok(x);
        }
        let prepared = catch_unwind(AssertUnwindSafe(|| (self.preparer)(&x)))
            .map_err(|panic| format!("data preparation panicked: {}", panic_message(&panic)))?;
        if prepared.nrows() != x.nrows() {
            return Err(format!(
                "data preparation returned {} rows for {}",
                prepared.nrows(),
                x.nrows()
            ));
        }
        Ok(prepared)
    }
}

/// Run `f`, turning errors and panics into a failure reason
fn guarded<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, ClusteringFailure>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(failure)) => Err(failure.to_string()),
        Err(panic) => Err(format!("panicked: {}", panic_message(&panic))),
    }
}

/// [`guarded`] plus a check that one label came back per row
fn checked_partition<F>(expected: usize, f: F) -> Result<Partition, String>
where
    F: FnOnce() -> Result<Partition, ClusteringFailure>,
{
    let partition = guarded(f)?;
    if partition.len() != expected {
        return Err(format!(
            "returned {} labels for {} rows",
            partition.len(),
            expected
        ));
    }
    Ok(partition)
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`ConsensusEnsemble`]
pub struct EnsembleBuilder {
    config: EnsembleConfig,
    distances: Vec<(String, crate::distance::DistanceFn)>,
    dissimilarity_algorithms: Vec<(String, Arc<dyn DissimilarityClusterer>)>,
    matrix_algorithms: Vec<(String, Arc<dyn MatrixClusterer>)>,
    preparer: Option<Preparer>,
}

impl Default for EnsembleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnsembleBuilder {
    pub fn new() -> Self {
        Self {
            config: EnsembleConfig::default(),
            distances: Vec::new(),
            dissimilarity_algorithms: Vec::new(),
            matrix_algorithms: Vec::new(),
            preparer: None,
        }
    }

    pub fn config(mut self, config: EnsembleConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a custom distance. Built-in names take precedence.
    pub fn register_distance<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&Array2<f64>) -> Result<Dissimilarity, Box<dyn Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        self.distances.push((name.to_string(), Arc::new(f)));
        self
    }

    pub fn register_dissimilarity_algorithm<C>(mut self, name: &str, clusterer: C) -> Self
    where
        C: DissimilarityClusterer + 'static,
    {
        self.dissimilarity_algorithms
            .push((name.to_string(), Arc::new(clusterer)));
        self
    }

    pub fn register_matrix_algorithm<C>(mut self, name: &str, clusterer: C) -> Self
    where
        C: MatrixClusterer + 'static,
    {
        self.matrix_algorithms.push((name.to_string(), Arc::new(clusterer)));
        self
    }

    /// Replace the default data preparation
    pub fn preparer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Array2<f64>) -> Array2<f64> + Send + Sync + 'static,
    {
        self.preparer = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Result<ConsensusEnsemble, EnsembleError> {
        self.config.validate()?;

        let mut algorithms = AlgorithmRegistry::with_builtins(&self.config);
        for (name, clusterer) in self.dissimilarity_algorithms {
            algorithms.register_dissimilarity(&name, clusterer)?;
        }
        for (name, clusterer) in self.matrix_algorithms {
            algorithms.register_matrix(&name, clusterer)?;
        }

        let mut distances = DistanceRegistry::new(self.config.minkowski_p);
        for (name, f) in self.distances {
            distances.register(name, f);
        }

        let preparer = self
            .preparer
            .unwrap_or_else(|| default_preparer(self.config.prepare.clone()));

        Ok(ConsensusEnsemble {
            config: self.config,
            algorithms,
            distances,
            preparer,
        })
    }
}
