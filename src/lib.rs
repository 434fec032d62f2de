/*
 * File: /src/lib.rs
 * Created Date: Monday, March 9th 2026
 * Author: Zihan
 * -----
 * Last Modified: Saturday, 17th October 2026 5:02:11 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-17		Zihan	Factorization family moved under nmf/
 */

//! Subsampling ensemble engine for consensus clustering.
//!
//! A dataset is subsampled `reps` times; every subsample is clustered by each
//! requested algorithm (crossed with each distance for the
//! dissimilarity-based ones) for every `k`, and the partitions are collected
//! in a 4-D [`EnsembleArray`] of shape (samples, repetitions, variants, k).
//!
//! ```no_run
//! use consensus_ensemble::{ConsensusEnsemble, DataMatrix, EnsembleConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = DataMatrix::new(ndarray::Array2::zeros((100, 5)))?;
//! let config = EnsembleConfig {
//!     n_k: vec![2, 3],
//!     algorithms: vec!["pam".to_string(), "som".to_string()],
//!     ..Default::default()
//! };
//! let output = ConsensusEnsemble::new(config)?.run(&data)?;
//! println!("{:?}", output.ensemble.shape());
//! # Ok(())
//! # }
//! ```

pub mod assembly;
pub mod cluster;
pub mod config;
pub mod distance;
pub mod error;
pub mod matrix;
pub mod nmf;
pub mod pipeline;
pub mod prepare;
pub mod progress;
pub mod registry;
pub mod sampling;
pub mod util;

pub use assembly::EnsembleArray;
pub use cluster::{ClusterContext, DissimilarityClusterer, MatrixClusterer, Partition};
pub use config::{EnsembleConfig, PrepMode};
pub use distance::Dissimilarity;
pub use error::{ClusteringFailure, EnsembleError};
pub use matrix::DataMatrix;
pub use pipeline::{ClusteringWarning, ConsensusEnsemble, EnsembleBuilder, EnsembleOutput};
