//! # Ensemble array
//!
//! The 4-D result of a run: samples × repetitions × algorithm variants ×
//! cluster counts, every cell a label or missing. Family arrays are joined
//! along the variant axis and the whole array can be persisted as JSON and
//! read back.

/**
 * File: /src/assembly.rs
 * Created Date: Thursday, March 12th 2026
 * Author: Zihan
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-03-12		Zihan	Persist to JSON with optional timestamp
 */
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use ndarray::{s, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::cluster::Partition;
use crate::error::EnsembleError;

/// Labels of the four axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub samples: Vec<String>,
    pub repetitions: Vec<String>,
    pub variants: Vec<String>,
    pub k: Vec<usize>,
}

impl Dimensions {
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (
            self.samples.len(),
            self.repetitions.len(),
            self.variants.len(),
            self.k.len(),
        )
    }
}

/// On-disk layout: labels, shape and the cells in row-major order
#[derive(Serialize, Deserialize)]
struct PersistedEnsemble {
    dims: Dimensions,
    shape: [usize; 4],
    cells: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleArray {
    dims: Dimensions,
    cells: Array4<Option<usize>>,
}

impl EnsembleArray {
    /// All-missing array with repetitions named `R1..RR`
    pub fn missing(samples: Vec<String>, reps: usize, variants: Vec<String>, k: Vec<usize>) -> Self {
        let dims = Dimensions {
            samples,
            repetitions: (1..=reps).map(|r| format!("R{}", r)).collect(),
            variants,
            k,
        };
        let cells = Array4::from_elem(dims.shape(), None);
        Self { dims, cells }
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn cells(&self) -> &Array4<Option<usize>> {
        &self.cells
    }

    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.dims.shape()
    }

    pub fn get(&self, sample: usize, rep: usize, variant: usize, k_idx: usize) -> Option<usize> {
        self.cells[[sample, rep, variant, k_idx]]
    }

    /// Write the partition of one cell at the sampled rows
    pub fn write(
        &mut self,
        rep: usize,
        variant: usize,
        k_idx: usize,
        rows: &[usize],
        partition: &Partition,
    ) {
        for (&row, &label) in rows.iter().zip(partition) {
            self.cells[[row, rep, variant, k_idx]] = label;
        }
    }

    /// Labels of all samples for one (repetition, variant, k)
    pub fn partition(&self, rep: usize, variant: usize, k_idx: usize) -> Partition {
        self.cells.slice(s![.., rep, variant, k_idx]).to_vec()
    }

    /// Non-missing entries of one (repetition, variant, k)
    pub fn count_assigned(&self, rep: usize, variant: usize, k_idx: usize) -> usize {
        self.cells
            .slice(s![.., rep, variant, k_idx])
            .iter()
            .filter(|l| l.is_some())
            .count()
    }

    /// Index of a variant label
    pub fn variant_index(&self, label: &str) -> Option<usize> {
        self.dims.variants.iter().position(|v| v == label)
    }

    /// Index of a cluster count
    pub fn k_index(&self, k: usize) -> Option<usize> {
        self.dims.k.iter().position(|&x| x == k)
    }

    /// samples × repetitions × k cube of one variant
    pub fn variant(&self, variant: usize) -> ArrayView3<'_, Option<usize>> {
        self.cells.index_axis(Axis(2), variant)
    }

    /// Join arrays along the variant axis. Samples, repetitions and k must
    /// agree.
    pub fn concatenate(parts: Vec<EnsembleArray>) -> Result<EnsembleArray, EnsembleError> {
        let mut parts = parts.into_iter();
        let first = parts.next().ok_or_else(|| {
            EnsembleError::InvalidConfiguration("no ensemble parts to join".to_string())
        })?;
        let mut dims = first.dims.clone();
        let mut views = vec![first.cells];

        for part in parts {
            if part.dims.samples != dims.samples
                || part.dims.repetitions != dims.repetitions
                || part.dims.k != dims.k
            {
                return Err(EnsembleError::InvalidConfiguration(
                    "ensemble parts disagree on samples, repetitions or k".to_string(),
                ));
            }
            dims.variants.extend(part.dims.variants);
            views.push(part.cells);
        }

        let views: Vec<_> = views.iter().map(|c| c.view()).collect();
        let cells = ndarray::concatenate(Axis(2), &views)
            .map_err(|e| EnsembleError::InvalidConfiguration(e.to_string()))?;
        Ok(EnsembleArray { dims, cells })
    }

    /// `<file_name>.json`, or `<file_name>_<YYYY-mm-dd_HH-MM-SS>.json` when
    /// timestamped
    pub fn output_path(file_name: &str, time_saved: bool) -> PathBuf {
        if time_saved {
            let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
            PathBuf::from(format!("{}_{}.json", file_name, stamp))
        } else {
            PathBuf::from(format!("{}.json", file_name))
        }
    }

    /// Persist under the configured name and return the written path
    pub fn save(&self, file_name: &str, time_saved: bool) -> Result<PathBuf, EnsembleError> {
        let path = Self::output_path(file_name, time_saved);
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), EnsembleError> {
        let (n, r, v, k) = self.shape();
        let persisted = PersistedEnsemble {
            dims: self.dims.clone(),
            shape: [n, r, v, k],
            cells: self.cells.iter().copied().collect(),
        };
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(writer, &persisted)?;
        info!("ensemble of shape {:?} saved to {}", self.shape(), path.as_ref().display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<EnsembleArray, EnsembleError> {
        let reader = BufReader::new(File::open(path)?);
        let persisted: PersistedEnsemble = serde_json::from_reader(reader)?;
        let [n, r, v, k] = persisted.shape;
        if persisted.dims.shape() != (n, r, v, k) {
            return Err(EnsembleError::Serialization(format!(
                "dimension labels {:?} do not match shape {:?}",
                persisted.dims.shape(),
                persisted.shape
            )));
        }
        let cells = Array4::from_shape_vec((n, r, v, k), persisted.cells)
            .map_err(|e| EnsembleError::Serialization(e.to_string()))?;
        Ok(EnsembleArray {
            dims: persisted.dims,
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("S{}", i)).collect()
    }

    #[test]
    fn test_write_and_count() {
        let mut e = EnsembleArray::missing(names(5), 2, vec!["PAM_Euclidean".into()], vec![2, 3]);
        e.write(1, 0, 1, &[0, 2, 4], &vec![Some(1), Some(2), None]);
        assert_eq!(e.count_assigned(1, 0, 1), 2);
        assert_eq!(e.count_assigned(0, 0, 1), 0);
        assert_eq!(e.get(2, 1, 0, 1), Some(2));
        assert_eq!(e.partition(1, 0, 1), vec![Some(1), None, Some(2), None, None]);
        assert_eq!(e.dims().repetitions, vec!["R1", "R2"]);
        assert_eq!(e.k_index(3), Some(1));
    }

    #[test]
    fn test_concatenate_along_variants() {
        let mut a = EnsembleArray::missing(names(3), 1, vec!["NMF_Brunet".into()], vec![2]);
        a.write(0, 0, 0, &[0, 1, 2], &vec![Some(1), Some(1), Some(2)]);
        let b = EnsembleArray::missing(names(3), 1, vec!["AP".into(), "SOM".into()], vec![2]);
        let joined = EnsembleArray::concatenate(vec![a, b]).unwrap();
        assert_eq!(joined.shape(), (3, 1, 3, 1));
        assert_eq!(joined.dims().variants, vec!["NMF_Brunet", "AP", "SOM"]);
        assert_eq!(joined.get(2, 0, 0, 0), Some(2));
        assert_eq!(joined.variant_index("SOM"), Some(2));
        assert_eq!(joined.variant(0).shape(), &[3, 1, 1]);
    }

    #[test]
    fn test_concatenate_rejects_mismatch() {
        let a = EnsembleArray::missing(names(3), 1, vec!["A".into()], vec![2]);
        let b = EnsembleArray::missing(names(3), 2, vec!["B".into()], vec![2]);
        assert!(EnsembleArray::concatenate(vec![a, b]).is_err());
        assert!(EnsembleArray::concatenate(vec![]).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensemble.json");
        let mut e = EnsembleArray::missing(names(4), 2, vec!["HC_Euclidean".into()], vec![2, 4]);
        e.write(0, 0, 1, &[1, 3], &vec![Some(4), Some(1)]);
        e.save_to(&path).unwrap();
        assert_eq!(EnsembleArray::load(&path).unwrap(), e);
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            EnsembleArray::output_path("CCOutput", false),
            PathBuf::from("CCOutput.json")
        );
        let stamped = EnsembleArray::output_path("CCOutput", true);
        let name = stamped.to_string_lossy();
        // CCOutput_YYYY-mm-dd_HH-MM-SS.json
        assert!(name.starts_with("CCOutput_"));
        assert_eq!(name.len(), "CCOutput_".len() + 19 + ".json".len());
    }
}
