//! # Distance Resolver
//!
//! Turns distance specifiers into dissimilarity matrices. Three kinds of
//! specifier are understood, in this order of precedence:
//!
//! 1. the standard metrics `euclidean`, `maximum`, `manhattan`, `canberra`,
//!    `binary` and `minkowski`, matched case-insensitively by prefix
//!    (`"euclid"` resolves to `euclidean`, an exact name always wins);
//! 2. `spearman`, the rank-correlation distance `1 - |rho|`;
//! 3. functions registered under a custom name.
//!
//! A custom function registered under a name that also resolves to a
//! built-in is shadowed by the built-in.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use log::warn;
use ndarray::{Array2, ArrayView1, Axis};
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker};

use crate::error::{ClusteringFailure, EnsembleError};

/// User distance: data matrix in, dissimilarity between its rows out
pub type DistanceFn =
    Arc<dyn Fn(&Array2<f64>) -> Result<Dissimilarity, Box<dyn Error + Send + Sync>> + Send + Sync>;

/// Symmetric matrix of pairwise dissimilarities between rows, zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct Dissimilarity {
    matrix: Array2<f64>,
}

impl Dissimilarity {
    /// Wrap a full square matrix. The upper triangle is mirrored and the
    /// diagonal zeroed, entries must be finite and non-negative.
    pub fn from_matrix(matrix: Array2<f64>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(format!("dissimilarity must be square, got {}x{}", n, matrix.ncols()).into());
        }
        if let Some(v) = matrix.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(format!("dissimilarity contains invalid entry {}", v).into());
        }
        let mut matrix = matrix;
        for i in 0..n {
            matrix[[i, i]] = 0.0;
            for j in (i + 1)..n {
                matrix[[j, i]] = matrix[[i, j]];
            }
        }
        Ok(Self { matrix })
    }

    /// Build from the upper triangle stored row-major (n choose 2 entries)
    pub fn from_condensed(n: usize, condensed: &[f64]) -> Result<Self, Box<dyn Error + Send + Sync>> {
        if condensed.len() != n * n.saturating_sub(1) / 2 {
            return Err(format!(
                "condensed length {} does not match {} items",
                condensed.len(),
                n
            )
            .into());
        }
        let mut matrix = Array2::zeros((n, n));
        let mut idx = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                matrix[[i, j]] = condensed[idx];
                idx += 1;
            }
        }
        Self::from_matrix(matrix)
    }

    /// Build by evaluating `f` on every pair of rows of `data`
    pub fn from_rows<F>(data: &Array2<f64>, f: F) -> Self
    where
        F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64,
    {
        let n = data.nrows();
        let mut matrix = Array2::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d = f(data.row(i), data.row(j));
                matrix[[i, j]] = d;
                matrix[[j, i]] = d;
            }
        }
        Self { matrix }
    }

    /// Upper triangle, row-major
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.len();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(self.matrix[[i, j]]);
            }
        }
        out
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[[i, j]]
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

/// Standard metrics, the vocabulary of prefix matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Maximum,
    Manhattan,
    Canberra,
    Binary,
    Minkowski,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Euclidean,
        Metric::Maximum,
        Metric::Manhattan,
        Metric::Canberra,
        Metric::Binary,
        Metric::Minkowski,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Maximum => "maximum",
            Metric::Manhattan => "manhattan",
            Metric::Canberra => "canberra",
            Metric::Binary => "binary",
            Metric::Minkowski => "minkowski",
        }
    }

    pub fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>, p: f64) -> f64 {
        let pairs = a.iter().zip(b.iter());
        match self {
            Metric::Euclidean => pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            Metric::Maximum => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max),
            Metric::Manhattan => pairs.map(|(x, y)| (x - y).abs()).sum(),
            Metric::Canberra => {
                // 0/0 terms are skipped and the sum rescaled to the full length
                let mut sum = 0.0;
                let mut used = 0usize;
                for (x, y) in pairs {
                    let num = (x - y).abs();
                    let den = (x + y).abs();
                    if num == 0.0 && den == 0.0 {
                        continue;
                    }
                    used += 1;
                    if den > 0.0 {
                        sum += num / den;
                    }
                }
                if used == 0 {
                    0.0
                } else {
                    sum * a.len() as f64 / used as f64
                }
            }
            Metric::Binary => {
                let mut either = 0usize;
                let mut only_one = 0usize;
                for (x, y) in pairs {
                    let (on_x, on_y) = (*x != 0.0, *y != 0.0);
                    if on_x || on_y {
                        either += 1;
                        if on_x != on_y {
                            only_one += 1;
                        }
                    }
                }
                if either == 0 {
                    0.0
                } else {
                    only_one as f64 / either as f64
                }
            }
            Metric::Minkowski => pairs
                .map(|(x, y)| (x - y).abs().powf(p))
                .sum::<f64>()
                .powf(1.0 / p),
        }
    }
}

/// What a specifier resolved to
#[derive(Clone)]
pub enum DistanceKind {
    Builtin(Metric),
    Spearman,
    Custom(DistanceFn),
}

impl fmt::Debug for DistanceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DistanceKind::Builtin(m) => write!(f, "Builtin({})", m.name()),
            DistanceKind::Spearman => write!(f, "Spearman"),
            DistanceKind::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A resolved distance specifier
#[derive(Debug, Clone)]
pub struct ResolvedDistance {
    /// Canonical name: full metric name, `spearman` or the custom key
    pub name: String,
    pub kind: DistanceKind,
}

impl ResolvedDistance {
    /// Label used in variant names, e.g. `Euclidean`
    pub fn label(&self) -> String {
        capitalize(&self.name)
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Built-in metrics plus user registered distance functions
#[derive(Clone)]
pub struct DistanceRegistry {
    custom: HashMap<String, DistanceFn>,
    minkowski_p: f64,
}

impl Default for DistanceRegistry {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl DistanceRegistry {
    pub fn new(minkowski_p: f64) -> Self {
        Self {
            custom: HashMap::new(),
            minkowski_p,
        }
    }

    /// Register a custom distance. Names that resolve to a built-in are
    /// accepted but never used.
    pub fn register(&mut self, name: impl Into<String>, f: DistanceFn) {
        let key = name.into().trim().to_lowercase();
        if let Ok(Some(builtin)) = match_builtin(&key) {
            warn!(
                "custom distance '{}' is shadowed by built-in '{}'",
                key,
                builtin.name
            );
        }
        self.custom.insert(key, f);
    }

    /// Built-ins first, then custom distances. Both are case-insensitive.
    pub fn resolve(&self, spec: &str) -> Result<ResolvedDistance, EnsembleError> {
        if let Some(resolved) = match_builtin(spec)? {
            return Ok(resolved);
        }
        let key = spec.trim().to_lowercase();
        match self.custom.get(&key) {
            Some(f) => Ok(ResolvedDistance {
                name: key,
                kind: DistanceKind::Custom(Arc::clone(f)),
            }),
            None => Err(EnsembleError::UnknownDistance(spec.to_string())),
        }
    }

    /// Compute the dissimilarity between the rows of `data`
    pub fn compute(
        &self,
        distance: &ResolvedDistance,
        data: &Array2<f64>,
    ) -> Result<Dissimilarity, ClusteringFailure> {
        match &distance.kind {
            DistanceKind::Builtin(metric) => {
                let p = self.minkowski_p;
                Ok(Dissimilarity::from_rows(data, |a, b| metric.distance(a, b, p)))
            }
            DistanceKind::Spearman => Ok(spearman_distance(data)),
            DistanceKind::Custom(f) => {
                let diss = f(data).map_err(|e| ClusteringFailure::from_error(&distance.name, e))?;
                if diss.len() != data.nrows() {
                    return Err(ClusteringFailure::new(
                        &distance.name,
                        format!("returned {} items for {} rows", diss.len(), data.nrows()),
                    ));
                }
                Ok(diss)
            }
        }
    }

    /// Resolve every specifier and compute its dissimilarity, preserving the
    /// requested order. Keys are the canonical names.
    pub fn resolve_distances(
        &self,
        data: &Array2<f64>,
        specs: &[String],
    ) -> Result<Vec<(String, Dissimilarity)>, EnsembleError> {
        let resolved = specs
            .iter()
            .map(|spec| self.resolve(spec))
            .collect::<Result<Vec<_>, _>>()?;
        resolved
            .into_iter()
            .map(|d| {
                let diss = self
                    .compute(&d, data)
                    .map_err(|e| EnsembleError::InvalidConfiguration(e.to_string()))?;
                Ok((d.name, diss))
            })
            .collect()
    }
}

/// Ok(None) when `spec` is not a built-in
fn match_builtin(spec: &str) -> Result<Option<ResolvedDistance>, EnsembleError> {
    let lower = spec.trim().to_lowercase();
    if lower.is_empty() {
        return Ok(None);
    }
    if lower == "spearman" {
        return Ok(Some(ResolvedDistance {
            name: "spearman".to_string(),
            kind: DistanceKind::Spearman,
        }));
    }
    let builtin = |m: Metric| ResolvedDistance {
        name: m.name().to_string(),
        kind: DistanceKind::Builtin(m),
    };
    if let Some(m) = Metric::ALL.iter().find(|m| m.name() == lower) {
        return Ok(Some(builtin(*m)));
    }
    let candidates: Vec<Metric> = Metric::ALL
        .iter()
        .copied()
        .filter(|m| m.name().starts_with(&lower))
        .collect();
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(Some(builtin(candidates[0]))),
        _ => Err(EnsembleError::AmbiguousDistance {
            spec: spec.to_string(),
            candidates: candidates.iter().map(|m| m.name().to_string()).collect(),
        }),
    }
}

/// `1 - |spearman correlation|` between every pair of rows
pub fn spearman_distance(data: &Array2<f64>) -> Dissimilarity {
    let ranks: Vec<Vec<f64>> = data
        .axis_iter(Axis(0))
        .map(|row| {
            let mut d = Data::new(row.to_vec());
            d.ranks(RankTieBreaker::Average)
        })
        .collect();

    let n = ranks.len();
    let mut matrix = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = 1.0 - pearson(&ranks[i], &ranks[j]).abs();
            matrix[[i, j]] = d;
            matrix[[j, i]] = d;
        }
    }
    Dissimilarity { matrix }
}

/// Pearson correlation, 0 when either side has no variance
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}
