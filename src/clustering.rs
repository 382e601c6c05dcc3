use log::debug;

use crate::{color::Color, error::AnalysisError};

/// Two-cluster fit over colour samples.
///
/// Any routine that yields two centroids can stand in for the default [`TwoMeans`].
pub trait ColorClustering {
    fn fit(&self, samples: &[Color]) -> Result<ClusterFit, AnalysisError>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterFit {
    pub centroids: [Color; 2],
    /// Number of samples assigned to each centroid.
    pub sizes: [usize; 2],
}

impl ClusterFit {
    /// Index of the centroid nearest to `sample`, ties go to index 0.
    pub fn predict(&self, sample: &Color) -> usize {
        nearest_centroid(&self.centroids, sample)
    }

    pub fn largest_cluster(&self) -> usize {
        if self.sizes[1] > self.sizes[0] { 1 } else { 0 }
    }
}

pub fn nearest_centroid(centroids: &[Color; 2], sample: &Color) -> usize {
    let d0 = (centroids[0] - sample).norm_squared();
    let d1 = (centroids[1] - sample).norm_squared();
    if d1 < d0 { 1 } else { 0 }
}

/// Lloyd's k-means with k = 2 and a deterministic farthest-point seeding, so the same samples
/// always give the same centroids.
#[derive(Clone, Copy, Debug)]
pub struct TwoMeans {
    pub max_iterations: usize,
}

impl Default for TwoMeans {
    fn default() -> Self {
        Self { max_iterations: 25 }
    }
}

impl ColorClustering for TwoMeans {
    fn fit(&self, samples: &[Color]) -> Result<ClusterFit, AnalysisError> {
        let Some(first) = samples.first() else {
            return Err(AnalysisError::InsufficientColorSamples { found: 0 });
        };
        if samples.iter().all(|sample| sample == first) {
            return Err(AnalysisError::InsufficientColorSamples { found: 1 });
        }

        let mut centroids = seed(samples);
        let mut labels = vec![usize::MAX; samples.len()];

        for iteration in 0..self.max_iterations {
            let mut changed = false;
            for (label, sample) in labels.iter_mut().zip(samples) {
                let nearest = nearest_centroid(&centroids, sample);
                if *label != nearest {
                    *label = nearest;
                    changed = true;
                }
            }
            if !changed {
                debug!("2-means converged after {} iterations", iteration);
                break;
            }

            for (index, centroid) in centroids.iter_mut().enumerate() {
                let (sum, count) = labels
                    .iter()
                    .zip(samples)
                    .filter(|(label, _)| **label == index)
                    .fold((Color::zeros(), 0usize), |(sum, count), (_, sample)| {
                        (sum + sample, count + 1)
                    });
                if count > 0 {
                    *centroid = sum / count as f64;
                }
            }
        }

        let mut sizes = [0usize; 2];
        for sample in samples {
            sizes[nearest_centroid(&centroids, sample)] += 1;
        }

        Ok(ClusterFit { centroids, sizes })
    }
}

/// First seed is the sample farthest from the mean, second the sample farthest from the first.
fn seed(samples: &[Color]) -> [Color; 2] {
    let mean = samples.iter().fold(Color::zeros(), |sum, sample| sum + sample) / samples.len() as f64;
    let farthest_from = |anchor: &Color| {
        samples
            .iter()
            .copied()
            .max_by(|a, b| {
                (a - anchor)
                    .norm_squared()
                    .total_cmp(&(b - anchor).norm_squared())
            })
            .unwrap_or(*anchor)
    };

    let first = farthest_from(&mean);
    let second = farthest_from(&first);
    [first, second]
}
