//! Intensity histogram over masked voxels and the dominant-band search.
//!
//! Bins span `[min, max]` of the finite input values uniformly; the last bin
//! is closed on the right. A constant input is binned over `[v - 0.5, v + 0.5]`.
//! Bin values reported to callers are bin centres.

use crate::error::{Result, SegmentationError};
use serde::Serialize;

/// Default number of bins for the dominant-band search.
pub const INTENSITY_BINS: usize = 256;

#[derive(Clone, Debug)]
pub struct IntensityHistogram {
    counts: Vec<usize>,
    lo: f64,
    width: f64,
    total: usize,
}

/// Intensity band around the histogram peak holding the majority class.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DominantBand {
    pub peak_bin: usize,
    pub half_width: usize,
    pub peak_value: f64,
    pub lower_value: f64,
    pub upper_value: f64,
    /// Voxels inside the window when the search stopped.
    pub inside: usize,
    /// Voxel count the window had to reach.
    pub target: f64,
}

impl DominantBand {
    /// `true` when `x` lies strictly between the band bounds.
    #[inline]
    pub fn contains_strictly(&self, x: f64) -> bool {
        x > self.lower_value && x < self.upper_value
    }
}

impl IntensityHistogram {
    /// Histogram of the finite entries of `values`; `None` when there are
    /// none or `bins` is zero.
    pub fn build(values: &[f64], bins: usize) -> Option<Self> {
        if bins == 0 {
            return None;
        }
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &v in values.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
        }
        if min > max {
            return None;
        }
        if min == max {
            min -= 0.5;
            max += 0.5;
        }
        let mut hist = Self {
            counts: vec![0; bins],
            lo: min,
            width: (max - min) / bins as f64,
            total: 0,
        };
        for &v in values.iter().filter(|v| v.is_finite()) {
            let idx = hist.bin_of(v);
            hist.counts[idx] += 1;
            hist.total += 1;
        }
        Some(hist)
    }

    /// Bin index of `x`, clamped to the histogram range.
    #[inline]
    pub fn bin_of(&self, x: f64) -> usize {
        let idx = ((x - self.lo) / self.width).floor();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(self.counts.len() - 1)
        }
    }

    /// Centre value of bin `idx`.
    #[inline]
    pub fn center(&self, idx: usize) -> f64 {
        self.lo + (idx as f64 + 0.5) * self.width
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Index of the most populated bin (first one on ties).
    pub fn peak(&self) -> usize {
        let mut best = 0;
        for (i, &c) in self.counts.iter().enumerate() {
            if c > self.counts[best] {
                best = i;
            }
        }
        best
    }

    /// Widen a symmetric window around the peak until it holds `perc` percent
    /// of all counted voxels.
    ///
    /// The window `[peak - w, peak + w]` is clipped to the histogram and `w`
    /// grows by one bin per step, so the loop runs at most `bins` times. If the
    /// whole histogram is covered without reaching the target the search fails
    /// with [`SegmentationError::UnboundedDominantSearch`].
    pub fn dominant_band(&self, perc: f64) -> Result<DominantBand> {
        let n = self.counts.len();
        let target = self.total as f64 * perc / 100.0;
        let peak = self.peak();
        let mut half = 0usize;
        let mut inside = self.counts[peak];
        while (inside as f64) < target {
            half += 1;
            if half >= n {
                return Err(SegmentationError::UnboundedDominantSearch {
                    perc,
                    bins: n,
                    reached: inside,
                    target,
                });
            }
            let (lo, hi) = self.window(peak, half);
            inside = self.counts[lo..=hi].iter().sum();
        }
        let (lo, hi) = self.window(peak, half);
        Ok(DominantBand {
            peak_bin: peak,
            half_width: half,
            peak_value: self.center(peak),
            lower_value: self.center(lo),
            upper_value: self.center(hi),
            inside,
            target,
        })
    }

    fn window(&self, peak: usize, half: usize) -> (usize, usize) {
        (
            peak.saturating_sub(half),
            (peak + half).min(self.counts.len() - 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_finite_value_once() {
        let values = [0.0, 1.0, 2.0, 3.0, f64::NAN, 255.0, 255.0];
        let hist = IntensityHistogram::build(&values, 256).expect("non-empty");
        assert_eq!(hist.total(), 6);
        assert_eq!(hist.counts().iter().sum::<usize>(), 6);
        assert_eq!(hist.counts()[255], 2, "max value lands in the closed last bin");
        assert_eq!(hist.bin_of(-10.0), 0);
    }

    #[test]
    fn constant_input_gets_a_unit_range() {
        let hist = IntensityHistogram::build(&[7.0; 10], 4).expect("non-empty");
        assert_eq!(hist.peak(), 2);
        assert!((hist.center(2) - 7.125).abs() < 1e-12);
    }

    #[test]
    fn empty_or_non_finite_input_has_no_histogram() {
        assert!(IntensityHistogram::build(&[], 256).is_none());
        assert!(IntensityHistogram::build(&[f64::NAN, f64::INFINITY], 256).is_none());
        assert!(IntensityHistogram::build(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn band_stays_on_peak_when_peak_alone_reaches_target() {
        let mut values = vec![100.0; 12];
        values.extend([200.0; 4]);
        let hist = IntensityHistogram::build(&values, 256).expect("non-empty");
        let band = hist.dominant_band(30.0).expect("reachable");
        assert_eq!(band.peak_bin, 0);
        assert_eq!(band.half_width, 0);
        assert_eq!(band.inside, 12);
        assert_eq!(band.peak_value.round(), 100.0);
        assert!(!band.contains_strictly(band.peak_value));
    }

    #[test]
    fn band_widens_symmetrically() {
        // ten bins, counts 1,1,2,3,10,3,2,1,1,1
        let mut values = Vec::new();
        for (bin, count) in [1, 1, 2, 3, 10, 3, 2, 1, 1, 1].into_iter().enumerate() {
            values.extend(std::iter::repeat(bin as f64 + 0.5).take(count));
        }
        values.push(0.0);
        values.push(10.0);
        let hist = IntensityHistogram::build(&values, 10).expect("non-empty");
        assert_eq!(hist.peak(), 4);
        let band = hist.dominant_band(60.0).expect("reachable");
        // target 0.6 * 27 = 16.2 → needs bins 3..=5 (16) then 2..=6 (20)
        assert_eq!(band.half_width, 2);
        assert_eq!(band.inside, 20);
        assert!(band.contains_strictly(4.5));
        assert!(!band.contains_strictly(band.lower_value));
    }

    #[test]
    fn unreachable_target_fails_instead_of_looping() {
        let hist = IntensityHistogram::build(&[1.0, 2.0, 3.0], 8).expect("non-empty");
        let err = hist.dominant_band(150.0).unwrap_err();
        match err {
            SegmentationError::UnboundedDominantSearch { bins, reached, .. } => {
                assert_eq!(bins, 8);
                assert_eq!(reached, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(hist.dominant_band(100.0).is_ok());
    }
}
