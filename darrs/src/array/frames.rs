use std::num::NonZeroU64;
use std::ops::Range;

/// How a sequence of frames fits into a length, see [`fit_frames`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FitFrames {
    /// The number of complete frames.
    pub num_frames: u64,
    /// The length covered by the complete frames.
    pub covered_len: u64,
    /// The length after the last complete frame.
    pub remainder: u64,
}

/// Fit frames of `frame_len` advancing by `step` into `total_len`.
///
/// ```
/// # use std::num::NonZeroU64;
/// # use darrs::array::fit_frames;
/// let fit = fit_frames(10, NonZeroU64::new(4).unwrap(), NonZeroU64::new(3).unwrap());
/// assert_eq!((fit.num_frames, fit.covered_len, fit.remainder), (3, 10, 0));
/// ```
#[must_use]
pub fn fit_frames(total_len: u64, frame_len: NonZeroU64, step: NonZeroU64) -> FitFrames {
    let (frame_len, step) = (frame_len.get(), step.get());
    if frame_len > total_len {
        return FitFrames {
            num_frames: 0,
            covered_len: 0,
            remainder: total_len,
        };
    }
    let num_frames = (total_len - frame_len) / step + 1;
    let covered_len = (num_frames - 1) * step + frame_len;
    FitFrames {
        num_frames,
        covered_len,
        remainder: total_len - covered_len,
    }
}

/// An iterator over frames of rows.
///
/// Frames have `frame_len` rows and start every `step` rows, which defaults to `frame_len`.
/// A final shorter frame covering the remainder is included unless disabled with [`include_remainder`](Self::include_remainder).
#[derive(Clone, Debug)]
pub struct FrameIterator {
    range: Range<u64>,
    frame_len: u64,
    step: u64,
    num_frames: u64,
    remainder_len: u64,
    remainder: bool,
    index: u64,
    remainder_done: bool,
}

impl FrameIterator {
    /// Create a frame iterator over `range`.
    #[must_use]
    pub fn new(range: Range<u64>, frame_len: NonZeroU64) -> Self {
        let mut frames = Self {
            range,
            frame_len: frame_len.get(),
            step: frame_len.get(),
            num_frames: 0,
            remainder_len: 0,
            remainder: true,
            index: 0,
            remainder_done: false,
        };
        frames.refit();
        frames
    }

    /// Set the step between frame starts.
    #[must_use]
    pub fn step(mut self, step: NonZeroU64) -> Self {
        self.step = step.get();
        self.refit();
        self
    }

    /// Set whether a final frame covering the remainder is yielded.
    #[must_use]
    pub fn include_remainder(mut self, include_remainder: bool) -> Self {
        self.remainder = include_remainder;
        self
    }

    /// Return how the complete frames fit into the range.
    #[must_use]
    pub fn fit(&self) -> FitFrames {
        fit_frames(
            self.range.end.saturating_sub(self.range.start),
            NonZeroU64::new(self.frame_len).unwrap_or(NonZeroU64::MIN),
            NonZeroU64::new(self.step).unwrap_or(NonZeroU64::MIN),
        )
    }

    fn refit(&mut self) {
        let fit = self.fit();
        self.num_frames = fit.num_frames;
        self.remainder_len = fit.remainder;
    }
}

impl Iterator for FrameIterator {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.num_frames {
            let start = self.range.start + self.index * self.step;
            self.index += 1;
            return Some(start..start + self.frame_len);
        }
        if self.remainder && self.remainder_len > 0 && !self.remainder_done {
            self.remainder_done = true;
            let start = self.range.start + self.num_frames * self.step;
            if start < self.range.end {
                return Some(start..self.range.end);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: u64) -> NonZeroU64 {
        NonZeroU64::new(value).unwrap()
    }

    #[test]
    fn frames_fit() {
        assert_eq!(
            fit_frames(10, nz(3), nz(3)),
            FitFrames {
                num_frames: 3,
                covered_len: 9,
                remainder: 1
            }
        );
        assert_eq!(fit_frames(2, nz(3), nz(1)).remainder, 2);
        assert_eq!(fit_frames(5, nz(2), nz(1)).num_frames, 4);
    }

    #[test]
    fn frames_iterate() {
        let frames: Vec<_> = FrameIterator::new(0..7, nz(3)).collect();
        assert_eq!(frames, vec![0..3, 3..6, 6..7]);
        let frames: Vec<_> = FrameIterator::new(2..7, nz(3))
            .include_remainder(false)
            .collect();
        assert_eq!(frames, vec![2..5]);
        let frames: Vec<_> = FrameIterator::new(0..5, nz(3)).step(nz(1)).collect();
        assert_eq!(frames, vec![0..3, 1..4, 2..5]);
        assert_eq!(FrameIterator::new(0..0, nz(3)).count(), 0);
    }
}
