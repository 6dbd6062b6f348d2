//! FIFO sample queue shared between the orchestrator and the output
//! callback.
//!
//! The orchestrator pushes synthesized chunks; the audio callback pops
//! exactly as many samples as the device asks for, padding with silence
//! when the queue runs dry.  Unlike a capture ring buffer nothing is ever
//! overwritten — playback must not drop audio.

use std::collections::VecDeque;

/// Unbounded FIFO of mono `f32` samples.
///
/// Kept deliberately simple: the engine produces faster than real time but
/// an utterance is bounded by the clipboard length limit, so the queue
/// never grows beyond one utterance of audio.
#[derive(Debug, Default)]
pub struct SampleQueue {
    samples: VecDeque<f32>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append samples to the tail.
    pub fn push_slice(&mut self, data: &[f32]) {
        self.samples.extend(data.iter().copied());
    }

    /// Fill `out` from the head, zero-padding when the queue is shorter
    /// than `out`.  Returns how many real samples were written.
    pub fn pop_into(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.samples.len());
        for slot in out.iter_mut().take(n) {
            // n ≤ len, so pop_front cannot fail here
            *slot = self.samples.pop_front().unwrap_or(0.0);
        }
        for slot in out.iter_mut().skip(n) {
            *slot = 0.0;
        }
        n
    }

    /// Discard all queued samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_preserves_order() {
        let mut q = SampleQueue::new();
        q.push_slice(&[1.0, 2.0, 3.0]);

        let mut out = [0.0; 2];
        assert_eq!(q.pop_into(&mut out), 2);
        assert_eq!(out, [1.0, 2.0]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn underrun_pads_with_silence() {
        let mut q = SampleQueue::new();
        q.push_slice(&[0.5]);

        let mut out = [9.0; 4];
        assert_eq!(q.pop_into(&mut out), 1);
        assert_eq!(out, [0.5, 0.0, 0.0, 0.0]);
        assert!(q.is_empty());
    }

    #[test]
    fn clear_discards_everything() {
        let mut q = SampleQueue::new();
        q.push_slice(&[1.0; 100]);
        q.clear();
        assert!(q.is_empty());

        let mut out = [1.0; 2];
        assert_eq!(q.pop_into(&mut out), 0);
        assert_eq!(out, [0.0, 0.0]);
    }
}
