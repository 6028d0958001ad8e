//! The cooperative multi-input/multi-output graph-node contract, and
//! `FrameSync`, a worked example exercising it.
//!
//! A `HydraNode` never blocks: it inspects its input queues, transfers
//! whatever it can to its output queues, and returns. The external
//! runtime re-invokes `poll` when more input arrives. Items left on
//! input queues persist across calls; items pushed to output queues
//! may be drained at any later time.

use std::collections::VecDeque;

/// A cooperative multi-input/multi-output graph-node body. Returns
/// `true` while it still wants to be polled again, `false` once it has
/// observed end-of-stream on every input and drained itself.
pub trait HydraNode<T> {
    /// Transfers whatever it can from `inputs` to `outputs` without
    /// blocking, and reports whether it expects further input.
    fn poll(&mut self, inputs: &mut [VecDeque<T>], outputs: &mut [VecDeque<T>]) -> bool;
}

/// An item a `FrameSync` can reorder: something with an ascending
/// stream-local identifier, or an end-of-stream marker.
pub trait SyncItem {
    /// The item's ordering key. Each input stream is assumed to be
    /// sorted ascending by this key.
    fn ident(&self) -> i64;
    /// Whether this item is an in-band end-of-stream marker.
    fn is_eos(&self) -> bool;
}

/// Synchronizes `n` input streams of `SyncItem`s on ascending ident,
/// forwarding the smallest ident present as the front item of every
/// still-active input. Does not discard unmatched items: an input
/// whose front ident has no match on another active input simply
/// blocks the node until the other inputs catch up (or all inputs
/// reach EOS).
pub struct FrameSync<T> {
    eos_seen: Vec<bool>,
    eos_token: T,
    done: bool,
}

impl<T: SyncItem + Clone> FrameSync<T> {
    /// A sync node over `ninputs` streams, emitting `eos_token` on
    /// every output once every input has reached end-of-stream.
    pub fn new(ninputs: usize, eos_token: T) -> Self {
        FrameSync { eos_seen: vec![false; ninputs], eos_token, done: false }
    }
}

impl<T: SyncItem + Clone> HydraNode<T> for FrameSync<T> {
    fn poll(&mut self, inputs: &mut [VecDeque<T>], outputs: &mut [VecDeque<T>]) -> bool {
        if self.done {
            return false;
        }
        assert_eq!(inputs.len(), self.eos_seen.len(), "FrameSync: input count changed between polls");
        loop {
            for (i, queue) in inputs.iter_mut().enumerate() {
                if !self.eos_seen[i] {
                    if let Some(front) = queue.front() {
                        if front.is_eos() {
                            queue.pop_front();
                            self.eos_seen[i] = true;
                        }
                    }
                }
            }

            let active: Vec<usize> = (0..inputs.len()).filter(|&i| !self.eos_seen[i]).collect();
            if active.is_empty() {
                for out in outputs.iter_mut() {
                    out.push_back(self.eos_token.clone());
                }
                self.done = true;
                return false;
            }

            if active.iter().any(|&i| inputs[i].is_empty()) {
                return true;
            }

            let min_ident = active.iter().map(|&i| inputs[i].front().unwrap().ident()).min().unwrap();
            if active.iter().all(|&i| inputs[i].front().unwrap().ident() == min_ident) {
                for &i in &active {
                    let item = inputs[i].pop_front().unwrap();
                    outputs[0].push_back(item);
                }
            } else {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Item {
        Frame(i64),
        Eos,
    }

    impl SyncItem for Item {
        fn ident(&self) -> i64 {
            match self {
                Item::Frame(i) => *i,
                Item::Eos => i64::MAX,
            }
        }
        fn is_eos(&self) -> bool {
            matches!(self, Item::Eos)
        }
    }

    #[test]
    fn forwards_matched_idents_in_order() {
        let mut node = FrameSync::new(2, Item::Eos);
        let mut inputs = vec![
            VecDeque::from(vec![Item::Frame(0), Item::Frame(1), Item::Eos]),
            VecDeque::from(vec![Item::Frame(0), Item::Frame(1), Item::Eos]),
        ];
        let mut outputs = vec![VecDeque::new()];

        let still_running = node.poll(&mut inputs, &mut outputs);
        assert!(!still_running);
        assert_eq!(
            outputs[0],
            VecDeque::from(vec![Item::Frame(0), Item::Frame(0), Item::Frame(1), Item::Frame(1), Item::Eos])
        );
    }

    #[test]
    fn waits_when_one_input_is_ahead() {
        let mut node = FrameSync::new(2, Item::Eos);
        let mut inputs = vec![VecDeque::from(vec![Item::Frame(5)]), VecDeque::from(vec![Item::Frame(3)])];
        let mut outputs = vec![VecDeque::new()];

        let still_running = node.poll(&mut inputs, &mut outputs);
        assert!(still_running);
        assert!(outputs[0].is_empty());
        assert_eq!(inputs[0].len(), 1);
        assert_eq!(inputs[1].len(), 1);
    }

    #[test]
    fn waits_on_empty_active_input() {
        let mut node = FrameSync::new(2, Item::Eos);
        let mut inputs = vec![VecDeque::from(vec![Item::Frame(0)]), VecDeque::new()];
        let mut outputs = vec![VecDeque::new()];

        assert!(node.poll(&mut inputs, &mut outputs));
        assert_eq!(inputs[0].len(), 1);
    }
}
