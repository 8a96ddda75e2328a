/*
 *  sequence.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame transition sequencer - from/to frame pairs with repetitions,
 *  per-transition durations and an optional one-shot opening
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::time::Duration;
use thiserror::Error;

/// Shortest duration a transition may hold a frame, in ms.
pub const MIN_TRANSITION_MS: u64 = 50;
/// Longest duration a transition may hold a frame, in ms.
pub const MAX_TRANSITION_MS: u64 = 2000;

/// Error type for transition construction/validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("transition repetitions must be > 0")]
    ZeroRepetitions,
    #[error("transition duration {0} ms outside 50..=2000 ms")]
    DurationOutOfRange(u64),
    #[error("{0} transition list is empty")]
    EmptyList(&'static str),
    #[error("frame index {index} out of range for {frame_count} frames")]
    FrameOutOfRange { index: usize, frame_count: usize },
}

/// A from/to frame pair played `repetitions` times, each frame held for `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTransition {
    from_frame: usize,
    to_frame: usize,
    repetitions: u32,
    duration: Duration,
}

impl FrameTransition {
    pub fn new(
        from_frame: usize,
        to_frame: usize,
        repetitions: u32,
        duration_ms: u64,
    ) -> Result<Self, SequenceError> {
        if repetitions == 0 {
            return Err(SequenceError::ZeroRepetitions);
        }
        if !(MIN_TRANSITION_MS..=MAX_TRANSITION_MS).contains(&duration_ms) {
            return Err(SequenceError::DurationOutOfRange(duration_ms));
        }
        Ok(Self {
            from_frame,
            to_frame,
            repetitions,
            duration: Duration::from_millis(duration_ms),
        })
    }

    pub fn from_frame(&self) -> usize { self.from_frame }
    pub fn to_frame(&self) -> usize { self.to_frame }
    pub fn repetitions(&self) -> u32 { self.repetitions }
    pub fn duration(&self) -> Duration { self.duration }

    fn check_frames(&self, frame_count: usize) -> Result<(), SequenceError> {
        for index in [self.from_frame, self.to_frame] {
            if index >= frame_count {
                return Err(SequenceError::FrameOutOfRange { index, frame_count });
            }
        }
        Ok(())
    }
}

/// Transition lists a theme asks the driver to play.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionPlan {
    pub opening: Option<Vec<FrameTransition>>,
    pub main: Vec<FrameTransition>,
}

/// Cursor over the opening (once) and main (looping) transition lists.
#[derive(Debug, Clone)]
pub struct FrameTransitionSequence {
    main: Vec<FrameTransition>,
    opening: Option<Vec<FrameTransition>>,
    current_transition: usize,
    current_repetition: u32,
    showing_from: bool,
    in_opening: bool,
}

impl FrameTransitionSequence {
    /// Validates both lists against `frame_count` and positions the cursor
    /// at the start of the opening (when present) or of the main list.
    pub fn new(
        main: Vec<FrameTransition>,
        opening: Option<Vec<FrameTransition>>,
        frame_count: usize,
    ) -> Result<Self, SequenceError> {
        if main.is_empty() {
            return Err(SequenceError::EmptyList("main"));
        }
        if let Some(list) = opening.as_ref() {
            if list.is_empty() {
                return Err(SequenceError::EmptyList("opening"));
            }
        }
        for t in main.iter().chain(opening.iter().flatten()) {
            t.check_frames(frame_count)?;
        }
        let in_opening = opening.is_some();
        Ok(Self {
            main,
            opening,
            current_transition: 0,
            current_repetition: 0,
            showing_from: true,
            in_opening,
        })
    }

    pub fn from_plan(plan: TransitionPlan, frame_count: usize) -> Result<Self, SequenceError> {
        Self::new(plan.main, plan.opening, frame_count)
    }

    fn active_list(&self) -> &[FrameTransition] {
        match (&self.opening, self.in_opening) {
            (Some(opening), true) => opening,
            _ => &self.main,
        }
    }

    fn active(&self) -> &FrameTransition {
        &self.active_list()[self.current_transition]
    }

    pub fn current_frame_index(&self) -> usize {
        let t = self.active();
        if self.showing_from { t.from_frame } else { t.to_frame }
    }

    pub fn current_duration(&self) -> Duration {
        self.active().duration
    }

    pub fn has_opening(&self) -> bool {
        self.opening.is_some()
    }

    pub fn is_in_opening(&self) -> bool {
        self.in_opening
    }

    /// Steps one frame. Returns false only when the main list wraps back to
    /// its start; leaving the opening for the main list returns true.
    pub fn advance(&mut self) -> bool {
        if self.showing_from {
            self.showing_from = false;
            return true;
        }

        self.showing_from = true;
        self.current_repetition += 1;
        if self.current_repetition < self.active().repetitions {
            return true;
        }

        self.current_repetition = 0;
        self.current_transition += 1;
        if self.current_transition < self.active_list().len() {
            return true;
        }

        self.current_transition = 0;
        if self.in_opening {
            self.in_opening = false;
            log::debug!("opening sequence complete, entering main sequence");
            true
        } else {
            false
        }
    }

    /// Rewind to the first transition; with `include_opening` the opening
    /// (when present) plays again from the top.
    pub fn reset(&mut self, include_opening: bool) {
        self.current_transition = 0;
        self.current_repetition = 0;
        self.showing_from = true;
        self.in_opening = include_opening && self.opening.is_some();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ft(from: usize, to: usize, reps: u32, ms: u64) -> FrameTransition {
        FrameTransition::new(from, to, reps, ms).unwrap()
    }

    #[test]
    fn test_transition_validation() {
        assert_eq!(FrameTransition::new(0, 1, 0, 100), Err(SequenceError::ZeroRepetitions));
        assert_eq!(FrameTransition::new(0, 1, 1, 49), Err(SequenceError::DurationOutOfRange(49)));
        assert_eq!(FrameTransition::new(0, 1, 1, 2001), Err(SequenceError::DurationOutOfRange(2001)));
        assert!(FrameTransition::new(0, 1, 1, 50).is_ok());
        assert!(FrameTransition::new(0, 1, 1, 2000).is_ok());
    }

    #[test]
    fn test_sequence_validation() {
        assert_eq!(
            FrameTransitionSequence::new(vec![], None, 4).unwrap_err(),
            SequenceError::EmptyList("main")
        );
        assert_eq!(
            FrameTransitionSequence::new(vec![ft(0, 1, 1, 100)], Some(vec![]), 4).unwrap_err(),
            SequenceError::EmptyList("opening")
        );
        assert_eq!(
            FrameTransitionSequence::new(vec![ft(0, 4, 1, 100)], None, 4).unwrap_err(),
            SequenceError::FrameOutOfRange { index: 4, frame_count: 4 }
        );
        assert_eq!(
            FrameTransitionSequence::new(vec![ft(0, 1, 1, 100)], Some(vec![ft(7, 0, 1, 50)]), 4)
                .unwrap_err(),
            SequenceError::FrameOutOfRange { index: 7, frame_count: 4 }
        );
    }

    #[test]
    fn test_repeated_pair_wraps_after_last_repetition() {
        let mut seq = FrameTransitionSequence::new(vec![ft(0, 1, 3, 100)], None, 2).unwrap();
        assert_eq!(seq.current_frame_index(), 0);
        assert_eq!(seq.current_duration(), Duration::from_millis(100));

        let mut frames = Vec::new();
        let mut results = Vec::new();
        for _ in 0..6 {
            results.push(seq.advance());
            frames.push(seq.current_frame_index());
        }
        assert_eq!(frames, vec![1, 0, 1, 0, 1, 0]);
        assert_eq!(results, vec![true, true, true, true, true, false]);
    }

    #[test]
    fn test_single_repetition_is_plain_alternation() {
        let mut seq = FrameTransitionSequence::new(vec![ft(2, 3, 1, 60)], None, 4).unwrap();
        let mut frames = vec![seq.current_frame_index()];
        for _ in 0..5 {
            seq.advance();
            frames.push(seq.current_frame_index());
        }
        assert_eq!(frames, vec![2, 3, 2, 3, 2, 3]);
    }

    #[test]
    fn test_opening_hands_over_to_main() {
        let mut seq = FrameTransitionSequence::new(
            vec![ft(1, 2, 2, 100)],
            Some(vec![ft(0, 1, 1, 50)]),
            3,
        )
        .unwrap();
        assert!(seq.is_in_opening());
        assert_eq!(seq.current_frame_index(), 0);
        assert_eq!(seq.current_duration(), Duration::from_millis(50));

        assert!(seq.advance());
        assert_eq!(seq.current_frame_index(), 1);
        assert!(seq.advance());
        assert!(!seq.is_in_opening());
        assert_eq!(seq.current_frame_index(), 1);
        assert_eq!(seq.current_duration(), Duration::from_millis(100));

        // 1,2,1,2 then wrap
        assert!(seq.advance());
        assert_eq!(seq.current_frame_index(), 2);
        assert!(seq.advance());
        assert!(seq.advance());
        assert!(!seq.advance());
        assert!(!seq.is_in_opening());
        assert_eq!(seq.current_frame_index(), 1);

        seq.reset(true);
        assert!(seq.is_in_opening());
        assert_eq!(seq.current_frame_index(), 0);
        assert_eq!(seq.current_duration(), Duration::from_millis(50));

        seq.reset(false);
        assert!(!seq.is_in_opening());
        assert_eq!(seq.current_frame_index(), 1);
    }

    #[test]
    fn test_multiple_transitions_in_order() {
        let mut seq = FrameTransitionSequence::new(
            vec![ft(0, 1, 1, 100), ft(2, 3, 1, 200)],
            None,
            4,
        )
        .unwrap();
        seq.advance();
        seq.advance();
        assert_eq!(seq.current_frame_index(), 2);
        assert_eq!(seq.current_duration(), Duration::from_millis(200));
        seq.advance();
        assert_eq!(seq.current_frame_index(), 3);
        assert!(!seq.advance());
        assert_eq!(seq.current_frame_index(), 0);
    }
}
