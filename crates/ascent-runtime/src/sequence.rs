//! Multi-tick terminal sequences.
//!
//! Each sequence is plain data advanced by the tick's `dt`.  It reports what
//! the state machine should do this tick and requests the level reload
//! exactly once.

/// What the fall sequence asks for on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallStep {
    /// Integrate gravity and move the body.
    Falling,
    /// Fall is over; wait before resetting.
    Holding,
    /// Reload the level now.
    Reload,
    Finished,
}

/// Gravity-only fall followed by a short hold, then a level reset.
#[derive(Debug, Clone, PartialEq)]
pub struct FallSequence {
    fall_duration: f32,
    hold_duration: f32,
    fall_elapsed: f32,
    hold_elapsed: f32,
    finished: bool,
}

impl FallSequence {
    pub fn new(fall_duration: f32, hold_duration: f32) -> Self {
        Self {
            fall_duration,
            hold_duration,
            fall_elapsed: 0.0,
            hold_elapsed: 0.0,
            finished: false,
        }
    }

    pub fn advance(&mut self, dt: f32) -> FallStep {
        if self.finished {
            return FallStep::Finished;
        }
        if self.fall_elapsed < self.fall_duration {
            self.fall_elapsed += dt;
            return FallStep::Falling;
        }
        self.hold_elapsed += dt;
        if self.hold_elapsed >= self.hold_duration {
            self.finished = true;
            FallStep::Reload
        } else {
            FallStep::Holding
        }
    }

    pub fn fall_elapsed(&self) -> f32 {
        self.fall_elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// What the celebration sequence asks for on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CelebrationStep {
    /// Before the celebrate trigger.
    Waiting,
    /// Fire the celebrate trigger now.
    Trigger,
    /// Counting down to the reset.
    Countdown { remaining: f32 },
    /// Reload the level now.
    Reload,
    Finished,
}

/// Short delay, the celebrate trigger, a countdown, then a level reset.
#[derive(Debug, Clone, PartialEq)]
pub struct CelebrationSequence {
    trigger_delay: f32,
    delay_elapsed: f32,
    triggered: bool,
    time_left: f32,
    finished: bool,
}

impl CelebrationSequence {
    pub fn new(trigger_delay: f32, duration: f32) -> Self {
        Self {
            trigger_delay,
            delay_elapsed: 0.0,
            triggered: false,
            time_left: duration,
            finished: false,
        }
    }

    pub fn advance(&mut self, dt: f32) -> CelebrationStep {
        if self.finished {
            return CelebrationStep::Finished;
        }
        if !self.triggered {
            self.delay_elapsed += dt;
            if self.delay_elapsed >= self.trigger_delay {
                self.triggered = true;
                return CelebrationStep::Trigger;
            }
            return CelebrationStep::Waiting;
        }
        self.time_left -= dt;
        if self.time_left <= 0.0 {
            self.finished = true;
            CelebrationStep::Reload
        } else {
            CelebrationStep::Countdown {
                remaining: self.time_left,
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
