//! Named animation parameters and the sink they are written to.
//!
//! The locomotion core keeps an [`AnimationSignals`] block, updates it while
//! it ticks, and flushes it to an [`AnimationSink`] as the last step of every
//! tick.  Float and bool parameters are level-triggered and re-sent each
//! flush; triggers are edge-triggered and sent once.

use ascent_types::AnimParam;

/// Receiver of animation parameters, typically an animation rig.
pub trait AnimationSink: Send {
    fn set_float(&mut self, param: AnimParam, value: f32);

    fn set_bool(&mut self, param: AnimParam, value: bool);

    /// Fire a one-shot trigger.
    fn fire_trigger(&mut self, param: AnimParam);
}

/// Current values of every parameter the core drives.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSignals {
    pub speed: f32,
    pub motion_speed: f32,
    pub grounded: bool,
    pub jump: bool,
    pub free_fall: bool,
    pub climbing: bool,
    pending_triggers: Vec<AnimParam>,
}

impl Default for AnimationSignals {
    fn default() -> Self {
        Self {
            speed: 0.0,
            motion_speed: 0.0,
            grounded: true,
            jump: false,
            free_fall: false,
            climbing: false,
            pending_triggers: Vec::new(),
        }
    }
}

impl AnimationSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `param` to fire on the next flush.
    pub fn trigger(&mut self, param: AnimParam) {
        if !self.pending_triggers.contains(&param) {
            self.pending_triggers.push(param);
        }
    }

    pub fn pending_triggers(&self) -> &[AnimParam] {
        &self.pending_triggers
    }

    /// Write every parameter to `sink` and drain the pending triggers.
    pub fn flush(&mut self, sink: &mut dyn AnimationSink) {
        sink.set_float(AnimParam::Speed, self.speed);
        sink.set_float(AnimParam::MotionSpeed, self.motion_speed);
        sink.set_bool(AnimParam::Grounded, self.grounded);
        sink.set_bool(AnimParam::Jump, self.jump);
        sink.set_bool(AnimParam::FreeFall, self.free_fall);
        sink.set_bool(AnimParam::Climbing, self.climbing);
        for param in self.pending_triggers.drain(..) {
            sink.fire_trigger(param);
        }
    }

    /// Drop pending triggers without sending them.
    pub fn discard_triggers(&mut self) {
        self.pending_triggers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockSink {
        floats: Vec<(AnimParam, f32)>,
        bools: Vec<(AnimParam, bool)>,
        triggers: Vec<AnimParam>,
    }

    impl AnimationSink for MockSink {
        fn set_float(&mut self, param: AnimParam, value: f32) {
            self.floats.push((param, value));
        }

        fn set_bool(&mut self, param: AnimParam, value: bool) {
            self.bools.push((param, value));
        }

        fn fire_trigger(&mut self, param: AnimParam) {
            self.triggers.push(param);
        }
    }

    #[test]
    fn flush_writes_all_levels() {
        let mut signals = AnimationSignals {
            speed: 1.5,
            climbing: true,
            ..AnimationSignals::default()
        };
        let mut sink = MockSink::default();
        signals.flush(&mut sink);
        assert!(sink.floats.contains(&(AnimParam::Speed, 1.5)));
        assert!(sink.bools.contains(&(AnimParam::Climbing, true)));
        assert!(sink.bools.contains(&(AnimParam::Grounded, true)));
        assert_eq!(sink.floats.len(), 2);
        assert_eq!(sink.bools.len(), 4);
    }

    #[test]
    fn triggers_fire_once() {
        let mut signals = AnimationSignals::new();
        signals.trigger(AnimParam::Celebrate);
        signals.trigger(AnimParam::Celebrate);
        let mut sink = MockSink::default();
        signals.flush(&mut sink);
        signals.flush(&mut sink);
        assert_eq!(sink.triggers, vec![AnimParam::Celebrate]);
    }
}
