//! Headless practice course for `/run`.
//!
//! A single climbable wall straight ahead of the spawn point with a summit
//! ledge above it.  Everything except the flow sensor is simulated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ascent_hal::camera::FixedHeading;
use ascent_hal::sensor::SensorStream;
use ascent_hal::sim::{RecordingAnimator, SimBody, SimLevel};
use ascent_perception::goal::SummitZone;
use ascent_perception::shape::Aabb;
use ascent_perception::zone::{ClimbZone, ZoneField, ZoneHandle};
use ascent_runtime::ascent_loop::{AscentLoop, TickReport};
use ascent_runtime::input::{InputSource, ManualInput};
use ascent_runtime::locomotion::LocomotionStateMachine;
use ascent_types::{ActorId, AscentError, LocomotionState, Vec3};
use tracing::info;

use crate::config::Config;

/// Height of the wall's top edge.
pub const WALL_HEIGHT: f32 = 6.0;

/// A wired course plus the handles needed to inspect it afterwards.
pub struct Course {
    pub ascent: AscentLoop,
    pub level: SimLevel,
    pub animator: RecordingAnimator,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_state: LocomotionState,
    pub level_reloads: usize,
    pub interrupted: bool,
    pub last_report: Option<TickReport>,
}

/// Build the course around `sensor`.
///
/// # Errors
///
/// Returns [`AscentError::Config`] when the sensor settings or the
/// locomotion tuning are invalid.
pub fn build(config: &Config, sensor: SensorStream) -> Result<Course, AscentError> {
    config.sensor.validate()?;
    let wall = ClimbZone::new(
        ZoneHandle(1),
        "practice wall",
        Aabb::new(Vec3::new(-2.0, 0.0, 1.0), Vec3::new(2.0, WALL_HEIGHT, 1.5)),
    );
    let summit = SummitZone::new(Aabb::new(
        Vec3::new(-1.0, WALL_HEIGHT, -1.0),
        Vec3::new(1.0, WALL_HEIGHT + 3.0, 1.0),
    ));

    let level = SimLevel::new();
    let animator = RecordingAnimator::new();
    let machine = LocomotionStateMachine::builder()
        .with_config(config.locomotion.clone())
        .with_actor(ActorId(config.actor))
        .with_body(SimBody::new("climber"))
        .with_camera(Box::new(FixedHeading(0.0)))
        .with_level(Box::new(level.clone()))
        .with_animator(Box::new(animator.clone()))
        .with_zones(Box::new(ZoneField::new().with_zone(wall)))
        .build()?;

    let ascent = AscentLoop::new(sensor, machine)
        .with_input(InputSource::new(config.keyboard_fallback))
        .with_goal(Box::new(summit));

    Ok(Course {
        ascent,
        level,
        animator,
    })
}

/// Run the course for up to `seconds` of simulated time.
///
/// Stops early once the level has been reloaded or `shutdown` is set.  With
/// `realtime` the loop sleeps between frames so a physical sensor keeps up.
/// `on_transition` is called with the report of every tick whose state
/// differs from the previous one.
pub fn run(
    course: &mut Course,
    config: &Config,
    seconds: f32,
    realtime: bool,
    shutdown: &AtomicBool,
    mut on_transition: impl FnMut(&TickReport),
) -> RunSummary {
    let dt = config.tick_dt();
    let frames = (seconds.max(0.0) / dt).ceil() as u64;
    let frame_time = Duration::from_secs_f32(dt);
    let script = ManualInput::forward();

    let mut previous = course.ascent.machine().state();
    let mut interrupted = false;
    info!(seconds, tick_hz = config.tick_hz, realtime, "course run started");

    for _ in 0..frames {
        if shutdown.load(Ordering::SeqCst) {
            interrupted = true;
            break;
        }
        let started = Instant::now();

        let report = course.ascent.tick(dt, &script);
        if report.state != previous {
            on_transition(&report);
            previous = report.state;
        }
        if course.level.reloads() > 0 {
            break;
        }

        if realtime && let Some(rest) = frame_time.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let summary = RunSummary {
        ticks: course.ascent.ticks(),
        final_state: course.ascent.machine().state(),
        level_reloads: course.level.reloads(),
        interrupted,
        last_report: course.ascent.last_report().copied(),
    };
    info!(
        ticks = summary.ticks,
        state = %summary.final_state,
        reloads = summary.level_reloads,
        "course run finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascent_hal::sensor::SensorConfig;
    use ascent_hal::sim::SimDevice;
    use ascent_types::AnimParam;

    fn offline_sensor() -> SensorStream {
        SensorStream::new(SensorConfig::default(), SimDevice::offline().connector())
    }

    #[test]
    fn scripted_run_reaches_summit_and_reloads() {
        let config = Config::default();
        let mut course = build(&config, offline_sensor()).unwrap();
        let mut transitions = Vec::new();

        let summary = run(&mut course, &config, 20.0, false, &AtomicBool::new(false), |r| {
            transitions.push(r.state)
        });

        assert_eq!(
            transitions,
            vec![LocomotionState::Climbing, LocomotionState::Celebrating]
        );
        assert_eq!(summary.final_state, LocomotionState::Celebrating);
        assert_eq!(summary.level_reloads, 1);
        assert!(!summary.interrupted);
        assert_eq!(course.animator.triggers(), vec![AnimParam::Celebrate]);
    }

    #[test]
    fn short_climb_limit_ends_in_a_fall() {
        let mut config = Config::default();
        config.locomotion.max_climb_duration = 1.0;
        let mut course = build(&config, offline_sensor()).unwrap();

        let summary = run(&mut course, &config, 20.0, false, &AtomicBool::new(false), |_| {});
        assert_eq!(summary.final_state, LocomotionState::Frozen);
        assert_eq!(summary.level_reloads, 1);
    }

    #[test]
    fn shutdown_flag_interrupts_run() {
        let config = Config::default();
        let mut course = build(&config, offline_sensor()).unwrap();

        let summary = run(&mut course, &config, 20.0, false, &AtomicBool::new(true), |_| {});
        assert!(summary.interrupted);
        assert_eq!(summary.ticks, 0);
        assert!(summary.last_report.is_none());
    }

    #[test]
    fn invalid_tuning_is_reported() {
        let mut config = Config::default();
        config.locomotion.terminal_velocity = 0.0;
        assert!(matches!(
            build(&config, offline_sensor()),
            Err(AscentError::Config(_))
        ));

        let mut config = Config::default();
        config.sensor.max_flow = config.sensor.min_flow;
        assert!(matches!(
            build(&config, offline_sensor()),
            Err(AscentError::Config(_))
        ));
    }
}
