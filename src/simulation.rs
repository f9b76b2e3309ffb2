//! Fixed-timestep simulation loop with pause, single-stepping and undo.
//!
//! The host calls [`Simulation::tick`] once per frame with the elapsed wall
//! time. Elapsed time accumulates (clamped to `max_frame_time`) and is spent
//! in whole fixed steps while the loop runs. Every fixed step is recorded in
//! the [`History`] ring so it can be undone one step at a time.

use nalgebra::Vector3;

use crate::body::{BodyId, RigidBody};
use crate::config::SimulationConfig;
use crate::error::PhysicsError;
use crate::history::{History, Snapshot, DEFAULT_HISTORY_CAPACITY};
use crate::world::PhysicsWorld;

/// What the loop does on its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Steps as long as accumulated time allows.
    Running,
    /// Accumulates time but does not step.
    Paused,
    /// Runs exactly one fixed step once enough time has accumulated, then
    /// pauses.
    SteppingForward,
    /// Restores the previous history entry on the next tick, then pauses.
    SteppingBackward,
    /// Terminal; ticks do nothing.
    Stopped,
}

/// A world driven by a fixed-step accumulator, with undo history.
#[derive(Debug, Clone)]
pub struct Simulation<const N: usize, const CAP: usize = DEFAULT_HISTORY_CAPACITY> {
    world: PhysicsWorld<N>,
    history: History<N, CAP>,
    initial: Snapshot<N>,
    state: LoopState,
    accumulator: f32,
    config: SimulationConfig,
    steps: u32,
}

impl<const N: usize, const CAP: usize> Default for Simulation<N, CAP> {
    fn default() -> Self {
        Self::from_parts(PhysicsWorld::new(), SimulationConfig::default())
    }
}

impl<const N: usize, const CAP: usize> Simulation<N, CAP> {
    /// Create an empty, paused simulation.
    pub fn new(config: SimulationConfig) -> Result<Self, PhysicsError> {
        let world = PhysicsWorld::with_config(&config)?;
        Ok(Self::from_parts(world, config))
    }

    /// Take over a populated world; its current state becomes the initial
    /// snapshot that [`Simulation::reset`] returns to.
    pub fn with_world(world: PhysicsWorld<N>, config: SimulationConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self::from_parts(world, config))
    }

    fn from_parts(world: PhysicsWorld<N>, config: SimulationConfig) -> Self {
        let initial = world.snapshot();
        let mut history = History::new();
        history.push(initial.clone());
        Self {
            world,
            history,
            initial,
            state: LoopState::Paused,
            accumulator: 0.0,
            config,
            steps: 0,
        }
    }

    // -- Accessors --

    pub fn world(&self) -> &PhysicsWorld<N> {
        &self.world
    }

    /// Direct access to the world, e.g. to edit a body between frames.
    ///
    /// Edits are not recorded in history until the next fixed step.
    pub fn world_mut(&mut self) -> &mut PhysicsWorld<N> {
        &mut self.world
    }

    pub fn history(&self) -> &History<N, CAP> {
        &self.history
    }

    pub fn initial_snapshot(&self) -> &Snapshot<N> {
        &self.initial
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Fixed steps run since creation or the last reset.
    #[inline]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.state == LoopState::Stopped
    }

    /// Paused, including a pending one-shot step in either direction.
    #[inline]
    pub fn is_paused(&self) -> bool {
        matches!(
            self.state,
            LoopState::Paused | LoopState::SteppingForward | LoopState::SteppingBackward
        )
    }

    // -- Scene --

    /// Add a body to the world and to the initial snapshot.
    ///
    /// Before the first fixed step the history seed is rebuilt so undo can
    /// return to a scene that includes the new body.
    pub fn add_body(&mut self, body: RigidBody) -> Result<BodyId, PhysicsError> {
        let id = self.world.add_body(body)?;
        if let Some(body) = self.world.body(id) {
            // the initial snapshot has the same capacity as the world
            let _ = self.initial.push(body.state());
        }
        if self.steps == 0 {
            self.reseed_history();
        }
        Ok(id)
    }

    /// Queue the picking torque on a body; it is applied on the next step.
    pub fn apply_torque_at(
        &mut self,
        id: BodyId,
        point: Vector3<f32>,
        direction: Vector3<f32>,
    ) -> Result<(), PhysicsError> {
        self.world.apply_torque_at(id, point, direction)
    }

    fn reseed_history(&mut self) {
        self.history.clear();
        self.history.push(self.initial.clone());
    }

    fn set_state(&mut self, state: LoopState) {
        if self.state != state {
            log::debug!("simulation {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    // -- Controls --

    /// Toggle between running and paused.
    ///
    /// Resuming clears the history: undo only reaches back to the last resume.
    pub fn pause_play(&mut self) {
        match self.state {
            LoopState::Stopped => {}
            LoopState::Running => self.set_state(LoopState::Paused),
            _ => {
                self.history.clear();
                self.set_state(LoopState::Running);
            }
        }
    }

    /// Pause and run exactly one fixed step on a later tick.
    pub fn step_forward(&mut self) {
        if !self.is_stopped() {
            self.set_state(LoopState::SteppingForward);
        }
    }

    /// Pause and undo one step on the next tick.
    pub fn step_backward(&mut self) {
        if !self.is_stopped() {
            self.set_state(LoopState::SteppingBackward);
        }
    }

    /// Return every body to the initial snapshot and pause.
    pub fn reset(&mut self) {
        if self.is_stopped() {
            return;
        }
        self.world.restore(&self.initial);
        self.accumulator = 0.0;
        self.steps = 0;
        self.reseed_history();
        self.set_state(LoopState::Paused);
        log::debug!("simulation reset to initial snapshot");
    }

    /// Stop for good.
    pub fn quit(&mut self) {
        self.set_state(LoopState::Stopped);
    }

    /// Undo one step immediately. Returns `false` when history is exhausted,
    /// leaving the world unchanged.
    fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                self.world.restore(snapshot);
                true
            }
            None => {
                log::debug!("nothing to undo");
                false
            }
        }
    }

    /// Advance by `elapsed` seconds of wall time and return the number of
    /// fixed steps run.
    pub fn tick(&mut self, elapsed: f32) -> u32 {
        if self.is_stopped() {
            return 0;
        }

        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator = (self.accumulator + elapsed).min(self.config.max_frame_time);
        }

        let dt = self.config.fixed_timestep;
        let mut ran = 0;
        while self.accumulator >= dt && matches!(self.state, LoopState::Running | LoopState::SteppingForward) {
            self.world.step(dt);
            self.accumulator -= dt;
            self.history.push(self.world.snapshot());
            self.steps = self.steps.wrapping_add(1);
            ran += 1;

            if self.state == LoopState::SteppingForward {
                self.set_state(LoopState::Paused);
                break;
            }
        }

        if self.state == LoopState::SteppingBackward {
            self.undo();
            self.set_state(LoopState::Paused);
        }

        log::trace!("tick {}s: {} steps, {}s left over", elapsed, ran, self.accumulator);
        ran
    }
}
