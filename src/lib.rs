#![cfg_attr(not(test), no_std)]
//! `no_std` rigid-body physics for boxes and spheres.
//!
//! - [`shape`]: box and sphere geometry kept in world space.
//! - [`collision`]: narrow-phase tests producing [`Manifold`]s.
//! - [`resolve`]: impulse response with restitution, friction and position
//!   correction.
//! - [`world`]: a fixed-capacity body container stepping every body.
//! - [`simulation`]: a fixed-timestep loop with pause, single-step, undo and
//!   reset.
//! - [`launcher`]: a spring that launches bodies.
//!
//! # Example
//! ```
//! use embedded_3dphys::{RigidBody, Shape, Simulation, SimulationConfig};
//! use nalgebra::Vector3;
//!
//! let mut sim = Simulation::<8>::new(SimulationConfig::default()).unwrap();
//! let ground = RigidBody::new(Shape::cuboid(Vector3::new(5.0, 0.5, 5.0)))
//!     .with_position(Vector3::new(0.0, -0.5, 0.0))
//!     .with_kinematic(true);
//! sim.add_body(ground).unwrap();
//! let ball = sim
//!     .add_body(RigidBody::new(Shape::ball(0.5)).with_position(Vector3::new(0.0, 3.0, 0.0)))
//!     .unwrap();
//!
//! sim.pause_play();
//! for _ in 0..60 {
//!     sim.tick(1.0 / 60.0);
//! }
//! assert!(sim.world().body(ball).unwrap().position.y < 3.0);
//!
//! sim.reset();
//! assert_eq!(sim.world().body(ball).unwrap().position.y, 3.0);
//! ```

pub mod body;
pub mod collision;
pub mod config;
pub mod error;
pub mod history;
pub mod launcher;
pub mod pose;
pub mod resolve;
pub mod shape;
pub mod simulation;
pub mod world;

pub use body::{BodyId, RigidBody};
pub use collision::{CollisionData, Manifold, NarrowPhase};
pub use config::{BodyConfig, SimulationConfig};
pub use error::PhysicsError;
pub use history::{BodyState, History, Snapshot};
pub use launcher::SpringLauncher;
pub use pose::Pose;
pub use resolve::{ContactSolver, Resolution};
pub use shape::{Aabb, BoxShape, Shape, ShapeGeometry, ShapeKind, SphereShape};
pub use simulation::{LoopState, Simulation};
pub use world::PhysicsWorld;
