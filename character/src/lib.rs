pub mod character;
pub mod combat;
pub mod config;
pub mod input;
pub mod math;
pub mod motor;
pub mod settings;
pub mod state;

pub use character::PlayerCharacter;
pub use combat::{CombatContext, NullCombat, RayHit, TargetId};
pub use config::CharacterConfig;
pub use input::{CharacterInput, CrouchInput};
pub use motor::{
    CapsuleDims, CharacterController, CollisionMask, GroundingReport, Motor, step,
    scene::{CombatTarget, SceneCollider, SceneMotor, StaticShape},
};
pub use state::{CharacterState, Stance};
