//! Sublaunch SLiM simulations from Rust.
//!
//! A run is a single encode → launch → decode sequence: parameters are written
//! to a uniquely named temp file, the simulator is started with definitions
//! pointing at it, and whatever the simulation writes to its output file is
//! parsed back into a [`ResultSet`].

pub mod codec;
pub mod config;
pub mod eidos;
pub mod error;
pub mod invocation;
pub mod model;
pub mod params;
pub mod runner;
pub mod sublaunch;
pub mod template;
pub mod value;

pub use config::WrapperConfig;
pub use error::{Result, Stage, WrapError};
pub use invocation::{build_invocation, Invocation};
pub use model::{Model, RunOptions, RunOutcome};
pub use params::{ParameterSet, ResultSet};
pub use runner::ProcessOutput;
pub use sublaunch::sublaunch;
pub use template::Template;
pub use value::{Array, Kind, Matrix, Value};
