//! slowPiano: a virtual piano with a scrolling piano roll
//!
//! Keys pressed on the [`keyboard`] travel over the [`bus`] to the
//! [`roll`], which tracks each press as a span and paints it as a beam
//! rising from the bottom of the roll.

pub mod bus;
pub mod canvas;
pub mod clock;
pub mod config;
pub mod error;
pub mod keyboard;
pub mod render;
pub mod roll;
pub mod tracker;

pub use bus::{NoteBus, NoteEvent};
pub use config::RollConfig;
pub use error::{Result, RollError};
pub use roll::PianoRoll;
