//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes defining commands, parsing arguments, handling user interaction
//! (prompts, menus), and rendering listings.

mod commands;
mod interactive;
mod render;

pub use commands::*;
