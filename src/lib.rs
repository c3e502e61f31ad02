/*!
2D soft-body mesh simulation for multiplayer arena game prototypes.

Point masses connected by Hookean springs or Neo-Hookean triangle elements,
advanced with sub-stepped symplectic Euler. The host application feeds
per-player input once per frame and reads the flat state arrays back for
rendering.
*/

mod platform;
mod simulation;

pub use simulation::*;

pub use platform::start;
