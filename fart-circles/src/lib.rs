//! Renders the "circles" composite image: a main avatar surrounded by two
//! rings of counterparty avatars, sized by rank. The external contract
//! (inputs, output size, two orbits, fixed palette, watermark + date
//! overlay) is fixed; internal geometry is implementation-defined and
//! grounded in `original_source/backend/interactions/circles.py`.

pub mod geometry;
mod render;

pub use render::{render, CirclesError};
