//! Resource mappers: one method per catalog operation.
//!
//! Every operation is available in two forms. `build_*` / `parse_*` are pure
//! and let a host run the HTTP round trip itself; the composed methods
//! (`read`, `create`, ...) run it through the client's transport.

mod blueprint;
mod entity;

pub use blueprint::Blueprints;
pub use entity::Entities;
