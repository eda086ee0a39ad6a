//! Output printers. GLSL is the only target today; the module boundary
//! exists so a second target doesn't mean reshaping the resolver (spec.md
//! §4.6's "the printer is the only place that knows about GLSL").

pub mod glsl;

pub use glsl::print_glsl;
