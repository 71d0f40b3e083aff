pub mod emitter;
pub mod jumps;
pub mod machine;
pub mod program;
