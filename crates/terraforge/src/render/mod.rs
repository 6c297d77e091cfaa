pub mod invoker;

pub use invoker::{BlenderInvoker, RenderInvoker, RenderOutput, ScriptKind, MAX_OUTPUT_BYTES};
