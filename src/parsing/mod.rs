//! Ad hoc text parsing of model responses and generated code.

pub mod code;
pub mod imports;
pub mod subtasks;
