//! Opinion-producer backends consumed by the judge stage.

pub mod llm;
