pub mod lookup;
pub mod pipeline;
pub mod runner;
pub mod scan;
