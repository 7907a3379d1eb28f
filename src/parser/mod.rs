pub mod columns;
pub mod functions;
pub mod tables;
