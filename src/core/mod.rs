// Core modules: case discovery, the native solver boundary, and the run loop.
pub mod cases;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod isolate;
pub mod report;
