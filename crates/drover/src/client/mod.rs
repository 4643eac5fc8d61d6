pub mod capability;
pub mod monitor;
pub mod stager;
pub mod submit;
