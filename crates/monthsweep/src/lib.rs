//! Find files by the month they were last modified and delete everything up
//! to a cutoff month.

pub mod console;
pub mod coordinator;
pub mod deleter;
pub mod index;
pub mod logging;
pub mod pager;
pub mod planner;
pub mod scanner;
pub mod settings;
