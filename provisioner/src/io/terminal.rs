//! Operator-facing terminal output.

use crate::core::plan::Stage;

/// Print the banner for a stage that is about to run.
pub fn stage(stage: Stage) {
    println!("==> [{stage}] {}", stage.banner());
}

pub fn info(message: &str) {
    println!("    {message}");
}

pub fn warn(message: &str) {
    eprintln!("warning: {message}");
}

pub fn error(message: &str) {
    eprintln!("error: {message}");
}
