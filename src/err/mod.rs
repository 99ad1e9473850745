#[cfg(all(not(test), target_os = "none"))]
mod panic;
