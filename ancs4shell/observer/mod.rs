pub mod ancs;
pub mod bridge;
pub mod discovery;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;
