pub mod builtins;
pub mod control;
pub mod executor;
pub mod expand;
pub mod glob;
pub mod host;
pub mod options;
pub mod state;

#[cfg(test)]
pub mod test_support;
