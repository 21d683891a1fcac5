pub mod arch;
pub mod assemble;
pub mod binder;
pub mod class;
pub mod config;
pub mod error;
pub mod id;
pub mod param;
pub mod role;
pub mod sim;

#[cfg(test)]
mod test;
