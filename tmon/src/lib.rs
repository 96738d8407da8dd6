pub mod invoker;
pub mod monitor;
