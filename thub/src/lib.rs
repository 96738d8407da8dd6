pub mod reaper;
pub mod repl;
pub mod score;
pub mod supervisor;
