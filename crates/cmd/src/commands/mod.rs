pub mod demo;
pub mod init;
pub mod run;

pub use demo::demo_command;
pub use init::init_command;
pub use run::{RunOptions, dry_run, execute_script, run_command};
