pub mod run;
pub mod sandboxes;
