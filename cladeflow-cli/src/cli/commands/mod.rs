pub mod autodetect;
pub mod run;
