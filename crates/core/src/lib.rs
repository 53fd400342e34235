pub mod buffs;
pub mod cache;
pub mod combat;
pub mod death;
pub mod detector;
pub mod logger;
pub mod nameplate;
pub mod orchestrator;
pub mod platform;
pub mod screenshot;
pub mod settings;
pub mod sleep;
pub mod stuck;
pub mod types;
pub mod vision;
