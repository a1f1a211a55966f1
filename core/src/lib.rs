pub mod accrual;
pub mod alliance;
pub mod bank;
pub mod black_market;
pub mod clock;
pub mod combat;
pub mod command;
pub mod config;
pub mod diplomacy;
pub mod economy;
pub mod empire;
pub mod engine;
pub mod error;
pub mod espionage;
pub mod event;
pub mod name_generator;
pub mod progression;
pub mod ranking;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod training;
pub mod types;
