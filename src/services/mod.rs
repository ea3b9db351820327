pub mod capture;
pub mod delivery;
pub mod dispatcher;
pub mod messages;
pub mod runner;
