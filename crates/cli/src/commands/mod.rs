pub mod chat;
pub mod fields;
pub mod onboard;
pub mod serve;
pub mod status;
