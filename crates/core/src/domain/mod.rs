pub mod answer;
pub mod job;
pub mod outcome;
pub mod question;
