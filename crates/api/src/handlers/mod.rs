pub mod catalog;
pub mod exams;
pub mod health;
pub mod submissions;
