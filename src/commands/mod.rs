pub mod list;
pub mod upgrade;
pub mod versions;
pub mod wait;
