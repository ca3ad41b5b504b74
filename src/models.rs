pub mod advice;
pub mod badges;
pub mod expenses;
pub mod gamification;
pub mod users;
