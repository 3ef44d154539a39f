pub mod announcements;
pub mod auth;
pub mod events;
pub mod forum;
pub mod gallery;
pub mod materials;
pub mod portfolio;
pub mod posts;
pub mod site;
pub mod surveys;
pub mod users;
pub mod votes;
