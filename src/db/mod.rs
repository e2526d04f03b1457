pub mod audit;
pub mod companies;
pub mod history;
pub mod invitation_tokens;
pub mod password_reset_tokens;
pub mod refresh_tokens;
pub mod users;
