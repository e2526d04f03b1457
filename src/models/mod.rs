mod company;
mod invitation_token;
mod password_reset_token;
mod processed_file;
mod refresh_token;
mod user;

pub use company::Company;
pub use invitation_token::InvitationToken;
pub use password_reset_token::PasswordResetToken;
pub use processed_file::{HistoryRecord, STATUS_ERROR, STATUS_SUCCESS};
pub use refresh_token::RefreshToken;
pub use user::{User, ROLE_ADMIN, ROLE_USER, valid_role};
