pub fn render_invitation(accept_url: &str) -> String {
    format!(
        "<html><body style=\"font-family: sans-serif;\">\
         <h2>You have been invited to Paperflow</h2>\
         <p>An administrator invited you to the monthly document processing \
         workspace. Choose a password to activate your account:</p>\
         <p><a href=\"{accept_url}\">Accept invitation</a></p>\
         <p>The link is valid for 7 days. If you were not expecting this \
         invitation you can ignore this email.</p>\
         </body></html>"
    )
}

pub fn render_password_reset(reset_url: &str) -> String {
    format!(
        "<html><body style=\"font-family: sans-serif;\">\
         <h2>Password reset</h2>\
         <p>A password reset was requested for your Paperflow account. The \
         link below is valid for one hour:</p>\
         <p><a href=\"{reset_url}\">Reset password</a></p>\
         <p>If you did not request this, no action is needed.</p>\
         </body></html>"
    )
}
