use super::{Email, EmailError, TemplateData};

pub const PASSWORD_RESET: &str = "password_reset";
pub const EMAIL_VERIFY: &str = "email_verify";
pub const WELCOME: &str = "welcome";
pub const PASSWORD_CHANGED: &str = "password_changed";

pub struct Template {
    pub subject: &'static str,
    pub body: &'static str,
    pub html: &'static str,
}

const PASSWORD_RESET_TEMPLATE: Template = Template {
    subject: "Reset Your Password",
    body: "Hi {{Name}},\n\nUse the following link to reset your password: {{ResetURL}}\n\n\
           This link expires in {{ExpiresIn}}.\n\nIf you did not request a reset, you can ignore this email.",
    html: r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #3b82f6;">Reset Your Password</h2>
    <p>Hi {{Name}},</p>
    <p>Click the button below to choose a new password.</p>
    <p style="margin: 30px 0;">
      <a href="{{ResetURL}}" style="background-color: #3b82f6; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;">Reset Password</a>
    </p>
    <p style="color: #666; font-size: 14px;">This link expires in {{ExpiresIn}}.</p>
    <p style="color: #666; font-size: 14px;">If you did not request a reset, you can ignore this email.</p>
  </div>
</body>
</html>"#,
};

const EMAIL_VERIFY_TEMPLATE: Template = Template {
    subject: "Verify Your Email",
    body: "Use the following link to verify your email: {{VerifyURL}}\n\nThis link expires in {{ExpiresIn}}.",
    html: r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #3b82f6;">Verify Your Email</h2>
    <p style="margin: 30px 0;">
      <a href="{{VerifyURL}}" style="background-color: #3b82f6; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;">Verify Email</a>
    </p>
    <p style="color: #666; font-size: 14px;">This link expires in {{ExpiresIn}}.</p>
  </div>
</body>
</html>"#,
};

const WELCOME_TEMPLATE: Template = Template {
    subject: "Welcome to {{AppName}}!",
    body: "Welcome to {{AppName}}!\n\nYour account has been created.\n\nEmail: {{Email}}\n\nGet started: {{DashboardURL}}",
    html: r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #3b82f6;">Welcome to {{AppName}}!</h2>
    <p>Your account has been created.</p>
    <p><strong>Email:</strong> {{Email}}</p>
    <p style="margin: 30px 0;">
      <a href="{{DashboardURL}}" style="background-color: #3b82f6; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; display: inline-block;">Go to Dashboard</a>
    </p>
  </div>
</body>
</html>"#,
};

const PASSWORD_CHANGED_TEMPLATE: Template = Template {
    subject: "Your Password Was Changed",
    body: "Your password was changed.\n\nIf you did not make this change, contact support immediately.",
    html: r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #3b82f6;">Password Changed</h2>
    <p>Your password was changed.</p>
    <p style="color: #666; font-size: 14px;">If you did not make this change, contact support immediately.</p>
  </div>
</body>
</html>"#,
};

pub fn lookup(name: &str) -> Option<&'static Template> {
    match name {
        PASSWORD_RESET => Some(&PASSWORD_RESET_TEMPLATE),
        EMAIL_VERIFY => Some(&EMAIL_VERIFY_TEMPLATE),
        WELCOME => Some(&WELCOME_TEMPLATE),
        PASSWORD_CHANGED => Some(&PASSWORD_CHANGED_TEMPLATE),
        _ => None,
    }
}

/// Builds a ready-to-send message from a named template.
pub fn render(name: &str, to: &[String], data: &TemplateData) -> Result<Email, EmailError> {
    let template = lookup(name).ok_or_else(|| EmailError::UnknownTemplate(name.to_string()))?;

    Ok(Email {
        to: to.to_vec(),
        subject: substitute(template.subject, data, false),
        body: substitute(template.body, data, false),
        html_body: Some(substitute(template.html, data, true)),
        reply_to: None,
    })
}

/// Replaces each `{{Key}}` with its value. Unknown keys render as empty strings.
pub fn substitute(source: &str, data: &TemplateData, escape: bool) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = data.get(key) {
                    if escape {
                        // Values land in text and in double-quoted href attributes.
                        out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    } else {
                        out.push_str(value);
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
