//! HTML login pages served to the browser under test.

/// Render the OAuth 1.0a login page: a single username field.
///
/// `action` is the absolute URL the form posts to and is HTML-escaped.
pub fn render_oauth1_login_page(action: &str) -> String {
    render_login_page(action, false)
}

/// Render the OAuth 2.0 login page: username and password fields.
pub fn render_oauth2_login_page(action: &str) -> String {
    render_login_page(action, true)
}

fn render_login_page(action: &str, with_password: bool) -> String {
    let password_html = if with_password {
        "\n  Password: <input type=\"password\" name=\"password\" size=\"15\" /><br />"
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN"
  "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Login here</title></head>
<body>
<h3>Login form</h3>
<form method="POST" action="{action_escaped}">
  Username: <input type="text" name="username" size="15" /><br />{password_html}
  <p><input type="submit" value="Login" /></p>
</form>
</body>
</html>
"#,
        action_escaped = html_escape(action),
        password_html = password_html,
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("xss")</script>"#),
            "&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_oauth1_page_has_username_only() {
        let html = render_oauth1_login_page("http://localhost:5121/login.html");
        assert!(html.contains(r#"action="http://localhost:5121/login.html""#));
        assert!(html.contains(r#"name="username""#));
        assert!(!html.contains(r#"name="password""#));
    }

    #[test]
    fn test_oauth2_page_has_password() {
        let html = render_oauth2_login_page("https://localhost:5120/login.html");
        assert!(html.contains(r#"action="https://localhost:5120/login.html""#));
        assert!(html.contains(r#"name="password""#));
    }

    #[test]
    fn test_action_is_escaped() {
        let html = render_oauth1_login_page("http://x/\"><b>");
        assert!(html.contains("http://x/&quot;&gt;&lt;b&gt;"));
    }
}
