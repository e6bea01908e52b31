//! HTML pages served to browsers.

use std::net::IpAddr;

use crate::pastes::Paste;

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
textarea{width:100%;min-height:16rem;font-family:monospace}\
pre{white-space:pre-wrap;word-break:break-word;background:#f4f4f4;padding:1rem}\
.qr svg{max-width:240px;height:auto}";

/// Escapes text for use in element content and quoted attributes.
pub fn html_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        html_escape(title)
    )
}

/// Wraps paste text, collapsed behind a disclosure for private pastes.
fn paste_block(paste: &Paste) -> String {
    let text = format!("<pre id=\"content\">{}</pre>", html_escape(&paste.text));
    if paste.private {
        format!("<details><summary>Private content, click to reveal</summary>{text}</details>")
    } else {
        text
    }
}

/// Paste form.
pub fn home_page(server_ip: IpAddr) -> String {
    let body = format!(
        "<h1>Pastebin</h1>\n<p>Serving on {}</p>\n\
         <form method=\"post\" action=\"/save\">\n\
         <textarea name=\"content\" autofocus></textarea>\n\
         <p><label>Visibility <select name=\"private\">\
         <option value=\"false\">Public</option>\
         <option value=\"true\">Private</option></select></label></p>\n\
         <button type=\"submit\">Save</button>\n</form>",
        html_escape(&server_ip.to_string())
    );
    layout("Pastebin", &body)
}

/// Confirmation page with the paste link and its QR code.
///
/// `qr_svg` is trusted markup produced by the QR renderer.
pub fn saved_page(paste: &Paste, content_url: &str, qr_svg: &str, home: &str) -> String {
    let url = html_escape(content_url);
    let body = format!(
        "<h1>Saved</h1>\n<p><a href=\"{url}\">{url}</a></p>\n\
         <div class=\"qr\">{qr_svg}</div>\n{}\n<p><a href=\"{}\">New paste</a></p>",
        paste_block(paste),
        html_escape(home)
    );
    layout("Pastebin - saved", &body)
}

/// Viewer that fetches the paste named by the URL fragment.
pub fn view_page(home: &str) -> String {
    let body = format!(
        "<h1>Paste</h1>\n<div id=\"paste\">Loading...</div>\n\
         <p><a href=\"{}\">New paste</a></p>\n{VIEW_SCRIPT}",
        html_escape(home)
    );
    layout("Pastebin - view", &body)
}

const VIEW_SCRIPT: &str = r#"<script>
(async () => {
  const target = document.getElementById("paste");
  const key = window.location.hash.slice(1);
  const response = await fetch("/getContent", {
    method: "POST",
    body: new URLSearchParams({ contentKey: key }),
  });
  if (!response.ok) {
    target.textContent = "Content not found";
    return;
  }
  const data = await response.json();
  const pre = document.createElement("pre");
  pre.id = "content";
  pre.textContent = data.text;
  if (data.private) {
    const details = document.createElement("details");
    const summary = document.createElement("summary");
    summary.textContent = "Private content, click to reveal";
    details.append(summary, pre);
    target.replaceChildren(details);
  } else {
    target.replaceChildren(pre);
  }
})();
</script>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("plain", "plain" ; "untouched")]
    #[test_case("<b>&</b>", "&lt;b&gt;&amp;&lt;/b&gt;" ; "markup")]
    #[test_case(r#"a "b" 'c'"#, "a &quot;b&quot; &#39;c&#39;" ; "quotes")]
    fn escapes(input: &str, expected: &str) {
        assert_eq!(html_escape(input), expected);
    }

    #[test]
    fn home_posts_to_save() {
        let page = home_page("192.168.1.10".parse().unwrap());
        assert!(page.contains("action=\"/save\""));
        assert!(page.contains("name=\"content\""));
        assert!(page.contains("Serving on 192.168.1.10"));
    }

    #[test]
    fn saved_page_escapes_paste_text() {
        let paste = Paste {
            text: "<script>alert(1)</script>".into(),
            private: false,
        };
        let page = saved_page(&paste, "https://10.0.0.5:8443/c#abcd", "<svg></svg>", "/");
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("<svg></svg>"));
        assert!(!page.contains("<details>"));
    }

    #[test]
    fn private_paste_is_collapsed() {
        let paste = Paste {
            text: "secret".into(),
            private: true,
        };
        let page = saved_page(&paste, "https://10.0.0.5:8443/c#abcd", "", "/");
        assert!(page.contains("<details><summary>"));
    }

    #[test]
    fn view_page_links_home_and_fetches_content() {
        let page = view_page("https://localhost:8443/");
        assert!(page.contains("href=\"https://localhost:8443/\""));
        assert!(page.contains("fetch(\"/getContent\""));
    }
}
