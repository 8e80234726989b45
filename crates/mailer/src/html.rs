//! Plain-text to HTML derivation for the rich-text email part.
//!
//! Deliberately minimal markup so mail clients do not clip the message:
//! blank lines become visible block gaps, the first line of each block is
//! bolded as the show name, and the "Total sold" value is bolded.

pub fn render_html(body: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_block = false;

    for raw in body.lines() {
        let stripped = raw.trim();

        if stripped.is_empty() {
            out.push("<br>".to_string());
            in_block = false;
            continue;
        }

        // A block's first label-free line is its heading (show or section name).
        if !in_block && !stripped.contains(':') {
            out.push(format!("<strong>{}</strong><br>", escape(stripped)));
            in_block = true;
            continue;
        }

        if stripped.to_lowercase().starts_with("total sold:") {
            let (label, value) = stripped.split_once(':').unwrap_or((stripped, ""));
            out.push(format!("{}:<strong>{}</strong><br>", escape(label), escape(value)));
            continue;
        }

        out.push(format!("{}<br>", escape(stripped)));
    }

    format!(
        "<!doctype html>\n<html>\n  <body style=\"font-family: system-ui, -apple-system, \
         Segoe UI, Roboto, Arial, sans-serif;\">\n{}\n  </body>\n</html>\n",
        out.join("\n")
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
