//! Default HTML panel

use super::{PanelData, PanelRenderer};
use crate::query_log::QueryLogEntry;
use crate::stats::StatsFamily;
use dial_core::constants::{NOT_AVAILABLE, QUERY_CHARS_TRUNCATION_THRESHOLD};
use dial_core::{Error, Result};
use std::fmt::Write;

const STYLE: &str = r#"
#dial {
  all: initial;
  max-height: 50%;
  max-width: 50%;
  z-index: 9999;
  position: fixed;
  bottom: 0;
  right: 0;
  background-color: white;
  border-top-left-radius: 1rem;
  box-shadow: -0.2rem -0.2rem 0.4rem rgba(0, 0, 0, 0.5);
  display: flex;
  flex-direction: column;
  padding: 0.5rem;
  font-size: 0.85rem;
}
#dial #dial-preview { display: flex; flex-direction: column; cursor: pointer; }
#dial #dial-details { display: none; overflow-y: auto; }
#dial .section { display: flex; flex-direction: column; margin: 0.25rem 0 0 0; }
#dial .query-logs { padding-left: 0.75rem; }
#dial span { text-align: left; color: black; }
#dial a { color: blue; }
#dial hr { margin: 0.65rem 0 0 0; border-color: black; }
#dial details { margin: 0.5rem 0 0 0; text-align: left; }
#dial summary { margin: 0.25rem 0 0 0; cursor: pointer; color: black; }
#dial-hidden-indicator {
  all: initial;
  position: fixed;
  bottom: 0.5rem;
  right: 0.5rem;
  z-index: 9999;
  background-color: white;
  color: black;
  padding: 0.25rem 0.5rem;
  border-radius: 0.25rem;
  font-size: 0.75rem;
  cursor: pointer;
  display: none;
}
"#;

const SCRIPT: &str = r#"
(function () {
  var panel = document.getElementById("dial");
  var preview = document.getElementById("dial-preview");
  var details = document.getElementById("dial-details");
  var indicator = document.getElementById("dial-hidden-indicator");
  var keys = JSON.parse(panel.dataset.toggleKeys);
  var storageKey = "dial_panel_hidden";

  function isHidden() {
    try {
      var data = JSON.parse(localStorage.getItem(storageKey));
      if (!data) return false;
      if (new Date() > new Date(data.expiresAt)) {
        localStorage.removeItem(storageKey);
        return false;
      }
      return data.hidden;
    } catch (e) {
      localStorage.removeItem(storageKey);
      return false;
    }
  }

  function setHidden(hidden) {
    var expiresAt = new Date(Date.now() + 24 * 60 * 60 * 1000);
    localStorage.setItem(storageKey, JSON.stringify({ hidden: hidden, expiresAt: expiresAt.toISOString() }));
  }

  function toggle() {
    var hidden = panel.style.display === "none";
    panel.style.display = hidden ? "flex" : "none";
    indicator.style.display = hidden ? "none" : "block";
    setHidden(!hidden);
  }

  if (isHidden()) {
    panel.style.display = "none";
    indicator.style.display = "block";
  }

  preview.addEventListener("click", function () {
    var collapsed = ["", "none"].includes(details.style.display);
    details.style.display = collapsed ? "block" : "none";
  });

  indicator.addEventListener("click", toggle);

  document.addEventListener("click", function (event) {
    if (!preview.contains(event.target) && !details.contains(event.target)) {
      details.style.display = "none";
      details.querySelectorAll("details").forEach(function (d) { d.removeAttribute("open"); });
    }
  });

  document.addEventListener("keydown", function (event) {
    var key = keys[keys.length - 1].toLowerCase();
    var pressed = event.code.toLowerCase() === "key" + key || event.key.toLowerCase() === key;
    var modifiers = keys.slice(0, -1).every(function (m) {
      switch (m.toLowerCase()) {
        case "alt": return event.altKey;
        case "ctrl": return event.ctrlKey;
        case "shift": return event.shiftKey;
        case "meta": return event.metaKey;
        default: return true;
      }
    });
    if (pressed && modifiers) {
      event.preventDefault();
      toggle();
    }
  });
})();
"#;

/// Escape text for HTML element content and quoted attributes
///
/// # Examples
///
/// ```
/// use dial_middleware::panels::html_escape;
///
/// assert_eq!(html_escape("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn html_escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	out
}

/// Shorten a query to 100 characters followed by `...`
///
/// # Examples
///
/// ```
/// use dial_middleware::panels::truncate_query;
///
/// assert_eq!(truncate_query("SELECT 1"), "SELECT 1");
///
/// let long = "x".repeat(120);
/// assert_eq!(truncate_query(&long), format!("{}...", "x".repeat(100)));
/// ```
pub fn truncate_query(query: &str) -> String {
	match query.char_indices().nth(QUERY_CHARS_TRUNCATION_THRESHOLD) {
		Some((end, _)) => format!("{}...", &query[..end]),
		None => query.to_string(),
	}
}

/// Renders the panel as a fixed, collapsible block
///
/// All dynamic text is escaped. The toggle keys travel in a data attribute
/// so that the inline script itself is constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPanelRenderer;

impl HtmlPanelRenderer {
	fn preview(&self, out: &mut String, data: &PanelData) -> std::fmt::Result {
		writeln!(out, r#"<div id="dial-preview">"#)?;
		writeln!(
			out,
			r#"<span id="dial-preview-header"><b>View:</b> {} | <b>Action:</b> {} | <b>Request timing:</b> {}ms | <a href="{}" target="_blank">View profile</a></span>"#,
			html_escape(&data.route.view),
			html_escape(&data.route.action),
			data.request_timing_ms,
			html_escape(&data.viewer_url),
		)?;
		for (name, value) in &data.environment {
			writeln!(
				out,
				r#"<span class="dial-preview-fact"><b>{}:</b> {}</span>"#,
				html_escape(name),
				html_escape(value)
			)?;
		}
		writeln!(out, "</div>")
	}

	fn query_logs(&self, out: &mut String, entries: &[QueryLogEntry]) -> std::fmt::Result {
		if entries.is_empty() {
			return writeln!(out, "<span>{}</span>", NOT_AVAILABLE);
		}

		for entry in entries {
			let summary = entry.queries.first().map(String::as_str).unwrap_or_default();
			writeln!(out, "<details>")?;
			writeln!(out, "<summary>{}</summary>", html_escape(&truncate_query(summary)))?;
			writeln!(out, r#"<div class="section query-logs">"#)?;
			for line in entry.queries.iter().chain(&entry.call_stack) {
				writeln!(out, "<span>{}</span>", html_escape(line))?;
			}
			writeln!(out, "</div>")?;
			writeln!(out, "</details>")?;
		}
		Ok(())
	}

	fn server_timing(&self, out: &mut String, data: &PanelData) -> std::fmt::Result {
		if data.server_timing.is_empty() {
			return writeln!(out, "<span>{}</span>", NOT_AVAILABLE);
		}
		for timing in &data.server_timing {
			writeln!(
				out,
				"<span><b>{}:</b> {}</span>",
				html_escape(&timing.event),
				timing.duration_ms
			)?;
		}
		Ok(())
	}

	fn stats(&self, out: &mut String, family: &StatsFamily) -> std::fmt::Result {
		let id = html_escape(&family.name);
		writeln!(out, "<hr>")?;
		writeln!(out, r#"<details id="dial-details-{}-stats">"#, id)?;
		writeln!(out, "<summary>{} stats</summary>", id)?;
		writeln!(out, r#"<div class="section">"#)?;
		if family.values.is_empty() {
			writeln!(out, "<span>{}</span>", NOT_AVAILABLE)?;
		}
		for (key, value) in &family.values {
			writeln!(out, "<span><b>{}:</b> {}</span>", html_escape(key), value)?;
		}
		writeln!(out, "</div>")?;
		writeln!(out, "</details>")
	}

	fn write_panel(&self, out: &mut String, data: &PanelData) -> Result<()> {
		let toggle_keys = serde_json::to_string(&data.toggle_shortcut_keys)
			.map_err(|e| Error::Internal(format!("Failed to encode toggle keys: {}", e)))?;

		let write = |out: &mut String| -> std::fmt::Result {
			writeln!(out, "<style>{}</style>", STYLE)?;
			writeln!(
				out,
				r#"<div id="dial" data-toggle-keys="{}">"#,
				html_escape(&toggle_keys)
			)?;
			self.preview(out, data)?;
			writeln!(out, "<hr>")?;
			writeln!(out, r#"<div id="dial-details">"#)?;

			writeln!(out, r#"<details id="dial-details-n-plus-ones">"#)?;
			writeln!(out, "<summary>N+1s</summary>")?;
			writeln!(out, r#"<div class="section query-logs">"#)?;
			self.query_logs(out, &data.query_logs)?;
			writeln!(out, "</div>")?;
			writeln!(out, "</details>")?;

			writeln!(out, "<hr>")?;
			writeln!(out, r#"<details id="dial-details-server-timing">"#)?;
			writeln!(out, "<summary>Server timing</summary>")?;
			writeln!(out, r#"<div class="section">"#)?;
			self.server_timing(out, data)?;
			writeln!(out, "</div>")?;
			writeln!(out, "</details>")?;

			for family in &data.stats {
				self.stats(out, family)?;
			}

			writeln!(out, "</div>")?;
			writeln!(out, "</div>")?;
			writeln!(out, r#"<div id="dial-hidden-indicator">Dial</div>"#)?;
			writeln!(
				out,
				r#"<script nonce="{}">{}</script>"#,
				html_escape(&data.nonce),
				SCRIPT
			)
		};

		write(out).map_err(|e| Error::Internal(format!("Failed to render panel: {}", e)))
	}
}

impl PanelRenderer for HtmlPanelRenderer {
	fn render(&self, data: &PanelData) -> Result<String> {
		let mut out = String::new();
		self.write_panel(&mut out, data)?;
		Ok(out)
	}
}
