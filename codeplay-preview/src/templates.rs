//! Starter templates offered when creating or resetting a playground.

use crate::snapshot::CodeSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub html: &'static str,
    pub css: &'static str,
    pub js: &'static str,
}

impl Template {
    pub fn to_snapshot(&self) -> CodeSnapshot {
        CodeSnapshot::new(self.html, self.css, self.js)
    }

    /// Case-insensitive lookup by template name.
    pub fn find(name: &str) -> Option<(usize, &'static Template)> {
        TEMPLATES
            .iter()
            .enumerate()
            .find(|(_, t)| t.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Index into [`TEMPLATES`] used for a fresh playground.
pub const DEFAULT_TEMPLATE: usize = 1;

pub const TEMPLATES: &[Template] = &[
    Template {
        name: "Blank",
        html: "",
        css: "",
        js: "",
    },
    Template {
        name: "Hello World",
        html: "<h1>Hello, World!</h1>\n<p>Start editing to see your changes live.</p>",
        css: "body {
  display: flex;
  flex-direction: column;
  align-items: center;
  justify-content: center;
  min-height: 100vh;
  margin: 0;
  font-family: sans-serif;
  background: #0f172a;
  color: #e2e8f0;
}

h1 {
  color: #818cf8;
}",
        js: "console.log(\"Hello from Code Playground!\");",
    },
    Template {
        name: "CSS Animation",
        html: "<div class=\"box\"></div>",
        css: "body {
  display: flex;
  align-items: center;
  justify-content: center;
  min-height: 100vh;
  margin: 0;
  background: #0f172a;
}

.box {
  width: 80px;
  height: 80px;
  background: linear-gradient(135deg, #6366f1, #ec4899);
  border-radius: 16px;
  animation: spin 2s ease-in-out infinite;
}

@keyframes spin {
  0%   { transform: rotate(0deg) scale(1); }
  50%  { transform: rotate(180deg) scale(1.3); }
  100% { transform: rotate(360deg) scale(1); }
}",
        js: "",
    },
    Template {
        name: "Fetch API Demo",
        html: "<h2>Random User</h2>\n<div id=\"user\">Loading...</div>",
        css: "body {
  font-family: sans-serif;
  padding: 2rem;
  background: #0f172a;
  color: #e2e8f0;
}

#user {
  margin-top: 1rem;
  padding: 1rem;
  background: #1e293b;
  border-radius: 8px;
}",
        js: r#"fetch("https://randomuser.me/api/")
  .then(res => res.json())
  .then(data => {
    const u = data.results[0];
    document.getElementById("user").innerHTML = `
      <img src="${u.picture.medium}" style="border-radius:50%"/>
      <p><strong>${u.name.first} ${u.name.last}</strong></p>
      <p>${u.email}</p>
    `;
  })
  .catch(err => {
    document.getElementById("user").textContent = "Error: " + err.message;
  });"#,
    },
    Template {
        name: "Canvas Drawing",
        html: "<canvas id=\"canvas\" width=\"400\" height=\"400\"></canvas>",
        css: "body {
  display: flex;
  align-items: center;
  justify-content: center;
  min-height: 100vh;
  margin: 0;
  background: #0f172a;
}

canvas {
  border: 2px solid #334155;
  border-radius: 8px;
}",
        js: r#"const canvas = document.getElementById("canvas");
const ctx = canvas.getContext("2d");

for (let i = 0; i < 50; i++) {
  ctx.beginPath();
  const x = Math.random() * 400;
  const y = Math.random() * 400;
  const r = Math.random() * 30 + 5;
  ctx.arc(x, y, r, 0, Math.PI * 2);
  ctx.fillStyle = `hsla(${Math.random() * 360}, 70%, 60%, 0.6)`;
  ctx.fill();
}"#,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_template_is_empty() {
        assert!(TEMPLATES[0].to_snapshot().is_empty());
    }

    #[test]
    fn find_ignores_case() {
        let (index, t) = Template::find("canvas drawing").unwrap();
        assert_eq!(index, 4);
        assert_eq!(t.name, "Canvas Drawing");
        assert!(Template::find("React").is_none());
    }
}
