use catalog::project::{Category, Project};
use foundation::geo::LatLng;

use crate::style::marker_style;

/// Everything shown when a marker is clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDetail {
    pub title: String,
    pub icon: &'static str,
    pub category: Category,
    pub position: LatLng,
    /// Canonical fields first, then the project's extra fields in source order.
    pub rows: Vec<(String, String)>,
}

impl ProjectDetail {
    pub fn from_project(project: &Project) -> Self {
        let mut rows = vec![
            ("Daerah".to_string(), project.district.clone()),
            ("DUN".to_string(), project.dun.clone()),
            ("Parliament".to_string(), project.parliament.clone()),
            ("Status".to_string(), project.status.clone()),
            (
                "Koordinat".to_string(),
                format!("{}, {}", project.position.lat, project.position.lng),
            ),
        ];
        rows.extend(project.extra_fields.iter().cloned());
        Self {
            title: project.site_name.clone(),
            icon: marker_style(project.category).icon,
            category: project.category,
            position: project.position,
            rows,
        }
    }

    /// Popup markup for hosts that render HTML. All text is escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<div class=\"info-popup\">");
        out.push_str(&format!(
            "<div class=\"info-title\">{} {}</div>",
            self.icon,
            escape_html(&self.title)
        ));
        for (label, value) in &self.rows {
            out.push_str(&format!(
                "<div class=\"info-row\"><div class=\"info-label\">{}:</div><div class=\"info-value\">{}</div></div>",
                escape_html(label),
                escape_html(value)
            ));
        }
        out.push_str("</div>");
        out
    }
}

/// Escapes `&`, `<`, `>` and `"`.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
