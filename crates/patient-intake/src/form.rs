//! The patient details form.
//!
//! One HTML template serves both the empty form and every re-render after a
//! submission. All interpolated text goes through [`escape_html`].

use crate::patient::{BloodGroup, Gender, PatientSubmission};

const STYLE: &str = r"
    * { box-sizing: border-box; }
    input[type=text], input[type=password], select, textarea {
      width: 100%; padding: 8px; border: 1px solid #ccc; border-radius: 4px; resize: vertical;
    }
    label { padding: 8px 8px 8px 0; display: inline-block; }
    input[type=submit] {
      background-color: #4CAF50; color: white; padding: 8px 20px;
      border: none; border-radius: 4px; cursor: pointer; float: right;
    }
    input[type=submit]:hover { background-color: #45a049; }
    .container { border-radius: 5px; background-color: #f2f2f2; padding: 10px; max-width: 720px; margin: auto; }
    .col-25 { float: left; width: 25%; margin-top: 6px; }
    .col-75 { float: left; width: 75%; margin-top: 6px; }
    .row:after { content: ''; display: table; clear: both; }
    .errors { color: #b00020; }
    .notice { color: #1b5e20; }
    @media screen and (max-width: 600px) {
      .col-25, .col-75, input[type=submit] { width: 100%; margin-top: 0; }
    }
";

/// Values echoed back into the form after a rejected submission.
///
/// Passwords are never echoed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    /// Patient identifier.
    pub patient_id: String,
    /// Patient name.
    pub patient_name: String,
    /// Age as typed.
    pub age: String,
    /// Selected blood group label.
    pub blood_group: String,
    /// Selected gender value.
    pub gender: String,
    /// Postal address.
    pub address: String,
}

impl From<&PatientSubmission> for FormValues {
    fn from(submission: &PatientSubmission) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            patient_id: text(&submission.patient_id),
            patient_name: text(&submission.patient_name),
            age: text(&submission.age),
            blood_group: text(&submission.blood_group),
            gender: text(&submission.gender),
            address: text(&submission.address),
        }
    }
}

/// Everything the template needs for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView<'a> {
    /// Where the form posts to.
    pub action: &'a str,
    /// Page heading.
    pub heading: &'a str,
    /// Messages shown above the form.
    pub errors: &'a [String],
    /// Success message shown above the form.
    pub notice: Option<&'a str>,
    /// Sticky field values.
    pub values: FormValues,
}

impl Default for FormView<'_> {
    fn default() -> Self {
        Self {
            action: "/details",
            heading: "PATIENT DETAILS",
            errors: &[],
            notice: None,
            values: FormValues::default(),
        }
    }
}

/// Escape text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn text_row(html: &mut String, name: &str, label: &str, input_type: &str, value: &str) {
    html.push_str(&format!(
        r#"      <div class="row">
        <div class="col-25"><label for="{name}">{label}</label></div>
        <div class="col-75"><input type="{input_type}" id="{name}" name="{name}" value="{value}"></div>
      </div>
"#,
        value = escape_html(value),
    ));
}

fn select_row<'o>(
    html: &mut String,
    name: &str,
    label: &str,
    options: impl Iterator<Item = (&'o str, &'o str)>,
    selected: &str,
) {
    html.push_str(&format!(
        r#"      <div class="row">
        <div class="col-25"><label for="{name}">{label}</label></div>
        <div class="col-75">
          <select id="{name}" name="{name}">
"#
    ));
    for (value, text) in options {
        let marker = if value.eq_ignore_ascii_case(selected.trim()) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            "            <option value=\"{}\"{marker}>{}</option>\n",
            escape_html(value),
            escape_html(text),
        ));
    }
    html.push_str("          </select>\n        </div>\n      </div>\n");
}

/// Render the patient details form.
#[must_use]
pub fn render_form(view: &FormView<'_>) -> String {
    let heading = escape_html(view.heading);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n  <title>{heading}</title>\n  <style>{STYLE}  </style>\n</head>\n<body>\n  <h2 style=\"text-align: center\">{heading}</h2>\n  <div class=\"container\">\n"
    );

    if let Some(notice) = view.notice {
        html.push_str(&format!(
            "    <p class=\"notice\">{}</p>\n",
            escape_html(notice)
        ));
    }
    if !view.errors.is_empty() {
        html.push_str("    <ul class=\"errors\">\n");
        for error in view.errors {
            html.push_str(&format!("      <li>{}</li>\n", escape_html(error)));
        }
        html.push_str("    </ul>\n");
    }

    html.push_str(&format!(
        "    <form action=\"{}\" method=\"POST\">\n",
        escape_html(view.action)
    ));

    let values = &view.values;
    text_row(&mut html, "patient_id", "PATIENT ID", "text", &values.patient_id);
    text_row(&mut html, "patient_name", "PATIENT NAME", "text", &values.patient_name);
    text_row(&mut html, "password", "PASSWORD", "password", "");
    text_row(&mut html, "password_confirmation", "REPEAT PASSWORD", "password", "");
    text_row(&mut html, "age", "AGE", "text", &values.age);
    select_row(
        &mut html,
        "blood_group",
        "BLOOD GROUP",
        BloodGroup::ALL.iter().map(|g| (g.label(), g.label())),
        &values.blood_group,
    );
    select_row(
        &mut html,
        "gender",
        "GENDER",
        Gender::ALL.iter().map(|g| (g.value(), g.label())),
        &values.gender,
    );

    html.push_str(&format!(
        r#"      <div class="row">
        <div class="col-25"><label for="address">ADDRESS</label></div>
        <div class="col-75"><textarea id="address" name="address" style="height:100px">{}</textarea></div>
      </div>
      <div class="row">
        <input type="submit" value="Submit">
      </div>
    </form>
  </div>
</body>
</html>
"#,
        escape_html(&values.address)
    ));

    html
}
