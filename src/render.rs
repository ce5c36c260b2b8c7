/// HTML rendering of the registry state
use std::fmt::Write;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::SensorReading;

/// Id of the element the sensor cards are rendered into.
pub const CONTAINER_ID: &str = "sensor-container";

/// Format a timestamp for display
///
/// Converts an ISO-8601 timestamp to DD.MM.YYYY - HH:MM:SS format, shown in
/// the timestamp's own offset rather than local time.
/// Falls back to the raw string if it does not parse.
pub fn format_datetime(raw: &str) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| raw.to_string())
}

/// Rebuild the whole sensor container from the current readings.
pub fn render_container(readings: &[SensorReading]) -> String {
    let mut html = format!(
        "<div id=\"{}\" class=\"columns is-multiline\">\n",
        CONTAINER_ID
    );
    for reading in readings {
        html.push_str(&render_card(reading));
    }
    html.push_str("</div>\n");
    html
}

fn render_card(reading: &SensorReading) -> String {
    let mut card = String::new();
    let id = reading.id();
    let updated_at = escape_html(reading.updated_at());

    // Writing to a String cannot fail
    let _ = write!(
        card,
        r#"<div class="column is-one-third">
  <div class="card">
    <header class="card-header">
      <p class="card-header-title">Sensor ID: {id}</p>
    </header>
    <div class="card-content">
      <div class="content">
        <p><strong>Type:</strong> {sensor_type}</p>
        <p><strong>Value:</strong> {value} {unit}</p>
      </div>
      <time datetime="{updated_at}">Last updated: {display_time}</time>
    </div>
    <footer class="card-footer">
      <form class="card-footer-item" method="post" action="/sensors/{id}/update">
        <button type="submit" class="button is-link is-light update-button" data-id="{id}">Update</button>
      </form>
    </footer>
  </div>
</div>
"#,
        id = id,
        sensor_type = reading.sensor_type(),
        value = escape_html(&reading.value().to_string()),
        unit = escape_html(reading.unit()),
        updated_at = updated_at,
        display_time = escape_html(&format_datetime(reading.updated_at())),
    );
    card
}

/// Full dashboard page around an already rendered container.
pub fn render_page(container: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Sensor monitor</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bulma@0.9.4/css/bulma.min.css">
</head>
<body>
  <section class="section">
    <div class="container">
      <h1 class="title">Sensor monitor</h1>
{container}    </div>
  </section>
</body>
</html>
"#,
        container = container
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
