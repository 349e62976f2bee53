// Shared fixtures for integration tests against a mocked weather service
#![allow(dead_code)]

use std::path::Path;

use weather_history::config::Config;

pub const API_KEY: &str = "TESTKEY";

/// Config pointing both upstream services at `server_url` and writing into `output_dir`
pub fn test_config(server_url: &str, output_dir: &Path) -> Config {
    let mut config = Config::new(API_KEY);
    config.geolookup_url = server_url.to_string();
    config.history_url = server_url.to_string();
    config.output_dir = output_dir.to_path_buf();
    config
}

pub fn geolookup_path(location: &str) -> String {
    format!("/{API_KEY}/geolookup/q/{location}.json")
}

pub fn geolookup_body(icaos: &[&str]) -> String {
    let stations: Vec<serde_json::Value> = icaos
        .iter()
        .map(|icao| serde_json::json!({ "city": "Houston", "state": "TX", "icao": icao }))
        .collect();
    serde_json::json!({
        "response": { "version": "0.1" },
        "location": {
            "zip": "77007",
            "nearby_weather_stations": {
                "airport": { "station": stations }
            }
        }
    })
    .to_string()
}

/// History page with `rows` structured observation rows
pub fn history_page(rows: usize) -> String {
    let body: String = (0..rows)
        .map(|i| {
            format!(
                r#"<tr class="no-metars">
  <td>{hour}:53 AM</td>
  <td><span class="wx-data"><span class="wx-value">5{i}.0</span>&nbsp;&deg;F</span></td>
  <td>
 - 
</td>
  <td><span class="wx-data"><span class="wx-value">48.0</span>&nbsp;&deg;F</span></td>
  <td>71%</td>
  <td><span class="wx-data"><span class="wx-value">30.21</span>&nbsp;in</span></td>
  <td><span class="wx-data"><span class="wx-value">10.0</span>&nbsp;mi</span></td>
  <td>NNE</td>
  <td><span class="wx-data"><span class="wx-value">9.2</span>&nbsp;mph</span></td>
  <td>-</td>
  <td>N/A</td>
  <td>&nbsp;</td>
  <td>Clear</td>
</tr>"#,
                hour = i % 12 + 1,
                i = i % 10
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html><head><title>Weather History</title></head>
<body>
<table id="obsTable" class="obs-table responsive">
<thead><tr><th>Time (CST)</th><th>Temp.</th><th>Windchill</th><th>Dew Point</th><th>Humidity</th>
<th>Pressure</th><th>Visibility</th><th>Wind Dir</th><th>Wind Speed</th><th>Gust Speed</th>
<th>Precip</th><th>Events</th><th>Conditions</th></tr></thead>
<tbody>
{body}
</tbody>
</table>
</body></html>"#
    )
}
