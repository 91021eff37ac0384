//! Point-file parsers
//!
//! Every format funnels into `ParsedPoint`. Points with unparseable or
//! out-of-range coordinates are dropped, not errors: these files come from
//! the wild.

use crate::domain::reference_map::MapFormat;
use crate::shared::error::{CoreError, CoreResult};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use serde_json::json;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPoint {
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub category: Option<String>,
    pub raw: Option<serde_json::Value>,
}

fn in_range(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Detect the format from the extension and parse.
pub async fn parse_file(path: &Path) -> CoreResult<(MapFormat, Vec<ParsedPoint>)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;

    match ext.as_str() {
        "kml" => Ok((MapFormat::Kml, parse_kml(&bytes)?)),
        "kmz" => Ok((MapFormat::Kmz, parse_kmz(&bytes)?)),
        "gpx" => Ok((MapFormat::Gpx, parse_gpx(&bytes)?)),
        "geojson" | "json" => Ok((MapFormat::Geojson, parse_geojson(&bytes)?)),
        "csv" => Ok((MapFormat::Csv, parse_csv(&bytes)?)),
        other => Err(CoreError::validation(format!(
            "unsupported reference map format: .{other}"
        ))),
    }
}

/// KML: `<Placemark>` elements with a `<Point><coordinates>` child.
/// Coordinates are `lng,lat[,alt]`.
pub fn parse_kml(bytes: &[u8]) -> CoreResult<Vec<ParsedPoint>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut in_placemark = false;
    let mut text_target: Option<&'static str> = None;
    let mut name = String::new();
    let mut description = String::new();
    let mut coordinates = String::new();
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| CoreError::validation(format!("malformed KML: {e}")))?
        {
            XmlEvent::Start(start) => match start.local_name().as_ref() {
                b"Placemark" => {
                    in_placemark = true;
                    name.clear();
                    description.clear();
                    coordinates.clear();
                }
                b"name" if in_placemark => text_target = Some("name"),
                b"description" if in_placemark => text_target = Some("description"),
                b"coordinates" if in_placemark => text_target = Some("coordinates"),
                _ => {}
            },
            XmlEvent::Text(text) => {
                if let Some(target) = text_target {
                    let value = text
                        .unescape()
                        .map_err(|e| CoreError::validation(format!("malformed KML text: {e}")))?;
                    match target {
                        "name" => name.push_str(&value),
                        "description" => description.push_str(&value),
                        "coordinates" => coordinates.push_str(&value),
                        _ => {}
                    }
                }
            }
            XmlEvent::CData(cdata) => {
                if text_target == Some("description") {
                    description.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            XmlEvent::End(end) => match end.local_name().as_ref() {
                b"Placemark" => {
                    in_placemark = false;
                    if let Some((lng, lat)) = parse_kml_coordinates(&coordinates) {
                        if in_range(lat, lng) {
                            points.push(ParsedPoint {
                                name: placeholder_name(&name, lat, lng),
                                description: non_empty(&description),
                                lat,
                                lng,
                                category: None,
                                raw: None,
                            });
                        }
                    }
                }
                b"name" | b"description" | b"coordinates" => text_target = None,
                _ => {}
            },
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(points)
}

fn parse_kml_coordinates(raw: &str) -> Option<(f64, f64)> {
    // Point coordinates are a single tuple; LineStrings are skipped by
    // taking only inputs with exactly one tuple.
    let tuples: Vec<&str> = raw.split_whitespace().collect();
    if tuples.len() != 1 {
        return None;
    }
    let mut parts = tuples[0].split(',');
    let lng: f64 = parts.next()?.trim().parse().ok()?;
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    Some((lng, lat))
}

/// KMZ is a zip with a KML inside (conventionally `doc.kml`).
pub fn parse_kmz(bytes: &[u8]) -> CoreResult<Vec<ParsedPoint>> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| CoreError::validation(format!("not a KMZ archive: {e}")))?;

    let kml_name = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|f| f.name().to_string()))
        .find(|n| n.to_ascii_lowercase().ends_with(".kml"))
        .ok_or_else(|| CoreError::validation("KMZ contains no KML document"))?;

    let mut kml_bytes = Vec::new();
    archive
        .by_name(&kml_name)
        .map_err(|e| CoreError::validation(format!("KMZ read failed: {e}")))?
        .read_to_end(&mut kml_bytes)
        .map_err(|e| CoreError::io(kml_name, e))?;

    parse_kml(&kml_bytes)
}

/// GPX: `<wpt lat=".." lon="..">` waypoints with an optional `<name>`.
pub fn parse_gpx(bytes: &[u8]) -> CoreResult<Vec<ParsedPoint>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut current: Option<(f64, f64)> = None;
    let mut name = String::new();
    let mut description = String::new();
    let mut in_name = false;
    let mut in_desc = false;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| CoreError::validation(format!("malformed GPX: {e}")))?
        {
            XmlEvent::Start(start) | XmlEvent::Empty(start)
                if start.local_name().as_ref() == b"wpt" =>
            {
                let mut lat = None;
                let mut lon = None;
                for attr in start.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.local_name().as_ref() {
                        b"lat" => lat = value.parse().ok(),
                        b"lon" => lon = value.parse().ok(),
                        _ => {}
                    }
                }
                if let (Some(lat), Some(lon)) = (lat, lon) {
                    current = Some((lat, lon));
                    name.clear();
                    description.clear();
                }
            }
            XmlEvent::Start(start) if current.is_some() => match start.local_name().as_ref() {
                b"name" => in_name = true,
                b"desc" => in_desc = true,
                _ => {}
            },
            XmlEvent::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| CoreError::validation(format!("malformed GPX text: {e}")))?;
                if in_name {
                    name.push_str(&value);
                } else if in_desc {
                    description.push_str(&value);
                }
            }
            XmlEvent::End(end) => match end.local_name().as_ref() {
                b"name" => in_name = false,
                b"desc" => in_desc = false,
                b"wpt" => {
                    if let Some((lat, lng)) = current.take() {
                        if in_range(lat, lng) {
                            points.push(ParsedPoint {
                                name: placeholder_name(&name, lat, lng),
                                description: non_empty(&description),
                                lat,
                                lng,
                                category: None,
                                raw: None,
                            });
                        }
                    }
                }
                _ => {}
            },
            XmlEvent::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(points)
}

/// GeoJSON: Point features from a FeatureCollection.
pub fn parse_geojson(bytes: &[u8]) -> CoreResult<Vec<ParsedPoint>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CoreError::validation(format!("GeoJSON is not UTF-8: {e}")))?;
    let parsed: geojson::GeoJson = text
        .parse()
        .map_err(|e| CoreError::validation(format!("malformed GeoJSON: {e}")))?;

    let features = match parsed {
        geojson::GeoJson::FeatureCollection(fc) => fc.features,
        geojson::GeoJson::Feature(f) => vec![f],
        geojson::GeoJson::Geometry(_) => {
            return Err(CoreError::validation(
                "GeoJSON has geometry only, no features",
            ))
        }
    };

    let mut points = Vec::new();
    for feature in features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let geojson::Value::Point(coords) = &geometry.value else {
            continue;
        };
        if coords.len() < 2 {
            continue;
        }
        let (lng, lat) = (coords[0], coords[1]);
        if !in_range(lat, lng) {
            continue;
        }

        let prop_str = |key: &str| {
            feature
                .properties
                .as_ref()
                .and_then(|p| p.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let name = prop_str("name")
            .or_else(|| prop_str("title"))
            .or_else(|| prop_str("Name"))
            .unwrap_or_default();

        points.push(ParsedPoint {
            name: placeholder_name(&name, lat, lng),
            description: prop_str("description"),
            lat,
            lng,
            category: prop_str("category"),
            raw: feature.properties.as_ref().map(|p| json!(p)),
        });
    }
    Ok(points)
}

/// CSV with header-detected columns for coordinates and names.
pub fn parse_csv(bytes: &[u8]) -> CoreResult<Vec<ParsedPoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| CoreError::validation(format!("CSV has no header row: {e}")))?
        .clone();

    let find = |candidates: &[&str]| {
        headers
            .iter()
            .position(|h| candidates.contains(&h.to_ascii_lowercase().as_str()))
    };
    let lat_col = find(&["lat", "latitude", "y"])
        .ok_or_else(|| CoreError::validation("CSV has no latitude column"))?;
    let lng_col = find(&["lng", "lon", "long", "longitude", "x"])
        .ok_or_else(|| CoreError::validation("CSV has no longitude column"))?;
    let name_col = find(&["name", "title", "site", "location"]);
    let desc_col = find(&["description", "desc", "notes"]);
    let category_col = find(&["category", "type"]);
    let state_col = find(&["state", "st"]);

    let mut points = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(_) => continue,
        };
        let Some(lat) = record.get(lat_col).and_then(|v| v.parse::<f64>().ok()) else {
            continue;
        };
        let Some(lng) = record.get(lng_col).and_then(|v| v.parse::<f64>().ok()) else {
            continue;
        };
        if !in_range(lat, lng) {
            continue;
        }

        let get = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let name = get(name_col).unwrap_or_default();
        let mut raw = serde_json::Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            raw.insert(header.to_string(), json!(value));
        }
        if let Some(state) = get(state_col) {
            raw.insert("state".into(), json!(state));
        }

        points.push(ParsedPoint {
            name: placeholder_name(&name, lat, lng),
            description: get(desc_col),
            lat,
            lng,
            category: get(category_col),
            raw: Some(serde_json::Value::Object(raw)),
        });
    }
    Ok(points)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Unnamed points get a coordinate placeholder, which the dedup pass will
/// score to the floor.
fn placeholder_name(name: &str, lat: f64, lng: f64) -> String {
    match non_empty(name) {
        Some(name) => name,
        None => format!("{lat:.4},{lng:.4}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Smith Hospital</name>
      <description>Closed 1998</description>
      <Point><coordinates>-75.5678,40.1234,0</coordinates></Point>
    </Placemark>
    <Placemark>
      <name>A Path</name>
      <LineString><coordinates>-75.0,40.0,0 -75.1,40.1,0</coordinates></LineString>
    </Placemark>
    <Placemark>
      <Point><coordinates>-76.0001,41.5000</coordinates></Point>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn kml_points_parse_linestrings_skip() {
        let points = parse_kml(KML.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].name, "Smith Hospital");
        assert_eq!(points[0].lat, 40.1234);
        assert_eq!(points[0].lng, -75.5678);
        assert_eq!(points[0].description.as_deref(), Some("Closed 1998"));
        // Unnamed point falls back to a coordinate placeholder.
        assert_eq!(points[1].name, "41.5000,-76.0001");
    }

    #[test]
    fn gpx_waypoints_parse() {
        let gpx = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <wpt lat="40.1234" lon="-75.5678"><name>Mill Ruins</name><desc>off trail</desc></wpt>
  <wpt lat="91.0" lon="0.0"><name>Bad</name></wpt>
</gpx>"#;
        let points = parse_gpx(gpx.as_bytes()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "Mill Ruins");
        assert_eq!(points[0].description.as_deref(), Some("off trail"));
    }

    #[test]
    fn geojson_features_parse() {
        let geojson = r#"{
          "type": "FeatureCollection",
          "features": [
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [-75.5678, 40.1234]},
             "properties": {"name": "Smith Hospital", "category": "hospital"}},
            {"type": "Feature",
             "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]},
             "properties": {"name": "A Path"}}
          ]
        }"#;
        let points = parse_geojson(geojson.as_bytes()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "Smith Hospital");
        assert_eq!(points[0].category.as_deref(), Some("hospital"));
    }

    #[test]
    fn csv_with_flexible_headers() {
        let csv = "Name,Latitude,Longitude,State,Notes\n\
                   Smith Hospital,40.1234,-75.5678,PA,roof gone\n\
                   ,41.0,-76.0,,\n\
                   Bad Row,not-a-number,-76.0,,\n";
        let points = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].name, "Smith Hospital");
        assert_eq!(points[0].description.as_deref(), Some("roof gone"));
        assert_eq!(points[1].name, "41.0000,-76.0000");
    }

    #[test]
    fn kmz_roundtrip() {
        let mut zip_bytes = Vec::new();
        {
            let mut writer =
                zip::ZipWriter::new(std::io::Cursor::new(&mut zip_bytes));
            writer
                .start_file("doc.kml", zip::write::SimpleFileOptions::default())
                .unwrap();
            std::io::Write::write_all(&mut writer, KML.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        let points = parse_kmz(&zip_bytes).unwrap();
        assert_eq!(points.len(), 2);
    }
}
