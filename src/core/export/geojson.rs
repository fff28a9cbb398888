//! GeoJSON view of spatial fields
//!
//! Every non-empty geopoint, geotrace and geoshape value becomes one Feature
//! of a FeatureCollection written to `<base>.geojson`. XForm coordinates are
//! `lat lon [alt [acc]]`, points separated by `;`; GeoJSON positions are
//! `[lon, lat, alt?]`.

use crate::core::model::{DataType, FormDefinition};
use crate::core::transform::dates::format_timestamp;
use crate::domain::context::ResultExt;
use crate::domain::submission::Submission;
use crate::domain::Result;
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use std::path::Path;

/// One feature and the date used to order it
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub submission_date: Option<DateTime<FixedOffset>>,
    pub feature: Value,
}

/// Collects the features of one submission
pub fn features_for(form: &FormDefinition, submission: &Submission) -> Vec<GeoFeature> {
    let key = submission.key();
    let date = submission.submission_date();
    let root = submission.root();

    let mut features = Vec::new();
    for model in form.model.root().flatten() {
        if !model.is_field() || !model.data_type().is_spatial() {
            continue;
        }
        let field = model.fqn(0);
        for element in root.find_elements_path(model.name_path().as_slice()) {
            let Some(shape) = element.value().and_then(|v| geometry(model.data_type(), v)) else {
                continue;
            };
            features.push(GeoFeature {
                submission_date: date,
                feature: json!({
                    "type": "Feature",
                    "geometry": shape,
                    "properties": {
                        "key": key,
                        "field": field,
                        "submissionDate": date.map(|d| format_timestamp(&d)),
                    },
                }),
            });
        }
    }
    features
}

/// Writes all features, ordered by submission date, replacing the file
pub fn write_feature_collection(path: &Path, mut features: Vec<GeoFeature>) -> Result<()> {
    features.sort_by_key(|f| f.submission_date);
    let collection = json!({
        "type": "FeatureCollection",
        "features": features.into_iter().map(|f| f.feature).collect::<Vec<_>>(),
    });
    let text = serde_json::to_string_pretty(&collection)?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn geometry(data_type: DataType, raw: &str) -> Option<Value> {
    let points: Vec<Vec<f64>> = raw
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(position)
        .collect::<Option<_>>()?;

    match data_type {
        DataType::Geopoint if points.len() == 1 => {
            Some(json!({ "type": "Point", "coordinates": points[0] }))
        }
        DataType::Geotrace if points.len() >= 2 => {
            Some(json!({ "type": "LineString", "coordinates": points }))
        }
        DataType::Geoshape if points.len() >= 3 => {
            let mut ring = points;
            if ring.first() != ring.last() {
                ring.push(ring[0].clone());
            }
            Some(json!({ "type": "Polygon", "coordinates": [ring] }))
        }
        _ => None,
    }
}

/// `lat lon [alt [acc]]` to `[lon, lat, alt?]`
fn position(raw: &str) -> Option<Vec<f64>> {
    let parts: Vec<f64> = raw
        .split_whitespace()
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [lat, lon] => Some(vec![*lon, *lat]),
        [lat, lon, alt, ..] => Some(vec![*lon, *lat, *alt]),
        _ => None,
    }
}
