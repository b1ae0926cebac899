//! Geo query building and execution.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use tamarack::bounds::{BoundsQuery, EARTH_RADIUS_METERS};
use tamarack::elasticsearch::EsClient;

/// Render a bounds query into an Elasticsearch search body.
///
/// `Near` queries sort by `_geo_distance` in meters so every hit carries its
/// computed distance as a sort value; a radius restriction becomes a
/// `geo_distance` filter with the angular radius converted back to meters.
/// `Within` queries become a `geo_bounding_box` filter with no sort.
pub fn search_body(query: &BoundsQuery, size: usize) -> Value {
    match query {
        BoundsQuery::Near { lat, lon, radius } => {
            let query = match radius {
                Some(radius) => json!({
                    "bool": {
                        "must": { "match_all": {} },
                        "filter": [{
                            "geo_distance": {
                                "distance": format!("{}m", radius * EARTH_RADIUS_METERS),
                                "loc": { "lat": lat, "lon": lon }
                            }
                        }]
                    }
                }),
                None => json!({ "match_all": {} }),
            };

            json!({
                "query": query,
                "sort": [
                    {
                        "_geo_distance": {
                            "loc": { "lat": lat, "lon": lon },
                            "order": "asc",
                            "unit": "m"
                        }
                    }
                ],
                "size": size
            })
        }
        BoundsQuery::Within { first, second } => {
            // top_left must be the north-west corner whatever the input order
            let west = first[0].min(second[0]);
            let east = first[0].max(second[0]);
            let south = first[1].min(second[1]);
            let north = first[1].max(second[1]);

            json!({
                "query": {
                    "bool": {
                        "must": { "match_all": {} },
                        "filter": [{
                            "geo_bounding_box": {
                                "loc": {
                                    "top_left": { "lon": west, "lat": north },
                                    "bottom_right": { "lon": east, "lat": south }
                                }
                            }
                        }]
                    }
                },
                "size": size
            })
        }
    }
}

/// Execute a bounds query and return the serialized point records.
pub async fn execute_bounds(
    client: &EsClient,
    query: &BoundsQuery,
    size: usize,
) -> Result<Vec<Value>> {
    let body = search_body(query, size);

    debug!("Geo query: {}", serde_json::to_string_pretty(&body)?);

    let response = client
        .client()
        .search(elasticsearch::SearchParts::Index(&[&client.index]))
        .body(body)
        .send()
        .await?;

    let response_body = response.json::<serde_json::Value>().await?;
    let hits = response_body["hits"]["hits"]
        .as_array()
        .map(|a| a.to_vec())
        .unwrap_or_default();

    Ok(hits.iter().filter_map(serialize_hit).collect())
}

/// Serialize an Elasticsearch hit into a transport record: the document
/// `_source` with the engine-assigned id stringified into `_id` and, when a
/// distance sort value is present, the distance in meters merged in as `dis`.
pub fn serialize_hit(hit: &Value) -> Option<Value> {
    let mut record = hit["_source"].as_object()?.clone();

    record.insert("_id".to_string(), Value::String(stringify_id(&hit["_id"])?));

    if let Some(distance) = hit["sort"].get(0).and_then(Value::as_f64) {
        record.insert("dis".to_string(), json!(distance));
    }

    Some(Value::Object(record))
}

/// Render a document id as a string whatever JSON type the engine returns.
fn stringify_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
