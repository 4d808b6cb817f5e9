//! JSON hypergraph loader
//!
//! Two schemas are accepted, auto-detected by shape:
//!
//! **Array schema**: `num_vertices` (alias `vertices`, `numVertices`) plus
//! `edges`/`hyperedges` as arrays of integer vertex ids, optional `labels`:
//!
//! ```json
//! { "num_vertices": 4, "edges": [[0, 1, 2], [1, 2, 3]], "labels": [0, 0, 1, 1] }
//! ```
//!
//! **Keyed schema**: `type: "hypergraph"` with `node-data` / `edge-dict`
//! objects keyed by string ids; vertex ids are interned to dense integers in
//! first-seen order:
//!
//! ```json
//! { "type": "hypergraph", "node-data": {"a": {}, "b": {}}, "edge-dict": {"e0": ["a", "b"]} }
//! ```
//!
//! Unknown top-level keys are ignored in both schemas.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};

use super::binary::LoadError;
use super::hypergraph::{Hypergraph, Label, VertexId};

pub(super) fn load_from_json_bytes(bytes: &[u8], path: &Path) -> Result<Hypergraph, LoadError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| LoadError::invalid(path, format!("JSON parse error: {e}")))?;
    let Value::Object(obj) = value else {
        return Err(LoadError::invalid(path, "JSON: top level must be an object"));
    };

    let keyed = obj.get("type").and_then(Value::as_str) == Some("hypergraph")
        || obj.contains_key("node-data")
        || obj.contains_key("edge-dict");

    let labels = match obj.get("labels") {
        Some(v) => Some(parse_labels(v, path)?),
        None => None,
    };

    let mut hg = if keyed {
        load_keyed_schema(&obj, path)?
    } else {
        load_array_schema(&obj, path)?
    };

    if let Some(labels) = labels {
        hg.set_labels(labels)
            .map_err(|e| LoadError::invalid(path, format!("JSON: {e}")))?;
    }
    Ok(hg)
}

fn load_array_schema(obj: &Map<String, Value>, path: &Path) -> Result<Hypergraph, LoadError> {
    let num_vertices = ["num_vertices", "vertices", "numVertices"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(Value::as_u64)
        .ok_or_else(|| LoadError::invalid(path, "JSON: missing/invalid num_vertices"))?;
    if num_vertices == 0 {
        return Err(LoadError::invalid(path, "JSON: num_vertices must be > 0"));
    }
    let num_vertices = usize::try_from(num_vertices)
        .map_err(|_| LoadError::invalid(path, "JSON: num_vertices exceeds platform limits"))?;

    let mut hg = Hypergraph::new(num_vertices);

    let edges = obj.get("edges").or_else(|| obj.get("hyperedges"));
    if let Some(edges) = edges {
        let edges = edges
            .as_array()
            .ok_or_else(|| LoadError::invalid(path, "JSON: edges must be an array"))?;
        let mut members: Vec<VertexId> = Vec::new();
        for edge in edges {
            let ids = edge
                .as_array()
                .ok_or_else(|| LoadError::invalid(path, "JSON: each edge must be an array"))?;
            members.clear();
            for id in ids {
                let v = id
                    .as_u64()
                    .and_then(|v| VertexId::try_from(v).ok())
                    .ok_or_else(|| LoadError::invalid(path, "JSON: invalid vertex id"))?;
                members.push(v);
            }
            hg.add_hyperedge(&members)
                .map_err(|e| LoadError::invalid(path, format!("JSON: {e}")))?;
        }
    }

    Ok(hg)
}

fn load_keyed_schema(obj: &Map<String, Value>, path: &Path) -> Result<Hypergraph, LoadError> {
    // Interning table: string id -> dense id, first-seen order
    let mut idmap: HashMap<String, VertexId> = HashMap::new();
    let next_id = |idmap: &mut HashMap<String, VertexId>, sid: &str| -> VertexId {
        if let Some(&id) = idmap.get(sid) {
            return id;
        }
        #[allow(clippy::cast_possible_truncation)]
        let id = idmap.len() as VertexId;
        idmap.insert(sid.to_string(), id);
        id
    };

    if let Some(node_data) = obj.get("node-data") {
        let nodes = node_data
            .as_object()
            .ok_or_else(|| LoadError::invalid(path, "JSON: node-data must be an object"))?;
        for sid in nodes.keys() {
            next_id(&mut idmap, sid);
        }
    }

    let mut edges: Vec<Vec<VertexId>> = Vec::new();
    if let Some(edge_dict) = obj.get("edge-dict") {
        let dict = edge_dict
            .as_object()
            .ok_or_else(|| LoadError::invalid(path, "JSON: edge-dict must be an object"))?;
        for members in dict.values() {
            let ids = members.as_array().ok_or_else(|| {
                LoadError::invalid(path, "JSON: each edge-dict value must be an array")
            })?;
            let mut edge: Vec<VertexId> = Vec::with_capacity(ids.len());
            for id in ids {
                let sid = id.as_str().ok_or_else(|| {
                    LoadError::invalid(path, "JSON: edge-dict vertex ids must be strings")
                })?;
                edge.push(next_id(&mut idmap, sid));
            }
            if edge.is_empty() {
                return Err(LoadError::invalid(path, "JSON: hyperedge cannot be empty"));
            }
            edges.push(edge);
        }
    }

    if idmap.is_empty() {
        return Err(LoadError::invalid(
            path,
            "JSON: no vertices found in node-data/edge-dict",
        ));
    }

    let mut hg = Hypergraph::new(idmap.len());
    for edge in &edges {
        hg.add_hyperedge(edge)
            .map_err(|e| LoadError::invalid(path, format!("JSON: {e}")))?;
    }
    Ok(hg)
}

fn parse_labels(value: &Value, path: &Path) -> Result<Vec<Label>, LoadError> {
    let labels = value
        .as_array()
        .ok_or_else(|| LoadError::invalid(path, "JSON: labels must be an array"))?;
    labels
        .iter()
        .map(|l| {
            l.as_i64()
                .and_then(|l| Label::try_from(l).ok())
                .ok_or_else(|| LoadError::invalid(path, "JSON: invalid label value"))
        })
        .collect()
}
