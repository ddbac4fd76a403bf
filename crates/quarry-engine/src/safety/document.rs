//! Structural analysis of document-store bodies.

use quarry_core::types::{FindQuery, PipelineQuery, SchemaEntity};
use serde_json::Value;

use super::QueryShape;

/// Pipeline stages that write their input somewhere.
const WRITE_STAGES: &[&str] = &["$merge", "$out"];

/// Pipeline stages that join, regroup, or fan out documents.
const HEAVY_STAGES: &[&str] = &[
    "$bucket",
    "$bucketAuto",
    "$facet",
    "$graphLookup",
    "$group",
    "$lookup",
    "$setWindowFields",
    "$unionWith",
    "$unwind",
];

/// Logical operators whose operands are nested filter documents.
const LOGICAL_OPERATORS: &[&str] = &["$and", "$nor", "$or"];

pub fn analyze_find(find: &FindQuery, entity: &SchemaEntity) -> QueryShape {
    let mut shape = QueryShape {
        limit: find.limit.filter(|l| *l > 0),
        ..QueryShape::default()
    };
    if is_non_empty_object(&find.filter) {
        shape.has_filter = true;
        collect_filter_fields(&find.filter, entity, &mut shape.filter_fields);
    }
    if let Some(sort) = find.sort.as_ref().and_then(Value::as_object) {
        push_fields(sort.keys(), entity, &mut shape.sort_fields);
    }
    shape
}

pub fn analyze_pipeline(pipeline: &PipelineQuery, entity: &SchemaEntity) -> QueryShape {
    let mut shape = QueryShape::default();
    for stage in &pipeline.stages {
        let Some((op, arg)) = stage.as_object().and_then(|o| o.iter().next()) else {
            continue;
        };
        let op = op.as_str();
        match op {
            "$match" if is_non_empty_object(arg) => {
                shape.has_filter = true;
                collect_filter_fields(arg, entity, &mut shape.filter_fields);
            }
            // A cap placed after a regrouping stage still reads the whole collection.
            "$limit" if shape.stages == 0 => {
                if let Some(n) = arg.as_u64() {
                    shape.limit = Some(shape.limit.map_or(n, |l| l.min(n)));
                }
            }
            "$sort" => {
                if let Some(obj) = arg.as_object() {
                    push_fields(obj.keys(), entity, &mut shape.sort_fields);
                }
            }
            _ if WRITE_STAGES.contains(&op) => {
                if shape.mutation.is_none() {
                    shape.mutation = Some(op.to_string());
                }
            }
            _ if HEAVY_STAGES.contains(&op) => shape.stages += 1,
            _ => {}
        }
    }
    shape
}

/// First write stage of a pipeline, if any.
pub fn pipeline_mutation(pipeline: &PipelineQuery) -> Option<String> {
    pipeline
        .operators()
        .into_iter()
        .find(|op| WRITE_STAGES.contains(op))
        .map(str::to_string)
}

fn is_non_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|o| !o.is_empty())
}

fn collect_filter_fields(filter: &Value, entity: &SchemaEntity, out: &mut Vec<String>) {
    let Some(obj) = filter.as_object() else {
        return;
    };
    for (key, value) in obj {
        if LOGICAL_OPERATORS.contains(&key.as_str()) {
            if let Some(items) = value.as_array() {
                for item in items {
                    collect_filter_fields(item, entity, out);
                }
            }
        } else if !key.starts_with('$') {
            push_fields(std::iter::once(key), entity, out);
        }
    }
}

/// Push known field names, keeping the schema's casing. Dotted paths resolve
/// to their top-level field unless the full path is itself a field.
fn push_fields<'a>(
    keys: impl Iterator<Item = &'a String>,
    entity: &SchemaEntity,
    out: &mut Vec<String>,
) {
    for key in keys {
        let field = entity
            .field(key)
            .or_else(|| key.split('.').next().and_then(|head| entity.field(head)));
        let name = match field {
            Some(f) => f.name.clone(),
            None => key.clone(),
        };
        if !out.contains(&name) {
            out.push(name);
        }
    }
}
